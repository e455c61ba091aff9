use anyhow::{Context, Result};
use clap::Parser;
use dotenv::dotenv;
use std::sync::Arc;
use tracing::{error, info, warn};

use application::{MqttGatewayConnector, PlugManager};
use infrastructure::DriverFactory;
use infrastructure::config::AgentConfig;
use plug_agent::logging;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the JSON configuration file
    #[arg(long, default_value = "conf/conf.json")]
    conf_path: String,
}

async fn run() -> Result<()> {
    dotenv().ok();

    let args = Args::parse();

    // 1. Load Configuration (tracing is not up yet, so errors go straight to stderr)
    let config = AgentConfig::load(&args.conf_path)
        .with_context(|| format!("Failed to load configuration from {}", args.conf_path))?;

    // 2. Initialize tracing
    if !logging::init(&config.log_level) {
        warn!(
            log_level = %config.log_level,
            "Unknown log level, using {}",
            logging::FALLBACK_DIRECTIVE
        );
    }

    info!("Plug agent starting...");
    info!("Process ID: {}", std::process::id());
    info!(path = %args.conf_path, plugs = config.plugs.len(), "Configuration loaded");

    // 3. Driver
    let driver = DriverFactory::create_from_name(&config.driver)
        .inspect_err(|e| error!("Failed to get driver: {}", e))?;
    driver
        .init()
        .inspect_err(|e| error!(driver = driver.name(), "Failed to initialize driver: {}", e))?;

    // 4. Plugs
    let manager = Arc::new(PlugManager::new(
        driver.clone(),
        Arc::new(MqttGatewayConnector::new()),
    ));
    manager.start_plugs(config.plug_configs()).await;
    if manager.active_count().await == 0 {
        warn!("No plug started");
    }

    // 5. Wait for Ctrl-C or until every plug is gone
    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            match result {
                Ok(()) => info!("Shutdown signal received"),
                Err(e) => error!("Failed to listen for shutdown signal: {}", e),
            }
        }
        _ = manager.wait_stopped() => {
            warn!("All plugs stopped");
        }
    }

    manager.join_all().await;
    driver.shutdown();

    info!("Plug stopped, exiting gracefully");
    Ok(())
}

fn main() {
    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Failed to start async runtime: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = rt.block_on(run()) {
        eprintln!("\nCRITICAL ERROR: {:?}", e);
        std::process::exit(1);
    }
}
