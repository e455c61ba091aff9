use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, error, info, warn};

use domain::DomainError;
use domain::driver::Driver;
use domain::event::DomainEvent;
use domain::plug::PlugConfig;

use crate::gateway::{GatewayConnector, GatewaySession};
use crate::plug::Plug;

/// Manages the lifecycle of every plug sharing one driver
pub struct PlugManager {
    driver: Arc<dyn Driver>,
    connector: Arc<dyn GatewayConnector>,
    root_token: CancellationToken,
    tracker: TaskTracker,
    // device_id -> running plug
    plugs: Arc<Mutex<HashMap<String, Arc<Plug>>>>,
}

impl PlugManager {
    pub fn new(driver: Arc<dyn Driver>, connector: Arc<dyn GatewayConnector>) -> Self {
        Self {
            driver,
            connector,
            root_token: CancellationToken::new(),
            tracker: TaskTracker::new(),
            plugs: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Start every configured plug. A plug that fails to start is logged and
    /// skipped; its siblings still run. Returns how many started.
    pub async fn start_plugs(&self, configs: Vec<PlugConfig>) -> usize {
        let total = configs.len();
        let mut started = 0;

        for config in configs {
            let name = config.name();
            match self.start_plug(config).await {
                Ok(()) => started += 1,
                Err(e) => error!(plug = %name, "Failed to start plug: {}", e),
            }
        }

        info!(started, total, "Plugs started");
        started
    }

    pub async fn start_plug(&self, config: PlugConfig) -> Result<(), DomainError> {
        let mut plugs = self.plugs.lock().await;
        if plugs.contains_key(&config.device_id) {
            warn!(device_id = %config.device_id, "Plug already running");
            return Err(DomainError::InvalidConfiguration(format!(
                "duplicate device id \"{}\"",
                config.device_id
            )));
        }

        let session = self.connector.open(&config)?;
        let token = self.root_token.child_token();

        let plug = match Plug::attach(
            config,
            self.driver.as_ref(),
            session.publisher(),
            token.clone(),
        )
        .await
        {
            Ok(plug) => plug,
            Err(e) => {
                session.close().await;
                return Err(e);
            }
        };

        plugs.insert(plug.device_id().to_string(), plug.clone());

        let registry = self.plugs.clone();
        self.tracker
            .spawn(run_plug(plug, session, token, registry));
        Ok(())
    }

    pub async fn plug(&self, device_id: &str) -> Option<Arc<Plug>> {
        self.plugs.lock().await.get(device_id).cloned()
    }

    pub async fn active_count(&self) -> usize {
        self.plugs.lock().await.len()
    }

    /// Ask every plug to stop. Only cancels tokens; never blocks.
    pub fn shutdown(&self) {
        info!("Stopping all plugs");
        self.root_token.cancel();
    }

    /// Resolves once every started plug has stopped
    pub async fn wait_stopped(&self) {
        self.tracker.close();
        self.tracker.wait().await;
    }

    /// Stop every plug and wait for all of them
    pub async fn join_all(&self) {
        self.shutdown();
        self.wait_stopped().await;
        debug!("All plugs joined");
    }
}

async fn run_plug(
    plug: Arc<Plug>,
    session: Box<dyn GatewaySession>,
    token: CancellationToken,
    registry: Arc<Mutex<HashMap<String, Arc<Plug>>>>,
) {
    session.serve(plug.clone(), token.clone()).await;

    let reason = if token.is_cancelled() {
        "shutdown requested"
    } else {
        warn!(plug = %plug.name(), "Gateway session lost, stopping plug");
        "gateway session lost"
    };

    plug.shutdown();
    plug.join().await;

    let event = DomainEvent::plug_stopped(plug.device_id(), reason);
    if let Err(e) = session.publisher().publish(event).await {
        debug!(plug = %plug.name(), error = %e, "Failed to publish stop event");
    }
    session.close().await;

    registry.lock().await.remove(plug.device_id());
    info!(plug = %plug.name(), reason, "Plug stopped");
}
