use std::sync::{Arc, Mutex as StdMutex, PoisonError};
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use domain::DomainError;
use domain::driver::{Driver, HardwareInterface, Model};
use domain::event::{DomainEvent, EventPublisher};
use domain::plug::{Command, PlugConfig, PlugState, PowerState, StateSnapshot};

use super::debounce::{DebounceWorker, PlugSignal};

/// State and hardware handle, always accessed under one lock
pub(crate) struct PlugCore {
    pub(crate) state: PlugState,
    pub(crate) interface: Box<dyn HardwareInterface>,
    /// When the current locked state was entered
    pub(crate) locked_at: Option<Instant>,
}

/// One controlled outlet: owns the debounce state machine and its worker
pub struct Plug {
    name: String,
    config: PlugConfig,
    core: Arc<Mutex<PlugCore>>,
    signal_tx: mpsc::UnboundedSender<PlugSignal>,
    publisher: Arc<dyn EventPublisher>,
    cancel_token: CancellationToken,
    worker: StdMutex<Option<JoinHandle<()>>>,
}

impl Plug {
    /// Bind a plug to its hardware and start its debounce worker.
    ///
    /// Fails without side effects when the configured model is unknown or the
    /// driver cannot drive it. Publishes the initial `OFF` state on success.
    pub async fn attach(
        config: PlugConfig,
        driver: &dyn Driver,
        publisher: Arc<dyn EventPublisher>,
        cancel_token: CancellationToken,
    ) -> Result<Arc<Self>, DomainError> {
        let name = config.name();
        info!(plug = %name, "Initialization started!");

        let model: Model = config.model.parse().inspect_err(|e| {
            error!(plug = %name, "Failed to get device model: {}", e);
        })?;

        let mut interface = driver.get_interface(model).inspect_err(|e| {
            error!(plug = %name, "Failed to get hardware interface: {}", e);
        })?;
        debug!(plug = %name, driver = driver.name(), "Using hardware interface for {}", model);
        interface.set_pin(config.gpio_pin);

        let core = Arc::new(Mutex::new(PlugCore {
            state: PlugState::new(config.lock_duration_ms),
            interface,
            locked_at: None,
        }));

        let (signal_tx, signals) = mpsc::unbounded_channel();
        let worker = DebounceWorker {
            name: name.clone(),
            device_id: config.device_id.clone(),
            lock_duration: config.lock_duration(),
            core: core.clone(),
            publisher: publisher.clone(),
            signals,
            cancel_token: cancel_token.clone(),
        };
        debug!(plug = %name, "Starting loop thread...");
        let handle = tokio::spawn(worker.run());

        let plug = Arc::new(Self {
            name,
            config,
            core,
            signal_tx,
            publisher,
            cancel_token,
            worker: StdMutex::new(Some(handle)),
        });

        let initial = plug.serialize_state().await;
        plug.publish(DomainEvent::plug_started(&plug.config.device_id, initial))
            .await;

        Ok(plug)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn device_id(&self) -> &str {
        &self.config.device_id
    }

    pub fn config(&self) -> &PlugConfig {
        &self.config
    }

    pub fn is_shutting_down(&self) -> bool {
        self.cancel_token.is_cancelled()
    }

    pub async fn power_state(&self) -> PowerState {
        self.core.lock().await.state.power_state
    }

    /// The state surfaced to the gateway
    pub async fn serialize_state(&self) -> StateSnapshot {
        self.core.lock().await.state.snapshot()
    }

    /// Handle an inbound `{"command": "..."}` payload.
    ///
    /// Returns the new power state when the command switched the plug.
    /// Unknown or malformed commands are ignored.
    pub async fn on_command_received(&self, payload: &serde_json::Value) -> Option<PowerState> {
        debug!(plug = %self.name, "on_command_received(): Reading command...");

        let Some(cmd_name) = Command::name_in(payload) else {
            debug!(plug = %self.name, "on_command_received(): Payload has no command name");
            return None;
        };
        debug!(plug = %self.name, "on_command_received(): Command name is \"{}\"", cmd_name);

        let Some(command) = Command::from_name(cmd_name) else {
            debug!(plug = %self.name, "on_command_received(): Unimplemented command");
            return None;
        };

        self.handle_command(command).await
    }

    /// Apply a decoded command under the plug lock
    pub async fn handle_command(&self, command: Command) -> Option<PowerState> {
        let mut core = self.core.lock().await;

        let next = match core.state.power_state.apply(command) {
            Ok(next) => next,
            Err(rejection) => {
                debug!(plug = %self.name, command = command.as_str(), "{}", rejection.as_str());
                return None;
            }
        };

        match command {
            Command::PowerOn => core.interface.on(),
            Command::PowerOff => core.interface.off(),
        }
        core.state.power_state = next;
        core.locked_at = Some(Instant::now());

        if self.signal_tx.send(PlugSignal::StateChanged).is_err() {
            warn!(plug = %self.name, "Debounce worker is gone; state stays {}", next);
        }

        match command {
            Command::PowerOn => info!(plug = %self.name, "Power switched ON"),
            Command::PowerOff => info!(plug = %self.name, "Power switched OFF"),
        }

        // Published under the lock so the gateway sees updates in order
        let event = DomainEvent::plug_state_changed(&self.config.device_id, core.state.snapshot());
        self.publish(event).await;

        Some(next)
    }

    /// Request a cooperative stop. Only flips flags; safe from any context.
    pub fn shutdown(&self) {
        if !self.cancel_token.is_cancelled() {
            info!(plug = %self.name, "Shutdown requested");
        }
        self.cancel_token.cancel();
        let _ = self.signal_tx.send(PlugSignal::ShutdownRequested);
    }

    /// Wait for the debounce worker to exit
    pub async fn join(&self) {
        let handle = self
            .worker
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();

        if let Some(handle) = handle {
            debug!(plug = %self.name, "Waiting for loop thread to exit...");
            if let Err(e) = handle.await {
                error!(plug = %self.name, error = %e, "Debounce worker failed");
            }
        }
    }

    async fn publish(&self, event: DomainEvent) {
        if let Err(e) = self.publisher.publish(event).await {
            warn!(plug = %self.name, error = %e, "Failed to publish state update");
        }
    }
}
