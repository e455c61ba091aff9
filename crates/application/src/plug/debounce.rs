use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, mpsc};
use tokio::time::{Instant, sleep_until};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use domain::event::{DomainEvent, EventPublisher};

use super::plug_actor::PlugCore;

/// Reason the debounce worker was woken
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlugSignal {
    /// The plug entered a locked state
    StateChanged,
    /// The plug is shutting down
    ShutdownRequested,
}

/// Settles a locked plug once its lock duration has elapsed.
///
/// One worker per plug, running for the plug's whole lifetime.
pub(crate) struct DebounceWorker {
    pub(crate) name: String,
    pub(crate) device_id: String,
    pub(crate) lock_duration: Duration,
    pub(crate) core: Arc<Mutex<PlugCore>>,
    pub(crate) publisher: Arc<dyn EventPublisher>,
    pub(crate) signals: mpsc::UnboundedReceiver<PlugSignal>,
    pub(crate) cancel_token: CancellationToken,
}

impl DebounceWorker {
    pub(crate) async fn run(mut self) {
        loop {
            let signal = tokio::select! {
                biased;
                _ = self.cancel_token.cancelled() => PlugSignal::ShutdownRequested,
                signal = self.signals.recv() => signal.unwrap_or(PlugSignal::ShutdownRequested),
            };

            if signal == PlugSignal::ShutdownRequested {
                debug!(plug = %self.name, "loop(): Shutdown requested, exiting");
                return;
            }

            let Some(deadline) = self.deadline().await else {
                trace!(plug = %self.name, "loop(): Nothing to settle");
                continue;
            };

            debug!(plug = %self.name, "loop(): Locking power state change");

            // The lock is released while sleeping so commands are still handled
            tokio::select! {
                biased;
                _ = self.cancel_token.cancelled() => {
                    debug!(plug = %self.name, "loop(): Shutdown requested while locked, exiting");
                    return;
                }
                _ = sleep_until(deadline) => {}
            }

            self.settle().await;
        }
    }

    /// When the current lock expires, if the plug is locked at all
    async fn deadline(&self) -> Option<Instant> {
        let core = self.core.lock().await;
        if !core.state.power_state.is_locked() {
            return None;
        }
        let locked_at = core.locked_at.unwrap_or_else(Instant::now);
        Some(locked_at + self.lock_duration)
    }

    async fn settle(&self) {
        let mut core = self.core.lock().await;
        let Some(settled) = core.state.power_state.settled() else {
            return;
        };

        core.state.power_state = settled;
        core.locked_at = None;
        debug!(plug = %self.name, state = %settled, "loop(): Unlocking power state change");

        let event = DomainEvent::plug_state_changed(&self.device_id, core.state.snapshot());
        if let Err(e) = self.publisher.publish(event).await {
            warn!(plug = %self.name, error = %e, "Failed to publish state update");
        }
    }
}
