use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Immutable per-plug configuration, supplied once at construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlugConfig {
    pub model: String,
    pub gpio_pin: u32,
    pub lock_duration_ms: u64,

    pub device_id: String,
    pub secret: String,

    pub gateway_url: String,
    pub gateway_namespace: String,

    pub reconn_delay_ms: u64,
    pub reconn_attempts: u32,
}

impl PlugConfig {
    /// Logging context, e.g. `Plug@17`
    pub fn name(&self) -> String {
        format!("Plug@{}", self.gpio_pin)
    }

    pub fn lock_duration(&self) -> Duration {
        Duration::from_millis(self.lock_duration_ms)
    }

    pub fn reconn_delay(&self) -> Duration {
        Duration::from_millis(self.reconn_delay_ms)
    }

    /// Topic on which the gateway delivers commands for this plug
    pub fn command_topic(&self) -> String {
        format!("{}/{}/command", self.gateway_namespace, self.device_id)
    }

    /// Topic on which this plug publishes its state
    pub fn state_topic(&self) -> String {
        format!("{}/{}/state", self.gateway_namespace, self.device_id)
    }
}
