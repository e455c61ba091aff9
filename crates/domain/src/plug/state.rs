use serde::{Deserialize, Serialize};

use super::power_state::PowerState;

/// State owned by one plug
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlugState {
    pub power_state: PowerState,
    pub lock_duration_ms: u64,
}

impl PlugState {
    /// Initial state: always off
    pub fn new(lock_duration_ms: u64) -> Self {
        Self {
            power_state: PowerState::Off,
            lock_duration_ms,
        }
    }

    pub fn snapshot(&self) -> StateSnapshot {
        StateSnapshot {
            power_state: self.power_state,
            lock_duration: self.lock_duration_ms,
        }
    }
}

/// The only plug state surfaced to the gateway
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateSnapshot {
    pub power_state: PowerState,
    /// Milliseconds
    pub lock_duration: u64,
}
