use serde::{Deserialize, Serialize};

use super::command::Command;

/// Power state of a plug.
///
/// `On`/`Off` are stable; the `*Locked` variants are transient debounce
/// states held for the configured lock duration after a switch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PowerState {
    Off,
    On,
    OffLocked,
    OnLocked,
}

/// Reason a command left the state untouched
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    AlreadyOn,
    AlreadyOff,
    SwitchingOn,
    SwitchingOff,
}

impl Rejection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AlreadyOn => "Power already on",
            Self::AlreadyOff => "Power already off",
            Self::SwitchingOn => "Power is already switching on",
            Self::SwitchingOff => "Power is already switching off",
        }
    }
}

impl PowerState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Off => "OFF",
            Self::On => "ON",
            Self::OffLocked => "OFF_LOCKED",
            Self::OnLocked => "ON_LOCKED",
        }
    }

    /// Check if in a transient debounce state
    pub fn is_locked(&self) -> bool {
        matches!(self, Self::OffLocked | Self::OnLocked)
    }

    /// State entered when `command` is accepted.
    ///
    /// A switch is only accepted from the opposite stable state; a command
    /// arriving while the opposite switch is still settling is rejected, not
    /// queued.
    pub fn apply(&self, command: Command) -> Result<Self, Rejection> {
        match (command, self) {
            (Command::PowerOn, Self::On | Self::OnLocked) => Err(Rejection::AlreadyOn),
            (Command::PowerOn, Self::OffLocked) => Err(Rejection::SwitchingOff),
            (Command::PowerOn, Self::Off) => Ok(Self::OnLocked),
            (Command::PowerOff, Self::Off | Self::OffLocked) => Err(Rejection::AlreadyOff),
            (Command::PowerOff, Self::OnLocked) => Err(Rejection::SwitchingOn),
            (Command::PowerOff, Self::On) => Ok(Self::OffLocked),
        }
    }

    /// Stable state reached once the lock duration has elapsed, if any
    pub fn settled(&self) -> Option<Self> {
        match self {
            Self::OnLocked => Some(Self::On),
            Self::OffLocked => Some(Self::Off),
            Self::On | Self::Off => None,
        }
    }
}

impl Default for PowerState {
    fn default() -> Self {
        Self::Off
    }
}

impl std::fmt::Display for PowerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
