use serde::{Deserialize, Serialize};

/// Inbound plug command
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Command {
    PowerOn,
    PowerOff,
}

impl Command {
    /// Key holding the command name in an inbound payload
    pub const PAYLOAD_KEY: &'static str = "command";

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PowerOn => "PowerOn",
            Self::PowerOff => "PowerOff",
        }
    }

    /// Decode a command name. Unknown names yield `None`; they are not errors.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "PowerOn" => Some(Self::PowerOn),
            "PowerOff" => Some(Self::PowerOff),
            _ => None,
        }
    }

    /// Command name carried by a `{"command": "..."}` payload
    pub fn name_in(payload: &serde_json::Value) -> Option<&str> {
        payload.get(Self::PAYLOAD_KEY).and_then(|v| v.as_str())
    }
}
