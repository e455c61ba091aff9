use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::DomainError;

/// Hardware backend selected by the `driver` configuration field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DriverKind {
    /// Raspberry Pi Zero GPIO
    #[serde(rename = "RPI_Z")]
    RpiZ,
    /// Simulated driver without physical effect
    #[serde(rename = "TEST")]
    Test,
}

impl DriverKind {
    pub const ALL: [DriverKind; 2] = [DriverKind::RpiZ, DriverKind::Test];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RpiZ => "RPI_Z",
            Self::Test => "TEST",
        }
    }
}

impl FromStr for DriverKind {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| DomainError::UnknownDriver(s.to_string()))
    }
}

impl std::fmt::Display for DriverKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
