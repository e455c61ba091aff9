use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::DomainError;

/// Kind of physical device a driver can address
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Model {
    /// Single-relay plug
    #[serde(rename = "PLUG_V1")]
    PlugV1,
}

impl Model {
    pub const ALL: [Model; 1] = [Model::PlugV1];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PlugV1 => "PLUG_V1",
        }
    }
}

impl FromStr for Model {
    type Err = DomainError;

    /// Exact-match lookup of a configured model name
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|model| model.as_str() == s)
            .ok_or_else(|| DomainError::UnknownModel(s.to_string()))
    }
}

impl std::fmt::Display for Model {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
