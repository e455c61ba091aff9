use thiserror::Error;

/// Domain-level errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DomainError {
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Invalid driver name: {0}")]
    UnknownDriver(String),

    #[error("Invalid model name: {0}")]
    UnknownModel(String),

    #[error("Driver {driver} does not support model {model}")]
    UnsupportedModel { driver: String, model: String },

    #[error("Driver {0} is already initialized")]
    AlreadyInitialized(String),

    #[error("Driver {0} is not initialized")]
    DriverNotInitialized(String),

    #[error("Driver initialization failed: {0}")]
    DriverInit(String),

    #[error("Gateway error: {0}")]
    Gateway(String),
}

pub type Result<T> = std::result::Result<T, DomainError>;
