//! Domain layer - Pure plug logic with no external dependencies
//!
//! This crate contains:
//! - Hardware contracts (Driver, HardwareInterface) and their name lookups
//! - Plug value objects (PowerState, PlugState, Command, PlugConfig)
//! - Domain Events and the publisher interface
//!
//! Principles:
//! - No dependencies on infrastructure
//! - Transition rules enforced at domain level
//! - Testable in isolation

pub mod driver;
pub mod error;
pub mod event;
pub mod plug;

// Re-export commonly used types
pub use driver::{Driver, DriverKind, HardwareInterface, Model};
pub use error::DomainError;
pub use event::{DomainEvent, EventPublisher};
pub use plug::{Command, PlugConfig, PlugState, PowerState, StateSnapshot};
