//! Infrastructure layer - Hardware backends, configuration and gateway transport

pub mod config;
pub mod drivers;
pub mod messaging;

pub use config::AgentConfig;
pub use drivers::{DriverFactory, GpioDriver, SimulatedDriver};
pub use messaging::mqtt_client::{MqttClient, MqttMessage, MqttSettings};
pub use messaging::mqtt_publisher::MqttEventPublisher;
