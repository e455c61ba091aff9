//! Application layer - Plug lifecycle, debounce protocol and gateway wiring

pub mod gateway;
pub mod messaging;
pub mod plug;

pub use gateway::{GatewayConnector, GatewaySession};
pub use messaging::command_listener::CommandListener;
pub use messaging::mqtt_gateway::MqttGatewayConnector;
pub use plug::{Plug, PlugManager};
