pub mod command_listener;
pub mod mqtt_gateway;
