pub mod mqtt_client;
pub mod mqtt_publisher;

pub use mqtt_client::{MqttPublisherClient, parse_gateway_url};
