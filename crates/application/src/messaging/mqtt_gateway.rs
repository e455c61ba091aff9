use async_trait::async_trait;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use domain::DomainError;
use domain::event::EventPublisher;
use domain::plug::PlugConfig;
use infrastructure::{MqttClient, MqttEventPublisher, MqttSettings};

use crate::gateway::{GatewayConnector, GatewaySession};
use crate::messaging::command_listener::CommandListener;
use crate::plug::Plug;

/// Opens one MQTT session per plug, authenticated with the plug's device id and secret
#[derive(Debug, Default, Clone, Copy)]
pub struct MqttGatewayConnector;

impl MqttGatewayConnector {
    pub fn new() -> Self {
        Self
    }
}

impl GatewayConnector for MqttGatewayConnector {
    fn open(&self, config: &PlugConfig) -> Result<Box<dyn GatewaySession>, DomainError> {
        let settings = MqttSettings::for_plug(config)?;
        tracing::info!(
            device_id = %config.device_id,
            host = %settings.host,
            port = settings.port,
            "Opening gateway session"
        );

        let client = MqttClient::new(&settings);
        let publisher = Arc::new(MqttEventPublisher::new(
            Arc::new(client.clone()),
            config.state_topic(),
        ));

        Ok(Box::new(MqttGatewaySession { client, publisher }))
    }
}

pub struct MqttGatewaySession {
    client: MqttClient,
    publisher: Arc<MqttEventPublisher>,
}

#[async_trait]
impl GatewaySession for MqttGatewaySession {
    fn publisher(&self) -> Arc<dyn EventPublisher> {
        self.publisher.clone()
    }

    async fn serve(&self, plug: Arc<Plug>, cancel_token: CancellationToken) {
        CommandListener::new(self.client.clone(), plug)
            .start(cancel_token)
            .await;
    }

    async fn close(&self) {
        self.client.close();
        self.client.closed().await;
    }
}
