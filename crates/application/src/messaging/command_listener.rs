use domain::plug::PowerState;
use infrastructure::MqttClient;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::plug::Plug;

/// Feeds gateway commands for one plug into its state machine
pub struct CommandListener {
    mqtt_client: MqttClient,
    plug: Arc<Plug>,
}

impl CommandListener {
    pub fn new(mqtt_client: MqttClient, plug: Arc<Plug>) -> Self {
        Self { mqtt_client, plug }
    }

    /// Runs until cancelled or until the MQTT session stops
    pub async fn start(&self, cancel_token: CancellationToken) {
        let topic = self.plug.config().command_topic();
        let plug_name = self.plug.name().to_string();

        // Receiver first so nothing published right after SUBSCRIBE is missed
        let mut rx = self.mqtt_client.subscribe_messages();

        if let Err(e) = self.mqtt_client.subscribe(&topic).await {
            error!(plug = %plug_name, error = %e, "Failed to subscribe to commands");
            return;
        }

        info!(plug = %plug_name, topic = %topic, "Listening for commands");

        loop {
            let received = tokio::select! {
                biased;
                _ = cancel_token.cancelled() => break,
                _ = self.mqtt_client.closed() => {
                    warn!(plug = %plug_name, "MQTT session closed");
                    break;
                }
                received = rx.recv() => received,
            };

            match received {
                Ok(msg) => {
                    if msg.topic != topic {
                        continue;
                    }

                    Self::dispatch(&self.plug, &msg.payload).await;

                    if let Err(e) = self.mqtt_client.ack(&msg).await {
                        warn!(plug = %plug_name, error = %e, "Failed to ack command");
                    }
                }
                Err(broadcast::error::RecvError::Lagged(count)) => {
                    warn!(plug = %plug_name, skipped = count, "Command listener lagged");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    warn!(plug = %plug_name, "Command channel closed");
                    break;
                }
            }
        }

        debug!(plug = %plug_name, "Command listener stopped");
    }

    /// Decode one raw command payload and hand it to the plug
    pub async fn dispatch(plug: &Plug, payload: &[u8]) -> Option<PowerState> {
        let payload_str = String::from_utf8_lossy(payload);
        debug!(plug = %plug.name(), command = %payload_str, "Received command");

        match serde_json::from_str::<Value>(&payload_str) {
            Ok(cmd) => plug.on_command_received(&cmd).await,
            Err(_) => {
                warn!(plug = %plug.name(), "Received non-JSON command");
                None
            }
        }
    }
}
