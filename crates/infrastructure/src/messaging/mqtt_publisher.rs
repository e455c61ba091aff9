use crate::messaging::mqtt_client::MqttPublisherClient;
use async_trait::async_trait;
use domain::DomainEvent;
use domain::event::EventPublisher;
use rumqttc::QoS;
use std::sync::Arc;

/// Publishes a plug's state snapshots to its retained state topic
pub struct MqttEventPublisher {
    client: Arc<dyn MqttPublisherClient>,
    state_topic: String,
}

impl MqttEventPublisher {
    pub fn new(client: Arc<dyn MqttPublisherClient>, state_topic: impl Into<String>) -> Self {
        Self {
            client,
            state_topic: state_topic.into(),
        }
    }
}

#[async_trait]
impl EventPublisher for MqttEventPublisher {
    async fn publish(
        &self,
        event: DomainEvent,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let Some(snapshot) = event.snapshot() else {
            tracing::debug!(event = event.event_type(), "Event has no state to publish");
            return Ok(());
        };

        // Payload: {"powerState": "...", "lockDuration": n}
        let payload = serde_json::to_vec(snapshot)?;
        self.client
            .publish_bytes(&self.state_topic, &payload, QoS::AtLeastOnce, true)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;
    use domain::plug::{PowerState, StateSnapshot};
    use serde_json::json;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicBool, Ordering};

    #[derive(Default)]
    struct RecordingClient {
        published: Mutex<Vec<(String, Vec<u8>, bool)>>,
        fail: AtomicBool,
    }

    #[async_trait]
    impl MqttPublisherClient for RecordingClient {
        async fn publish_bytes(
            &self,
            topic: &str,
            payload: &[u8],
            _qos: QoS,
            retain: bool,
        ) -> anyhow::Result<()> {
            if self.fail.load(Ordering::Relaxed) {
                return Err(anyhow!("Simulated Publish Failure"));
            }
            self.published
                .lock()
                .unwrap()
                .push((topic.to_string(), payload.to_vec(), retain));
            Ok(())
        }
    }

    fn snapshot(power_state: PowerState) -> StateSnapshot {
        StateSnapshot {
            power_state,
            lock_duration: 50,
        }
    }

    #[tokio::test]
    async fn test_state_change_is_published_retained() {
        let client = Arc::new(RecordingClient::default());
        let publisher = MqttEventPublisher::new(client.clone(), "hc/plug-1/state");

        publisher
            .publish(DomainEvent::plug_state_changed(
                "plug-1",
                snapshot(PowerState::OnLocked),
            ))
            .await
            .unwrap();

        let published = client.published.lock().unwrap();
        assert_eq!(published.len(), 1);
        let (topic, payload, retain) = &published[0];
        assert_eq!(topic, "hc/plug-1/state");
        assert!(*retain);
        let payload: serde_json::Value = serde_json::from_slice(payload).unwrap();
        assert_eq!(
            payload,
            json!({"powerState": "ON_LOCKED", "lockDuration": 50})
        );
    }

    #[tokio::test]
    async fn test_stopped_event_is_not_published() {
        let client = Arc::new(RecordingClient::default());
        let publisher = MqttEventPublisher::new(client.clone(), "hc/plug-1/state");

        publisher
            .publish(DomainEvent::plug_stopped("plug-1", "shutdown"))
            .await
            .unwrap();

        assert!(client.published.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_publish_failure_is_returned() {
        let client = Arc::new(RecordingClient::default());
        client.fail.store(true, Ordering::Relaxed);
        let publisher = MqttEventPublisher::new(client, "hc/plug-1/state");

        let result = publisher
            .publish(DomainEvent::plug_started("plug-1", snapshot(PowerState::Off)))
            .await;
        assert!(result.is_err());
    }
}
