use crate::DomainEvent;
use async_trait::async_trait;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EventPublisher: Send + Sync {
    async fn publish(
        &self,
        event: DomainEvent,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plug::{PowerState, StateSnapshot};

    struct CountingPublisher {
        fail_on: usize,
        seen: std::sync::Mutex<Vec<String>>,
    }

    #[async_trait]
    impl EventPublisher for CountingPublisher {
        async fn publish(
            &self,
            event: DomainEvent,
        ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
            let mut seen = self.seen.lock().unwrap();
            if seen.len() == self.fail_on {
                return Err("gateway unavailable".into());
            }
            seen.push(event.event_type().to_string());
            Ok(())
        }
    }

    fn events() -> Vec<DomainEvent> {
        let snapshot = StateSnapshot {
            power_state: PowerState::Off,
            lock_duration: 10,
        };
        vec![
            DomainEvent::plug_started("plug-1", snapshot),
            DomainEvent::plug_state_changed("plug-1", snapshot),
            DomainEvent::plug_stopped("plug-1", "done"),
        ]
    }

    #[tokio::test]
    async fn test_publisher_reports_failure() {
        let publisher = CountingPublisher {
            fail_on: 1,
            seen: std::sync::Mutex::new(Vec::new()),
        };

        let mut results = Vec::new();
        for event in events() {
            results.push(publisher.publish(event).await.is_ok());
        }

        assert_eq!(results, vec![true, false, false]);
        assert_eq!(*publisher.seen.lock().unwrap(), vec!["PlugStarted"]);
    }

    #[tokio::test]
    async fn test_mock_publisher_receives_device_id() {
        let mut mock = MockEventPublisher::new();
        mock.expect_publish()
            .withf(|event| event.device_id() == "plug-7")
            .times(1)
            .returning(|_| Ok(()));

        mock.publish(DomainEvent::plug_stopped("plug-7", "test"))
            .await
            .unwrap();
    }
}
