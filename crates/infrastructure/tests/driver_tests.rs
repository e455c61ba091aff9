use anyhow::Result;
use domain::driver::{Driver, Model};
use domain::event::EventPublisher;
use domain::plug::{PowerState, StateSnapshot};
use domain::{DomainError, DomainEvent};
use infrastructure::messaging::MqttPublisherClient;
use infrastructure::{DriverFactory, MqttEventPublisher, SimulatedDriver};
use rumqttc::QoS;
use std::sync::{Arc, Mutex};
use std::thread;

#[test] // driver_shared_between_threads
fn driver_shared_between_threads() {
    let driver = Arc::new(SimulatedDriver::new());
    driver.init().unwrap();

    let handles: Vec<_> = (0..4u32)
        .map(|pin| {
            let driver = driver.clone();
            thread::spawn(move || {
                let mut interface = driver.get_interface(Model::PlugV1).unwrap();
                interface.set_pin(pin);
                for _ in 0..10 {
                    interface.on();
                    interface.off();
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(driver.writes().len(), 80);
    for pin in 0..4 {
        let values: Vec<bool> = driver.writes_for(pin).iter().map(|w| w.value).collect();
        assert_eq!(values.len(), 20);
        assert!(values.chunks(2).all(|pair| pair == [true, false]));
    }
}

#[test] // factory_resolves_known_names_only
fn factory_resolves_known_names_only() {
    let driver = DriverFactory::create_from_name("TEST").unwrap();
    assert_eq!(driver.name(), "TestDriver");

    let driver = DriverFactory::create_from_name("RPI_Z").unwrap();
    assert_eq!(driver.name(), "RPiZDriver");

    assert!(matches!(
        DriverFactory::create_from_name("rpi_z"),
        Err(DomainError::UnknownDriver(_))
    ));
}

#[test] // unsupported_model_leaves_driver_untouched
fn unsupported_model_leaves_driver_untouched() {
    let driver = SimulatedDriver::with_models(&[]);
    driver.init().unwrap();

    assert!(driver.get_interface(Model::PlugV1).is_err());
    assert!(driver.is_initialized());
    assert!(driver.writes().is_empty());
}

#[derive(Default)]
struct RecordingClient {
    published: Mutex<Vec<(String, Vec<u8>, QoS, bool)>>,
}

#[async_trait::async_trait]
impl MqttPublisherClient for RecordingClient {
    async fn publish_bytes(
        &self,
        topic: &str,
        payload: &[u8],
        qos: QoS,
        retain: bool,
    ) -> Result<()> {
        self.published
            .lock()
            .unwrap()
            .push((topic.to_string(), payload.to_vec(), qos, retain));
        Ok(())
    }
}

#[test] // state_published_retained_on_state_topic
fn state_published_retained_on_state_topic() {
    let client = Arc::new(RecordingClient::default());
    let publisher = MqttEventPublisher::new(client.clone(), "homecontroller/plug-1/state");

    let snapshot = StateSnapshot {
        power_state: PowerState::OnLocked,
        lock_duration: 50,
    };
    tokio_test::block_on(async {
        publisher
            .publish(DomainEvent::plug_state_changed("plug-1", snapshot))
            .await
            .unwrap();
        publisher
            .publish(DomainEvent::plug_stopped("plug-1", "shutdown requested"))
            .await
            .unwrap();
    });

    let published = client.published.lock().unwrap();
    assert_eq!(published.len(), 1);
    let (topic, payload, qos, retain) = &published[0];
    assert_eq!(topic, "homecontroller/plug-1/state");
    assert_eq!(*qos, QoS::AtLeastOnce);
    assert!(*retain);
    assert_eq!(
        serde_json::from_slice::<serde_json::Value>(payload).unwrap(),
        serde_json::json!({ "powerState": "ON_LOCKED", "lockDuration": 50 })
    );
}
