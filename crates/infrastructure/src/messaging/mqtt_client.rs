use anyhow::{Result, anyhow};
use domain::DomainError;
use domain::plug::PlugConfig;
use rumqttc::{AsyncClient, Event, EventLoop, MqttOptions, Outgoing, Packet, QoS};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

pub const DEFAULT_MQTT_PORT: u16 = 1883;

/// Upper bound on flushing queued requests when a session is closed
const DISCONNECT_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Clone, Debug)]
pub struct MqttMessage {
    pub topic: String,
    pub payload: Vec<u8>,
    pub pkid: u16,
    pub qos: QoS,
}

#[async_trait::async_trait]
pub trait MqttPublisherClient: Send + Sync {
    async fn publish_bytes(
        &self,
        topic: &str,
        payload: &[u8],
        qos: QoS,
        retain: bool,
    ) -> Result<()>;
}

/// Connection parameters of one gateway session
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MqttSettings {
    pub host: String,
    pub port: u16,
    pub client_id: String,
    pub username: String,
    pub password: String,
    pub reconn_delay: Duration,
    /// Consecutive connection failures tolerated before giving up; 0 retries forever
    pub reconn_attempts: u32,
}

impl MqttSettings {
    /// Session settings for one plug: the device id doubles as client id and
    /// username, the secret is the password.
    pub fn for_plug(config: &PlugConfig) -> Result<Self, DomainError> {
        let (host, port) = parse_gateway_url(&config.gateway_url)?;
        Ok(Self {
            host,
            port,
            client_id: config.device_id.clone(),
            username: config.device_id.clone(),
            password: config.secret.clone(),
            reconn_delay: config.reconn_delay(),
            reconn_attempts: config.reconn_attempts,
        })
    }
}

/// Split a gateway address (`mqtt://host:port`, `tcp://host:port` or `host:port`)
pub fn parse_gateway_url(url: &str) -> Result<(String, u16), DomainError> {
    let without_scheme = url
        .strip_prefix("mqtt://")
        .or_else(|| url.strip_prefix("tcp://"))
        .unwrap_or(url);
    let authority = without_scheme
        .split('/')
        .next()
        .unwrap_or_default()
        .trim();

    let (host, port) = match authority.rsplit_once(':') {
        Some((host, port)) => {
            let port = port.parse::<u16>().map_err(|_| {
                DomainError::InvalidConfiguration(format!("invalid gateway port in \"{url}\""))
            })?;
            (host, port)
        }
        None => (authority, DEFAULT_MQTT_PORT),
    };

    if host.is_empty() {
        return Err(DomainError::InvalidConfiguration(format!(
            "missing gateway host in \"{url}\""
        )));
    }

    Ok((host.to_string(), port))
}

#[derive(Clone)]
pub struct MqttClient {
    client: AsyncClient,
    tx: broadcast::Sender<MqttMessage>,
    subscriptions: Arc<RwLock<Vec<String>>>,
    // Cancelled by close(); the event loop then drains and stops
    shutdown: CancellationToken,
    // Cancelled once the event loop has stopped for good
    closed: CancellationToken,
}

impl MqttClient {
    pub fn new(settings: &MqttSettings) -> Self {
        let mut mqttoptions =
            MqttOptions::new(&settings.client_id, &settings.host, settings.port);
        mqttoptions.set_keep_alive(Duration::from_secs(20));
        mqttoptions.set_credentials(&settings.username, &settings.password);
        mqttoptions.set_clean_session(false); // Persistent session for commands
        mqttoptions.set_manual_acks(true);

        let (client, eventloop) = AsyncClient::new(mqttoptions, 100);
        let (tx, _) = broadcast::channel(250);
        let mqtt_client = Self {
            client,
            tx,
            subscriptions: Arc::new(RwLock::new(Vec::new())),
            shutdown: CancellationToken::new(),
            closed: CancellationToken::new(),
        };

        let driver = mqtt_client.clone();
        let reconn_delay = settings.reconn_delay;
        let reconn_attempts = settings.reconn_attempts;
        let client_id = settings.client_id.clone();
        task::spawn(async move {
            driver
                .drive(eventloop, &client_id, reconn_delay, reconn_attempts)
                .await;
        });

        mqtt_client
    }

    async fn drive(
        &self,
        mut eventloop: EventLoop,
        client_id: &str,
        reconn_delay: Duration,
        reconn_attempts: u32,
    ) {
        let mut failures: u32 = 0;
        let mut connected_once = false;

        loop {
            let notification = tokio::select! {
                _ = self.shutdown.cancelled() => {
                    Self::drain(&mut eventloop, client_id).await;
                    break;
                }
                notification = eventloop.poll() => notification,
            };

            match notification {
                Ok(Event::Incoming(Packet::Publish(publish))) => {
                    let msg = MqttMessage {
                        topic: publish.topic,
                        payload: publish.payload.to_vec(),
                        pkid: publish.pkid,
                        qos: publish.qos,
                    };
                    if let Err(broadcast::error::SendError(returned_msg)) = self.tx.send(msg) {
                        warn!(
                            client_id,
                            topic = %returned_msg.topic,
                            "Dropped MQTT message because no internal subscribers are listening"
                        );
                    }
                }
                Ok(Event::Incoming(Packet::ConnAck(_))) => {
                    info!(client_id, "MQTT Connected");
                    failures = 0;
                    // Subscriptions made before the first ConnAck are still queued
                    if connected_once {
                        self.resubscribe(client_id);
                    }
                    connected_once = true;
                }
                Ok(_) => {}
                Err(e) => {
                    failures += 1;

                    if reconn_attempts > 0 && failures >= reconn_attempts {
                        error!(client_id, attempts = failures, "MQTT Connection error: {}. Giving up", e);
                        break;
                    }

                    warn!(
                        client_id,
                        attempt = failures,
                        retry_in_ms = reconn_delay.as_millis() as u64,
                        "MQTT Connection error: {}",
                        e
                    );
                    tokio::select! {
                        _ = self.shutdown.cancelled() => break,
                        _ = tokio::time::sleep(reconn_delay) => {}
                    }
                }
            }
        }

        self.closed.cancel();
        info!(client_id, "MQTT event loop stopped");
    }

    /// Flush queued requests up to and including the DISCONNECT
    async fn drain(eventloop: &mut EventLoop, client_id: &str) {
        let flushed = tokio::time::timeout(DISCONNECT_TIMEOUT, async {
            loop {
                match eventloop.poll().await {
                    Ok(Event::Outgoing(Outgoing::Disconnect)) => return true,
                    Ok(_) => {}
                    Err(_) => return false,
                }
            }
        })
        .await;

        match flushed {
            Ok(true) => debug!(client_id, "MQTT Disconnected"),
            Ok(false) => debug!(client_id, "MQTT session already down, nothing to flush"),
            Err(_) => warn!(client_id, "MQTT disconnect timed out"),
        }
    }

    fn resubscribe(&self, client_id: &str) {
        let subs = self
            .subscriptions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        if subs.is_empty() {
            return;
        }

        info!(client_id, "Re-subscribing to {} topics...", subs.len());
        for topic in subs {
            if let Err(e) = self.client.try_subscribe(&topic, QoS::AtLeastOnce) {
                error!(client_id, "Failed to re-subscribe to {}: {}", topic, e);
            }
        }
    }

    pub fn subscribe_messages(&self) -> broadcast::Receiver<MqttMessage> {
        self.tx.subscribe()
    }

    pub async fn subscribe(&self, topic: &str) -> Result<()> {
        {
            let mut subs = self
                .subscriptions
                .write()
                .unwrap_or_else(PoisonError::into_inner);
            if !subs.iter().any(|s| s == topic) {
                subs.push(topic.to_string());
            }
        }

        self.client
            .subscribe(topic, QoS::AtLeastOnce)
            .await
            .map_err(|e| anyhow!("Failed to subscribe to topic {}: {}", topic, e))?;
        Ok(())
    }

    /// Acknowledge a received message. QoS 0 deliveries carry no packet id
    /// and are never acknowledged.
    pub async fn ack(&self, msg: &MqttMessage) -> Result<()> {
        if msg.qos == QoS::AtMostOnce {
            return Ok(());
        }

        let publish = rumqttc::Publish {
            pkid: msg.pkid,
            topic: msg.topic.clone(),
            qos: msg.qos,
            payload: bytes::Bytes::new(),
            retain: false,
            dup: false,
        };

        self.client
            .ack(&publish)
            .await
            .map_err(|e| anyhow!("Failed to ack packet {}: {}", msg.pkid, e))
    }

    /// Resolves once the session has stopped (closed locally or gave up reconnecting)
    pub async fn closed(&self) {
        self.closed.cancelled().await
    }

    /// Request a clean disconnect. Requests queued before this call are
    /// still sent; await [`MqttClient::closed`] for the loop to finish.
    pub fn close(&self) {
        if let Err(e) = self.client.try_disconnect() {
            debug!("MQTT disconnect request not sent: {}", e);
        }
        self.shutdown.cancel();
    }
}

#[async_trait::async_trait]
impl MqttPublisherClient for MqttClient {
    async fn publish_bytes(
        &self,
        topic: &str,
        payload: &[u8],
        qos: QoS,
        retain: bool,
    ) -> Result<()> {
        // Never wait on a full request queue; callers may hold a plug lock
        self.client
            .try_publish(topic, qos, retain, payload)
            .map_err(|e| anyhow!("Failed to publish MQTT message: {}", e))?;
        Ok(())
    }
}
