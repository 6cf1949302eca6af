//! MQTT command publisher.
//!
//! Renders each [`DeviceCommand`] into its topic and payload and hands the
//! pair to a [`MessageTransport`]. [`BrokerTransport`] talks to a real
//! broker through `rumqttc`; [`LogTransport`] stands in for it when no
//! broker is configured.
//!
//! | Command          | Topic                          | Payload                         |
//! |------------------|--------------------------------|---------------------------------|
//! | actuator switch  | `farm/{device}/{module}`       | `{"command":"on","status":1}`   |
//! | photo capture    | `farm/{device}/camera-command` | `capture`                       |
//!
//! The broker session also carries the sensor node's readings inbound on
//! the configured sensor topic, and a retained `online`/`offline` flag on
//! `farm/{device}/status`.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use log::{debug, error, info, warn};
use rumqttc::{Client, Connection, Event, LastWill, MqttOptions, Packet};

pub use rumqttc::QoS;

use crate::app::ports::{CommandPublisher, PublishError};
use crate::config::ControlConfig;
use crate::model::DeviceCommand;

/// Outgoing requests buffered between the control loop and the connection.
const REQUEST_CAPACITY: usize = 32;
const KEEP_ALIVE: Duration = Duration::from_secs(30);
const RECONNECT_DELAY: Duration = Duration::from_secs(2);

/// Byte pipe to a broker.
pub trait MessageTransport {
    fn send(&mut self, topic: &str, payload: &str, qos: QoS) -> Result<(), PublishError>;

    fn is_connected(&self) -> bool {
        true
    }
}

/// [`CommandPublisher`] over any [`MessageTransport`]. Commands go out
/// at least once; they are idempotent, so duplicates are harmless.
#[derive(Debug)]
pub struct MqttCommandPublisher<T: MessageTransport> {
    transport: T,
    sent: u64,
}

impl<T: MessageTransport> MqttCommandPublisher<T> {
    pub fn new(transport: T) -> Self {
        Self { transport, sent: 0 }
    }

    /// Messages accepted by the transport so far.
    pub fn sent(&self) -> u64 {
        self.sent
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }
}

impl<T: MessageTransport> CommandPublisher for MqttCommandPublisher<T> {
    fn publish(&mut self, device_id: &str, command: &DeviceCommand) -> Result<(), PublishError> {
        if !self.transport.is_connected() {
            return Err(PublishError::NotConnected);
        }
        let topic = command.topic(device_id);
        let payload = command.payload();
        self.transport.send(&topic, &payload, QoS::AtLeastOnce)?;
        self.sent += 1;
        debug!("MQTT: {} <- {}", topic, payload);
        Ok(())
    }
}

// ───────────────────────────────────────────────────────────────
// Broker transport
// ───────────────────────────────────────────────────────────────

fn status_topic(device_id: &str) -> String {
    format!("farm/{}/status", device_id)
}

/// Transport backed by a `rumqttc` client.
///
/// Publishing never blocks the control loop: a full request buffer or a
/// dropped session fails the send, and the next tick republishes.
pub struct BrokerTransport {
    client: Client,
    connected: Arc<AtomicBool>,
}

impl BrokerTransport {
    /// Open a session to the broker named in `config`.
    ///
    /// Nothing reaches the broker until the returned [`BrokerSession`] is
    /// run, normally on its own thread.
    pub fn connect(config: &ControlConfig) -> (Self, BrokerSession) {
        let client_id = format!("greenhouse-{}", config.device_id);
        let mut options = MqttOptions::new(client_id, config.mqtt_host.clone(), config.mqtt_port);
        options.set_keep_alive(KEEP_ALIVE);
        options.set_last_will(LastWill::new(
            status_topic(&config.device_id),
            b"offline".to_vec(),
            QoS::AtLeastOnce,
            true,
        ));

        let (client, connection) = Client::new(options, REQUEST_CAPACITY);
        let connected = Arc::new(AtomicBool::new(false));
        info!(
            "MQTT: broker {}:{}, sensor topic '{}'",
            config.mqtt_host, config.mqtt_port, config.sensor_topic
        );

        let session = BrokerSession {
            client: client.clone(),
            connection,
            connected: Arc::clone(&connected),
            sensor_topic: config.sensor_topic.clone(),
            status_topic: status_topic(&config.device_id),
        };
        (Self { client, connected }, session)
    }
}

impl MessageTransport for BrokerTransport {
    fn send(&mut self, topic: &str, payload: &str, qos: QoS) -> Result<(), PublishError> {
        self.client
            .try_publish(topic, qos, false, payload.as_bytes())
            .map_err(|e| {
                warn!("MQTT: publish to {} refused: {}", topic, e);
                PublishError::Rejected
            })
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }
}

/// The network side of a [`BrokerTransport`]: drives the connection,
/// reconnects, and hands sensor payloads to a callback.
pub struct BrokerSession {
    client: Client,
    connection: Connection,
    connected: Arc<AtomicBool>,
    sensor_topic: String,
    status_topic: String,
}

impl BrokerSession {
    /// Drive the session for the life of the process, reconnecting after
    /// errors. Each message on the sensor topic is passed to
    /// `on_sensor_payload` as UTF-8 text.
    pub fn run(mut self, mut on_sensor_payload: impl FnMut(&str)) {
        for notification in self.connection.iter() {
            match notification {
                Ok(Event::Incoming(Packet::ConnAck(_))) => {
                    self.connected.store(true, Ordering::SeqCst);
                    info!("MQTT: connected");
                    // Subscriptions do not survive a clean session; renew on every connect.
                    let topic = self.sensor_topic.as_str();
                    if let Err(e) = self.client.try_subscribe(topic, QoS::AtLeastOnce) {
                        error!("MQTT: subscribe to {} failed: {}", topic, e);
                    }
                    let status = self.status_topic.as_str();
                    if let Err(e) = self.client.try_publish(status, QoS::AtLeastOnce, true, "online") {
                        warn!("MQTT: online status not sent: {}", e);
                    }
                }
                Ok(Event::Incoming(Packet::Publish(msg))) if msg.topic == self.sensor_topic => {
                    match std::str::from_utf8(&msg.payload) {
                        Ok(text) => on_sensor_payload(text),
                        Err(_) => warn!("MQTT: non-UTF-8 payload on {}", msg.topic),
                    }
                }
                Ok(Event::Incoming(Packet::Disconnect)) => {
                    self.connected.store(false, Ordering::SeqCst);
                    warn!("MQTT: disconnected by broker");
                }
                Ok(_) => {}
                Err(e) => {
                    if self.connected.swap(false, Ordering::SeqCst) {
                        error!("MQTT: connection lost: {}", e);
                    } else {
                        debug!("MQTT: connect failed: {}", e);
                    }
                    thread::sleep(RECONNECT_DELAY);
                }
            }
        }
        info!("MQTT: session closed");
    }
}

/// Transport that writes every message to the log.
#[derive(Debug, Default)]
pub struct LogTransport;

impl MessageTransport for LogTransport {
    fn send(&mut self, topic: &str, payload: &str, qos: QoS) -> Result<(), PublishError> {
        info!("PUB   | {} {} ({:?})", topic, payload, qos);
        Ok(())
    }
}
