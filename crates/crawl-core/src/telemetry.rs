//! Publishing to Adafruit IO feeds.
//!
//! [`AdafruitIo`] speaks plain MQTT to `io.adafruit.com` with the account
//! name and AIO key as credentials. A feed `name` lives at the topic
//! `{username}/feeds/{name}` and takes the value as decimal text.

use core::fmt::Write;

use log::{info, warn};
use thiserror_no_std::Error;

use crate::config::CloudConfig;
use crate::mqtt::{ConnectReturnCode, MqttClient, MqttError, Transport};
use crate::units;

const TOPIC_CAPACITY: usize = 96;

/// Connection status, numbered like the Adafruit IO Arduino library.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum TelemetryStatus {
    Idle = 0,
    NetDisconnected = 1,
    Disconnected = 2,
    NetConnectFailed = 10,
    ConnectFailed = 11,
    AuthFailed = 13,
    NetConnected = 20,
    Connected = 21,
}

impl TelemetryStatus {
    pub const fn code(self) -> u8 {
        self as u8
    }

    pub const fn is_connected(self) -> bool {
        matches!(self, TelemetryStatus::Connected)
    }

    pub const fn text(self) -> &'static str {
        match self {
            TelemetryStatus::Idle => "Idle. Waiting for connect to be called...",
            TelemetryStatus::NetDisconnected => "Network disconnected.",
            TelemetryStatus::Disconnected => "Disconnected from Adafruit IO.",
            TelemetryStatus::NetConnectFailed => "Network connection failed.",
            TelemetryStatus::ConnectFailed => "Adafruit IO connection failed.",
            TelemetryStatus::AuthFailed => "Adafruit IO authentication failed.",
            TelemetryStatus::NetConnected => "Network connected.",
            TelemetryStatus::Connected => "Adafruit IO connected.",
        }
    }
}

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum TelemetryError {
    #[error("not connected to Adafruit IO")]
    NotConnected,
    #[error("refusing to publish a non-finite value")]
    InvalidValue,
    #[error("feed topic does not fit the topic buffer")]
    TopicTooLong,
    #[error("feed publish failed: {0}")]
    Publish(#[from] MqttError),
}

/// A managed connection to a cloud dashboard.
pub trait TelemetrySink {
    /// Start connecting. Completion is observed through [`status`](Self::status).
    fn connect(&mut self) -> impl Future<Output = ()>;

    fn status(&self) -> TelemetryStatus;

    fn status_text(&self) -> &'static str {
        self.status().text()
    }

    /// Service the connection. Call once per loop iteration; reconnects a
    /// dropped session.
    fn run(&mut self) -> impl Future<Output = TelemetryStatus>;

    /// Send one value to a feed.
    fn save(
        &mut self,
        feed: &str,
        value: f32,
    ) -> impl Future<Output = Result<(), TelemetryError>>;
}

pub struct AdafruitIo<T> {
    client: MqttClient<T>,
    client_id: &'static str,
    username: &'static str,
    status: TelemetryStatus,
}

impl<T: Transport> AdafruitIo<T> {
    pub fn new(
        transport: T,
        config: &CloudConfig,
        client_id: &'static str,
        username: &'static str,
        key: &'static str,
    ) -> Self {
        Self {
            client: MqttClient::new(
                transport,
                config.remote(),
                config.connect_options(username, key),
            ),
            client_id,
            username,
            status: TelemetryStatus::Idle,
        }
    }

    pub fn client(&self) -> &MqttClient<T> {
        &self.client
    }

    /// `{username}/feeds/{feed}`
    pub fn feed_topic(
        &self,
        feed: &str,
    ) -> Result<heapless::String<TOPIC_CAPACITY>, TelemetryError> {
        let mut topic = heapless::String::new();
        write!(topic, "{}/feeds/{}", self.username, feed)
            .map_err(|_| TelemetryError::TopicTooLong)?;
        Ok(topic)
    }

    async fn attempt(&mut self) {
        self.status = match self.client.connect(self.client_id).await {
            Ok(()) => TelemetryStatus::Connected,
            Err(MqttError::Refused(
                ConnectReturnCode::BadCredentials | ConnectReturnCode::NotAuthorized,
            )) => TelemetryStatus::AuthFailed,
            Err(MqttError::Transport(_) | MqttError::Closed) => TelemetryStatus::NetConnectFailed,
            Err(_) => TelemetryStatus::ConnectFailed,
        };
        info!("Adafruit IO: {}", self.status.text());
    }

    fn dropped(&mut self) {
        if self.status.is_connected() {
            warn!("Adafruit IO: connection dropped");
        }
        self.status = TelemetryStatus::Disconnected;
    }
}

impl<T: Transport> TelemetrySink for AdafruitIo<T> {
    async fn connect(&mut self) {
        info!("Connecting to Adafruit IO as {}", self.username);
        self.status = TelemetryStatus::NetConnected;
        self.attempt().await;
    }

    fn status(&self) -> TelemetryStatus {
        self.status
    }

    async fn run(&mut self) -> TelemetryStatus {
        if !self.client.connected() {
            self.dropped();
            self.attempt().await;
            return self.status;
        }

        let serviced = match self.client.poll().await {
            Ok(()) => self.client.ping().await,
            Err(e) => Err(e),
        };
        if let Err(e) = serviced {
            warn!("Adafruit IO: keepalive failed: {}", e);
            self.dropped();
        }
        self.status
    }

    async fn save(&mut self, feed: &str, value: f32) -> Result<(), TelemetryError> {
        if !value.is_finite() {
            return Err(TelemetryError::InvalidValue);
        }
        if !self.client.connected() {
            self.dropped();
            return Err(TelemetryError::NotConnected);
        }

        let topic = self.feed_topic(feed)?;
        let payload = units::payload(value);
        if let Err(e) = self.client.publish(&topic, payload.as_bytes()).await {
            warn!("Adafruit IO: save to {} failed: {}", feed, e);
            if !self.client.connected() {
                self.dropped();
            }
            return Err(e.into());
        }
        info!("Adafruit IO: {} <- {}", feed, payload);
        Ok(())
    }
}
