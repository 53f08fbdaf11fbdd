//! Just enough MQTT 3.1.1 to publish sensor values.
//!
//! QoS 0 publishes, CONNECT with optional credentials, keepalive pings.
//! No subscriptions and no persistent sessions. The same session type backs
//! both the local broker publisher and the Adafruit IO publisher.

mod client;
pub mod packet;

use embassy_time::Duration;
use embedded_io_async::{ErrorKind, Read, ReadReady, Write};
use thiserror_no_std::Error;

pub use client::{ClientState, MqttClient};
pub use packet::ConnectReturnCode;

/// Standard unencrypted MQTT port.
pub const DEFAULT_PORT: u16 = 1883;

/// How long to wait for CONNACK, as in PubSubClient's `MQTT_SOCKET_TIMEOUT`.
pub const DEFAULT_RESPONSE_TIMEOUT: Duration = Duration::from_secs(15);

/// Where a transport should connect to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Host {
    Ip([u8; 4]),
    /// Resolved by the transport at `open` time.
    Name(&'static str),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Remote {
    pub host: Host,
    pub port: u16,
}

impl Remote {
    pub const fn ip(address: [u8; 4], port: u16) -> Self {
        Self {
            host: Host::Ip(address),
            port,
        }
    }

    pub const fn name(host: &'static str, port: u16) -> Self {
        Self {
            host: Host::Name(host),
            port,
        }
    }
}

/// CONNECT parameters that stay fixed for the life of a client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectOptions {
    pub keep_alive_secs: u16,
    pub username: Option<&'static str>,
    pub password: Option<&'static str>,
    /// Limit on the wait for the broker's CONNACK.
    pub response_timeout: Duration,
}

impl ConnectOptions {
    pub const fn anonymous(keep_alive_secs: u16) -> Self {
        Self {
            keep_alive_secs,
            username: None,
            password: None,
            response_timeout: DEFAULT_RESPONSE_TIMEOUT,
        }
    }

    pub const fn with_credentials(
        keep_alive_secs: u16,
        username: &'static str,
        password: &'static str,
    ) -> Self {
        Self {
            keep_alive_secs,
            username: Some(username),
            password: Some(password),
            response_timeout: DEFAULT_RESPONSE_TIMEOUT,
        }
    }

    pub const fn with_response_timeout(self, response_timeout: Duration) -> Self {
        Self {
            response_timeout,
            ..self
        }
    }
}

/// A byte stream the client can (re)open on demand, typically one TCP socket.
pub trait Transport: Read + Write + ReadReady {
    /// Connect to `remote`. Any previous connection must already be closed.
    fn open(&mut self, remote: &Remote) -> impl Future<Output = Result<(), Self::Error>>;

    /// Drop the connection. Must be safe to call when already closed.
    fn close(&mut self);

    /// Whether the peer can still be written to.
    fn is_open(&self) -> bool;
}

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum MqttError {
    #[error("transport error: {0:?}")]
    Transport(ErrorKind),
    #[error("connection closed by peer")]
    Closed,
    #[error("broker refused connection: {0:?}")]
    Refused(ConnectReturnCode),
    #[error("packet does not fit in {capacity} bytes")]
    BufferTooSmall { capacity: usize },
    #[error("malformed packet")]
    Malformed,
    #[error("unexpected packet type {0:#04x}")]
    Unexpected(u8),
    #[error("not connected")]
    NotConnected,
    #[error("no PINGRESP within the keepalive interval")]
    KeepAliveTimeout,
    #[error("no CONNACK within the response timeout")]
    ResponseTimeout,
}

impl MqttError {
    fn transport<E: embedded_io_async::Error>(e: E) -> Self {
        MqttError::Transport(e.kind())
    }
}
