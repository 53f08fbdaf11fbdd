//! MQTT transport over an embassy-net TCP socket
//!
//! [`TcpTransport`] owns one socket for the lifetime of the firmware and
//! reconnects it in place whenever the MQTT session asks for it. Host names
//! are resolved through the stack's DNS client on every open, so a broker
//! that moves is picked up on the next reconnect.

use core::fmt;

use crawl_core::mqtt::{Host, Remote, Transport};
use embassy_net::dns::DnsQueryType;
use embassy_net::tcp::{ConnectError, State, TcpSocket};
use embassy_net::{IpAddress, IpEndpoint, Stack};
use embassy_time::{Duration, with_timeout};
use embedded_io_async::{ErrorKind, ErrorType, Read, ReadReady, Write};
use log::{error, info};

/// Idle time after which the stack gives up on an unresponsive peer.
const SOCKET_TIMEOUT: Duration = Duration::from_secs(15);
const CONNECT_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportError {
    /// No IPv4 configuration yet.
    NetworkDown,
    Dns,
    Connect(ConnectError),
    Timeout,
    Io(embassy_net::tcp::Error),
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NetworkDown => write!(f, "network is down"),
            Self::Dns => write!(f, "DNS lookup failed"),
            Self::Connect(e) => write!(f, "TCP connect failed: {:?}", e),
            Self::Timeout => write!(f, "TCP connect timed out"),
            Self::Io(e) => write!(f, "TCP I/O failed: {:?}", e),
        }
    }
}

impl core::error::Error for TransportError {}

impl embedded_io_async::Error for TransportError {
    fn kind(&self) -> ErrorKind {
        match self {
            Self::NetworkDown | Self::Dns => ErrorKind::NotConnected,
            Self::Connect(_) => ErrorKind::ConnectionRefused,
            Self::Timeout => ErrorKind::TimedOut,
            Self::Io(_) => ErrorKind::ConnectionReset,
        }
    }
}

pub struct TcpTransport<'a> {
    stack: Stack<'a>,
    socket: TcpSocket<'a>,
}

impl<'a> TcpTransport<'a> {
    pub fn new(stack: Stack<'a>, rx_buffer: &'a mut [u8], tx_buffer: &'a mut [u8]) -> Self {
        let mut socket = TcpSocket::new(stack, rx_buffer, tx_buffer);
        socket.set_timeout(Some(SOCKET_TIMEOUT));
        Self { stack, socket }
    }

    async fn resolve(&self, remote: &Remote) -> Result<IpEndpoint, TransportError> {
        let address = match remote.host {
            Host::Ip([a, b, c, d]) => IpAddress::v4(a, b, c, d),
            Host::Name(name) => self
                .stack
                .dns_query(name, DnsQueryType::A)
                .await
                .map_err(|e| {
                    error!("DNS query for {} failed: {:?}", name, e);
                    TransportError::Dns
                })?
                .first()
                .copied()
                .ok_or_else(|| {
                    error!("DNS returned no results for {}", name);
                    TransportError::Dns
                })?,
        };
        Ok(IpEndpoint::new(address, remote.port))
    }
}

impl ErrorType for TcpTransport<'_> {
    type Error = TransportError;
}

impl Read for TcpTransport<'_> {
    async fn read(&mut self, buf: &mut [u8]) -> Result<usize, TransportError> {
        self.socket.read(buf).await.map_err(TransportError::Io)
    }
}

impl ReadReady for TcpTransport<'_> {
    fn read_ready(&mut self) -> Result<bool, TransportError> {
        Ok(self.socket.can_recv())
    }
}

impl Write for TcpTransport<'_> {
    async fn write(&mut self, buf: &[u8]) -> Result<usize, TransportError> {
        self.socket.write(buf).await.map_err(TransportError::Io)
    }

    async fn flush(&mut self) -> Result<(), TransportError> {
        self.socket.flush().await.map_err(TransportError::Io)
    }
}

impl Transport for TcpTransport<'_> {
    async fn open(&mut self, remote: &Remote) -> Result<(), TransportError> {
        // A half-closed socket from the previous session can't connect again
        if self.socket.state() != State::Closed {
            self.socket.abort();
            let _ = self.socket.flush().await;
        }

        if !self.stack.is_config_up() {
            return Err(TransportError::NetworkDown);
        }

        let endpoint = self.resolve(remote).await?;
        match with_timeout(CONNECT_TIMEOUT, self.socket.connect(endpoint)).await {
            Ok(Ok(())) => {
                info!("TCP connected to {}", endpoint);
                Ok(())
            }
            Ok(Err(e)) => {
                error!("TCP connect to {} failed: {:?}", endpoint, e);
                Err(TransportError::Connect(e))
            }
            Err(_) => {
                error!("TCP connect to {} timed out", endpoint);
                self.socket.abort();
                Err(TransportError::Timeout)
            }
        }
    }

    fn close(&mut self) {
        self.socket.close();
    }

    fn is_open(&self) -> bool {
        self.socket.may_send()
    }
}
