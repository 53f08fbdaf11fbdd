use embassy_time::with_timeout;
use embedded_io_async::{ErrorKind, Read, ReadExactError, Write};
use log::{debug, info, warn};

use super::packet::{self, ConnectReturnCode, Inbound};
use super::{ConnectOptions, MqttError, Remote, Transport};

const TX_CAPACITY: usize = 256;
const RX_CAPACITY: usize = 128;

/// Session state, numbered like PubSubClient's `state()` so the codes in
/// logs mean the same thing they always did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i8)]
pub enum ClientState {
    ConnectionTimeout = -4,
    ConnectionLost = -3,
    ConnectFailed = -2,
    Disconnected = -1,
    Connected = 0,
    BadProtocol = 1,
    BadClientId = 2,
    Unavailable = 3,
    BadCredentials = 4,
    Unauthorized = 5,
}

impl ClientState {
    pub const fn code(self) -> i32 {
        self as i32
    }

    const fn refused(code: ConnectReturnCode) -> Self {
        match code {
            ConnectReturnCode::Accepted => ClientState::Connected,
            ConnectReturnCode::UnacceptableProtocol => ClientState::BadProtocol,
            ConnectReturnCode::IdentifierRejected => ClientState::BadClientId,
            ConnectReturnCode::ServerUnavailable => ClientState::Unavailable,
            ConnectReturnCode::BadCredentials => ClientState::BadCredentials,
            ConnectReturnCode::NotAuthorized => ClientState::Unauthorized,
        }
    }
}

/// A publish-only MQTT 3.1.1 session over one [`Transport`].
pub struct MqttClient<T> {
    transport: T,
    remote: Remote,
    options: ConnectOptions,
    state: ClientState,
    ping_outstanding: bool,
    rx: [u8; RX_CAPACITY],
}

impl<T: Transport> MqttClient<T> {
    pub fn new(transport: T, remote: Remote, options: ConnectOptions) -> Self {
        Self {
            transport,
            remote,
            options,
            state: ClientState::Disconnected,
            ping_outstanding: false,
            rx: [0; RX_CAPACITY],
        }
    }

    pub fn state(&self) -> ClientState {
        self.state
    }

    pub fn remote(&self) -> &Remote {
        &self.remote
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Whether the session is up. Notices a transport the peer has closed.
    pub fn connected(&mut self) -> bool {
        if self.state == ClientState::Connected && !self.transport.is_open() {
            warn!("MQTT: connection to {:?} lost", self.remote.host);
            self.state = ClientState::ConnectionLost;
        }
        self.state == ClientState::Connected
    }

    /// Open the transport, send CONNECT and wait for CONNACK.
    pub async fn connect(&mut self, client_id: &str) -> Result<(), MqttError> {
        self.transport.close();
        self.ping_outstanding = false;

        if let Err(e) = self.transport.open(&self.remote).await {
            let e = MqttError::transport(e);
            warn!("MQTT: cannot reach {:?}:{}: {}", self.remote.host, self.remote.port, e);
            self.state = ClientState::ConnectFailed;
            return Err(e);
        }

        match self.handshake(client_id).await {
            Ok(()) => {
                info!("MQTT: connected to {:?} as {}", self.remote.host, client_id);
                self.state = ClientState::Connected;
                Ok(())
            }
            Err(e) => {
                warn!("MQTT: connect as {} failed: {}", client_id, e);
                self.transport.close();
                self.state = match e {
                    MqttError::Refused(code) => ClientState::refused(code),
                    MqttError::ResponseTimeout | MqttError::Transport(ErrorKind::TimedOut) => {
                        ClientState::ConnectionTimeout
                    }
                    _ => ClientState::ConnectFailed,
                };
                Err(e)
            }
        }
    }

    async fn handshake(&mut self, client_id: &str) -> Result<(), MqttError> {
        let mut tx = [0u8; TX_CAPACITY];
        let len = packet::encode_connect(&mut tx, client_id, &self.options)?;
        self.send(&tx[..len]).await?;

        let reply = with_timeout(self.options.response_timeout, self.read_packet())
            .await
            .map_err(|_| MqttError::ResponseTimeout)??;
        match reply {
            Inbound::ConnAck {
                code: ConnectReturnCode::Accepted,
                ..
            } => Ok(()),
            Inbound::ConnAck { code, .. } => Err(MqttError::Refused(code)),
            Inbound::PingResp | Inbound::Other(_) => Err(MqttError::Unexpected(self.rx[0])),
        }
    }

    /// QoS 0 publish. A failed write drops the session.
    pub async fn publish(&mut self, topic: &str, payload: &[u8]) -> Result<(), MqttError> {
        if !self.connected() {
            return Err(MqttError::NotConnected);
        }

        let mut tx = [0u8; TX_CAPACITY];
        let len = packet::encode_publish(&mut tx, topic, payload, false)?;
        if let Err(e) = self.send(&tx[..len]).await {
            self.lost();
            return Err(e);
        }
        debug!("MQTT: published {} bytes to {}", payload.len(), topic);
        Ok(())
    }

    /// Send PINGREQ. If the previous one was never answered the session is
    /// considered dead.
    pub async fn ping(&mut self) -> Result<(), MqttError> {
        if !self.connected() {
            return Err(MqttError::NotConnected);
        }
        if self.ping_outstanding {
            warn!("MQTT: no PINGRESP from {:?}", self.remote.host);
            self.transport.close();
            self.ping_outstanding = false;
            self.state = ClientState::ConnectionTimeout;
            return Err(MqttError::KeepAliveTimeout);
        }
        let mut tx = [0u8; 2];
        let len = packet::encode_pingreq(&mut tx)?;
        if let Err(e) = self.send(&tx[..len]).await {
            self.lost();
            return Err(e);
        }
        self.ping_outstanding = true;
        Ok(())
    }

    /// Read and handle everything that has already arrived, without waiting.
    pub async fn poll(&mut self) -> Result<(), MqttError> {
        if !self.connected() {
            return Err(MqttError::NotConnected);
        }

        loop {
            match self.transport.read_ready() {
                Ok(true) => {}
                Ok(false) => return Ok(()),
                Err(e) => {
                    self.lost();
                    return Err(MqttError::transport(e));
                }
            }

            match self.read_packet().await {
                Ok(Inbound::PingResp) => self.ping_outstanding = false,
                Ok(other) => debug!("MQTT: ignoring {:?}", other),
                Err(e) => {
                    self.lost();
                    return Err(e);
                }
            }
        }
    }

    fn lost(&mut self) {
        self.transport.close();
        self.ping_outstanding = false;
        self.state = ClientState::ConnectionLost;
    }

    async fn send(&mut self, bytes: &[u8]) -> Result<(), MqttError> {
        self.transport
            .write_all(bytes)
            .await
            .map_err(MqttError::transport)?;
        self.transport.flush().await.map_err(MqttError::transport)
    }

    /// Read one whole packet into `rx`, a byte at a time so nothing past
    /// its end is consumed.
    async fn read_packet(&mut self) -> Result<Inbound, MqttError> {
        let mut len = 0;
        loop {
            if len == RX_CAPACITY {
                return Err(MqttError::BufferTooSmall {
                    capacity: RX_CAPACITY,
                });
            }
            read_exact(&mut self.transport, &mut self.rx[len..=len]).await?;
            len += 1;
            if let Some(packet) = packet::decode(&self.rx[..len])? {
                return Ok(packet);
            }
        }
    }
}

async fn read_exact<T: Read>(transport: &mut T, buf: &mut [u8]) -> Result<(), MqttError> {
    transport.read_exact(buf).await.map_err(|e| match e {
        ReadExactError::UnexpectedEof => MqttError::Closed,
        ReadExactError::Other(e) => MqttError::transport(e),
    })
}
