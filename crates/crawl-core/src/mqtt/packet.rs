//! The MQTT 3.1.1 packets this client sends and receives.
//!
//! Wire encoding is done by `mqttrs`; this module only builds the few
//! packets a publish-only session needs and narrows what comes back to the
//! packets it acts on. Encoders write into caller-provided buffers and
//! return the packet length.

use log::debug;
use mqttrs::{Connack, Connect, Protocol, Publish, QosPid};

use super::{ConnectOptions, MqttError};

// ============================================================================
// CONNACK return codes
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ConnectReturnCode {
    Accepted = 0,
    UnacceptableProtocol = 1,
    IdentifierRejected = 2,
    ServerUnavailable = 3,
    BadCredentials = 4,
    NotAuthorized = 5,
}

impl From<mqttrs::ConnectReturnCode> for ConnectReturnCode {
    fn from(code: mqttrs::ConnectReturnCode) -> Self {
        match code {
            mqttrs::ConnectReturnCode::Accepted => Self::Accepted,
            mqttrs::ConnectReturnCode::RefusedProtocolVersion => Self::UnacceptableProtocol,
            mqttrs::ConnectReturnCode::RefusedIdentifierRejected => Self::IdentifierRejected,
            mqttrs::ConnectReturnCode::ServerUnavailable => Self::ServerUnavailable,
            mqttrs::ConnectReturnCode::BadUsernamePassword => Self::BadCredentials,
            mqttrs::ConnectReturnCode::NotAuthorized => Self::NotAuthorized,
        }
    }
}

// ============================================================================
// Inbound packets
// ============================================================================

/// The inbound packets a publish-only client cares about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Inbound {
    ConnAck {
        session_present: bool,
        code: ConnectReturnCode,
    },
    PingResp,
    /// Any other packet type, identified by its header byte.
    Other(u8),
}

/// Decode the packet at the start of `buf`.
///
/// Returns `Ok(None)` while `buf` holds only part of a packet.
pub fn decode(buf: &[u8]) -> Result<Option<Inbound>, MqttError> {
    let packet = match mqttrs::decode_slice(buf) {
        Ok(Some(packet)) => packet,
        Ok(None) => return Ok(None),
        Err(e) => {
            debug!("MQTT: undecodable packet: {:?}", e);
            return Err(MqttError::Malformed);
        }
    };

    Ok(Some(match packet {
        mqttrs::Packet::Connack(Connack {
            session_present,
            code,
        }) => Inbound::ConnAck {
            session_present,
            code: code.into(),
        },
        mqttrs::Packet::Pingresp => Inbound::PingResp,
        _ => Inbound::Other(buf[0]),
    }))
}

// ============================================================================
// Outbound packets
// ============================================================================

fn encode(packet: &mqttrs::Packet<'_>, buf: &mut [u8]) -> Result<usize, MqttError> {
    let capacity = buf.len();
    mqttrs::encode_slice(packet, buf).map_err(|e| match e {
        mqttrs::Error::WriteZero => MqttError::BufferTooSmall { capacity },
        _ => MqttError::Malformed,
    })
}

/// Encode a CONNECT packet with a clean session.
pub fn encode_connect(
    buf: &mut [u8],
    client_id: &str,
    options: &ConnectOptions,
) -> Result<usize, MqttError> {
    let connect = Connect {
        protocol: Protocol::MQTT311,
        keep_alive: options.keep_alive_secs,
        client_id,
        clean_session: true,
        last_will: None,
        username: options.username,
        password: options.password.map(str::as_bytes),
    };
    encode(&mqttrs::Packet::Connect(connect), buf)
}

/// Encode a QoS 0 PUBLISH packet.
pub fn encode_publish(
    buf: &mut [u8],
    topic: &str,
    payload: &[u8],
    retain: bool,
) -> Result<usize, MqttError> {
    let publish = Publish {
        dup: false,
        qospid: QosPid::AtMostOnce,
        retain,
        topic_name: topic,
        payload,
    };
    encode(&mqttrs::Packet::Publish(publish), buf)
}

pub fn encode_pingreq(buf: &mut [u8]) -> Result<usize, MqttError> {
    encode(&mqttrs::Packet::Pingreq, buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connect_anonymous() {
        let mut buf = [0u8; 64];
        let len = encode_connect(&mut buf, "Crawl Space", &ConnectOptions::anonymous(120)).unwrap();

        let mut expected = vec![0x10, 23, 0x00, 0x04];
        expected.extend_from_slice(b"MQTT");
        expected.extend_from_slice(&[0x04, 0x02, 0x00, 0x78, 0x00, 0x0B]);
        expected.extend_from_slice(b"Crawl Space");
        assert_eq!(&buf[..len], expected.as_slice());
    }

    #[test]
    fn test_connect_with_credentials() {
        let mut buf = [0u8; 64];
        let options = ConnectOptions::with_credentials(60, "user", "key");
        let len = encode_connect(&mut buf, "id", &options).unwrap();

        assert_eq!(buf[0], 0x10);
        assert_eq!(usize::from(buf[1]), len - 2);
        // flags: username | password | clean session
        assert_eq!(buf[9], 0xC2);
        assert_eq!(&buf[10..12], &[0x00, 60]);
        assert_eq!(&buf[len - 11..len], b"\x00\x04user\x00\x03key");
    }

    #[test]
    fn test_publish_qos0() {
        let mut buf = [0u8; 32];
        let len = encode_publish(&mut buf, "a/b", b"47.3", false).unwrap();
        assert_eq!(
            &buf[..len],
            &[0x30, 0x09, 0x00, 0x03, b'a', b'/', b'b', b'4', b'7', b'.', b'3']
        );
    }

    #[test]
    fn test_publish_reports_small_buffer() {
        let mut buf = [0u8; 8];
        assert_eq!(
            encode_publish(&mut buf, "crawlspace/dht22/humidity", b"47.3", false),
            Err(MqttError::BufferTooSmall { capacity: 8 })
        );
    }

    #[test]
    fn test_long_topic_uses_two_byte_length() {
        let topic = "t".repeat(130);
        let mut buf = [0u8; 160];
        let len = encode_publish(&mut buf, &topic, b"1.0", false).unwrap();

        // 2 + 130 + 3 = 135 = 0x87 0x01
        assert_eq!(&buf[..3], &[0x30, 0x87, 0x01]);
        assert_eq!(len, 3 + 135);
    }

    #[test]
    fn test_pingreq() {
        let mut buf = [0u8; 4];
        let len = encode_pingreq(&mut buf).unwrap();
        assert_eq!(&buf[..len], &[0xC0, 0x00]);
    }

    #[test]
    fn test_decode_connack() {
        assert_eq!(
            decode(&[0x20, 0x02, 0x00, 0x00]),
            Ok(Some(Inbound::ConnAck {
                session_present: false,
                code: ConnectReturnCode::Accepted
            }))
        );
        assert_eq!(
            decode(&[0x20, 0x02, 0x00, 0x05]),
            Ok(Some(Inbound::ConnAck {
                session_present: false,
                code: ConnectReturnCode::NotAuthorized
            }))
        );
        assert_eq!(decode(&[0x20, 0x02, 0x00, 0x06]), Err(MqttError::Malformed));
    }

    #[test]
    fn test_decode_waits_for_whole_packet() {
        assert_eq!(decode(&[0x20]), Ok(None));
        assert_eq!(decode(&[0x20, 0x02, 0x00]), Ok(None));
        assert_eq!(decode(&[0xD0]), Ok(None));
    }

    #[test]
    fn test_decode_other_packets() {
        assert_eq!(decode(&[0xD0, 0x00]), Ok(Some(Inbound::PingResp)));
        assert_eq!(
            decode(b"\x30\x04\x00\x01tx"),
            Ok(Some(Inbound::Other(0x30)))
        );
    }
}
