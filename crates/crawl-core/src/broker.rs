//! Publishing to the local MQTT broker.
//!
//! [`BrokerPublisher`] tracks the connection as a small state machine and
//! owns the reconnect procedure: connect, and on failure log the client's
//! diagnostic state code, wait a fixed delay and try again. The liveness
//! check is explicit and happens once per loop iteration, never in the
//! background.

use embassy_time::Duration;
use embedded_hal_async::delay::DelayNs;
use log::{info, warn};
use thiserror_no_std::Error;

use crate::config::millis;
use crate::mqtt::{MqttClient, MqttError, Transport};

/// Client side of a broker session.
pub trait BrokerSink {
    type Error: core::fmt::Debug;

    fn connect(&mut self, client_id: &str) -> impl Future<Output = Result<(), Self::Error>>;

    fn connected(&mut self) -> bool;

    /// PubSubClient-style diagnostic code: 0 connected, negative for
    /// transport trouble, 1..=5 for CONNACK refusals.
    fn state(&self) -> i32;

    fn publish(
        &mut self,
        topic: &str,
        payload: &str,
    ) -> impl Future<Output = Result<(), Self::Error>>;
}

impl<T: Transport> BrokerSink for MqttClient<T> {
    type Error = MqttError;

    async fn connect(&mut self, client_id: &str) -> Result<(), MqttError> {
        MqttClient::connect(self, client_id).await
    }

    fn connected(&mut self) -> bool {
        MqttClient::connected(self)
    }

    fn state(&self) -> i32 {
        MqttClient::state(self).code()
    }

    async fn publish(&mut self, topic: &str, payload: &str) -> Result<(), MqttError> {
        MqttClient::publish(self, topic, payload.as_bytes()).await
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
}

/// How hard [`BrokerPublisher::ensure_connected`] tries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    /// `None` retries until the broker answers.
    pub max_attempts: Option<u32>,
    /// Fixed pause between attempts. No backoff.
    pub delay: Duration,
}

impl ReconnectPolicy {
    pub const fn unbounded(delay: Duration) -> Self {
        Self {
            max_attempts: None,
            delay,
        }
    }

    pub const fn bounded(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts: Some(max_attempts),
            delay,
        }
    }
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self::unbounded(Duration::from_secs(5))
    }
}

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum BrokerError {
    #[error("not connected to the MQTT broker")]
    NotConnected,
    #[error("gave up connecting to the MQTT broker after {attempts} attempts")]
    RetriesExhausted { attempts: u32 },
    #[error("publish to the MQTT broker failed")]
    PublishFailed,
}

pub struct BrokerPublisher<B> {
    sink: B,
    client_id: &'static str,
    policy: ReconnectPolicy,
    state: ConnectionState,
}

impl<B: BrokerSink> BrokerPublisher<B> {
    pub fn new(sink: B, client_id: &'static str, policy: ReconnectPolicy) -> Self {
        Self {
            sink,
            client_id,
            policy,
            state: ConnectionState::Disconnected,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn sink(&self) -> &B {
        &self.sink
    }

    /// Re-check the session and fall back to `Disconnected` if it dropped.
    pub fn refresh(&mut self) -> ConnectionState {
        if self.state == ConnectionState::Connected && !self.sink.connected() {
            warn!("MQTT broker connection lost, state={}", self.sink.state());
            self.state = ConnectionState::Disconnected;
        }
        self.state
    }

    /// Block until connected, or until the policy's attempts run out.
    pub async fn ensure_connected<D: DelayNs>(&mut self, delay: &mut D) -> Result<(), BrokerError> {
        if self.refresh() == ConnectionState::Connected {
            return Ok(());
        }

        let mut attempts = 0;
        loop {
            attempts += 1;
            self.state = ConnectionState::Connecting;
            info!("Establishing MQTT connection...");

            match self.sink.connect(self.client_id).await {
                Ok(()) => {
                    self.state = ConnectionState::Connected;
                    info!("MQTT broker connected");
                    return Ok(());
                }
                Err(e) => {
                    self.state = ConnectionState::Disconnected;
                    warn!(
                        "Error connecting to MQTT broker. error={} ({:?})",
                        self.sink.state(),
                        e
                    );
                }
            }

            if self.policy.max_attempts.is_some_and(|max| attempts >= max) {
                return Err(BrokerError::RetriesExhausted { attempts });
            }

            info!("Retrying in {} ms", millis(self.policy.delay));
            delay.delay_ms(millis(self.policy.delay)).await;
        }
    }

    /// Publish one value. Failures are reported, never retried.
    pub async fn publish(&mut self, topic: &str, payload: &str) -> Result<(), BrokerError> {
        if self.refresh() != ConnectionState::Connected {
            return Err(BrokerError::NotConnected);
        }

        match self.sink.publish(topic, payload).await {
            Ok(()) => {
                info!("Published {}: {}", topic, payload);
                Ok(())
            }
            Err(e) => {
                warn!("Publish to {} failed: {:?}", topic, e);
                self.refresh();
                Err(BrokerError::PublishFailed)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::RecordingDelay;
    use embassy_futures::block_on;
    use std::collections::VecDeque;

    #[derive(Default)]
    struct FakeBroker {
        /// Scripted connect outcomes; success once exhausted.
        connect_results: VecDeque<bool>,
        connects: Vec<String>,
        up: bool,
        fail_publish: bool,
        published: Vec<(String, String)>,
    }

    impl BrokerSink for FakeBroker {
        type Error = ();

        async fn connect(&mut self, client_id: &str) -> Result<(), ()> {
            self.connects.push(client_id.to_string());
            self.up = self.connect_results.pop_front().unwrap_or(true);
            if self.up { Ok(()) } else { Err(()) }
        }

        fn connected(&mut self) -> bool {
            self.up
        }

        fn state(&self) -> i32 {
            if self.up { 0 } else { -2 }
        }

        async fn publish(&mut self, topic: &str, payload: &str) -> Result<(), ()> {
            if self.fail_publish {
                self.up = false;
                return Err(());
            }
            self.published.push((topic.to_string(), payload.to_string()));
            Ok(())
        }
    }

    fn publisher(broker: FakeBroker, policy: ReconnectPolicy) -> BrokerPublisher<FakeBroker> {
        BrokerPublisher::new(broker, "Crawl Space", policy)
    }

    #[test]
    fn test_reconnect_retries_with_fixed_delay() {
        let broker = FakeBroker {
            connect_results: VecDeque::from([false, false]),
            ..Default::default()
        };
        let mut publisher = publisher(broker, ReconnectPolicy::default());
        let mut delay = RecordingDelay::default();

        block_on(publisher.ensure_connected(&mut delay)).unwrap();

        assert_eq!(publisher.sink().connects.len(), 3);
        assert!(publisher.sink().connects.iter().all(|id| id == "Crawl Space"));
        assert_eq!(delay.calls_ms, [5000, 5000]);
        assert_eq!(publisher.state(), ConnectionState::Connected);
    }

    #[test]
    fn test_bounded_policy_gives_up() {
        let broker = FakeBroker {
            connect_results: VecDeque::from([false, false, false]),
            ..Default::default()
        };
        let policy = ReconnectPolicy::bounded(2, Duration::from_millis(250));
        let mut publisher = publisher(broker, policy);
        let mut delay = RecordingDelay::default();

        let result = block_on(publisher.ensure_connected(&mut delay));

        assert_eq!(result, Err(BrokerError::RetriesExhausted { attempts: 2 }));
        assert_eq!(publisher.sink().connects.len(), 2);
        assert_eq!(delay.calls_ms, [250]);
        assert_eq!(publisher.state(), ConnectionState::Disconnected);
    }

    #[test]
    fn test_connected_session_is_not_reopened() {
        let mut publisher = publisher(FakeBroker::default(), ReconnectPolicy::default());
        let mut delay = RecordingDelay::default();

        block_on(publisher.ensure_connected(&mut delay)).unwrap();
        block_on(publisher.ensure_connected(&mut delay)).unwrap();

        assert_eq!(publisher.sink().connects.len(), 1);
        assert!(delay.calls_ms.is_empty());
    }

    #[test]
    fn test_publish_refused_while_disconnected() {
        let mut publisher = publisher(FakeBroker::default(), ReconnectPolicy::default());

        let result = block_on(publisher.publish("crawlspace/dht22/humidity", "47.3"));

        assert_eq!(result, Err(BrokerError::NotConnected));
        assert!(publisher.sink().published.is_empty());
    }

    #[test]
    fn test_failed_publish_marks_disconnected() {
        let mut publisher = publisher(FakeBroker::default(), ReconnectPolicy::default());
        let mut delay = RecordingDelay::default();
        block_on(publisher.ensure_connected(&mut delay)).unwrap();

        block_on(publisher.publish("crawlspace/dht22/humidity", "47.3")).unwrap();
        assert_eq!(
            publisher.sink().published,
            [("crawlspace/dht22/humidity".to_string(), "47.3".to_string())]
        );

        publisher.sink.fail_publish = true;
        let result = block_on(publisher.publish("crawlspace/dht22/temperature", "22.0"));
        assert_eq!(result, Err(BrokerError::PublishFailed));
        assert_eq!(publisher.state(), ConnectionState::Disconnected);
    }
}
