//! Fixed device configuration.
//!
//! There is no runtime configuration surface: everything the monitor needs is
//! gathered in [`MonitorConfig::DEFAULT`]. Secrets (Wi-Fi and cloud
//! credentials) are injected by the firmware at build time and never live
//! here.

use embassy_time::Duration;

use crate::broker::ReconnectPolicy;
use crate::mqtt::{self, ConnectOptions, Remote};

#[derive(Debug, Clone)]
pub struct MonitorConfig {
    /// MQTT client id, also shown in logs.
    pub device_id: &'static str,
    pub broker: BrokerConfig,
    pub cloud: CloudConfig,
    pub timing: TimingConfig,
}

#[derive(Debug, Clone)]
pub struct BrokerConfig {
    pub address: [u8; 4],
    pub port: u16,
    pub keep_alive_secs: u16,
    pub temperature_topic: &'static str,
    pub humidity_topic: &'static str,
}

#[derive(Debug, Clone)]
pub struct CloudConfig {
    pub host: &'static str,
    pub port: u16,
    pub keep_alive_secs: u16,
    pub temperature_feed: &'static str,
    pub humidity_feed: &'static str,
}

#[derive(Debug, Clone)]
pub struct TimingConfig {
    /// Sleep between loop iterations.
    pub poll_interval: Duration,
    /// Fixed delay between broker connection attempts.
    pub reconnect_delay: Duration,
    /// Delay between cloud status checks during setup.
    pub cloud_status_poll: Duration,
    /// How long each setup status screen stays visible.
    pub status_hold: Duration,
}

impl MonitorConfig {
    pub const DEFAULT: Self = Self {
        device_id: "Crawl Space",
        broker: BrokerConfig {
            address: [10, 228, 253, 134],
            port: mqtt::DEFAULT_PORT,
            keep_alive_secs: 120,
            temperature_topic: "crawlspace/dht22/temperature",
            humidity_topic: "crawlspace/dht22/humidity",
        },
        cloud: CloudConfig {
            host: "io.adafruit.com",
            port: mqtt::DEFAULT_PORT,
            keep_alive_secs: 300,
            temperature_feed: "crawl-space.temperature",
            humidity_feed: "crawl-space.humidity",
        },
        timing: TimingConfig {
            poll_interval: Duration::from_secs(60),
            reconnect_delay: Duration::from_secs(5),
            cloud_status_poll: Duration::from_millis(500),
            status_hold: Duration::from_secs(5),
        },
    };
}

impl BrokerConfig {
    pub const fn remote(&self) -> Remote {
        Remote::ip(self.address, self.port)
    }

    /// The local broker takes anonymous clients.
    pub const fn connect_options(&self) -> ConnectOptions {
        ConnectOptions::anonymous(self.keep_alive_secs)
    }
}

impl CloudConfig {
    pub const fn remote(&self) -> Remote {
        Remote::name(self.host, self.port)
    }

    pub const fn connect_options(&self, username: &'static str, key: &'static str) -> ConnectOptions {
        ConnectOptions::with_credentials(self.keep_alive_secs, username, key)
    }
}

impl TimingConfig {
    /// Retry forever at the configured delay.
    pub const fn reconnect_policy(&self) -> ReconnectPolicy {
        ReconnectPolicy::unbounded(self.reconnect_delay)
    }
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Milliseconds of `duration`, saturated to what `DelayNs::delay_ms` takes.
pub fn millis(duration: Duration) -> u32 {
    u32::try_from(duration.as_millis()).unwrap_or(u32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mqtt::Host;

    #[test]
    fn test_default_endpoints() {
        let config = MonitorConfig::default();

        let broker = config.broker.remote();
        assert_eq!(broker.host, Host::Ip([10, 228, 253, 134]));
        assert_eq!(broker.port, 1883);
        assert_eq!(config.broker.connect_options().keep_alive_secs, 120);
        assert_eq!(config.broker.connect_options().username, None);

        assert_eq!(config.cloud.remote().host, Host::Name("io.adafruit.com"));
        let options = config.cloud.connect_options("user", "key");
        assert_eq!(options.username, Some("user"));
        assert_eq!(options.password, Some("key"));
    }

    #[test]
    fn test_reconnect_policy_is_unbounded() {
        let policy = MonitorConfig::DEFAULT.timing.reconnect_policy();
        assert_eq!(policy.max_attempts, None);
        assert_eq!(millis(policy.delay), 5000);
    }

    #[test]
    fn test_millis_saturates() {
        assert_eq!(millis(Duration::from_secs(60)), 60_000);
        assert_eq!(millis(Duration::from_secs(u64::from(u32::MAX))), u32::MAX);
    }
}
