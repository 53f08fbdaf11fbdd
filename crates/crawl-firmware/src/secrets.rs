//! Credentials baked in by `build.rs`.

pub const WIFI_SSID: &str = env!("WIFI_SSID");
pub const WIFI_PASSWORD: &str = env!("WIFI_PASSWORD");
pub const AIO_USERNAME: &str = env!("AIO_USERNAME");
pub const AIO_KEY: &str = env!("AIO_KEY");

/// Names of the credentials that were empty at build time.
pub fn missing() -> impl Iterator<Item = &'static str> {
    [
        ("WIFI_SSID", WIFI_SSID),
        ("WIFI_PASSWORD", WIFI_PASSWORD),
        ("AIO_USERNAME", AIO_USERNAME),
        ("AIO_KEY", AIO_KEY),
    ]
    .into_iter()
    .filter(|(_, value)| value.is_empty())
    .map(|(name, _)| name)
}
