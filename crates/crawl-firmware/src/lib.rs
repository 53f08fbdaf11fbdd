//! ESP32-S3 firmware-specific modules for crawl-rs
//!
//! Everything here needs the real chip: the I2C peripheral setup, the Wi-Fi
//! tasks and the embassy-net TCP transport the MQTT sessions run over. The
//! monitor logic itself lives in `crawl_core`.

#![no_std]

pub mod hardware;
pub mod secrets;
pub mod transport;
pub mod wifi;
