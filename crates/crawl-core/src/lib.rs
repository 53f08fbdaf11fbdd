//! Hardware-independent core library for crawl-rs
//!
//! This crate contains all platform-agnostic logic for the crawl-space
//! monitor: the sensor and display drivers (written against the
//! `embedded-hal-async` I2C traits), the text screens, the minimal MQTT
//! session shared by the broker and cloud publishers, and the monitor loop
//! that ties them together.
//!
//! It is `#![no_std]` so it compiles on both the ESP32-S3 target and desktop
//! hosts (for the simulator and tests).

#![cfg_attr(not(test), no_std)]

pub mod broker;
pub mod config;
pub mod display;
pub mod monitor;
pub mod mqtt;
pub mod reading;
pub mod sensors;
pub mod telemetry;
pub mod units;

#[cfg(test)]
pub(crate) mod test_support;
