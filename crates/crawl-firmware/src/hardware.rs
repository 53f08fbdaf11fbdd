//! Hardware initialization for the crawl-space monitor
//!
//! The Si7021 and the SH1107 FeatherWing share I2C0 on the Feather's
//! STEMMA QT pins (SDA GPIO3, SCL GPIO4).

use embassy_embedded_hal::shared_bus::asynch::i2c::I2cDevice as I2cDeviceBus;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::mutex::Mutex as AsyncMutex;
use esp_hal::i2c::master::{Config as I2cConfig, ConfigError, I2c};
use esp_hal::time::Rate;
use esp_hal::Async;
use log::info;
use static_cell::StaticCell;

pub type I2cBus = I2c<'static, Async>;
pub type I2cDevice = I2cDeviceBus<'static, CriticalSectionRawMutex, I2cBus>;

/// Handles on the shared bus, one per driver.
pub struct I2cDevices {
    pub sensor: I2cDevice,
    pub display: I2cDevice,
}

/// Create the I2C peripheral at 400 kHz
pub fn create_i2c_bus(
    i2c0: esp_hal::peripherals::I2C0<'static>,
    sda: esp_hal::peripherals::GPIO3<'static>,
    scl: esp_hal::peripherals::GPIO4<'static>,
) -> Result<I2cBus, ConfigError> {
    let i2c = I2c::new(i2c0, I2cConfig::default().with_frequency(Rate::from_khz(400)))?
        .with_sda(sda)
        .with_scl(scl)
        .into_async();
    Ok(i2c)
}

/// Move the bus into a static mutex and hand out a device per driver.
///
/// Each transaction holds the mutex until it finishes, so the sensor and
/// the display never interleave on the wire.
///
/// Can only be called once.
pub fn share_i2c_bus(i2c: I2cBus) -> I2cDevices {
    static I2C0_BUS: StaticCell<AsyncMutex<CriticalSectionRawMutex, I2cBus>> = StaticCell::new();
    let bus = I2C0_BUS.init(AsyncMutex::new(i2c));

    info!("I2C0 bus shared between sensor and display");
    I2cDevices {
        sensor: I2cDeviceBus::new(bus),
        display: I2cDeviceBus::new(bus),
    }
}
