pub mod si7021;
#[cfg(feature = "sensor-sht40")]
pub mod sht40;

use thiserror_no_std::Error;

use crate::reading::Reading;

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum SensorError {
    #[error("{sensor} not detected: {details}")]
    NotDetected {
        sensor: &'static str,
        details: &'static str,
    },
    #[error("{sensor} failed to {operation}: {details}")]
    ReadFailed {
        sensor: &'static str,
        operation: &'static str,
        details: &'static str,
    },
    #[error("{sensor} checksum mismatch while trying to {operation}")]
    Checksum {
        sensor: &'static str,
        operation: &'static str,
    },
}

/// What `begin` learned about the detected part.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SensorInfo {
    pub model: &'static str,
    /// 64-bit electronic serial number, zero-extended for parts with less.
    pub serial: u64,
}

/// The serial halves are shown as signed words, so a half with its top bit
/// set reads negative on the status screen.
impl SensorInfo {
    /// Upper half of the serial number (SNA on the Si70xx family).
    pub const fn serial_a(&self) -> i32 {
        (self.serial >> 32) as u32 as i32
    }

    /// Lower half of the serial number (SNB on the Si70xx family).
    pub const fn serial_b(&self) -> i32 {
        self.serial as u32 as i32
    }
}

/// A temperature and humidity peripheral.
pub trait SensorSource {
    /// Short part name used in status text, e.g. `"Si7021"`.
    fn name(&self) -> &'static str;

    /// Detect and initialise the part. Called once at startup.
    fn begin(&mut self) -> impl Future<Output = Result<SensorInfo, SensorError>>;

    /// Temperature in degrees Celsius.
    fn read_temperature(&mut self) -> impl Future<Output = Result<f32, SensorError>>;

    /// Relative humidity in percent.
    fn read_humidity(&mut self) -> impl Future<Output = Result<f32, SensorError>>;

    /// Read both values into one [`Reading`].
    fn read(&mut self) -> impl Future<Output = Result<Reading, SensorError>> {
        async move {
            let temperature = self.read_temperature().await?;
            let humidity = self.read_humidity().await?;
            Ok(Reading::new(temperature, humidity))
        }
    }
}

pub use si7021::Si7021;
