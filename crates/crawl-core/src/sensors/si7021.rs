use embedded_hal_async::delay::DelayNs;
use embedded_hal_async::i2c::I2c;
use log::{error, info};

use super::{SensorError, SensorInfo, SensorSource};

// =============================================================================
// I2C Address
// =============================================================================

/// Si7021 I2C address (fixed)
pub const I2C_ADDR: u8 = 0x40;

// =============================================================================
// Commands
// =============================================================================

/// Measure relative humidity, no hold master mode
pub const CMD_MEASURE_RH_NO_HOLD: u8 = 0xF5;
/// Measure temperature, no hold master mode
pub const CMD_MEASURE_TEMP_NO_HOLD: u8 = 0xF3;
/// Soft reset
pub const CMD_RESET: u8 = 0xFE;
/// Read RH/T user register 1
pub const CMD_READ_USER_REG1: u8 = 0xE7;
/// Read electronic ID, first access (SNA)
pub const CMD_READ_ID_1: [u8; 2] = [0xFA, 0x0F];
/// Read electronic ID, second access (SNB)
pub const CMD_READ_ID_2: [u8; 2] = [0xFC, 0xC9];

/// User register 1 content right after a soft reset
pub const USER_REG1_RESET_VALUE: u8 = 0x3A;

// =============================================================================
// Timing
// =============================================================================

const RESET_DELAY_MS: u32 = 50;
const CONVERSION_DELAY_MS: u32 = 20;
const CONVERSION_POLL_MS: u32 = 6;
const CONVERSION_POLL_ATTEMPTS: u8 = 5;

const SENSOR_NAME: &str = "Si7021";

// =============================================================================
// Enums
// =============================================================================

/// Part number encoded in SNB_3 of the electronic serial number
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Model {
    Si7013,
    Si7020,
    Si7021,
    EngineeringSample,
    Unknown(u8),
}

impl Model {
    pub fn from_id(id: u8) -> Self {
        match id {
            0x0D => Self::Si7013,
            0x14 => Self::Si7020,
            0x15 => Self::Si7021,
            0x00 | 0xFF => Self::EngineeringSample,
            other => Self::Unknown(other),
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::Si7013 => "Si7013",
            Self::Si7020 => "Si7020",
            Self::Si7021 => "Si7021",
            Self::EngineeringSample => "Si70xx engineering sample",
            Self::Unknown(_) => "Si70xx",
        }
    }
}

// =============================================================================
// Driver Error Type
// =============================================================================

/// Errors that can occur during Si7021 operations
#[derive(Debug)]
pub enum Error<E> {
    /// I2C communication error
    I2c(E),
    /// The device answered but is not in its post-reset state
    UnexpectedUserRegister(u8),
    /// A measurement frame failed its CRC-8 check
    Crc,
    /// The conversion did not complete within the polling window
    Timeout,
}

impl<E> From<E> for Error<E> {
    fn from(e: E) -> Self {
        Self::I2c(e)
    }
}

// =============================================================================
// Conversions
// =============================================================================

/// CRC-8 used by the Si70xx family: polynomial 0x31, initial value 0x00.
pub fn crc8(data: &[u8]) -> u8 {
    let mut crc = 0u8;
    for &byte in data {
        crc ^= byte;
        for _ in 0..8 {
            crc = if crc & 0x80 != 0 {
                (crc << 1) ^ 0x31
            } else {
                crc << 1
            };
        }
    }
    crc
}

/// Relative humidity in percent. The raw formula overshoots near the rails.
pub fn humidity_from_code(code: u16) -> f32 {
    (125.0 * f32::from(code) / 65536.0 - 6.0).clamp(0.0, 100.0)
}

/// Temperature in degrees Celsius.
pub fn temperature_from_code(code: u16) -> f32 {
    175.72 * f32::from(code) / 65536.0 - 46.85
}

// =============================================================================
// Driver Implementation
// =============================================================================

/// Si7021 humidity and temperature sensor driver with async I2C interface.
///
/// Measurements use the "no hold master" commands so the bus stays free for
/// the display while a conversion runs.
pub struct Si7021<I, D> {
    i2c: I,
    delay: D,
    model: Model,
}

impl<I: I2c, D: DelayNs> Si7021<I, D> {
    pub fn new(i2c: I, delay: D) -> Self {
        Self {
            i2c,
            delay,
            model: Model::Si7021,
        }
    }

    /// Model identified by the last successful [`serial_number`](Self::serial_number) read.
    pub fn model(&self) -> Model {
        self.model
    }

    pub async fn reset(&mut self) -> Result<(), Error<I::Error>> {
        self.i2c.write(I2C_ADDR, &[CMD_RESET]).await?;
        self.delay.delay_ms(RESET_DELAY_MS).await;
        Ok(())
    }

    pub async fn user_register(&mut self) -> Result<u8, Error<I::Error>> {
        let mut value = [0u8; 1];
        self.i2c
            .write_read(I2C_ADDR, &[CMD_READ_USER_REG1], &mut value)
            .await?;
        Ok(value[0])
    }

    /// Read the 64-bit electronic serial number, SNA in the upper half.
    ///
    /// Also records the model, which is encoded in SNB_3.
    pub async fn serial_number(&mut self) -> Result<u64, Error<I::Error>> {
        // SNA_3, CRC, SNA_2, CRC, SNA_1, CRC, SNA_0, CRC
        let mut first = [0u8; 8];
        self.i2c
            .write_read(I2C_ADDR, &CMD_READ_ID_1, &mut first)
            .await?;

        // SNB_3, SNB_2, CRC, SNB_1, SNB_0, CRC
        let mut second = [0u8; 6];
        self.i2c
            .write_read(I2C_ADDR, &CMD_READ_ID_2, &mut second)
            .await?;

        let sna = u32::from_be_bytes([first[0], first[2], first[4], first[6]]);
        let snb = u32::from_be_bytes([second[0], second[1], second[3], second[4]]);
        self.model = Model::from_id(second[0]);

        Ok((u64::from(sna) << 32) | u64::from(snb))
    }

    pub async fn relative_humidity(&mut self) -> Result<f32, Error<I::Error>> {
        let code = self.measure(CMD_MEASURE_RH_NO_HOLD).await?;
        Ok(humidity_from_code(code))
    }

    pub async fn temperature(&mut self) -> Result<f32, Error<I::Error>> {
        let code = self.measure(CMD_MEASURE_TEMP_NO_HOLD).await?;
        Ok(temperature_from_code(code))
    }

    /// Start a conversion and poll until the part stops NACKing the read.
    async fn measure(&mut self, command: u8) -> Result<u16, Error<I::Error>> {
        self.i2c.write(I2C_ADDR, &[command]).await?;
        self.delay.delay_ms(CONVERSION_DELAY_MS).await;

        let mut frame = [0u8; 3];
        let mut attempts = 1;
        while self.i2c.read(I2C_ADDR, &mut frame).await.is_err() {
            if attempts >= CONVERSION_POLL_ATTEMPTS {
                return Err(Error::Timeout);
            }
            attempts += 1;
            self.delay.delay_ms(CONVERSION_POLL_MS).await;
        }

        if crc8(&frame[..2]) != frame[2] {
            return Err(Error::Crc);
        }

        Ok(u16::from_be_bytes([frame[0], frame[1]]))
    }

    /// Release the bus and delay provider.
    pub fn release(self) -> (I, D) {
        (self.i2c, self.delay)
    }
}

fn read_error<E: core::fmt::Debug>(error: Error<E>, operation: &'static str) -> SensorError {
    error!("{} failed to {}: {:?}", SENSOR_NAME, operation, error);
    match error {
        Error::Crc => SensorError::Checksum {
            sensor: SENSOR_NAME,
            operation,
        },
        Error::Timeout => SensorError::ReadFailed {
            sensor: SENSOR_NAME,
            operation,
            details: "conversion did not complete",
        },
        Error::UnexpectedUserRegister(_) => SensorError::NotDetected {
            sensor: SENSOR_NAME,
            details: "unexpected user register value",
        },
        Error::I2c(_) => SensorError::ReadFailed {
            sensor: SENSOR_NAME,
            operation,
            details: "I2C communication error or sensor not responding",
        },
    }
}

impl<I: I2c, D: DelayNs> SensorSource for Si7021<I, D> {
    fn name(&self) -> &'static str {
        SENSOR_NAME
    }

    async fn begin(&mut self) -> Result<SensorInfo, SensorError> {
        self.reset().await.map_err(|e| {
            error!("{} soft reset failed: {:?}", SENSOR_NAME, e);
            SensorError::NotDetected {
                sensor: SENSOR_NAME,
                details: "no acknowledge on soft reset",
            }
        })?;

        let register = self
            .user_register()
            .await
            .map_err(|e| read_error(e, "read user register"))?;
        if register != USER_REG1_RESET_VALUE {
            return Err(read_error(
                Error::<I::Error>::UnexpectedUserRegister(register),
                "verify user register",
            ));
        }

        let serial = self
            .serial_number()
            .await
            .map_err(|e| read_error(e, "read electronic serial number"))?;

        info!("{}: found {} serial {:016X}", SENSOR_NAME, self.model.name(), serial);

        Ok(SensorInfo {
            model: self.model.name(),
            serial,
        })
    }

    async fn read_temperature(&mut self) -> Result<f32, SensorError> {
        self.temperature()
            .await
            .map_err(|e| read_error(e, "measure temperature"))
    }

    async fn read_humidity(&mut self) -> Result<f32, SensorError> {
        self.relative_humidity()
            .await
            .map_err(|e| read_error(e, "measure humidity"))
    }
}
