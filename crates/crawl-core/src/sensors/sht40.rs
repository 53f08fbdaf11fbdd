use embedded_hal_async::i2c::I2c;
use log::{error, info};
use sht4x::Sht4xAsync;

use super::{SensorError, SensorInfo, SensorSource};
use crate::reading::Reading;

const SENSOR_NAME: &str = "SHT40";

/// Sensirion SHT40 as a drop-in replacement for the Si7021.
pub struct Sht40<I> {
    sensor: Sht4xAsync<I, embassy_time::Delay>,
}

impl<I: I2c> Sht40<I> {
    pub fn new(i2c: I) -> Self {
        Self {
            sensor: Sht4xAsync::<I, embassy_time::Delay>::new(i2c),
        }
    }
}

impl<I: I2c> SensorSource for Sht40<I> {
    fn name(&self) -> &'static str {
        SENSOR_NAME
    }

    async fn begin(&mut self) -> Result<SensorInfo, SensorError> {
        let serial = self
            .sensor
            .serial_number(&mut embassy_time::Delay)
            .await
            .map_err(|e| {
                error!("SHT40 serial number read failed: {:?}", e);
                SensorError::NotDetected {
                    sensor: SENSOR_NAME,
                    details: "no answer to serial number request",
                }
            })?;

        info!("SHT40: found serial {:08X}", serial);

        Ok(SensorInfo {
            model: SENSOR_NAME,
            serial: u64::from(serial),
        })
    }

    async fn read_temperature(&mut self) -> Result<f32, SensorError> {
        Ok(self.read().await?.temperature_celsius)
    }

    async fn read_humidity(&mut self) -> Result<f32, SensorError> {
        Ok(self.read().await?.humidity_percent)
    }

    /// One high precision measurement yields both values.
    async fn read(&mut self) -> Result<Reading, SensorError> {
        let measurement = self
            .sensor
            .measure(sht4x::Precision::High, &mut embassy_time::Delay)
            .await
            .map_err(|e| {
                error!("SHT40 measurement failed: {:?}", e);
                SensorError::ReadFailed {
                    sensor: SENSOR_NAME,
                    operation: "measure temperature/humidity",
                    details: "I2C communication error or sensor not responding",
                }
            })?;

        Ok(Reading::new(
            measurement.temperature_celsius().to_num::<f32>(),
            measurement.humidity_percent().to_num::<f32>(),
        ))
    }
}
