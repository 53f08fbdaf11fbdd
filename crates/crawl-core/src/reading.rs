//! A single temperature and humidity sample.

use crate::units::celsius_to_fahrenheit;

/// One sensor sample. Both fields are always produced by the same read.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Reading {
    pub temperature_celsius: f32,
    pub humidity_percent: f32,
}

impl Reading {
    /// Placeholder used when the sensor did not answer.
    pub const INVALID: Self = Self {
        temperature_celsius: f32::NAN,
        humidity_percent: f32::NAN,
    };

    pub const fn new(temperature_celsius: f32, humidity_percent: f32) -> Self {
        Self {
            temperature_celsius,
            humidity_percent,
        }
    }

    pub fn temperature_fahrenheit(&self) -> f32 {
        celsius_to_fahrenheit(self.temperature_celsius)
    }

    /// Whether both values are finite numbers worth publishing.
    pub fn is_valid(&self) -> bool {
        self.temperature_celsius.is_finite() && self.humidity_percent.is_finite()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_reading() {
        assert!(!Reading::INVALID.is_valid());
        assert!(!Reading::new(21.0, f32::NAN).is_valid());
        assert!(Reading::new(21.0, 55.0).is_valid());
    }

    #[test]
    fn test_fahrenheit_view() {
        let reading = Reading::new(25.0, 40.0);
        assert!((reading.temperature_fahrenheit() - 77.0).abs() < 1e-4);
    }
}
