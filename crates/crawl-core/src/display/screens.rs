//! The two screens the monitor shows: a running status log during setup and
//! the current reading afterwards.

use core::fmt::{self, Write};

use embedded_graphics::prelude::Point;

use super::{Font, TextLine};
use crate::reading::Reading;
use crate::units::Tenths;

pub const STATUS_CAPACITY: usize = 192;
const READING_CAPACITY: usize = 24;

pub const STATUS_ORIGIN: Point = Point::new(0, 0);
pub const TEMPERATURE_ORIGIN: Point = Point::new(0, 20);
pub const HUMIDITY_ORIGIN: Point = Point::new(0, 60);

/// Console-like status text, cleared between setup phases and appended to
/// within one (the connection dots, the serial numbers).
///
/// Text past [`STATUS_CAPACITY`] is dropped so writes never fail.
#[derive(Debug, Clone, Default)]
pub struct StatusScreen {
    text: heapless::String<STATUS_CAPACITY>,
}

impl StatusScreen {
    pub const fn new() -> Self {
        Self {
            text: heapless::String::new(),
        }
    }

    pub fn clear(&mut self) {
        self.text.clear();
    }

    /// Append formatted text, e.g. `status.push(format_args!("Serial #A: {}\n", a))`.
    pub fn push(&mut self, args: fmt::Arguments<'_>) {
        let _ = self.write_fmt(args);
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn line(&self) -> TextLine<'_> {
        TextLine::new(&self.text, STATUS_ORIGIN, Font::Small)
    }
}

impl Write for StatusScreen {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        for c in s.chars() {
            if self.text.push(c).is_err() {
                break;
            }
        }
        Ok(())
    }
}

/// `Temp: %4.1fF` over `Hum: %4.1f%`, temperature in Fahrenheit.
#[derive(Debug, Clone)]
pub struct ReadingsScreen {
    temperature: heapless::String<READING_CAPACITY>,
    humidity: heapless::String<READING_CAPACITY>,
}

impl ReadingsScreen {
    pub fn new(reading: &Reading) -> Self {
        let mut temperature = heapless::String::new();
        let mut humidity = heapless::String::new();
        // Only absurd magnitudes overflow; the line is then left partial
        let _ = write!(temperature, "Temp: {:>4}F", Tenths(reading.temperature_fahrenheit()));
        let _ = write!(humidity, "Hum: {:>4}%", Tenths(reading.humidity_percent));
        Self {
            temperature,
            humidity,
        }
    }

    pub fn temperature_text(&self) -> &str {
        &self.temperature
    }

    pub fn humidity_text(&self) -> &str {
        &self.humidity
    }

    pub fn lines(&self) -> [TextLine<'_>; 2] {
        [
            TextLine::new(&self.temperature, TEMPERATURE_ORIGIN, Font::Large),
            TextLine::new(&self.humidity, HUMIDITY_ORIGIN, Font::Large),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_readings_text() {
        let screen = ReadingsScreen::new(&Reading::new(22.0, 47.25));
        assert_eq!(screen.temperature_text(), "Temp: 71.6F");
        assert_eq!(screen.humidity_text(), "Hum: 47.3%");

        let lines = screen.lines();
        assert_eq!(lines[0].origin, Point::new(0, 20));
        assert_eq!(lines[1].origin, Point::new(0, 60));
        assert!(lines.iter().all(|line| line.font == Font::Large));
    }

    #[test]
    fn test_readings_pad_short_values() {
        let screen = ReadingsScreen::new(&Reading::new(-15.0, 5.0));
        assert_eq!(screen.temperature_text(), "Temp:  5.0F");
        assert_eq!(screen.humidity_text(), "Hum:  5.0%");
    }

    #[test]
    fn test_invalid_reading_shows_nan() {
        let screen = ReadingsScreen::new(&Reading::INVALID);
        assert_eq!(screen.temperature_text(), "Temp:  nanF");
        assert_eq!(screen.humidity_text(), "Hum:  nan%");
    }

    #[test]
    fn test_status_appends_until_cleared() {
        let mut status = StatusScreen::new();
        write!(status, "Connecting to\nAdafruit IO").unwrap();
        status.write_char('.').unwrap();
        status.write_char('.').unwrap();
        assert_eq!(status.text(), "Connecting to\nAdafruit IO..");
        assert_eq!(status.line().origin, Point::zero());

        status.clear();
        assert_eq!(status.text(), "");

        status.push(format_args!("Serial #A: {}\n", 305_419_896u32));
        assert_eq!(status.text(), "Serial #A: 305419896\n");
    }

    #[test]
    fn test_status_overflow_is_dropped() {
        let mut status = StatusScreen::new();
        for _ in 0..STATUS_CAPACITY + 10 {
            status.write_char('.').unwrap();
        }
        assert_eq!(status.text().len(), STATUS_CAPACITY);
    }
}
