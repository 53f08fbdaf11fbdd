//! Unit conversions and fixed-precision text rendering of readings.

use core::fmt::{self, Write};

/// Capacity of a rendered [`Tenths`] value.
///
/// Covers the widest rendering of a saturated `i64` tenths count:
/// sign, 18 integer digits, the point and one fraction digit.
pub const PAYLOAD_CAPACITY: usize = 24;

/// Text payload published to the broker and the cloud feeds.
pub type Payload = heapless::String<PAYLOAD_CAPACITY>;

pub fn celsius_to_fahrenheit(celsius: f32) -> f32 {
    celsius * 1.8 + 32.0
}

pub fn fahrenheit_to_celsius(fahrenheit: f32) -> f32 {
    (fahrenheit - 32.0) * 5.0 / 9.0
}

/// A value rendered with exactly one fraction digit, like `%.1f`.
///
/// Ties round away from zero, so `47.25` renders as `47.3`. Non-finite values
/// render as `nan`, `inf` and `-inf`. Width and alignment flags of the
/// formatter are honoured, so `{:>4}` matches `%4.1f` for values below 100.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tenths(pub f32);

impl fmt::Display for Tenths {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut text: heapless::String<PAYLOAD_CAPACITY> = heapless::String::new();
        let value = self.0;

        if value.is_nan() {
            text.push_str("nan").map_err(|_| fmt::Error)?;
        } else if value.is_infinite() {
            let rendered = if value > 0.0 { "inf" } else { "-inf" };
            text.push_str(rendered).map_err(|_| fmt::Error)?;
        } else {
            // f32 -> f64 is exact, so the tie check sees the stored value
            let scaled = f64::from(value) * 10.0;
            let tenths = if scaled >= 0.0 {
                (scaled + 0.5) as i64
            } else {
                (scaled - 0.5) as i64
            };
            // Keeps the sign of values that round to zero, so -0.04 is "-0.0"
            let sign = if value.is_sign_negative() { "-" } else { "" };
            let magnitude = tenths.unsigned_abs();
            write!(text, "{}{}.{}", sign, magnitude / 10, magnitude % 10)?;
        }

        f.pad(&text)
    }
}

/// Render `value` as a publishable one-fraction-digit payload.
pub fn payload(value: f32) -> Payload {
    let mut text = Payload::new();
    // PAYLOAD_CAPACITY fits every rendering, so this cannot overflow
    let _ = write!(text, "{}", Tenths(value));
    text
}
