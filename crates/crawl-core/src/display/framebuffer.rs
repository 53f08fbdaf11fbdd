//! RAM framebuffer in the SH1107 page layout.
//!
//! All drawing targets this buffer. The panel is 64 columns by 128 rows and
//! is mounted a quarter turn clockwise, so callers see a 128x64 landscape
//! surface while the bytes stay in the order the controller expects: one
//! byte per column holding 8 vertically stacked rows, 16 pages of 64 bytes.

use core::convert::Infallible;

use embedded_graphics::pixelcolor::BinaryColor;
use embedded_graphics::prelude::*;
use embedded_graphics::primitives::Rectangle;

/// Logical (rotated) width seen by drawing code.
pub const DISPLAY_WIDTH_PX: u32 = 128;
/// Logical (rotated) height seen by drawing code.
pub const DISPLAY_HEIGHT_PX: u32 = 64;

/// Native panel columns, the byte stride of one page.
pub const PANEL_COLUMNS: usize = 64;
/// Native panel rows.
pub const PANEL_ROWS: usize = 128;
/// Number of 8-row pages the controller addresses.
pub const PAGE_COUNT: usize = PANEL_ROWS / 8;

const BUFFER_LEN: usize = PANEL_COLUMNS * PAGE_COUNT;

/// Fixed-size monochrome framebuffer implementing `DrawTarget<Color = BinaryColor>`.
#[derive(Clone, PartialEq, Eq)]
pub struct FrameBuffer {
    bytes: [u8; BUFFER_LEN],
}

impl Default for FrameBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl core::fmt::Debug for FrameBuffer {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("FrameBuffer")
            .field("lit_pixels", &self.lit_pixels())
            .finish()
    }
}

impl FrameBuffer {
    /// A blank (all pixels off) buffer.
    pub const fn new() -> Self {
        Self {
            bytes: [0; BUFFER_LEN],
        }
    }

    /// Map a logical coordinate to (byte index, bit mask).
    #[inline]
    fn locate(x: usize, y: usize) -> (usize, u8) {
        let column = PANEL_COLUMNS - 1 - y;
        let row = x;
        (column + (row / 8) * PANEL_COLUMNS, 1 << (row % 8))
    }

    #[inline]
    fn set_pixel(&mut self, x: usize, y: usize, color: BinaryColor) {
        let (index, mask) = Self::locate(x, y);
        match color {
            BinaryColor::On => self.bytes[index] |= mask,
            BinaryColor::Off => self.bytes[index] &= !mask,
        }
    }

    /// Whether the pixel at a logical coordinate is lit. Out of range is off.
    pub fn pixel(&self, x: u32, y: u32) -> bool {
        if x >= DISPLAY_WIDTH_PX || y >= DISPLAY_HEIGHT_PX {
            return false;
        }
        let (index, mask) = Self::locate(x as usize, y as usize);
        self.bytes[index] & mask != 0
    }

    /// The 64 column bytes of one controller page.
    pub fn page(&self, page: usize) -> &[u8] {
        let start = page * PANEL_COLUMNS;
        &self.bytes[start..start + PANEL_COLUMNS]
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn lit_pixels(&self) -> u32 {
        self.bytes.iter().map(|byte| byte.count_ones()).sum()
    }
}

impl OriginDimensions for FrameBuffer {
    fn size(&self) -> Size {
        Size::new(DISPLAY_WIDTH_PX, DISPLAY_HEIGHT_PX)
    }
}

impl DrawTarget for FrameBuffer {
    type Color = BinaryColor;
    type Error = Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        let w = DISPLAY_WIDTH_PX as i32;
        let h = DISPLAY_HEIGHT_PX as i32;

        for Pixel(coord, color) in pixels {
            if (0..w).contains(&coord.x) && (0..h).contains(&coord.y) {
                self.set_pixel(coord.x as usize, coord.y as usize, color);
            }
        }
        Ok(())
    }

    fn fill_solid(&mut self, area: &Rectangle, color: Self::Color) -> Result<(), Self::Error> {
        let area = area.intersection(&self.bounding_box());
        let Some(bottom_right) = area.bottom_right() else {
            return Ok(());
        };

        for y in area.top_left.y..=bottom_right.y {
            for x in area.top_left.x..=bottom_right.x {
                self.set_pixel(x as usize, y as usize, color);
            }
        }
        Ok(())
    }

    fn clear(&mut self, color: Self::Color) -> Result<(), Self::Error> {
        let fill = match color {
            BinaryColor::On => 0xFF,
            BinaryColor::Off => 0x00,
        };
        self.bytes.fill(fill);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedded_graphics::primitives::PrimitiveStyle;

    #[test]
    fn test_rotation_maps_into_panel_pages() {
        let mut frame = FrameBuffer::new();
        let Ok(()) = frame.draw_iter([Pixel(Point::new(0, 0), BinaryColor::On)]);

        // Logical top-left lands in the last column of page 0, bit 0
        assert_eq!(frame.page(0)[PANEL_COLUMNS - 1], 0b0000_0001);
        assert!(frame.pixel(0, 0));

        let Ok(()) = frame.draw_iter([Pixel(Point::new(127, 63), BinaryColor::On)]);
        assert_eq!(frame.page(PAGE_COUNT - 1)[0], 0b1000_0000);
        assert_eq!(frame.lit_pixels(), 2);
    }

    #[test]
    fn test_out_of_bounds_pixels_are_dropped() {
        let mut frame = FrameBuffer::new();
        let Ok(()) = frame.draw_iter([
            Pixel(Point::new(-1, 0), BinaryColor::On),
            Pixel(Point::new(128, 0), BinaryColor::On),
            Pixel(Point::new(0, 64), BinaryColor::On),
        ]);
        assert_eq!(frame.lit_pixels(), 0);
    }

    #[test]
    fn test_fill_solid_is_clamped() {
        let mut frame = FrameBuffer::new();
        let Ok(()) = Rectangle::new(Point::new(120, 60), Size::new(20, 20))
            .into_styled(PrimitiveStyle::with_fill(BinaryColor::On))
            .draw(&mut frame);
        assert_eq!(frame.lit_pixels(), 8 * 4);
        assert!(frame.pixel(127, 63));
    }

    #[test]
    fn test_clear_resets_every_pixel() {
        let mut frame = FrameBuffer::new();
        let Ok(()) = frame.clear(BinaryColor::On);
        assert_eq!(frame.lit_pixels(), (DISPLAY_WIDTH_PX * DISPLAY_HEIGHT_PX));
        let Ok(()) = frame.clear(BinaryColor::Off);
        assert_eq!(frame, FrameBuffer::new());
    }
}
