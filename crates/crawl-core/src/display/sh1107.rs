//! Minimal async SH1107 OLED driver for a 64x128 panel on I2C.
//!
//! Only what a full-frame text display needs: the power-on sequence and a
//! page-by-page transfer of a [`FrameBuffer`].

use embedded_hal_async::i2c::I2c;

use super::DisplaySink;
use super::framebuffer::{FrameBuffer, PAGE_COUNT, PANEL_COLUMNS};

// ============================================================================
// Constants
// ============================================================================

/// Default I2C address of the 128x64 FeatherWing.
pub const I2C_ADDR: u8 = 0x3C;

const CONTROL_COMMAND: u8 = 0x00;
const CONTROL_DATA: u8 = 0x40;

const CMD_SET_PAGE: u8 = 0xB0;
const CMD_SET_COLUMN_LOW: u8 = 0x00;
const CMD_SET_COLUMN_HIGH: u8 = 0x10;

/// Power-on command stream, sent after the command control byte.
pub const INIT_SEQUENCE: &[u8] = &[
    0xAE, // display off
    0xD5, 0x51, // clock divide ratio / oscillator
    0x20, // page addressing mode
    0x81, 0x4F, // contrast
    0xAD, 0x8A, // DC-DC on
    0xA0, // segment remap normal
    0xC0, // COM scan increasing
    0xDC, 0x00, // start line 0
    0xD3, 0x60, // display offset
    0xD9, 0x22, // pre-charge / discharge
    0xDB, 0x35, // VCOM deselect level
    0xA8, 0x3F, // multiplex 64
    0xA4, // follow RAM
    0xA6, // not inverted
    0xAF, // display on
];

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error<E> {
    I2c(E),
}

impl<E> From<E> for Error<E> {
    fn from(e: E) -> Self {
        Error::I2c(e)
    }
}

// ============================================================================
// Driver
// ============================================================================

pub struct Sh1107<I> {
    i2c: I,
    address: u8,
}

impl<I: I2c> Sh1107<I> {
    pub fn new(i2c: I) -> Self {
        Self::with_address(i2c, I2C_ADDR)
    }

    pub fn with_address(i2c: I, address: u8) -> Self {
        Self { i2c, address }
    }

    async fn commands(&mut self, cmds: &[u8]) -> Result<(), Error<I::Error>> {
        let mut buf = [0u8; 1 + INIT_SEQUENCE.len()];
        buf[0] = CONTROL_COMMAND;
        buf[1..=cmds.len()].copy_from_slice(cmds);
        self.i2c.write(self.address, &buf[..=cmds.len()]).await?;
        Ok(())
    }

    /// Write one 8-row page starting at column 0.
    pub async fn write_page(&mut self, page: usize, data: &[u8]) -> Result<(), Error<I::Error>> {
        self.commands(&[CMD_SET_PAGE | page as u8, CMD_SET_COLUMN_LOW, CMD_SET_COLUMN_HIGH])
            .await?;

        let mut buf = [0u8; 1 + PANEL_COLUMNS];
        buf[0] = CONTROL_DATA;
        let len = data.len().min(PANEL_COLUMNS);
        buf[1..=len].copy_from_slice(&data[..len]);
        self.i2c.write(self.address, &buf[..=len]).await?;
        Ok(())
    }

    pub fn release(self) -> I {
        self.i2c
    }
}

impl<I: I2c> DisplaySink for Sh1107<I> {
    type Error = Error<I::Error>;

    async fn init(&mut self) -> Result<(), Self::Error> {
        self.commands(INIT_SEQUENCE).await
    }

    async fn flush(&mut self, frame: &FrameBuffer) -> Result<(), Self::Error> {
        for page in 0..PAGE_COUNT {
            self.write_page(page, frame.page(page)).await?;
        }
        Ok(())
    }
}
