//! Text rendering onto the monochrome OLED.
//!
//! [`DisplayRenderer`] owns the only [`FrameBuffer`]. Every render clears it,
//! draws the requested lines and pushes the whole frame to a [`DisplaySink`].
//! Sink failures are logged and swallowed; a dark screen must never stop
//! the monitor loop.

pub mod framebuffer;
pub mod screens;
pub mod sh1107;

use embedded_graphics::{
    Drawable,
    mono_font::{
        MonoFont, MonoTextStyle,
        ascii::{FONT_6X10, FONT_9X15},
    },
    pixelcolor::BinaryColor,
    prelude::*,
    text::{Baseline, Text},
};
use log::{error, warn};

pub use framebuffer::{DISPLAY_HEIGHT_PX, DISPLAY_WIDTH_PX, FrameBuffer};

/// A panel that can show a full [`FrameBuffer`].
pub trait DisplaySink {
    type Error: core::fmt::Debug;

    /// Power the panel up. Called once before the first flush.
    fn init(&mut self) -> impl Future<Output = Result<(), Self::Error>>;

    /// Transfer the whole frame. There are no partial updates.
    fn flush(&mut self, frame: &FrameBuffer) -> impl Future<Output = Result<(), Self::Error>>;
}

/// Typeface used for a [`TextLine`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Font {
    /// 6x10, origin is the top-left corner. Status messages.
    Small,
    /// 9x15, origin is on the baseline. Readings.
    Large,
}

impl Font {
    const fn mono_font(self) -> &'static MonoFont<'static> {
        match self {
            Font::Small => &FONT_6X10,
            Font::Large => &FONT_9X15,
        }
    }

    const fn baseline(self) -> Baseline {
        match self {
            Font::Small => Baseline::Top,
            Font::Large => Baseline::Alphabetic,
        }
    }
}

/// One block of text at a fixed position. `\n` starts a new line below.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextLine<'a> {
    pub text: &'a str,
    pub origin: Point,
    pub font: Font,
}

impl<'a> TextLine<'a> {
    pub const fn new(text: &'a str, origin: Point, font: Font) -> Self {
        Self { text, origin, font }
    }
}

pub struct DisplayRenderer<D> {
    sink: D,
    frame: FrameBuffer,
}

impl<D: DisplaySink> DisplayRenderer<D> {
    pub const fn new(sink: D) -> Self {
        Self {
            sink,
            frame: FrameBuffer::new(),
        }
    }

    /// Initialise the panel and blank it.
    pub async fn begin(&mut self) {
        if let Err(e) = self.sink.init().await {
            error!("Display init failed: {:?}", e);
        }
        let Ok(()) = self.frame.clear(BinaryColor::Off);
        self.flush().await;
    }

    /// Clear, draw `lines` and flush.
    pub async fn render(&mut self, lines: &[TextLine<'_>]) {
        self.draw(lines);
        self.flush().await;
    }

    /// Clear and draw `lines` into the framebuffer without touching the panel.
    pub fn draw(&mut self, lines: &[TextLine<'_>]) {
        let Ok(()) = self.frame.clear(BinaryColor::Off);

        for line in lines {
            let style = MonoTextStyle::new(line.font.mono_font(), BinaryColor::On);
            let Ok(_) = Text::with_baseline(line.text, line.origin, style, line.font.baseline())
                .draw(&mut self.frame);
        }
    }

    /// Push the current framebuffer to the panel again.
    pub async fn flush(&mut self) {
        if let Err(e) = self.sink.flush(&self.frame).await {
            warn!("Display flush failed: {:?}", e);
        }
    }

    pub fn frame(&self) -> &FrameBuffer {
        &self.frame
    }

    pub fn sink(&self) -> &D {
        &self.sink
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embassy_futures::block_on;

    /// Sink that keeps a copy of every flushed frame.
    #[derive(Default)]
    struct CaptureSink {
        inits: usize,
        frames: Vec<FrameBuffer>,
        fail: bool,
    }

    impl DisplaySink for CaptureSink {
        type Error = &'static str;

        async fn init(&mut self) -> Result<(), Self::Error> {
            self.inits += 1;
            if self.fail { Err("init") } else { Ok(()) }
        }

        async fn flush(&mut self, frame: &FrameBuffer) -> Result<(), Self::Error> {
            if self.fail {
                return Err("flush");
            }
            self.frames.push(frame.clone());
            Ok(())
        }
    }

    const LINES: [TextLine<'static>; 2] = [
        TextLine::new("Temp: 71.6F", Point::new(0, 20), Font::Large),
        TextLine::new("Hum: 47.3%", Point::new(0, 60), Font::Large),
    ];

    #[test]
    fn test_begin_blanks_the_panel() {
        let mut renderer = DisplayRenderer::new(CaptureSink::default());
        block_on(renderer.begin());

        assert_eq!(renderer.sink().inits, 1);
        assert_eq!(renderer.sink().frames.len(), 1);
        assert_eq!(renderer.sink().frames[0].lit_pixels(), 0);
    }

    #[test]
    fn test_render_is_idempotent() {
        let mut renderer = DisplayRenderer::new(CaptureSink::default());
        block_on(renderer.render(&LINES));
        block_on(renderer.render(&LINES));

        let frames = &renderer.sink().frames;
        assert_eq!(frames.len(), 2);
        assert!(frames[0].lit_pixels() > 0);
        assert_eq!(frames[0], frames[1]);
    }

    #[test]
    fn test_render_replaces_previous_content() {
        let mut renderer = DisplayRenderer::new(CaptureSink::default());
        block_on(renderer.render(&LINES));
        block_on(renderer.render(&[TextLine::new(
            "Initializing",
            Point::zero(),
            Font::Small,
        )]));

        let frame = renderer.frame();
        // The humidity line reached the lower half, the status line does not
        let lower_half_lit = (0..DISPLAY_WIDTH_PX)
            .flat_map(|x| (32..DISPLAY_HEIGHT_PX).map(move |y| (x, y)))
            .any(|(x, y)| frame.pixel(x, y));
        assert!(!lower_half_lit);
        assert!(frame.lit_pixels() > 0);
    }

    #[test]
    fn test_sink_errors_are_swallowed() {
        let mut renderer = DisplayRenderer::new(CaptureSink {
            fail: true,
            ..Default::default()
        });
        block_on(renderer.begin());
        block_on(renderer.render(&LINES));

        assert!(renderer.sink().frames.is_empty());
        // The framebuffer still holds what was drawn
        assert!(renderer.frame().lit_pixels() > 0);
    }
}
