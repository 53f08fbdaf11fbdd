//! Desktop simulator for the crawl-rs crawl-space monitor.
//!
//! Runs the real `crawl_core::monitor::Monitor` against an SDL2 window in
//! place of the SH1107, a synthetic sensor, and logging stand-ins for
//! Adafruit IO and the MQTT broker. Delays run faster than wall-clock time
//! by [`TIME_SCALE`] so the one-minute poll interval stays watchable.
//!
//! Run with `RUST_LOG=info cargo run -p crawl-simulator` to see what would
//! have been published. Close the window or press Q to quit.

use std::cell::RefCell;
use std::rc::Rc;
use std::time::{Duration, Instant};

use embedded_graphics::pixelcolor::BinaryColor;
use embedded_graphics::prelude::*;
use embedded_graphics_simulator::{
    BinaryColorTheme, OutputSettingsBuilder, SimulatorDisplay, SimulatorEvent, Window,
    sdl2::Keycode,
};
use embedded_hal_async::delay::DelayNs;
use log::{info, warn};

use crawl_core::broker::BrokerSink;
use crawl_core::config::MonitorConfig;
use crawl_core::display::{DISPLAY_HEIGHT_PX, DISPLAY_WIDTH_PX, DisplaySink, FrameBuffer};
use crawl_core::monitor::Monitor;
use crawl_core::sensors::{SensorError, SensorInfo, SensorSource};
use crawl_core::telemetry::{TelemetryError, TelemetrySink, TelemetryStatus};
use crawl_core::units;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Pixel scale factor for the simulator window.
const WINDOW_SCALE: u32 = 4;

/// Simulated time runs this many times faster than real time.
const TIME_SCALE: u32 = 12;

/// Longest real-time slice slept between window refreshes.
const FRAME_DURATION: Duration = Duration::from_millis(33);

/// `run()` calls the fake cloud needs before it reports connected, so the
/// setup screen shows its progress dots.
const CLOUD_CONNECT_POLLS: u32 = 3;

// ---------------------------------------------------------------------------
// Window
// ---------------------------------------------------------------------------

/// The SDL window standing in for the OLED FeatherWing.
///
/// Shared by the display sink (which draws into it) and the delay (which
/// keeps it responsive while the monitor sleeps).
struct Panel {
    display: SimulatorDisplay<BinaryColor>,
    window: Window,
}

impl Panel {
    fn new() -> Self {
        let display =
            SimulatorDisplay::<BinaryColor>::new(Size::new(DISPLAY_WIDTH_PX, DISPLAY_HEIGHT_PX));
        let output_settings = OutputSettingsBuilder::new()
            .theme(BinaryColorTheme::OledBlue)
            .scale(WINDOW_SCALE)
            .build();
        let mut window = Window::new("Crawl Space Monitor", &output_settings);

        // The SDL window is lazily initialized on the first `update()` call.
        // We must call `update()` once before `events()` or it will panic.
        window.update(&display);
        Self { display, window }
    }

    fn show(&mut self, frame: &FrameBuffer) {
        let pixels = (0..DISPLAY_HEIGHT_PX).flat_map(|y| {
            (0..DISPLAY_WIDTH_PX).map(move |x| {
                Pixel(
                    Point::new(x as i32, y as i32),
                    BinaryColor::from(frame.pixel(x, y)),
                )
            })
        });
        let Ok(()) = self.display.draw_iter(pixels);
        self.window.update(&self.display);
    }

    /// Drain SDL events. Returns `false` once the user asked to quit.
    fn pump(&mut self) -> bool {
        for event in self.window.events() {
            match event {
                SimulatorEvent::Quit => return false,
                SimulatorEvent::KeyDown { keycode, .. }
                    if keycode == Keycode::Q || keycode == Keycode::Escape =>
                {
                    return false;
                }
                _ => {}
            }
        }
        self.window.update(&self.display);
        true
    }
}

type SharedPanel = Rc<RefCell<Panel>>;

struct SimDisplay {
    panel: SharedPanel,
}

impl DisplaySink for SimDisplay {
    type Error = core::convert::Infallible;

    async fn init(&mut self) -> Result<(), Self::Error> {
        info!(
            "Display: {}x{} (scale {}x)",
            DISPLAY_WIDTH_PX, DISPLAY_HEIGHT_PX, WINDOW_SCALE
        );
        Ok(())
    }

    async fn flush(&mut self, frame: &FrameBuffer) -> Result<(), Self::Error> {
        self.panel.borrow_mut().show(frame);
        Ok(())
    }
}

/// Sleeps a scaled-down amount of real time while keeping the window alive.
struct SimDelay {
    panel: SharedPanel,
}

impl SimDelay {
    fn sleep(&mut self, simulated: Duration) {
        let deadline = Instant::now() + simulated / TIME_SCALE;
        loop {
            if !self.panel.borrow_mut().pump() {
                info!("Simulator exiting");
                std::process::exit(0);
            }
            let now = Instant::now();
            if now >= deadline {
                break;
            }
            std::thread::sleep(FRAME_DURATION.min(deadline - now));
        }
    }
}

impl DelayNs for SimDelay {
    async fn delay_ns(&mut self, ns: u32) {
        self.sleep(Duration::from_nanos(u64::from(ns)));
    }

    async fn delay_ms(&mut self, ms: u32) {
        self.sleep(Duration::from_millis(u64::from(ms)));
    }
}

// ---------------------------------------------------------------------------
// Mock data generation
// ---------------------------------------------------------------------------

/// A sensor whose readings drift slowly, like a crawl space over a day.
struct SimSensor {
    started: Instant,
}

impl SimSensor {
    fn new() -> Self {
        Self {
            started: Instant::now(),
        }
    }

    /// Simulated seconds since start.
    fn elapsed_secs(&self) -> f64 {
        self.started.elapsed().as_secs_f64() * f64::from(TIME_SCALE)
    }
}

impl SensorSource for SimSensor {
    fn name(&self) -> &'static str {
        "Si7021"
    }

    async fn begin(&mut self) -> Result<SensorInfo, SensorError> {
        Ok(SensorInfo {
            model: "Si7021",
            serial: 0x1234_5678_9ABC_DEF0,
        })
    }

    async fn read_temperature(&mut self) -> Result<f32, SensorError> {
        let t = self.elapsed_secs();
        // 14–20 °C with a slow swing
        Ok((17.0 + 3.0 * (t / 900.0).sin() + 0.3 * (t / 97.0).cos()) as f32)
    }

    async fn read_humidity(&mut self) -> Result<f32, SensorError> {
        let t = self.elapsed_secs();
        // 55–75 %, damper when it is cooler
        Ok((65.0 - 10.0 * (t / 900.0).sin() + 1.5 * (t / 61.0).cos()) as f32)
    }
}

// ---------------------------------------------------------------------------
// Network stand-ins
// ---------------------------------------------------------------------------

/// Adafruit IO stand-in that logs every feed value.
struct LoggingCloud {
    status: TelemetryStatus,
    polls_until_connected: u32,
}

impl LoggingCloud {
    fn new() -> Self {
        Self {
            status: TelemetryStatus::Idle,
            polls_until_connected: CLOUD_CONNECT_POLLS,
        }
    }
}

impl TelemetrySink for LoggingCloud {
    async fn connect(&mut self) {
        info!("[cloud] connecting");
        self.status = TelemetryStatus::NetConnected;
    }

    fn status(&self) -> TelemetryStatus {
        self.status
    }

    async fn run(&mut self) -> TelemetryStatus {
        if !self.status.is_connected() {
            self.polls_until_connected = self.polls_until_connected.saturating_sub(1);
            if self.polls_until_connected == 0 {
                self.status = TelemetryStatus::Connected;
            }
        }
        self.status
    }

    async fn save(&mut self, feed: &str, value: f32) -> Result<(), TelemetryError> {
        if !value.is_finite() {
            return Err(TelemetryError::InvalidValue);
        }
        if !self.status.is_connected() {
            return Err(TelemetryError::NotConnected);
        }
        info!("[cloud] {} <- {}", feed, units::payload(value));
        Ok(())
    }
}

/// Broker stand-in that refuses the first connection attempt, to exercise
/// the reconnect path, and logs every publish.
struct LoggingBroker {
    connected: bool,
    refusals_left: u32,
}

impl LoggingBroker {
    fn new() -> Self {
        Self {
            connected: false,
            refusals_left: 1,
        }
    }
}

impl BrokerSink for LoggingBroker {
    type Error = &'static str;

    async fn connect(&mut self, client_id: &str) -> Result<(), Self::Error> {
        if self.refusals_left > 0 {
            self.refusals_left -= 1;
            warn!("[broker] refusing {}", client_id);
            return Err("connection refused");
        }
        info!("[broker] {} connected", client_id);
        self.connected = true;
        Ok(())
    }

    fn connected(&mut self) -> bool {
        self.connected
    }

    fn state(&self) -> i32 {
        if self.connected { 0 } else { -2 }
    }

    async fn publish(&mut self, topic: &str, payload: &str) -> Result<(), Self::Error> {
        info!("[broker] {} <- {}", topic, payload);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

fn main() {
    env_logger::init();
    info!("Starting crawl-rs simulator (time x{})", TIME_SCALE);

    let panel = Rc::new(RefCell::new(Panel::new()));
    let mut monitor = Monitor::new(
        SimSensor::new(),
        SimDisplay {
            panel: panel.clone(),
        },
        LoggingCloud::new(),
        LoggingBroker::new(),
        SimDelay { panel },
        MonitorConfig::DEFAULT,
    );

    embassy_futures::block_on(monitor.run())
}
