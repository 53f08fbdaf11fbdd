//! The monitor itself: setup sequence and the endless polling loop.
//!
//! [`Monitor`] owns every peripheral and client. The entry point builds it,
//! calls [`Monitor::run`] and never gets control back. Nothing here is
//! global; the firmware and the simulator each construct their own.

use embedded_hal_async::delay::DelayNs;
use log::{error, info, warn};
use thiserror_no_std::Error;

use crate::broker::{BrokerError, BrokerPublisher, BrokerSink};
use crate::config::{MonitorConfig, millis};
use crate::display::screens::{ReadingsScreen, StatusScreen};
use crate::display::{DisplayRenderer, DisplaySink};
use crate::reading::Reading;
use crate::sensors::{SensorError, SensorSource};
use crate::telemetry::{TelemetryError, TelemetrySink};
use crate::units::{self, Tenths};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorState {
    Uninitialized,
    /// Setup could not find the sensor. The loop keeps reading and
    /// displaying but never touches the network.
    SensorMissing,
    Online,
}

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum AppError {
    #[error("Sensor error: {0}")]
    Sensor(#[from] SensorError),
    #[error("Cloud error: {0}")]
    Telemetry(#[from] TelemetryError),
    #[error("Broker error: {0}")]
    Broker(#[from] BrokerError),
    #[error("Reading is not valid, nothing to publish")]
    InvalidReading,
}

pub struct Monitor<S, D, T, B, W> {
    sensor: S,
    display: DisplayRenderer<D>,
    telemetry: T,
    broker: BrokerPublisher<B>,
    delay: W,
    config: MonitorConfig,
    state: MonitorState,
    status: StatusScreen,
}

impl<S, D, T, B, W> Monitor<S, D, T, B, W>
where
    S: SensorSource,
    D: DisplaySink,
    T: TelemetrySink,
    B: BrokerSink,
    W: DelayNs,
{
    pub fn new(
        sensor: S,
        display: D,
        telemetry: T,
        broker: B,
        delay: W,
        config: MonitorConfig,
    ) -> Self {
        let policy = config.timing.reconnect_policy();
        Self {
            sensor,
            display: DisplayRenderer::new(display),
            telemetry,
            broker: BrokerPublisher::new(broker, config.device_id, policy),
            delay,
            config,
            state: MonitorState::Uninitialized,
            status: StatusScreen::new(),
        }
    }

    pub fn state(&self) -> MonitorState {
        self.state
    }

    pub fn display(&self) -> &DisplayRenderer<D> {
        &self.display
    }

    pub fn telemetry(&self) -> &T {
        &self.telemetry
    }

    pub fn broker(&self) -> &BrokerPublisher<B> {
        &self.broker
    }

    /// Set up, then poll forever.
    pub async fn run(&mut self) -> ! {
        self.setup().await;
        loop {
            self.run_iteration().await;
        }
    }

    /// Bring up the display and sensor, then connect to Adafruit IO.
    ///
    /// Every phase is shown on the status screen. Without a sensor the cloud
    /// and broker are never contacted.
    pub async fn setup(&mut self) -> MonitorState {
        info!("Starting {}", self.config.device_id);
        self.display.begin().await;

        let name = self.sensor.name();
        self.status.clear();
        self.status.push(format_args!("Initializing {}\n", name));
        self.show_status().await;

        let sensor = match self.sensor.begin().await {
            Ok(info) => info,
            Err(e) => {
                error!("Did not find {} sensor: {}", name, e);
                self.status.push(format_args!("No {} sensor", name));
                self.show_status().await;
                self.state = MonitorState::SensorMissing;
                return self.state;
            }
        };

        info!("Found {} sensor, serial {:016X}", sensor.model, sensor.serial);
        self.status.push(format_args!("Found {} sensor\n", sensor.model));
        self.status
            .push(format_args!("Serial #A: {}\n", sensor.serial_a()));
        self.status
            .push(format_args!("Serial #B: {}\n", sensor.serial_b()));
        self.show_status().await;
        self.hold().await;

        self.connect_cloud().await;

        info!("Setup MQTT broker {:?}", self.config.broker.remote());
        self.status.clear();
        self.status.push(format_args!("Setup MQTT broker.\n"));
        self.show_status().await;
        self.status.push(format_args!("MQTT broker enabled."));
        self.show_status().await;
        self.hold().await;

        self.state = MonitorState::Online;
        self.state
    }

    /// One pass of the loop. Returns the reading it took.
    pub async fn run_iteration(&mut self) -> Reading {
        let online = self.state == MonitorState::Online;

        if online {
            self.telemetry.run().await;
        }

        let reading = self.read_sensor().await;
        info!(
            "Temperature: {:>4}F",
            Tenths(reading.temperature_fahrenheit())
        );
        info!("Humidity: {:>4}", Tenths(reading.humidity_percent));

        let screen = ReadingsScreen::new(&reading);
        self.display.render(&screen.lines()).await;

        if online {
            if let Err(e) = self.publish_cloud(&reading).await {
                warn!("Adafruit IO publish skipped: {}", e);
            }
            if let Err(e) = self.publish_broker(&reading).await {
                warn!("MQTT broker publish skipped: {}", e);
            }
        }

        self.display.flush().await;

        self.delay
            .delay_ms(millis(self.config.timing.poll_interval))
            .await;
        embassy_futures::yield_now().await;
        self.display.flush().await;

        reading
    }

    async fn read_sensor(&mut self) -> Reading {
        match self.sensor.read().await {
            Ok(reading) => reading,
            Err(e) => {
                error!("{}", AppError::from(e));
                Reading::INVALID
            }
        }
    }

    async fn connect_cloud(&mut self) {
        info!("Connecting to Adafruit IO");
        self.status.clear();
        self.status.push(format_args!("Connecting to\nAdafruit IO"));
        self.show_status().await;

        self.telemetry.connect().await;
        while !self.telemetry.status().is_connected() {
            self.status.push(format_args!("."));
            self.show_status().await;
            self.delay
                .delay_ms(millis(self.config.timing.cloud_status_poll))
                .await;
            self.telemetry.run().await;
        }

        let text = self.telemetry.status_text();
        info!("{}", text);
        self.status.clear();
        self.status.push(format_args!("{}", text));
        self.show_status().await;
        self.hold().await;
    }

    /// Fahrenheit temperature and humidity to the two feeds.
    async fn publish_cloud(&mut self, reading: &Reading) -> Result<(), AppError> {
        if !reading.is_valid() {
            return Err(AppError::InvalidReading);
        }

        let cloud = &self.config.cloud;
        let temperature = self
            .telemetry
            .save(cloud.temperature_feed, reading.temperature_fahrenheit())
            .await;
        let humidity = self
            .telemetry
            .save(cloud.humidity_feed, reading.humidity_percent)
            .await;
        temperature.and(humidity).map_err(AppError::from)
    }

    /// Celsius temperature and humidity to the two broker topics,
    /// reconnecting first if the session dropped.
    async fn publish_broker(&mut self, reading: &Reading) -> Result<(), AppError> {
        self.broker.ensure_connected(&mut self.delay).await?;

        if !reading.is_valid() {
            return Err(AppError::InvalidReading);
        }

        let broker = &self.config.broker;
        let temperature = units::payload(reading.temperature_celsius);
        let humidity = units::payload(reading.humidity_percent);
        let temperature = self
            .broker
            .publish(broker.temperature_topic, &temperature)
            .await;
        let humidity = self.broker.publish(broker.humidity_topic, &humidity).await;
        temperature.and(humidity).map_err(AppError::from)
    }

    async fn show_status(&mut self) {
        self.display.render(&[self.status.line()]).await;
    }

    async fn hold(&mut self) {
        self.delay
            .delay_ms(millis(self.config.timing.status_hold))
            .await;
    }
}
