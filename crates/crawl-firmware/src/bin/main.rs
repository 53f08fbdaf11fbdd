#![no_std]
#![no_main]
#![deny(
    clippy::mem_forget,
    reason = "mem::forget is generally not safe to do with esp_hal types, especially those \
    holding buffers for the duration of a data transfer."
)]
#![deny(clippy::large_stack_frames)]

use crawl_core::config::MonitorConfig;
use crawl_core::display::sh1107::Sh1107;
use crawl_core::monitor::Monitor;
use crawl_core::mqtt::MqttClient;
use crawl_core::telemetry::AdafruitIo;
use crawl_firmware::hardware::{create_i2c_bus, share_i2c_bus};
use crawl_firmware::transport::TcpTransport;
use crawl_firmware::{secrets, wifi};
use embassy_executor::Spawner;
use embassy_net::StackResources;
use embassy_time::Delay;
use esp_hal::clock::CpuClock;
use esp_hal::rng::Rng;
use esp_hal::timer::timg::TimerGroup;
use log::{LevelFilter, info, warn};
use static_cell::StaticCell;

#[cfg(not(feature = "sensor-sht40"))]
use crawl_core::sensors::Si7021;
#[cfg(feature = "sensor-sht40")]
use crawl_core::sensors::sht40::Sht40;

/// Per-socket buffer size; MQTT packets here stay well under this.
const SOCKET_BUFFER: usize = 1024;

#[panic_handler]
fn panic(info: &core::panic::PanicInfo) -> ! {
    rtt_target::rprintln!("PANIC: {}", info);
    loop {}
}

extern crate alloc;

// This creates a default app-descriptor required by the esp-idf bootloader.
// For more information see: <https://docs.espressif.com/projects/esp-idf/en/stable/esp32/api-reference/system/app_image_format.html#application-description>
esp_bootloader_esp_idf::esp_app_desc!();

static RADIO: StaticCell<esp_radio::Controller<'static>> = StaticCell::new();
static NET_RESOURCES: StaticCell<StackResources<4>> = StaticCell::new();
static AIO_BUFFERS: StaticCell<[[u8; SOCKET_BUFFER]; 2]> = StaticCell::new();
static BROKER_BUFFERS: StaticCell<[[u8; SOCKET_BUFFER]; 2]> = StaticCell::new();

#[allow(
    clippy::large_stack_frames,
    reason = "it's not unusual to allocate larger buffers etc. in main"
)]
#[esp_rtos::main]
async fn main(spawner: Spawner) -> ! {
    rtt_target::rtt_init_log!(LevelFilter::Info);

    let config = esp_hal::Config::default().with_cpu_clock(CpuClock::max());
    let peripherals = esp_hal::init(config);

    // esp-radio keeps its Wi-Fi buffers on the heap
    esp_alloc::heap_allocator!(#[esp_hal::ram(reclaimed)] size: 73744);

    let timg0 = TimerGroup::new(peripherals.TIMG0);
    esp_rtos::start(timg0.timer0);

    info!("Embassy initialized!");

    for name in secrets::missing() {
        warn!("{} was empty at build time", name);
    }

    // Network
    let radio = RADIO.init(esp_radio::init().expect("Failed to initialize Wi-Fi/BLE controller"));
    let (mut wifi_controller, interfaces) =
        esp_radio::wifi::new(radio, peripherals.WIFI, Default::default())
            .expect("Failed to initialize Wi-Fi controller");
    wifi::configure(&mut wifi_controller, secrets::WIFI_SSID, secrets::WIFI_PASSWORD)
        .expect("Failed to configure Wi-Fi station");

    let rng = Rng::new();
    let seed = (u64::from(rng.random()) << 32) | u64::from(rng.random());
    let (stack, runner) = embassy_net::new(
        interfaces.sta,
        embassy_net::Config::dhcpv4(Default::default()),
        NET_RESOURCES.init(StackResources::new()),
        seed,
    );

    spawner.must_spawn(wifi::connection_task(wifi_controller, stack));
    spawner.must_spawn(wifi::net_task(runner));

    // I2C peripherals
    let i2c = create_i2c_bus(peripherals.I2C0, peripherals.GPIO3, peripherals.GPIO4)
        .expect("Failed to configure I2C0");
    let devices = share_i2c_bus(i2c);

    #[cfg(not(feature = "sensor-sht40"))]
    let sensor = Si7021::new(devices.sensor, Delay);
    #[cfg(feature = "sensor-sht40")]
    let sensor = Sht40::new(devices.sensor);

    let display = Sh1107::new(devices.display);

    // Cloud and broker sessions, one socket each
    let config = MonitorConfig::DEFAULT;

    let [aio_rx, aio_tx] = AIO_BUFFERS.init([[0; SOCKET_BUFFER]; 2]);
    let telemetry = AdafruitIo::new(
        TcpTransport::new(stack, aio_rx, aio_tx),
        &config.cloud,
        config.device_id,
        secrets::AIO_USERNAME,
        secrets::AIO_KEY,
    );

    let [broker_rx, broker_tx] = BROKER_BUFFERS.init([[0; SOCKET_BUFFER]; 2]);
    let broker = MqttClient::new(
        TcpTransport::new(stack, broker_rx, broker_tx),
        config.broker.remote(),
        config.broker.connect_options(),
    );

    let mut monitor = Monitor::new(sensor, display, telemetry, broker, Delay, config);
    monitor.run().await
}
