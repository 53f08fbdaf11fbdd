//! Wi-Fi station management
//!
//! Two tasks keep the network up underneath the monitor loop:
//! [`connection_task`] joins the access point and rejoins after a drop, and
//! [`net_task`] drives the embassy-net stack. The monitor never waits on
//! either; its MQTT transports simply fail to open while the link is down.

use embassy_net::{Runner, Stack};
use embassy_time::{Duration, Timer, WithTimeout};
use esp_radio::wifi::{ClientConfig, ModeConfig, WifiController, WifiDevice, WifiError};
use log::{info, warn};

const RETRY_DELAY: Duration = Duration::from_secs(5);
const DHCP_TIMEOUT: Duration = Duration::from_secs(15);
const LINK_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Station mode with the baked-in credentials.
pub fn configure(
    controller: &mut WifiController<'static>,
    ssid: &str,
    password: &str,
) -> Result<(), WifiError> {
    let client = ClientConfig::default()
        .with_ssid(ssid.into())
        .with_password(password.into());
    controller.set_config(&ModeConfig::Client(client))
}

#[embassy_executor::task]
pub async fn connection_task(mut controller: WifiController<'static>, stack: Stack<'static>) -> ! {
    loop {
        if !controller.is_started().unwrap_or(false) {
            info!("Starting Wi-Fi");
            if let Err(e) = controller.start_async().await {
                warn!("Wi-Fi start failed: {:?}", e);
                Timer::after(RETRY_DELAY).await;
                continue;
            }
        }

        info!("Joining access point...");
        if let Err(e) = controller.connect_async().await {
            warn!("Wi-Fi connect failed: {:?}", e);
            let _ = controller.disconnect_async().await;
            Timer::after(RETRY_DELAY).await;
            continue;
        }

        if stack.wait_config_up().with_timeout(DHCP_TIMEOUT).await.is_err() {
            warn!("DHCP timed out, rejoining");
            let _ = controller.disconnect_async().await;
            Timer::after(RETRY_DELAY).await;
            continue;
        }
        if let Some(config) = stack.config_v4() {
            info!("Wi-Fi up, address {}", config.address);
        }

        while stack.is_link_up() && matches!(controller.is_connected(), Ok(true)) {
            Timer::after(LINK_POLL_INTERVAL).await;
        }

        warn!("Wi-Fi link lost, reconnecting");
        let _ = controller.disconnect_async().await;
        Timer::after(RETRY_DELAY).await;
    }
}

#[embassy_executor::task]
pub async fn net_task(mut runner: Runner<'static, WifiDevice<'static>>) -> ! {
    runner.run().await
}
