use std::error::Error;
use std::sync::Arc;
use std::time::Duration;

use decent_scale::{
    logging, BtleplugTransport, DecentScale, EventKind, ListenMode, Listener, ScaleConfig,
    ScaleEvent, ScanConfig,
};
use tokio::time::sleep;
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    logging::init();

    let transport = BtleplugTransport::new(ScanConfig::default()).await?;
    let scale = Arc::new(DecentScale::new(transport, ScaleConfig::default()));

    let on_weight: Listener = Arc::new(|event: &ScaleEvent| {
        if let ScaleEvent::Weight(reading) = event {
            if reading.is_stable {
                info!(weight = ?reading.weight, "stable weight");
            }
        }
    });
    scale
        .events()
        .add_listener(EventKind::Weight, &on_weight, ListenMode::Always);

    let on_button: Listener = Arc::new(|event: &ScaleEvent| {
        if let ScaleEvent::ButtonTap(tap) = event {
            info!(button = ?tap.button, tap = ?tap.tap, "button pressed");
        }
    });
    scale
        .events()
        .add_listener(EventKind::ButtonTap, &on_button, ListenMode::Always);

    scale.connect().await?;

    scale.tare(0).await?;
    scale.start_timer().await?;
    sleep(Duration::from_secs(5)).await;
    scale.stop_timer().await?;

    sleep(Duration::from_secs(2)).await;
    scale.reset_timer().await?;
    info!(weight = ?scale.current_weight().await, firmware = ?scale.firmware().await, "done");

    scale.set_auto_reconnect(false);
    scale.disconnect().await?;
    Ok(())
}
