use tracing::{debug, info, trace, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::decoding::Notification;
use crate::encoding::hex;

/// Installs a `fmt` subscriber filtered by `RUST_LOG`, `info` by default.
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false))
        .init();
}

impl Notification {
    pub(crate) fn log(&self) {
        match self {
            Notification::LedStatus(status) => info!(
                unit = ?status.weight_unit,
                battery = ?status.battery_life,
                usb = status.is_usb,
                firmware = %status.firmware.map_or_else(|| "-".to_string(), |f| f.to_string()),
                "led"
            ),
            Notification::TareAck(ack) => info!(counter = ?ack.counter, "tare"),
            // Weight arrives several times a second.
            Notification::Weight(reading) => trace!(
                stable = reading.is_stable,
                weight = ?reading.weight,
                detail = ?reading.detail,
                "weight"
            ),
            Notification::ButtonTap(tap) => info!(button = ?tap.button, tap = ?tap.tap, "buttonTap"),
            Notification::Unknown { msg_type, payload } => debug!(
                msg_type = %format!("{:#04x}", msg_type),
                payload = %hex(payload),
                "uncaught message type"
            ),
            Notification::Malformed { payload } => {
                warn!(payload = %hex(payload), "notification too short to decode")
            }
        }
    }
}
