//! Driver for the Decent Espresso BLE scale.
//!
//! [`DecentScale`] owns the connection lifecycle over any [`Transport`],
//! serializes control commands through a [`CommandQueue`] and publishes
//! decoded notifications through an [`EventDispatcher`].

pub mod btleplug_transport;
pub mod command_queue;
pub mod config;
pub mod constants;
pub mod decent_scale;
pub mod decoding;
pub mod encoding;
pub mod error;
pub mod events;
pub mod logging;
pub mod transport;

pub use btleplug_transport::BtleplugTransport;
pub use command_queue::{CommandQueue, SendMode};
pub use config::{LedSettings, ScaleConfig, ScanConfig};
pub use decent_scale::{ConnectionState, DecentScale};
pub use decoding::{decode, Notification};
pub use encoding::{encode, Command};
pub use error::{ScaleError, TransportError};
pub use events::{EventDispatcher, EventKind, ListenMode, Listener, ScaleEvent};
pub use transport::{Properties, Transport};
