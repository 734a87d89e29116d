use thiserror::Error;
use uuid::Uuid;

/// Failures reported by a [`Transport`](crate::transport::Transport).
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("no matching device was selected")]
    NoDeviceSelected,

    #[error("link error: {0}")]
    Link(String),

    #[error("{0} not exposed by the peripheral")]
    NotFound(Uuid),

    #[error("{uuid} does not support {property}")]
    Unsupported { uuid: Uuid, property: &'static str },

    #[error("write failed: {0}")]
    Write(String),

    #[error(transparent)]
    Backend(#[from] btleplug::Error),
}

#[derive(Debug, Error)]
pub enum ScaleError {
    #[error("device selection failed")]
    DeviceSelectionFailed(#[source] TransportError),

    #[error("could not open the GATT link")]
    Link(#[source] TransportError),

    #[error("discovery of {name} ({uuid}) failed")]
    ServiceDiscoveryFailed {
        name: &'static str,
        uuid: Uuid,
        #[source]
        source: TransportError,
    },

    #[error("command write failed")]
    Write(#[source] TransportError),
}
