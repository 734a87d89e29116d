use std::pin::Pin;

use async_trait::async_trait;
use futures::Stream;
use uuid::Uuid;

use crate::error::TransportError;

/// Raw values pushed by a subscribed characteristic, in arrival order.
pub type NotificationStream = Pin<Box<dyn Stream<Item = Vec<u8>> + Send>>;

/// Yields once for every time the link to a device drops.
pub type DisconnectStream = Pin<Box<dyn Stream<Item = ()> + Send>>;

/// The characteristic capabilities the driver checks during discovery.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Properties {
    pub notify: bool,
    /// Either kind of write, with or without response.
    pub write: bool,
}

/// The BLE primitives the scale driver needs. Each call is a suspension
/// point; nothing else in the driver awaits.
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    type Device: Clone + Send + Sync + 'static;
    type Server: Send + Sync + 'static;
    type Service: Send + Sync + 'static;
    type Characteristic: Clone + Send + Sync + 'static;

    /// Finds a peripheral advertising `service`.
    async fn request_device(&self, service: Uuid) -> Result<Self::Device, TransportError>;

    async fn gatt_connect(&self, device: &Self::Device) -> Result<Self::Server, TransportError>;

    async fn get_service(
        &self,
        server: &Self::Server,
        service: Uuid,
    ) -> Result<Self::Service, TransportError>;

    async fn get_characteristic(
        &self,
        service: &Self::Service,
        characteristic: Uuid,
    ) -> Result<Self::Characteristic, TransportError>;

    fn properties(&self, characteristic: &Self::Characteristic) -> Properties;

    async fn subscribe_notify(
        &self,
        characteristic: &Self::Characteristic,
    ) -> Result<NotificationStream, TransportError>;

    /// Resolves once the write has completed.
    async fn write(
        &self,
        characteristic: &Self::Characteristic,
        bytes: &[u8],
    ) -> Result<(), TransportError>;

    async fn disconnect_events(
        &self,
        device: &Self::Device,
    ) -> Result<DisconnectStream, TransportError>;

    async fn disconnect(&self, device: &Self::Device) -> Result<(), TransportError>;
}
