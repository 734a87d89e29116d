use std::collections::BTreeSet;

use async_stream::stream;
use async_trait::async_trait;
use btleplug::api::{
    Central, CentralEvent, CharPropFlags, Characteristic, Manager as _, Peripheral as _,
    ScanFilter, Service, WriteType,
};
use btleplug::platform::{Adapter, Manager, Peripheral};
use futures::stream::StreamExt;
use tokio::time::timeout;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::config::ScanConfig;
use crate::error::TransportError;
use crate::transport::{DisconnectStream, NotificationStream, Properties, Transport};

/// [`Transport`] backed by the host's first Bluetooth adapter.
pub struct BtleplugTransport {
    adapter: Adapter,
    config: ScanConfig,
}

pub struct GattService {
    peripheral: Peripheral,
    service: Service,
}

#[derive(Clone)]
pub struct GattCharacteristic {
    peripheral: Peripheral,
    characteristic: Characteristic,
}

impl BtleplugTransport {
    pub async fn new(config: ScanConfig) -> Result<Self, TransportError> {
        let manager = Manager::new().await?;
        let adapter = manager
            .adapters()
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| TransportError::Link("no bluetooth adapter available".to_string()))?;
        Ok(Self { adapter, config })
    }

    async fn advertises(peripheral: &Peripheral, service: Uuid) -> bool {
        peripheral
            .properties()
            .await
            .ok()
            .flatten()
            .map_or(false, |props| props.services.contains(&service))
    }

    async fn known_peripheral(&self, service: Uuid) -> Option<Peripheral> {
        for peripheral in self.adapter.peripherals().await.ok()? {
            if Self::advertises(&peripheral, service).await {
                return Some(peripheral);
            }
        }
        None
    }

    async fn scan_for(&self, service: Uuid) -> Result<Option<Peripheral>, TransportError> {
        let mut events = self.adapter.events().await?;
        self.adapter
            .start_scan(ScanFilter {
                services: vec![service],
            })
            .await?;

        let adapter = &self.adapter;
        let found = timeout(self.config.timeout, async {
            while let Some(event) = events.next().await {
                if let CentralEvent::DeviceDiscovered(id) = event {
                    let Ok(peripheral) = adapter.peripheral(&id).await else {
                        continue;
                    };
                    if Self::advertises(&peripheral, service).await {
                        return Some(peripheral);
                    }
                }
            }
            None
        })
        .await
        .ok()
        .flatten();

        if let Err(e) = self.adapter.stop_scan().await {
            warn!(error = %e, "could not stop scanning");
        }
        Ok(found)
    }
}

impl From<CharPropFlags> for Properties {
    fn from(flags: CharPropFlags) -> Self {
        Properties {
            notify: flags.contains(CharPropFlags::NOTIFY),
            write: flags.intersects(CharPropFlags::WRITE | CharPropFlags::WRITE_WITHOUT_RESPONSE),
        }
    }
}

#[async_trait]
impl Transport for BtleplugTransport {
    type Device = Peripheral;
    type Server = Peripheral;
    type Service = GattService;
    type Characteristic = GattCharacteristic;

    async fn request_device(&self, service: Uuid) -> Result<Peripheral, TransportError> {
        if let Some(peripheral) = self.known_peripheral(service).await {
            debug!(id = ?peripheral.id(), "using known peripheral");
            return Ok(peripheral);
        }
        match self.scan_for(service).await? {
            Some(peripheral) => {
                debug!(id = ?peripheral.id(), "discovered peripheral");
                Ok(peripheral)
            }
            None => Err(TransportError::NoDeviceSelected),
        }
    }

    async fn gatt_connect(&self, device: &Peripheral) -> Result<Peripheral, TransportError> {
        let link_error = |e: btleplug::Error| TransportError::Link(e.to_string());
        if !device.is_connected().await.map_err(link_error)? {
            device.connect().await.map_err(link_error)?;
        }
        device.discover_services().await.map_err(link_error)?;
        Ok(device.clone())
    }

    async fn get_service(
        &self,
        server: &Peripheral,
        service: Uuid,
    ) -> Result<GattService, TransportError> {
        let services: BTreeSet<Service> = server.services();
        services
            .into_iter()
            .find(|s| s.uuid == service)
            .map(|found| GattService {
                peripheral: server.clone(),
                service: found,
            })
            .ok_or(TransportError::NotFound(service))
    }

    async fn get_characteristic(
        &self,
        service: &GattService,
        characteristic: Uuid,
    ) -> Result<GattCharacteristic, TransportError> {
        service
            .service
            .characteristics
            .iter()
            .find(|c| c.uuid == characteristic)
            .map(|found| GattCharacteristic {
                peripheral: service.peripheral.clone(),
                characteristic: found.clone(),
            })
            .ok_or(TransportError::NotFound(characteristic))
    }

    fn properties(&self, characteristic: &GattCharacteristic) -> Properties {
        characteristic.characteristic.properties.into()
    }

    async fn subscribe_notify(
        &self,
        characteristic: &GattCharacteristic,
    ) -> Result<NotificationStream, TransportError> {
        let peripheral = &characteristic.peripheral;
        let mut notifications = peripheral.notifications().await?;
        peripheral.subscribe(&characteristic.characteristic).await?;

        let uuid = characteristic.characteristic.uuid;
        Ok(Box::pin(stream! {
            while let Some(notification) = notifications.next().await {
                if notification.uuid == uuid {
                    yield notification.value;
                }
            }
        }))
    }

    async fn write(
        &self,
        characteristic: &GattCharacteristic,
        bytes: &[u8],
    ) -> Result<(), TransportError> {
        let write_type = if characteristic
            .characteristic
            .properties
            .contains(CharPropFlags::WRITE)
        {
            WriteType::WithResponse
        } else {
            WriteType::WithoutResponse
        };
        characteristic
            .peripheral
            .write(&characteristic.characteristic, bytes, write_type)
            .await
            .map_err(|e| TransportError::Write(e.to_string()))
    }

    async fn disconnect_events(&self, device: &Peripheral) -> Result<DisconnectStream, TransportError> {
        let id = device.id();
        let mut events = self.adapter.events().await?;
        Ok(Box::pin(stream! {
            while let Some(event) = events.next().await {
                if let CentralEvent::DeviceDisconnected(disconnected) = event {
                    if disconnected == id {
                        yield ();
                    }
                }
            }
        }))
    }

    async fn disconnect(&self, device: &Peripheral) -> Result<(), TransportError> {
        device
            .disconnect()
            .await
            .map_err(|e| TransportError::Link(e.to_string()))
    }
}
