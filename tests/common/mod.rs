#![allow(dead_code)]

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_stream::stream;
use async_trait::async_trait;
use decent_scale::constants::{COMMAND_CHARACTERISTIC_UUID, DATA_CHARACTERISTIC_UUID};
use decent_scale::transport::{DisconnectStream, NotificationStream, Properties, Transport};
use decent_scale::TransportError;
use tokio::sync::mpsc;
use uuid::Uuid;

#[derive(Default)]
struct Inner {
    device_requests: usize,
    no_device: bool,
    missing: Option<Uuid>,
    writes: Vec<Vec<u8>>,
    in_flight: usize,
    max_in_flight: usize,
    failing_writes: usize,
    write_delay: Duration,
    connect_delay: Duration,
    disconnect_calls: usize,
    notify: Option<mpsc::UnboundedSender<Vec<u8>>>,
    link: Option<mpsc::UnboundedSender<()>>,
}

#[derive(Clone, Debug)]
pub struct MockCharacteristic {
    pub uuid: Uuid,
    pub properties: Properties,
}

/// In-memory peripheral exposing the scale's GATT layout.
pub struct MockTransport {
    inner: Arc<Mutex<Inner>>,
}

/// Test-side view of a [`MockTransport`] owned by the scale.
#[derive(Clone)]
pub struct MockHandle {
    inner: Arc<Mutex<Inner>>,
}

pub fn mock() -> (MockTransport, MockHandle) {
    let inner = Arc::new(Mutex::new(Inner::default()));
    (
        MockTransport {
            inner: Arc::clone(&inner),
        },
        MockHandle { inner },
    )
}

fn lock(inner: &Mutex<Inner>) -> MutexGuard<'_, Inner> {
    inner.lock().unwrap()
}

impl MockHandle {
    pub fn device_requests(&self) -> usize {
        lock(&self.inner).device_requests
    }

    pub fn writes(&self) -> Vec<Vec<u8>> {
        lock(&self.inner).writes.clone()
    }

    pub fn max_in_flight(&self) -> usize {
        lock(&self.inner).max_in_flight
    }

    pub fn disconnect_calls(&self) -> usize {
        lock(&self.inner).disconnect_calls
    }

    pub fn set_no_device(&self, no_device: bool) {
        lock(&self.inner).no_device = no_device;
    }

    pub fn set_missing(&self, uuid: Uuid) {
        lock(&self.inner).missing = Some(uuid);
    }

    pub fn set_write_delay(&self, delay: Duration) {
        lock(&self.inner).write_delay = delay;
    }

    pub fn set_connect_delay(&self, delay: Duration) {
        lock(&self.inner).connect_delay = delay;
    }

    pub fn fail_next_writes(&self, count: usize) {
        lock(&self.inner).failing_writes = count;
    }

    pub fn notify(&self, value: &[u8]) {
        let inner = lock(&self.inner);
        let sender = inner.notify.as_ref().expect("data characteristic not subscribed");
        sender.send(value.to_vec()).unwrap();
    }

    /// Simulates the peripheral dropping the link.
    pub fn drop_link(&self) {
        let inner = lock(&self.inner);
        let sender = inner.link.as_ref().expect("no disconnect listener");
        sender.send(()).unwrap();
    }
}

#[async_trait]
impl Transport for MockTransport {
    type Device = u32;
    type Server = ();
    type Service = Uuid;
    type Characteristic = MockCharacteristic;

    async fn request_device(&self, _service: Uuid) -> Result<u32, TransportError> {
        let mut inner = lock(&self.inner);
        inner.device_requests += 1;
        if inner.no_device {
            Err(TransportError::NoDeviceSelected)
        } else {
            Ok(1)
        }
    }

    async fn gatt_connect(&self, _device: &u32) -> Result<(), TransportError> {
        let delay = lock(&self.inner).connect_delay;
        tokio::time::sleep(delay).await;
        Ok(())
    }

    async fn get_service(&self, _server: &(), service: Uuid) -> Result<Uuid, TransportError> {
        match lock(&self.inner).missing {
            Some(missing) if missing == service => Err(TransportError::NotFound(service)),
            _ => Ok(service),
        }
    }

    async fn get_characteristic(
        &self,
        _service: &Uuid,
        characteristic: Uuid,
    ) -> Result<MockCharacteristic, TransportError> {
        if lock(&self.inner).missing == Some(characteristic) {
            return Err(TransportError::NotFound(characteristic));
        }
        let properties = Properties {
            notify: characteristic == DATA_CHARACTERISTIC_UUID,
            write: characteristic == COMMAND_CHARACTERISTIC_UUID,
        };
        Ok(MockCharacteristic {
            uuid: characteristic,
            properties,
        })
    }

    fn properties(&self, characteristic: &MockCharacteristic) -> Properties {
        characteristic.properties
    }

    async fn subscribe_notify(
        &self,
        _characteristic: &MockCharacteristic,
    ) -> Result<NotificationStream, TransportError> {
        let (tx, mut rx) = mpsc::unbounded_channel();
        lock(&self.inner).notify = Some(tx);
        Ok(Box::pin(stream! {
            while let Some(value) = rx.recv().await {
                yield value;
            }
        }))
    }

    async fn write(
        &self,
        _characteristic: &MockCharacteristic,
        bytes: &[u8],
    ) -> Result<(), TransportError> {
        let delay = {
            let mut inner = lock(&self.inner);
            inner.in_flight += 1;
            inner.max_in_flight = inner.max_in_flight.max(inner.in_flight);
            inner.write_delay
        };
        tokio::time::sleep(delay).await;

        let mut inner = lock(&self.inner);
        inner.in_flight -= 1;
        if inner.failing_writes > 0 {
            inner.failing_writes -= 1;
            return Err(TransportError::Write("link lost".to_string()));
        }
        inner.writes.push(bytes.to_vec());
        Ok(())
    }

    async fn disconnect_events(&self, _device: &u32) -> Result<DisconnectStream, TransportError> {
        let (tx, mut rx) = mpsc::unbounded_channel();
        lock(&self.inner).link = Some(tx);
        Ok(Box::pin(stream! {
            while let Some(()) = rx.recv().await {
                yield ();
            }
        }))
    }

    async fn disconnect(&self, _device: &u32) -> Result<(), TransportError> {
        lock(&self.inner).disconnect_calls += 1;
        Ok(())
    }
}

/// Polls `condition` while letting spawned tasks run, for up to a second.
pub async fn eventually<F: Fn() -> bool>(condition: F) -> bool {
    for _ in 0..200 {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    condition()
}

/// Gives spawned tasks a chance to run.
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(50)).await;
}
