use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use futures::future::{BoxFuture, FutureExt};
use futures::StreamExt;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::command_queue::{CommandQueue, SendMode};
use crate::config::{LedSettings, ScaleConfig};
use crate::constants::{
    CharacteristicDescriptor, CharacteristicRole, Firmware, TimerCommand, SERVICES, SERVICE_UUID,
};
use crate::decoding::{decode, Notification};
use crate::encoding::Command;
use crate::error::{ScaleError, TransportError};
use crate::events::{EventDispatcher, ScaleEvent};
use crate::transport::{DisconnectStream, NotificationStream, Transport};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
}

struct Link<T: Transport> {
    device: T::Device,
    data: NotificationStream,
    command: T::Characteristic,
    disconnects: DisconnectStream,
}

struct Session<T: Transport> {
    device: T::Device,
    notifications: JoinHandle<()>,
    watcher: JoinHandle<()>,
}

/// Connection manager and command API for a Decent scale.
pub struct DecentScale<T: Transport> {
    transport: Arc<T>,
    state: watch::Sender<ConnectionState>,
    queue: CommandQueue<T>,
    events: EventDispatcher,
    auto_reconnect: AtomicBool,
    initial_led: LedSettings,
    session: Mutex<Option<Session<T>>>,
    pub(crate) current_weight: Mutex<Option<f32>>,
    pub(crate) firmware: Mutex<Option<Firmware>>,
}

impl<T: Transport> DecentScale<T> {
    pub fn new(transport: T, config: ScaleConfig) -> Self {
        let transport = Arc::new(transport);
        let (state, link) = watch::channel(ConnectionState::Disconnected);
        Self {
            queue: CommandQueue::new(Arc::clone(&transport), link),
            transport,
            state,
            events: EventDispatcher::new(),
            auto_reconnect: AtomicBool::new(config.auto_reconnect),
            initial_led: config.initial_led,
            session: Mutex::new(None),
            current_weight: Mutex::new(None),
            firmware: Mutex::new(None),
        }
    }

    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    pub fn state_changes(&self) -> watch::Receiver<ConnectionState> {
        self.state.subscribe()
    }

    pub fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Connected
    }

    pub fn events(&self) -> &EventDispatcher {
        &self.events
    }

    pub fn queue(&self) -> &CommandQueue<T> {
        &self.queue
    }

    pub fn auto_reconnect(&self) -> bool {
        self.auto_reconnect.load(Ordering::SeqCst)
    }

    pub fn set_auto_reconnect(&self, enabled: bool) {
        self.auto_reconnect.store(enabled, Ordering::SeqCst);
    }

    pub async fn current_weight(&self) -> Option<f32> {
        *self.current_weight.lock().await
    }

    /// Firmware reported by the most recent LED status message.
    pub async fn firmware(&self) -> Option<Firmware> {
        *self.firmware.lock().await
    }

    /// Connects, discovers the scale's GATT topology and starts decoding
    /// notifications. Returns immediately if already connected or connecting.
    /// Discovery failures abort the attempt and are not retried.
    pub async fn connect(self: &Arc<Self>) -> Result<(), ScaleError> {
        info!("attempting to connect");
        let claimed = self.state.send_if_modified(|state| {
            if *state == ConnectionState::Disconnected {
                *state = ConnectionState::Connecting;
                true
            } else {
                false
            }
        });
        if !claimed {
            info!(state = ?self.state(), "already connected or connecting");
            return Ok(());
        }

        let link = match self.open_link().await {
            Ok(link) => link,
            Err(e) => {
                warn!(error = %e, "connection attempt failed");
                self.state.send_replace(ConnectionState::Disconnected);
                return Err(e);
            }
        };

        {
            let mut session = self.session.lock().await;
            self.queue.attach(link.command);
            self.state.send_replace(ConnectionState::Connected);
            let stale = session.replace(Session {
                device: link.device,
                notifications: self.spawn_notification_pump(link.data),
                watcher: self.spawn_disconnect_watcher(link.disconnects),
            });
            if let Some(stale) = stale {
                stale.notifications.abort();
                stale.watcher.abort();
            }
        }

        if let Err(e) = self.set_led(self.initial_led).await {
            warn!(error = %e, "initial display mode command failed");
        }

        info!("connection complete");
        self.events.dispatch(&ScaleEvent::Connected);
        Ok(())
    }

    /// Closes the link. A user initiated disconnect never reconnects.
    ///
    /// Only an established session is closed. While a connect attempt is
    /// still in progress this is a no-op returning `Ok`, and the attempt goes
    /// on to reach Connected; call `disconnect` again once it has.
    pub async fn disconnect(&self) -> Result<(), ScaleError> {
        info!("attempting to disconnect");
        let Some(session) = self.session.lock().await.take() else {
            info!("already disconnected");
            return Ok(());
        };
        session.watcher.abort();
        session.notifications.abort();
        self.state.send_replace(ConnectionState::Disconnected);
        self.queue.reset();

        let result = self
            .transport
            .disconnect(&session.device)
            .await
            .map_err(ScaleError::Link);
        info!("disconnected");
        self.events.dispatch(&ScaleEvent::Disconnected);
        result
    }

    async fn open_link(&self) -> Result<Link<T>, ScaleError> {
        debug!("getting device");
        let device = self
            .transport
            .request_device(SERVICE_UUID)
            .await
            .map_err(ScaleError::DeviceSelectionFailed)?;
        let disconnects = self
            .transport
            .disconnect_events(&device)
            .await
            .map_err(ScaleError::Link)?;

        debug!("getting server");
        let server = self
            .transport
            .gatt_connect(&device)
            .await
            .map_err(ScaleError::Link)?;

        match self.discover(&server).await {
            Ok((data, command)) => Ok(Link {
                device,
                data,
                command,
                disconnects,
            }),
            Err(e) => {
                if let Err(close) = self.transport.disconnect(&device).await {
                    warn!(error = %close, "could not close link after failed discovery");
                }
                Err(e)
            }
        }
    }

    async fn discover(
        &self,
        server: &T::Server,
    ) -> Result<(NotificationStream, T::Characteristic), ScaleError> {
        let mut data = None;
        let mut command = None;
        for descriptor in SERVICES.iter().filter(|s| s.required) {
            debug!(service = descriptor.name, "getting service");
            let service = self
                .transport
                .get_service(server, descriptor.uuid)
                .await
                .map_err(|source| discovery_failed(descriptor.name, descriptor.uuid, source))?;

            for characteristic in descriptor.characteristics {
                debug!(characteristic = characteristic.name, "getting characteristic");
                let handle = self
                    .transport
                    .get_characteristic(&service, characteristic.uuid)
                    .await
                    .map_err(|source| {
                        discovery_failed(characteristic.name, characteristic.uuid, source)
                    })?;
                let properties = self.transport.properties(&handle);

                match characteristic.role {
                    CharacteristicRole::Data => {
                        require(characteristic, properties.notify, "notify")?;
                        debug!(characteristic = characteristic.name, "starting notifications");
                        let stream = self
                            .transport
                            .subscribe_notify(&handle)
                            .await
                            .map_err(|source| {
                                discovery_failed(characteristic.name, characteristic.uuid, source)
                            })?;
                        data = Some(stream);
                    }
                    CharacteristicRole::Command => {
                        require(characteristic, properties.write, "write")?;
                        command = Some(handle);
                    }
                    CharacteristicRole::Unused => {}
                }
            }
        }

        match (data, command) {
            (Some(data), Some(command)) => Ok((data, command)),
            _ => Err(discovery_failed(
                "main",
                SERVICE_UUID,
                TransportError::NotFound(SERVICE_UUID),
            )),
        }
    }

    fn spawn_notification_pump(self: &Arc<Self>, mut data: NotificationStream) -> JoinHandle<()> {
        let me = Arc::downgrade(self);
        tokio::spawn(async move {
            while let Some(value) = data.next().await {
                let Some(scale) = me.upgrade() else { break };
                scale.handle_notification(&value).await;
            }
            debug!("notification stream ended");
        })
    }

    fn spawn_disconnect_watcher(self: &Arc<Self>, mut disconnects: DisconnectStream) -> JoinHandle<()> {
        let me = Arc::downgrade(self);
        tokio::spawn(async move {
            if disconnects.next().await.is_some() {
                if let Some(scale) = me.upgrade() {
                    scale.handle_link_lost().await;
                }
            }
        })
    }

    async fn handle_notification(&self, value: &[u8]) {
        let notification = decode(value);
        notification.log();

        match &notification {
            Notification::LedStatus(status) => *self.firmware.lock().await = status.firmware,
            Notification::Weight(reading) => {
                if let Some(weight) = reading.weight {
                    *self.current_weight.lock().await = Some(weight);
                }
            }
            _ => {}
        }

        if let Some(event) = ScaleEvent::from_notification(&notification) {
            self.events.dispatch(&event);
        }
    }

    async fn handle_link_lost(self: &Arc<Self>) {
        let Some(session) = self.session.lock().await.take() else {
            return;
        };
        session.notifications.abort();
        self.state.send_replace(ConnectionState::Disconnected);
        self.queue.reset();

        info!("disconnected");
        self.events.dispatch(&ScaleEvent::Disconnected);

        if self.auto_reconnect() {
            info!("attempting to reconnect");
            if let Err(e) = Self::reconnect(Arc::clone(self)).await {
                warn!(error = %e, "reconnect failed");
            }
        }
    }

    fn reconnect(self: Arc<Self>) -> BoxFuture<'static, Result<(), ScaleError>> {
        async move { self.connect().await }.boxed()
    }

    pub async fn submit(&self, command: Command, mode: SendMode) -> Result<(), ScaleError> {
        self.queue.submit(command, mode).await
    }

    pub async fn set_led(&self, settings: LedSettings) -> Result<(), ScaleError> {
        self.submit(Command::set_led(settings), SendMode::Queued).await
    }

    /// Jumps the command queue so it also works while the queue is backed up.
    pub async fn power_off(&self) -> Result<(), ScaleError> {
        self.submit(Command::power_off(), SendMode::Override).await
    }

    pub async fn set_timer_state(&self, command: TimerCommand) -> Result<(), ScaleError> {
        self.submit(Command::timer(command), SendMode::Queued).await
    }

    pub async fn start_timer(&self) -> Result<(), ScaleError> {
        self.set_timer_state(TimerCommand::Start).await
    }

    pub async fn stop_timer(&self) -> Result<(), ScaleError> {
        self.set_timer_state(TimerCommand::Stop).await
    }

    pub async fn reset_timer(&self) -> Result<(), ScaleError> {
        self.set_timer_state(TimerCommand::Reset).await
    }

    /// `counter` is echoed back in the tare acknowledgment.
    pub async fn tare(&self, counter: u8) -> Result<(), ScaleError> {
        self.submit(Command::tare(counter), SendMode::Queued).await
    }
}

fn discovery_failed(name: &'static str, uuid: Uuid, source: TransportError) -> ScaleError {
    ScaleError::ServiceDiscoveryFailed { name, uuid, source }
}

fn require(
    characteristic: &CharacteristicDescriptor,
    supported: bool,
    property: &'static str,
) -> Result<(), ScaleError> {
    if supported {
        Ok(())
    } else {
        Err(discovery_failed(
            characteristic.name,
            characteristic.uuid,
            TransportError::Unsupported {
                uuid: characteristic.uuid,
                property,
            },
        ))
    }
}
