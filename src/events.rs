//! Typed publish/subscribe for decoded telemetry and connection lifecycle.
//!
//! Listeners are compared by `Arc` identity: registering the same `Arc`
//! twice for one kind is a no-op, and removal needs the `Arc` that was
//! registered. Dispatch iterates over a snapshot of the registry, so a
//! listener may add or remove listeners (itself included) while it runs.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::decoding::{ButtonTap, LedStatus, Notification, TareAck, WeightReading};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Connected,
    Disconnected,
    Led,
    Tare,
    Weight,
    ButtonTap,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ScaleEvent {
    Connected,
    Disconnected,
    Led(LedStatus),
    Tare(TareAck),
    Weight(WeightReading),
    ButtonTap(ButtonTap),
}

impl ScaleEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            ScaleEvent::Connected => EventKind::Connected,
            ScaleEvent::Disconnected => EventKind::Disconnected,
            ScaleEvent::Led(_) => EventKind::Led,
            ScaleEvent::Tare(_) => EventKind::Tare,
            ScaleEvent::Weight(_) => EventKind::Weight,
            ScaleEvent::ButtonTap(_) => EventKind::ButtonTap,
        }
    }

    /// The event a notification is published as, if any.
    pub fn from_notification(notification: &Notification) -> Option<Self> {
        match notification {
            Notification::LedStatus(status) => Some(ScaleEvent::Led(status.clone())),
            Notification::TareAck(ack) => Some(ScaleEvent::Tare(*ack)),
            Notification::Weight(reading) => Some(ScaleEvent::Weight(*reading)),
            Notification::ButtonTap(tap) => Some(ScaleEvent::ButtonTap(*tap)),
            Notification::Unknown { .. } | Notification::Malformed { .. } => None,
        }
    }
}

pub type Listener = Arc<dyn Fn(&ScaleEvent) + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListenMode {
    Always,
    /// Unregistered before its first invocation.
    Once,
}

struct Registration {
    listener: Listener,
    mode: ListenMode,
}

#[derive(Default)]
pub struct EventDispatcher {
    listeners: Mutex<HashMap<EventKind, Vec<Registration>>>,
}

fn same_listener(a: &Listener, b: &Listener) -> bool {
    std::ptr::eq(Arc::as_ptr(a) as *const (), Arc::as_ptr(b) as *const ())
}

impl EventDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    fn registry(&self) -> MutexGuard<'_, HashMap<EventKind, Vec<Registration>>> {
        self.listeners.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns `false` if the listener was already registered for `kind`.
    pub fn add_listener(&self, kind: EventKind, listener: &Listener, mode: ListenMode) -> bool {
        let mut registry = self.registry();
        let registrations = registry.entry(kind).or_default();
        if registrations.iter().any(|r| same_listener(&r.listener, listener)) {
            return false;
        }
        registrations.push(Registration {
            listener: Arc::clone(listener),
            mode,
        });
        true
    }

    pub fn has_listener(&self, kind: EventKind, listener: &Listener) -> bool {
        self.registry()
            .get(&kind)
            .map_or(false, |rs| rs.iter().any(|r| same_listener(&r.listener, listener)))
    }

    pub fn remove_listener(&self, kind: EventKind, listener: &Listener) -> bool {
        let mut registry = self.registry();
        let Some(registrations) = registry.get_mut(&kind) else {
            return false;
        };
        let before = registrations.len();
        registrations.retain(|r| !same_listener(&r.listener, listener));
        before != registrations.len()
    }

    /// Invokes every listener registered for the event's kind at the time
    /// of the call, in registration order. Returns how many were invoked.
    pub fn dispatch(&self, event: &ScaleEvent) -> usize {
        let snapshot: Vec<Listener> = {
            let mut registry = self.registry();
            let Some(registrations) = registry.get_mut(&event.kind()) else {
                return 0;
            };
            let snapshot: Vec<Listener> =
                registrations.iter().map(|r| Arc::clone(&r.listener)).collect();
            registrations.retain(|r| r.mode == ListenMode::Always);
            snapshot
        };

        for listener in &snapshot {
            listener(event);
        }
        snapshot.len()
    }
}
