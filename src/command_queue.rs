use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::{oneshot, watch};
use tracing::{debug, trace, warn};

use crate::decent_scale::ConnectionState;
use crate::encoding::{hex, Command};
use crate::error::{ScaleError, TransportError};
use crate::transport::Transport;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendMode {
    /// Wait behind every command already queued.
    Queued,
    /// Jump the queue. Never overlaps a write that is already in flight.
    Override,
}

type Reply = oneshot::Sender<Result<(), TransportError>>;

struct QueueState<C> {
    pending: VecDeque<(Command, Reply)>,
    sending: bool,
    target: Option<C>,
}

/// Serializes writes to the command characteristic: at most one write is
/// in flight, and queued commands go out in submission order.
pub struct CommandQueue<T: Transport> {
    transport: Arc<T>,
    link: watch::Receiver<ConnectionState>,
    state: Mutex<QueueState<T::Characteristic>>,
}

impl<T: Transport> CommandQueue<T> {
    pub(crate) fn new(transport: Arc<T>, link: watch::Receiver<ConnectionState>) -> Self {
        Self {
            transport,
            link,
            state: Mutex::new(QueueState {
                pending: VecDeque::new(),
                sending: false,
                target: None,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, QueueState<T::Characteristic>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn is_link_up(&self) -> bool {
        *self.link.borrow() == ConnectionState::Connected
    }

    pub(crate) fn attach(&self, target: T::Characteristic) {
        self.lock().target = Some(target);
    }

    /// Forgets the command characteristic and every queued command. A write
    /// already in flight is left to resolve on its own.
    pub(crate) fn reset(&self) {
        let mut state = self.lock();
        if !state.pending.is_empty() {
            debug!(dropped = state.pending.len(), "discarding queued commands");
        }
        state.pending.clear();
        state.target = None;
    }

    pub fn pending(&self) -> usize {
        self.lock().pending.len()
    }

    pub fn is_sending(&self) -> bool {
        self.lock().sending
    }

    /// Transmits `command`, or queues it behind the write in flight, and
    /// resolves with that command's own write result.
    ///
    /// Commands submitted while the scale is not connected are dropped and
    /// resolve `Ok`, as do queued commands discarded by a link loss. The call
    /// that finds the queue idle keeps draining it until it is empty, handing
    /// each drained command's result back to its submitter. Failed commands
    /// are not retried.
    pub async fn submit(&self, command: Command, mode: SendMode) -> Result<(), ScaleError> {
        let (reply, result) = oneshot::channel();
        let drains = {
            let mut state = self.lock();
            if !(self.is_link_up() && state.target.is_some()) {
                debug!(?command, "not connected, dropping command");
                return Ok(());
            }

            if state.sending {
                debug!(?command, ?mode, "adding command to queue");
            }
            match mode {
                SendMode::Queued => state.pending.push_back((command, reply)),
                SendMode::Override => state.pending.push_front((command, reply)),
            }
            let idle = !state.sending;
            state.sending = true;
            idle
        };

        if drains {
            self.drain().await;
        }

        match result.await {
            Ok(written) => written.map_err(ScaleError::Write),
            Err(_) => {
                debug!(?command, "command discarded before it was sent");
                Ok(())
            }
        }
    }

    async fn drain(&self) {
        while let Some((command, reply, target)) = self.next_pending() {
            let frame = command.frame();
            debug!(frame = %hex(&frame), "sending command data");
            let written = self.transport.write(&target, &frame).await;
            if let Err(e) = &written {
                warn!(error = %e, frame = %hex(&frame), "command write failed, dropping it");
            }
            // The submitter may have given up waiting.
            let _ = reply.send(written);
        }
    }

    fn next_pending(&self) -> Option<(Command, Reply, T::Characteristic)> {
        let mut state = self.lock();
        let target = match (self.is_link_up(), state.target.clone()) {
            (true, Some(target)) => target,
            _ => {
                if !state.pending.is_empty() {
                    debug!(dropped = state.pending.len(), "link down, discarding queued commands");
                }
                state.pending.clear();
                state.sending = false;
                return None;
            }
        };

        match state.pending.pop_front() {
            Some((command, reply)) => {
                trace!(?command, "next command");
                Some((command, reply, target))
            }
            None => {
                state.sending = false;
                trace!("finished sending commands");
                None
            }
        }
    }
}
