//! State-change notifications.
//!
//! Listeners register with [`Notifier::subscribe`] and receive events over a
//! channel. Events are sent from the owning thread in the order the
//! corresponding mutations were applied.
//!
//! An unbounded listener that is never drained keeps every event in memory.
//! [`Notifier::subscribe_bounded`] caps the backlog instead; once it is full
//! further events are dropped for that listener until it catches up.

use crate::{MomentRecord, PositionSample, SessionStatus};
use chrono::Duration;
use std::sync::mpsc::{channel, sync_channel, Receiver, Sender, SyncSender, TrySendError};
use uuid::Uuid;

/// Something observable changed on the session controller
#[derive(Clone, Debug, PartialEq)]
pub enum SessionEvent {
    StatusChanged {
        from: SessionStatus,
        to: SessionStatus,
    },
    ElapsedUpdated(Duration),
    SampleAppended {
        sample: PositionSample,
        distance_meters: f64,
    },
    MomentAdded(MomentRecord),
    SessionCompleted(Uuid),
}

#[derive(Debug)]
enum Listener<E> {
    Unbounded(Sender<E>),
    Bounded(SyncSender<E>),
}

impl<E> Listener<E> {
    /// False once the receiving side is gone
    fn deliver(&self, event: E) -> bool {
        match self {
            Listener::Unbounded(tx) => tx.send(event).is_ok(),
            Listener::Bounded(tx) => match tx.try_send(event) {
                Ok(()) => true,
                Err(TrySendError::Full(_)) => {
                    tracing::debug!("Listener backlog full, event dropped");
                    true
                }
                Err(TrySendError::Disconnected(_)) => false,
            },
        }
    }
}

/// Fan-out of events to registered listeners
#[derive(Debug)]
pub struct Notifier<E> {
    listeners: Vec<Listener<E>>,
}

impl<E> Default for Notifier<E> {
    fn default() -> Self {
        Self {
            listeners: Vec::new(),
        }
    }
}

impl<E: Clone> Notifier<E> {
    /// Unbounded listener; the receiver must be drained to release events
    pub fn subscribe(&mut self) -> Receiver<E> {
        let (tx, rx) = channel();
        self.listeners.push(Listener::Unbounded(tx));
        rx
    }

    /// Listener holding at most `capacity` undelivered events
    pub fn subscribe_bounded(&mut self, capacity: usize) -> Receiver<E> {
        let (tx, rx) = sync_channel(capacity);
        self.listeners.push(Listener::Bounded(tx));
        rx
    }

    /// Deliver to every live listener; dropped receivers are forgotten
    pub fn emit(&mut self, event: E) {
        self.listeners.retain(|listener| listener.deliver(event.clone()));
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }
}
