use crate::event::Event;
use crate::subscription::protocol::ServerMessage;
use dashmap::DashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use thiserror::Error;
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, error, info};

/// Frames an observer may have queued before it is considered stalled
pub const DEFAULT_QUEUE_CAPACITY: usize = 1024;

/// A serialized frame, shared by every observer it is pushed to
pub type Frame = Arc<str>;

/// Registry key of a connected observer
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ObserverId(u64);

impl fmt::Display for ObserverId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "observer-{}", self.0)
    }
}

/// Receiving side of an observer registration
///
/// Frames arrive in publish order. `recv` yields `None` once the observer
/// has been disconnected or evicted.
pub struct Observer {
    id: ObserverId,
    rx: mpsc::Receiver<Frame>,
}

impl Observer {
    pub fn id(&self) -> ObserverId {
        self.id
    }

    /// Wait for the next frame
    pub async fn recv(&mut self) -> Option<Frame> {
        self.rx.recv().await
    }

    /// Next frame if one is already queued
    pub fn try_recv(&mut self) -> Option<Frame> {
        self.rx.try_recv().ok()
    }
}

/// Push to an observer failed; the observer gets evicted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SendFailure {
    /// Receiving side was dropped
    #[error("send to {0} failed: observer is gone")]
    Gone(ObserverId),

    /// Queue is full, the observer stopped draining it
    #[error("send to {0} failed: observer queue is full")]
    Stalled(ObserverId),
}

impl SendFailure {
    pub fn observer(&self) -> ObserverId {
        match self {
            SendFailure::Gone(id) | SendFailure::Stalled(id) => *id,
        }
    }
}

/// Sending side kept in the registry
#[derive(Clone)]
struct ObserverSender {
    id: ObserverId,
    tx: mpsc::Sender<Frame>,
}

impl ObserverSender {
    /// Never blocks. A full queue fails the same way as a dropped receiver.
    fn send(&self, frame: &Frame) -> Result<(), SendFailure> {
        self.tx.try_send(Arc::clone(frame)).map_err(|e| match e {
            TrySendError::Full(_) => SendFailure::Stalled(self.id),
            TrySendError::Closed(_) => SendFailure::Gone(self.id),
        })
    }
}

/// Broadcast hub fans events out to every live observer
///
/// Delivery is best-effort and at-most-once. Each observer sees events in
/// the order `publish` was called; an observer whose send fails (receiver
/// dropped or queue full) is evicted for good.
pub struct BroadcastHub {
    /// Concurrent registry, mutated by connect/disconnect while publishing
    observers: DashMap<ObserverId, ObserverSender>,

    next_id: AtomicU64,

    /// Per-observer queue capacity
    capacity: usize,

    /// Serializes fan-out so all observers agree on event order
    fanout: Mutex<()>,
}

impl BroadcastHub {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_QUEUE_CAPACITY)
    }

    /// Hub whose observers each buffer at most `capacity` frames (minimum 1)
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            observers: DashMap::new(),
            next_id: AtomicU64::new(1),
            capacity: capacity.max(1),
            fanout: Mutex::new(()),
        }
    }

    /// Register a new observer. Only events published after this call are
    /// delivered; nothing is replayed.
    pub fn connect(&self) -> Observer {
        let id = ObserverId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let (tx, rx) = mpsc::channel(self.capacity);

        self.observers.insert(id, ObserverSender { id, tx });

        info!(observer_id = %id, observers = self.observers.len(), "Observer connected");
        Observer { id, rx }
    }

    /// Remove an observer. Idempotent; returns whether it was still registered.
    pub fn disconnect(&self, id: ObserverId) -> bool {
        let removed = self.observers.remove(&id).is_some();
        if removed {
            info!(observer_id = %id, observers = self.observers.len(), "Observer disconnected");
        }
        removed
    }

    /// Push `event` to every registered observer.
    ///
    /// Returns the number of observers the frame was handed to. Failed
    /// observers are evicted silently; nothing is surfaced to the caller.
    pub fn publish(&self, event: &Event) -> usize {
        let frame: Frame = match ServerMessage::event(event).to_json() {
            Ok(json) => json.into(),
            Err(e) => {
                error!(error = %e, event_id = %event.id, "Failed to serialize event frame");
                return 0;
            }
        };

        let _order = self.fanout.lock().unwrap_or_else(PoisonError::into_inner);

        // Snapshot so connect/disconnect never contend with the fan-out loop
        let targets: Vec<ObserverSender> = self
            .observers
            .iter()
            .map(|entry| entry.value().clone())
            .collect();

        let mut delivered = 0;
        for target in &targets {
            match target.send(&frame) {
                Ok(()) => delivered += 1,
                Err(failure) => {
                    debug!(error = %failure, "Evicting observer");
                    self.observers.remove(&failure.observer());
                }
            }
        }

        debug!(event_id = %event.id, delivered, "Event published");
        delivered
    }

    /// Number of currently registered observers
    pub fn observer_count(&self) -> usize {
        self.observers.len()
    }
}

impl Default for BroadcastHub {
    fn default() -> Self {
        Self::new()
    }
}
