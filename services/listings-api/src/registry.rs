//! Connection registry: the set of live WebSocket subscribers and the
//! fan-out that delivers each new listing to all of them.
//!
//! Each subscriber gets a bounded outbound queue. Its session task drains the
//! queue onto the socket; the registry only ever does non-blocking
//! `try_send`, so a broadcast never waits on a peer. A peer whose queue is
//! full (stalled) or closed (gone) is evicted on the spot.
//!
//! ```text
//!  broadcast(payload)
//!        │  snapshot handles under lock, then release
//!   ┌────┴─────┬──────────┐
//! ┌─▼──┐    ┌──▼─┐     ┌──▼─┐
//! │ q1 │    │ q2 │ ... │ qN │   bounded mpsc, try_send
//! └─┬──┘    └──┬─┘     └──┬─┘
//!   │          │          │     per-session writer task
//!  ws1        ws2        wsN
//! ```

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::mpsc::{self, error::TrySendError};
use uuid::Uuid;

/// Opaque identity of one subscriber connection. Never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Payloads are shared between all queues of one broadcast.
pub type Payload = Arc<str>;

/// Registry-side half of a subscriber.
#[derive(Debug)]
pub struct ConnectionHandle {
    id: ConnectionId,
    outbound: mpsc::Sender<Payload>,
}

/// Session-side half of a subscriber, returned by `register`.
///
/// `outbound` yields `None` once the registry has dropped the handle, which
/// is how a session learns it was evicted.
#[derive(Debug)]
pub struct Subscription {
    pub id: ConnectionId,
    pub outbound: mpsc::Receiver<Payload>,
}

/// Outcome of one broadcast call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    pub delivered: usize,
    pub evicted: usize,
}

pub struct ConnectionRegistry {
    connections: Mutex<Vec<Arc<ConnectionHandle>>>,
    /// Serializes broadcasts so every queue receives payloads in call order.
    fanout: Mutex<()>,
    buffer: usize,
}

impl ConnectionRegistry {
    /// `buffer` is the per-subscriber queue depth; a subscriber that falls
    /// this far behind is evicted.
    pub fn new(buffer: usize) -> Self {
        Self {
            connections: Mutex::new(Vec::new()),
            fanout: Mutex::new(()),
            buffer: buffer.max(1),
        }
    }

    /// Add a subscriber whose handshake has completed.
    ///
    /// The handle is fully built before it is inserted, so a concurrent
    /// broadcast either sees a usable handle or none at all.
    pub fn register(&self) -> Subscription {
        let (tx, rx) = mpsc::channel(self.buffer);
        let handle = Arc::new(ConnectionHandle {
            id: ConnectionId::new(),
            outbound: tx,
        });
        let id = handle.id;

        let count = {
            let mut connections = self.connections();
            connections.push(handle);
            connections.len()
        };
        tracing::info!(connection_id = %id, subscribers = count, "Subscriber registered");

        Subscription { id, outbound: rx }
    }

    /// Remove a subscriber. Returns whether it was still present; removing an
    /// unknown or already-removed id is a no-op.
    pub fn unregister(&self, id: ConnectionId) -> bool {
        let (removed, count) = {
            let mut connections = self.connections();
            let before = connections.len();
            connections.retain(|h| h.id != id);
            (connections.len() != before, connections.len())
        };
        if removed {
            tracing::info!(connection_id = %id, subscribers = count, "Subscriber unregistered");
        }
        removed
    }

    /// Queue `payload` for every live subscriber.
    ///
    /// Failures are per subscriber: a full or closed queue evicts that one
    /// handle and delivery continues with the rest. Nothing is reported to
    /// the caller as an error.
    pub fn broadcast(&self, payload: &str) -> BroadcastReport {
        let _order = self.fanout.lock().unwrap_or_else(PoisonError::into_inner);

        let snapshot: Vec<Arc<ConnectionHandle>> = self.connections().clone();
        let payload: Payload = Arc::from(payload);
        let mut report = BroadcastReport::default();

        for handle in snapshot {
            match handle.outbound.try_send(payload.clone()) {
                Ok(()) => report.delivered += 1,
                Err(TrySendError::Full(_)) => {
                    tracing::warn!(connection_id = %handle.id, "Subscriber queue full, evicting");
                    if self.unregister(handle.id) {
                        report.evicted += 1;
                    }
                }
                Err(TrySendError::Closed(_)) => {
                    tracing::debug!(connection_id = %handle.id, "Subscriber gone, evicting");
                    if self.unregister(handle.id) {
                        report.evicted += 1;
                    }
                }
            }
        }

        tracing::debug!(
            delivered = report.delivered,
            evicted = report.evicted,
            "Broadcast complete"
        );
        report
    }

    pub fn contains(&self, id: ConnectionId) -> bool {
        self.connections().iter().any(|h| h.id == id)
    }

    pub fn len(&self) -> usize {
        self.connections().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn connections(&self) -> MutexGuard<'_, Vec<Arc<ConnectionHandle>>> {
        self.connections.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc::error::TryRecvError;

    #[test]
    fn test_register_assigns_fresh_ids() {
        let registry = ConnectionRegistry::new(8);
        let a = registry.register();
        let b = registry.register();

        assert_ne!(a.id, b.id);
        assert_eq!(registry.len(), 2);
        assert!(registry.contains(a.id));
    }

    #[test]
    fn test_broadcast_skips_closed_connection() {
        let registry = ConnectionRegistry::new(8);
        let mut live1 = registry.register();
        let dead = registry.register();
        let mut live2 = registry.register();

        let dead_id = dead.id;
        drop(dead);

        let report = registry.broadcast("x");
        assert_eq!(report, BroadcastReport { delivered: 2, evicted: 1 });

        assert_eq!(&*live1.outbound.try_recv().unwrap(), "x");
        assert_eq!(&*live2.outbound.try_recv().unwrap(), "x");
        assert!(!registry.contains(dead_id));
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_unregister_is_idempotent() {
        let registry = ConnectionRegistry::new(8);
        let sub = registry.register();
        let other = registry.register();

        assert!(registry.unregister(sub.id));
        assert!(!registry.unregister(sub.id));
        assert_eq!(registry.len(), 1);

        // An id that was never registered.
        assert!(!registry.unregister(ConnectionId::new()));
        assert!(registry.contains(other.id));
    }

    #[test]
    fn test_unregister_closes_session_queue() {
        let registry = ConnectionRegistry::new(8);
        let mut sub = registry.register();

        registry.unregister(sub.id);
        assert_eq!(sub.outbound.try_recv(), Err(TryRecvError::Disconnected));
    }

    #[test]
    fn test_order_preserved_per_subscriber() {
        let registry = ConnectionRegistry::new(8);
        let mut sub = registry.register();

        registry.broadcast("a");
        registry.broadcast("b");

        assert_eq!(&*sub.outbound.try_recv().unwrap(), "a");
        assert_eq!(&*sub.outbound.try_recv().unwrap(), "b");
    }

    #[test]
    fn test_stalled_subscriber_is_evicted() {
        let registry = ConnectionRegistry::new(2);
        let mut slow = registry.register();
        let mut fast = registry.register();

        registry.broadcast("1");
        assert_eq!(&*fast.outbound.try_recv().unwrap(), "1");
        registry.broadcast("2");
        assert_eq!(&*fast.outbound.try_recv().unwrap(), "2");

        // slow has not read anything; its queue of 2 is now full.
        let report = registry.broadcast("3");
        assert_eq!(report, BroadcastReport { delivered: 1, evicted: 1 });
        assert!(!registry.contains(slow.id));
        assert_eq!(&*fast.outbound.try_recv().unwrap(), "3");

        // Already-queued messages still drain, then the queue ends.
        assert_eq!(&*slow.outbound.try_recv().unwrap(), "1");
        assert_eq!(&*slow.outbound.try_recv().unwrap(), "2");
        assert_eq!(slow.outbound.try_recv(), Err(TryRecvError::Disconnected));
    }

    #[test]
    fn test_broadcast_with_no_subscribers() {
        let registry = ConnectionRegistry::new(8);
        assert_eq!(registry.broadcast("x"), BroadcastReport::default());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_late_registration_misses_earlier_broadcast() {
        let registry = ConnectionRegistry::new(8);
        registry.broadcast("before");

        let mut sub = registry.register();
        registry.broadcast("after");

        assert_eq!(&*sub.outbound.try_recv().unwrap(), "after");
        assert_eq!(sub.outbound.try_recv(), Err(TryRecvError::Empty));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_register_unregister_and_broadcast() {
        let registry = Arc::new(ConnectionRegistry::new(1024));
        let mut steady = registry.register();

        let churn = {
            let registry = registry.clone();
            tokio::spawn(async move {
                for _ in 0..500 {
                    let sub = registry.register();
                    tokio::task::yield_now().await;
                    registry.unregister(sub.id);
                }
            })
        };
        let sender = {
            let registry = registry.clone();
            tokio::spawn(async move {
                for i in 0..500 {
                    registry.broadcast(&i.to_string());
                    tokio::task::yield_now().await;
                }
            })
        };

        churn.await.unwrap();
        sender.await.unwrap();

        assert_eq!(registry.len(), 1);
        for i in 0..500 {
            assert_eq!(&*steady.outbound.recv().await.unwrap(), i.to_string());
        }
    }
}
