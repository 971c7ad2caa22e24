//! # Fanout Registry
//!
//! Owns the `robot_id → subscribers` map and the broadcasting side of it.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use shared_types::RobotId;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, warn};

use crate::subscription::Subscription;
use crate::{FanoutMessage, SubscriberId, DEFAULT_CHANNEL_CAPACITY};

type SubscriberSet = HashMap<SubscriberId, mpsc::Sender<FanoutMessage>>;

/// Shared state behind every registry clone and every live subscription.
pub(crate) struct RegistryInner {
    /// The only structure mutated concurrently. Never held across an await.
    robots: Mutex<HashMap<RobotId, SubscriberSet>>,
    next_id: AtomicU64,
    capacity: usize,
    delivered: AtomicU64,
    dropped: AtomicU64,
}

impl RegistryInner {
    /// Remove one channel. Unknown ids are ignored.
    pub(crate) fn remove(&self, robot_id: &RobotId, id: SubscriberId) -> bool {
        let mut robots = self.robots.lock();
        let Some(set) = robots.get_mut(robot_id) else {
            return false;
        };
        let removed = set.remove(&id).is_some();
        if set.is_empty() {
            robots.remove(robot_id);
        }
        if removed {
            debug!(robot_id = %robot_id, subscriber_id = id, "Subscriber unregistered");
        }
        removed
    }
}

/// Delivery counters since the registry was created.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FanoutStats {
    /// Events handed to a subscriber queue.
    pub delivered: u64,
    /// Events lost because a subscriber queue was full.
    pub dropped: u64,
}

/// Registry of live observers keyed by robot.
///
/// Cloning is cheap and every clone refers to the same map.
#[derive(Clone)]
pub struct FanoutRegistry {
    inner: Arc<RegistryInner>,
}

impl FanoutRegistry {
    /// Create a registry with the default per-subscriber capacity.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    /// Create a registry whose subscriber queues hold `capacity` events.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            inner: Arc::new(RegistryInner {
                robots: Mutex::new(HashMap::new()),
                next_id: AtomicU64::new(1),
                capacity: capacity.max(1),
                delivered: AtomicU64::new(0),
                dropped: AtomicU64::new(0),
            }),
        }
    }

    /// Add a fresh delivery channel for `robot_id`.
    ///
    /// The returned handle unregisters itself when dropped.
    #[must_use]
    pub fn register(&self, robot_id: RobotId) -> Subscription {
        let (sender, receiver) = mpsc::channel(self.inner.capacity);
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);

        {
            let mut robots = self.inner.robots.lock();
            robots.entry(robot_id.clone()).or_default().insert(id, sender);
        }

        debug!(robot_id = %robot_id, subscriber_id = id, "Subscriber registered");

        Subscription::new(robot_id, id, receiver, Arc::downgrade(&self.inner))
    }

    /// Remove a delivery channel.
    ///
    /// Removing an unknown or already removed channel is a no-op. Returns
    /// whether a channel was actually removed.
    pub fn unregister(&self, robot_id: &RobotId, id: SubscriberId) -> bool {
        self.inner.remove(robot_id, id)
    }

    /// Deliver `message` to every channel registered for `robot_id` right now.
    ///
    /// Never waits on a subscriber. Returns the number of channels that
    /// accepted the message.
    pub fn broadcast(&self, robot_id: &RobotId, message: impl Into<FanoutMessage>) -> usize {
        let message = message.into();
        let mut robots = self.inner.robots.lock();
        let Some(set) = robots.get_mut(robot_id) else {
            return 0;
        };

        let mut accepted = 0;
        let mut closed = Vec::new();
        for (id, sender) in set.iter() {
            match sender.try_send(Arc::clone(&message)) {
                Ok(()) => accepted += 1,
                Err(TrySendError::Full(_)) => {
                    self.inner.dropped.fetch_add(1, Ordering::Relaxed);
                    warn!(
                        robot_id = %robot_id,
                        subscriber_id = *id,
                        "Subscriber queue full, event dropped for this subscriber"
                    );
                }
                Err(TrySendError::Closed(_)) => closed.push(*id),
            }
        }

        for id in closed {
            set.remove(&id);
            debug!(robot_id = %robot_id, subscriber_id = id, "Pruned closed subscriber");
        }
        if set.is_empty() {
            robots.remove(robot_id);
        }

        self.inner
            .delivered
            .fetch_add(accepted as u64, Ordering::Relaxed);
        accepted
    }

    /// Total live subscribers across all robots.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.inner.robots.lock().values().map(HashMap::len).sum()
    }

    /// Live subscribers for one robot.
    #[must_use]
    pub fn subscribers_for(&self, robot_id: &RobotId) -> usize {
        self.inner
            .robots
            .lock()
            .get(robot_id)
            .map_or(0, HashMap::len)
    }

    /// Number of robots with at least one live subscriber.
    #[must_use]
    pub fn robot_count(&self) -> usize {
        self.inner.robots.lock().len()
    }

    /// Per-subscriber queue capacity.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.inner.capacity
    }

    #[must_use]
    pub fn stats(&self) -> FanoutStats {
        FanoutStats {
            delivered: self.inner.delivered.load(Ordering::Relaxed),
            dropped: self.inner.dropped.load(Ordering::Relaxed),
        }
    }
}

impl Default for FanoutRegistry {
    fn default() -> Self {
        Self::new()
    }
}
