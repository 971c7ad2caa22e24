//! # Subscription Handle
//!
//! The consuming side of one delivery channel.

use std::pin::Pin;
use std::sync::Weak;
use std::task::{Context, Poll};

use shared_types::RobotId;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TryRecvError;
use tokio_stream::Stream;

use crate::registry::RegistryInner;
use crate::{FanoutMessage, SubscriberId};

/// Errors from subscription operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SubscriptionError {
    /// The channel was removed from the registry.
    #[error("Subscription closed")]
    Closed,
}

/// A live observer's delivery channel for one robot.
///
/// When dropped, the channel is removed from the registry. Dropping after an
/// explicit [`FanoutRegistry::unregister`](crate::FanoutRegistry::unregister)
/// is harmless.
pub struct Subscription {
    robot_id: RobotId,
    id: SubscriberId,
    receiver: mpsc::Receiver<FanoutMessage>,
    registry: Weak<RegistryInner>,
}

impl Subscription {
    pub(crate) fn new(
        robot_id: RobotId,
        id: SubscriberId,
        receiver: mpsc::Receiver<FanoutMessage>,
        registry: Weak<RegistryInner>,
    ) -> Self {
        Self {
            robot_id,
            id,
            receiver,
            registry,
        }
    }

    /// Wait for the next event.
    ///
    /// # Returns
    ///
    /// - `Some(message)` - The next event, in publish order
    /// - `None` - The channel was unregistered or the registry dropped
    pub async fn recv(&mut self) -> Option<FanoutMessage> {
        self.receiver.recv().await
    }

    /// Take the next event without waiting.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(message))` - An event was queued
    /// - `Ok(None)` - Nothing queued yet
    /// - `Err(SubscriptionError::Closed)` - The channel is gone
    pub fn try_recv(&mut self) -> Result<Option<FanoutMessage>, SubscriptionError> {
        match self.receiver.try_recv() {
            Ok(message) => Ok(Some(message)),
            Err(TryRecvError::Empty) => Ok(None),
            Err(TryRecvError::Disconnected) => Err(SubscriptionError::Closed),
        }
    }

    #[must_use]
    pub fn robot_id(&self) -> &RobotId {
        &self.robot_id
    }

    #[must_use]
    pub fn id(&self) -> SubscriberId {
        self.id
    }
}

impl Stream for Subscription {
    type Item = FanoutMessage;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.receiver.poll_recv(cx)
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            registry.remove(&self.robot_id, self.id);
        }
    }
}
