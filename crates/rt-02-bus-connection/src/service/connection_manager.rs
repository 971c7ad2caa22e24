//! Connection Manager
//!
//! Keeps exactly one live subscription to the status topic filter and hands
//! every inbound message to a [`RawEventHandler`].

use std::time::Duration;

use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::domain::{Backoff, BackoffPolicy, ConnectionState};
use crate::error::TransportError;
use crate::ports::{BusSession, BusTransport, RawEventHandler};

/// Why a connected session ended.
enum SessionExit {
    Shutdown,
    Failed(TransportError),
}

/// Drives the reconnect state machine over a [`BusTransport`].
pub struct ConnectionManager<T: BusTransport> {
    transport: T,
    filter: String,
    policy: BackoffPolicy,
    state_tx: watch::Sender<ConnectionState>,
}

impl<T: BusTransport> ConnectionManager<T> {
    pub fn new(transport: T, filter: impl Into<String>) -> Self {
        Self::with_policy(transport, filter, BackoffPolicy::default())
    }

    pub fn with_policy(transport: T, filter: impl Into<String>, policy: BackoffPolicy) -> Self {
        let (state_tx, _) = watch::channel(ConnectionState::Disconnected);
        Self {
            transport,
            filter: filter.into(),
            policy,
            state_tx,
        }
    }

    /// Observe state transitions.
    pub fn state(&self) -> watch::Receiver<ConnectionState> {
        self.state_tx.subscribe()
    }

    pub fn current_state(&self) -> ConnectionState {
        *self.state_tx.borrow()
    }

    pub fn filter(&self) -> &str {
        &self.filter
    }

    /// Run until `shutdown` turns `true` or its sender is dropped.
    ///
    /// Never returns on its own otherwise: every transport error leads to a
    /// backoff and another attempt. An open session is closed on every exit
    /// path.
    pub async fn run<H>(&self, handler: &H, mut shutdown: watch::Receiver<bool>)
    where
        H: RawEventHandler + ?Sized,
    {
        let mut backoff = Backoff::new(self.policy);

        loop {
            self.set_state(ConnectionState::Connecting);
            info!(filter = %self.filter, "Connecting to message bus");

            let connected = tokio::select! {
                biased;
                _ = shutdown_requested(&mut shutdown) => None,
                result = self.transport.connect() => Some(result),
            };

            let failure = match connected {
                None => break,
                Some(Err(e)) => e,
                Some(Ok(mut session)) => {
                    match self.serve(&mut session, handler, &mut shutdown, &mut backoff).await {
                        SessionExit::Shutdown => {
                            session.close().await;
                            break;
                        }
                        SessionExit::Failed(e) => {
                            session.close().await;
                            e
                        }
                    }
                }
            };

            let delay = backoff.next_delay();
            warn!(
                error = %failure,
                delay_secs = delay.as_secs_f64(),
                recoverable = true,
                "Bus connection lost, reconnecting after backoff"
            );
            self.set_state(ConnectionState::Backoff(delay));

            if !self.sleep_unless_shutdown(delay, &mut shutdown).await {
                break;
            }
        }

        self.set_state(ConnectionState::Disconnected);
        info!("Connection manager stopped");
    }

    /// Subscribe, then dispatch messages until the session fails or shutdown.
    async fn serve<H>(
        &self,
        session: &mut T::Session,
        handler: &H,
        shutdown: &mut watch::Receiver<bool>,
        backoff: &mut Backoff,
    ) -> SessionExit
    where
        H: RawEventHandler + ?Sized,
    {
        let subscribed = tokio::select! {
            biased;
            _ = shutdown_requested(shutdown) => None,
            result = session.subscribe(&self.filter) => Some(result),
        };
        match subscribed {
            None => return SessionExit::Shutdown,
            Some(Err(e)) => return SessionExit::Failed(e),
            Some(Ok(())) => {}
        }

        backoff.reset();
        self.set_state(ConnectionState::Connected);
        info!(filter = %self.filter, "Bus connected and subscribed");

        loop {
            let next = tokio::select! {
                biased;
                _ = shutdown_requested(shutdown) => None,
                message = session.next_message() => Some(message),
            };
            match next {
                None => return SessionExit::Shutdown,
                Some(Ok(event)) => {
                    debug!(topic = %event.topic, bytes = event.payload.len(), "Message received");
                    handler.on_raw_event(event).await;
                }
                Some(Err(e)) => return SessionExit::Failed(e),
            }
        }
    }

    /// Returns `false` if shutdown was requested before `delay` elapsed.
    async fn sleep_unless_shutdown(
        &self,
        delay: Duration,
        shutdown: &mut watch::Receiver<bool>,
    ) -> bool {
        tokio::select! {
            biased;
            _ = shutdown_requested(shutdown) => false,
            _ = tokio::time::sleep(delay) => true,
        }
    }

    fn set_state(&self, state: ConnectionState) {
        let previous = self.state_tx.send_replace(state);
        if previous != state {
            debug!(from = %previous, to = %state, "Connection state changed");
        }
    }
}

/// Resolves once shutdown is signalled or the sender is gone.
async fn shutdown_requested(shutdown: &mut watch::Receiver<bool>) {
    loop {
        if *shutdown.borrow_and_update() {
            return;
        }
        if shutdown.changed().await.is_err() {
            return;
        }
    }
}
