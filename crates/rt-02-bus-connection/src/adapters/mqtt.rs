//! MQTT transport backed by `rumqttc`.

use std::collections::VecDeque;
use std::time::Duration;

use async_trait::async_trait;
use rumqttc::{
    AsyncClient, ConnectReturnCode, Event, EventLoop, MqttOptions, Outgoing, Packet, QoS,
    SubscribeReasonCode,
};
use shared_types::RawEvent;
use tracing::{debug, info};

use crate::error::TransportError;
use crate::ports::{BusSession, BusTransport};

/// Broker connection settings.
#[derive(Debug, Clone)]
pub struct MqttConfig {
    pub host: String,
    pub port: u16,
    pub client_id: String,
    pub username: Option<String>,
    pub password: Option<String>,
    pub keep_alive: Duration,
    /// Capacity of the client request queue.
    pub request_capacity: usize,
}

impl Default for MqttConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 1883,
            client_id: "robot-telemetry-ingest".to_string(),
            username: None,
            password: None,
            keep_alive: Duration::from_secs(30),
            request_capacity: 10,
        }
    }
}

pub struct MqttTransport {
    config: MqttConfig,
}

impl MqttTransport {
    pub fn new(config: MqttConfig) -> Self {
        Self { config }
    }

    fn options(&self) -> MqttOptions {
        let mut opts = MqttOptions::new(
            self.config.client_id.clone(),
            self.config.host.clone(),
            self.config.port,
        );
        opts.set_keep_alive(self.config.keep_alive);
        opts.set_clean_session(true);
        if let Some(username) = self.config.username.as_deref().filter(|u| !u.is_empty()) {
            opts.set_credentials(username, self.config.password.clone().unwrap_or_default());
        }
        opts
    }
}

#[async_trait]
impl BusTransport for MqttTransport {
    type Session = MqttSession;

    async fn connect(&self) -> Result<MqttSession, TransportError> {
        let (client, mut event_loop) = AsyncClient::new(self.options(), self.config.request_capacity);

        loop {
            match event_loop.poll().await {
                Ok(Event::Incoming(Packet::ConnAck(ack))) => {
                    if ack.code != ConnectReturnCode::Success {
                        return Err(TransportError::Connect(format!(
                            "broker refused connection: {:?}",
                            ack.code
                        )));
                    }
                    break;
                }
                Ok(_) => {}
                Err(e) => return Err(TransportError::Connect(e.to_string())),
            }
        }

        info!(
            host = %self.config.host,
            port = self.config.port,
            username = self.config.username.as_deref().unwrap_or("anonymous"),
            "MQTT connected"
        );

        Ok(MqttSession {
            client,
            event_loop,
            pending: VecDeque::new(),
        })
    }
}

/// A connected `rumqttc` client and its event loop.
pub struct MqttSession {
    client: AsyncClient,
    event_loop: EventLoop,
    /// Publishes that arrived while waiting for a SUBACK.
    pending: VecDeque<RawEvent>,
}

#[async_trait]
impl BusSession for MqttSession {
    async fn subscribe(&mut self, filter: &str) -> Result<(), TransportError> {
        self.client
            .subscribe(filter, QoS::AtLeastOnce)
            .await
            .map_err(|e| TransportError::Subscribe(e.to_string()))?;

        loop {
            match self.event_loop.poll().await {
                Ok(Event::Incoming(Packet::SubAck(ack))) => {
                    if ack
                        .return_codes
                        .iter()
                        .any(|code| matches!(code, SubscribeReasonCode::Failure))
                    {
                        return Err(TransportError::Subscribe(format!(
                            "broker rejected subscription to {filter}"
                        )));
                    }
                    info!(filter, "Subscribed");
                    return Ok(());
                }
                Ok(Event::Incoming(Packet::Publish(publish))) => {
                    self.pending
                        .push_back(RawEvent::new(publish.topic, publish.payload.to_vec()));
                }
                Ok(_) => {}
                Err(e) => return Err(TransportError::Subscribe(e.to_string())),
            }
        }
    }

    async fn next_message(&mut self) -> Result<RawEvent, TransportError> {
        if let Some(event) = self.pending.pop_front() {
            return Ok(event);
        }
        loop {
            match self.event_loop.poll().await {
                Ok(Event::Incoming(Packet::Publish(publish))) => {
                    return Ok(RawEvent::new(publish.topic, publish.payload.to_vec()));
                }
                Ok(Event::Incoming(Packet::Disconnect)) => return Err(TransportError::Closed),
                Ok(_) => {}
                Err(e) => return Err(TransportError::Receive(e.to_string())),
            }
        }
    }

    async fn close(&mut self) {
        if self.client.try_disconnect().is_err() {
            return;
        }
        // Drive the loop until the DISCONNECT is written or the socket is gone.
        let flushed = tokio::time::timeout(Duration::from_secs(1), async {
            loop {
                match self.event_loop.poll().await {
                    Ok(Event::Outgoing(Outgoing::Disconnect)) | Err(_) => break,
                    Ok(_) => {}
                }
            }
        })
        .await;
        debug!(clean = flushed.is_ok(), "MQTT session closed");
    }
}
