//! # Mock Publisher
//!
//! Simulates a fleet of robots publishing status messages to the broker, for
//! local runs and load tests. Robots publish round-robin so the whole fleet
//! covers one `publish_interval`; a fraction of messages can be made to
//! violate the drive-id rule.
//!
//! Reconnects with the same 1s → 30s exponential backoff as the ingest side.

mod robot;

pub use robot::{corrupt_drive_rule, SimulatedRobot};

use std::env;
use std::time::Duration;

use chrono::Utc;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rt_01_status_validation::TopicFormat;
use rt_02_bus_connection::{Backoff, BackoffPolicy, MqttConfig};
use rumqttc::{AsyncClient, ConnectReturnCode, Event, EventLoop, MqttOptions, Packet, QoS};
use shared_types::RobotId;
use thiserror::Error;
use tokio::sync::watch;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::container::config::{bool_var, parse_var};

/// Shortest accepted fleet-wide publish interval.
const MIN_PUBLISH_INTERVAL: Duration = Duration::from_millis(100);
/// Shortest pause between two publishes.
const MIN_TICK: Duration = Duration::from_millis(10);

#[derive(Debug, Error)]
pub enum PublisherError {
    #[error("ROBOT_COUNT must be >= 1")]
    NoRobots,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("connection refused: {0:?}")]
    Refused(ConnectReturnCode),
}

#[derive(Debug, Clone)]
pub struct PublisherConfig {
    pub mqtt: MqttConfig,
    pub robot_count: usize,
    /// Time for every robot to publish once.
    pub publish_interval: Duration,
    /// Fraction of messages, in `[0, 1]`, that break the drive-id rule.
    pub invalid_rate: f64,
    /// Upper bound of the random pause added to every tick.
    pub jitter_max: Duration,
    /// Throughput log period. `None` disables it.
    pub stats_interval: Option<Duration>,
}

impl Default for PublisherConfig {
    fn default() -> Self {
        Self {
            mqtt: MqttConfig {
                client_id: "robot-mock-publisher".to_string(),
                ..MqttConfig::default()
            },
            robot_count: 2,
            publish_interval: Duration::from_secs(1),
            invalid_rate: 0.0,
            jitter_max: Duration::from_millis(200),
            stats_interval: None,
        }
    }
}

impl PublisherConfig {
    /// Load from the process environment.
    ///
    /// # Environment Variables
    ///
    /// - `MQTT_HOST`, `MQTT_PORT`, `MQTT_USERNAME`, `MQTT_PASSWORD`, `MQTT_CLIENT_ID`
    /// - `ROBOT_COUNT` (default 2)
    /// - `PUBLISH_INTERVAL_SEC` (default 1.0, min 0.1)
    /// - `INVALID_RATE` (default 0.0, clamped to [0, 1])
    /// - `JITTER_MAX_SEC` (default 0.2)
    /// - `STATS_LOG_INTERVAL_SEC` (setting it enables stats logging)
    /// - `ENABLE_STATS_LOG` (enables stats logging every 5s)
    pub fn from_env() -> Self {
        Self::from_lookup(|name| env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let non_empty = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let mqtt = MqttConfig {
            host: non_empty("MQTT_HOST").unwrap_or(defaults.mqtt.host.clone()),
            port: parse_var(&lookup, "MQTT_PORT", defaults.mqtt.port),
            client_id: non_empty("MQTT_CLIENT_ID").unwrap_or(defaults.mqtt.client_id.clone()),
            username: non_empty("MQTT_USERNAME"),
            password: lookup("MQTT_PASSWORD"),
            ..defaults.mqtt
        };

        let publish_interval = parse_var(&lookup, "PUBLISH_INTERVAL_SEC", 1.0_f64);
        let invalid_rate = parse_var(&lookup, "INVALID_RATE", 0.0_f64);
        let jitter_max = parse_var(&lookup, "JITTER_MAX_SEC", 0.2_f64);

        let stats_interval = match lookup("STATS_LOG_INTERVAL_SEC") {
            Some(_) => Some(seconds(parse_var(&lookup, "STATS_LOG_INTERVAL_SEC", 5.0_f64))),
            None if bool_var(&lookup, "ENABLE_STATS_LOG", false) => Some(Duration::from_secs(5)),
            None => None,
        };

        Self {
            mqtt,
            robot_count: parse_var(&lookup, "ROBOT_COUNT", defaults.robot_count),
            publish_interval: seconds(publish_interval).max(MIN_PUBLISH_INTERVAL),
            invalid_rate: if invalid_rate.is_nan() {
                0.0
            } else {
                invalid_rate.clamp(0.0, 1.0)
            },
            jitter_max: seconds(jitter_max),
            stats_interval,
        }
    }

    /// Pause between consecutive publishes, before jitter.
    pub fn tick(&self) -> Duration {
        let robots = u32::try_from(self.robot_count.max(1)).unwrap_or(u32::MAX);
        (self.publish_interval / robots).max(MIN_TICK)
    }
}

/// Non-negative, finite seconds; anything else is zero.
fn seconds(value: f64) -> Duration {
    if value.is_finite() && value > 0.0 {
        Duration::from_secs_f64(value)
    } else {
        Duration::ZERO
    }
}

/// Publish counters for throughput logging.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PublishStats {
    pub published: u64,
    pub corrupted: u64,
    pub dropped: u64,
}

/// Round-robin fleet simulation with its own random source.
pub struct Fleet {
    robots: Vec<SimulatedRobot>,
    cursor: usize,
    invalid_rate: f64,
    topics: TopicFormat,
    rng: StdRng,
}

impl Fleet {
    pub fn new(robot_count: usize, invalid_rate: f64, mut rng: StdRng) -> Self {
        let invalid_rate = if invalid_rate.is_nan() {
            0.0
        } else {
            invalid_rate.clamp(0.0, 1.0)
        };
        let robots = (1..=robot_count)
            .map(|i| SimulatedRobot::new(SimulatedRobot::serial_for(i), &mut rng))
            .collect();
        Self {
            robots,
            cursor: 0,
            invalid_rate,
            topics: TopicFormat::default(),
            rng,
        }
    }

    pub fn len(&self) -> usize {
        self.robots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.robots.is_empty()
    }

    /// Next `(topic, payload, corrupted)` in round-robin order.
    pub fn next_message(&mut self) -> Option<(String, Vec<u8>, bool)> {
        if self.robots.is_empty() {
            return None;
        }
        let index = self.cursor;
        self.cursor = (index + 1) % self.robots.len();
        let robot = &mut self.robots[index];

        let mut payload = robot.tick(&mut self.rng, Utc::now());
        let corrupted = self.invalid_rate > 0.0 && self.rng.gen_bool(self.invalid_rate);
        if corrupted {
            corrupt_drive_rule(&mut payload);
        }
        let topic = self.topics.topic_for(&RobotId::new(robot.serial()));
        Some((topic, payload.to_string().into_bytes(), corrupted))
    }

    /// Random extra pause in `[0, jitter_max]`.
    pub fn jitter(&mut self, jitter_max: Duration) -> Duration {
        if jitter_max.is_zero() {
            return Duration::ZERO;
        }
        jitter_max.mul_f64(self.rng.gen_range(0.0..=1.0))
    }
}

/// Run until `shutdown` turns `true`, reconnecting with backoff.
pub async fn run(
    config: PublisherConfig,
    mut shutdown: watch::Receiver<bool>,
) -> Result<PublishStats, PublisherError> {
    if config.robot_count == 0 {
        return Err(PublisherError::NoRobots);
    }

    let mut fleet = Fleet::new(config.robot_count, config.invalid_rate, StdRng::from_entropy());
    let mut stats = PublishStats::default();
    let mut backoff = Backoff::new(BackoffPolicy::default());

    info!(
        robot_count = config.robot_count,
        interval_sec = config.publish_interval.as_secs_f64(),
        tick_sec = config.tick().as_secs_f64(),
        invalid_rate = config.invalid_rate,
        "Publisher started"
    );

    loop {
        if *shutdown.borrow() {
            return Ok(stats);
        }
        info!(host = %config.mqtt.host, port = config.mqtt.port, "Connecting to MQTT broker");

        let session = tokio::select! {
            _ = stop_requested(&mut shutdown) => return Ok(stats),
            connected = connect(&config.mqtt) => connected,
        };
        let result = match session {
            Ok((client, event_loop)) => {
                info!("MQTT connected");
                backoff.reset();
                publish_loop(&config, &mut fleet, &mut stats, client, event_loop, &mut shutdown)
                    .await
            }
            Err(e) => Err(e),
        };

        match result {
            Ok(()) => return Ok(stats),
            Err(e) => {
                let delay = backoff.next_delay();
                warn!(error = %e, retry_in_secs = delay.as_secs(), "MQTT error, reconnecting");
                tokio::select! {
                    _ = stop_requested(&mut shutdown) => return Ok(stats),
                    _ = tokio::time::sleep(delay) => {}
                }
            }
        }
    }
}

/// Resolves once shutdown is requested or the sender is gone.
async fn stop_requested(shutdown: &mut watch::Receiver<bool>) {
    let _ = shutdown.wait_for(|stop| *stop).await;
}

async fn connect(config: &MqttConfig) -> Result<(AsyncClient, EventLoop), PublisherError> {
    let mut options = MqttOptions::new(&config.client_id, &config.host, config.port);
    options.set_keep_alive(config.keep_alive);
    if let Some(username) = &config.username {
        options.set_credentials(username, config.password.clone().unwrap_or_default());
    }

    let (client, mut event_loop) = AsyncClient::new(options, config.request_capacity);
    loop {
        match event_loop.poll().await {
            Ok(Event::Incoming(Packet::ConnAck(ack))) => {
                if ack.code != ConnectReturnCode::Success {
                    return Err(PublisherError::Refused(ack.code));
                }
                return Ok((client, event_loop));
            }
            Ok(_) => {}
            Err(e) => return Err(PublisherError::Connection(e.to_string())),
        }
    }
}

/// Publish until shutdown (`Ok`) or a connection error (`Err`).
async fn publish_loop(
    config: &PublisherConfig,
    fleet: &mut Fleet,
    stats: &mut PublishStats,
    client: AsyncClient,
    mut event_loop: EventLoop,
    shutdown: &mut watch::Receiver<bool>,
) -> Result<(), PublisherError> {
    let tick = config.tick();
    let started = Instant::now();
    let mut next_publish = Instant::now();
    let mut last_stats = Instant::now();

    loop {
        tokio::select! {
            _ = stop_requested(shutdown) => {
                let _ = client.try_disconnect();
                return Ok(());
            }
            polled = event_loop.poll() => {
                polled.map_err(|e| PublisherError::Connection(e.to_string()))?;
            }
            _ = tokio::time::sleep_until(next_publish) => {
                if let Some((topic, payload, corrupted)) = fleet.next_message() {
                    match client.try_publish(topic.as_str(), QoS::AtLeastOnce, false, payload) {
                        Ok(()) => {
                            stats.published += 1;
                            stats.corrupted += u64::from(corrupted);
                        }
                        Err(e) => {
                            stats.dropped += 1;
                            debug!(topic = %topic, error = %e, "Publish queue full, message dropped");
                        }
                    }
                }
                next_publish = Instant::now() + tick + fleet.jitter(config.jitter_max);

                if let Some(period) = config.stats_interval {
                    if last_stats.elapsed() >= period {
                        let elapsed = started.elapsed().as_secs_f64().max(0.001);
                        info!(
                            total = stats.published,
                            corrupted = stats.corrupted,
                            dropped = stats.dropped,
                            rate = stats.published as f64 / elapsed,
                            "Published"
                        );
                        last_stats = Instant::now();
                    }
                }
            }
        }
    }
}
