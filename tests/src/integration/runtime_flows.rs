//! # Runtime Flows
//!
//! The assembled runtime over a real HTTP listener, with the fake broker in
//! place of MQTT.
//!
//! ## Flows Tested
//!
//! 1. Health and metrics answer while ingestion runs
//! 2. A live feed receives what the broker publishes, and shutdown ends it
//! 3. History over HTTP returns what was ingested

#[cfg(test)]
mod tests {
    use std::net::{IpAddr, Ipv4Addr, SocketAddr};
    use std::sync::Arc;

    use fleet_telemetry::IngestMetrics;
    use ingest_runtime::{IngestContainer, IngestRuntime, RuntimeConfig};
    use rt_03_ingestion::InMemoryStatusStore;
    use rt_04_api_gateway::GatewayConfig;
    use shared_types::RobotId;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpStream;
    use tokio::time::timeout;

    use crate::support::{
        bytes, eventually, idle_status, moving_status, status_topic, wait_connected, FakeBroker,
        DRIVE_A, DRIVE_B, WAIT,
    };

    // =========================================================================
    // TEST FIXTURES
    // =========================================================================

    async fn start_runtime() -> (IngestRuntime, FakeBroker, Arc<InMemoryStatusStore>) {
        let config = RuntimeConfig {
            gateway: GatewayConfig {
                host: IpAddr::V4(Ipv4Addr::LOCALHOST),
                port: 0,
                ..GatewayConfig::default()
            },
            ..RuntimeConfig::default()
        };
        let store = Arc::new(InMemoryStatusStore::new());
        let container =
            IngestContainer::new(config, store.clone(), Arc::new(IngestMetrics::new().unwrap()));
        let broker = FakeBroker::new();

        let runtime = IngestRuntime::start_with_transport(container, broker.clone())
            .await
            .unwrap();
        wait_connected(&mut runtime.connection_state()).await;
        (runtime, broker, store)
    }

    async fn send_get(addr: SocketAddr, path: &str, keep_open: bool) -> TcpStream {
        let mut stream = TcpStream::connect(addr).await.unwrap();
        let connection = if keep_open { "keep-alive" } else { "close" };
        let request =
            format!("GET {path} HTTP/1.1\r\nHost: localhost\r\nConnection: {connection}\r\n\r\n");
        stream.write_all(request.as_bytes()).await.unwrap();
        stream
    }

    /// Full response of a one-shot request.
    async fn http_get(addr: SocketAddr, path: &str) -> String {
        let mut stream = send_get(addr, path, false).await;
        let mut response = Vec::new();
        timeout(WAIT, stream.read_to_end(&mut response))
            .await
            .unwrap()
            .unwrap();
        String::from_utf8(response).unwrap()
    }

    /// Read from `stream` until the accumulated text contains `needle`.
    async fn read_until(stream: &mut TcpStream, seen: &mut String, needle: &str) {
        let mut buf = [0u8; 4096];
        timeout(WAIT, async {
            while !seen.contains(needle) {
                let n = stream.read(&mut buf).await.unwrap();
                assert!(n > 0, "stream closed before {needle:?}");
                seen.push_str(&String::from_utf8_lossy(&buf[..n]));
            }
        })
        .await
        .unwrap();
    }

    // =========================================================================
    // FLOWS
    // =========================================================================

    #[tokio::test]
    async fn test_health_and_metrics_over_http() {
        let (runtime, broker, _store) = start_runtime().await;
        let addr = runtime.http_addr();

        let health = http_get(addr, "/health").await;
        assert!(health.starts_with("HTTP/1.1 200"), "{health}");
        assert!(health.contains(r#"{"status":"ok"}"#));

        broker.publish(&status_topic("R1"), bytes(&idle_status()));
        let container = runtime.container();
        eventually(|| container.metrics.db_insert.get() == 1).await;

        let metrics = http_get(addr, "/metrics").await;
        assert!(metrics.starts_with("HTTP/1.1 200"), "{metrics}");
        assert!(metrics.contains("mqtt_messages_received_total 1"));
        assert!(metrics.contains("robot_status_valid_total 1"));
        assert!(metrics.contains("db_insert_total 1"));
        assert!(metrics.contains("robots_active 1"));

        runtime.shutdown().await;
    }

    #[tokio::test]
    async fn test_live_feed_streams_and_ends_on_shutdown() {
        let (runtime, broker, _store) = start_runtime().await;
        let container = runtime.container();
        let robot = RobotId::new("R1");

        let mut feed = send_get(runtime.http_addr(), "/robots/R1/feed", true).await;
        let mut seen = String::new();
        read_until(&mut feed, &mut seen, "\r\n\r\n").await;
        assert!(seen.starts_with("HTTP/1.1 200"), "{seen}");
        assert!(seen.contains("text/event-stream"));
        eventually(|| container.fanout.subscribers_for(&robot) == 1).await;

        broker.publish(&status_topic("R2"), bytes(&idle_status()));
        broker.publish(&status_topic("R1"), bytes(&moving_status(DRIVE_A)));
        read_until(&mut feed, &mut seen, DRIVE_A).await;
        assert!(seen.contains("data: {"));
        assert!(seen.contains(r#""robot_id":"R1""#));
        assert!(!seen.contains(r#""robot_id":"R2""#));

        runtime.shutdown().await;

        let mut rest = Vec::new();
        timeout(WAIT, feed.read_to_end(&mut rest))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(container.fanout.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn test_history_over_http() {
        let (runtime, broker, store) = start_runtime().await;

        broker.publish(&status_topic("R1"), bytes(&idle_status()));
        broker.publish(&status_topic("R1"), bytes(&moving_status(DRIVE_B)));
        eventually(|| store.len() == 2).await;

        let response = http_get(
            runtime.http_addr(),
            "/robots/R1/history?start_time=2024-12-31T00:00:00Z&end_time=2025-01-02T00:00:00Z&include_payload=true",
        )
        .await;
        assert!(response.starts_with("HTTP/1.1 200"), "{response}");
        assert!(response.contains(r#""driving_status":"IDLE""#));
        assert!(response.contains(&format!(r#""current_drive_id":"{DRIVE_B}""#)));
        assert!(response.contains(r#""payload":{"#));

        let bad = http_get(
            runtime.http_addr(),
            "/robots/R1/history?start_time=2025-01-02T00:00:00Z&end_time=2025-01-01T00:00:00Z",
        )
        .await;
        assert!(bad.starts_with("HTTP/1.1 400"), "{bad}");
        assert!(bad.contains("end_time must be >= start_time"));

        runtime.shutdown().await;
    }
}
