//! Live Server-Sent Events feed for one robot.

use std::convert::Infallible;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use axum::extract::{Path, State};
use axum::response::sse::{Event, KeepAlive, Sse};
use fleet_telemetry::IngestMetrics;
use shared_fanout::{FanoutRegistry, Subscription};
use shared_types::RobotId;
use tokio::sync::watch;
use tokio_stream::Stream;
use tracing::info;

use crate::router::AppState;

/// `GET /robots/{robot_id}/feed`
pub async fn robot_feed(
    State(state): State<AppState>,
    Path(robot_id): Path<String>,
) -> Sse<LiveFeed> {
    let subscription = state.fanout.register(RobotId::new(robot_id));
    state
        .metrics
        .set_live_subscribers(state.fanout.subscriber_count());
    info!(
        robot_id = %subscription.robot_id(),
        subscriber_id = subscription.id(),
        "Live feed opened"
    );

    Sse::new(LiveFeed::new(
        subscription,
        state.fanout.clone(),
        Arc::clone(&state.metrics),
        state.shutdown.clone(),
    ))
    .keep_alive(KeepAlive::default())
}

/// SSE body backed by one fanout subscription.
///
/// Ends on shutdown. Dropping it (client gone, stream ended) unregisters the
/// subscription and refreshes the live-subscriber gauge.
pub struct LiveFeed {
    subscription: Option<Subscription>,
    fanout: FanoutRegistry,
    metrics: Arc<IngestMetrics>,
    shutdown: Pin<Box<dyn Future<Output = ()> + Send>>,
}

impl LiveFeed {
    fn new(
        subscription: Subscription,
        fanout: FanoutRegistry,
        metrics: Arc<IngestMetrics>,
        mut shutdown: watch::Receiver<bool>,
    ) -> Self {
        Self {
            subscription: Some(subscription),
            fanout,
            metrics,
            shutdown: Box::pin(async move {
                let _ = shutdown.wait_for(|stop| *stop).await;
            }),
        }
    }
}

impl Stream for LiveFeed {
    type Item = Result<Event, Infallible>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        if this.shutdown.as_mut().poll(cx).is_ready() {
            this.subscription = None;
            return Poll::Ready(None);
        }
        match this.subscription.as_mut() {
            Some(subscription) => Pin::new(subscription)
                .poll_next(cx)
                .map(|next| next.map(|message| Ok(Event::default().data(&*message)))),
            None => Poll::Ready(None),
        }
    }
}

impl Drop for LiveFeed {
    fn drop(&mut self) {
        if let Some(subscription) = self.subscription.take() {
            info!(
                robot_id = %subscription.robot_id(),
                subscriber_id = subscription.id(),
                "Live feed closed"
            );
        }
        self.metrics
            .set_live_subscribers(self.fanout.subscriber_count());
    }
}
