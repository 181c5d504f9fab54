//! Live metrics with polling fallback.
//!
//! The feed prefers the realtime stream. Whenever the stream is not
//! available (no manager, or the manager is disconnected or failed) it
//! polls the metrics endpoint instead, so consumers always get data.

use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tgsim_core::providers::{ClockProvider, Sleep};
use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::JoinHandle;

use crate::client::Client;
use crate::error::{ClientError, ErrorCode};
use crate::realtime::{ConnectionManager, ConnectionState};
use crate::types::MetricsSnapshot;

const UPDATE_CAPACITY: usize = 64;

/// Where metrics currently come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedMode {
    /// Pushed over the realtime stream.
    Streaming,
    /// Fetched from the REST endpoint on an interval.
    Polling,
}

/// One item delivered by the feed.
#[derive(Debug, Clone, PartialEq)]
pub enum FeedUpdate {
    /// The source changed.
    Mode(FeedMode),
    /// A realtime message.
    Live(Value),
    /// A polled snapshot.
    Polled(MetricsSnapshot),
    /// A poll failed; polling continues.
    PollFailed {
        /// Failure classification.
        code: ErrorCode,
        /// Human-readable message.
        message: String,
        /// Whether the failure is transient.
        retryable: bool,
    },
    /// The credential was rejected or is missing. The feed has stopped.
    AuthRequired,
}

/// Entry point for starting a feed.
#[derive(Debug)]
pub struct MetricsFeed;

impl MetricsFeed {
    /// Start the feed task. Must be called from within a tokio runtime.
    ///
    /// The feed takes ownership of the manager; it is shut down with the
    /// feed.
    pub fn spawn(
        client: Client,
        manager: Option<ConnectionManager>,
        poll_interval: Duration,
        clock: Arc<dyn ClockProvider>,
    ) -> (FeedHandle, mpsc::Receiver<FeedUpdate>) {
        let (tx, rx) = mpsc::channel(UPDATE_CAPACITY);
        let runner = FeedRunner {
            state: manager.as_ref().map(ConnectionManager::subscribe_state),
            messages: manager.as_ref().map(ConnectionManager::subscribe_messages),
            manager,
            client,
            poll_interval,
            clock,
            tx,
        };
        let task = tokio::spawn(runner.run());
        (FeedHandle { task }, rx)
    }
}

/// Handle to a running feed. Dropping it stops the feed.
#[derive(Debug)]
pub struct FeedHandle {
    task: JoinHandle<()>,
}

impl FeedHandle {
    /// Stop the feed and its connection manager.
    pub fn stop(&self) {
        self.task.abort();
    }

    /// Whether the feed task has ended.
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl Drop for FeedHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

struct FeedRunner {
    client: Client,
    manager: Option<ConnectionManager>,
    state: Option<watch::Receiver<ConnectionState>>,
    messages: Option<broadcast::Receiver<Value>>,
    poll_interval: Duration,
    clock: Arc<dyn ClockProvider>,
    tx: mpsc::Sender<FeedUpdate>,
}

impl FeedRunner {
    async fn run(mut self) {
        let mut mode = None;
        let mut poll_timer: Option<Sleep> = None;

        loop {
            let wanted = self.wanted_mode();
            if mode != Some(wanted) {
                mode = Some(wanted);
                poll_timer = match wanted {
                    FeedMode::Polling => {
                        tracing::info!(
                            interval_secs = self.poll_interval.as_secs_f64(),
                            "Polling metrics"
                        );
                        Some(self.clock.sleep(Duration::ZERO))
                    }
                    FeedMode::Streaming => {
                        tracing::info!("Streaming metrics");
                        None
                    }
                };
                if !self.emit(FeedUpdate::Mode(wanted)).await {
                    break;
                }
            }

            tokio::select! {
                changed = state_changed(&mut self.state) => {
                    if !changed {
                        self.state = None;
                    }
                }
                message = next_message(&mut self.messages) => match message {
                    Ok(value) => {
                        if !self.emit(FeedUpdate::Live(value)).await {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "Metrics feed fell behind the stream");
                    }
                    Err(broadcast::error::RecvError::Closed) => self.messages = None,
                },
                () = wait(&mut poll_timer) => {
                    poll_timer = Some(self.clock.sleep(self.poll_interval));
                    if !self.poll().await {
                        break;
                    }
                }
            }
        }

        if let Some(manager) = &self.manager {
            manager.shutdown();
        }
    }

    fn wanted_mode(&self) -> FeedMode {
        match &self.state {
            Some(state) if state.borrow().is_active() => FeedMode::Streaming,
            _ => FeedMode::Polling,
        }
    }

    /// Returns false when the feed should stop.
    async fn poll(&self) -> bool {
        match self.client.metrics().await {
            Ok(snapshot) => self.emit(FeedUpdate::Polled(snapshot)).await,
            Err(e) if e.is_auth_failure() || matches!(e, ClientError::MissingCredential) => {
                tracing::warn!(error = %e, "Metrics polling stopped: credential rejected");
                self.emit(FeedUpdate::AuthRequired).await;
                false
            }
            Err(e) => {
                let retryable = e.is_retryable();
                tracing::warn!(error = %e, code = %e.code(), retryable, "Metrics poll failed");
                self.emit(FeedUpdate::PollFailed {
                    code: e.code(),
                    message: e.to_string(),
                    retryable,
                })
                .await
            }
        }
    }

    /// Returns false once the receiver is gone.
    async fn emit(&self, update: FeedUpdate) -> bool {
        self.tx.send(update).await.is_ok()
    }
}

/// Resolves true on a state change, false once the manager is gone.
async fn state_changed(state: &mut Option<watch::Receiver<ConnectionState>>) -> bool {
    match state {
        Some(rx) => rx.changed().await.is_ok(),
        None => std::future::pending().await,
    }
}

async fn next_message(
    messages: &mut Option<broadcast::Receiver<Value>>,
) -> Result<Value, broadcast::error::RecvError> {
    match messages {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}

async fn wait(timer: &mut Option<Sleep>) {
    match timer {
        Some(sleep) => sleep.await,
        None => std::future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TransportError;
    use crate::realtime::MockConnector;
    use crate::transport::{MockReply, MockTransport, Response};
    use serde_json::json;
    use tgsim_core::config::ReconnectConfig;
    use tgsim_core::providers::{MemoryStore, MockClock};
    use tgsim_core::session::SessionStore;

    const POLL: Duration = Duration::from_secs(10);

    fn client(transport: Arc<MockTransport>, clock: &MockClock) -> Client {
        let session = SessionStore::new(Arc::new(MemoryStore::new()));
        session.set("key").unwrap();
        Client::new("http://localhost:8000/api", session)
            .unwrap()
            .with_transport(transport)
            .with_clock(Arc::new(clock.clone()))
    }

    fn snapshot(value: i64) -> Response {
        Response::json_value(200, &json!({ "active_bots": value }))
    }

    async fn next(rx: &mut mpsc::Receiver<FeedUpdate>) -> FeedUpdate {
        tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .expect("feed went quiet")
            .expect("feed ended")
    }

    #[tokio::test]
    async fn polls_immediately_and_on_interval_without_realtime() {
        let clock = MockClock::new();
        let transport = Arc::new(
            MockTransport::new()
                .respond(snapshot(1))
                .respond(snapshot(2)),
        );
        let (_handle, mut rx) = MetricsFeed::spawn(
            client(transport.clone(), &clock),
            None,
            POLL,
            Arc::new(clock.clone()),
        );

        assert_eq!(next(&mut rx).await, FeedUpdate::Mode(FeedMode::Polling));
        match next(&mut rx).await {
            FeedUpdate::Polled(s) => assert_eq!(s.values["active_bots"], 1),
            other => panic!("unexpected update: {other:?}"),
        }

        clock.wait_for_sleeps(1).await;
        clock.advance(POLL);
        match next(&mut rx).await {
            FeedUpdate::Polled(s) => assert_eq!(s.values["active_bots"], 2),
            other => panic!("unexpected update: {other:?}"),
        }
        assert_eq!(transport.request_count(), 2);
        assert!(transport.last_request().unwrap().url.ends_with("/api/metrics"));
    }

    #[tokio::test]
    async fn transient_poll_failure_keeps_polling() {
        let clock = MockClock::new();
        let transport = Arc::new(
            MockTransport::new()
                .fail(TransportError::Connection("refused".into()))
                .reply(MockReply::Respond(Response::new(500, "boom")))
                .respond(snapshot(3)),
        );
        let (_handle, mut rx) = MetricsFeed::spawn(
            client(transport, &clock),
            None,
            POLL,
            Arc::new(clock.clone()),
        );

        assert_eq!(next(&mut rx).await, FeedUpdate::Mode(FeedMode::Polling));
        assert!(matches!(
            next(&mut rx).await,
            FeedUpdate::PollFailed { code: ErrorCode::Network, retryable: true, .. }
        ));

        clock.wait_for_sleeps(1).await;
        clock.advance(POLL);
        assert!(matches!(
            next(&mut rx).await,
            FeedUpdate::PollFailed { code: ErrorCode::Http(500), retryable: false, .. }
        ));

        clock.wait_for_sleeps(1).await;
        clock.advance(POLL);
        assert!(matches!(next(&mut rx).await, FeedUpdate::Polled(_)));
    }

    #[tokio::test]
    async fn unauthorized_poll_stops_the_feed() {
        let clock = MockClock::new();
        let transport =
            Arc::new(MockTransport::new().respond(Response::new(401, "invalid key")));
        let (_handle, mut rx) = MetricsFeed::spawn(
            client(transport, &clock),
            None,
            POLL,
            Arc::new(clock.clone()),
        );

        assert_eq!(next(&mut rx).await, FeedUpdate::Mode(FeedMode::Polling));
        assert_eq!(next(&mut rx).await, FeedUpdate::AuthRequired);
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn streams_then_falls_back_when_realtime_fails() {
        let clock = MockClock::new();
        let (connector, mut streams) = MockConnector::new();
        let manager = ConnectionManager::spawn(
            Some("ws://localhost:8000/ws/metrics".into()),
            ReconnectConfig {
                max_attempts: 1,
                ..ReconnectConfig::default()
            },
            Arc::new(connector),
            Arc::new(clock.clone()),
        );
        let transport = Arc::new(MockTransport::new().respond(snapshot(9)));
        let (_handle, mut rx) = MetricsFeed::spawn(
            client(transport, &clock),
            Some(manager),
            POLL,
            Arc::new(clock.clone()),
        );

        assert_eq!(next(&mut rx).await, FeedUpdate::Mode(FeedMode::Streaming));

        let stream = streams.next().await.unwrap();
        stream.open().await;
        stream.send_text(r#"{"active_bots":4}"#).await;
        assert_eq!(
            next(&mut rx).await,
            FeedUpdate::Live(json!({ "active_bots": 4 }))
        );

        stream.close(Some(1006)).await;
        assert_eq!(next(&mut rx).await, FeedUpdate::Mode(FeedMode::Polling));
        match next(&mut rx).await {
            FeedUpdate::Polled(s) => assert_eq!(s.values["active_bots"], 9),
            other => panic!("unexpected update: {other:?}"),
        }
    }
}
