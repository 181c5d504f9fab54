//! Connection manager actor.
//!
//! [`ConnectionManager`] drives a [`ConnectionMachine`] from a background
//! task: it opens streams through a [`StreamConnector`], runs the keep-alive
//! and reconnect timers on the injected clock, and fans inbound JSON out to
//! subscribers. Control calls are queued to the task and never block.

use serde_json::Value;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::time::Duration;
use tgsim_core::config::ReconnectConfig;
use tgsim_core::providers::{ClockProvider, Sleep};
use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::JoinHandle;

use super::connector::{OutboundFrame, StreamConnector, StreamEvent, StreamHandle};
use super::machine::{CloseKind, Command, ConnectionMachine};
use super::state::{ConnectionState, RealtimeError};

/// Keep-alive frame sent while connected.
pub const PING_FRAME: &str = r#"{"type":"ping"}"#;

const BROADCAST_CAPACITY: usize = 256;

#[derive(Debug, Clone, Copy)]
enum Control {
    Enable,
    Disable,
    ForceFallback,
    Retry,
}

#[derive(Debug)]
struct Shared {
    alive: AtomicBool,
    retry_count: AtomicU32,
    auto_reconnect: AtomicBool,
}

/// Handle to a running connection manager.
///
/// The manager starts enabled. Dropping the handle (or calling
/// [`shutdown`](Self::shutdown)) stops the task, closes the stream and
/// silences every subscriber.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use tgsim_client::realtime::{ConnectionManager, WsConnector};
/// use tgsim_core::config::ReconnectConfig;
/// use tgsim_core::providers::RealClock;
///
/// # async fn example() {
/// let manager = ConnectionManager::spawn(
///     Some("ws://localhost:8000/ws/metrics".to_string()),
///     ReconnectConfig::default(),
///     Arc::new(WsConnector::new()),
///     Arc::new(RealClock::new()),
/// );
/// let mut messages = manager.subscribe_messages();
/// while let Ok(message) = messages.recv().await {
///     println!("{message}");
/// }
/// # }
/// ```
#[derive(Debug)]
pub struct ConnectionManager {
    control: mpsc::UnboundedSender<Control>,
    state: watch::Receiver<ConnectionState>,
    messages: broadcast::Sender<Value>,
    errors: broadcast::Sender<RealtimeError>,
    shared: Arc<Shared>,
    task: JoinHandle<()>,
}

impl ConnectionManager {
    /// Start the manager task. Must be called from within a tokio runtime.
    ///
    /// With no `url` the manager stays disconnected.
    pub fn spawn(
        url: Option<String>,
        config: ReconnectConfig,
        connector: Arc<dyn StreamConnector>,
        clock: Arc<dyn ClockProvider>,
    ) -> Self {
        let mut machine = ConnectionMachine::new(config, url.is_some());
        let initial = machine.enable();

        let (control_tx, control_rx) = mpsc::unbounded_channel();
        let (state_tx, state_rx) = watch::channel(machine.state());
        let (messages, _) = broadcast::channel(BROADCAST_CAPACITY);
        let (errors, _) = broadcast::channel(BROADCAST_CAPACITY);
        let shared = Arc::new(Shared {
            alive: AtomicBool::new(true),
            retry_count: AtomicU32::new(0),
            auto_reconnect: AtomicBool::new(true),
        });

        let actor = Actor {
            heartbeat_interval: machine.config().heartbeat_interval,
            url,
            machine,
            connector,
            clock,
            stream: None,
            heartbeat: None,
            reconnect: None,
            control: control_rx,
            state: state_tx,
            messages: messages.clone(),
            errors: errors.clone(),
            shared: Arc::clone(&shared),
        };
        let task = tokio::spawn(actor.run(initial));

        Self {
            control: control_tx,
            state: state_rx,
            messages,
            errors,
            shared,
            task,
        }
    }

    /// Current connection state.
    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    /// Consecutive abnormal closures since the last successful open.
    pub fn retry_count(&self) -> u32 {
        self.shared.retry_count.load(Ordering::SeqCst)
    }

    /// Whether the manager will still reconnect on its own.
    pub fn auto_reconnect(&self) -> bool {
        self.shared.auto_reconnect.load(Ordering::SeqCst)
    }

    /// Watch state transitions.
    pub fn subscribe_state(&self) -> watch::Receiver<ConnectionState> {
        self.state.clone()
    }

    /// Receive every parsed inbound message (keep-alive replies excluded).
    pub fn subscribe_messages(&self) -> broadcast::Receiver<Value> {
        self.messages.subscribe()
    }

    /// Receive stream problems.
    pub fn subscribe_errors(&self) -> broadcast::Receiver<RealtimeError> {
        self.errors.subscribe()
    }

    /// Want the stream again after [`disable`](Self::disable).
    pub fn enable(&self) {
        self.send(Control::Enable);
    }

    /// Close the stream and stop reconnecting until re-enabled.
    pub fn disable(&self) {
        self.send(Control::Disable);
    }

    /// Give up on the stream so the caller can fall back to polling.
    pub fn force_fallback(&self) {
        self.send(Control::ForceFallback);
    }

    /// Reset the retry counter and try again.
    pub fn retry(&self) {
        self.send(Control::Retry);
    }

    /// Whether the manager is still running.
    pub fn is_alive(&self) -> bool {
        self.shared.alive.load(Ordering::SeqCst)
    }

    /// Stop the task. Idempotent; no subscriber hears anything afterwards.
    pub fn shutdown(&self) {
        if self.shared.alive.swap(false, Ordering::SeqCst) {
            tracing::debug!("Shutting down realtime connection manager");
        }
        self.task.abort();
    }

    fn send(&self, control: Control) {
        if self.control.send(control).is_err() {
            tracing::debug!(?control, "Connection manager is no longer running");
        }
    }
}

impl Drop for ConnectionManager {
    fn drop(&mut self) {
        self.shutdown();
    }
}

enum Step {
    Control(Control),
    Stream(StreamEvent),
    ReconnectDue,
    Heartbeat,
}

struct Actor {
    url: Option<String>,
    machine: ConnectionMachine,
    connector: Arc<dyn StreamConnector>,
    clock: Arc<dyn ClockProvider>,
    heartbeat_interval: Duration,
    stream: Option<StreamHandle>,
    heartbeat: Option<Sleep>,
    reconnect: Option<Sleep>,
    control: mpsc::UnboundedReceiver<Control>,
    state: watch::Sender<ConnectionState>,
    messages: broadcast::Sender<Value>,
    errors: broadcast::Sender<RealtimeError>,
    shared: Arc<Shared>,
}

impl Actor {
    async fn run(mut self, initial: Vec<Command>) {
        self.execute(initial);
        self.publish();

        loop {
            let step = tokio::select! {
                control = self.control.recv() => match control {
                    Some(control) => Step::Control(control),
                    None => break,
                },
                event = next_event(&mut self.stream) => Step::Stream(event),
                () = wait(&mut self.reconnect) => Step::ReconnectDue,
                () = wait(&mut self.heartbeat) => Step::Heartbeat,
            };
            if !self.is_alive() {
                break;
            }

            let commands = self.handle(step);
            self.execute(commands);
            self.publish();
        }

        if let Some(stream) = self.stream.take() {
            let _ = stream.outbound.try_send(OutboundFrame::Close);
        }
    }

    fn handle(&mut self, step: Step) -> Vec<Command> {
        match step {
            Step::Control(Control::Enable) => self.machine.enable(),
            Step::Control(Control::Disable) => {
                tracing::info!("Realtime stream disabled");
                self.machine.disable()
            }
            Step::Control(Control::ForceFallback) => {
                tracing::info!("Abandoning realtime stream, falling back to polling");
                self.machine.force_fallback()
            }
            Step::Control(Control::Retry) => {
                tracing::info!("Retrying realtime stream");
                self.machine.retry()
            }
            Step::Stream(StreamEvent::Opened) => {
                tracing::info!(url = self.url.as_deref(), "Realtime stream connected");
                self.machine.on_open()
            }
            Step::Stream(StreamEvent::Message(text)) => {
                self.forward(&text);
                Vec::new()
            }
            Step::Stream(StreamEvent::Error(message)) => {
                tracing::warn!(error = %message, "Realtime stream error");
                self.emit_error(RealtimeError::Stream(message));
                Vec::new()
            }
            Step::Stream(StreamEvent::Closed { code, reason }) => {
                self.stream = None;
                let kind = CloseKind::from_code(code);
                let commands = self.machine.on_close(kind);
                match (kind, self.machine.state()) {
                    (CloseKind::Normal, _) => {
                        tracing::info!("Realtime stream closed by peer");
                    }
                    (CloseKind::Abnormal, ConnectionState::Failed) => {
                        tracing::warn!(
                            ?code,
                            %reason,
                            attempts = self.machine.retry_count(),
                            "Realtime stream failed, giving up"
                        );
                    }
                    (CloseKind::Abnormal, _) => {
                        tracing::warn!(
                            ?code,
                            %reason,
                            attempt = self.machine.retry_count(),
                            "Realtime stream closed abnormally"
                        );
                    }
                }
                commands
            }
            Step::ReconnectDue => {
                self.reconnect = None;
                self.machine.on_reconnect_due()
            }
            Step::Heartbeat => {
                self.send_ping();
                self.heartbeat = Some(self.clock.sleep(self.heartbeat_interval));
                Vec::new()
            }
        }
    }

    fn execute(&mut self, commands: Vec<Command>) {
        for command in commands {
            match command {
                Command::Open => self.open(),
                Command::Close => {
                    if let Some(stream) = self.stream.take() {
                        let _ = stream.outbound.try_send(OutboundFrame::Close);
                    }
                }
                Command::StartHeartbeat => {
                    self.heartbeat = Some(self.clock.sleep(self.heartbeat_interval));
                }
                Command::StopHeartbeat => self.heartbeat = None,
                Command::ScheduleReconnect(delay) => {
                    tracing::info!(
                        delay_ms = delay.as_millis() as u64,
                        attempt = self.machine.retry_count(),
                        "Scheduling realtime reconnect"
                    );
                    self.reconnect = Some(self.clock.sleep(delay));
                }
                Command::CancelReconnect => self.reconnect = None,
            }
        }
    }

    fn open(&mut self) {
        let Some(url) = self.url.as_deref() else {
            return;
        };
        tracing::debug!(url, "Opening realtime stream");
        match self.connector.connect(url) {
            Ok(stream) => self.stream = Some(stream),
            Err(e) => {
                tracing::warn!(error = %e, "Realtime stream setup failed");
                self.emit_error(e);
                let commands = self.machine.on_setup_error();
                self.execute(commands);
            }
        }
    }

    fn send_ping(&mut self) {
        let Some(stream) = &self.stream else {
            return;
        };
        if let Err(e) = stream
            .outbound
            .try_send(OutboundFrame::Text(PING_FRAME.to_string()))
        {
            tracing::warn!(error = %e, "Failed to send keep-alive ping");
            self.emit_error(RealtimeError::Heartbeat(e.to_string()));
        }
    }

    fn forward(&self, text: &str) {
        let value: Value = match serde_json::from_str(text) {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!(error = %e, "Dropping malformed realtime message");
                self.emit_error(RealtimeError::MalformedMessage(e.to_string()));
                return;
            }
        };
        if value.get("type").and_then(Value::as_str) == Some("pong") {
            tracing::trace!("Keep-alive acknowledged");
            return;
        }
        if self.is_alive() {
            // No subscribers is fine.
            let _ = self.messages.send(value);
        }
    }

    fn emit_error(&self, error: RealtimeError) {
        if self.is_alive() {
            let _ = self.errors.send(error);
        }
    }

    fn publish(&self) {
        if !self.is_alive() {
            return;
        }
        self.shared
            .retry_count
            .store(self.machine.retry_count(), Ordering::SeqCst);
        self.shared
            .auto_reconnect
            .store(self.machine.auto_reconnect(), Ordering::SeqCst);

        let next = self.machine.state();
        let changed = self.state.send_if_modified(|current| {
            if *current == next {
                false
            } else {
                *current = next;
                true
            }
        });
        if changed {
            tracing::debug!(state = %next, "Realtime state changed");
        }
    }

    fn is_alive(&self) -> bool {
        self.shared.alive.load(Ordering::SeqCst)
    }
}

async fn next_event(stream: &mut Option<StreamHandle>) -> StreamEvent {
    match stream {
        Some(handle) => handle
            .events
            .recv()
            .await
            .unwrap_or_else(|| StreamEvent::Closed {
                code: None,
                reason: "stream task ended".to_string(),
            }),
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
    use crate::realtime::connector::MockConnector;
    use tgsim_core::providers::MockClock;

    #[tokio::test]
    async fn without_url_stays_disconnected() {
        let (connector, _streams) = MockConnector::new();
        let connector = Arc::new(connector);
        let manager = ConnectionManager::spawn(
            None,
            ReconnectConfig::default(),
            connector.clone(),
            Arc::new(MockClock::new()),
        );

        manager.retry();
        tokio::task::yield_now().await;
        assert_eq!(manager.state(), ConnectionState::Disconnected);
        assert_eq!(connector.attempts(), 0);
    }

    #[tokio::test]
    async fn setup_failure_goes_straight_to_failed() {
        let (connector, _streams) = MockConnector::new();
        connector.set_fail_setup(true);
        let manager = ConnectionManager::spawn(
            Some("ws://test/ws".into()),
            ReconnectConfig::default(),
            Arc::new(connector),
            Arc::new(MockClock::new()),
        );
        let mut errors = manager.subscribe_errors();
        let mut state = manager.subscribe_state();

        state
            .wait_for(|s| *s == ConnectionState::Failed)
            .await
            .unwrap();
        assert!(!manager.auto_reconnect());
        assert!(matches!(errors.recv().await, Ok(RealtimeError::Setup(_))));
    }
}
