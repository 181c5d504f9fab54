//! Stream connectors.
//!
//! A [`StreamConnector`] turns a URL into a [`StreamHandle`]: a channel of
//! inbound [`StreamEvent`]s plus a sender for [`OutboundFrame`]s. The
//! connection manager only ever talks to these channels, so the WebSocket
//! implementation and the test double are interchangeable.

use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::handshake::client::Request;

use super::state::RealtimeError;

const CHANNEL_CAPACITY: usize = 64;

/// Something that happened on the stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    /// Handshake finished.
    Opened,
    /// A text frame arrived.
    Message(String),
    /// The stream reported an error. A `Closed` event follows if the
    /// stream is gone.
    Error(String),
    /// The stream ended. `code` is the close code, if the peer sent one.
    Closed {
        /// Close code.
        code: Option<u16>,
        /// Close reason or failure description.
        reason: String,
    },
}

/// Frame to send to the peer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutboundFrame {
    /// A text frame.
    Text(String),
    /// Close the stream normally.
    Close,
}

/// Both ends of an open stream.
#[derive(Debug)]
pub struct StreamHandle {
    /// Inbound events, in order.
    pub events: mpsc::Receiver<StreamEvent>,
    /// Outbound frames. Dropping this closes the stream.
    pub outbound: mpsc::Sender<OutboundFrame>,
}

/// Provider trait for opening realtime streams.
pub trait StreamConnector: Send + Sync {
    /// Start connecting to `url`.
    ///
    /// Returns immediately; the handshake outcome arrives as the first
    /// event. An `Err` means the connection could not even be attempted.
    fn connect(&self, url: &str) -> Result<StreamHandle, RealtimeError>;

    /// Check if this is a mock connector.
    fn is_mock(&self) -> bool;
}

/// Connector backed by `tokio-tungstenite`.
///
/// Must be used from within a tokio runtime.
#[derive(Debug, Clone, Copy, Default)]
pub struct WsConnector;

impl WsConnector {
    /// Create a connector.
    pub fn new() -> Self {
        Self
    }
}

impl StreamConnector for WsConnector {
    fn connect(&self, url: &str) -> Result<StreamHandle, RealtimeError> {
        if !(url.starts_with("ws://") || url.starts_with("wss://")) {
            return Err(RealtimeError::Setup(format!(
                "stream URL must use ws:// or wss://, got '{url}'"
            )));
        }
        let request = url
            .into_client_request()
            .map_err(|e| RealtimeError::Setup(e.to_string()))?;

        let (event_tx, event_rx) = mpsc::channel(CHANNEL_CAPACITY);
        let (frame_tx, frame_rx) = mpsc::channel(CHANNEL_CAPACITY);
        tokio::spawn(run_socket(request, event_tx, frame_rx));

        Ok(StreamHandle {
            events: event_rx,
            outbound: frame_tx,
        })
    }

    fn is_mock(&self) -> bool {
        false
    }
}

async fn run_socket(
    request: Request,
    events: mpsc::Sender<StreamEvent>,
    mut outbound: mpsc::Receiver<OutboundFrame>,
) {
    let ws = match tokio_tungstenite::connect_async(request).await {
        Ok((ws, _response)) => ws,
        Err(e) => {
            let reason = e.to_string();
            let _ = events.send(StreamEvent::Error(reason.clone())).await;
            let _ = events.send(StreamEvent::Closed { code: None, reason }).await;
            return;
        }
    };
    let (mut sink, mut stream) = ws.split();

    if events.send(StreamEvent::Opened).await.is_err() {
        let _ = sink.send(Message::Close(None)).await;
        return;
    }

    loop {
        tokio::select! {
            frame = outbound.recv() => match frame {
                Some(OutboundFrame::Text(text)) => {
                    if let Err(e) = sink.send(Message::Text(text.into())).await {
                        let _ = events.send(StreamEvent::Error(e.to_string())).await;
                    }
                }
                // The manager let go of the stream.
                Some(OutboundFrame::Close) | None => {
                    let _ = sink.send(Message::Close(None)).await;
                    return;
                }
            },
            incoming = stream.next() => match incoming {
                Some(Ok(Message::Text(text))) => {
                    if events.send(StreamEvent::Message(text.to_string())).await.is_err() {
                        let _ = sink.send(Message::Close(None)).await;
                        return;
                    }
                }
                Some(Ok(Message::Close(frame))) => {
                    let (code, reason) = match frame {
                        Some(frame) => (Some(u16::from(frame.code)), frame.reason.to_string()),
                        None => (None, String::new()),
                    };
                    let _ = events.send(StreamEvent::Closed { code, reason }).await;
                    return;
                }
                // Pings are answered by tungstenite; binary frames are not part of the feed.
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    let reason = e.to_string();
                    let _ = events.send(StreamEvent::Error(reason.clone())).await;
                    let _ = events.send(StreamEvent::Closed { code: None, reason }).await;
                    return;
                }
                None => {
                    let _ = events
                        .send(StreamEvent::Closed {
                            code: None,
                            reason: "connection dropped".to_string(),
                        })
                        .await;
                    return;
                }
            },
        }
    }
}

/// Mock connector for testing.
///
/// Every successful `connect` hands the peer side of the new stream to the
/// paired [`MockStreams`] receiver, so tests can play the server.
#[derive(Debug)]
pub struct MockConnector {
    streams: mpsc::UnboundedSender<MockStream>,
    fail_setup: AtomicBool,
    attempts: AtomicUsize,
    urls: Mutex<Vec<String>>,
}

impl MockConnector {
    /// Create a connector and the receiver for the streams it opens.
    pub fn new() -> (Self, MockStreams) {
        let (tx, rx) = mpsc::unbounded_channel();
        let connector = Self {
            streams: tx,
            fail_setup: AtomicBool::new(false),
            attempts: AtomicUsize::new(0),
            urls: Mutex::new(Vec::new()),
        };
        (connector, MockStreams { rx })
    }

    /// Make subsequent `connect` calls fail synchronously.
    pub fn set_fail_setup(&self, fail: bool) {
        self.fail_setup.store(fail, Ordering::SeqCst);
    }

    /// Number of `connect` calls so far.
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    /// URLs passed to `connect`, in order.
    pub fn urls(&self) -> Vec<String> {
        self.urls.lock().clone()
    }
}

impl StreamConnector for MockConnector {
    fn connect(&self, url: &str) -> Result<StreamHandle, RealtimeError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        self.urls.lock().push(url.to_string());
        if self.fail_setup.load(Ordering::SeqCst) {
            return Err(RealtimeError::Setup("mock setup failure".to_string()));
        }

        let (event_tx, event_rx) = mpsc::channel(CHANNEL_CAPACITY);
        let (frame_tx, frame_rx) = mpsc::channel(CHANNEL_CAPACITY);
        let stream = MockStream {
            url: url.to_string(),
            events: event_tx,
            frames: frame_rx,
        };
        // The test may have stopped listening; the stream then just idles.
        let _ = self.streams.send(stream);

        Ok(StreamHandle {
            events: event_rx,
            outbound: frame_tx,
        })
    }

    fn is_mock(&self) -> bool {
        true
    }
}

/// Receiver for streams opened through a [`MockConnector`].
#[derive(Debug)]
pub struct MockStreams {
    rx: mpsc::UnboundedReceiver<MockStream>,
}

impl MockStreams {
    /// Wait for the next opened stream.
    pub async fn next(&mut self) -> Option<MockStream> {
        self.rx.recv().await
    }

    /// The next opened stream, if one is already waiting.
    pub fn try_next(&mut self) -> Option<MockStream> {
        self.rx.try_recv().ok()
    }
}

/// Server side of a mock stream.
#[derive(Debug)]
pub struct MockStream {
    url: String,
    events: mpsc::Sender<StreamEvent>,
    frames: mpsc::Receiver<OutboundFrame>,
}

impl MockStream {
    /// URL the client connected to.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Complete the handshake.
    pub async fn open(&self) {
        self.emit(StreamEvent::Opened).await;
    }

    /// Send a text frame to the client.
    pub async fn send_text(&self, text: impl Into<String>) {
        self.emit(StreamEvent::Message(text.into())).await;
    }

    /// Report a stream error to the client.
    pub async fn error(&self, message: impl Into<String>) {
        self.emit(StreamEvent::Error(message.into())).await;
    }

    /// End the stream with the given close code.
    pub async fn close(&self, code: Option<u16>) {
        self.emit(StreamEvent::Closed {
            code,
            reason: String::new(),
        })
        .await;
    }

    /// Wait for the next frame the client sends.
    pub async fn next_frame(&mut self) -> Option<OutboundFrame> {
        self.frames.recv().await
    }

    /// The next frame the client sent, if any is waiting.
    pub fn try_next_frame(&mut self) -> Option<OutboundFrame> {
        self.frames.try_recv().ok()
    }

    async fn emit(&self, event: StreamEvent) {
        let _ = self.events.send(event).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ws_connector_rejects_non_websocket_urls() {
        let err = WsConnector::new().connect("http://localhost/ws").unwrap_err();
        assert!(matches!(err, RealtimeError::Setup(_)));
    }

    #[tokio::test]
    async fn ws_connector_reports_unreachable_peer_as_close() {
        // Port 9 (discard) on localhost is almost never listening.
        let mut handle = WsConnector::new().connect("ws://127.0.0.1:9/ws").unwrap();

        let mut saw_close = false;
        while let Some(event) = handle.events.recv().await {
            if let StreamEvent::Closed { code, .. } = event {
                assert_eq!(code, None);
                saw_close = true;
            }
        }
        assert!(saw_close);
    }

    #[tokio::test]
    async fn mock_connector_pairs_streams() {
        let (connector, mut streams) = MockConnector::new();
        let mut handle = connector.connect("ws://test/ws/metrics").unwrap();
        let mut peer = streams.next().await.unwrap();

        assert_eq!(peer.url(), "ws://test/ws/metrics");
        peer.open().await;
        peer.send_text(r#"{"value":1}"#).await;
        assert_eq!(handle.events.recv().await, Some(StreamEvent::Opened));
        assert_eq!(
            handle.events.recv().await,
            Some(StreamEvent::Message(r#"{"value":1}"#.to_string()))
        );

        handle
            .outbound
            .send(OutboundFrame::Text("hi".into()))
            .await
            .unwrap();
        assert_eq!(peer.next_frame().await, Some(OutboundFrame::Text("hi".into())));
        assert_eq!(connector.attempts(), 1);
    }

    #[test]
    fn mock_connector_setup_failure() {
        let (connector, mut streams) = MockConnector::new();
        connector.set_fail_setup(true);
        assert!(connector.connect("ws://test").is_err());
        assert_eq!(connector.attempts(), 1);
        assert!(streams.try_next().is_none());
    }
}
