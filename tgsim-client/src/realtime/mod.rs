//! Realtime metrics stream.
//!
//! The lifecycle lives in [`ConnectionMachine`], a pure state machine. The
//! [`ConnectionManager`] runs it in a background task against a
//! [`StreamConnector`] and publishes state, messages and errors to
//! subscribers.

mod connector;
mod machine;
mod manager;
mod state;

pub use connector::{
    MockConnector, MockStream, MockStreams, OutboundFrame, StreamConnector, StreamEvent,
    StreamHandle, WsConnector,
};
pub use machine::{CloseKind, Command, ConnectionMachine, NORMAL_CLOSE_CODE};
pub use manager::{ConnectionManager, PING_FRAME};
pub use state::{ConnectionState, RealtimeError};
