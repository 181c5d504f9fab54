//! Connection lifecycle as a pure state machine.
//!
//! [`ConnectionMachine`] owns every decision about the realtime stream:
//! when to open, when to back off, when to give up. It performs no I/O.
//! Each trigger returns the [`Command`]s the driver must carry out, which
//! keeps the lifecycle testable without sockets or timers.

use std::time::Duration;
use tgsim_core::config::ReconnectConfig;

use super::state::ConnectionState;

/// WebSocket close code for a normal closure.
pub const NORMAL_CLOSE_CODE: u16 = 1000;

/// Side effect requested by the machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Start opening the stream.
    Open,
    /// Close the stream.
    Close,
    /// Arm the keep-alive timer.
    StartHeartbeat,
    /// Disarm the keep-alive timer.
    StopHeartbeat,
    /// Fire [`ConnectionMachine::on_reconnect_due`] after the delay.
    ScheduleReconnect(Duration),
    /// Drop any pending reconnect timer.
    CancelReconnect,
}

/// How a stream ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseKind {
    /// The peer closed cleanly.
    Normal,
    /// Any other ending: error codes, dropped connections.
    Abnormal,
}

impl CloseKind {
    /// Classify a close code. A missing code counts as abnormal.
    pub fn from_code(code: Option<u16>) -> Self {
        if code == Some(NORMAL_CLOSE_CODE) {
            Self::Normal
        } else {
            Self::Abnormal
        }
    }
}

/// Lifecycle of one realtime stream.
#[derive(Debug, Clone)]
pub struct ConnectionMachine {
    config: ReconnectConfig,
    has_target: bool,
    state: ConnectionState,
    retry_count: u32,
    auto_reconnect: bool,
    enabled: bool,
    reconnect_pending: bool,
}

impl ConnectionMachine {
    /// Create a disabled machine. `has_target` is false when no stream URL
    /// is configured, in which case it never opens.
    pub fn new(config: ReconnectConfig, has_target: bool) -> Self {
        Self {
            config,
            has_target,
            state: ConnectionState::Disconnected,
            retry_count: 0,
            auto_reconnect: true,
            enabled: false,
            reconnect_pending: false,
        }
    }

    /// Current state.
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Consecutive abnormal closures since the last successful open.
    pub fn retry_count(&self) -> u32 {
        self.retry_count
    }

    /// Whether the machine will still reconnect on its own.
    pub fn auto_reconnect(&self) -> bool {
        self.auto_reconnect
    }

    /// Whether the stream is wanted.
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Whether a reconnect timer is armed.
    pub fn reconnect_pending(&self) -> bool {
        self.reconnect_pending
    }

    /// Reconnect settings.
    pub fn config(&self) -> &ReconnectConfig {
        &self.config
    }

    /// Open the stream if every precondition holds.
    ///
    /// Requires: disconnected, enabled, a target, auto-reconnect still on,
    /// and no backoff in progress.
    pub fn evaluate(&mut self) -> Vec<Command> {
        if self.state != ConnectionState::Disconnected
            || !self.enabled
            || !self.has_target
            || !self.auto_reconnect
            || self.reconnect_pending
        {
            return Vec::new();
        }
        self.state = ConnectionState::Connecting;
        vec![Command::Open]
    }

    /// Want the stream.
    pub fn enable(&mut self) -> Vec<Command> {
        self.enabled = true;
        self.evaluate()
    }

    /// Stop wanting the stream; closes it if open.
    pub fn disable(&mut self) -> Vec<Command> {
        self.enabled = false;
        let mut commands = self.cancel_reconnect();
        if self.state.is_active() {
            commands.extend([Command::StopHeartbeat, Command::Close]);
            self.state = ConnectionState::Disconnected;
        }
        commands
    }

    /// The stream finished its handshake.
    pub fn on_open(&mut self) -> Vec<Command> {
        if self.state != ConnectionState::Connecting {
            return Vec::new();
        }
        self.state = ConnectionState::Connected;
        self.retry_count = 0;
        vec![Command::StartHeartbeat]
    }

    /// The stream ended.
    pub fn on_close(&mut self, kind: CloseKind) -> Vec<Command> {
        if !self.state.is_active() {
            return Vec::new();
        }
        self.state = ConnectionState::Disconnected;
        let mut commands = vec![Command::StopHeartbeat];

        if kind == CloseKind::Normal {
            return commands;
        }

        self.retry_count = self.retry_count.saturating_add(1);
        if self.retry_count >= self.config.max_attempts {
            self.state = ConnectionState::Failed;
            self.auto_reconnect = false;
        } else if self.auto_reconnect && self.enabled {
            self.reconnect_pending = true;
            commands.push(Command::ScheduleReconnect(
                self.config.backoff_delay(self.retry_count),
            ));
        }
        commands
    }

    /// The transport could not even start connecting.
    pub fn on_setup_error(&mut self) -> Vec<Command> {
        let mut commands = self.cancel_reconnect();
        if self.state.is_active() {
            commands.push(Command::StopHeartbeat);
        }
        self.state = ConnectionState::Failed;
        self.auto_reconnect = false;
        commands
    }

    /// A scheduled reconnect delay elapsed. Stale timers are ignored.
    pub fn on_reconnect_due(&mut self) -> Vec<Command> {
        if !self.reconnect_pending {
            return Vec::new();
        }
        self.reconnect_pending = false;
        self.evaluate()
    }

    /// Abandon the stream and stop reconnecting.
    pub fn force_fallback(&mut self) -> Vec<Command> {
        let mut commands = self.cancel_reconnect();
        if self.state.is_active() {
            commands.extend([Command::StopHeartbeat, Command::Close]);
        }
        self.state = ConnectionState::Failed;
        self.auto_reconnect = false;
        commands
    }

    /// Start over: reset the counter and reconnect if possible.
    pub fn retry(&mut self) -> Vec<Command> {
        self.retry_count = 0;
        self.auto_reconnect = true;
        let mut commands = self.cancel_reconnect();
        if self.state == ConnectionState::Failed {
            self.state = ConnectionState::Disconnected;
        }
        commands.extend(self.evaluate());
        commands
    }

    fn cancel_reconnect(&mut self) -> Vec<Command> {
        if self.reconnect_pending {
            self.reconnect_pending = false;
            vec![Command::CancelReconnect]
        } else {
            Vec::new()
        }
    }
}
