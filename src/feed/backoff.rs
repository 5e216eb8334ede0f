//! Connection lifecycle and reconnect scheduling.
//!
//! [`ConnectionTracker`] is the state machine behind the live-feed client.
//! It performs no I/O: the client's driver reports transport events to it and
//! acts on the [`CloseAction`] it returns.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Lifecycle state of a feed connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    /// A connection attempt is in progress or scheduled
    Connecting,
    /// The socket is open and delivering messages
    Open,
    /// The retry budget is spent; no further automatic reconnects
    Failed,
    /// Closed by the caller, or never started
    Disconnected,
}

/// Exponential backoff parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    /// Delay before the first reconnect
    pub base_delay: Duration,
    /// Reconnects allowed before giving up
    pub max_attempts: u32,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            base_delay: Duration::from_millis(crate::DEFAULT_RECONNECT_DELAY_MS),
            max_attempts: crate::MAX_RECONNECT_ATTEMPTS,
        }
    }
}

/// What the driver should do after the connection closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseAction {
    /// Wait `delay`, then open a new connection. `attempt` counts from 1.
    Reconnect { attempt: u32, delay: Duration },
    /// The retry budget just ran out; report it once and stop.
    Exhausted { attempts: u32 },
    /// Already failed or disconnected; do nothing.
    Ignore,
}

/// Tracks state, retry count and current backoff delay for one client.
#[derive(Debug, Clone)]
pub struct ConnectionTracker {
    policy: ReconnectPolicy,
    state: ConnectionState,
    attempts: u32,
    delay: Duration,
}

impl ConnectionTracker {
    /// A tracker in the `Connecting` state with a fresh retry budget.
    pub fn new(policy: ReconnectPolicy) -> Self {
        Self {
            policy,
            state: ConnectionState::Connecting,
            attempts: 0,
            delay: policy.base_delay,
        }
    }

    /// A tracker for a client that has not been started.
    pub fn idle(policy: ReconnectPolicy) -> Self {
        Self {
            state: ConnectionState::Disconnected,
            ..Self::new(policy)
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Reconnects scheduled since the last successful open.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Delay the next reconnect would wait.
    pub fn current_delay(&self) -> Duration {
        self.delay
    }

    pub fn policy(&self) -> ReconnectPolicy {
        self.policy
    }

    /// The socket opened: reset the retry budget.
    pub fn on_open(&mut self) {
        if self.state == ConnectionState::Connecting {
            self.state = ConnectionState::Open;
            self.attempts = 0;
            self.delay = self.policy.base_delay;
        }
    }

    /// The socket closed, or a connection attempt failed.
    pub fn on_close(&mut self) -> CloseAction {
        match self.state {
            ConnectionState::Failed | ConnectionState::Disconnected => CloseAction::Ignore,
            ConnectionState::Connecting | ConnectionState::Open => {
                if self.attempts < self.policy.max_attempts {
                    let delay = self.delay;
                    self.delay = self.delay.saturating_mul(2);
                    self.attempts += 1;
                    self.state = ConnectionState::Connecting;
                    CloseAction::Reconnect {
                        attempt: self.attempts,
                        delay,
                    }
                } else {
                    self.state = ConnectionState::Failed;
                    CloseAction::Exhausted {
                        attempts: self.attempts,
                    }
                }
            }
        }
    }

    /// The caller closed the connection; suppresses any reconnect.
    pub fn on_disconnect(&mut self) {
        self.state = ConnectionState::Disconnected;
    }
}
