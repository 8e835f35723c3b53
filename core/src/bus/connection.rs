use crate::prelude::LinkError;
use log::{info, warn};
use serde::{Deserialize, Serialize};

/// Consumer-side view of the channel to the ingest service.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connected,
    Error,
}

/// Tracks transport notifications. Sample content never moves this state.
#[derive(Debug, Clone, Default)]
pub struct ConnectionMonitor {
    state: ConnectionState,
    last_reason: Option<String>,
}

impl ConnectionMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Reason or detail attached to the latest disconnect or error.
    pub fn last_reason(&self) -> Option<&str> {
        self.last_reason.as_deref()
    }

    /// Each `on_*` returns `true` only when the state actually changed, so a
    /// repeated notification for the same transition is reported once.
    pub fn on_connect(&mut self) -> bool {
        if self.state == ConnectionState::Connected {
            return false;
        }
        info!("channel connected");
        self.state = ConnectionState::Connected;
        self.last_reason = None;
        true
    }

    pub fn on_disconnect(&mut self, reason: impl Into<String>) -> bool {
        let reason = reason.into();
        let changed = self.state != ConnectionState::Disconnected;
        if changed {
            info!("channel disconnected: {}", reason);
        }
        self.state = ConnectionState::Disconnected;
        self.last_reason = Some(reason);
        changed
    }

    pub fn on_error(&mut self, detail: impl Into<String>) -> bool {
        let detail = detail.into();
        let changed = self.state != ConnectionState::Error;
        if changed {
            warn!("channel error: {}", detail);
        }
        self.state = ConnectionState::Error;
        self.last_reason = Some(detail);
        changed
    }

    pub fn on_link_error(&mut self, error: &LinkError) -> bool {
        self.on_error(error.to_string())
    }
}
