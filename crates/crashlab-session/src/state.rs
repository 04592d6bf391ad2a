//! Session states and state change notifications.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

/// Lifecycle state of a simulation session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// Scenario load has been sent and not yet confirmed
    Initializing,
    /// Scenario loaded, vehicle ready
    Active,
    /// A crash was detected; irreversible
    Crashed,
    /// Session ended normally
    Completed,
    /// Session ended by a protocol failure
    Error,
}

impl SessionState {
    /// Get the state name as used in logs and reports.
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionState::Initializing => "initializing",
            SessionState::Active => "active",
            SessionState::Crashed => "crashed",
            SessionState::Completed => "completed",
            SessionState::Error => "error",
        }
    }

    /// `Completed` and `Error` accept no further transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionState::Completed | SessionState::Error)
    }

    /// Whether the session is still live.
    pub fn is_live(&self) -> bool {
        !self.is_terminal()
    }

    /// Whether the vehicle is loaded in the simulator.
    pub fn is_loaded(&self) -> bool {
        matches!(self, SessionState::Active | SessionState::Crashed)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Emitted whenever a session changes state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionStateEvent {
    /// Session that changed
    pub session_id: String,
    /// `None` when the session was just created
    pub previous_state: Option<SessionState>,
    /// State entered
    pub new_state: SessionState,
    /// When the transition happened
    pub timestamp: DateTime<Utc>,
    /// Why the transition happened, if known
    pub reason: Option<String>,
}

impl SessionStateEvent {
    /// Create an event stamped with the current time.
    pub fn new(
        session_id: impl Into<String>,
        previous_state: Option<SessionState>,
        new_state: SessionState,
        reason: Option<String>,
    ) -> Self {
        Self {
            session_id: session_id.into(),
            previous_state,
            new_state,
            timestamp: Utc::now(),
            reason,
        }
    }
}

/// Sender half for state change events.
pub type SessionStateSender = mpsc::Sender<SessionStateEvent>;
/// Receiver half for state change events.
pub type SessionStateReceiver = mpsc::Receiver<SessionStateEvent>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_states() {
        assert!(SessionState::Completed.is_terminal());
        assert!(SessionState::Error.is_terminal());
        assert!(SessionState::Initializing.is_live());
        assert!(SessionState::Crashed.is_live());
    }

    #[test]
    fn test_loaded_states() {
        assert!(!SessionState::Initializing.is_loaded());
        assert!(SessionState::Active.is_loaded());
        assert!(SessionState::Crashed.is_loaded());
        assert!(!SessionState::Error.is_loaded());
    }

    #[test]
    fn test_serde_names_match_display() -> Result<(), serde_json::Error> {
        for state in [
            SessionState::Initializing,
            SessionState::Active,
            SessionState::Crashed,
            SessionState::Completed,
            SessionState::Error,
        ] {
            let json = serde_json::to_string(&state)?;
            assert_eq!(json, format!("\"{state}\""));
        }
        Ok(())
    }
}
