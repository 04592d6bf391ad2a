//! The session record owned by the tracker.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::state::SessionState;

/// One simulation session.
///
/// Instances handed out by [`SessionTracker`](crate::SessionTracker) are
/// snapshots; all mutation goes through the tracker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    /// Session identifier shared with the simulator
    pub id: String,
    /// Vehicle model key, e.g. `tcross`
    pub vehicle_model: String,
    /// Scenario type key, e.g. `crash_test`
    pub scenario_type: String,
    /// Current lifecycle state
    pub state: SessionState,
    /// When the scenario load was issued
    pub started_at: DateTime<Utc>,
    /// When the session reached a terminal state
    pub ended_at: Option<DateTime<Utc>>,
    /// Set once and never cleared
    pub crash_detected: bool,
    /// When the crash was first observed
    pub crash_timestamp: Option<DateTime<Utc>>,
    /// Telemetry responses processed for this session
    pub telemetry_sample_count: u64,
    /// Failure that moved the session to `Error`
    pub error_reason: Option<String>,
}

impl Session {
    pub(crate) fn initializing(
        id: String,
        vehicle_model: impl Into<String>,
        scenario_type: impl Into<String>,
    ) -> Self {
        Self {
            id,
            vehicle_model: vehicle_model.into(),
            scenario_type: scenario_type.into(),
            state: SessionState::Initializing,
            started_at: Utc::now(),
            ended_at: None,
            crash_detected: false,
            crash_timestamp: None,
            telemetry_sample_count: 0,
            error_reason: None,
        }
    }

    /// Time since the load was issued, or total duration once ended.
    pub fn elapsed(&self) -> chrono::Duration {
        self.ended_at.unwrap_or_else(Utc::now) - self.started_at
    }

    /// Whether further mutation is refused.
    pub fn is_read_only(&self) -> bool {
        self.state == SessionState::Error
    }
}
