//! The session state machine.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crashlab_errors::ValidationError;

use crate::event_log::{CrashEventLog, CrashRecord, DEFAULT_EVENT_LOG_CAPACITY};
use crate::session::Session;
use crate::state::{SessionState, SessionStateEvent, SessionStateReceiver, SessionStateSender};

/// Tracker tuning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Crash records retained in the event log
    pub event_log_capacity: usize,
    /// Sensor damage jump that counts as a crash
    pub crash_delta_threshold: f64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            event_log_capacity: DEFAULT_EVENT_LOG_CAPACITY,
            crash_delta_threshold: 0.1,
        }
    }
}

/// Owns at most one session and enforces its transitions.
///
/// The most recent session stays readable after it reaches a terminal state,
/// until the next [`begin_load`](Self::begin_load) replaces it.
#[derive(Debug)]
pub struct SessionTracker {
    config: SessionConfig,
    current: Option<Session>,
    crash_log: CrashEventLog,
    state_sender: Option<SessionStateSender>,
}

impl SessionTracker {
    /// Create a tracker with no session.
    pub fn new(config: SessionConfig) -> Self {
        Self {
            crash_log: CrashEventLog::new(config.event_log_capacity),
            config,
            current: None,
            state_sender: None,
        }
    }

    /// Create a tracker with default tuning.
    pub fn with_defaults() -> Self {
        Self::new(SessionConfig::default())
    }

    /// Tracker tuning in effect.
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Route state change events to `sender`.
    pub fn set_state_sender(&mut self, sender: SessionStateSender) {
        self.state_sender = Some(sender);
    }

    /// Receive state change events from now on.
    pub fn subscribe(&mut self) -> SessionStateReceiver {
        let (tx, rx) = mpsc::channel(16);
        self.state_sender = Some(tx);
        rx
    }

    /// The most recent session, live or ended.
    pub fn current(&self) -> Option<&Session> {
        self.current.as_ref()
    }

    /// Owned copy of the most recent session.
    pub fn snapshot(&self) -> Option<Session> {
        self.current.clone()
    }

    /// The session, if it has not reached a terminal state.
    pub fn live_session(&self) -> Option<&Session> {
        self.current.as_ref().filter(|s| s.state.is_live())
    }

    /// State of the most recent session.
    pub fn state(&self) -> Option<SessionState> {
        self.current.as_ref().map(|s| s.state)
    }

    /// Number of live sessions, zero or one.
    pub fn active_sessions(&self) -> usize {
        usize::from(self.live_session().is_some())
    }

    /// Crash records, oldest first.
    pub fn crash_log(&self) -> &CrashEventLog {
        &self.crash_log
    }

    /// Return the session if its state is one of `allowed`.
    ///
    /// # Errors
    ///
    /// `NoActiveSession` without a session, `InvalidSessionState` otherwise.
    pub fn require_state(
        &self,
        operation: &str,
        allowed: &[SessionState],
    ) -> Result<&Session, ValidationError> {
        let session = self
            .current
            .as_ref()
            .ok_or_else(|| ValidationError::NoActiveSession(operation.to_string()))?;
        if allowed.contains(&session.state) {
            Ok(session)
        } else {
            Err(ValidationError::invalid_state(operation, session.state))
        }
    }

    /// Return the session if the vehicle is loaded (`Active` or `Crashed`).
    ///
    /// # Errors
    ///
    /// See [`require_state`](Self::require_state).
    pub fn require_loaded(&self, operation: &str) -> Result<&Session, ValidationError> {
        self.require_state(operation, &[SessionState::Active, SessionState::Crashed])
    }

    /// Create a new session in `Initializing` before the scenario load is sent.
    ///
    /// # Errors
    ///
    /// `InvalidSessionState` while another session is live.
    pub fn begin_load(
        &mut self,
        vehicle_model: &str,
        scenario_type: &str,
    ) -> Result<&Session, ValidationError> {
        if let Some(live) = self.live_session() {
            return Err(ValidationError::invalid_state("load scenario", live.state));
        }

        let session = Session::initializing(
            Uuid::new_v4().to_string(),
            vehicle_model,
            scenario_type,
        );
        info!(
            session_id = %session.id,
            vehicle_model,
            scenario_type,
            "Loading scenario"
        );
        self.notify(&session.id, None, SessionState::Initializing, None);
        Ok(self.current.insert(session))
    }

    /// The simulator accepted the scenario. Adopts the simulator's session id
    /// when it assigned one.
    ///
    /// # Errors
    ///
    /// `InvalidSessionState` unless the session is `Initializing`.
    pub fn confirm_loaded(
        &mut self,
        assigned_id: Option<String>,
    ) -> Result<&Session, ValidationError> {
        self.require_state("confirm scenario load", &[SessionState::Initializing])?;
        if let Some(session) = self.current.as_mut() {
            if let Some(id) = assigned_id.filter(|id| !id.is_empty()) {
                session.id = id;
            }
            session.telemetry_sample_count = 0;
        }
        self.transition(SessionState::Active, Some("Scenario loaded".to_string()));
        self.require_state("confirm scenario load", &[SessionState::Active])
    }

    /// Discard an `Initializing` session whose load was refused. A refused
    /// load never produces a session.
    pub fn abort_load(&mut self, reason: &str) -> Option<Session> {
        if self.state() != Some(SessionState::Initializing) {
            return None;
        }
        let session = self.current.take()?;
        warn!(session_id = %session.id, reason, "Scenario load aborted");
        Some(session)
    }

    /// Record a crash. `Active` moves to `Crashed`; later crashes on a
    /// `Crashed` session are logged without a transition.
    ///
    /// Returns whether the state changed.
    ///
    /// # Errors
    ///
    /// `NoActiveSession` without a session, `InvalidSessionState` when the
    /// vehicle is not loaded.
    pub fn mark_crashed(&mut self, record: CrashRecord) -> Result<bool, ValidationError> {
        let session = self.require_loaded("record crash")?;
        if session.id != record.session_id {
            warn!(
                session_id = %session.id,
                crash_session_id = %record.session_id,
                "Ignoring crash for a different session"
            );
            return Ok(false);
        }

        let transitioned = session.state == SessionState::Active;
        if transitioned {
            if let Some(session) = self.current.as_mut() {
                session.crash_detected = true;
                session.crash_timestamp = Some(record.recorded_at);
            }
            self.transition(
                SessionState::Crashed,
                Some(format!("Crash reported by {:?}", record.source)),
            );
        }
        self.log_crash(record);
        Ok(transitioned)
    }

    /// Feed a sensor damage jump. A jump at or above the configured threshold
    /// is logged as a crash and, for the live `Active` session, marks it
    /// `Crashed`.
    ///
    /// Returns whether the jump counted as a crash.
    pub fn record_sensor_delta(&mut self, session_id: &str, damage_delta: f64) -> bool {
        if damage_delta.is_nan() || damage_delta < self.config.crash_delta_threshold {
            return false;
        }

        let record = CrashRecord::from_sensor(session_id, damage_delta);
        let owns_session = self
            .live_session()
            .is_some_and(|s| s.id == session_id && s.state.is_loaded());
        if owns_session {
            if let Err(err) = self.mark_crashed(record) {
                debug!(session_id, error = %err, "Sensor crash not applied");
            }
        } else {
            self.log_crash(record);
        }
        true
    }

    /// Count one processed telemetry response. Refused only once the session
    /// is read-only.
    pub fn record_telemetry_sample(&mut self) -> Option<u64> {
        let session = self.current.as_mut().filter(|s| !s.is_read_only())?;
        session.telemetry_sample_count = session.telemetry_sample_count.saturating_add(1);
        Some(session.telemetry_sample_count)
    }

    /// End the live session.
    ///
    /// # Errors
    ///
    /// `NoActiveSession` without a session, `InvalidSessionState` when it
    /// already ended.
    pub fn complete(&mut self) -> Result<Session, ValidationError> {
        self.require_state(
            "end session",
            &[
                SessionState::Initializing,
                SessionState::Active,
                SessionState::Crashed,
            ],
        )?;
        self.transition(SessionState::Completed, Some("Session ended".to_string()));
        self.current
            .clone()
            .ok_or_else(|| ValidationError::NoActiveSession("end session".to_string()))
    }

    /// Move the live session to `Error`. Ended sessions are left untouched.
    pub fn fail(&mut self, reason: impl Into<String>) -> Option<Session> {
        let reason = reason.into();
        let session = self.current.as_mut().filter(|s| s.state.is_live())?;
        error!(session_id = %session.id, state = %session.state, %reason, "Session failed");
        session.error_reason = Some(reason.clone());
        self.transition(SessionState::Error, Some(reason));
        self.current.clone()
    }

    fn log_crash(&mut self, record: CrashRecord) {
        if let Some(evicted) = self.crash_log.push(record) {
            debug!(
                session_id = %evicted.session_id,
                capacity = self.crash_log.capacity(),
                "Crash log full, evicted oldest record"
            );
        }
    }

    fn transition(&mut self, new_state: SessionState, reason: Option<String>) {
        let Some(session) = self.current.as_mut() else {
            return;
        };
        if session.state == new_state {
            return;
        }

        let previous_state = session.state;
        session.state = new_state;
        if new_state.is_terminal() {
            session.ended_at = Some(Utc::now());
        }
        let session_id = session.id.clone();
        info!(
            session_id = %session_id,
            from = %previous_state,
            to = %new_state,
            "Session state changed"
        );
        self.notify(&session_id, Some(previous_state), new_state, reason);
    }

    fn notify(
        &self,
        session_id: &str,
        previous_state: Option<SessionState>,
        new_state: SessionState,
        reason: Option<String>,
    ) {
        if let Some(sender) = &self.state_sender {
            let event = SessionStateEvent::new(session_id, previous_state, new_state, reason);
            if let Err(err) = sender.try_send(event) {
                debug!(session_id, error = %err, "State change event dropped");
            }
        }
    }
}

impl Default for SessionTracker {
    fn default() -> Self {
        Self::with_defaults()
    }
}
