//! Simulator session orchestration.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crashlab_damage::{
    DamageAnalysis, DamageAnalyzer, EstimateId, EstimateStore, InMemoryEstimateStore,
    PriceTable, RepairEstimate, RepairEstimator,
};
use crashlab_errors::{CrashlabError, Result, ResultExt, SimResult, SimulatorError, ValidationError};
use crashlab_protocol::{CrashOutcome, DamageData, ProtocolClient, SensorReport, VehicleState};
use crashlab_session::{
    CrashRecord, Session, SessionState, SessionStateReceiver, SessionTracker,
    SharedSessionTracker, shared,
};
use crashlab_telemetry::{TelemetryNormalizer, TelemetrySample};

use crate::config::ServiceConfig;
use crate::scenario::{CrashParams, ScenarioPreset};
use crate::sink::{SensorSlot, SessionEventSink};

/// Session id given to samples scored without a simulator.
pub const OFFLINE_SESSION_ID: &str = "offline";

/// Connection and session summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthStatus {
    /// Whether the simulator answered a ping
    pub connected: bool,
    /// Ping round-trip time
    pub response_time_ms: Option<u64>,
    /// Live sessions, zero or one
    pub active_sessions: usize,
    /// State of the most recent session
    pub session_state: Option<SessionState>,
}

/// Telemetry, analysis and estimate for one vehicle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assessment {
    /// Sample the analysis was computed from
    pub sample: TelemetrySample,
    /// Zone analysis and safety verdict
    pub analysis: DamageAnalysis,
    /// Priced repair plan
    pub estimate: RepairEstimate,
    /// Where the estimate was stored
    pub estimate_id: EstimateId,
}

/// One simulator connection and the session running on it.
///
/// Commands and simulator events mutate the same tracker. The tracker lock
/// is never held across an await.
pub struct SimulatorService {
    config: ServiceConfig,
    client: ProtocolClient,
    tracker: SharedSessionTracker,
    sink: Arc<SessionEventSink>,
    latest_sensor: SensorSlot,
    normalizer: TelemetryNormalizer,
    analyzer: DamageAnalyzer,
    estimator: RepairEstimator<PriceTable>,
    store: Arc<dyn EstimateStore>,
}

impl SimulatorService {
    /// Create a service with an in-memory estimate store. Does not connect.
    pub fn new(config: ServiceConfig) -> Self {
        Self::with_store(config, Arc::new(InMemoryEstimateStore::new()))
    }

    /// Create a service persisting estimates to `store`.
    pub fn with_store(config: ServiceConfig, store: Arc<dyn EstimateStore>) -> Self {
        let tracker = shared(SessionTracker::new(config.session.clone()));
        let latest_sensor = SensorSlot::default();
        let sink = Arc::new(SessionEventSink::new(
            Arc::clone(&tracker),
            Arc::clone(&latest_sensor),
        ));
        let client = ProtocolClient::with_event_sink(config.client_config(), sink.clone());
        let estimator = RepairEstimator::with_config(
            config.estimator.price_table(),
            config.estimator.estimator_config(),
        );

        Self {
            config,
            client,
            tracker,
            sink,
            latest_sensor,
            normalizer: TelemetryNormalizer::new(),
            analyzer: DamageAnalyzer::new(),
            estimator,
            store,
        }
    }

    /// Configuration in effect.
    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    /// Whether the client holds an open connection.
    pub fn is_connected(&self) -> bool {
        self.client.is_connected()
    }

    /// Estimate storage.
    pub fn store(&self) -> &Arc<dyn EstimateStore> {
        &self.store
    }

    /// Connect and confirm the simulator answers.
    ///
    /// # Errors
    ///
    /// `ConnectionFailed` if the connection cannot be opened or the first
    /// ping fails. The connection is closed again in the latter case.
    pub async fn connect(&self) -> Result<()> {
        self.client.connect().await.with_context("connect")?;
        match self.client.ping().await {
            Ok(rtt) => {
                info!(response_time_ms = millis(rtt), "Simulator is responding");
                Ok(())
            }
            Err(e) => {
                self.client.disconnect().await;
                Err(SimulatorError::connection_failed(
                    self.config.client_config().addr(),
                    format!("ping failed: {e}"),
                ))
                .with_context("connect")
            }
        }
    }

    /// End any live session, then close the connection.
    pub async fn disconnect(&self) {
        let live = self.tracker.lock().live_session().is_some();
        if live && let Err(e) = self.end_session().await {
            warn!(error = %e, "Could not end session before disconnecting");
        }
        self.client.disconnect().await;
    }

    /// Ping the simulator and report the session summary. Never fails.
    pub async fn health_check(&self) -> HealthStatus {
        let response_time_ms = if self.client.is_connected() {
            match self.client.ping().await {
                Ok(rtt) => Some(millis(rtt)),
                Err(e) => {
                    warn!(error = %e, "Health check ping failed");
                    None
                }
            }
        } else {
            None
        };

        let tracker = self.tracker.lock();
        HealthStatus {
            connected: response_time_ms.is_some(),
            response_time_ms,
            active_sessions: tracker.active_sessions(),
            session_state: tracker.state(),
        }
    }

    /// Load a known scenario and start a session for it.
    ///
    /// A refused load leaves no session behind. Losing the connection during
    /// the load moves the new session to `Error`.
    ///
    /// # Errors
    ///
    /// `UnknownScenario` for combinations outside the scenario table,
    /// `InvalidSessionState` while another session is live, and simulator
    /// errors from the load itself.
    pub async fn load_scenario(&self, vehicle_model: &str, scenario_type: &str) -> Result<Session> {
        let preset = ScenarioPreset::find(vehicle_model, scenario_type)?;
        let session_id = self
            .tracker
            .lock()
            .begin_load(vehicle_model, scenario_type)?
            .id
            .clone();

        let reply = self
            .client
            .load_scenario(preset.scenario_config(&session_id))
            .await;

        let mut tracker = self.tracker.lock();
        match reply {
            Ok(loaded) => Ok(tracker.confirm_loaded(loaded.session_id)?.clone()),
            Err(e) => {
                if e.is_session_fatal() {
                    tracker.fail(format!("Scenario load failed: {e}"));
                } else {
                    tracker.abort_load(&e.to_string());
                }
                Err(e).with_context("load scenario")
            }
        }
    }

    /// Ask the simulator to stream sensor reports for the loaded session.
    ///
    /// # Errors
    ///
    /// `OutOfRange` outside 1..=100 Hz, session state errors without a
    /// loaded vehicle, and simulator errors.
    pub async fn start_telemetry(&self, frequency_hz: u32) -> Result<()> {
        if !(1..=100).contains(&frequency_hz) {
            return Err(ValidationError::out_of_range("frequency_hz", frequency_hz, 1, 100).into());
        }
        let session_id = self.loaded_session_id("start telemetry")?;
        let result = self.client.start_telemetry(&session_id, frequency_hz).await;
        self.observe("start telemetry", result)?;
        info!(session_id = %session_id, frequency_hz, "Telemetry streaming started");
        Ok(())
    }

    /// Stage the collision. The session moves to `Crashed` when the
    /// simulator reports the impact.
    ///
    /// # Errors
    ///
    /// Parameter validation errors, `InvalidSessionState` unless the session
    /// is `Active`, and simulator errors.
    pub async fn execute_crash(&self, params: &CrashParams) -> Result<CrashOutcome> {
        params.validate()?;
        let session_id = self
            .tracker
            .lock()
            .require_state("execute crash", &[SessionState::Active])?
            .id
            .clone();

        info!(
            session_id = %session_id,
            speed_kmh = params.speed_kmh,
            angle_deg = params.angle_deg,
            target = %params.target,
            "Executing crash"
        );
        let result = self.client.execute_crash(params.to_command(&session_id)).await;
        let outcome = self.observe("execute crash", result)?;

        if outcome.crash_detected {
            self.tracker
                .lock()
                .mark_crashed(CrashRecord::from_reply(&session_id, outcome.impact_force))?;
        } else {
            warn!(session_id = %session_id, "Simulator registered no collision");
        }
        Ok(outcome)
    }

    /// Fetch damage and vehicle state for the loaded session as one sample.
    ///
    /// # Errors
    ///
    /// `Validation` when a damage reading is negative or NaN; such a reading
    /// is not counted. `TelemetryUnavailable` while the vehicle is undamaged
    /// and has not crashed; that sample still counts toward the session total.
    pub async fn extract_telemetry(&self) -> Result<TelemetrySample> {
        let (session_id, crashed) = {
            let tracker = self.tracker.lock();
            let session = tracker.require_loaded("extract telemetry")?;
            (session.id.clone(), session.crash_detected)
        };

        let (damage, vehicle) = tokio::join!(
            self.client.get_damage_data(&session_id),
            self.client.get_vehicle_state(&session_id),
        );
        let damage = self.observe("get damage data", damage)?;
        let vehicle = self.observe("get vehicle state", vehicle)?;

        let sample = self
            .normalizer
            .sample_from_damage(&session_id, &damage, &vehicle, crashed)?;
        let count = self.tracker.lock().record_telemetry_sample();
        if !sample.has_damage() && !sample.crash_detected() {
            return Err(CrashlabError::telemetry_unavailable(session_id));
        }

        info!(
            session_id = %session_id,
            sample_count = count.unwrap_or_default(),
            components = sample.normalized_damage().len(),
            severity = sample.severity(),
            "Telemetry extracted"
        );
        Ok(sample)
    }

    /// Group the sample's components into zones and judge safety.
    pub fn analyze_damage(&self, sample: &TelemetrySample) -> DamageAnalysis {
        self.analyzer.analyze(sample)
    }

    /// Price the repairs for an analysis.
    pub fn estimate_repair(&self, analysis: &DamageAnalysis) -> RepairEstimate {
        self.estimator.estimate(analysis)
    }

    /// Extract, analyze, estimate and store.
    ///
    /// # Errors
    ///
    /// Anything [`extract_telemetry`](Self::extract_telemetry) or the store
    /// returns.
    pub async fn assess(&self) -> Result<Assessment> {
        let sample = self.extract_telemetry().await?;
        self.finish_assessment(sample).await
    }

    /// Score a saved `get_damage_data` reply without a simulator.
    ///
    /// # Errors
    ///
    /// `NegativeDamage` or `NotANumber` for malformed readings, and store
    /// errors.
    pub async fn assess_offline(&self, damage: &DamageData) -> Result<Assessment> {
        let sample = self.normalizer.sample_from_damage(
            OFFLINE_SESSION_ID,
            damage,
            &VehicleState::default(),
            false,
        )?;
        self.finish_assessment(sample).await
    }

    async fn finish_assessment(&self, sample: TelemetrySample) -> Result<Assessment> {
        let analysis = self.analyze_damage(&sample);
        let estimate = self.estimate_repair(&analysis);
        let estimate_id = self
            .store
            .save(estimate.clone())
            .await
            .with_context("store estimate")?;
        Ok(Assessment {
            sample,
            analysis,
            estimate,
            estimate_id,
        })
    }

    /// Stop streaming, unload the scenario and complete the session.
    ///
    /// Cleanup commands are best effort and skipped when disconnected.
    ///
    /// # Errors
    ///
    /// `NoActiveSession` or `InvalidSessionState` when no session is live.
    pub async fn end_session(&self) -> Result<Session> {
        let session_id = self
            .tracker
            .lock()
            .require_state(
                "end session",
                &[
                    SessionState::Initializing,
                    SessionState::Active,
                    SessionState::Crashed,
                ],
            )?
            .id
            .clone();

        if self.client.is_connected() {
            if let Err(e) = self.client.stop_telemetry(&session_id).await {
                warn!(session_id = %session_id, error = %e, "Could not stop telemetry");
            }
            if let Err(e) = self.client.cleanup_scenario(&session_id).await {
                warn!(session_id = %session_id, error = %e, "Could not clean up scenario");
            }
        }

        let session = self.tracker.lock().complete()?;
        info!(
            session_id = %session.id,
            samples = session.telemetry_sample_count,
            crashed = session.crash_detected,
            "Session ended"
        );
        Ok(session)
    }

    /// Apply a sensor report received outside the event stream.
    ///
    /// # Errors
    ///
    /// `NegativeDamage` or `NotANumber` for malformed part readings.
    pub fn ingest_sensor_report(&self, report: &SensorReport) -> Result<TelemetrySample> {
        Ok(self.sink.ingest_report(report)?)
    }

    /// Crash records, oldest first.
    pub fn crash_events(&self) -> Vec<CrashRecord> {
        self.tracker.lock().crash_log().snapshot()
    }

    /// Copy of the most recent session.
    pub fn session(&self) -> Option<Session> {
        self.tracker.lock().snapshot()
    }

    /// Receive session state changes from now on.
    pub fn subscribe(&self) -> SessionStateReceiver {
        self.tracker.lock().subscribe()
    }

    /// Most recent sample built from a sensor report.
    pub fn latest_sensor_sample(&self) -> Option<TelemetrySample> {
        self.latest_sensor.lock().clone()
    }

    fn loaded_session_id(&self, operation: &str) -> Result<String> {
        Ok(self.tracker.lock().require_loaded(operation)?.id.clone())
    }

    fn observe<T>(&self, operation: &str, result: SimResult<T>) -> Result<T> {
        result
            .inspect_err(|e| {
                if e.is_session_fatal() {
                    self.tracker.lock().fail(format!("{operation}: {e}"));
                }
            })
            .with_context(operation)
    }
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
