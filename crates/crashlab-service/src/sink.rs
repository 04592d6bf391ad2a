//! Routes simulator events into the session tracker.

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, warn};

use crashlab_errors::ValidationError;
use crashlab_protocol::{CrashEvent, EventSink, SensorReport, SimulatorEvent};
use crashlab_session::{CrashRecord, Session, SharedSessionTracker};
use crashlab_telemetry::{TelemetryNormalizer, TelemetrySample};

/// Most recent sample built from a sensor report.
pub type SensorSlot = Arc<Mutex<Option<TelemetrySample>>>;

/// Event sink that shares the tracker with the command path.
///
/// Holds the tracker lock only for the duration of one update and never
/// across an await point.
#[derive(Debug, Clone)]
pub struct SessionEventSink {
    tracker: SharedSessionTracker,
    latest_sensor: SensorSlot,
    normalizer: TelemetryNormalizer,
}

impl SessionEventSink {
    /// Create a sink over `tracker`, storing sensor samples in `latest_sensor`.
    pub fn new(tracker: SharedSessionTracker, latest_sensor: SensorSlot) -> Self {
        Self {
            tracker,
            latest_sensor,
            normalizer: TelemetryNormalizer::new(),
        }
    }

    /// Apply a sensor report: keep the normalized sample and feed its damage
    /// delta to the tracker.
    ///
    /// The sample is stored before the tracker sees the delta.
    ///
    /// # Errors
    ///
    /// `NegativeDamage` or `NotANumber` if a part reading is malformed. The
    /// damage delta is applied either way.
    pub fn ingest_report(&self, report: &SensorReport) -> Result<TelemetrySample, ValidationError> {
        let threshold = self.tracker.lock().config().crash_delta_threshold;
        let sample = self.normalizer.sample_from_sensor(report, threshold);
        if let Ok(sample) = &sample {
            *self.latest_sensor.lock() = Some(sample.clone());
        }

        let mut tracker = self.tracker.lock();
        let target = tracker
            .live_session()
            .filter(|session| reports_for(session, &report.vehicle_id))
            .map_or_else(|| report.vehicle_id.clone(), |session| session.id.clone());
        tracker.record_sensor_delta(&target, report.damage.damage_delta);
        sample
    }

    fn on_crash(&self, event: CrashEvent) {
        let mut tracker = self.tracker.lock();
        let Some(session_id) = event
            .session_id
            .clone()
            .or_else(|| tracker.live_session().map(|s| s.id.clone()))
        else {
            debug!("Crash event with no session to attribute it to");
            return;
        };

        let record = CrashRecord::from_event(session_id, event.timestamp, event.impact_force);
        if let Err(e) = tracker.mark_crashed(record) {
            warn!(error = %e, "Crash event not applied");
        }
    }
}

/// Whether a sensor report's vehicle id refers to the session's vehicle.
///
/// Sensor mods identify the vehicle either by session id, by bare model or
/// by a `<make>_<model>` name such as `vw_tcross`.
pub fn reports_for(session: &Session, vehicle_id: &str) -> bool {
    vehicle_id == session.id
        || vehicle_id == session.vehicle_model
        || vehicle_id
            .rsplit_once('_')
            .is_some_and(|(_, model)| model == session.vehicle_model)
}

impl EventSink for SessionEventSink {
    fn on_event(&self, event: SimulatorEvent) {
        match event {
            SimulatorEvent::CrashDetected(crash) => self.on_crash(crash),
            SimulatorEvent::SensorUpdate(report) => {
                if let Err(e) = self.ingest_report(&report) {
                    warn!(vehicle_id = %report.vehicle_id, error = %e, "Discarding sensor report");
                }
            }
        }
    }

    fn on_disconnect(&self, reason: &str) {
        self.tracker.lock().fail(format!("Connection lost: {reason}"));
    }

    fn on_protocol_error(&self, reason: &str) {
        self.tracker.lock().fail(format!("Protocol error: {reason}"));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crashlab_protocol::{PartDamage, SensorDamage};
    use crashlab_session::{SessionState, SessionTracker, shared};

    fn loaded_sink() -> Result<(SessionEventSink, String), ValidationError> {
        let tracker = shared(SessionTracker::with_defaults());
        let id = {
            let mut guard = tracker.lock();
            guard.begin_load("tcross", "crash_test")?;
            guard.confirm_loaded(None)?.id.clone()
        };
        Ok((SessionEventSink::new(tracker, SensorSlot::default()), id))
    }

    fn report(vehicle_id: &str, delta: f64) -> SensorReport {
        SensorReport {
            vehicle_id: vehicle_id.to_string(),
            position: [0.0; 3],
            velocity: [0.0; 3],
            rotation: [0.0, 0.0, 0.0, 1.0],
            damage: SensorDamage {
                total_damage: delta,
                previous_damage: 0.0,
                damage_delta: delta,
                parts: vec![PartDamage {
                    name: "hood".to_string(),
                    part_id: "vw_hood".to_string(),
                    damage: delta,
                }],
            },
        }
    }

    #[test]
    fn test_crash_event_without_id_marks_live_session() -> Result<(), ValidationError> {
        let (sink, id) = loaded_sink()?;
        sink.on_event(SimulatorEvent::CrashDetected(CrashEvent::default()));
        let tracker = sink.tracker.lock();
        assert_eq!(tracker.state(), Some(SessionState::Crashed));
        assert_eq!(tracker.crash_log().latest().map(|r| r.session_id.clone()), Some(id));
        Ok(())
    }

    #[test]
    fn test_sensor_report_for_session_vehicle_crashes_it() -> Result<(), ValidationError> {
        let (sink, _) = loaded_sink()?;
        let sample = sink.ingest_report(&report("vw_tcross", 0.3))?;
        assert!(sample.crash_detected());
        assert_eq!(sink.tracker.lock().state(), Some(SessionState::Crashed));
        assert!(sink.latest_sensor.lock().is_some());
        Ok(())
    }

    #[test]
    fn test_sensor_report_for_other_vehicle_only_logged() -> Result<(), ValidationError> {
        let (sink, _) = loaded_sink()?;
        sink.ingest_report(&report("vw_golf", 0.3))?;
        let tracker = sink.tracker.lock();
        assert_eq!(tracker.state(), Some(SessionState::Active));
        assert_eq!(tracker.crash_log().len(), 1);
        Ok(())
    }

    #[test]
    fn test_disconnect_fails_live_session() -> Result<(), ValidationError> {
        let (sink, _) = loaded_sink()?;
        sink.on_disconnect("reset by peer");
        let tracker = sink.tracker.lock();
        assert_eq!(tracker.state(), Some(SessionState::Error));
        assert_eq!(
            tracker.current().and_then(|s| s.error_reason.clone()),
            Some("Connection lost: reset by peer".to_string())
        );
        Ok(())
    }
}
