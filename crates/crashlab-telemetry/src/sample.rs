//! Immutable telemetry samples.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crashlab_errors::ValidationError;
use crashlab_protocol::event::SensorReport;
use crashlab_protocol::wire::{DamageData, VehicleState};

use crate::normalizer::{ComplexityLevel, DamageCategory, NormalizedDamage, TelemetryNormalizer};

/// One processed damage reading with the vehicle pose it was taken at.
///
/// Built only by [`TelemetryNormalizer`] and never modified afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetrySample {
    session_id: String,
    timestamp: DateTime<Utc>,
    position: [f64; 3],
    velocity: [f64; 3],
    rotation: [f64; 4],
    raw_damage: BTreeMap<String, f64>,
    normalized_damage: BTreeMap<String, f64>,
    crash_detected: bool,
    severity: f64,
}

impl TelemetrySample {
    /// Session (or sensor vehicle) the sample belongs to.
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// When the sample was built.
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// Position (x, y, z).
    pub fn position(&self) -> [f64; 3] {
        self.position
    }

    /// Velocity vector in m/s.
    pub fn velocity(&self) -> [f64; 3] {
        self.velocity
    }

    /// Orientation quaternion (x, y, z, w).
    pub fn rotation(&self) -> [f64; 4] {
        self.rotation
    }

    /// Vendor readings exactly as received.
    pub fn raw_damage(&self) -> &BTreeMap<String, f64> {
        &self.raw_damage
    }

    /// Canonical component id to level in [0, 1].
    pub fn normalized_damage(&self) -> &BTreeMap<String, f64> {
        &self.normalized_damage
    }

    /// Whether the reading was taken after a crash.
    pub fn crash_detected(&self) -> bool {
        self.crash_detected
    }

    /// Crash severity in [0, 1].
    pub fn severity(&self) -> f64 {
        self.severity
    }

    /// Whether any component survived normalization.
    pub fn has_damage(&self) -> bool {
        !self.normalized_damage.is_empty()
    }

    /// Speed in m/s.
    pub fn speed(&self) -> f64 {
        self.velocity.iter().map(|v| v * v).sum::<f64>().sqrt()
    }

    /// Coarse category of the severity.
    pub fn damage_category(&self) -> DamageCategory {
        DamageCategory::from_severity(self.severity)
    }

    /// Complexity from the number of damaged components.
    pub fn repair_complexity(&self) -> ComplexityLevel {
        ComplexityLevel::from_component_count(self.normalized_damage.len())
    }
}

impl TelemetryNormalizer {
    /// Build a sample from a `get_damage_data` / `get_vehicle_state` pair.
    ///
    /// The sample is marked crashed when the simulator says so or when the
    /// caller already knows the session crashed.
    ///
    /// # Errors
    ///
    /// Fails like [`normalize`](Self::normalize) on negative or NaN readings.
    pub fn sample_from_damage(
        &self,
        session_id: &str,
        damage: &DamageData,
        vehicle: &VehicleState,
        session_crashed: bool,
    ) -> Result<TelemetrySample, ValidationError> {
        let raw_damage: BTreeMap<String, f64> = damage
            .components
            .iter()
            .map(|(key, value)| (key.clone(), value.level()))
            .collect();
        let normalized =
            self.normalize(raw_damage.iter().map(|(key, level)| (key.as_str(), *level)))?;
        let crash_detected = session_crashed || damage.crash_detected.unwrap_or(false);

        Ok(build_sample(
            session_id,
            vehicle.position,
            vehicle.velocity,
            vehicle.rotation,
            raw_damage,
            normalized,
            crash_detected,
        ))
    }

    /// Build a sample from a sensor report. The report counts as a crash when
    /// its damage delta reaches `crash_delta_threshold`.
    ///
    /// # Errors
    ///
    /// Fails like [`normalize`](Self::normalize) on negative or NaN readings.
    pub fn sample_from_sensor(
        &self,
        report: &SensorReport,
        crash_delta_threshold: f64,
    ) -> Result<TelemetrySample, ValidationError> {
        let mut raw_damage: BTreeMap<String, f64> = BTreeMap::new();
        for part in &report.damage.parts {
            let entry = raw_damage.entry(part.name.clone()).or_insert(part.damage);
            if part.damage > *entry || part.damage.is_nan() {
                *entry = part.damage;
            }
        }
        let normalized =
            self.normalize(raw_damage.iter().map(|(key, level)| (key.as_str(), *level)))?;
        let crash_detected = report.damage.damage_delta >= crash_delta_threshold;
        if crash_detected {
            debug!(
                vehicle_id = %report.vehicle_id,
                damage_delta = report.damage.damage_delta,
                "Sensor report crossed crash threshold"
            );
        }

        Ok(build_sample(
            &report.vehicle_id,
            report.position,
            report.velocity,
            report.rotation,
            raw_damage,
            normalized,
            crash_detected,
        ))
    }
}

fn build_sample(
    session_id: &str,
    position: [f64; 3],
    velocity: [f64; 3],
    rotation: [f64; 4],
    raw_damage: BTreeMap<String, f64>,
    normalized: NormalizedDamage,
    crash_detected: bool,
) -> TelemetrySample {
    TelemetrySample {
        session_id: session_id.to_string(),
        timestamp: Utc::now(),
        position,
        velocity,
        rotation,
        raw_damage,
        normalized_damage: normalized.components,
        crash_detected,
        severity: normalized.severity,
    }
}
