//! Canonical damage maps and the crash severity score.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::trace;

use crashlab_errors::ValidationError;

use crate::vendor::canonical_component;

/// Canonical levels below this are dropped from the map.
pub const EXCLUSION_THRESHOLD: f64 = 0.05;

/// Affected components at which the spread term saturates.
pub const AFFECTED_SATURATION: f64 = 20.0;

const AVERAGE_WEIGHT: f64 = 0.4;
const PEAK_WEIGHT: f64 = 0.4;
const SPREAD_WEIGHT: f64 = 0.2;

/// Coarse damage category of a severity score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DamageCategory {
    /// Severity below 0.2
    Minor,
    /// Severity below 0.5
    Moderate,
    /// Severity below 0.8
    Severe,
    /// Everything else
    Total,
}

impl DamageCategory {
    /// Category of a severity score.
    pub fn from_severity(severity: f64) -> Self {
        if severity < 0.2 {
            DamageCategory::Minor
        } else if severity < 0.5 {
            DamageCategory::Moderate
        } else if severity < 0.8 {
            DamageCategory::Severe
        } else {
            DamageCategory::Total
        }
    }

    /// Lowercase name.
    pub fn as_str(&self) -> &'static str {
        match self {
            DamageCategory::Minor => "minor",
            DamageCategory::Moderate => "moderate",
            DamageCategory::Severe => "severe",
            DamageCategory::Total => "total",
        }
    }
}

impl fmt::Display for DamageCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How involved a repair looks from the number of damaged components.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComplexityLevel {
    /// At most two components
    Low,
    /// Three to five components
    Medium,
    /// More than five components
    High,
}

impl ComplexityLevel {
    /// Complexity for a number of damaged components.
    pub fn from_component_count(count: usize) -> Self {
        if count > 5 {
            ComplexityLevel::High
        } else if count > 2 {
            ComplexityLevel::Medium
        } else {
            ComplexityLevel::Low
        }
    }

    /// Lowercase name.
    pub fn as_str(&self) -> &'static str {
        match self {
            ComplexityLevel::Low => "low",
            ComplexityLevel::Medium => "medium",
            ComplexityLevel::High => "high",
        }
    }
}

impl fmt::Display for ComplexityLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of normalizing one raw damage reading set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NormalizedDamage {
    /// Canonical component id to level in [0, 1], excluding levels below
    /// [`EXCLUSION_THRESHOLD`]
    pub components: BTreeMap<String, f64>,
    /// Crash severity in [0, 1]
    pub severity: f64,
}

impl NormalizedDamage {
    /// Level of one canonical component.
    pub fn level(&self, component: &str) -> Option<f64> {
        self.components.get(component).copied()
    }

    /// Components that survived the exclusion threshold.
    pub fn affected_count(&self) -> usize {
        self.components.len()
    }

    /// Whether no component survived.
    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    /// Category of the severity.
    pub fn category(&self) -> DamageCategory {
        DamageCategory::from_severity(self.severity)
    }

    /// Complexity from the affected count.
    pub fn complexity(&self) -> ComplexityLevel {
        ComplexityLevel::from_component_count(self.affected_count())
    }
}

/// Maps vendor damage readings to canonical components and scores them.
///
/// Pure: the same readings always yield the same result.
#[derive(Debug, Clone, Copy, Default)]
pub struct TelemetryNormalizer;

impl TelemetryNormalizer {
    /// Create a normalizer.
    pub fn new() -> Self {
        Self
    }

    /// Normalize `(vendor_key, level)` readings.
    ///
    /// Levels are clamped to [0, 1]; infinities clamp to the nearest bound.
    /// When several vendor keys share a canonical id the highest level wins.
    ///
    /// The severity score averages and peaks over every merged reading,
    /// counting only components that survive the exclusion threshold as
    /// affected. This keeps the score non-decreasing as any reading grows.
    ///
    /// # Errors
    ///
    /// `NegativeDamage` for a reading below zero, `NotANumber` for NaN.
    pub fn normalize<'a, I>(&self, readings: I) -> Result<NormalizedDamage, ValidationError>
    where
        I: IntoIterator<Item = (&'a str, f64)>,
    {
        let mut merged: BTreeMap<String, f64> = BTreeMap::new();
        for (vendor_key, level) in readings {
            let level = validate_level(vendor_key, level)?;
            let canonical = canonical_component(vendor_key);
            trace!(vendor_key, canonical, level, "Normalized reading");
            merged
                .entry(canonical.to_string())
                .and_modify(|existing| *existing = existing.max(level))
                .or_insert(level);
        }

        let severity = severity_score(&merged);
        let components = merged
            .into_iter()
            .filter(|(_, level)| *level >= EXCLUSION_THRESHOLD)
            .collect();
        Ok(NormalizedDamage {
            components,
            severity,
        })
    }
}

fn validate_level(vendor_key: &str, level: f64) -> Result<f64, ValidationError> {
    if level.is_nan() {
        return Err(ValidationError::NotANumber(vendor_key.to_string()));
    }
    if level < 0.0 {
        return Err(ValidationError::NegativeDamage {
            component: vendor_key.to_string(),
            value: level,
        });
    }
    Ok(level.min(1.0))
}

fn severity_score(merged: &BTreeMap<String, f64>) -> f64 {
    if merged.is_empty() {
        return 0.0;
    }

    let sum: f64 = merged.values().sum();
    let average = sum / merged.len() as f64;
    let peak = merged.values().copied().fold(0.0_f64, f64::max);
    let affected = merged
        .values()
        .filter(|level| **level >= EXCLUSION_THRESHOLD)
        .count();
    let spread = (affected as f64 / AFFECTED_SATURATION).min(1.0);

    (AVERAGE_WEIGHT * average + PEAK_WEIGHT * peak + SPREAD_WEIGHT * spread).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    type TestResult = Result<(), ValidationError>;

    #[test]
    fn test_frontal_scenario() -> TestResult {
        let damage = TelemetryNormalizer::new().normalize([("bumper_F", 0.85), ("hood", 0.45)])?;
        assert_eq!(damage.affected_count(), 2);
        assert!(damage.level("front_bumper").is_some_and(|v| (v - 0.85).abs() < 1e-12));
        assert!(damage.level("hood").is_some_and(|v| (v - 0.45).abs() < 1e-12));
        assert!((damage.severity - 0.62).abs() < 1e-9, "severity {}", damage.severity);
        Ok(())
    }

    #[test]
    fn test_empty_input_scores_zero() -> TestResult {
        let damage = TelemetryNormalizer::new().normalize(std::iter::empty())?;
        assert!(damage.is_empty());
        assert!(damage.severity.abs() < f64::EPSILON);
        Ok(())
    }

    #[test]
    fn test_small_values_excluded() -> TestResult {
        let damage = TelemetryNormalizer::new().normalize([("trunk", 0.049), ("roof", 0.05)])?;
        assert_eq!(damage.level("trunk_lid"), None);
        assert!(damage.level("roof").is_some());
        Ok(())
    }

    #[test]
    fn test_infinity_clamps_and_nan_rejected() {
        let normalizer = TelemetryNormalizer::new();
        let engine = normalizer
            .normalize([("engine", f64::INFINITY)])
            .ok()
            .and_then(|d| d.level("engine"));
        assert!(engine.is_some_and(|v| (v - 1.0).abs() < f64::EPSILON));

        let nan = normalizer.normalize([("engine", f64::NAN)]);
        assert_eq!(nan, Err(ValidationError::NotANumber("engine".to_string())));
    }

    #[test]
    fn test_negative_rejected() {
        let result = TelemetryNormalizer::new().normalize([("hood", -0.1)]);
        assert!(matches!(
            result,
            Err(ValidationError::NegativeDamage { ref component, .. }) if component == "hood"
        ));
    }

    #[test]
    fn test_duplicate_canonical_keeps_max() -> TestResult {
        let damage =
            TelemetryNormalizer::new().normalize([("front_bumper", 0.3), ("bumper_F", 0.7)])?;
        assert_eq!(damage.affected_count(), 1);
        assert!(damage.level("front_bumper").is_some_and(|v| (v - 0.7).abs() < 1e-12));
        Ok(())
    }

    #[test]
    fn test_categories() {
        assert_eq!(DamageCategory::from_severity(0.0), DamageCategory::Minor);
        assert_eq!(DamageCategory::from_severity(0.2), DamageCategory::Moderate);
        assert_eq!(DamageCategory::from_severity(0.62), DamageCategory::Severe);
        assert_eq!(DamageCategory::from_severity(0.8), DamageCategory::Total);
    }

    #[test]
    fn test_complexity() {
        assert_eq!(ComplexityLevel::from_component_count(2), ComplexityLevel::Low);
        assert_eq!(ComplexityLevel::from_component_count(3), ComplexityLevel::Medium);
        assert_eq!(ComplexityLevel::from_component_count(6), ComplexityLevel::High);
    }
}
