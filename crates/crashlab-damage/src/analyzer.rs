//! Zone damage analysis.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crashlab_telemetry::TelemetrySample;

use crate::safety::SafetyAssessment;
use crate::zones::{PriorityTier, ZoneId, average_weight};

const IMPACT_WEIGHT: f64 = 0.6;
const DEFORMATION_WEIGHT: f64 = 0.4;

/// Measured inputs for one zone, both on a 0-100 scale.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ZoneInput {
    /// Impact force score
    pub force: f64,
    /// Deformation score
    pub deformation: f64,
}

/// How badly an affected part is damaged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PartSeverity {
    /// Zone damage below 40
    Low,
    /// Zone damage from 40
    Medium,
    /// Zone damage from 60
    High,
    /// Zone damage from 80
    Total,
}

impl PartSeverity {
    /// Severity for a zone damage level.
    pub fn from_damage(level: f64) -> Self {
        if level >= 80.0 {
            PartSeverity::Total
        } else if level >= 60.0 {
            PartSeverity::High
        } else if level >= 40.0 {
            PartSeverity::Medium
        } else {
            PartSeverity::Low
        }
    }

    /// Cost multiplier applied to the catalog price.
    pub fn cost_multiplier(&self) -> f64 {
        match self {
            PartSeverity::Low => 0.3,
            PartSeverity::Medium => 1.0,
            PartSeverity::High => 1.2,
            PartSeverity::Total => 1.5,
        }
    }

    /// Snake-case name.
    pub fn as_str(&self) -> &'static str {
        match self {
            PartSeverity::Low => "low",
            PartSeverity::Medium => "medium",
            PartSeverity::High => "high",
            PartSeverity::Total => "total",
        }
    }
}

impl fmt::Display for PartSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A catalog part whose threshold the zone damage reached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AffectedPart {
    /// Manufacturer part number
    pub part_number: String,
    /// Part name
    pub name: String,
    /// Damage severity
    pub severity: PartSeverity,
    /// Zone damage level the part was judged at
    pub damage_percentage: f64,
}

/// Damage in one zone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DamageZone {
    /// Zone identifier
    pub zone: ZoneId,
    /// Human-readable zone name
    pub name: String,
    /// Repair priority tier
    pub tier: PriorityTier,
    /// Damaged member components that contributed, if derived from a sample
    pub components: Vec<String>,
    /// Clamped impact force score in [0, 100]
    pub impact_force: f64,
    /// Clamped deformation score in [0, 100]
    pub deformation: f64,
    /// Combined damage level in [0, 100]
    pub damage_level: f64,
    /// Parts needing work
    pub affected_parts: Vec<AffectedPart>,
    /// Weight in the overall score
    pub priority_weight: f64,
}

/// Class of the overall damage score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DamageClass {
    /// Score below 20
    MinorCosmetic,
    /// Score below 50
    ModerateStructural,
    /// Score below 80
    MajorStructural,
    /// Everything else
    CriticalSafety,
}

impl DamageClass {
    /// Class of an overall score.
    pub fn from_score(score: f64) -> Self {
        if score < 20.0 {
            DamageClass::MinorCosmetic
        } else if score < 50.0 {
            DamageClass::ModerateStructural
        } else if score < 80.0 {
            DamageClass::MajorStructural
        } else {
            DamageClass::CriticalSafety
        }
    }

    /// Snake-case name.
    pub fn as_str(&self) -> &'static str {
        match self {
            DamageClass::MinorCosmetic => "minor_cosmetic",
            DamageClass::ModerateStructural => "moderate_structural",
            DamageClass::MajorStructural => "major_structural",
            DamageClass::CriticalSafety => "critical_safety",
        }
    }
}

impl fmt::Display for DamageClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Full result of a damage analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DamageAnalysis {
    /// All six zones in catalog order
    pub zones: Vec<DamageZone>,
    /// Weighted overall score in [0, 100]
    pub overall_score: f64,
    /// Class of the overall score
    pub damage_class: DamageClass,
    /// Driveability and inspection verdict
    pub safety: SafetyAssessment,
}

impl DamageAnalysis {
    /// The entry for one zone.
    pub fn zone(&self, id: ZoneId) -> Option<&DamageZone> {
        self.zones.iter().find(|zone| zone.zone == id)
    }

    /// Zones with any damage.
    pub fn damaged_zones(&self) -> impl Iterator<Item = &DamageZone> + '_ {
        self.zones.iter().filter(|zone| zone.damage_level > 0.0)
    }
}

/// Groups canonical components into zones and scores them.
///
/// Deterministic: equal inputs yield equal analyses.
#[derive(Debug, Clone, Copy, Default)]
pub struct DamageAnalyzer;

impl DamageAnalyzer {
    /// Create an analyzer.
    pub fn new() -> Self {
        Self
    }

    /// Analyze a telemetry sample.
    pub fn analyze(&self, sample: &TelemetrySample) -> DamageAnalysis {
        self.analyze_components(sample.normalized_damage())
    }

    /// Analyze a canonical component map with levels in [0, 1].
    ///
    /// Each zone's impact force is the worst member, scaled to 100, and its
    /// deformation is the member mean over the whole membership.
    pub fn analyze_components(&self, components: &BTreeMap<String, f64>) -> DamageAnalysis {
        let mut inputs = BTreeMap::new();
        let mut contributors: BTreeMap<ZoneId, Vec<String>> = BTreeMap::new();
        for zone in ZoneId::ALL {
            let members = zone.spec().members;
            let mut peak = 0.0_f64;
            let mut sum = 0.0_f64;
            for member in members {
                if let Some(level) = components.get(*member) {
                    peak = peak.max(*level);
                    sum += *level;
                    contributors.entry(zone).or_default().push((*member).to_string());
                }
            }
            inputs.insert(
                zone,
                ZoneInput {
                    force: 100.0 * peak,
                    deformation: 100.0 * sum / members.len() as f64,
                },
            );
        }

        let mut analysis = self.analyze_impacts(&inputs);
        for zone in &mut analysis.zones {
            if let Some(names) = contributors.remove(&zone.zone) {
                zone.components = names;
            }
        }
        analysis
    }

    /// Analyze externally measured force and deformation per zone. Zones
    /// missing from `inputs` are undamaged.
    pub fn analyze_impacts(&self, inputs: &BTreeMap<ZoneId, ZoneInput>) -> DamageAnalysis {
        let zones: Vec<DamageZone> = ZoneId::ALL
            .into_iter()
            .map(|id| assess_zone(id, inputs.get(&id).copied().unwrap_or_default()))
            .collect();

        let overall_score = overall_score(&zones);
        let safety = SafetyAssessment::evaluate(&zones, overall_score);
        debug!(
            overall_score,
            rating = %safety.overall_rating,
            driveable = safety.driveable,
            "Damage analysis complete"
        );

        DamageAnalysis {
            damage_class: DamageClass::from_score(overall_score),
            zones,
            overall_score,
            safety,
        }
    }
}

fn clamp_score(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 100.0)
    }
}

fn assess_zone(id: ZoneId, input: ZoneInput) -> DamageZone {
    let spec = id.spec();
    let impact_force = clamp_score(input.force);
    let deformation = clamp_score(input.deformation);
    let damage_level =
        clamp_score(IMPACT_WEIGHT * impact_force + DEFORMATION_WEIGHT * deformation);

    let affected_parts = spec
        .parts
        .iter()
        .filter(|part| damage_level >= part.threshold)
        .map(|part| AffectedPart {
            part_number: part.part_number.to_string(),
            name: part.name.to_string(),
            severity: PartSeverity::from_damage(damage_level),
            damage_percentage: damage_level,
        })
        .collect();

    DamageZone {
        zone: id,
        name: id.display_name().to_string(),
        tier: spec.tier,
        components: Vec::new(),
        impact_force,
        deformation,
        damage_level,
        affected_parts,
        priority_weight: spec.weight,
    }
}

fn overall_score(zones: &[DamageZone]) -> f64 {
    if zones.is_empty() {
        return 0.0;
    }
    let weighted: f64 = zones
        .iter()
        .map(|zone| zone.damage_level * zone.priority_weight)
        .sum();
    clamp_score(weighted / zones.len() as f64 / average_weight())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn impacts(entries: &[(ZoneId, f64, f64)]) -> BTreeMap<ZoneId, ZoneInput> {
        entries
            .iter()
            .map(|(id, force, deformation)| {
                (
                    *id,
                    ZoneInput {
                        force: *force,
                        deformation: *deformation,
                    },
                )
            })
            .collect()
    }

    #[test]
    fn test_zone_level_combines_force_and_deformation() {
        let analysis =
            DamageAnalyzer::new().analyze_impacts(&impacts(&[(ZoneId::FrontEnd, 50.0, 25.0)]));
        let front = analysis.zone(ZoneId::FrontEnd);
        assert!(front.is_some_and(|z| (z.damage_level - 40.0).abs() < 1e-9));
    }

    #[test]
    fn test_inputs_clamped_before_combining() {
        let analysis = DamageAnalyzer::new()
            .analyze_impacts(&impacts(&[(ZoneId::RearEnd, 250.0, -40.0)]));
        let rear = analysis.zone(ZoneId::RearEnd);
        assert!(rear.is_some_and(|z| (z.impact_force - 100.0).abs() < f64::EPSILON));
        assert!(rear.is_some_and(|z| z.deformation.abs() < f64::EPSILON));
        assert!(rear.is_some_and(|z| (z.damage_level - 60.0).abs() < 1e-9));
    }

    #[test]
    fn test_parts_affected_at_threshold() {
        let analysis =
            DamageAnalyzer::new().analyze_impacts(&impacts(&[(ZoneId::FrontEnd, 26.0, 26.0)]));
        let parts: Vec<_> = analysis
            .zone(ZoneId::FrontEnd)
            .map(|z| z.affected_parts.iter().map(|p| p.part_number.as_str()).collect())
            .unwrap_or_default();
        assert_eq!(parts, vec!["1J0807221", "5G0809857"]);
    }

    #[test]
    fn test_uniform_damage_scores_its_level() {
        let all: Vec<_> = ZoneId::ALL.iter().map(|id| (*id, 50.0, 50.0)).collect();
        let analysis = DamageAnalyzer::new().analyze_impacts(&impacts(&all));
        assert!((analysis.overall_score - 50.0).abs() < 1e-9);
        assert_eq!(analysis.damage_class, DamageClass::MajorStructural);
    }

    #[test]
    fn test_components_grouped_into_zones() {
        let components: BTreeMap<String, f64> = [("front_bumper", 0.85), ("hood", 0.45)]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect();
        let analysis = DamageAnalyzer::new().analyze_components(&components);
        let front = analysis.zone(ZoneId::FrontEnd);
        assert_eq!(
            front.map(|z| z.components.clone()),
            Some(vec!["front_bumper".to_string(), "hood".to_string()])
        );
        assert!(front.is_some_and(|z| (z.impact_force - 85.0).abs() < 1e-9));
        assert!(front.is_some_and(|z| (z.deformation - 130.0 / 7.0).abs() < 1e-9));
        assert_eq!(analysis.damaged_zones().count(), 1);
    }

    #[test]
    fn test_part_severity_tiers() {
        assert_eq!(PartSeverity::from_damage(39.9), PartSeverity::Low);
        assert_eq!(PartSeverity::from_damage(40.0), PartSeverity::Medium);
        assert_eq!(PartSeverity::from_damage(60.0), PartSeverity::High);
        assert_eq!(PartSeverity::from_damage(80.0), PartSeverity::Total);
    }
}
