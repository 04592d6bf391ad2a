//! Repair recommendations and the pre-tax cost estimate.

use std::cmp::Ordering;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::analyzer::{DamageAnalysis, DamageZone};
use crate::catalog::{PartsCatalog, PriceTable};
use crate::money::Money;
use crate::zones::{PriorityTier, ZoneId};

/// Zones below this level get no recommendation.
pub const MINIMUM_REPAIR_LEVEL: f64 = 10.0;

const LABOUR_FACTOR: f64 = 1.6;
const SHOP_SUPPLIES_FACTOR: f64 = 1.10;
const PART_HOURS_FACTOR: f64 = 0.2;
const SAFETY_CRITICAL_LEVEL: f64 = 30.0;
const INSPECTION_COST: Money = Money::from_units(300);

/// Estimator tuning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EstimatorConfig {
    /// Overall score above which a structural inspection is attached
    pub inspection_threshold: f64,
}

impl Default for EstimatorConfig {
    fn default() -> Self {
        Self {
            inspection_threshold: 60.0,
        }
    }
}

/// Extent of the work on one zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RepairScope {
    /// Damage up to 25
    Refinish,
    /// Damage above 25
    Moderate,
    /// Damage above 50
    Major,
    /// Damage above 80
    Replacement,
}

impl RepairScope {
    /// Scope for a zone damage level.
    pub fn from_damage(level: f64) -> Self {
        if level > 80.0 {
            RepairScope::Replacement
        } else if level > 50.0 {
            RepairScope::Major
        } else if level > 25.0 {
            RepairScope::Moderate
        } else {
            RepairScope::Refinish
        }
    }

    /// Labour multiplier for this scope.
    pub fn hours_multiplier(&self) -> f64 {
        match self {
            RepairScope::Replacement => 2.0,
            RepairScope::Major => 1.5,
            RepairScope::Moderate => 1.2,
            RepairScope::Refinish => 0.8,
        }
    }

    /// Workshop description.
    pub fn description(&self) -> &'static str {
        match self {
            RepairScope::Replacement => "Complete replacement required",
            RepairScope::Major => "Major repair or replacement",
            RepairScope::Moderate => "Moderate repair needed",
            RepairScope::Refinish => "Minor repair/refinishing",
        }
    }
}

impl fmt::Display for RepairScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description())
    }
}

/// How many parts the repair involves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RepairComplexity {
    /// No parts
    Simple,
    /// One or two parts
    Moderate,
    /// Three parts or more
    Complex,
}

impl RepairComplexity {
    /// Complexity for a number of parts.
    pub fn from_parts(count: usize) -> Self {
        match count {
            0 => RepairComplexity::Simple,
            1 | 2 => RepairComplexity::Moderate,
            _ => RepairComplexity::Complex,
        }
    }
}

/// Work proposed for one zone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepairRecommendation {
    /// Position in the repair order, starting at 1
    pub priority: usize,
    /// Zone identifier
    pub zone: ZoneId,
    /// Human-readable zone name
    pub zone_name: String,
    /// Urgency tier
    pub urgency: PriorityTier,
    /// Zone damage level
    pub damage_level: f64,
    /// Extent of the work
    pub scope: RepairScope,
    /// Parts involvement
    pub complexity: RepairComplexity,
    /// Estimated labour hours
    pub estimated_hours: f64,
    /// Labour time as shown to customers
    pub estimated_time: String,
    /// Parts plus labour for this zone
    pub estimated_cost: Money,
    /// Names of the parts to order
    pub parts_needed: Vec<String>,
    /// Workshop notes
    pub details: Vec<String>,
}

/// Structural inspection attached to heavily damaged vehicles.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InspectionItem {
    /// What the inspection covers
    pub description: String,
    /// Expected duration
    pub estimated_time: String,
    /// Flat inspection fee, not part of the zone total
    pub cost: Money,
}

/// Priced repair plan for one analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepairEstimate {
    /// Recommendations in repair order
    pub recommendations: Vec<RepairRecommendation>,
    /// Sum of zone costs
    pub zone_total: Money,
    /// Zone total plus shop supplies, before tax
    pub pre_tax_total: Money,
    /// Inspection to book before repairs, if any
    pub inspection: Option<InspectionItem>,
    /// What the owner should do next
    pub next_steps: Vec<String>,
    /// Overall score the estimate was built from
    pub overall_score: f64,
    /// When the estimate was produced
    pub created_at: DateTime<Utc>,
}

/// Turns a damage analysis into a priced repair plan.
#[derive(Debug, Clone)]
pub struct RepairEstimator<C = PriceTable> {
    catalog: C,
    config: EstimatorConfig,
}

impl Default for RepairEstimator<PriceTable> {
    fn default() -> Self {
        Self::new(PriceTable::default())
    }
}

impl<C: PartsCatalog> RepairEstimator<C> {
    /// Create an estimator over `catalog` with default tuning.
    pub fn new(catalog: C) -> Self {
        Self::with_config(catalog, EstimatorConfig::default())
    }

    /// Create an estimator with explicit tuning.
    pub fn with_config(catalog: C, config: EstimatorConfig) -> Self {
        Self { catalog, config }
    }

    /// The price source.
    pub fn catalog(&self) -> &C {
        &self.catalog
    }

    /// Recommendations for the given zones, sorted by urgency then damage.
    /// Zones below [`MINIMUM_REPAIR_LEVEL`] are skipped.
    pub fn recommend(&self, zones: &[DamageZone]) -> Vec<RepairRecommendation> {
        let mut ordered: Vec<&DamageZone> = zones
            .iter()
            .filter(|zone| zone.damage_level >= MINIMUM_REPAIR_LEVEL)
            .collect();
        ordered.sort_by(|a, b| compare_priority(b, a));

        ordered
            .into_iter()
            .enumerate()
            .map(|(index, zone)| self.recommend_zone(index.saturating_add(1), zone))
            .collect()
    }

    /// Full estimate with inspection and next steps.
    pub fn estimate(&self, analysis: &DamageAnalysis) -> RepairEstimate {
        let recommendations = self.recommend(&analysis.zones);
        let zone_total: Money = recommendations.iter().map(|r| r.estimated_cost).sum();
        let pre_tax_total = zone_total.scale(SHOP_SUPPLIES_FACTOR);

        let inspection = (analysis.overall_score > self.config.inspection_threshold).then(|| {
            InspectionItem {
                description: "Comprehensive damage assessment by certified technician"
                    .to_string(),
                estimated_time: "2-4 hours".to_string(),
                cost: INSPECTION_COST,
            }
        });

        info!(
            zones = recommendations.len(),
            pre_tax_total = %pre_tax_total,
            inspection = inspection.is_some(),
            "Repair estimate ready"
        );

        RepairEstimate {
            next_steps: next_steps(analysis),
            recommendations,
            zone_total,
            pre_tax_total,
            inspection,
            overall_score: analysis.overall_score,
            created_at: Utc::now(),
        }
    }

    fn recommend_zone(&self, priority: usize, zone: &DamageZone) -> RepairRecommendation {
        let scope = RepairScope::from_damage(zone.damage_level);
        let estimated_hours = repair_hours(zone, scope);

        let parts_cost: Money = zone
            .affected_parts
            .iter()
            .map(|part| {
                self.catalog
                    .price(&part.part_number)
                    .scale(part.severity.cost_multiplier())
            })
            .sum();

        let mut details = vec![scope.description().to_string()];
        if matches!(zone.zone, ZoneId::PassengerCompartment | ZoneId::EngineBay)
            && zone.damage_level > SAFETY_CRITICAL_LEVEL
        {
            details.push("Safety-critical repair".to_string());
        }

        RepairRecommendation {
            priority,
            zone: zone.zone,
            zone_name: zone.name.clone(),
            urgency: zone.tier,
            damage_level: zone.damage_level,
            scope,
            complexity: RepairComplexity::from_parts(zone.affected_parts.len()),
            estimated_hours,
            estimated_time: time_label(estimated_hours),
            estimated_cost: parts_cost.scale(LABOUR_FACTOR),
            parts_needed: zone.affected_parts.iter().map(|p| p.name.clone()).collect(),
            details,
        }
    }
}

fn compare_priority(a: &DamageZone, b: &DamageZone) -> Ordering {
    a.tier
        .cmp(&b.tier)
        .then_with(|| a.damage_level.total_cmp(&b.damage_level))
}

fn repair_hours(zone: &DamageZone, scope: RepairScope) -> f64 {
    let parts_factor = 1.0 + PART_HOURS_FACTOR * zone.affected_parts.len() as f64;
    zone.zone.spec().base_hours * scope.hours_multiplier() * parts_factor
}

/// Format labour hours: whole hours up to a day, whole working days beyond.
pub fn time_label(hours: f64) -> String {
    let whole = hours.max(0.0).trunc();
    if whole > 24.0 {
        format!("{} days", (whole / 8.0).trunc())
    } else {
        format!("{whole} hours")
    }
}

fn next_steps(analysis: &DamageAnalysis) -> Vec<String> {
    let mut steps = Vec::new();
    if !analysis.safety.driveable {
        steps.push("Vehicle must be towed - not safe to drive");
    }
    if analysis.safety.inspection_required {
        steps.push("Professional safety inspection required before repairs");
    }

    let score = analysis.overall_score;
    if score > 60.0 {
        steps.push("Contact insurance company for total loss assessment");
        steps.push("Obtain comprehensive repair estimate from a certified dealer");
    } else if score > 30.0 {
        steps.push("Schedule detailed inspection with an authorized service center");
        steps.push("Obtain repair estimate and parts availability timeline");
    } else {
        steps.push("Schedule repair appointment with an authorized service center");
    }

    steps.extend([
        "Document all damage with photos",
        "Contact insurance provider to file claim",
        "Keep all receipts for towing and storage costs",
    ]);
    steps.into_iter().map(str::to_string).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scope_boundaries() {
        assert_eq!(RepairScope::from_damage(25.0), RepairScope::Refinish);
        assert_eq!(RepairScope::from_damage(25.1), RepairScope::Moderate);
        assert_eq!(RepairScope::from_damage(51.0), RepairScope::Major);
        assert_eq!(RepairScope::from_damage(80.5), RepairScope::Replacement);
    }

    #[test]
    fn test_complexity_from_parts() {
        assert_eq!(RepairComplexity::from_parts(0), RepairComplexity::Simple);
        assert_eq!(RepairComplexity::from_parts(2), RepairComplexity::Moderate);
        assert_eq!(RepairComplexity::from_parts(3), RepairComplexity::Complex);
    }

    #[test]
    fn test_time_label() {
        assert_eq!(time_label(9.6), "9 hours");
        assert_eq!(time_label(24.9), "24 hours");
        assert_eq!(time_label(40.0), "5 days");
        assert_eq!(time_label(-1.0), "0 hours");
    }
}
