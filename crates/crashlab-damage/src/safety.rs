//! Safety assessment derived from zone damage.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::analyzer::DamageZone;
use crate::zones::ZoneId;

const SUSPENSION_DRIVEABLE_LIMIT: f64 = 40.0;
const ENGINE_DRIVEABLE_LIMIT: f64 = 50.0;
const CABIN_INSPECTION_LIMIT: f64 = 20.0;
const CONCERN_LIMIT: f64 = 30.0;

/// Zones whose damage raises a safety concern.
const CONCERN_ZONES: [ZoneId; 3] = [
    ZoneId::PassengerCompartment,
    ZoneId::EngineBay,
    ZoneId::Suspension,
];

/// Overall safety rating, ordered from best to worst.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SafetyRating {
    /// Score below 15
    Safe,
    /// Score from 15 up to 40
    MinorConcern,
    /// Score from 40 up to 70
    Caution,
    /// Score of 70 or more
    Unsafe,
}

impl SafetyRating {
    /// Rating for an overall score in [0, 100]. Each tier includes its lower
    /// bound.
    pub fn from_score(score: f64) -> Self {
        if score >= 70.0 {
            SafetyRating::Unsafe
        } else if score >= 40.0 {
            SafetyRating::Caution
        } else if score >= 15.0 {
            SafetyRating::MinorConcern
        } else {
            SafetyRating::Safe
        }
    }

    /// Snake-case name.
    pub fn as_str(&self) -> &'static str {
        match self {
            SafetyRating::Safe => "safe",
            SafetyRating::MinorConcern => "minor_concern",
            SafetyRating::Caution => "caution",
            SafetyRating::Unsafe => "unsafe",
        }
    }
}

impl fmt::Display for SafetyRating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether the vehicle may be driven and what must happen first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SafetyAssessment {
    /// Rating of the overall score
    pub overall_rating: SafetyRating,
    /// False once suspension or engine damage is past its limit
    pub driveable: bool,
    /// Cabin damage calls for a professional inspection
    pub inspection_required: bool,
    /// One entry per heavily damaged safety-relevant zone
    pub safety_concerns: Vec<String>,
    /// Actions to take before anything else
    pub immediate_actions: Vec<String>,
}

impl SafetyAssessment {
    /// Assess zone levels against the driveability and inspection limits.
    pub fn evaluate(zones: &[DamageZone], overall_score: f64) -> Self {
        let level = |id: ZoneId| {
            zones
                .iter()
                .find(|zone| zone.zone == id)
                .map_or(0.0, |zone| zone.damage_level)
        };

        let driveable = !(level(ZoneId::Suspension) > SUSPENSION_DRIVEABLE_LIMIT
            || level(ZoneId::EngineBay) > ENGINE_DRIVEABLE_LIMIT);
        let inspection_required = level(ZoneId::PassengerCompartment) > CABIN_INSPECTION_LIMIT;
        let overall_rating = SafetyRating::from_score(overall_score);

        let safety_concerns = zones
            .iter()
            .filter(|zone| CONCERN_ZONES.contains(&zone.zone) && zone.damage_level > CONCERN_LIMIT)
            .map(|zone| format!("Significant damage to {}", zone.name))
            .collect();

        let mut immediate_actions = Vec::new();
        if !driveable {
            immediate_actions.push("Do not drive vehicle".to_string());
        }
        if inspection_required {
            immediate_actions.push("Schedule professional inspection".to_string());
        }
        if overall_rating == SafetyRating::Unsafe {
            immediate_actions.push("Document all damage for insurance".to_string());
        }

        Self {
            overall_rating,
            driveable,
            inspection_required,
            safety_concerns,
            immediate_actions,
        }
    }
}
