//! Damage zone analysis and repair estimation for crashlab
//!
//! A [`TelemetrySample`](crashlab_telemetry::TelemetrySample) is grouped into
//! six fixed vehicle zones. Each zone gets a damage level from its impact
//! force and deformation scores:
//!
//! ```text
//! level   = 0.6 * impact_force + 0.4 * deformation
//! overall = sum(level * weight) / zones / average_weight
//! ```
//!
//! The analysis carries a [`SafetyAssessment`] and feeds the
//! [`RepairEstimator`], which prices affected parts through a
//! [`PartsCatalog`] and orders the work by urgency.
//!
//! # Example
//!
//! ```
//! use std::collections::BTreeMap;
//! use crashlab_damage::{DamageAnalyzer, RepairEstimator, ZoneId, ZoneInput};
//!
//! let mut impacts = BTreeMap::new();
//! impacts.insert(ZoneId::Suspension, ZoneInput { force: 60.0, deformation: 30.0 });
//!
//! let analysis = DamageAnalyzer::new().analyze_impacts(&impacts);
//! assert!(!analysis.safety.driveable);
//!
//! let estimate = RepairEstimator::default().estimate(&analysis);
//! assert_eq!(estimate.recommendations.len(), 1);
//! ```

#![deny(unsafe_op_in_unsafe_fn, clippy::unwrap_used)]
#![warn(missing_docs, rust_2018_idioms)]
#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod analyzer;
pub mod catalog;
pub mod estimator;
pub mod money;
pub mod prelude;
pub mod safety;
pub mod store;
pub mod zones;

pub use analyzer::{
    AffectedPart, DamageAnalysis, DamageAnalyzer, DamageClass, DamageZone, PartSeverity,
    ZoneInput,
};
pub use catalog::{FALLBACK_PART_PRICE, PartsCatalog, PriceTable};
pub use estimator::{
    EstimatorConfig, InspectionItem, MINIMUM_REPAIR_LEVEL, RepairComplexity, RepairEstimate,
    RepairEstimator, RepairRecommendation, RepairScope, time_label,
};
pub use money::Money;
pub use safety::{SafetyAssessment, SafetyRating};
pub use store::{EstimateId, EstimateStore, InMemoryEstimateStore};
pub use zones::{PartSpec, PriorityTier, ZoneId, ZoneSpec};
