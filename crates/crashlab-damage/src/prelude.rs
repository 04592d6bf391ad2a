//! Prelude module for convenient imports

pub use crate::analyzer::{DamageAnalysis, DamageAnalyzer, DamageZone, ZoneInput};
pub use crate::catalog::{PartsCatalog, PriceTable};
pub use crate::estimator::{RepairEstimate, RepairEstimator, RepairRecommendation};
pub use crate::money::Money;
pub use crate::safety::{SafetyAssessment, SafetyRating};
pub use crate::store::{EstimateId, EstimateStore, InMemoryEstimateStore};
pub use crate::zones::{PriorityTier, ZoneId};
