//! Damage telemetry normalization for crashlab
//!
//! Simulators report damage per vendor component key, either as a bare
//! number or nested in a `{damage}` object. This crate maps those keys to
//! canonical component ids, clamps levels to `[0, 1]`, drops negligible
//! readings and scores the overall crash severity:
//!
//! ```text
//! severity = 0.4 * average + 0.4 * peak + 0.2 * min(1, affected / 20)
//! ```
//!
//! # Example
//!
//! ```
//! use crashlab_telemetry::TelemetryNormalizer;
//!
//! let damage = TelemetryNormalizer::new()
//!     .normalize([("bumper_F", 0.85), ("hood", 0.45)])?;
//! assert!(damage.components.contains_key("front_bumper"));
//! assert!((damage.severity - 0.62).abs() < 1e-9);
//! # Ok::<(), crashlab_errors::ValidationError>(())
//! ```

#![deny(unsafe_op_in_unsafe_fn, clippy::unwrap_used)]
#![warn(missing_docs, rust_2018_idioms)]
#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod normalizer;
pub mod sample;
pub mod vendor;

pub use normalizer::{
    AFFECTED_SATURATION, ComplexityLevel, DamageCategory, EXCLUSION_THRESHOLD, NormalizedDamage,
    TelemetryNormalizer,
};
pub use sample::TelemetrySample;
pub use vendor::{VENDOR_COMPONENTS, canonical_component, is_known_vendor_key};
