//! Centralized error types for crashlab
//!
//! Every layer of the simulator client and damage pipeline reports failures
//! through the types in this crate, so callers can decide what to do next
//! without ever inspecting a raw transport error.
//!
//! # Architecture
//!
//! - [`common`]: the top-level [`CrashlabError`], classification and context helpers
//! - [`simulator`]: connection, command and wire-level failures of the protocol client
//! - [`validation`]: malformed parameters and malformed damage input
//!
//! # Dispositions
//!
//! Each error maps to exactly one [`ErrorDisposition`]:
//!
//! | disposition | errors |
//! |---|---|
//! | `Retry` | command timeout, telemetry not yet available |
//! | `Reconnect` | connect failure, connection lost, not connected |
//! | `InvalidInput` | any [`ValidationError`] |
//! | `Fail` | protocol fault, simulator rejection, configuration |
//!
//! # Example
//!
//! ```
//! use crashlab_errors::prelude::*;
//!
//! fn check_speed(speed_kmh: f64) -> Result<f64> {
//!     if !(0.0..=200.0).contains(&speed_kmh) {
//!         return Err(ValidationError::out_of_range("speed_kmh", speed_kmh, 0.0, 200.0).into());
//!     }
//!     Ok(speed_kmh)
//! }
//!
//! let err = check_speed(-5.0).unwrap_err();
//! assert_eq!(err.disposition(), ErrorDisposition::InvalidInput);
//! ```

#![deny(unsafe_op_in_unsafe_fn, clippy::unwrap_used)]
#![warn(missing_docs, rust_2018_idioms)]
#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod common;
pub mod prelude;
pub mod simulator;
pub mod validation;

pub use common::{
    CrashlabError, ErrorCategory, ErrorContext, ErrorDisposition, ErrorSeverity, ResultExt,
};
pub use simulator::SimulatorError;
pub use validation::ValidationError;

/// A specialized `Result` type for crashlab operations.
pub type Result<T> = std::result::Result<T, CrashlabError>;

/// A specialized `Result` type for protocol client operations.
pub type SimResult<T> = std::result::Result<T, SimulatorError>;
