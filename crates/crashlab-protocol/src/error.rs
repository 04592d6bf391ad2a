//! Protocol client error types
//!
//! The taxonomy lives in `crashlab-errors` so the service layer can wrap it
//! without depending on the client internals.

pub use crashlab_errors::{ErrorDisposition, SimResult, SimulatorError};
