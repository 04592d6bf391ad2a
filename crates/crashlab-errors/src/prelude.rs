//! Prelude module for convenient error handling imports.
//!
//! ```
//! use crashlab_errors::prelude::*;
//!
//! fn require_model(model: &str) -> Result<&str> {
//!     if model.is_empty() {
//!         return Err(ValidationError::required("vehicle_model").into());
//!     }
//!     Ok(model)
//! }
//! # assert!(require_model("").is_err());
//! ```

pub use crate::{
    Result, SimResult,
    common::{
        CrashlabError, ErrorCategory, ErrorContext, ErrorDisposition, ErrorSeverity, ResultExt,
    },
    simulator::SimulatorError,
    validation::ValidationError,
};

/// Macro for creating an error context with key/value pairs.
///
/// ```
/// use crashlab_errors::error_context;
///
/// let ctx = error_context!("load_scenario", "model" => "tcross");
/// assert_eq!(ctx.to_string(), "load_scenario, model: tcross");
/// ```
#[macro_export]
macro_rules! error_context {
    ($operation:expr $(, $key:expr => $value:expr)* $(,)?) => {
        {
            let mut ctx = $crate::ErrorContext::new($operation);
            $(
                ctx = ctx.with($key, $value);
            )*
            ctx
        }
    };
}
