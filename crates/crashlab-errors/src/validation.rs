//! Input validation error types.
//!
//! Raised for malformed command parameters, unknown scenarios, calls made in
//! the wrong session state, and damage payloads the pipeline cannot score.
//! These are surfaced immediately and never retried.

use core::fmt;

use crate::common::ErrorSeverity;

/// Validation error types.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    /// Value out of range
    #[error("{field} value {value} is out of range [{min}, {max}]")]
    OutOfRange {
        /// Field name
        field: String,
        /// The invalid value
        value: String,
        /// Minimum allowed value
        min: String,
        /// Maximum allowed value
        max: String,
    },

    /// Value is required but missing
    #[error("Required field '{0}' is missing")]
    Required(String),

    /// Invalid enum value
    #[error("Invalid value '{value}' for field '{field}', expected one of: {expected}")]
    InvalidEnumValue {
        /// Field name
        field: String,
        /// The invalid value
        value: String,
        /// Expected values
        expected: String,
    },

    /// No scenario is registered for the model/type pair
    #[error("Unknown scenario '{scenario}' for vehicle model '{model}'")]
    UnknownScenario {
        /// Vehicle model requested
        model: String,
        /// Scenario type requested
        scenario: String,
    },

    /// Operation not permitted in the current session state
    #[error("Cannot {operation} while session is {state}")]
    InvalidSessionState {
        /// Operation that was attempted
        operation: String,
        /// Current state name
        state: String,
    },

    /// Operation needs a session and none exists
    #[error("Cannot {0} without an active session")]
    NoActiveSession(String),

    /// A damage reading was below zero
    #[error("Component '{component}' has negative damage {value}")]
    NegativeDamage {
        /// Raw component key
        component: String,
        /// The offending reading
        value: f64,
    },

    /// A damage reading was NaN
    #[error("Component '{0}' has a non-numeric damage value")]
    NotANumber(String),

    /// Constraint violation
    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),
}

impl ValidationError {
    /// Get the error severity.
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            ValidationError::InvalidSessionState { .. } | ValidationError::NoActiveSession(_) => {
                ErrorSeverity::Warning
            }
            _ => ErrorSeverity::Error,
        }
    }

    /// Create an out of range error for a numeric value.
    pub fn out_of_range<T: fmt::Display>(
        field: impl Into<String>,
        value: T,
        min: T,
        max: T,
    ) -> Self {
        ValidationError::OutOfRange {
            field: field.into(),
            value: value.to_string(),
            min: min.to_string(),
            max: max.to_string(),
        }
    }

    /// Create a required field error.
    pub fn required(field: impl Into<String>) -> Self {
        ValidationError::Required(field.into())
    }

    /// Create an invalid enum value error.
    pub fn invalid_enum(
        field: impl Into<String>,
        value: impl Into<String>,
        expected: impl Into<String>,
    ) -> Self {
        ValidationError::InvalidEnumValue {
            field: field.into(),
            value: value.into(),
            expected: expected.into(),
        }
    }

    /// Create an unknown scenario error.
    pub fn unknown_scenario(model: impl Into<String>, scenario: impl Into<String>) -> Self {
        ValidationError::UnknownScenario {
            model: model.into(),
            scenario: scenario.into(),
        }
    }

    /// Create a wrong-state error.
    pub fn invalid_state(operation: impl Into<String>, state: impl fmt::Display) -> Self {
        ValidationError::InvalidSessionState {
            operation: operation.into(),
            state: state.to_string(),
        }
    }

    /// Create a constraint violation error.
    pub fn constraint(msg: impl Into<String>) -> Self {
        ValidationError::ConstraintViolation(msg.into())
    }
}
