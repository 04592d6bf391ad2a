//! Common error types and utilities used across all crashlab crates.
//!
//! This module provides the top-level error enum that wraps the sub-errors,
//! along with classification, severity levels, and context helpers.

use core::fmt;

use crate::{SimulatorError, ValidationError};

/// Top-level error type for the simulator service and pipeline.
#[derive(Debug, thiserror::Error)]
pub enum CrashlabError {
    /// Protocol client errors
    #[error("Simulator error: {0}")]
    Simulator(#[from] SimulatorError),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// The session is live but the simulator has no damage data for it yet
    #[error("Telemetry unavailable for session {session_id}: no damage recorded yet")]
    TelemetryUnavailable {
        /// Session that was queried
        session_id: String,
    },

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[source] std::io::Error),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// An error annotated with the operation that produced it
    #[error("{context}: {source}")]
    Context {
        /// Where the error happened
        context: ErrorContext,
        /// The underlying error
        #[source]
        source: Box<CrashlabError>,
    },
}

impl CrashlabError {
    /// Get the error category for classification.
    pub fn category(&self) -> ErrorCategory {
        match self {
            CrashlabError::Simulator(e) => e.category(),
            CrashlabError::Validation(_) => ErrorCategory::Validation,
            CrashlabError::TelemetryUnavailable { .. } => ErrorCategory::Telemetry,
            CrashlabError::Io(_) => ErrorCategory::Io,
            CrashlabError::Config(_) => ErrorCategory::Config,
            CrashlabError::Context { source, .. } => source.category(),
        }
    }

    /// Get the error severity level.
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            CrashlabError::Simulator(e) => e.severity(),
            CrashlabError::Validation(e) => e.severity(),
            CrashlabError::TelemetryUnavailable { .. } => ErrorSeverity::Info,
            CrashlabError::Io(_) | CrashlabError::Config(_) => ErrorSeverity::Error,
            CrashlabError::Context { source, .. } => source.severity(),
        }
    }

    /// What the caller should do about this error.
    pub fn disposition(&self) -> ErrorDisposition {
        match self {
            CrashlabError::Simulator(e) => e.disposition(),
            CrashlabError::Validation(_) => ErrorDisposition::InvalidInput,
            CrashlabError::TelemetryUnavailable { .. } => ErrorDisposition::Retry,
            CrashlabError::Io(_) | CrashlabError::Config(_) => ErrorDisposition::Fail,
            CrashlabError::Context { source, .. } => source.disposition(),
        }
    }

    /// Check if retrying the same operation may succeed.
    pub fn is_retryable(&self) -> bool {
        self.disposition() == ErrorDisposition::Retry
    }

    /// Check if the caller must reconnect first.
    pub fn needs_reconnect(&self) -> bool {
        self.disposition() == ErrorDisposition::Reconnect
    }

    /// Check if the input was at fault.
    pub fn is_invalid_input(&self) -> bool {
        self.disposition() == ErrorDisposition::InvalidInput
    }

    /// Check if this error is recoverable.
    pub fn is_recoverable(&self) -> bool {
        self.severity() < ErrorSeverity::Critical
    }

    /// Strip any context wrappers.
    pub fn root(&self) -> &CrashlabError {
        match self {
            CrashlabError::Context { source, .. } => source.root(),
            other => other,
        }
    }

    /// Create a configuration error with a message.
    pub fn config(msg: impl Into<String>) -> Self {
        CrashlabError::Config(msg.into())
    }

    /// Create a telemetry-unavailable error.
    pub fn telemetry_unavailable(session_id: impl Into<String>) -> Self {
        CrashlabError::TelemetryUnavailable {
            session_id: session_id.into(),
        }
    }
}

impl From<std::io::Error> for CrashlabError {
    fn from(e: std::io::Error) -> Self {
        CrashlabError::Io(e)
    }
}

/// Error category for classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ErrorCategory {
    /// Connect failures and dropped connections
    Connection = 0,
    /// Per-command deadlines
    Timeout = 1,
    /// Damage data not yet available
    Telemetry = 2,
    /// Validation errors
    Validation = 3,
    /// Malformed frames
    Protocol = 4,
    /// Errors reported by the simulator itself
    Simulator = 5,
    /// Configuration errors
    Config = 6,
    /// I/O errors
    Io = 7,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorCategory::Connection => write!(f, "Connection"),
            ErrorCategory::Timeout => write!(f, "Timeout"),
            ErrorCategory::Telemetry => write!(f, "Telemetry"),
            ErrorCategory::Validation => write!(f, "Validation"),
            ErrorCategory::Protocol => write!(f, "Protocol"),
            ErrorCategory::Simulator => write!(f, "Simulator"),
            ErrorCategory::Config => write!(f, "Config"),
            ErrorCategory::Io => write!(f, "IO"),
        }
    }
}

/// Error severity level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum ErrorSeverity {
    /// Informational, no action required
    Info = 0,
    /// Warning, may require attention
    Warning = 1,
    /// Error, operation failed
    Error = 2,
    /// Critical, the connection or session is unusable
    Critical = 3,
}

impl fmt::Display for ErrorSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorSeverity::Info => write!(f, "INFO"),
            ErrorSeverity::Warning => write!(f, "WARN"),
            ErrorSeverity::Error => write!(f, "ERROR"),
            ErrorSeverity::Critical => write!(f, "CRITICAL"),
        }
    }
}

/// What a caller is expected to do with an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorDisposition {
    /// Issue the same operation again
    Retry,
    /// Reconnect before issuing anything else
    Reconnect,
    /// Fix the input; retrying unchanged will fail again
    InvalidInput,
    /// Nothing the caller can do automatically
    Fail,
}

impl fmt::Display for ErrorDisposition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorDisposition::Retry => write!(f, "retry"),
            ErrorDisposition::Reconnect => write!(f, "reconnect"),
            ErrorDisposition::InvalidInput => write!(f, "invalid_input"),
            ErrorDisposition::Fail => write!(f, "fail"),
        }
    }
}

/// Context information for errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorContext {
    /// The operation that was being performed
    pub operation: String,
    /// Additional context key-value pairs
    pub context: Vec<(String, String)>,
}

impl ErrorContext {
    /// Create a new error context for an operation.
    pub fn new(operation: impl Into<String>) -> Self {
        Self {
            operation: operation.into(),
            context: Vec::new(),
        }
    }

    /// Add a context key-value pair.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.push((key.into(), value.into()));
        self
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.operation)?;
        for (key, value) in &self.context {
            write!(f, ", {key}: {value}")?;
        }
        Ok(())
    }
}

/// Extension trait for adding context to errors.
///
/// Unlike flattening into a string, the wrapped error keeps its
/// classification, so `disposition()` still answers correctly.
pub trait ResultExt<T> {
    /// Add context to an error.
    fn context(self, ctx: ErrorContext) -> Result<T, CrashlabError>;

    /// Add context with an operation name.
    fn with_context(self, operation: impl Into<String>) -> Result<T, CrashlabError>;
}

impl<T, E: Into<CrashlabError>> ResultExt<T> for std::result::Result<T, E> {
    fn context(self, ctx: ErrorContext) -> Result<T, CrashlabError> {
        self.map_err(|e| CrashlabError::Context {
            context: ctx,
            source: Box::new(e.into()),
        })
    }

    fn with_context(self, operation: impl Into<String>) -> Result<T, CrashlabError> {
        self.context(ErrorContext::new(operation))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_category_display() {
        assert_eq!(ErrorCategory::Connection.to_string(), "Connection");
        assert_eq!(ErrorCategory::Io.to_string(), "IO");
    }

    #[test]
    fn test_error_severity_ordering() {
        assert!(ErrorSeverity::Critical > ErrorSeverity::Error);
        assert!(ErrorSeverity::Error > ErrorSeverity::Warning);
        assert!(ErrorSeverity::Warning > ErrorSeverity::Info);
    }

    #[test]
    fn test_context_keeps_disposition() {
        let result: std::result::Result<(), SimulatorError> =
            Err(SimulatorError::timeout("get_damage_data", 10_000));
        let err = match result.context(ErrorContext::new("extract telemetry").with("session", "s1"))
        {
            Ok(()) => return,
            Err(e) => e,
        };
        assert!(err.is_retryable());
        assert_eq!(err.category(), ErrorCategory::Timeout);
        assert!(err.to_string().starts_with("extract telemetry, session: s1: "));
        assert!(matches!(err.root(), CrashlabError::Simulator(_)));
    }

    #[test]
    fn test_telemetry_unavailable_is_info() {
        let err = CrashlabError::telemetry_unavailable("s1");
        assert_eq!(err.severity(), ErrorSeverity::Info);
        assert!(err.is_recoverable());
        assert!(err.is_retryable());
    }

    #[test]
    fn test_crashlab_error_is_std_error() {
        let err: CrashlabError = ValidationError::required("model").into();
        let _: &dyn std::error::Error = &err;
        assert!(err.is_invalid_input());
    }
}
