//! Protocol client error types

use thiserror::Error;

use crate::common::{ErrorCategory, ErrorDisposition, ErrorSeverity};

/// Failures raised by the simulator protocol client.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SimulatorError {
    /// Establishing the connection failed (refused, unreachable or timed out)
    #[error("Connection to simulator at {addr} failed: {reason}")]
    ConnectionFailed {
        /// Address that was dialed
        addr: String,
        /// Why the attempt failed
        reason: String,
    },

    /// An established connection dropped while a command was outstanding
    #[error("Connection to simulator lost: {0}")]
    ConnectionLost(String),

    /// A command was issued while no connection is open
    #[error("Not connected to simulator")]
    NotConnected,

    /// A single command exceeded its deadline
    #[error("Command '{command}' timed out after {timeout_ms}ms")]
    CommandTimeout {
        /// Wire name of the command
        command: String,
        /// Deadline that elapsed
        timeout_ms: u64,
    },

    /// The simulator answered with `status: "error"`
    #[error("Simulator rejected '{command}': {message}")]
    CommandRejected {
        /// Wire name of the command
        command: String,
        /// Error text supplied by the simulator
        message: String,
    },

    /// A frame could not be decoded or did not match the expected reply
    #[error("Protocol error: {0}")]
    Protocol(String),
}

impl SimulatorError {
    /// Classify the error for callers.
    pub fn disposition(&self) -> ErrorDisposition {
        match self {
            SimulatorError::CommandTimeout { .. } => ErrorDisposition::Retry,
            SimulatorError::ConnectionFailed { .. }
            | SimulatorError::ConnectionLost(_)
            | SimulatorError::NotConnected => ErrorDisposition::Reconnect,
            SimulatorError::CommandRejected { .. } | SimulatorError::Protocol(_) => {
                ErrorDisposition::Fail
            }
        }
    }

    /// Error category for classification.
    pub fn category(&self) -> ErrorCategory {
        match self {
            SimulatorError::ConnectionFailed { .. }
            | SimulatorError::ConnectionLost(_)
            | SimulatorError::NotConnected => ErrorCategory::Connection,
            SimulatorError::CommandTimeout { .. } => ErrorCategory::Timeout,
            SimulatorError::CommandRejected { .. } => ErrorCategory::Simulator,
            SimulatorError::Protocol(_) => ErrorCategory::Protocol,
        }
    }

    /// Error severity level.
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            SimulatorError::CommandTimeout { .. } => ErrorSeverity::Warning,
            SimulatorError::CommandRejected { .. } | SimulatorError::NotConnected => {
                ErrorSeverity::Error
            }
            SimulatorError::ConnectionFailed { .. }
            | SimulatorError::ConnectionLost(_)
            | SimulatorError::Protocol(_) => ErrorSeverity::Critical,
        }
    }

    /// Check if the same command may simply be issued again
    pub fn is_retryable(&self) -> bool {
        self.disposition() == ErrorDisposition::Retry
    }

    /// Check if the caller must call `connect` again before anything else works
    pub fn needs_reconnect(&self) -> bool {
        self.disposition() == ErrorDisposition::Reconnect
    }

    /// Check if this error moves a live session into its error state
    pub fn is_session_fatal(&self) -> bool {
        matches!(
            self,
            SimulatorError::ConnectionFailed { .. }
                | SimulatorError::ConnectionLost(_)
                | SimulatorError::Protocol(_)
        )
    }

    /// Create a connect failure
    pub fn connection_failed(addr: impl Into<String>, reason: impl Into<String>) -> Self {
        SimulatorError::ConnectionFailed {
            addr: addr.into(),
            reason: reason.into(),
        }
    }

    /// Create a connection-lost error
    pub fn connection_lost(reason: impl Into<String>) -> Self {
        SimulatorError::ConnectionLost(reason.into())
    }

    /// Create a command timeout error
    pub fn timeout(command: impl Into<String>, timeout_ms: u64) -> Self {
        SimulatorError::CommandTimeout {
            command: command.into(),
            timeout_ms,
        }
    }

    /// Create a rejection error
    pub fn rejected(command: impl Into<String>, message: impl Into<String>) -> Self {
        SimulatorError::CommandRejected {
            command: command.into(),
            message: message.into(),
        }
    }

    /// Create a protocol error
    pub fn protocol(msg: impl Into<String>) -> Self {
        SimulatorError::Protocol(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_is_retryable() {
        let err = SimulatorError::timeout("ping", 1000);
        assert!(err.is_retryable());
        assert!(!err.needs_reconnect());
        assert!(!err.is_session_fatal());
        assert_eq!(err.to_string(), "Command 'ping' timed out after 1000ms");
    }

    #[test]
    fn test_connection_errors_need_reconnect() {
        for err in [
            SimulatorError::connection_failed("localhost:64256", "refused"),
            SimulatorError::connection_lost("eof"),
            SimulatorError::NotConnected,
        ] {
            assert!(err.needs_reconnect(), "{err}");
            assert_eq!(err.category(), ErrorCategory::Connection);
        }
    }

    #[test]
    fn test_rejection_is_not_session_fatal() {
        let err = SimulatorError::rejected("load_scenario", "map missing");
        assert_eq!(err.disposition(), ErrorDisposition::Fail);
        assert!(!err.is_session_fatal());

        let err = SimulatorError::protocol("bad frame");
        assert!(err.is_session_fatal());
        assert_eq!(err.severity(), ErrorSeverity::Critical);
    }
}
