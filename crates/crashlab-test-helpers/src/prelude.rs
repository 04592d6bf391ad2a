//! Convenience re-exports for common test utilities.
//!
//! ```rust,ignore
//! use crashlab_test_helpers::prelude::*;
//! ```

pub use crate::must::{must, must_err, must_some, must_with};

#[cfg(feature = "mock")]
pub use crate::must::{must_async, must_within};

#[cfg(feature = "mock")]
pub use crate::simulator::{MockReply, MockSimulator, ReceivedCommand, SimulatorScript};

#[cfg(feature = "fixtures")]
pub use crate::fixtures::{
    crash_event, frontal_components, rear_bump_components, sensor_update_event,
    severe_frontal_components,
};

pub use crate::{assert_approx_eq, assert_in_range, assert_sorted_desc};

/// Result type for tests that use `?`.
pub type TestResult = Result<(), Box<dyn std::error::Error>>;
