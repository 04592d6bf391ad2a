//! Prelude module for convenient imports

pub use crate::config::ServiceConfig;
pub use crate::logging::{LogFormat, init_logging};
pub use crate::scenario::{CrashParams, ScenarioPreset};
pub use crate::service::{Assessment, HealthStatus, SimulatorService};
pub use crate::sink::SessionEventSink;
