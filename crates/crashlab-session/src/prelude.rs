//! Prelude module for convenient imports

pub use crate::event_log::{CrashEventLog, CrashRecord, CrashSource};
pub use crate::session::Session;
pub use crate::state::{SessionState, SessionStateEvent};
pub use crate::tracker::{SessionConfig, SessionTracker};
pub use crate::{SharedSessionTracker, shared};
