//! Session lifecycle tracking for crashlab
//!
//! A simulation session moves through a small state machine:
//!
//! ```text
//! Initializing ──► Active ──► Crashed ──► Completed
//!      │              │          │
//!      └──────────────┴──────────┴──────► Error
//! ```
//!
//! `Completed` and `Error` are terminal. Both the command path (scenario load,
//! crash execution, session end) and the asynchronous event path (crash
//! notifications, sensor reports) mutate the same [`SessionTracker`], so
//! callers share it as a [`SharedSessionTracker`] and serialize through its
//! mutex.
//!
//! Crash notifications are kept in a bounded [`CrashEventLog`] that evicts the
//! oldest entry once full.
//!
//! # Example
//!
//! ```
//! use crashlab_session::prelude::*;
//!
//! let mut tracker = SessionTracker::new(SessionConfig::default());
//! let session_id = tracker.begin_load("tcross", "crash_test")?.id.clone();
//! tracker.confirm_loaded(None)?;
//! assert_eq!(tracker.state(), Some(SessionState::Active));
//!
//! tracker.mark_crashed(CrashRecord::from_reply(&session_id, Some(42.0)))?;
//! assert_eq!(tracker.state(), Some(SessionState::Crashed));
//! assert_eq!(tracker.crash_log().len(), 1);
//! # Ok::<(), crashlab_errors::ValidationError>(())
//! ```

#![deny(unsafe_op_in_unsafe_fn, clippy::unwrap_used)]
#![warn(missing_docs, rust_2018_idioms)]
#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod event_log;
pub mod prelude;
pub mod session;
pub mod state;
pub mod tracker;

use std::sync::Arc;

use parking_lot::Mutex;

pub use event_log::{CrashEventLog, CrashRecord, CrashSource, DEFAULT_EVENT_LOG_CAPACITY};
pub use session::Session;
pub use state::{SessionState, SessionStateEvent, SessionStateReceiver, SessionStateSender};
pub use tracker::{SessionConfig, SessionTracker};

/// A tracker shared between the command path and the event path.
pub type SharedSessionTracker = Arc<Mutex<SessionTracker>>;

/// Wrap a tracker for sharing.
pub fn shared(tracker: SessionTracker) -> SharedSessionTracker {
    Arc::new(Mutex::new(tracker))
}
