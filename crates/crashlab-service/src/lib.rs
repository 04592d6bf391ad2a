//! Crash simulation service for crashlab
//!
//! [`SimulatorService`] owns one protocol client and one session tracker and
//! drives a crash test end to end:
//!
//! ```text
//! connect ─► load_scenario ─► execute_crash ─► assess ─► end_session
//!                                                 │
//!                             extract_telemetry ──┼── analyze_damage ── estimate_repair
//! ```
//!
//! Simulator events reach the same tracker through [`SessionEventSink`], so a
//! crash notification or a sensor damage jump marks the session `Crashed`
//! even between commands. Losing the connection or receiving a malformed
//! frame moves a live session to `Error`.
//!
//! Configuration comes from YAML ([`ServiceConfig`]) with `CRASHLAB_*`
//! environment overrides, and [`init_logging`] installs the tracing
//! subscriber.
//!
//! # Example
//!
//! ```no_run
//! use crashlab_service::prelude::*;
//!
//! # async fn run() -> crashlab_errors::Result<()> {
//! let service = SimulatorService::new(ServiceConfig::from_env()?);
//! service.connect().await?;
//! service.load_scenario("tcross", "crash_test").await?;
//! service.execute_crash(&CrashParams::default()).await?;
//! let assessment = service.assess().await?;
//! println!("{}", assessment.estimate.pre_tax_total);
//! service.disconnect().await;
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_op_in_unsafe_fn, clippy::unwrap_used)]
#![warn(missing_docs, rust_2018_idioms)]
#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod config;
pub mod logging;
pub mod prelude;
pub mod scenario;
pub mod service;
pub mod sink;

pub use config::{EstimatorSettings, LoggingSettings, ServiceConfig, SimulatorSettings};
pub use logging::{LogFormat, env_filter, init_logging};
pub use scenario::{
    CrashParams, MAX_CRASH_SPEED_KMH, SCENARIO_MAP, SCENARIOS, ScenarioPreset, TEST_LICENSE,
    TEST_SENSORS,
};
pub use service::{Assessment, HealthStatus, OFFLINE_SESSION_ID, SimulatorService};
pub use sink::{SensorSlot, SessionEventSink, reports_for};
