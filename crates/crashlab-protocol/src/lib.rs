//! Crash simulator protocol client
//!
//! This crate speaks the simulator's command/response protocol: newline
//! delimited JSON objects over one persistent TCP connection.
//!
//! # Architecture
//!
//! - [`wire`]: typed commands, replies and their payloads
//! - [`event`]: asynchronous event frames and the [`EventSink`] seam
//! - [`codec`]: frame encoding, classification and size limits
//! - [`client`]: the correlating [`ProtocolClient`]
//! - [`config`]: client configuration and builder
//!
//! # Wire format
//!
//! ```text
//! -> {"id": "<uuid>", "command": "get_damage_data", "data": {"session_id": "...", "include_details": true}}
//! <- {"id": "<uuid>", "status": "success", "data": {"components": {"bumper_F": 0.85}}}
//! <- {"type": "crash_detected", "impact_force": 41.2}
//! ```
//!
//! # Example
//!
//! ```no_run
//! use crashlab_protocol::prelude::*;
//!
//! async fn probe() -> Result<(), SimulatorError> {
//!     let client = ProtocolClient::new(ClientBuilder::new().address("localhost", 64256).build());
//!     client.connect().await?;
//!     let rtt = client.ping().await?;
//!     println!("simulator answered in {rtt:?}");
//!     client.disconnect().await;
//!     Ok(())
//! }
//! ```

#![deny(unsafe_op_in_unsafe_fn, clippy::unwrap_used)]
#![warn(missing_docs, rust_2018_idioms)]
#![cfg_attr(docsrs, feature(doc_cfg))]

use std::time::Duration;

pub mod client;
pub mod codec;
pub mod config;
pub mod error;
pub mod event;
pub mod prelude;
pub mod wire;

pub use client::{PendingCommand, ProtocolClient};
pub use codec::{FrameCodec, InboundFrame};
pub use config::{ClientBuilder, ClientConfig};
pub use error::{SimResult, SimulatorError};
pub use event::{
    ChannelSink, CrashEvent, EventSink, LoggingSink, PartDamage, SensorDamage, SensorReport,
    SimulatorEvent,
};
pub use wire::{
    Command, CommandKind, CrashOutcome, CrashType, DamageData, ExecuteCrash, RawDamageValue,
    Reply, ScenarioConfig, ScenarioLoaded, VehicleSpec, VehicleState,
};

/// Default simulator port
pub const DEFAULT_PORT: u16 = 64256;

/// Deadline for commands that do not specify one
pub const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(10);

/// Deadline for `execute_crash`, which runs the physics until impact
pub const DEFAULT_CRASH_TIMEOUT: Duration = Duration::from_secs(30);
