//! Prelude module for convenient imports

pub use crate::client::ProtocolClient;
pub use crate::config::{ClientBuilder, ClientConfig};
pub use crate::error::{SimResult, SimulatorError};
pub use crate::event::{EventSink, SensorReport, SimulatorEvent};
pub use crate::wire::{Command, CommandKind, CrashType, ExecuteCrash, Reply, ScenarioConfig};
