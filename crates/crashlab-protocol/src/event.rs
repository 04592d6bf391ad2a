//! Asynchronous simulator events and the sink that receives them
//!
//! Frames without a correlation id are pushed by the simulator on its own
//! schedule. The receive loop decodes them and hands them to an
//! [`EventSink`] synchronously, so sinks must never block.

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Collision notification pushed by the simulator.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CrashEvent {
    /// Session the crash happened in
    #[serde(default)]
    pub session_id: Option<String>,
    /// Simulation time of the impact, in seconds
    #[serde(default)]
    pub timestamp: Option<f64>,
    /// Peak impact force, if measured
    #[serde(default)]
    pub impact_force: Option<f64>,
}

/// Damage reading for one part, as reported by an in-simulator sensor mod.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartDamage {
    /// Vendor part name
    pub name: String,
    /// Vendor part identifier
    #[serde(rename = "partId")]
    pub part_id: String,
    /// Damage level in [0, 1]
    pub damage: f64,
}

/// Damage block of a sensor report.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SensorDamage {
    /// Aggregate damage in [0, 1]
    pub total_damage: f64,
    /// Aggregate damage at the previous report
    #[serde(default)]
    pub previous_damage: f64,
    /// Change since the previous report
    #[serde(default)]
    pub damage_delta: f64,
    /// Per-part readings
    #[serde(default)]
    pub parts: Vec<PartDamage>,
}

/// Periodic sensor report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorReport {
    /// Vehicle identity
    #[serde(alias = "vehicleId")]
    pub vehicle_id: String,
    /// Position (x, y, z)
    #[serde(default)]
    pub position: [f64; 3],
    /// Velocity vector in m/s
    #[serde(default)]
    pub velocity: [f64; 3],
    /// Orientation quaternion (x, y, z, w)
    #[serde(default)]
    pub rotation: [f64; 4],
    /// Damage readings
    pub damage: SensorDamage,
}

/// Event frame, tagged by its `type` field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SimulatorEvent {
    /// The simulator registered a collision
    CrashDetected(CrashEvent),
    /// A sensor report arrived
    SensorUpdate(SensorReport),
}

impl SimulatorEvent {
    /// Event `type` values this client decodes.
    pub const KINDS: [&'static str; 2] = ["crash_detected", "sensor_update"];

    /// Whether `kind` names one of [`Self::KINDS`].
    pub fn is_known_kind(kind: &str) -> bool {
        Self::KINDS.contains(&kind)
    }
}

/// Receiver of asynchronous events from the receive loop.
///
/// Called on the receive task; implementations must return promptly.
pub trait EventSink: Send + Sync + 'static {
    /// A decoded event arrived
    fn on_event(&self, event: SimulatorEvent);

    /// The connection dropped underneath the client
    fn on_disconnect(&self, reason: &str) {
        debug!(reason, "Simulator connection closed");
    }

    /// A frame that belongs to no caller could not be decoded
    fn on_protocol_error(&self, reason: &str) {
        debug!(reason, "Unattributed protocol error");
    }
}

/// Sink that only logs.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingSink;

impl EventSink for LoggingSink {
    fn on_event(&self, event: SimulatorEvent) {
        debug!(?event, "Simulator event");
    }
}

/// Sink that forwards events into a bounded channel, dropping when full.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::Sender<SimulatorEvent>,
}

impl ChannelSink {
    /// Create a sink and the receiver it feeds
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<SimulatorEvent>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { tx }, rx)
    }
}

impl EventSink for ChannelSink {
    fn on_event(&self, event: SimulatorEvent) {
        if let Err(e) = self.tx.try_send(event) {
            warn!(error = %e, "Dropping simulator event");
        }
    }
}
