//! Typed command and reply payloads
//!
//! Every command the simulator understands is a variant of [`Command`]; every
//! successful answer is decoded into a [`Reply`] before it leaves the client,
//! so nothing downstream inspects untyped JSON.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Wire name and reply shape of a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandKind {
    /// Liveness probe
    Ping,
    /// Load a crash scenario and spawn the vehicle
    LoadScenario,
    /// Drive the vehicle into the target
    ExecuteCrash,
    /// Read per-component damage
    GetDamageData,
    /// Read position, velocity and orientation
    GetVehicleState,
    /// Begin streaming sensor updates
    StartTelemetry,
    /// Stop streaming sensor updates
    StopTelemetry,
    /// Tear down the scenario
    CleanupScenario,
}

impl CommandKind {
    /// All command kinds, in wire-table order.
    pub const ALL: [CommandKind; 8] = [
        CommandKind::Ping,
        CommandKind::LoadScenario,
        CommandKind::ExecuteCrash,
        CommandKind::GetDamageData,
        CommandKind::GetVehicleState,
        CommandKind::StartTelemetry,
        CommandKind::StopTelemetry,
        CommandKind::CleanupScenario,
    ];

    /// Name used in the `command` field
    pub fn as_str(&self) -> &'static str {
        match self {
            CommandKind::Ping => "ping",
            CommandKind::LoadScenario => "load_scenario",
            CommandKind::ExecuteCrash => "execute_crash",
            CommandKind::GetDamageData => "get_damage_data",
            CommandKind::GetVehicleState => "get_vehicle_state",
            CommandKind::StartTelemetry => "start_telemetry",
            CommandKind::StopTelemetry => "stop_telemetry",
            CommandKind::CleanupScenario => "cleanup_scenario",
        }
    }

    /// Look a kind up by wire name
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.as_str() == name)
    }
}

impl fmt::Display for CommandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Payload of a command that carries no parameters; encodes as `{}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NoParams {}

/// A command addressed to a single session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionRef {
    /// Session the command applies to
    pub session_id: String,
}

/// Vehicle placement inside a scenario.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VehicleSpec {
    /// Vehicle model identifier
    pub model: String,
    /// Spawn position (x, y, z)
    pub position: [f64; 3],
    /// Spawn orientation quaternion (x, y, z, w)
    pub rotation: [f64; 4],
    /// License plate text
    pub license: String,
}

/// Full scenario description sent with `load_scenario`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioConfig {
    /// Scenario name known to the simulator
    pub name: String,
    /// Map / level name
    pub map: String,
    /// Vehicle to spawn
    pub vehicle: VehicleSpec,
    /// Sensors to attach to the vehicle
    pub sensors: Vec<String>,
    /// Session this scenario belongs to
    pub session_id: String,
}

/// `load_scenario` payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoadScenario {
    /// The scenario to load
    pub scenario_config: ScenarioConfig,
}

/// Kind of collision to stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CrashType {
    /// Head-on into the target
    Frontal,
    /// Struck from behind
    Rear,
    /// Side impact
    Side,
    /// Vehicle rolls over
    Rollover,
    /// Partial-overlap frontal impact
    Offset,
}

impl CrashType {
    /// Wire name
    pub fn as_str(&self) -> &'static str {
        match self {
            CrashType::Frontal => "frontal",
            CrashType::Rear => "rear",
            CrashType::Side => "side",
            CrashType::Rollover => "rollover",
            CrashType::Offset => "offset",
        }
    }
}

impl fmt::Display for CrashType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for CrashType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "frontal" => Ok(CrashType::Frontal),
            "rear" => Ok(CrashType::Rear),
            "side" => Ok(CrashType::Side),
            "rollover" => Ok(CrashType::Rollover),
            "offset" => Ok(CrashType::Offset),
            other => Err(format!(
                "unknown crash type '{other}', expected one of: frontal, rear, side, rollover, offset"
            )),
        }
    }
}

/// `execute_crash` payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecuteCrash {
    /// Session to crash
    pub session_id: String,
    /// Kind of collision
    pub crash_type: CrashType,
    /// Impact speed in km/h
    pub speed: f64,
    /// Approach angle in degrees
    pub angle: f64,
    /// Object to collide with
    pub target: String,
    /// Let the simulator's AI drive
    pub automated: bool,
}

/// `get_damage_data` payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DamageQuery {
    /// Session to query
    pub session_id: String,
    /// Request per-component detail
    pub include_details: bool,
}

/// `start_telemetry` payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StartTelemetry {
    /// Session to stream
    pub session_id: String,
    /// Update rate in Hz
    pub frequency: u32,
}

/// A command with its parameters.
///
/// Serializes adjacently tagged, i.e. `{"command": "...", "data": {...}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "command", content = "data", rename_all = "snake_case")]
pub enum Command {
    /// Liveness probe
    Ping(NoParams),
    /// Load a scenario
    LoadScenario(LoadScenario),
    /// Stage the collision
    ExecuteCrash(ExecuteCrash),
    /// Read damage
    GetDamageData(DamageQuery),
    /// Read vehicle state
    GetVehicleState(SessionRef),
    /// Start streaming
    StartTelemetry(StartTelemetry),
    /// Stop streaming
    StopTelemetry(SessionRef),
    /// Tear down
    CleanupScenario(SessionRef),
}

impl Command {
    /// Liveness probe
    pub fn ping() -> Self {
        Command::Ping(NoParams::default())
    }

    /// Kind of this command
    pub fn kind(&self) -> CommandKind {
        match self {
            Command::Ping(_) => CommandKind::Ping,
            Command::LoadScenario(_) => CommandKind::LoadScenario,
            Command::ExecuteCrash(_) => CommandKind::ExecuteCrash,
            Command::GetDamageData(_) => CommandKind::GetDamageData,
            Command::GetVehicleState(_) => CommandKind::GetVehicleState,
            Command::StartTelemetry(_) => CommandKind::StartTelemetry,
            Command::StopTelemetry(_) => CommandKind::StopTelemetry,
            Command::CleanupScenario(_) => CommandKind::CleanupScenario,
        }
    }

    /// Rebuild a typed command from its wire name and data object
    pub fn from_parts(name: &str, data: Value) -> Result<Self, serde_json::Error> {
        let mut object = serde_json::Map::new();
        object.insert("command".to_string(), Value::String(name.to_string()));
        object.insert("data".to_string(), data);
        serde_json::from_value(Value::Object(object))
    }
}

/// Outcome field of a response frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseStatus {
    /// Command succeeded; `data` carries the reply
    Success,
    /// Command failed; `error` carries the reason
    Error,
}

/// A response frame, before its payload is decoded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    /// Correlation id echoed from the command
    pub id: String,
    /// Outcome
    pub status: ResponseStatus,
    /// Reply payload on success
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    /// Reason on failure
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Reply to `load_scenario`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScenarioLoaded {
    /// Session id as acknowledged by the simulator
    #[serde(default)]
    pub session_id: Option<String>,
}

/// Reply to `execute_crash`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CrashOutcome {
    /// Whether the simulator registered a collision
    #[serde(default)]
    pub crash_detected: bool,
    /// Peak impact force, if measured
    #[serde(default)]
    pub impact_force: Option<f64>,
}

/// One raw damage reading: a bare number or a `{damage}` object.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawDamageValue {
    /// Plain numeric reading
    Scalar(f64),
    /// Reading nested in an object
    Detailed {
        /// The reading
        damage: f64,
    },
}

impl RawDamageValue {
    /// The numeric reading, however it was encoded
    pub fn level(&self) -> f64 {
        match self {
            RawDamageValue::Scalar(value) => *value,
            RawDamageValue::Detailed { damage } => *damage,
        }
    }
}

impl From<f64> for RawDamageValue {
    fn from(value: f64) -> Self {
        RawDamageValue::Scalar(value)
    }
}

/// Reply to `get_damage_data`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DamageData {
    /// Vendor component key to reading
    #[serde(default)]
    pub components: BTreeMap<String, RawDamageValue>,
    /// Aggregate damage reported by the simulator
    #[serde(default)]
    pub total_damage: Option<f64>,
    /// Whether the simulator has seen a collision
    #[serde(default)]
    pub crash_detected: Option<bool>,
}

/// Reply to `get_vehicle_state`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VehicleState {
    /// Position (x, y, z)
    #[serde(default)]
    pub position: [f64; 3],
    /// Velocity vector in m/s
    #[serde(default)]
    pub velocity: [f64; 3],
    /// Orientation quaternion (x, y, z, w)
    #[serde(default = "identity_rotation")]
    pub rotation: [f64; 4],
    /// Acceleration vector, if reported
    #[serde(default)]
    pub acceleration: Option<[f64; 3]>,
    /// Engine running flag, if reported
    #[serde(default)]
    pub engine_running: Option<bool>,
    /// Fuel level in [0, 1], if reported
    #[serde(default)]
    pub fuel_level: Option<f64>,
}

fn identity_rotation() -> [f64; 4] {
    [0.0, 0.0, 0.0, 1.0]
}

/// A successful reply, decoded according to the command that requested it.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    /// `ping`
    Pong,
    /// `load_scenario`
    ScenarioLoaded(ScenarioLoaded),
    /// `execute_crash`
    Crash(CrashOutcome),
    /// `get_damage_data`
    Damage(DamageData),
    /// `get_vehicle_state`
    VehicleState(VehicleState),
    /// `start_telemetry`, `stop_telemetry`, `cleanup_scenario`
    Ack(CommandKind),
}

impl Reply {
    /// Decode a success payload for the given command kind.
    ///
    /// A missing payload is treated as `{}`.
    pub fn decode(kind: CommandKind, data: Option<Value>) -> Result<Self, serde_json::Error> {
        let data = data.unwrap_or_else(|| Value::Object(serde_json::Map::new()));
        Ok(match kind {
            CommandKind::Ping => Reply::Pong,
            CommandKind::LoadScenario => Reply::ScenarioLoaded(serde_json::from_value(data)?),
            CommandKind::ExecuteCrash => Reply::Crash(serde_json::from_value(data)?),
            CommandKind::GetDamageData => Reply::Damage(serde_json::from_value(data)?),
            CommandKind::GetVehicleState => Reply::VehicleState(serde_json::from_value(data)?),
            CommandKind::StartTelemetry
            | CommandKind::StopTelemetry
            | CommandKind::CleanupScenario => Reply::Ack(kind),
        })
    }

    /// Name of the variant, for error messages
    pub fn describe(&self) -> &'static str {
        match self {
            Reply::Pong => "pong",
            Reply::ScenarioLoaded(_) => "scenario_loaded",
            Reply::Crash(_) => "crash",
            Reply::Damage(_) => "damage",
            Reply::VehicleState(_) => "vehicle_state",
            Reply::Ack(_) => "ack",
        }
    }
}
