//! Known crash test scenarios and crash parameters.

use serde::{Deserialize, Serialize};

use crashlab_errors::ValidationError;
use crashlab_protocol::{CrashType, ExecuteCrash, ScenarioConfig, VehicleSpec};

/// Map every scenario runs on.
pub const SCENARIO_MAP: &str = "west_coast_usa";

/// License plate fitted to every test vehicle.
pub const TEST_LICENSE: &str = "VW-MODEL";

/// Sensors attached to every test vehicle.
pub const TEST_SENSORS: [&str; 3] = ["damage", "electrics", "gforces"];

/// Highest accepted impact speed in km/h.
pub const MAX_CRASH_SPEED_KMH: f64 = 200.0;

/// A scenario the simulator ships with.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScenarioPreset {
    /// Vehicle model key
    pub vehicle_model: &'static str,
    /// Scenario type key
    pub scenario_type: &'static str,
    /// Scenario name known to the simulator
    pub name: &'static str,
    /// Spawn position (x, y, z)
    pub position: [f64; 3],
    /// Spawn orientation quaternion (x, y, z, w)
    pub rotation: [f64; 4],
}

/// All known scenarios.
pub const SCENARIOS: &[ScenarioPreset] = &[
    ScenarioPreset {
        vehicle_model: "tcross",
        scenario_type: "crash_test",
        name: "vw_tcross_crash_test_v2",
        position: [-717.0, 101.0, 118.0],
        rotation: [0.0, 0.0, 0.382_683_4, 0.923_879_5],
    },
    ScenarioPreset {
        vehicle_model: "golf",
        scenario_type: "crash_test",
        name: "vw_golf_crash_test_v2",
        position: [-500.0, 200.0, 120.0],
        rotation: [0.0, 0.0, 0.0, 1.0],
    },
];

impl ScenarioPreset {
    /// Find the preset for a model and scenario type.
    ///
    /// # Errors
    ///
    /// `UnknownScenario` for combinations not in [`SCENARIOS`].
    pub fn find(vehicle_model: &str, scenario_type: &str) -> Result<&'static Self, ValidationError> {
        SCENARIOS
            .iter()
            .find(|p| p.vehicle_model == vehicle_model && p.scenario_type == scenario_type)
            .ok_or_else(|| ValidationError::unknown_scenario(vehicle_model, scenario_type))
    }

    /// Scenario description for `load_scenario`.
    pub fn scenario_config(&self, session_id: &str) -> ScenarioConfig {
        ScenarioConfig {
            name: self.name.to_string(),
            map: SCENARIO_MAP.to_string(),
            vehicle: VehicleSpec {
                model: self.vehicle_model.to_string(),
                position: self.position,
                rotation: self.rotation,
                license: TEST_LICENSE.to_string(),
            },
            sensors: TEST_SENSORS.iter().map(|s| (*s).to_string()).collect(),
            session_id: session_id.to_string(),
        }
    }
}

/// How to stage the collision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CrashParams {
    /// Kind of collision
    pub crash_type: CrashType,
    /// Impact speed in km/h
    pub speed_kmh: f64,
    /// Approach angle in degrees
    pub angle_deg: f64,
    /// Object to collide with
    pub target: String,
    /// Let the simulator's AI drive
    pub automated: bool,
}

impl Default for CrashParams {
    fn default() -> Self {
        Self {
            crash_type: CrashType::Frontal,
            speed_kmh: 50.0,
            angle_deg: 0.0,
            target: "barrier".to_string(),
            automated: true,
        }
    }
}

impl CrashParams {
    /// Check speed, angle and target.
    ///
    /// # Errors
    ///
    /// `OutOfRange` for speed outside `0..=200` or angle outside `0..=360`
    /// (NaN included), `Required` for an empty target.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if !(0.0..=MAX_CRASH_SPEED_KMH).contains(&self.speed_kmh) {
            return Err(ValidationError::out_of_range(
                "speed_kmh",
                self.speed_kmh,
                0.0,
                MAX_CRASH_SPEED_KMH,
            ));
        }
        if !(0.0..=360.0).contains(&self.angle_deg) {
            return Err(ValidationError::out_of_range(
                "angle_deg",
                self.angle_deg,
                0.0,
                360.0,
            ));
        }
        if self.target.trim().is_empty() {
            return Err(ValidationError::required("target"));
        }
        Ok(())
    }

    /// `execute_crash` payload for a session.
    pub fn to_command(&self, session_id: &str) -> ExecuteCrash {
        ExecuteCrash {
            session_id: session_id.to_string(),
            crash_type: self.crash_type,
            speed: self.speed_kmh,
            angle: self.angle_deg,
            target: self.target.clone(),
            automated: self.automated,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_scenarios() -> Result<(), ValidationError> {
        let tcross = ScenarioPreset::find("tcross", "crash_test")?;
        assert_eq!(tcross.name, "vw_tcross_crash_test_v2");
        let config = ScenarioPreset::find("golf", "crash_test")?.scenario_config("s1");
        assert_eq!(config.map, "west_coast_usa");
        assert_eq!(config.vehicle.license, "VW-MODEL");
        assert_eq!(config.sensors, vec!["damage", "electrics", "gforces"]);
        assert_eq!(config.session_id, "s1");
        Ok(())
    }

    #[test]
    fn test_unknown_scenario() {
        assert_eq!(
            ScenarioPreset::find("polo", "crash_test"),
            Err(ValidationError::unknown_scenario("polo", "crash_test"))
        );
        assert!(ScenarioPreset::find("tcross", "rollover_test").is_err());
    }

    #[test]
    fn test_crash_params_bounds() {
        let ok = CrashParams::default();
        assert!(ok.validate().is_ok());

        for speed in [-1.0, 200.5, f64::NAN] {
            let params = CrashParams {
                speed_kmh: speed,
                ..CrashParams::default()
            };
            assert!(matches!(
                params.validate(),
                Err(ValidationError::OutOfRange { ref field, .. }) if field == "speed_kmh"
            ));
        }

        let edge = CrashParams {
            speed_kmh: 200.0,
            angle_deg: 360.0,
            ..CrashParams::default()
        };
        assert!(edge.validate().is_ok());

        let angle = CrashParams {
            angle_deg: 361.0,
            ..CrashParams::default()
        };
        assert!(angle.validate().is_err());

        let target = CrashParams {
            target: "  ".to_string(),
            ..CrashParams::default()
        };
        assert_eq!(target.validate(), Err(ValidationError::required("target")));
    }
}
