//! Canned damage payloads and sensor reports.

use serde_json::{Value, json};

/// The two-component frontal hit: bumper and hood.
pub fn frontal_components() -> Value {
    json!({"bumper_F": 0.85, "hood": 0.45})
}

/// A heavy frontal offset impact reaching the cabin and the engine bay.
pub fn severe_frontal_components() -> Value {
    json!({
        "bumper_F": 0.95,
        "hood": 0.9,
        "fender_FL": 0.8,
        "fender_FR": 0.6,
        "headlight_L": {"damage": 1.0},
        "headlight_R": 0.7,
        "grille": 0.9,
        "radiator": 0.85,
        "engine": 0.7,
        "door_FL": 0.5,
        "pillar_A_L": 0.45,
        "windshield": 0.6,
        "suspension_FL": 0.75,
        "suspension_FR": 0.4
    })
}

/// A rear bump with nothing structural.
pub fn rear_bump_components() -> Value {
    json!({"bumper_R": 0.3, "taillight_L": 0.2, "trunk": 0.04})
}

/// A sensor update event frame.
pub fn sensor_update_event(total_damage: f64, damage_delta: f64) -> Value {
    json!({
        "type": "sensor_update",
        "vehicleId": "vw_tcross",
        "position": [-717.0, 101.0, 118.0],
        "velocity": [12.0, 0.5, 0.0],
        "rotation": [0.0, 0.0, 0.3826834, 0.9238795],
        "damage": {
            "total_damage": total_damage,
            "previous_damage": (total_damage - damage_delta).max(0.0),
            "damage_delta": damage_delta,
            "parts": [
                {"name": "bumper_F", "partId": "vw_bumper_front", "damage": total_damage},
                {"name": "hood", "partId": "vw_hood", "damage": total_damage / 2.0}
            ]
        }
    })
}

/// A crash event frame.
pub fn crash_event(impact_force: f64) -> Value {
    json!({"type": "crash_detected", "impact_force": impact_force, "timestamp": 12.5})
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sensor_event_delta_consistent() {
        let event = sensor_update_event(0.5, 0.2);
        assert_eq!(event.pointer("/damage/damage_delta"), Some(&json!(0.2)));
        assert_eq!(event.pointer("/damage/parts/1/damage"), Some(&json!(0.25)));
    }
}
