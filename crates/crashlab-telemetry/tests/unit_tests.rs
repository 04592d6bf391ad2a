//! Normalizer tests over canned simulator payloads

mod payload_tests {
    use crashlab_protocol::event::SimulatorEvent;
    use crashlab_protocol::wire::{DamageData, VehicleState};
    use crashlab_telemetry::*;
    use crashlab_test_helpers::prelude::*;
    use serde_json::json;

    fn damage_data(components: serde_json::Value) -> DamageData {
        must(serde_json::from_value(json!({ "components": components })))
    }

    #[test]
    fn frontal_payload_scores_062() -> TestResult {
        let data = damage_data(frontal_components());
        let sample = TelemetryNormalizer::new().sample_from_damage(
            "s1",
            &data,
            &VehicleState::default(),
            true,
        )?;
        let ids: Vec<_> = sample.normalized_damage().keys().cloned().collect();
        assert_eq!(ids, vec!["front_bumper", "hood"]);
        assert_approx_eq!(sample.severity(), 0.62, 1e-9);
        assert_eq!(sample.damage_category(), DamageCategory::Severe);
        assert_eq!(sample.repair_complexity(), ComplexityLevel::Low);
        Ok(())
    }

    #[test]
    fn severe_payload_is_high_complexity() -> TestResult {
        let data = damage_data(severe_frontal_components());
        let sample = TelemetryNormalizer::new().sample_from_damage(
            "s1",
            &data,
            &VehicleState::default(),
            true,
        )?;
        assert_eq!(sample.normalized_damage().len(), 14);
        assert_approx_eq!(
            sample.normalized_damage()["left_headlight"],
            1.0,
            f64::EPSILON
        );
        assert_eq!(sample.repair_complexity(), ComplexityLevel::High);
        assert_in_range!(sample.severity(), 0.7, 1.0);
        Ok(())
    }

    #[test]
    fn rear_bump_drops_trunk() -> TestResult {
        let data = damage_data(rear_bump_components());
        let sample = TelemetryNormalizer::new().sample_from_damage(
            "s1",
            &data,
            &VehicleState::default(),
            false,
        )?;
        assert!(!sample.normalized_damage().contains_key("trunk_lid"));
        assert_eq!(sample.raw_damage().len(), 3);
        assert_eq!(sample.normalized_damage().len(), 2);
        Ok(())
    }

    #[test]
    fn sensor_event_becomes_sample() -> TestResult {
        let event: SimulatorEvent = serde_json::from_value(sensor_update_event(0.6, 0.25))?;
        let SimulatorEvent::SensorUpdate(report) = event else {
            return Err("expected a sensor update".into());
        };
        let sample = TelemetryNormalizer::new().sample_from_sensor(&report, 0.1)?;
        assert_eq!(sample.session_id(), "vw_tcross");
        assert!(sample.crash_detected());
        assert_approx_eq!(sample.normalized_damage()["hood"], 0.3, 1e-12);
        Ok(())
    }

    #[test]
    fn negative_component_rejected() {
        let data = damage_data(json!({"hood": -0.2}));
        let err = must_err(TelemetryNormalizer::new().sample_from_damage(
            "s1",
            &data,
            &VehicleState::default(),
            false,
        ));
        assert_eq!(err.to_string(), "Component 'hood' has negative damage -0.2");
    }
}
