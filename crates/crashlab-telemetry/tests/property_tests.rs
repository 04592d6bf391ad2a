//! Property tests for normalization and severity scoring

use proptest::prelude::*;

use crashlab_telemetry::{EXCLUSION_THRESHOLD, TelemetryNormalizer, VENDOR_COMPONENTS};

fn readings() -> impl Strategy<Value = Vec<(String, f64)>> {
    let key = prop_oneof![
        prop::sample::select(VENDOR_COMPONENTS.iter().map(|(k, _)| (*k).to_string()).collect::<Vec<_>>()),
        "[a-z]{3,8}",
    ];
    prop::collection::vec((key, 0.0f64..1.5), 0..30)
}

fn as_pairs(readings: &[(String, f64)]) -> impl Iterator<Item = (&str, f64)> {
    readings.iter().map(|(k, v)| (k.as_str(), *v))
}

proptest! {
    #[test]
    fn prop_levels_in_unit_range_and_above_threshold(readings in readings()) {
        let damage = TelemetryNormalizer::new().normalize(as_pairs(&readings));
        prop_assert!(damage.is_ok());
        if let Ok(damage) = damage {
            for level in damage.components.values() {
                prop_assert!((EXCLUSION_THRESHOLD..=1.0).contains(level), "level {}", level);
            }
            prop_assert!((0.0..=1.0).contains(&damage.severity));
        }
    }

    #[test]
    fn prop_severity_monotonic_in_single_reading(
        readings in readings(),
        index in any::<prop::sample::Index>(),
        bump in 0.0f64..1.0,
    ) {
        prop_assume!(!readings.is_empty());
        let normalizer = TelemetryNormalizer::new();
        let before = normalizer.normalize(as_pairs(&readings)).map(|d| d.severity);

        let mut raised = readings.clone();
        if let Some(entry) = raised.get_mut(index.index(readings.len())) {
            entry.1 += bump;
        }
        let after = normalizer.normalize(as_pairs(&raised)).map(|d| d.severity);

        match (before, after) {
            (Ok(before), Ok(after)) => prop_assert!(after + 1e-12 >= before, "{} -> {}", before, after),
            other => prop_assert!(false, "normalization failed: {:?}", other),
        }
    }

    #[test]
    fn prop_normalize_is_deterministic(readings in readings()) {
        let normalizer = TelemetryNormalizer::new();
        let first = normalizer.normalize(as_pairs(&readings));
        let second = normalizer.normalize(as_pairs(&readings));
        prop_assert_eq!(first, second);
    }
}
