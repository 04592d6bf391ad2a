//! Property tests for zone scoring and repair ordering

use std::collections::BTreeMap;

use proptest::prelude::*;

use crashlab_damage::{
    DamageAnalyzer, MINIMUM_REPAIR_LEVEL, RepairEstimator, SafetyRating, ZoneId, ZoneInput,
};

fn zone_inputs() -> impl Strategy<Value = BTreeMap<ZoneId, ZoneInput>> {
    prop::collection::btree_map(
        prop::sample::select(ZoneId::ALL.to_vec()),
        (-20.0f64..150.0, -20.0f64..150.0)
            .prop_map(|(force, deformation)| ZoneInput { force, deformation }),
        0..5,
    )
}

fn components() -> impl Strategy<Value = BTreeMap<String, f64>> {
    let members: Vec<String> = ZoneId::ALL
        .iter()
        .flat_map(|zone| zone.spec().members.iter().map(|m| (*m).to_string()))
        .collect();
    prop::collection::btree_map(prop::sample::select(members), 0.05f64..=1.0, 0..12)
}

proptest! {
    #[test]
    fn prop_scores_stay_in_range(inputs in zone_inputs()) {
        let analysis = DamageAnalyzer::new().analyze_impacts(&inputs);
        prop_assert_eq!(analysis.zones.len(), ZoneId::ALL.len());
        prop_assert!((0.0..=100.0).contains(&analysis.overall_score));
        for zone in &analysis.zones {
            prop_assert!((0.0..=100.0).contains(&zone.damage_level));
            prop_assert!((0.0..=100.0).contains(&zone.impact_force));
            prop_assert!((0.0..=100.0).contains(&zone.deformation));
        }
        prop_assert_eq!(
            analysis.safety.overall_rating,
            SafetyRating::from_score(analysis.overall_score)
        );
    }

    #[test]
    fn prop_recommendations_sorted_and_above_minimum(inputs in zone_inputs()) {
        let analysis = DamageAnalyzer::new().analyze_impacts(&inputs);
        let recommendations = RepairEstimator::default().recommend(&analysis.zones);

        for recommendation in &recommendations {
            prop_assert!(recommendation.damage_level >= MINIMUM_REPAIR_LEVEL);
        }
        for pair in recommendations.windows(2) {
            if let [a, b] = pair {
                prop_assert!(
                    a.urgency > b.urgency
                        || (a.urgency == b.urgency && a.damage_level >= b.damage_level),
                    "{:?} before {:?}", a.zone, b.zone
                );
                prop_assert_eq!(a.priority + 1, b.priority);
            }
        }
        let expected = analysis
            .zones
            .iter()
            .filter(|zone| zone.damage_level >= MINIMUM_REPAIR_LEVEL)
            .count();
        prop_assert_eq!(recommendations.len(), expected);
    }

    #[test]
    fn prop_analysis_and_estimate_deterministic(components in components()) {
        let analyzer = DamageAnalyzer::new();
        let first = analyzer.analyze_components(&components);
        let second = analyzer.analyze_components(&components);
        prop_assert_eq!(&first, &second);

        let estimator = RepairEstimator::default();
        let a = estimator.estimate(&first);
        let b = estimator.estimate(&second);
        prop_assert_eq!(a.recommendations, b.recommendations);
        prop_assert_eq!(a.pre_tax_total, b.pre_tax_total);
        prop_assert_eq!(a.next_steps, b.next_steps);
    }

    #[test]
    fn prop_pre_tax_total_covers_zone_total(inputs in zone_inputs()) {
        let analysis = DamageAnalyzer::new().analyze_impacts(&inputs);
        let estimate = RepairEstimator::default().estimate(&analysis);
        prop_assert!(estimate.pre_tax_total >= estimate.zone_total);
        prop_assert_eq!(estimate.inspection.is_some(), analysis.overall_score > 60.0);
    }
}
