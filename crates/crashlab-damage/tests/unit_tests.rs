//! Zone analysis, safety and estimate tests

use std::collections::BTreeMap;

use crashlab_damage::*;

fn impacts(entries: &[(ZoneId, f64)]) -> BTreeMap<ZoneId, ZoneInput> {
    entries
        .iter()
        .map(|(id, level)| {
            (
                *id,
                ZoneInput {
                    force: *level,
                    deformation: *level,
                },
            )
        })
        .collect()
}

fn uniform(level: f64) -> BTreeMap<ZoneId, ZoneInput> {
    let all: Vec<_> = ZoneId::ALL.iter().map(|id| (*id, level)).collect();
    impacts(&all)
}

mod pipeline_tests {
    use super::*;
    use crashlab_protocol::wire::{DamageData, VehicleState};
    use crashlab_telemetry::{TelemetryNormalizer, TelemetrySample};
    use crashlab_test_helpers::prelude::*;
    use serde_json::json;

    fn sample(components: serde_json::Value) -> Result<TelemetrySample, Box<dyn std::error::Error>> {
        let data: DamageData = serde_json::from_value(json!({ "components": components }))?;
        Ok(TelemetryNormalizer::new().sample_from_damage(
            "s1",
            &data,
            &VehicleState::default(),
            true,
        )?)
    }

    #[test]
    fn frontal_hit_is_a_front_end_repair() -> TestResult {
        let analysis = DamageAnalyzer::new().analyze(&sample(frontal_components())?);
        let front = must_some(analysis.zone(ZoneId::FrontEnd), "front end zone");
        assert_approx_eq!(front.impact_force, 85.0, 1e-9);
        assert_approx_eq!(front.damage_level, 51.0 + 0.4 * 130.0 / 7.0, 1e-9);
        assert_eq!(front.affected_parts.len(), 4);
        assert!(front
            .affected_parts
            .iter()
            .all(|p| p.severity == PartSeverity::Medium));

        assert_approx_eq!(analysis.overall_score, front.damage_level * 1.5 / 8.9, 1e-9);
        assert_eq!(analysis.damage_class, DamageClass::MinorCosmetic);
        assert_eq!(analysis.safety.overall_rating, SafetyRating::Safe);
        assert!(analysis.safety.driveable);
        assert!(analysis.safety.immediate_actions.is_empty());
        Ok(())
    }

    #[test]
    fn frontal_hit_estimate_arithmetic() -> TestResult {
        let analysis = DamageAnalyzer::new().analyze(&sample(frontal_components())?);
        let estimate = RepairEstimator::default().estimate(&analysis);

        assert_eq!(estimate.recommendations.len(), 1);
        let front = must_some(estimate.recommendations.first(), "front recommendation");
        assert_eq!(front.priority, 1);
        assert_eq!(front.scope, RepairScope::Major);
        assert_eq!(front.complexity, RepairComplexity::Complex);
        assert_eq!(front.details, vec!["Major repair or replacement".to_string()]);
        // (850 + 1500 + 1200 + 2200) at medium severity, times labour
        assert_eq!(front.estimated_cost, Money::from_units(9200));
        assert_approx_eq!(front.estimated_hours, 8.0 * 1.5 * 1.8, 1e-9);
        assert_eq!(front.estimated_time, "21 hours");

        assert_eq!(estimate.zone_total, Money::from_units(9200));
        assert_eq!(estimate.pre_tax_total.to_string(), "10120.00");
        assert!(estimate.inspection.is_none());
        assert_eq!(
            estimate.next_steps,
            vec![
                "Schedule repair appointment with an authorized service center",
                "Document all damage with photos",
                "Contact insurance provider to file claim",
                "Keep all receipts for towing and storage costs",
            ]
        );
        Ok(())
    }

    #[test]
    fn severe_hit_grounds_the_vehicle() -> TestResult {
        let analysis = DamageAnalyzer::new().analyze(&sample(severe_frontal_components())?);
        let engine = must_some(analysis.zone(ZoneId::EngineBay), "engine zone");
        // radiator 0.85 and engine 0.7 out of four members
        assert_approx_eq!(engine.damage_level, 51.0 + 0.4 * 38.75, 1e-9);
        assert!(!analysis.safety.driveable);
        assert!(analysis
            .safety
            .safety_concerns
            .contains(&"Significant damage to Engine Bay".to_string()));

        let estimate = RepairEstimator::default().estimate(&analysis);
        let first = must_some(estimate.recommendations.first(), "first recommendation");
        assert_eq!(first.urgency, PriorityTier::Critical);
        assert_eq!(
            estimate.next_steps.first().map(String::as_str),
            Some("Vehicle must be towed - not safe to drive")
        );
        Ok(())
    }
}

mod safety_tests {
    use super::*;

    #[test]
    fn suspension_over_limit_is_not_driveable() {
        let analysis = DamageAnalyzer::new().analyze_impacts(&impacts(&[(ZoneId::Suspension, 45.0)]));
        assert!(!analysis.safety.driveable);
        assert!(!analysis.safety.inspection_required);
        assert_eq!(
            analysis.safety.immediate_actions,
            vec!["Do not drive vehicle".to_string()]
        );
        assert_eq!(
            analysis.safety.safety_concerns,
            vec!["Significant damage to Suspension System".to_string()]
        );
    }

    #[test]
    fn suspension_below_limit_is_driveable() {
        let analysis = DamageAnalyzer::new().analyze_impacts(&impacts(&[(ZoneId::Suspension, 39.0)]));
        assert!(analysis.safety.driveable);
    }

    #[test]
    fn engine_over_limit_is_not_driveable() {
        let analysis = DamageAnalyzer::new().analyze_impacts(&impacts(&[(ZoneId::EngineBay, 55.0)]));
        assert!(!analysis.safety.driveable);
    }

    #[test]
    fn cabin_damage_requires_inspection() {
        let analysis = DamageAnalyzer::new()
            .analyze_impacts(&impacts(&[(ZoneId::PassengerCompartment, 25.0)]));
        assert!(analysis.safety.inspection_required);
        assert!(analysis.safety.driveable);
        assert!(analysis.safety.safety_concerns.is_empty());
        assert_eq!(
            analysis.safety.immediate_actions,
            vec!["Schedule professional inspection".to_string()]
        );
    }

    #[test]
    fn score_above_forty_is_at_least_caution() {
        let analysis = DamageAnalyzer::new().analyze_impacts(&uniform(45.0));
        assert!(analysis.overall_score > 40.0);
        assert!(analysis.safety.overall_rating >= SafetyRating::Caution);
    }

    #[test]
    fn heavy_damage_is_unsafe() {
        let analysis = DamageAnalyzer::new().analyze_impacts(&uniform(85.0));
        assert_eq!(analysis.safety.overall_rating, SafetyRating::Unsafe);
        assert_eq!(analysis.damage_class, DamageClass::CriticalSafety);
        assert_eq!(analysis.safety.safety_concerns.len(), 3);
        assert!(analysis
            .safety
            .immediate_actions
            .contains(&"Document all damage for insurance".to_string()));
    }
}

mod estimator_tests {
    use super::*;
    use crashlab_test_helpers::prelude::*;

    struct FlatCatalog(Money);

    impl PartsCatalog for FlatCatalog {
        fn price(&self, _part_number: &str) -> Money {
            self.0
        }
    }

    #[test]
    fn recommendations_ordered_by_tier_then_damage() {
        let analysis = DamageAnalyzer::new().analyze_impacts(&impacts(&[
            (ZoneId::FrontEnd, 90.0),
            (ZoneId::PassengerCompartment, 20.0),
            (ZoneId::RearEnd, 70.0),
            (ZoneId::EngineBay, 50.0),
            (ZoneId::Undercarriage, 5.0),
        ]));
        let recommendations = RepairEstimator::default().recommend(&analysis.zones);

        let order: Vec<_> = recommendations.iter().map(|r| r.zone).collect();
        assert_eq!(
            order,
            vec![
                ZoneId::EngineBay,
                ZoneId::PassengerCompartment,
                ZoneId::FrontEnd,
                ZoneId::RearEnd,
            ]
        );
        let priorities: Vec<_> = recommendations.iter().map(|r| r.priority).collect();
        assert_eq!(priorities, vec![1, 2, 3, 4]);
        let keys: Vec<_> = recommendations
            .iter()
            .map(|r| (r.urgency, r.damage_level))
            .collect();
        assert_sorted_desc!(&keys);
    }

    #[test]
    fn zones_below_ten_are_excluded() {
        let analysis = DamageAnalyzer::new().analyze_impacts(&impacts(&[
            (ZoneId::RearEnd, 9.99),
            (ZoneId::Undercarriage, 12.0),
        ]));
        let recommendations = RepairEstimator::default().recommend(&analysis.zones);
        assert_eq!(recommendations.len(), 1);
        assert_eq!(
            recommendations.first().map(|r| r.zone),
            Some(ZoneId::Undercarriage)
        );
    }

    #[test]
    fn undamaged_vehicle_has_empty_estimate() {
        let analysis = DamageAnalyzer::new().analyze_impacts(&BTreeMap::new());
        let estimate = RepairEstimator::default().estimate(&analysis);
        assert!(estimate.recommendations.is_empty());
        assert_eq!(estimate.pre_tax_total, Money::ZERO);
        assert_eq!(estimate.next_steps.len(), 4);
    }

    #[test]
    fn custom_catalog_prices_low_severity_parts() {
        let analysis = DamageAnalyzer::new().analyze_impacts(&impacts(&[(ZoneId::FrontEnd, 20.0)]));
        let estimator = RepairEstimator::new(FlatCatalog(Money::from_units(100)));
        let estimate = estimator.estimate(&analysis);

        let front = must_some(estimate.recommendations.first(), "front recommendation");
        assert_eq!(front.parts_needed, vec!["Front Bumper Cover".to_string()]);
        assert_eq!(front.complexity, RepairComplexity::Moderate);
        assert_eq!(front.scope, RepairScope::Refinish);
        // 100 * 0.3 * 1.6
        assert_eq!(front.estimated_cost.to_string(), "48.00");
        assert_eq!(estimate.pre_tax_total.to_string(), "52.80");
    }

    #[test]
    fn unknown_parts_use_fallback_price() {
        let analysis = DamageAnalyzer::new()
            .analyze_impacts(&impacts(&[(ZoneId::Undercarriage, 25.0)]));
        let estimate = RepairEstimator::default().estimate(&analysis);
        let under = must_some(estimate.recommendations.first(), "undercarriage recommendation");
        // Underbody Shield at 250 * 0.3 * 1.6
        assert_eq!(under.estimated_cost, Money::from_units(120));
    }

    #[test]
    fn cabin_and_engine_repairs_are_safety_critical() {
        let analysis = DamageAnalyzer::new().analyze_impacts(&impacts(&[
            (ZoneId::EngineBay, 40.0),
            (ZoneId::PassengerCompartment, 28.0),
            (ZoneId::FrontEnd, 60.0),
        ]));
        let recommendations = RepairEstimator::default().recommend(&analysis.zones);
        let critical: Vec<_> = recommendations
            .iter()
            .filter(|r| r.details.iter().any(|d| d == "Safety-critical repair"))
            .map(|r| r.zone)
            .collect();
        assert_eq!(critical, vec![ZoneId::EngineBay]);
    }

    #[test]
    fn heavy_damage_attaches_inspection_and_total_loss_steps() {
        let analysis = DamageAnalyzer::new().analyze_impacts(&uniform(70.0));
        let estimate = RepairEstimator::default().estimate(&analysis);

        let inspection = must_some(estimate.inspection.as_ref(), "inspection item");
        assert_eq!(inspection.cost.to_string(), "300.00");
        assert_eq!(inspection.estimated_time, "2-4 hours");
        assert_eq!(estimate.pre_tax_total, estimate.zone_total.scale(1.10));
        assert_eq!(
            estimate.next_steps,
            vec![
                "Vehicle must be towed - not safe to drive",
                "Professional safety inspection required before repairs",
                "Contact insurance company for total loss assessment",
                "Obtain comprehensive repair estimate from a certified dealer",
                "Document all damage with photos",
                "Contact insurance provider to file claim",
                "Keep all receipts for towing and storage costs",
            ]
        );
    }

    #[test]
    fn inspection_threshold_is_configurable() {
        let analysis = DamageAnalyzer::new().analyze_impacts(&uniform(35.0));
        let estimator = RepairEstimator::with_config(
            PriceTable::default(),
            EstimatorConfig {
                inspection_threshold: 30.0,
            },
        );
        let estimate = estimator.estimate(&analysis);
        assert!(estimate.inspection.is_some());
        assert!(estimate
            .next_steps
            .contains(&"Obtain repair estimate and parts availability timeline".to_string()));
    }

    #[test]
    fn long_repairs_are_labelled_in_days() {
        let analysis = DamageAnalyzer::new().analyze_impacts(&impacts(&[(ZoneId::EngineBay, 90.0)]));
        let recommendations = RepairEstimator::default().recommend(&analysis.zones);
        let engine = must_some(recommendations.first(), "engine recommendation");
        // 16 * 2.0 * (1 + 0.2 * 3)
        assert_approx_eq!(engine.estimated_hours, 51.2, 1e-9);
        assert_eq!(engine.estimated_time, "6 days");
        assert_eq!(engine.scope, RepairScope::Replacement);
    }
}

mod store_tests {
    use super::*;
    use crashlab_test_helpers::prelude::*;

    #[tokio::test]
    async fn saved_estimates_can_be_loaded() -> TestResult {
        let store = InMemoryEstimateStore::new();
        let analysis = DamageAnalyzer::new().analyze_impacts(&uniform(50.0));
        let estimate = RepairEstimator::default().estimate(&analysis);

        let id = store.save(estimate.clone()).await?;
        assert_eq!(store.load(&id).await?, Some(estimate));
        assert_eq!(store.list().await?, vec![id]);
        assert_eq!(store.load(&EstimateId::new()).await?, None);
        Ok(())
    }

    #[tokio::test]
    async fn list_is_oldest_first() -> TestResult {
        let store = InMemoryEstimateStore::new();
        let estimator = RepairEstimator::default();
        let analysis = DamageAnalyzer::new().analyze_impacts(&uniform(20.0));

        let mut first = estimator.estimate(&analysis);
        first.created_at -= chrono::Duration::seconds(10);
        let second = estimator.estimate(&analysis);

        let second_id = store.save(second).await?;
        let first_id = store.save(first).await?;
        assert_eq!(store.list().await?, vec![first_id, second_id]);
        assert_eq!(store.len().await, 2);
        Ok(())
    }

    #[tokio::test]
    async fn store_is_usable_as_trait_object() -> TestResult {
        let store: std::sync::Arc<dyn EstimateStore> = std::sync::Arc::new(InMemoryEstimateStore::new());
        let analysis = DamageAnalyzer::new().analyze_impacts(&BTreeMap::new());
        let id = store.save(RepairEstimator::default().estimate(&analysis)).await?;
        assert!(store.load(&id).await?.is_some());
        Ok(())
    }
}
