//! Property-based tests for organtwin_core.
//!
//! Uses proptest to verify invariants that must hold for ALL possible inputs,
//! not just hand-picked examples.

use organtwin_core::{
    Intervention, NutrientVector, OrganRegistry, OrganTwin, RewardWeights, SimulationConfig,
    MAX_HEALTH, MIN_HEALTH,
};
use proptest::prelude::*;

// ============================================================================
// Strategies
// ============================================================================

/// Generate an arbitrary meal, including absurd amounts.
fn arb_nutrients() -> impl Strategy<Value = NutrientVector> {
    (
        (0.0f64..5000.0, 0.0f64..500.0, 0.0f64..300.0, 0.0f64..300.0, 0.0f64..300.0),
        (0.0f64..100.0, 0.0f64..10000.0, 0.0f64..3000.0, 0.0f64..100.0),
    )
        .prop_map(
            |((calories, carbs, protein, fat, sugar), (fiber, sodium, calcium, iron))| {
                NutrientVector {
                    calories,
                    carbs,
                    protein,
                    fat,
                    sugar,
                    fiber,
                    sodium,
                    calcium,
                    iron,
                }
            },
        )
}

fn arb_intervention() -> impl Strategy<Value = Intervention> {
    prop_oneof![
        Just(Intervention::Exercise),
        Just(Intervention::Hydration),
        Just(Intervention::Sleep),
        Just(Intervention::StressReduction),
    ]
}

fn twin(seed: u64) -> OrganTwin {
    let sim = SimulationConfig {
        seed,
        ..Default::default()
    };
    OrganTwin::new(OrganRegistry::standard(), sim, RewardWeights::default())
}

fn assert_in_bounds(t: &OrganTwin) -> Result<(), TestCaseError> {
    for (name, h) in t.organ_states() {
        prop_assert!(h.is_finite(), "{} health not finite", name);
        prop_assert!(
            (MIN_HEALTH..=MAX_HEALTH).contains(&h),
            "{} health out of range: {}",
            name,
            h
        );
    }
    Ok(())
}

// ============================================================================
// Simulation Properties
// ============================================================================

proptest! {
    /// **Core invariant**: health stays in [0.1, 1.0] after every meal.
    #[test]
    fn advance_keeps_health_in_bounds(
        seed in any::<u64>(),
        meals in prop::collection::vec((arb_nutrients(), 1.0f64..1000.0), 1..30),
    ) {
        let mut t = twin(seed);
        for (meal, portion) in meals {
            let outcome = t.advance(&meal, portion, "meal").unwrap();
            prop_assert!(outcome.reward.is_finite());
            for impact in &outcome.impacts {
                prop_assert!((MIN_HEALTH..=MAX_HEALTH).contains(&impact.new_health));
            }
            assert_in_bounds(&t)?;
        }
    }

    /// **Core invariant**: health stays in [0.1, 1.0] after every intervention.
    #[test]
    fn intervention_keeps_health_in_bounds(
        seed in any::<u64>(),
        steps in prop::collection::vec((arb_intervention(), 0.01f64..100.0), 1..30),
    ) {
        let mut t = twin(seed);
        for (kind, intensity) in steps {
            t.apply_intervention(kind, intensity).unwrap();
            assert_in_bounds(&t)?;
        }
    }

    /// **Reproducibility**: the same seed gives bit-identical outputs.
    #[test]
    fn advance_is_deterministic_per_seed(
        seed in any::<u64>(),
        meal in arb_nutrients(),
        portion in 1.0f64..500.0,
    ) {
        let mut a = twin(seed);
        let mut b = twin(seed);
        for _ in 0..5 {
            let ra = a.advance(&meal, portion, "x").unwrap();
            let rb = b.advance(&meal, portion, "x").unwrap();
            prop_assert_eq!(ra.reward.to_bits(), rb.reward.to_bits());
            for (x, y) in ra.impacts.iter().zip(&rb.impacts) {
                prop_assert_eq!(x.impact.to_bits(), y.impact.to_bits());
            }
        }
    }

    /// **Overall health** is the registry-weighted dot product.
    #[test]
    fn overall_health_matches_weighted_sum(
        seed in any::<u64>(),
        meal in arb_nutrients(),
    ) {
        let mut t = twin(seed);
        t.advance(&meal, 100.0, "x").unwrap();
        let expected: f64 = t
            .registry()
            .iter()
            .map(|d| d.weight * t.health_of(&d.name).unwrap())
            .sum();
        prop_assert!((t.overall_health() - expected).abs() < 1e-12);
        prop_assert!(t.overall_health() >= 0.0 && t.overall_health() <= 1.0 + 1e-9);
    }

    /// **Metrics** stay inside their kind's clamp band.
    #[test]
    fn metrics_stay_in_band(
        seed in any::<u64>(),
        meals in prop::collection::vec(arb_nutrients(), 1..20),
    ) {
        let mut t = twin(seed);
        for meal in meals {
            t.advance(&meal, 100.0, "x").unwrap();
        }
        for (def, state) in t.organs() {
            for (m, v) in def.metrics.iter().zip(&state.metrics) {
                let (lo, hi) = m.kind.bounds(m.baseline);
                prop_assert!(*v >= lo - 1e-9 && *v <= hi + 1e-9, "{} = {}", m.name, v);
            }
        }
    }
}

#[test]
fn registry_weights_sum_to_one() {
    let total: f64 = OrganRegistry::standard().weights().sum();
    assert!((total - 1.0).abs() < 1e-6);
}
