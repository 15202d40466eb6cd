//! Organ Simulation Model: the digital twin of all tracked organs.
//!
//! The twin owns mutable organ health and metrics and advances them in
//! response to meals and interventions. Initial health is drawn from a
//! generator seeded with `sim.seed`. Each meal's perturbation is drawn from a
//! generator derived from the seed and the meal index, so a twin built from
//! the same seed replays the same numbers and a restored twin continues the
//! sequence where the snapshot left it.

use crate::config::{OrganTwinConfig, SimulationConfig};
use crate::dynamics::{self, Intervention};
use crate::error::{ConfigError, SimulationError, SnapshotError};
use crate::nutrients::NutrientVector;
use crate::registry::{OrganDefinition, OrganRegistry};
use crate::reward::{RewardBreakdown, RewardWeights};
use crate::state::{
    push_bounded, HistorySample, InterventionRecord, MealRecord, MetricReading, OrganImpact,
    OrganState, MAX_HEALTH, MIN_HEALTH,
};
use chrono::{DateTime, Duration, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, VecDeque};

/// Result of one simulated meal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MealOutcome {
    /// Per-organ effect, in registry order.
    pub impacts: Vec<OrganImpact>,
    pub reward: f64,
    pub breakdown: RewardBreakdown,
}

impl MealOutcome {
    pub fn impact_for(&self, organ: &str) -> Option<&OrganImpact> {
        self.impacts.iter().find(|i| i.organ == organ)
    }
}

/// The organ digital twin.
#[derive(Debug, Clone)]
pub struct OrganTwin {
    registry: OrganRegistry,
    sim: SimulationConfig,
    reward: RewardWeights,
    organs: Vec<OrganState>,
    clock: DateTime<Utc>,
    started: DateTime<Utc>,
    previous_overall_health: f64,
    meals: u64,
    meal_log: VecDeque<MealRecord>,
    intervention_log: VecDeque<InterventionRecord>,
}

impl OrganTwin {
    /// Build a twin seeded from `sim.seed`.
    pub fn new(registry: OrganRegistry, sim: SimulationConfig, reward: RewardWeights) -> Self {
        let mut rng = StdRng::seed_from_u64(sim.seed);
        let (lo, hi) = (sim.initial_health_min, sim.initial_health_max);
        let organs = registry
            .iter()
            .map(|def| {
                let h = if hi > lo { rng.gen_range(lo..hi) } else { lo };
                OrganState::new(def, h)
            })
            .collect();

        let now = Utc::now();
        let mut twin = Self {
            registry,
            sim,
            reward,
            organs,
            clock: now,
            started: now,
            previous_overall_health: 0.5,
            meals: 0,
            meal_log: VecDeque::new(),
            intervention_log: VecDeque::new(),
        };
        twin.previous_overall_health = twin.overall_health();
        tracing::debug!(
            organs = twin.organs.len(),
            overall = twin.previous_overall_health,
            "Organ twin initialized"
        );
        twin
    }

    /// Validate the config and build a twin from it.
    pub fn from_config(config: &OrganTwinConfig) -> Result<Self, ConfigError> {
        let registry = config.validate()?;
        Ok(Self::new(
            registry,
            config.simulation.clone(),
            config.reward.clone(),
        ))
    }

    // ------------------------------------------------------------------
    // Stimuli
    // ------------------------------------------------------------------

    /// Simulate one meal. Returns per-organ impacts and the shaped reward.
    pub fn advance(
        &mut self,
        nutrients: &NutrientVector,
        portion_grams: f64,
        label: &str,
    ) -> Result<MealOutcome, SimulationError> {
        if !(portion_grams.is_finite() && portion_grams > 0.0) {
            return Err(SimulationError::InvalidPortion(portion_grams));
        }
        let scale = dynamics::portion_scale(portion_grams);
        let before = self.healths();
        let overall_before = self.overall_health();
        self.previous_overall_health = overall_before;

        let noise = self.sim.noise_amplitude;
        let mut rng = meal_rng(self.sim.seed, self.meals);
        let mut impacts = Vec::with_capacity(self.organs.len());
        for (def, organ) in self.registry.organs().iter().zip(self.organs.iter_mut()) {
            let load = dynamics::nutrient_load(def, nutrients, scale);
            let jitter = if noise > 0.0 {
                rng.gen_range(-noise..=noise)
            } else {
                0.0
            };
            let impact = -load + jitter;

            organ.health =
                dynamics::health_after_meal(organ.health, impact, self.sim.natural_recovery);
            dynamics::relax_metrics(def, &mut organ.metrics, organ.health, self.sim.metric_smoothing);
            organ.record(
                HistorySample {
                    timestamp: self.clock,
                    health: organ.health,
                    impact,
                    label: label.to_string(),
                    nutrients: *nutrients,
                },
                self.sim.history_capacity,
            );

            impacts.push(OrganImpact {
                organ: def.name.clone(),
                impact,
                new_health: organ.health,
                stress_level: impact.abs() * 100.0,
            });
        }

        let after = self.healths();
        let breakdown = self.reward.score(&before, &after);
        let reward = breakdown.total();
        let overall_after = self.overall_health();
        let mean_impact = crate::reward::mean(
            &impacts.iter().map(|i| i.impact).collect::<Vec<_>>(),
        );

        push_bounded(
            &mut self.meal_log,
            MealRecord {
                timestamp: self.clock,
                label: label.to_string(),
                nutrients: *nutrients,
                portion_grams,
                mean_impact,
                reward,
                overall_health_before: overall_before,
                overall_health_after: overall_after,
            },
            self.sim.history_capacity,
        );
        self.meals += 1;
        self.clock += Duration::hours(self.sim.hours_per_meal);

        tracing::debug!(
            meal = label,
            portion_grams,
            reward,
            overall_before,
            overall_after,
            "Meal simulated"
        );

        Ok(MealOutcome {
            impacts,
            reward,
            breakdown,
        })
    }

    /// Apply a non-meal stimulus to every organ.
    pub fn apply_intervention(
        &mut self,
        kind: Intervention,
        intensity: f64,
    ) -> Result<Vec<OrganImpact>, SimulationError> {
        if !(intensity.is_finite() && intensity > 0.0) {
            return Err(SimulationError::InvalidIntensity(intensity));
        }

        let mut impacts = Vec::with_capacity(self.organs.len());
        for (def, organ) in self.registry.organs().iter().zip(self.organs.iter_mut()) {
            let impact = kind.delta_for(&def.name, intensity);
            organ.health = dynamics::health_after_intervention(organ.health, impact);
            dynamics::relax_metrics(def, &mut organ.metrics, organ.health, self.sim.metric_smoothing);
            impacts.push(OrganImpact {
                organ: def.name.clone(),
                impact,
                new_health: organ.health,
                stress_level: impact.abs() * 100.0,
            });
        }

        push_bounded(
            &mut self.intervention_log,
            InterventionRecord {
                timestamp: self.clock,
                intervention: kind,
                intensity,
                impacts: impacts.clone(),
            },
            self.sim.history_capacity,
        );
        tracing::debug!(%kind, intensity, "Intervention applied");
        Ok(impacts)
    }

    // ------------------------------------------------------------------
    // Observation
    // ------------------------------------------------------------------

    /// Organ healths in registry order.
    pub fn healths(&self) -> Vec<f64> {
        self.organs.iter().map(|o| o.health).collect()
    }

    /// Organ name -> health.
    pub fn organ_states(&self) -> BTreeMap<String, f64> {
        self.registry
            .iter()
            .zip(&self.organs)
            .map(|(def, o)| (def.name.clone(), o.health))
            .collect()
    }

    pub fn health_of(&self, organ: &str) -> Option<f64> {
        self.registry.index_of(organ).map(|i| self.organs[i].health)
    }

    /// Weighted sum of organ healths; weights come from the registry.
    pub fn overall_health(&self) -> f64 {
        self.registry
            .weights()
            .zip(&self.organs)
            .map(|(w, o)| w * o.health)
            .sum()
    }

    /// Overall health just before the most recent meal.
    pub fn previous_overall_health(&self) -> f64 {
        self.previous_overall_health
    }

    pub fn registry(&self) -> &OrganRegistry {
        &self.registry
    }

    pub fn reward_weights(&self) -> &RewardWeights {
        &self.reward
    }

    /// Registry definitions paired with live state.
    pub fn organs(&self) -> impl Iterator<Item = (&OrganDefinition, &OrganState)> {
        self.registry.iter().zip(&self.organs)
    }

    pub fn organ(&self, name: &str) -> Option<(&OrganDefinition, &OrganState)> {
        self.registry
            .index_of(name)
            .map(|i| (&self.registry.organs()[i], &self.organs[i]))
    }

    pub fn metric_readings(&self, organ: &str) -> Option<Vec<MetricReading>> {
        self.organ(organ).map(|(def, state)| state.readings(def))
    }

    pub fn clock(&self) -> DateTime<Utc> {
        self.clock
    }

    pub fn elapsed_hours(&self) -> i64 {
        (self.clock - self.started).num_hours()
    }

    pub fn meals_simulated(&self) -> u64 {
        self.meals
    }

    pub fn meal_log(&self) -> &VecDeque<MealRecord> {
        &self.meal_log
    }

    pub fn intervention_log(&self) -> &VecDeque<InterventionRecord> {
        &self.intervention_log
    }

    // ------------------------------------------------------------------
    // Snapshots
    // ------------------------------------------------------------------

    pub fn snapshot(&self) -> TwinSnapshot {
        TwinSnapshot {
            organs: self
                .organs()
                .map(|(def, state)| OrganSnapshot {
                    name: def.name.clone(),
                    health: state.health,
                    metrics: state.metric_map(def),
                })
                .collect(),
            clock: self.clock,
            previous_overall_health: self.previous_overall_health,
            meals: self.meals,
        }
    }

    /// Replace organ state with a snapshot taken against the same registry.
    /// Observability logs are cleared; they are not part of a snapshot.
    pub fn restore(&mut self, snapshot: &TwinSnapshot) -> Result<(), SnapshotError> {
        if snapshot.organs.len() != self.organs.len() {
            return Err(SnapshotError::OrganCount {
                expected: self.organs.len(),
                found: snapshot.organs.len(),
            });
        }

        let mut restored = Vec::with_capacity(self.organs.len());
        for (index, (def, snap)) in self.registry.iter().zip(&snapshot.organs).enumerate() {
            if def.name != snap.name {
                return Err(SnapshotError::OrganMismatch {
                    index,
                    expected: def.name.clone(),
                    found: snap.name.clone(),
                });
            }
            if !(MIN_HEALTH..=MAX_HEALTH).contains(&snap.health) {
                return Err(SnapshotError::HealthOutOfRange {
                    organ: snap.name.clone(),
                    health: snap.health,
                });
            }
            let mut state = OrganState::new(def, snap.health);
            for (m, value) in def.metrics.iter().zip(state.metrics.iter_mut()) {
                match snap.metrics.get(&m.name) {
                    Some(v) if v.is_finite() => *value = *v,
                    _ => {
                        return Err(SnapshotError::Shape(format!(
                            "organ '{}' snapshot lacks metric '{}'",
                            def.name, m.name
                        )))
                    }
                }
            }
            restored.push(state);
        }

        self.organs = restored;
        for organ in &mut self.organs {
            organ.clear_history();
        }
        self.clock = snapshot.clock;
        self.started = snapshot.clock;
        self.previous_overall_health = snapshot.previous_overall_health;
        self.meals = snapshot.meals;
        self.meal_log.clear();
        self.intervention_log.clear();
        tracing::info!(meals = self.meals, "Organ twin restored from snapshot");
        Ok(())
    }
}

/// Perturbation generator for the meal at `index`. Depends only on the seed
/// and the index, never on earlier draws.
fn meal_rng(seed: u64, index: u64) -> StdRng {
    const GOLDEN: u64 = 0x9E37_79B9_7F4A_7C15;
    StdRng::seed_from_u64(seed.wrapping_add(index.wrapping_add(1).wrapping_mul(GOLDEN)))
}

/// Serializable organ state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrganSnapshot {
    pub name: String,
    pub health: f64,
    pub metrics: BTreeMap<String, f64>,
}

/// Serializable twin state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TwinSnapshot {
    pub organs: Vec<OrganSnapshot>,
    pub clock: DateTime<Utc>,
    pub previous_overall_health: f64,
    pub meals: u64,
}
