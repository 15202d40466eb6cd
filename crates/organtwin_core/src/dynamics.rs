//! Organ Dynamics: the update rules applied on every stimulus.
//!
//! Meal pathway, per organ:
//!   load   = sum_n sensitivity(n) x normalized(n) x portion/100
//!   impact = -load + U(-noise, noise)
//!   health = clamp(health + impact, 0.1, 1.0), then + natural recovery (capped at 1.0)
//!
//! Sensitivities are positive for harmful nutrients, so the load is
//! subtracted from health.
//!
//! Metrics then relax toward baseline x (0.6 + 0.4 x health) by exponential
//! smoothing and are clamped to their kind's band.

use crate::nutrients::NutrientVector;
use crate::registry::OrganDefinition;
use crate::state::{clamp_health, sanitize_f64, MAX_HEALTH};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Portion scale relative to the 100g reference.
#[inline]
pub fn portion_scale(portion_grams: f64) -> f64 {
    portion_grams / 100.0
}

/// Weighted nutrient load on one organ. Nutrients the organ is not
/// sensitive to, and nutrients missing from the meal, contribute nothing.
pub fn nutrient_load(def: &OrganDefinition, nutrients: &NutrientVector, scale: f64) -> f64 {
    def.sensitivity
        .iter()
        .map(|&(nutrient, coef)| coef * nutrients.normalized(nutrient) * scale)
        .sum()
}

/// New health after a meal impact: clamp, then natural recovery.
pub fn health_after_meal(health: f64, impact: f64, natural_recovery: f64) -> f64 {
    let h = clamp_health(sanitize_f64(health + impact, health));
    (h + natural_recovery).min(MAX_HEALTH)
}

/// New health after an intervention impact (no recovery nudge).
pub fn health_after_intervention(health: f64, impact: f64) -> f64 {
    clamp_health(sanitize_f64(health + impact, health))
}

/// Relax every metric toward its health-scaled baseline.
pub fn relax_metrics(def: &OrganDefinition, metrics: &mut [f64], health: f64, smoothing: f64) {
    let health_factor = 0.6 + 0.4 * health;
    for (m, value) in def.metrics.iter().zip(metrics.iter_mut()) {
        let target = m.baseline * health_factor;
        let current = sanitize_f64(*value, m.baseline);
        let (lo, hi) = m.kind.bounds(m.baseline);
        *value = (current + (target - current) * smoothing).clamp(lo, hi);
    }
}

/// Non-meal stimuli.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intervention {
    Exercise,
    Hydration,
    Sleep,
    StressReduction,
}

impl Intervention {
    pub const ALL: [Intervention; 4] = [
        Intervention::Exercise,
        Intervention::Hydration,
        Intervention::Sleep,
        Intervention::StressReduction,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Intervention::Exercise => "exercise",
            Intervention::Hydration => "hydration",
            Intervention::Sleep => "sleep",
            Intervention::StressReduction => "stress_reduction",
        }
    }

    /// Organs that get the larger delta.
    pub fn focus_organs(self) -> &'static [&'static str] {
        match self {
            Intervention::Exercise => &["heart", "lungs", "muscles"],
            Intervention::Hydration => &["kidneys", "brain", "skin"],
            Intervention::Sleep => &["brain", "immune"],
            Intervention::StressReduction => &["brain", "heart", "gut"],
        }
    }

    /// (focus delta, everyone-else delta) at intensity 1.0.
    fn base_deltas(self) -> (f64, f64) {
        match self {
            Intervention::Exercise => (0.02, 0.01),
            Intervention::Hydration => (0.015, 0.008),
            Intervention::Sleep => (0.025, 0.01),
            Intervention::StressReduction => (0.03, 0.015),
        }
    }

    /// Health delta for `organ` at the given intensity.
    pub fn delta_for(self, organ: &str, intensity: f64) -> f64 {
        let (focus, other) = self.base_deltas();
        if self.focus_organs().contains(&organ) {
            focus * intensity
        } else {
            other * intensity
        }
    }
}

impl fmt::Display for Intervention {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Intervention {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim().to_ascii_lowercase().replace(['-', ' '], "_");
        Self::ALL
            .iter()
            .copied()
            .find(|i| i.name() == key)
            .ok_or_else(|| format!("unknown intervention: {}", s))
    }
}
