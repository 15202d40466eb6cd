//! Organ state and the records the twin keeps for observability.

use crate::nutrients::NutrientVector;
use crate::registry::OrganDefinition;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, VecDeque};

/// Lower bound of organ health.
pub const MIN_HEALTH: f64 = 0.1;
/// Upper bound of organ health.
pub const MAX_HEALTH: f64 = 1.0;

/// Guard against NaN and Infinity in state values.
/// If the value is NaN or Inf, replace with the provided fallback.
#[inline]
pub(crate) fn sanitize_f64(v: f64, fallback: f64) -> f64 {
    if v.is_finite() {
        v
    } else {
        tracing::warn!("NaN/Inf detected in organ state, resetting to fallback {}", fallback);
        fallback
    }
}

/// Clamp into [MIN_HEALTH, MAX_HEALTH].
#[inline]
pub fn clamp_health(h: f64) -> f64 {
    h.clamp(MIN_HEALTH, MAX_HEALTH)
}

/// Risk classification shown alongside each organ.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthBand {
    /// health >= 0.8
    Low,
    /// 0.6 <= health < 0.8
    Medium,
    /// health < 0.6
    High,
}

impl HealthBand {
    pub fn from_health(h: f64) -> Self {
        if h >= 0.8 {
            HealthBand::Low
        } else if h >= 0.6 {
            HealthBand::Medium
        } else {
            HealthBand::High
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            HealthBand::Low => "low risk",
            HealthBand::Medium => "medium risk",
            HealthBand::High => "high risk",
        }
    }
}

/// One entry of an organ's rolling history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistorySample {
    pub timestamp: DateTime<Utc>,
    pub health: f64,
    pub impact: f64,
    pub label: String,
    pub nutrients: NutrientVector,
}

/// Mutable per-organ state. Metric values are aligned with the registry
/// definition's metric list.
#[derive(Debug, Clone)]
pub struct OrganState {
    pub health: f64,
    pub metrics: Vec<f64>,
    history: VecDeque<HistorySample>,
}

impl OrganState {
    pub fn new(def: &OrganDefinition, health: f64) -> Self {
        Self {
            health: clamp_health(health),
            metrics: def.metrics.iter().map(|m| m.baseline).collect(),
            history: VecDeque::new(),
        }
    }

    pub fn band(&self) -> HealthBand {
        HealthBand::from_health(self.health)
    }

    pub fn history(&self) -> &VecDeque<HistorySample> {
        &self.history
    }

    pub(crate) fn record(&mut self, sample: HistorySample, capacity: usize) {
        push_bounded(&mut self.history, sample, capacity);
    }

    pub(crate) fn clear_history(&mut self) {
        self.history.clear();
    }

    /// Metric readings with their deviation from baseline.
    pub fn readings(&self, def: &OrganDefinition) -> Vec<MetricReading> {
        def.metrics
            .iter()
            .zip(&self.metrics)
            .map(|(m, &value)| MetricReading::new(&m.name, value, m.baseline))
            .collect()
    }

    /// Metrics keyed by name.
    pub fn metric_map(&self, def: &OrganDefinition) -> BTreeMap<String, f64> {
        def.metrics
            .iter()
            .zip(&self.metrics)
            .map(|(m, &v)| (m.name.clone(), v))
            .collect()
    }
}

/// A metric value compared to its registry baseline.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricReading {
    pub name: String,
    pub value: f64,
    pub baseline: f64,
    /// Percent deviation from baseline. `None` when the baseline is zero.
    pub deviation_pct: Option<f64>,
}

impl MetricReading {
    pub fn new(name: &str, value: f64, baseline: f64) -> Self {
        let deviation_pct = if baseline == 0.0 {
            None
        } else {
            Some((value - baseline) / baseline * 100.0)
        };
        Self {
            name: name.to_string(),
            value,
            baseline,
            deviation_pct,
        }
    }
}

/// Effect of one stimulus on one organ.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrganImpact {
    pub organ: String,
    /// Signed change applied to health before clamping. Positive means the
    /// organ improved; a harmful meal yields a negative impact.
    pub impact: f64,
    pub new_health: f64,
    /// |impact| x 100, a display-friendly magnitude.
    pub stress_level: f64,
}

/// Summary of one simulated meal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MealRecord {
    pub timestamp: DateTime<Utc>,
    pub label: String,
    pub nutrients: NutrientVector,
    pub portion_grams: f64,
    pub mean_impact: f64,
    pub reward: f64,
    pub overall_health_before: f64,
    pub overall_health_after: f64,
}

/// Summary of one applied intervention.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InterventionRecord {
    pub timestamp: DateTime<Utc>,
    pub intervention: crate::dynamics::Intervention,
    pub intensity: f64,
    pub impacts: Vec<OrganImpact>,
}

pub(crate) fn push_bounded<T>(queue: &mut VecDeque<T>, item: T, capacity: usize) {
    while queue.len() >= capacity.max(1) {
        queue.pop_front();
    }
    queue.push_back(item);
}
