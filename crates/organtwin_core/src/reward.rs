//! Reward shaping for the learner.
//!
//! reward = mean_gain        x (mean(after) - mean(before))
//!        - critical_penalty x #{h < critical_threshold in after}
//!        - imbalance_penalty x var(after)
//!        + worst_organ_gain x (min(after) - min(before))
//!
//! The last term pays for lifting the weakest organ, so a policy cannot
//! raise the average while abandoning one organ.

use serde::{Deserialize, Serialize};

/// Health below which an organ counts as critical.
pub const CRITICAL_HEALTH: f64 = 0.6;

/// Coefficients of the shaped reward.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RewardWeights {
    /// Scales the change in mean organ health.
    pub mean_gain: f64,
    /// Subtracted once per organ in the critical band after the step.
    pub critical_penalty: f64,
    /// Scales the population variance of organ health after the step.
    pub imbalance_penalty: f64,
    /// Scales the change in the worst organ's health.
    pub worst_organ_gain: f64,
    pub critical_threshold: f64,
}

impl Default for RewardWeights {
    fn default() -> Self {
        Self {
            mean_gain: 50.0,
            critical_penalty: 0.5,
            imbalance_penalty: 2.0,
            worst_organ_gain: 20.0,
            critical_threshold: CRITICAL_HEALTH,
        }
    }
}

/// The four reward terms, kept apart for logging.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct RewardBreakdown {
    pub mean_gain: f64,
    pub critical_penalty: f64,
    pub imbalance_penalty: f64,
    pub worst_organ_gain: f64,
}

impl RewardBreakdown {
    pub fn total(&self) -> f64 {
        self.mean_gain - self.critical_penalty - self.imbalance_penalty + self.worst_organ_gain
    }
}

impl RewardWeights {
    /// Score a step from organ healths before and after, in registry order.
    pub fn score(&self, before: &[f64], after: &[f64]) -> RewardBreakdown {
        let critical = after
            .iter()
            .filter(|&&h| h < self.critical_threshold)
            .count() as f64;

        RewardBreakdown {
            mean_gain: self.mean_gain * (mean(after) - mean(before)),
            critical_penalty: self.critical_penalty * critical,
            imbalance_penalty: self.imbalance_penalty * variance(after),
            worst_organ_gain: self.worst_organ_gain * (min_or(after, 0.5) - min_or(before, 0.5)),
        }
    }
}

pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population variance.
pub fn variance(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let m = mean(values);
    values.iter().map(|v| (v - m) * (v - m)).sum::<f64>() / values.len() as f64
}

fn min_or(values: &[f64], fallback: f64) -> f64 {
    values.iter().copied().reduce(f64::min).unwrap_or(fallback)
}
