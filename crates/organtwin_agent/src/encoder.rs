//! State Encoder: twin state + meal → fixed-width feature vector.
//!
//! Layout, for a registry of N organs:
//!   [0, N)        organ health, registry order
//!   [N, N+9)      nutrient features, each divided by its feature scale
//!   [N+9, N+13)   overall weighted health, fraction below critical,
//!                 population std-dev of health, minimum health
//!
//! The width is fixed at construction. A configured width that disagrees
//! with the registry is a configuration error, never reshaped. "Critical"
//! uses the same threshold as the reward.

use organtwin_core::reward::variance;
use organtwin_core::{ConfigError, Nutrient, NutrientVector, OrganRegistry, OrganTwin};

pub const NUTRIENT_FEATURES: usize = Nutrient::ALL.len();
pub const AGGREGATE_FEATURES: usize = 4;

#[derive(Debug, Clone, PartialEq)]
pub struct StateEncoder {
    organs: usize,
    critical_threshold: f64,
}

impl StateEncoder {
    /// Width the encoder produces for this registry.
    pub fn natural_dim(registry: &OrganRegistry) -> usize {
        registry.len() + NUTRIENT_FEATURES + AGGREGATE_FEATURES
    }

    pub fn new(
        registry: &OrganRegistry,
        configured_dim: usize,
        critical_threshold: f64,
    ) -> Result<Self, ConfigError> {
        let natural = Self::natural_dim(registry);
        if configured_dim != natural {
            return Err(ConfigError::StateDimension {
                configured: configured_dim,
                natural,
            });
        }
        Ok(Self {
            organs: registry.len(),
            critical_threshold,
        })
    }

    pub fn critical_threshold(&self) -> f64 {
        self.critical_threshold
    }

    pub fn dim(&self) -> usize {
        self.organs + NUTRIENT_FEATURES + AGGREGATE_FEATURES
    }

    pub fn encode(&self, twin: &OrganTwin, nutrients: &NutrientVector) -> Vec<f32> {
        let healths = twin.healths();
        let mut state = Vec::with_capacity(self.dim());

        state.extend(healths.iter().map(|&h| h as f32));
        state.extend(Nutrient::ALL.iter().map(|&n| nutrients.feature(n) as f32));

        let below = healths.iter().filter(|&&h| h < self.critical_threshold).count();
        let fraction_below = if healths.is_empty() {
            0.0
        } else {
            below as f64 / healths.len() as f64
        };
        let std_dev = if healths.len() < 2 {
            0.0
        } else {
            variance(&healths).sqrt()
        };
        let min = healths.iter().copied().fold(f64::INFINITY, f64::min);
        let min = if min.is_finite() { min } else { 0.0 };

        state.push(twin.overall_health() as f32);
        state.push(fraction_below as f32);
        state.push(std_dev as f32);
        state.push(min as f32);

        debug_assert_eq!(state.len(), self.dim());
        state
    }
}
