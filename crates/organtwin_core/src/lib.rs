//! # Organ Twin Core
//!
//! A simulated body of interdependent organs that reacts to what it eats.
//!
//! - **Registry**: static per-organ configuration (sensitivities, metric baselines, weights)
//! - **Twin**: mutable organ health and clinical-style metrics, advanced per meal or intervention
//! - **Reward**: a shaped scalar scoring each step, consumed by the learner
//!
//! One [`OrganTwin`] is one unit of mutation. It is not shared across callers
//! without external synchronization.

pub mod config;
pub mod dynamics;
pub mod error;
pub mod nutrients;
pub mod registry;
pub mod reward;
pub mod state;
pub mod twin;

pub use config::{LearnerConfig, OrganTwinConfig, RegistryConfig, SimulationConfig};
pub use dynamics::Intervention;
pub use error::{ConfigError, RegistryError, SimulationError, SnapshotError};
pub use nutrients::{Nutrient, NutrientVector};
pub use registry::{MetricKind, OrganDefinition, OrganRegistry, OrganSpec};
pub use reward::{RewardBreakdown, RewardWeights, CRITICAL_HEALTH};
pub use state::{HealthBand, MetricReading, OrganImpact, OrganState, MAX_HEALTH, MIN_HEALTH};
pub use twin::{MealOutcome, OrganTwin, TwinSnapshot};
