//! Error types for the organ twin core.

use thiserror::Error;

/// Registry validation failures. All of these are fatal at startup.
#[derive(Debug, Error, PartialEq)]
pub enum RegistryError {
    #[error("organ registry is empty")]
    Empty,

    #[error("duplicate organ '{0}' in registry")]
    DuplicateOrgan(String),

    #[error("organ '{organ}' references unknown nutrient '{nutrient}'")]
    UnknownNutrient { organ: String, nutrient: String },

    #[error("organ '{organ}' has non-finite sensitivity for {nutrient}")]
    InvalidSensitivity { organ: String, nutrient: String },

    #[error("organ '{organ}' has invalid weight {weight}")]
    InvalidWeight { organ: String, weight: f64 },

    #[error("organ weights sum to {0}, expected 1.0")]
    WeightSum(f64),

    #[error("organ '{organ}' metric '{metric}' has invalid baseline {baseline}")]
    InvalidBaseline {
        organ: String,
        metric: String,
        baseline: f64,
    },
}

/// Configuration validation failures.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Invalid { field: &'static str, reason: String },

    #[error("state size {configured} does not match encoder output {natural}")]
    StateDimension { configured: usize, natural: usize },

    #[error(transparent)]
    Registry(#[from] RegistryError),
}

impl ConfigError {
    pub fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            field,
            reason: reason.into(),
        }
    }
}

/// Rejected stimulus parameters.
#[derive(Debug, Error, PartialEq)]
pub enum SimulationError {
    #[error("portion must be a positive finite number of grams, got {0}")]
    InvalidPortion(f64),

    #[error("intervention intensity must be positive and finite, got {0}")]
    InvalidIntensity(f64),
}

/// A twin snapshot that does not fit the registry it is restored into.
#[derive(Debug, Error, PartialEq)]
pub enum SnapshotError {
    #[error("snapshot has {found} organs, registry has {expected}")]
    OrganCount { expected: usize, found: usize },

    #[error("snapshot organ '{found}' at position {index}, registry expects '{expected}'")]
    OrganMismatch {
        index: usize,
        expected: String,
        found: String,
    },

    #[error("snapshot health {health} for '{organ}' outside [0.1, 1.0]")]
    HealthOutOfRange { organ: String, health: f64 },

    #[error("{0}")]
    Shape(String),
}
