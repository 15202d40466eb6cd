use crate::error::ConfigError;
use crate::registry::{OrganRegistry, OrganSpec};
use crate::reward::RewardWeights;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

// ============================================================================
// Top-level config
// ============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct OrganTwinConfig {
    pub simulation: SimulationConfig,
    pub reward: RewardWeights,
    pub learner: LearnerConfig,
    pub registry: RegistryConfig,
}

impl OrganTwinConfig {
    /// Load config from a TOML file, falling back to defaults for missing fields.
    /// After loading, env var overrides are applied.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;
        let mut config: OrganTwinConfig =
            toml::from_str(&content).with_context(|| "Failed to parse TOML config")?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Try to load from path; if the file doesn't exist, return defaults with env
    /// overrides. A file that exists but cannot be read or parsed is an error.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        match std::fs::read_to_string(path) {
            Ok(content) => {
                let mut config: OrganTwinConfig = toml::from_str(&content)
                    .with_context(|| format!("Failed to parse TOML config: {}", path.display()))?;
                config.apply_env_overrides();
                Ok(config)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!("Config file {} not found, using defaults", path.display());
                let mut cfg = Self::default();
                cfg.apply_env_overrides();
                Ok(cfg)
            }
            Err(e) => Err(e)
                .with_context(|| format!("Failed to read config file: {}", path.display())),
        }
    }

    /// Apply environment variable overrides on top of file-based config.
    fn apply_env_overrides(&mut self) {
        if let Ok(v) = std::env::var("ORGANTWIN_SEED") {
            if let Ok(n) = v.parse() {
                self.simulation.seed = n;
            }
        }
        if let Ok(v) = std::env::var("ORGANTWIN_EPSILON") {
            if let Ok(n) = v.parse() {
                self.learner.epsilon = n;
            }
        }
        if let Ok(v) = std::env::var("ORGANTWIN_BATCH_SIZE") {
            if let Ok(n) = v.parse() {
                self.learner.batch_size = n;
            }
        }
        if let Ok(v) = std::env::var("ORGANTWIN_LEARNING_RATE") {
            if let Ok(n) = v.parse() {
                self.learner.learning_rate = n;
            }
        }
    }

    /// Check every section once, at startup. Returns the validated registry.
    pub fn validate(&self) -> Result<OrganRegistry, ConfigError> {
        self.simulation.validate()?;
        self.learner.validate()?;
        validate_reward(&self.reward)?;
        Ok(self.registry.build()?)
    }
}

// ============================================================================
// Sub-configs
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Seed for initial health and per-step perturbation.
    pub seed: u64,
    /// Half-width of the uniform perturbation added to each organ impact.
    pub noise_amplitude: f64,
    /// Health nudge applied after every meal.
    pub natural_recovery: f64,
    /// Per-organ history samples kept (oldest evicted).
    pub history_capacity: usize,
    /// Fraction of the gap to target closed per metric update.
    pub metric_smoothing: f64,
    pub initial_health_min: f64,
    pub initial_health_max: f64,
    /// Simulated hours between meals.
    pub hours_per_meal: i64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            noise_amplitude: 0.02,
            natural_recovery: 0.001,
            history_capacity: 100,
            metric_smoothing: 0.1,
            initial_health_min: 0.7,
            initial_health_max: 0.9,
            hours_per_meal: 1,
        }
    }
}

impl SimulationConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.noise_amplitude.is_finite() || self.noise_amplitude < 0.0 {
            return Err(ConfigError::invalid(
                "simulation.noise_amplitude",
                format!("must be >= 0, got {}", self.noise_amplitude),
            ));
        }
        if !self.natural_recovery.is_finite() || self.natural_recovery < 0.0 {
            return Err(ConfigError::invalid(
                "simulation.natural_recovery",
                format!("must be >= 0, got {}", self.natural_recovery),
            ));
        }
        if self.history_capacity == 0 {
            return Err(ConfigError::invalid("simulation.history_capacity", "must be > 0"));
        }
        if !(self.metric_smoothing > 0.0 && self.metric_smoothing <= 1.0) {
            return Err(ConfigError::invalid(
                "simulation.metric_smoothing",
                format!("must be in (0, 1], got {}", self.metric_smoothing),
            ));
        }
        let (lo, hi) = (self.initial_health_min, self.initial_health_max);
        if !(0.1..=1.0).contains(&lo) || !(0.1..=1.0).contains(&hi) || lo > hi {
            return Err(ConfigError::invalid(
                "simulation.initial_health",
                format!("need 0.1 <= min <= max <= 1.0, got {}..{}", lo, hi),
            ));
        }
        if self.hours_per_meal < 0 {
            return Err(ConfigError::invalid("simulation.hours_per_meal", "must be >= 0"));
        }
        Ok(())
    }
}

fn validate_reward(w: &RewardWeights) -> Result<(), ConfigError> {
    let terms = [
        ("reward.mean_gain", w.mean_gain),
        ("reward.critical_penalty", w.critical_penalty),
        ("reward.imbalance_penalty", w.imbalance_penalty),
        ("reward.worst_organ_gain", w.worst_organ_gain),
        ("reward.critical_threshold", w.critical_threshold),
    ];
    for (field, v) in terms {
        if !v.is_finite() {
            return Err(ConfigError::invalid(field, format!("must be finite, got {}", v)));
        }
    }
    Ok(())
}

/// Hyperparameters of the value learner.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LearnerConfig {
    /// Must equal the encoder's output width (organs + 9 nutrients + 4 aggregates).
    pub state_size: usize,
    pub hidden_layers: Vec<usize>,
    pub gamma: f32,
    pub epsilon: f64,
    pub epsilon_decay: f64,
    pub epsilon_min: f64,
    pub memory_size: usize,
    pub batch_size: usize,
    pub learning_rate: f32,
    /// Training updates between target-network syncs.
    pub target_update_freq: u32,
    pub grad_clip_norm: f32,
    /// Seed for weight init, exploration and batch sampling.
    pub seed: u64,
    /// Decisions and losses retained for observability.
    pub log_capacity: usize,
}

impl Default for LearnerConfig {
    fn default() -> Self {
        Self {
            state_size: 23,
            hidden_layers: vec![128, 64, 32],
            gamma: 0.95,
            epsilon: 0.3,
            epsilon_decay: 0.995,
            epsilon_min: 0.05,
            memory_size: 2000,
            batch_size: 32,
            learning_rate: 0.001,
            target_update_freq: 10,
            grad_clip_norm: 1.0,
            seed: 7,
            log_capacity: 1000,
        }
    }
}

impl LearnerConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.state_size == 0 {
            return Err(ConfigError::invalid("learner.state_size", "must be > 0"));
        }
        if self.hidden_layers.iter().any(|&h| h == 0) {
            return Err(ConfigError::invalid("learner.hidden_layers", "layer widths must be > 0"));
        }
        if !(0.0..=1.0).contains(&self.gamma) {
            return Err(ConfigError::invalid(
                "learner.gamma",
                format!("must be in [0, 1], got {}", self.gamma),
            ));
        }
        if !(0.0..=1.0).contains(&self.epsilon_min) || !(0.0..=1.0).contains(&self.epsilon) {
            return Err(ConfigError::invalid(
                "learner.epsilon",
                format!("epsilon {} and epsilon_min {} must be in [0, 1]", self.epsilon, self.epsilon_min),
            ));
        }
        if self.epsilon < self.epsilon_min {
            return Err(ConfigError::invalid(
                "learner.epsilon",
                format!("epsilon {} below epsilon_min {}", self.epsilon, self.epsilon_min),
            ));
        }
        if !(self.epsilon_decay > 0.0 && self.epsilon_decay <= 1.0) {
            return Err(ConfigError::invalid(
                "learner.epsilon_decay",
                format!("must be in (0, 1], got {}", self.epsilon_decay),
            ));
        }
        if self.batch_size == 0 {
            return Err(ConfigError::invalid("learner.batch_size", "must be > 0"));
        }
        if self.memory_size < self.batch_size {
            return Err(ConfigError::invalid(
                "learner.memory_size",
                format!("{} cannot hold one batch of {}", self.memory_size, self.batch_size),
            ));
        }
        if !(self.learning_rate.is_finite() && self.learning_rate > 0.0) {
            return Err(ConfigError::invalid("learner.learning_rate", "must be > 0"));
        }
        if self.target_update_freq == 0 {
            return Err(ConfigError::invalid("learner.target_update_freq", "must be > 0"));
        }
        if !(self.grad_clip_norm.is_finite() && self.grad_clip_norm > 0.0) {
            return Err(ConfigError::invalid("learner.grad_clip_norm", "must be > 0"));
        }
        Ok(())
    }
}

/// Optional registry override. When `organs` is empty the built-in table is used.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    pub organs: Vec<OrganSpec>,
}

impl RegistryConfig {
    pub fn build(&self) -> Result<OrganRegistry, ConfigError> {
        if self.organs.is_empty() {
            Ok(OrganRegistry::standard())
        } else {
            Ok(OrganRegistry::from_specs(&self.organs)?)
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RegistryError;

    #[test]
    fn test_default_config() {
        let cfg = OrganTwinConfig::default();
        assert_eq!(cfg.learner.state_size, 23);
        assert_eq!(cfg.learner.batch_size, 32);
        assert_eq!(cfg.learner.target_update_freq, 10);
        assert_eq!(cfg.reward.mean_gain, 50.0);
        assert_eq!(cfg.simulation.history_capacity, 100);
        let registry = cfg.validate().unwrap();
        assert_eq!(registry.len(), 10);
    }

    #[test]
    fn test_parse_minimal_toml() {
        let toml_str = r#"
[learner]
batch_size = 16
epsilon = 0.5
"#;
        let cfg: OrganTwinConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(cfg.learner.batch_size, 16);
        assert_eq!(cfg.learner.epsilon, 0.5);
        // Defaults for unspecified fields
        assert_eq!(cfg.learner.memory_size, 2000);
        assert_eq!(cfg.simulation.noise_amplitude, 0.02);
    }

    #[test]
    fn test_parse_full_toml() {
        let toml_str = r#"
[simulation]
seed = 1234
noise_amplitude = 0.0
history_capacity = 10

[reward]
mean_gain = 40.0
worst_organ_gain = 10.0

[learner]
hidden_layers = [32, 16]
gamma = 0.9
target_update_freq = 5

[[registry.organs]]
name = "heart"
weight = 0.6
sensitivity = { sodium = 0.8, fiber = -0.4 }
metrics = [{ name = "blood_pressure", baseline = 120.0 }]

[[registry.organs]]
name = "gut"
weight = 0.4
sensitivity = { fiber = -0.7 }
"#;
        let cfg: OrganTwinConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(cfg.simulation.seed, 1234);
        assert_eq!(cfg.reward.mean_gain, 40.0);
        assert_eq!(cfg.reward.critical_penalty, 0.5);
        assert_eq!(cfg.learner.hidden_layers, vec![32, 16]);
        let registry = cfg.validate().unwrap();
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.organs()[1].name, "gut");
    }

    #[test]
    fn test_bad_registry_fails_validation() {
        let toml_str = r#"
[[registry.organs]]
name = "heart"
weight = 0.5
sensitivity = { potassium = -0.3 }
"#;
        let cfg: OrganTwinConfig = toml::from_str(toml_str).unwrap();
        match cfg.validate() {
            Err(ConfigError::Registry(RegistryError::UnknownNutrient { nutrient, .. })) => {
                assert_eq!(nutrient, "potassium")
            }
            other => panic!("expected unknown nutrient, got {:?}", other),
        }
    }

    #[test]
    fn test_learner_validation() {
        let mut learner = LearnerConfig::default();
        assert!(learner.validate().is_ok());
        learner.epsilon = 0.01;
        assert!(learner.validate().is_err());

        let mut learner = LearnerConfig::default();
        learner.memory_size = 8;
        assert!(learner.validate().is_err());

        let mut learner = LearnerConfig::default();
        learner.target_update_freq = 0;
        assert!(learner.validate().is_err());
    }

    #[test]
    fn test_env_overrides_and_defaults() {
        // Part 1: env overrides
        std::env::set_var("ORGANTWIN_SEED", "99");
        std::env::set_var("ORGANTWIN_BATCH_SIZE", "8");

        let mut cfg = OrganTwinConfig::default();
        cfg.apply_env_overrides();

        assert_eq!(cfg.simulation.seed, 99);
        assert_eq!(cfg.learner.batch_size, 8);

        // Clean up env vars before testing defaults
        std::env::remove_var("ORGANTWIN_SEED");
        std::env::remove_var("ORGANTWIN_BATCH_SIZE");

        // Part 2: nonexistent path returns defaults (no env interference)
        let cfg = OrganTwinConfig::load_or_default("/nonexistent/path.toml").unwrap();
        assert_eq!(cfg.simulation.seed, 42);
    }

    #[test]
    fn test_malformed_file_is_not_replaced_by_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("organtwin.toml");
        // Organ entry without its weight.
        std::fs::write(
            &path,
            "[[registry.organs]]\nname = \"heart\"\nsensitivity = { sodium = 0.8 }\n",
        )
        .unwrap();
        assert!(OrganTwinConfig::load_or_default(&path).is_err());
        assert!(OrganTwinConfig::load(&path).is_err());

        std::fs::write(&path, "[learner]\ngamma = 0.9\n").unwrap();
        let cfg = OrganTwinConfig::load_or_default(&path).unwrap();
        assert_eq!(cfg.learner.gamma, 0.9);
    }
}
