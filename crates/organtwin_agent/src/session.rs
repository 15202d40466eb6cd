//! Session: one organ twin paired with its learner.
//!
//! A session is the unit of mutation. Every operation takes it explicitly;
//! there is no process-wide state. Callers sharing one across tasks wrap it
//! in a lock (see [`crate::manager::SessionManager`]).

use crate::actions::{ActionCatalog, Recommendation};
use crate::encoder::StateEncoder;
use crate::error::AgentError;
use crate::snapshot::SessionSnapshot;
use crate::trainer::{TrainStep, Trainer};
use organtwin_core::{
    Intervention, NutrientVector, OrganImpact, OrganTwin, OrganTwinConfig, RewardBreakdown,
    SimulationError,
};
use serde::Serialize;
use std::collections::BTreeMap;

/// Everything one step produced.
#[derive(Debug, Clone, Serialize)]
pub struct StepOutcome {
    pub action: usize,
    pub action_label: String,
    /// Nutrients actually fed to the twin, after the action's effect.
    pub nutrients: NutrientVector,
    pub impacts: Vec<OrganImpact>,
    pub reward: f64,
    pub breakdown: RewardBreakdown,
    pub train: TrainStep,
    pub epsilon: f64,
    pub overall_health: f64,
}

pub struct Session {
    config: OrganTwinConfig,
    twin: OrganTwin,
    encoder: StateEncoder,
    catalog: ActionCatalog,
    trainer: Trainer,
}

impl Session {
    /// Validate the config and build a fresh twin and learner.
    pub fn new(config: &OrganTwinConfig) -> Result<Self, AgentError> {
        let registry = config.validate()?;
        let encoder = StateEncoder::new(
            &registry,
            config.learner.state_size,
            config.reward.critical_threshold,
        )?;
        let catalog = ActionCatalog::standard();
        let trainer = Trainer::new(&config.learner, catalog.labels())?;
        let twin = OrganTwin::new(registry, config.simulation.clone(), config.reward.clone());

        tracing::info!(
            organs = twin.registry().len(),
            state_size = encoder.dim(),
            actions = catalog.len(),
            "Session created"
        );
        Ok(Self {
            config: config.clone(),
            twin,
            encoder,
            catalog,
            trainer,
        })
    }

    /// Rebuild a session from a snapshot taken under a compatible config.
    pub fn restore(config: &OrganTwinConfig, snapshot: SessionSnapshot) -> Result<Self, AgentError> {
        let mut session = Self::new(config)?;
        session.twin.restore(&snapshot.twin)?;
        session.trainer.restore(snapshot.learner)?;
        Ok(session)
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot::new(self.twin.snapshot(), self.trainer.snapshot())
    }

    /// One full step: encode, pick an action, transform the meal, simulate,
    /// store the transition and train when a batch is available.
    pub fn step(
        &mut self,
        nutrients: &NutrientVector,
        portion_grams: f64,
        label: &str,
    ) -> Result<StepOutcome, AgentError> {
        // Reject before touching the learner so a bad call leaves no trace.
        if !(portion_grams.is_finite() && portion_grams > 0.0) {
            return Err(SimulationError::InvalidPortion(portion_grams).into());
        }

        let state = self.encoder.encode(&self.twin, nutrients);
        let action = self.trainer.select_action(&state, true)?;
        let kind = self.catalog.get(action)?;
        let adjusted = kind.apply(nutrients);

        let outcome = self.twin.advance(&adjusted, portion_grams, label)?;
        let next_state = self.encoder.encode(&self.twin, &adjusted);
        self.trainer
            .store_transition(state, action, outcome.reward as f32, next_state, false)?;
        let train = self.trainer.replay();

        tracing::debug!(
            meal = label,
            action = kind.label(),
            reward = outcome.reward,
            loss = train.loss,
            "Session step"
        );

        Ok(StepOutcome {
            action,
            action_label: kind.label().to_string(),
            nutrients: adjusted,
            impacts: outcome.impacts,
            reward: outcome.reward,
            breakdown: outcome.breakdown,
            train,
            epsilon: self.trainer.epsilon(),
            overall_health: self.twin.overall_health(),
        })
    }

    pub fn get_state_vector(&self, nutrients: &NutrientVector) -> Vec<f32> {
        self.encoder.encode(&self.twin, nutrients)
    }

    pub fn select_action(&mut self, state: &[f32], explore: bool) -> Result<usize, AgentError> {
        self.trainer.select_action(state, explore)
    }

    pub fn get_recommendation(
        &self,
        action: usize,
        nutrients: &NutrientVector,
    ) -> Result<Recommendation, AgentError> {
        self.catalog.recommendation(action, nutrients)
    }

    /// Greedy recommendation for a meal under the current state.
    pub fn recommend(&mut self, nutrients: &NutrientVector) -> Result<Recommendation, AgentError> {
        let state = self.get_state_vector(nutrients);
        let action = self.trainer.select_action(&state, false)?;
        self.get_recommendation(action, nutrients)
    }

    pub fn apply_intervention(
        &mut self,
        kind: Intervention,
        intensity: f64,
    ) -> Result<Vec<OrganImpact>, AgentError> {
        Ok(self.twin.apply_intervention(kind, intensity)?)
    }

    pub fn get_organ_states(&self) -> BTreeMap<String, f64> {
        self.twin.organ_states()
    }

    pub fn get_overall_health(&self) -> f64 {
        self.twin.overall_health()
    }

    pub fn twin(&self) -> &OrganTwin {
        &self.twin
    }

    pub fn trainer(&self) -> &Trainer {
        &self.trainer
    }

    pub fn catalog(&self) -> &ActionCatalog {
        &self.catalog
    }

    pub fn config(&self) -> &OrganTwinConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use organtwin_core::{ConfigError, MAX_HEALTH, MIN_HEALTH};

    fn quick_config() -> OrganTwinConfig {
        let mut cfg = OrganTwinConfig::default();
        cfg.learner.hidden_layers = vec![16, 8];
        cfg.learner.batch_size = 4;
        cfg.learner.memory_size = 32;
        cfg
    }

    #[test]
    fn test_wrong_state_size_fails_construction() {
        let mut cfg = quick_config();
        cfg.learner.state_size = 30;
        assert!(matches!(
            Session::new(&cfg),
            Err(AgentError::Config(ConfigError::StateDimension {
                configured: 30,
                natural: 23
            }))
        ));
    }

    #[test]
    fn test_step_runs_full_loop() {
        let mut s = Session::new(&quick_config()).unwrap();
        let meal = NutrientVector::typical_meal();
        let mut trained = false;
        for i in 0..10 {
            let out = s.step(&meal, 150.0, &format!("meal {}", i)).unwrap();
            assert!(out.action < 8);
            assert_eq!(out.impacts.len(), 10);
            assert!(out.reward.is_finite());
            trained |= out.train.updated;
            for h in s.get_organ_states().values() {
                assert!((MIN_HEALTH..=MAX_HEALTH).contains(h));
            }
        }
        assert!(trained);
        assert_eq!(s.trainer().replay_buffer().len(), 10);
        assert_eq!(s.twin().meals_simulated(), 10);
        assert_eq!(s.trainer().decisions().len(), 10);
    }

    #[test]
    fn test_step_feeds_transformed_nutrients() {
        let mut s = Session::new(&quick_config()).unwrap();
        let meal = NutrientVector::typical_meal();
        let out = s.step(&meal, 100.0, "lunch").unwrap();
        let expected = s.catalog().apply(out.action, &meal).unwrap();
        assert_eq!(out.nutrients, expected);
        assert_eq!(s.twin().meal_log().back().unwrap().nutrients, expected);
    }

    #[test]
    fn test_bad_portion_leaves_no_trace() {
        let mut s = Session::new(&quick_config()).unwrap();
        let before = s.get_organ_states();
        assert!(matches!(
            s.step(&NutrientVector::typical_meal(), -5.0, "x"),
            Err(AgentError::Simulation(SimulationError::InvalidPortion(_)))
        ));
        assert_eq!(s.get_organ_states(), before);
        assert!(s.trainer().decisions().is_empty());
        assert!(s.trainer().replay_buffer().is_empty());
    }

    #[test]
    fn test_state_vector_width() {
        let s = Session::new(&quick_config()).unwrap();
        assert_eq!(s.get_state_vector(&NutrientVector::default()).len(), 23);
    }

    #[test]
    fn test_recommend_is_greedy() {
        let mut s = Session::new(&quick_config()).unwrap();
        let meal = NutrientVector::typical_meal();
        let rec = s.recommend(&meal).unwrap();
        let q = s.trainer().q_values(&s.get_state_vector(&meal)).unwrap();
        let best = q
            .iter()
            .enumerate()
            .fold(0, |b, (i, v)| if *v > q[b] { i } else { b });
        assert_eq!(rec.action, best);
        assert!(!rec.text.is_empty());
    }

    #[test]
    fn test_intervention_through_session() {
        let mut s = Session::new(&quick_config()).unwrap();
        let impacts = s.apply_intervention(Intervention::Exercise, 1.0).unwrap();
        assert_eq!(impacts.len(), 10);
        assert!(s.apply_intervention(Intervention::Exercise, 0.0).is_err());
    }
}
