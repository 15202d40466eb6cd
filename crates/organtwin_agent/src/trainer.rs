//! Trainer: epsilon-greedy selection, replay storage and DQN-style updates.
//!
//! Per training update on a uniformly sampled batch:
//!   q      = online(s)[a]
//!   target = r + (1 - done) x gamma x max_a' target_net(s')[a']
//!   loss   = mean((q - target)^2)
//! Gradients flow only through the online network, are clipped to a global
//! norm, and applied with Adam. Epsilon then decays toward its floor.

use crate::error::AgentError;
use crate::network::{Adam, QNetwork};
use crate::replay::{ReplayBuffer, Transition};
use crate::sync::{SyncPhase, TargetSync};
use chrono::{DateTime, Utc};
use organtwin_core::LearnerConfig;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// One logged action choice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Decision {
    pub timestamp: DateTime<Utc>,
    pub action: usize,
    pub label: String,
    pub epsilon: f64,
    /// Online value of the chosen action; `None` when exploring.
    pub q_value: Option<f32>,
}

/// Result of one `replay()` call.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrainStep {
    pub loss: f32,
    /// False when the buffer held fewer than one batch.
    pub updated: bool,
    pub target_synced: bool,
}

impl TrainStep {
    fn skipped() -> Self {
        Self {
            loss: 0.0,
            updated: false,
            target_synced: false,
        }
    }
}

/// Everything needed to resume learning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LearnerSnapshot {
    pub online: QNetwork,
    pub target: QNetwork,
    pub optimizer: Adam,
    pub replay: Vec<Transition>,
    pub epsilon: f64,
    pub updates: u64,
    pub sync: TargetSync,
}

pub struct Trainer {
    config: LearnerConfig,
    labels: Vec<String>,
    online: QNetwork,
    target: QNetwork,
    optimizer: Adam,
    replay: ReplayBuffer,
    sync: TargetSync,
    epsilon: f64,
    updates: u64,
    rng: StdRng,
    decisions: VecDeque<Decision>,
    losses: VecDeque<f32>,
}

impl Trainer {
    /// Build a fresh learner. The target network starts as an exact copy of the online one.
    pub fn new(config: &LearnerConfig, labels: Vec<String>) -> Result<Self, AgentError> {
        config.validate()?;
        if labels.is_empty() {
            return Err(organtwin_core::ConfigError::invalid("actions", "catalog is empty").into());
        }
        let mut rng = StdRng::seed_from_u64(config.seed);
        let online = QNetwork::new(config.state_size, &config.hidden_layers, labels.len(), &mut rng);
        let target = online.clone();
        let optimizer = Adam::new(&online, config.learning_rate);

        tracing::debug!(
            parameters = online.parameter_count(),
            actions = labels.len(),
            "Value network initialized"
        );

        Ok(Self {
            config: config.clone(),
            labels,
            online,
            target,
            optimizer,
            replay: ReplayBuffer::new(config.memory_size),
            sync: TargetSync::new(config.target_update_freq),
            epsilon: config.epsilon,
            updates: 0,
            rng,
            decisions: VecDeque::new(),
            losses: VecDeque::new(),
        })
    }

    fn check_state(&self, state: &[f32]) -> Result<(), AgentError> {
        if state.len() != self.config.state_size {
            return Err(AgentError::StateDimension {
                expected: self.config.state_size,
                got: state.len(),
            });
        }
        Ok(())
    }

    /// Online per-action values.
    pub fn q_values(&self, state: &[f32]) -> Result<Vec<f32>, AgentError> {
        self.check_state(state)?;
        Ok(self.online.forward(state))
    }

    /// Epsilon-greedy when `explore`, pure argmax otherwise.
    pub fn select_action(&mut self, state: &[f32], explore: bool) -> Result<usize, AgentError> {
        self.check_state(state)?;
        let (action, q_value) = if explore && self.rng.gen::<f64>() < self.epsilon {
            (self.rng.gen_range(0..self.labels.len()), None)
        } else {
            let q = self.online.forward(state);
            let best = argmax(&q);
            (best, Some(q[best]))
        };

        let decision = Decision {
            timestamp: Utc::now(),
            action,
            label: self.labels[action].clone(),
            epsilon: self.epsilon,
            q_value,
        };
        tracing::debug!(
            action,
            label = %decision.label,
            epsilon = self.epsilon,
            explored = q_value.is_none(),
            "Action selected"
        );
        if self.decisions.len() >= self.config.log_capacity.max(1) {
            self.decisions.pop_front();
        }
        self.decisions.push_back(decision);
        Ok(action)
    }

    pub fn store_transition(
        &mut self,
        state: Vec<f32>,
        action: usize,
        reward: f32,
        next_state: Vec<f32>,
        done: bool,
    ) -> Result<(), AgentError> {
        self.check_state(&state)?;
        self.check_state(&next_state)?;
        if action >= self.labels.len() {
            return Err(AgentError::UnknownAction {
                index: action,
                len: self.labels.len(),
            });
        }
        self.replay.push(Transition {
            state,
            action,
            reward,
            next_state,
            done,
        });
        Ok(())
    }

    /// One training update, or a zero-loss no-op while the buffer is short of a batch.
    pub fn replay(&mut self) -> TrainStep {
        let batch_size = self.config.batch_size;
        if self.replay.len() < batch_size {
            return TrainStep::skipped();
        }

        let gamma = self.config.gamma;
        let batch = self.replay.sample(batch_size, &mut self.rng);
        let n = batch.len() as f32;
        let mut grads = self.online.zeros_like();
        let mut loss = 0.0f32;

        for t in batch {
            let next_best = self
                .target
                .forward(&t.next_state)
                .into_iter()
                .fold(f32::NEG_INFINITY, f32::max);
            let bootstrap = if t.done { 0.0 } else { gamma * next_best };
            let target = t.reward + bootstrap;

            self.online.accumulate_gradients(
                &t.state,
                |out| {
                    let err = out[t.action] - target;
                    loss += err * err;
                    let mut d = vec![0.0; out.len()];
                    d[t.action] = 2.0 * err / n;
                    d
                },
                &mut grads,
            );
        }
        let loss = loss / n;

        let norm = grads.clip_norm(self.config.grad_clip_norm);
        self.optimizer.step(&mut self.online, &grads);
        self.updates += 1;

        let target_synced = match self.sync.tick() {
            SyncPhase::Synchronize => {
                self.target.clone_from(&self.online);
                tracing::info!(updates = self.updates, "Target network synchronized");
                true
            }
            SyncPhase::Accumulating { .. } => false,
        };

        self.epsilon = (self.epsilon * self.config.epsilon_decay).max(self.config.epsilon_min);

        if self.losses.len() >= self.config.log_capacity.max(1) {
            self.losses.pop_front();
        }
        self.losses.push_back(loss);
        tracing::debug!(loss, grad_norm = norm, epsilon = self.epsilon, "Training update");

        TrainStep {
            loss,
            updated: true,
            target_synced,
        }
    }

    pub fn epsilon(&self) -> f64 {
        self.epsilon
    }

    /// Successful training updates so far.
    pub fn updates(&self) -> u64 {
        self.updates
    }

    pub fn replay_buffer(&self) -> &ReplayBuffer {
        &self.replay
    }

    pub fn online(&self) -> &QNetwork {
        &self.online
    }

    pub fn target(&self) -> &QNetwork {
        &self.target
    }

    pub fn target_sync(&self) -> &TargetSync {
        &self.sync
    }

    pub fn decisions(&self) -> &VecDeque<Decision> {
        &self.decisions
    }

    pub fn losses(&self) -> &VecDeque<f32> {
        &self.losses
    }

    pub fn config(&self) -> &LearnerConfig {
        &self.config
    }

    pub fn snapshot(&self) -> LearnerSnapshot {
        LearnerSnapshot {
            online: self.online.clone(),
            target: self.target.clone(),
            optimizer: self.optimizer.clone(),
            replay: self.replay.iter().cloned().collect(),
            epsilon: self.epsilon,
            updates: self.updates,
            sync: self.sync.clone(),
        }
    }

    /// Replace learner state. Shapes must match this trainer's configuration.
    /// Epsilon resumes from the snapshot, capped at the current value: a
    /// restore never raises exploration.
    pub fn restore(&mut self, snapshot: LearnerSnapshot) -> Result<(), AgentError> {
        let expected = self.online.shape();
        for (which, net) in [("online", &snapshot.online), ("target", &snapshot.target)] {
            if !net.is_well_formed() {
                return Err(AgentError::LearnerShape(format!("{} network is malformed", which)));
            }
            if net.shape() != expected {
                return Err(AgentError::LearnerShape(format!(
                    "{} network shape {:?}, expected {:?}",
                    which,
                    net.shape(),
                    expected
                )));
            }
        }
        if !snapshot.optimizer.fits(&snapshot.online) {
            return Err(AgentError::LearnerShape(
                "optimizer moments do not match the network".into(),
            ));
        }
        if !(self.config.epsilon_min..=1.0).contains(&snapshot.epsilon) {
            return Err(AgentError::LearnerShape(format!(
                "epsilon {} outside [{}, 1]",
                snapshot.epsilon, self.config.epsilon_min
            )));
        }
        let dim = self.config.state_size;
        let actions = self.labels.len();
        if let Some(bad) = snapshot
            .replay
            .iter()
            .position(|t| t.state.len() != dim || t.next_state.len() != dim || t.action >= actions)
        {
            return Err(AgentError::LearnerShape(format!(
                "replay entry {} does not fit a {}-feature state and {} actions",
                bad, dim, actions
            )));
        }

        self.online = snapshot.online;
        self.target = snapshot.target;
        self.optimizer = snapshot.optimizer;
        self.replay = ReplayBuffer::from_parts(self.config.memory_size, snapshot.replay);
        if snapshot.epsilon > self.epsilon {
            tracing::warn!(
                saved = snapshot.epsilon,
                current = self.epsilon,
                "Snapshot epsilon above current value, capping"
            );
        }
        self.epsilon = snapshot.epsilon.min(self.epsilon);
        self.updates = snapshot.updates;
        self.sync = snapshot.sync;
        self.decisions.clear();
        self.losses.clear();
        tracing::info!(
            updates = self.updates,
            replay = self.replay.len(),
            epsilon = self.epsilon,
            "Learner restored from snapshot"
        );
        Ok(())
    }
}

/// Index of the largest value; first wins on ties, NaN never wins.
fn argmax(values: &[f32]) -> usize {
    let mut best = 0;
    for (i, v) in values.iter().enumerate() {
        if *v > values[best] || values[best].is_nan() {
            best = i;
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_config() -> LearnerConfig {
        LearnerConfig {
            state_size: 5,
            hidden_layers: vec![8, 8],
            batch_size: 4,
            memory_size: 16,
            target_update_freq: 3,
            ..Default::default()
        }
    }

    fn labels() -> Vec<String> {
        (0..3).map(|i| format!("a{}", i)).collect()
    }

    fn state(x: f32) -> Vec<f32> {
        vec![x, 0.5, -x, 0.1, 1.0]
    }

    fn fill(t: &mut Trainer, n: usize) {
        for i in 0..n {
            t.store_transition(state(i as f32 * 0.1), i % 3, 1.0, state(i as f32 * 0.1 + 0.05), false)
                .unwrap();
        }
    }

    #[test]
    fn test_target_starts_as_copy() {
        let t = Trainer::new(&small_config(), labels()).unwrap();
        assert_eq!(t.online(), t.target());
        assert_eq!(t.online().shape(), vec![5, 8, 8, 3]);
    }

    #[test]
    fn test_replay_noop_when_short() {
        let mut t = Trainer::new(&small_config(), labels()).unwrap();
        fill(&mut t, 3);
        let before = t.online().clone();
        let step = t.replay();
        assert_eq!(step.loss, 0.0);
        assert!(!step.updated);
        assert_eq!(t.online(), &before);
        assert_eq!(t.epsilon(), 0.3);
        assert_eq!(t.updates(), 0);
    }

    #[test]
    fn test_epsilon_law() {
        let cfg = small_config();
        let mut t = Trainer::new(&cfg, labels()).unwrap();
        fill(&mut t, 8);
        for n in 1..=400 {
            assert!(t.replay().updated);
            let expected = (cfg.epsilon * cfg.epsilon_decay.powi(n)).max(cfg.epsilon_min);
            assert!((t.epsilon() - expected).abs() < 1e-9, "n={}", n);
        }
        assert_eq!(t.epsilon(), cfg.epsilon_min);
    }

    #[test]
    fn test_target_sync_cadence() {
        let mut t = Trainer::new(&small_config(), labels()).unwrap();
        fill(&mut t, 8);
        let synced: Vec<bool> = (0..6).map(|_| t.replay().target_synced).collect();
        assert_eq!(synced, vec![false, false, true, false, false, true]);
        assert_eq!(t.online(), t.target());
        t.replay();
        assert_ne!(t.online(), t.target());
    }

    #[test]
    fn test_update_changes_online_only() {
        let mut t = Trainer::new(&small_config(), labels()).unwrap();
        fill(&mut t, 8);
        let target = t.target().clone();
        let step = t.replay();
        assert!(step.updated && step.loss.is_finite() && step.loss > 0.0);
        assert_ne!(t.online(), &target);
        assert_eq!(t.target(), &target);
        assert_eq!(t.losses().len(), 1);
    }

    #[test]
    fn test_greedy_selection_logs_q_value() {
        let mut t = Trainer::new(&small_config(), labels()).unwrap();
        let s = state(0.3);
        let q = t.q_values(&s).unwrap();
        let a = t.select_action(&s, false).unwrap();
        assert_eq!(a, argmax(&q));
        let d = t.decisions().back().unwrap();
        assert_eq!(d.q_value, Some(q[a]));
        assert_eq!(d.label, format!("a{}", a));
        assert_eq!(d.epsilon, 0.3);
    }

    #[test]
    fn test_full_exploration_logs_no_q_value() {
        let cfg = LearnerConfig {
            epsilon: 1.0,
            ..small_config()
        };
        let mut t = Trainer::new(&cfg, labels()).unwrap();
        for _ in 0..20 {
            let a = t.select_action(&state(0.0), true).unwrap();
            assert!(a < 3);
        }
        assert!(t.decisions().iter().all(|d| d.q_value.is_none()));
    }

    #[test]
    fn test_state_dimension_checked() {
        let mut t = Trainer::new(&small_config(), labels()).unwrap();
        assert!(matches!(
            t.select_action(&[0.0; 4], true),
            Err(AgentError::StateDimension { expected: 5, got: 4 })
        ));
        assert!(t.store_transition(state(0.0), 9, 0.0, state(0.0), false).is_err());
        assert!(t.replay_buffer().is_empty());
    }

    #[test]
    fn test_snapshot_restore_round_trip() {
        let mut a = Trainer::new(&small_config(), labels()).unwrap();
        fill(&mut a, 10);
        a.replay();
        let snap = a.snapshot();

        let mut b = Trainer::new(&LearnerConfig { seed: 99, ..small_config() }, labels()).unwrap();
        b.restore(snap.clone()).unwrap();
        assert_eq!(b.snapshot(), snap);

        let mut wrong = snap;
        wrong.online = Trainer::new(
            &LearnerConfig {
                hidden_layers: vec![4],
                ..small_config()
            },
            labels(),
        )
        .unwrap()
        .online()
        .clone();
        assert!(matches!(b.restore(wrong), Err(AgentError::LearnerShape(_))));
    }

    #[test]
    fn test_restore_never_raises_epsilon() {
        let mut a = Trainer::new(&LearnerConfig { epsilon: 0.9, ..small_config() }, labels()).unwrap();
        fill(&mut a, 4);
        let snap = a.snapshot();
        assert_eq!(snap.epsilon, 0.9);

        let mut b = Trainer::new(&LearnerConfig { epsilon: 0.4, ..small_config() }, labels()).unwrap();
        b.restore(snap).unwrap();
        assert_eq!(b.epsilon(), 0.4);

        // A decayed snapshot value below the current one is kept as is.
        fill(&mut a, 1);
        a.replay();
        let decayed = a.snapshot();
        let mut c = Trainer::new(&LearnerConfig { epsilon: 0.95, ..small_config() }, labels()).unwrap();
        c.restore(decayed.clone()).unwrap();
        assert_eq!(c.epsilon(), decayed.epsilon);
    }

    #[test]
    fn test_argmax_ties_and_nan() {
        assert_eq!(argmax(&[1.0, 3.0, 3.0]), 1);
        assert_eq!(argmax(&[f32::NAN, 0.5, 0.2]), 1);
    }
}
