//! Explicit session persistence as JSON.
//!
//! Nothing is saved implicitly. A caller that wants to survive a restart
//! takes a snapshot and writes it wherever it likes.

use crate::error::AgentError;
use crate::trainer::LearnerSnapshot;
use chrono::{DateTime, Utc};
use organtwin_core::TwinSnapshot;
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const SNAPSHOT_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub version: u32,
    pub taken_at: DateTime<Utc>,
    pub twin: TwinSnapshot,
    pub learner: LearnerSnapshot,
}

impl SessionSnapshot {
    pub fn new(twin: TwinSnapshot, learner: LearnerSnapshot) -> Self {
        Self {
            version: SNAPSHOT_VERSION,
            taken_at: Utc::now(),
            twin,
            learner,
        }
    }

    pub fn to_json(&self) -> Result<String, AgentError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self, AgentError> {
        let snap: SessionSnapshot = serde_json::from_str(json)?;
        if snap.version != SNAPSHOT_VERSION {
            return Err(AgentError::LearnerShape(format!(
                "snapshot version {} not supported (expected {})",
                snap.version, SNAPSHOT_VERSION
            )));
        }
        Ok(snap)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), AgentError> {
        let path = path.as_ref();
        std::fs::write(path, self.to_json()?)?;
        tracing::info!(path = %path.display(), "Session snapshot saved");
        Ok(())
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, AgentError> {
        let path = path.as_ref();
        let snap = Self::from_json(&std::fs::read_to_string(path)?)?;
        tracing::info!(path = %path.display(), meals = snap.twin.meals, "Session snapshot loaded");
        Ok(snap)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::Session;
    use organtwin_core::{NutrientVector, OrganTwinConfig};

    fn config() -> OrganTwinConfig {
        let mut cfg = OrganTwinConfig::default();
        cfg.learner.hidden_layers = vec![8];
        cfg.learner.batch_size = 2;
        cfg.learner.memory_size = 16;
        cfg
    }

    #[test]
    fn test_file_round_trip() {
        let cfg = config();
        let mut s = Session::new(&cfg).unwrap();
        for i in 0..4 {
            s.step(&NutrientVector::typical_meal(), 120.0, &format!("m{}", i))
                .unwrap();
        }
        let snap = s.snapshot();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        snap.save(&path).unwrap();
        let loaded = SessionSnapshot::load(&path).unwrap();
        assert_eq!(loaded.learner, snap.learner);
        assert_eq!(loaded.twin.meals, 4);

        let restored = Session::restore(&cfg, loaded).unwrap();
        assert_eq!(restored.get_organ_states(), s.get_organ_states());
        assert_eq!(restored.trainer().epsilon(), s.trainer().epsilon());
        assert_eq!(restored.trainer().replay_buffer().len(), 4);
        assert_eq!(restored.trainer().online(), s.trainer().online());
    }

    #[test]
    fn test_restore_into_other_shape_fails() {
        let s = Session::new(&config()).unwrap();
        let snap = s.snapshot();
        let mut other = config();
        other.learner.hidden_layers = vec![4, 4];
        assert!(matches!(
            Session::restore(&other, snap),
            Err(AgentError::LearnerShape(_))
        ));
    }

    #[test]
    fn test_garbage_rejected() {
        assert!(matches!(
            SessionSnapshot::from_json("{\"version\": 1}"),
            Err(AgentError::Json(_))
        ));
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            SessionSnapshot::load(dir.path().join("missing.json")),
            Err(AgentError::Io(_))
        ));
    }
}
