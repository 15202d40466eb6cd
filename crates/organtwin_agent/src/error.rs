use organtwin_core::{ConfigError, SimulationError, SnapshotError};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum AgentError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Simulation(#[from] SimulationError),

    #[error("state vector has {got} features, expected {expected}")]
    StateDimension { expected: usize, got: usize },

    #[error("action index {index} out of range, catalog has {len} actions")]
    UnknownAction { index: usize, len: usize },

    #[error("twin snapshot rejected: {0}")]
    Snapshot(#[from] SnapshotError),

    #[error("learner snapshot rejected: {0}")]
    LearnerShape(String),

    #[error("snapshot I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("snapshot encoding failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("no session with id {0}")]
    UnknownSession(Uuid),
}
