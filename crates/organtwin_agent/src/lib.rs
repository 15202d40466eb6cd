//! # Organ Twin Agent
//!
//! An online value learner that picks nutrition adjustments for an organ twin.
//!
//! - **Encoder**: twin state + meal → fixed-width feature vector
//! - **Catalog**: eight multiplicative nutrient adjustments
//! - **Trainer**: epsilon-greedy selection, replay buffer, online/target
//!   Q-networks with periodic synchronization
//! - **Session**: one twin plus its learner, stepped synchronously
//! - **Manager**: independent sessions behind per-session locks

pub mod actions;
pub mod encoder;
pub mod error;
pub mod manager;
pub mod network;
pub mod replay;
pub mod session;
pub mod snapshot;
pub mod sync;
pub mod trainer;

pub use actions::{ActionCatalog, ActionKind, NutrientChange, Recommendation};
pub use encoder::StateEncoder;
pub use error::AgentError;
pub use manager::{SessionManager, SharedSession};
pub use network::{Adam, QNetwork};
pub use replay::{ReplayBuffer, Transition};
pub use session::{Session, StepOutcome};
pub use snapshot::SessionSnapshot;
pub use sync::{SyncPhase, TargetSync};
pub use trainer::{Decision, LearnerSnapshot, TrainStep, Trainer};
