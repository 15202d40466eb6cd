//! Target-network synchronization cadence.
//!
//! Every successful training update advances the machine one tick. After
//! `period` ticks it reports `Synchronize` once, then starts counting again.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SyncPhase {
    /// Updates left before the next copy.
    Accumulating { remaining: u32 },
    /// Copy online parameters into the target network now.
    Synchronize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetSync {
    period: u32,
    remaining: u32,
    syncs: u64,
}

impl TargetSync {
    /// `period` of zero is treated as one.
    pub fn new(period: u32) -> Self {
        let period = period.max(1);
        Self {
            period,
            remaining: period,
            syncs: 0,
        }
    }

    pub fn period(&self) -> u32 {
        self.period
    }

    /// Number of completed synchronizations.
    pub fn syncs(&self) -> u64 {
        self.syncs
    }

    pub fn phase(&self) -> SyncPhase {
        SyncPhase::Accumulating {
            remaining: self.remaining,
        }
    }

    /// Record one training update.
    pub fn tick(&mut self) -> SyncPhase {
        self.remaining = self.remaining.saturating_sub(1);
        if self.remaining == 0 {
            self.remaining = self.period;
            self.syncs += 1;
            SyncPhase::Synchronize
        } else {
            self.phase()
        }
    }
}
