//! Experience replay: a bounded FIFO of transitions sampled uniformly for training.

use rand::seq::index;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// One step of experience. Immutable once stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transition {
    pub state: Vec<f32>,
    pub action: usize,
    pub reward: f32,
    pub next_state: Vec<f32>,
    pub done: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplayBuffer {
    capacity: usize,
    items: VecDeque<Transition>,
}

impl ReplayBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            items: VecDeque::with_capacity(capacity.min(4096)),
        }
    }

    /// Append, evicting the oldest entry when full.
    pub fn push(&mut self, transition: Transition) {
        if self.capacity == 0 {
            return;
        }
        if self.items.len() >= self.capacity {
            self.items.pop_front();
        }
        self.items.push_back(transition);
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &Transition> {
        self.items.iter()
    }

    /// Uniform sample of `batch` distinct entries, or fewer if the buffer is short.
    pub fn sample(&self, batch: usize, rng: &mut impl Rng) -> Vec<&Transition> {
        let n = batch.min(self.items.len());
        index::sample(rng, self.items.len(), n)
            .into_iter()
            .map(|i| &self.items[i])
            .collect()
    }

    /// Buffer restored from a snapshot. Entries beyond `capacity` are dropped oldest first.
    pub fn from_parts(capacity: usize, items: impl IntoIterator<Item = Transition>) -> Self {
        let mut buf = Self::new(capacity);
        for t in items {
            buf.push(t);
        }
        buf
    }
}
