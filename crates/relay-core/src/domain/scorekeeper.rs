//! # Spam Scorekeeper
//!
//! Per-sender score that grows with every admitted message and decays by one
//! point per tick. A message that would push the score over the limit is
//! refused and the score is clamped to the punitive `limit_hit`, so a
//! flooding sender has to wait out several ticks.

use parking_lot::Mutex;
use shared_types::RecipientId;
use std::collections::HashMap;

use super::SpamConfig;

/// Decaying spam scores.
pub struct SpamScorekeeper {
    scores: Mutex<HashMap<RecipientId, f32>>,
    limit: f32,
    limit_hit: f32,
}

impl SpamScorekeeper {
    #[must_use]
    pub fn new(limit: f32, limit_hit: f32) -> Self {
        Self {
            scores: Mutex::new(HashMap::new()),
            limit,
            limit_hit,
        }
    }

    #[must_use]
    pub fn from_config(config: &SpamConfig) -> Self {
        Self::new(config.limit, config.limit_hit)
    }

    /// Add `delta` to the sender's score. Returns false when the message
    /// must be refused.
    pub fn increase(&self, sender: RecipientId, delta: f32) -> bool {
        let mut scores = self.scores.lock();
        let current = scores.get(&sender).copied().unwrap_or(0.0);

        if current > self.limit {
            return false;
        }
        if current + delta > self.limit {
            scores.insert(sender, self.limit_hit);
            return false;
        }
        scores.insert(sender, current + delta);
        true
    }

    /// One decay tick: every score drops by one, non-positive scores vanish.
    pub fn decay(&self) {
        self.scores.lock().retain(|_, score| {
            *score -= 1.0;
            *score > 0.0
        });
    }

    #[must_use]
    pub fn score(&self, sender: RecipientId) -> Option<f32> {
        self.scores.lock().get(&sender).copied()
    }

    /// Number of senders with a positive score.
    #[must_use]
    pub fn tracked(&self) -> usize {
        self.scores.lock().len()
    }
}
