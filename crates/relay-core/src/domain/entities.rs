//! # Relay Entities
//!
//! - [`CanonicalMessage`]: the relay's record of one inbound message
//! - [`Completion`]: progress reported by the broadcast ledger
//! - [`UpvoteOutcome`]: result of an upvote attempt
//! - [`RetractionReport`]: result of a moderation delete

use shared_types::{CanonicalId, CopyId, RecipientId, Timestamp};
use std::collections::HashSet;
use std::time::Duration;

/// One admitted inbound message.
///
/// Owned by the relay cache. Lives until it expires or is deleted by a
/// moderator.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CanonicalMessage {
    pub id: CanonicalId,
    pub sender: RecipientId,
    pub created_at: Timestamp,
    /// Sender's own message, when it stands in for the sender's copy.
    pub origin_copy: Option<CopyId>,
    /// Set once a moderator has warned the sender for this message.
    pub moderation_flag: bool,
    pub upvoters: HashSet<RecipientId>,
}

impl CanonicalMessage {
    pub fn new(id: CanonicalId, sender: RecipientId, created_at: Timestamp) -> Self {
        Self {
            id,
            sender,
            created_at,
            origin_copy: None,
            moderation_flag: false,
            upvoters: HashSet::new(),
        }
    }

    /// Older than `ttl` at `now`.
    pub fn is_expired(&self, now: Timestamp, ttl: Duration) -> bool {
        now.secs_since(self.created_at) > ttl.as_secs()
    }

    pub fn has_upvoted(&self, voter: RecipientId) -> bool {
        self.upvoters.contains(&voter)
    }
}

/// Fan-out progress after a job completed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Completion {
    /// More jobs outstanding.
    Pending { sent: usize, total: usize },
    /// Last job done; the ledger entry has been retired.
    Finished,
    /// No entry: the broadcast was cancelled or already finished.
    Untracked,
}

/// Result of an upvote.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UpvoteOutcome {
    Accepted,
    AlreadyUpvoted,
    SelfUpvote,
}

/// Copies touched by a moderation delete.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetractionReport {
    pub canonical_id: CanonicalId,
    /// Copies the transport confirmed removed
    pub retracted: usize,
    /// Copies the transport failed to remove
    pub failed: usize,
    /// Whether fan-out was still running and got cancelled
    pub cancelled_broadcast: bool,
}

impl RetractionReport {
    pub fn new(canonical_id: CanonicalId) -> Self {
        Self {
            canonical_id,
            retracted: 0,
            failed: 0,
            cancelled_broadcast: false,
        }
    }
}
