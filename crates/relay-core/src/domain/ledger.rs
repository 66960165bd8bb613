//! # Broadcast Ledger
//!
//! Tracks fan-out progress per canonical message. An entry exists exactly
//! while a broadcast is live: workers skip jobs whose entry is gone, so
//! removing it is how a broadcast gets cancelled.

use parking_lot::Mutex;
use shared_types::CanonicalId;
use std::collections::HashMap;

use super::Completion;

#[derive(Clone, Copy, Debug)]
struct LedgerEntry {
    sent: usize,
    total: usize,
}

/// Live broadcasts and their completed job counts.
#[derive(Default)]
pub struct BroadcastLedger {
    entries: Mutex<HashMap<CanonicalId, LedgerEntry>>,
}

impl BroadcastLedger {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Start tracking a broadcast of `total` jobs.
    ///
    /// A broadcast with no jobs is never live, so nothing is recorded.
    pub fn open(&self, id: CanonicalId, total: usize) {
        if total == 0 {
            return;
        }
        self.entries.lock().insert(id, LedgerEntry { sent: 0, total });
    }

    /// Whether jobs for `id` should still be sent.
    #[must_use]
    pub fn is_live(&self, id: CanonicalId) -> bool {
        self.entries.lock().contains_key(&id)
    }

    /// Count one finished job (delivered or permanently failed).
    ///
    /// Retires the entry on the last job. A missing entry is a no-op.
    pub fn record_completion(&self, id: CanonicalId) -> Completion {
        let mut entries = self.entries.lock();
        let Some(entry) = entries.get_mut(&id) else {
            return Completion::Untracked;
        };
        entry.sent += 1;
        if entry.sent >= entry.total {
            entries.remove(&id);
            return Completion::Finished;
        }
        Completion::Pending {
            sent: entry.sent,
            total: entry.total,
        }
    }

    /// Drop the entry so queued jobs are skipped. Returns whether it was live.
    pub fn cancel(&self, id: CanonicalId) -> bool {
        self.entries.lock().remove(&id).is_some()
    }

    /// `(sent, total)` of a live broadcast.
    #[must_use]
    pub fn progress(&self, id: CanonicalId) -> Option<(usize, usize)> {
        self.entries
            .lock()
            .get(&id)
            .map(|entry| (entry.sent, entry.total))
    }

    /// Number of live broadcasts.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}
