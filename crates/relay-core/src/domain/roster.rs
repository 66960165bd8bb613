//! # Recipient Roster
//!
//! Ordered, deduplicated list of the members a message fans out to. Order is
//! first insertion, except that [`RecipientRoster::update`] moves a member to
//! the front.

use parking_lot::Mutex;
use shared_types::RecipientId;
use std::collections::HashSet;

#[derive(Default)]
struct RosterState {
    order: Vec<RecipientId>,
    members: HashSet<RecipientId>,
}

/// Fan-out recipients.
#[derive(Default)]
pub struct RecipientRoster {
    state: Mutex<RosterState>,
}

impl RecipientRoster {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `id` unless already present. Returns whether it was added.
    pub fn add(&self, id: RecipientId) -> bool {
        let mut state = self.state.lock();
        if !state.members.insert(id) {
            return false;
        }
        state.order.push(id);
        true
    }

    /// Snapshot in current order.
    #[must_use]
    pub fn get(&self) -> Vec<RecipientId> {
        self.state.lock().order.clone()
    }

    /// Move an existing member to the front. Non-members are ignored.
    pub fn update(&self, id: RecipientId) -> bool {
        let mut state = self.state.lock();
        let Some(pos) = state.order.iter().position(|member| *member == id) else {
            return false;
        };
        state.order.remove(pos);
        state.order.insert(0, id);
        true
    }

    /// Drop a member. Returns whether it was present.
    pub fn remove(&self, id: RecipientId) -> bool {
        let mut state = self.state.lock();
        if !state.members.remove(&id) {
            return false;
        }
        state.order.retain(|member| *member != id);
        true
    }

    #[must_use]
    pub fn contains(&self, id: RecipientId) -> bool {
        self.state.lock().members.contains(&id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.state.lock().order.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.state.lock().order.is_empty()
    }
}
