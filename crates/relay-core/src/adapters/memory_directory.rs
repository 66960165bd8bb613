//! In-memory member directory.

use parking_lot::RwLock;
use shared_types::{Rank, RecipientId, Timestamp, UserProfile};
use std::collections::HashMap;

use crate::ports::outbound::{DirectoryError, UserDirectory};

/// Member profiles kept in a map. Lost on restart.
#[derive(Default)]
pub struct MemoryDirectory {
    profiles: RwLock<HashMap<RecipientId, UserProfile>>,
}

impl MemoryDirectory {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a profile.
    pub fn insert(&self, profile: UserProfile) {
        self.profiles.write().insert(profile.id, profile);
    }

    /// Create a member, or bring a departed one back.
    ///
    /// Banned members stay banned.
    pub fn join(&self, id: RecipientId, now: Timestamp) -> UserProfile {
        let mut profiles = self.profiles.write();
        let profile = profiles
            .entry(id)
            .or_insert_with(|| UserProfile::new(id, now));
        if profile.left_at.is_some() && profile.rank != Rank::Banned {
            profile.left_at = None;
            profile.joined_at = now;
        }
        profile.clone()
    }

    /// Mark a member as departed.
    pub fn leave(&self, id: RecipientId, now: Timestamp) -> Result<UserProfile, DirectoryError> {
        self.update(id, |profile| profile.left_at = Some(now))
    }

    /// Mutate a profile in place.
    pub fn update(
        &self,
        id: RecipientId,
        change: impl FnOnce(&mut UserProfile),
    ) -> Result<UserProfile, DirectoryError> {
        let mut profiles = self.profiles.write();
        let profile = profiles
            .get_mut(&id)
            .ok_or(DirectoryError::UnknownMember(id))?;
        change(profile);
        Ok(profile.clone())
    }

    /// Ids of active members.
    #[must_use]
    pub fn active_members(&self) -> Vec<RecipientId> {
        let mut ids: Vec<_> = self
            .profiles
            .read()
            .values()
            .filter(|profile| profile.is_active())
            .map(|profile| profile.id)
            .collect();
        ids.sort_unstable();
        ids
    }
}

impl UserDirectory for MemoryDirectory {
    fn profile(&self, id: RecipientId) -> Option<UserProfile> {
        self.profiles.read().get(&id).cloned()
    }

    fn apply_warning(
        &self,
        id: RecipientId,
        cooldown_until: Timestamp,
        karma_penalty: i64,
    ) -> Result<UserProfile, DirectoryError> {
        self.update(id, |profile| {
            profile.warnings += 1;
            profile.cooldown_until = Some(cooldown_until);
            profile.karma -= karma_penalty;
        })
    }

    fn adjust_karma(&self, id: RecipientId, delta: i64) -> Result<UserProfile, DirectoryError> {
        self.update(id, |profile| profile.karma += delta)
    }
}
