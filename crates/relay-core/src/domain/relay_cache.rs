//! # Relay Cache
//!
//! Canonical messages and the copy each recipient received of them.
//!
//! ## Maps
//!
//! - `messages`: canonical id → [`CanonicalMessage`]
//! - `copies`: recipient → (canonical id → delivered copy id)
//!
//! A recipient without a mapping for a canonical message has not received it
//! yet, or never will. Once written, a mapping never points at another copy.
//! Expiry and deletion drop a canonical message together with every mapping
//! that references it.

use parking_lot::RwLock;
use shared_types::{CanonicalId, CopyId, RecipientId, Timestamp};
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;

use super::CanonicalMessage;

/// Relay cache lookup errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CacheError {
    #[error("Canonical message {0} is not cached")]
    CanonicalNotFound(CanonicalId),

    #[error("Recipient {0} has no cached copies")]
    RecipientUnknown(RecipientId),

    #[error("Recipient {recipient} has no copy of {canonical}")]
    MappingNotFound {
        recipient: RecipientId,
        canonical: CanonicalId,
    },

    #[error("Copy {copy} in chat {recipient} is not a relayed message")]
    CopyNotFound { recipient: RecipientId, copy: CopyId },

    #[error("Recipient {recipient} already holds copy {existing} of {canonical}")]
    AlreadyMapped {
        recipient: RecipientId,
        canonical: CanonicalId,
        existing: CopyId,
    },
}

#[derive(Default)]
struct CacheState {
    last_id: u64,
    messages: HashMap<CanonicalId, CanonicalMessage>,
    copies: HashMap<RecipientId, HashMap<CanonicalId, CopyId>>,
}

impl CacheState {
    fn message_mut(&mut self, id: CanonicalId) -> Result<&mut CanonicalMessage, CacheError> {
        self.messages
            .get_mut(&id)
            .ok_or(CacheError::CanonicalNotFound(id))
    }

    /// Map `recipient`'s copy of `canonical`. Never remaps.
    fn map_copy(
        &mut self,
        recipient: RecipientId,
        canonical: CanonicalId,
        copy: CopyId,
    ) -> Result<(), CacheError> {
        let mapping = self.copies.entry(recipient).or_default();
        match mapping.get(&canonical) {
            Some(existing) if *existing == copy => Ok(()),
            Some(existing) => Err(CacheError::AlreadyMapped {
                recipient,
                canonical,
                existing: *existing,
            }),
            None => {
                mapping.insert(canonical, copy);
                Ok(())
            }
        }
    }

    /// Drop every mapping for the given canonical ids, returning them.
    fn purge_copies(&mut self, ids: &[CanonicalId]) -> Vec<(RecipientId, CanonicalId, CopyId)> {
        let mut removed = Vec::new();
        self.copies.retain(|recipient, mapping| {
            for id in ids {
                if let Some(copy) = mapping.remove(id) {
                    removed.push((*recipient, *id, copy));
                }
            }
            !mapping.is_empty()
        });
        removed
    }
}

/// Bounded-lifetime map between canonical messages and delivered copies.
pub struct RelayCache {
    state: RwLock<CacheState>,
    ttl: Duration,
}

impl RelayCache {
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            state: RwLock::new(CacheState::default()),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Register a newly admitted message and allocate its id.
    pub fn create_canonical(&self, sender: RecipientId, now: Timestamp) -> CanonicalId {
        let mut state = self.state.write();
        state.last_id += 1;
        let id = CanonicalId(state.last_id);
        state
            .messages
            .insert(id, CanonicalMessage::new(id, sender, now));
        id
    }

    /// Record that `recipient` received `canonical` as `copy`.
    ///
    /// Recording the same copy twice is a no-op.
    ///
    /// # Errors
    ///
    /// - `CanonicalNotFound` if the message expired or was deleted
    /// - `AlreadyMapped` if the recipient already holds a different copy
    pub fn record_delivery(
        &self,
        recipient: RecipientId,
        canonical: CanonicalId,
        copy: CopyId,
    ) -> Result<(), CacheError> {
        let mut state = self.state.write();
        if !state.messages.contains_key(&canonical) {
            return Err(CacheError::CanonicalNotFound(canonical));
        }
        state.map_copy(recipient, canonical, copy)
    }

    /// Record the sender's own message as their copy of `canonical`.
    ///
    /// Unlike a relayed copy, the origin is never retracted on delete.
    pub fn record_origin(&self, canonical: CanonicalId, copy: CopyId) -> Result<(), CacheError> {
        let mut state = self.state.write();
        let message = state.message_mut(canonical)?;
        let sender = message.sender;
        state.map_copy(sender, canonical, copy)?;
        state.message_mut(canonical)?.origin_copy = Some(copy);
        Ok(())
    }

    /// Copy of `canonical` delivered to `recipient`.
    pub fn lookup_delivered_copy(
        &self,
        recipient: RecipientId,
        canonical: CanonicalId,
    ) -> Result<CopyId, CacheError> {
        let state = self.state.read();
        let mapping = state
            .copies
            .get(&recipient)
            .ok_or(CacheError::RecipientUnknown(recipient))?;
        mapping
            .get(&canonical)
            .copied()
            .ok_or(CacheError::MappingNotFound {
                recipient,
                canonical,
            })
    }

    /// Canonical message that `copy` in `recipient`'s chat belongs to.
    pub fn lookup_canonical_from_copy(
        &self,
        recipient: RecipientId,
        copy: CopyId,
    ) -> Result<CanonicalId, CacheError> {
        let state = self.state.read();
        let mapping = state
            .copies
            .get(&recipient)
            .ok_or(CacheError::RecipientUnknown(recipient))?;
        mapping
            .iter()
            .find_map(|(canonical, delivered)| (*delivered == copy).then_some(*canonical))
            .ok_or(CacheError::CopyNotFound { recipient, copy })
    }

    /// Snapshot of a canonical message.
    pub fn get_canonical(&self, canonical: CanonicalId) -> Result<CanonicalMessage, CacheError> {
        self.state
            .read()
            .messages
            .get(&canonical)
            .cloned()
            .ok_or(CacheError::CanonicalNotFound(canonical))
    }

    /// Record an upvote. Returns false if `voter` already voted.
    pub fn add_upvote(&self, canonical: CanonicalId, voter: RecipientId) -> Result<bool, CacheError> {
        let mut state = self.state.write();
        Ok(state.message_mut(canonical)?.upvoters.insert(voter))
    }

    /// Take back a vote whose karma could not be applied.
    pub fn withdraw_upvote(&self, canonical: CanonicalId, voter: RecipientId) -> Result<bool, CacheError> {
        let mut state = self.state.write();
        Ok(state.message_mut(canonical)?.upvoters.remove(&voter))
    }

    pub fn has_upvoted(&self, canonical: CanonicalId, voter: RecipientId) -> Result<bool, CacheError> {
        let state = self.state.read();
        state
            .messages
            .get(&canonical)
            .map(|message| message.has_upvoted(voter))
            .ok_or(CacheError::CanonicalNotFound(canonical))
    }

    /// Flag the message as warned. Returns false if it already was.
    pub fn mark_moderated(&self, canonical: CanonicalId) -> Result<bool, CacheError> {
        let mut state = self.state.write();
        let message = state.message_mut(canonical)?;
        if message.moderation_flag {
            return Ok(false);
        }
        message.moderation_flag = true;
        Ok(true)
    }

    /// Clear the warned flag after a warning failed to apply.
    pub fn clear_moderated(&self, canonical: CanonicalId) -> Result<(), CacheError> {
        let mut state = self.state.write();
        state.message_mut(canonical)?.moderation_flag = false;
        Ok(())
    }

    /// Drop a canonical message and all of its mappings.
    ///
    /// Returns the copies that were mapped, ordered by recipient.
    pub fn remove_canonical(
        &self,
        canonical: CanonicalId,
    ) -> Result<Vec<(RecipientId, CopyId)>, CacheError> {
        let mut state = self.state.write();
        if state.messages.remove(&canonical).is_none() {
            return Err(CacheError::CanonicalNotFound(canonical));
        }
        let mut copies: Vec<_> = state
            .purge_copies(&[canonical])
            .into_iter()
            .map(|(recipient, _, copy)| (recipient, copy))
            .collect();
        copies.sort_unstable();
        Ok(copies)
    }

    /// Evict every message older than the TTL, with its mappings.
    ///
    /// The whole sweep runs under one write lock. Returns the evicted ids in
    /// ascending order.
    pub fn expire(&self, now: Timestamp) -> Vec<CanonicalId> {
        let mut state = self.state.write();
        let mut expired: Vec<CanonicalId> = state
            .messages
            .values()
            .filter(|message| message.is_expired(now, self.ttl))
            .map(|message| message.id)
            .collect();
        if expired.is_empty() {
            return expired;
        }
        expired.sort_unstable();

        for id in &expired {
            state.messages.remove(id);
        }
        state.purge_copies(&expired);
        expired
    }

    /// Number of cached canonical messages.
    #[must_use]
    pub fn len(&self) -> usize {
        self.state.read().messages.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.state.read().messages.is_empty()
    }

    /// Number of recipients holding at least one mapped copy.
    #[must_use]
    pub fn recipients_mapped(&self) -> usize {
        self.state.read().copies.len()
    }
}
