//! Inbound port: the operations offered to the platform glue.

use async_trait::async_trait;
use shared_types::{CanonicalId, CopyId, InboundMessage, RecipientId};
use std::time::Duration;

use crate::domain::{RetractionReport, UpvoteOutcome};
use crate::events::RelayError;

/// Primary API of the relay.
#[async_trait]
pub trait RelayApi: Send + Sync {
    /// Admit a message and fan it out to every other active member.
    ///
    /// Returns as soon as the delivery jobs are queued. Rejections are also
    /// reported to the sender.
    async fn submit_inbound(&self, message: InboundMessage) -> Result<CanonicalId, RelayError>;

    /// Cancel fan-out, retract every delivered copy and forget the message.
    async fn moderate_delete(&self, canonical: CanonicalId) -> Result<RetractionReport, RelayError>;

    /// Warn the sender once for this message; returns the cooldown given.
    async fn moderate_warn(&self, canonical: CanonicalId) -> Result<Duration, RelayError>;

    /// Warn, then delete.
    async fn moderate_warn_and_delete(
        &self,
        canonical: CanonicalId,
    ) -> Result<(Duration, RetractionReport), RelayError>;

    async fn upvote(&self, canonical: CanonicalId, voter: RecipientId)
        -> Result<UpvoteOutcome, RelayError>;

    /// Turn a copy a member replied to into its canonical id.
    fn resolve_reply(&self, recipient: RecipientId, copy: CopyId) -> Result<CanonicalId, RelayError>;

    /// One spam decay tick.
    fn decay_scores(&self);

    /// Evict expired messages; returns how many were evicted.
    fn expire_cache(&self) -> usize;

    /// Add a member to the fan-out roster.
    fn join(&self, id: RecipientId) -> bool;

    /// Remove a member from the fan-out roster.
    fn leave(&self, id: RecipientId) -> bool;
}
