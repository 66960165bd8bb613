//! # Relay Service
//!
//! Orchestrates admission, fan-out and moderation over the domain
//! components.
//!
//! ## Admission order
//!
//! 1. Sender standing and content policy ([`check_admission`])
//! 2. Spam score ([`SpamScorekeeper::increase`] with [`spam_cost`])
//!
//! A rejected message is reported to its sender and never reaches the cache.
//!
//! ## Fan-out
//!
//! The sender's own message is recorded as their copy directly, unless they
//! asked for an echo. Every other active roster member gets a
//! [`DeliveryJob`]. The ledger is opened with the number of jobs before the
//! first job is queued.
//!
//! ## Moderation
//!
//! Always keyed by [`CanonicalId`]. A delete cancels the broadcast first and
//! purges the cache before retracting, so a copy that lands afterwards is
//! retracted by the worker that delivered it.

use async_trait::async_trait;
use shared_types::{CanonicalId, CopyId, InboundMessage, RecipientId};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::domain::{
    check_admission, cooldown_for, spam_cost, AdmissionRejected, BroadcastLedger, RecipientRoster,
    RelayCache, RelayConfig, RetractionReport, SpamScorekeeper, UpvoteOutcome,
};
use crate::events::RelayError;
use crate::pipeline::{retract_with_retry, DeliveryContext, DeliveryJob, DeliveryPipeline};
use crate::ports::inbound::RelayApi;
use crate::ports::outbound::{
    DirectoryError, MessageFormatter, Notifier, SystemNotice, TimeSource, Transport, UserDirectory,
};

/// Relay service.
///
/// ## Dependencies
///
/// - `T: Transport + Notifier` - chat platform client
/// - `D: UserDirectory` - member profiles
/// - `F: MessageFormatter` - per-recipient payloads
/// - `C: TimeSource` - clock
pub struct RelayService<T, D, F, C>
where
    T: Transport + Notifier,
    D: UserDirectory,
    F: MessageFormatter,
    C: TimeSource,
{
    config: RelayConfig,
    roster: RecipientRoster,
    cache: Arc<RelayCache>,
    ledger: Arc<BroadcastLedger>,
    scores: SpamScorekeeper,
    pipeline: DeliveryPipeline,
    transport: Arc<T>,
    directory: Arc<D>,
    clock: Arc<C>,
    _formatter: std::marker::PhantomData<F>,
}

impl<T, D, F, C> RelayService<T, D, F, C>
where
    T: Transport + Notifier,
    D: UserDirectory,
    F: MessageFormatter,
    C: TimeSource,
{
    /// Build the service and start its delivery workers.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime.
    pub fn new(
        config: RelayConfig,
        transport: Arc<T>,
        directory: Arc<D>,
        formatter: Arc<F>,
        clock: Arc<C>,
    ) -> Self {
        let cache = Arc::new(RelayCache::new(config.cache.ttl));
        let ledger = Arc::new(BroadcastLedger::new());
        let context = Arc::new(DeliveryContext {
            transport: Arc::clone(&transport),
            formatter,
            cache: Arc::clone(&cache),
            ledger: Arc::clone(&ledger),
        });
        let pipeline = DeliveryPipeline::spawn(&config.pipeline, context);

        Self {
            roster: RecipientRoster::new(),
            scores: SpamScorekeeper::from_config(&config.spam),
            config,
            cache,
            ledger,
            pipeline,
            transport,
            directory,
            clock,
            _formatter: std::marker::PhantomData,
        }
    }

    pub fn config(&self) -> &RelayConfig {
        &self.config
    }

    pub fn roster(&self) -> &RecipientRoster {
        &self.roster
    }

    pub fn cache(&self) -> &RelayCache {
        &self.cache
    }

    pub fn ledger(&self) -> &BroadcastLedger {
        &self.ledger
    }

    pub fn scores(&self) -> &SpamScorekeeper {
        &self.scores
    }

    /// Resolves once every queued delivery has finished.
    pub async fn drained(&self) {
        self.pipeline.drained().await;
    }

    /// Finish queued deliveries and stop the workers.
    pub async fn shutdown(&self) {
        self.pipeline.shutdown().await;
    }

    async fn send_notice(&self, recipient: RecipientId, notice: SystemNotice, reply_to: Option<CopyId>) {
        if let Err(e) = self.transport.notify(recipient, notice, reply_to).await {
            warn!("[relay] Could not notify {}: {}", recipient, e);
        }
    }

    async fn reject(&self, message: &InboundMessage, reason: AdmissionRejected) -> RelayError {
        debug!("[relay] Rejected message from {}: {}", message.sender, reason);
        self.send_notice(
            message.sender,
            SystemNotice::Rejected(reason.clone()),
            Some(message.origin_copy),
        )
        .await;
        RelayError::Admission(reason)
    }

    async fn delete(&self, canonical: CanonicalId, notify_sender: bool) -> Result<RetractionReport, RelayError> {
        let message = self.cache.get_canonical(canonical)?;
        let mut report = RetractionReport::new(canonical);

        report.cancelled_broadcast = self.ledger.cancel(canonical);
        let copies = self.cache.remove_canonical(canonical)?;

        for (recipient, copy) in copies {
            // The sender's own message stays; a relayed echo goes
            if recipient == message.sender && Some(copy) == message.origin_copy {
                continue;
            }
            match retract_with_retry(self.transport.as_ref(), recipient, copy).await {
                Ok(()) => report.retracted += 1,
                Err(e) => {
                    warn!(
                        "[relay] Could not retract copy {} of {} for {}: {}",
                        copy, canonical, recipient, e
                    );
                    report.failed += 1;
                }
            }
        }

        if notify_sender {
            self.send_notice(message.sender, SystemNotice::MessageDeleted, message.origin_copy)
                .await;
        }

        info!(
            "[relay] Deleted {}: {} copies retracted, {} failed",
            canonical, report.retracted, report.failed
        );
        Ok(report)
    }

    fn apply_warning(&self, sender: RecipientId) -> Result<Duration, RelayError> {
        let profile = self
            .directory
            .profile(sender)
            .ok_or(DirectoryError::UnknownMember(sender))?;
        let cooldown = cooldown_for(profile.warnings, &self.config.cooldown);
        let until = self.clock.now().add_secs(cooldown.as_secs());
        self.directory
            .apply_warning(sender, until, self.config.karma.warn_penalty)?;
        Ok(cooldown)
    }

    async fn warn_sender(&self, canonical: CanonicalId, deleting: bool) -> Result<Duration, RelayError> {
        let message = self.cache.get_canonical(canonical)?;
        if !self.cache.mark_moderated(canonical)? {
            return Err(RelayError::AlreadyWarned(canonical));
        }

        let cooldown = match self.apply_warning(message.sender) {
            Ok(cooldown) => cooldown,
            Err(e) => {
                if let Err(clear) = self.cache.clear_moderated(canonical) {
                    debug!("[relay] Warned flag of {} not restored: {}", canonical, clear);
                }
                return Err(e);
            }
        };

        let anchor = self.cache.lookup_delivered_copy(message.sender, canonical).ok();
        self.send_notice(
            message.sender,
            SystemNotice::GivenCooldown {
                duration: cooldown,
                deleted: deleting,
            },
            anchor,
        )
        .await;

        info!(
            "[relay] Warned sender of {} with a {:?} cooldown",
            canonical, cooldown
        );
        Ok(cooldown)
    }
}

#[async_trait]
impl<T, D, F, C> RelayApi for RelayService<T, D, F, C>
where
    T: Transport + Notifier,
    D: UserDirectory,
    F: MessageFormatter,
    C: TimeSource,
{
    async fn submit_inbound(&self, message: InboundMessage) -> Result<CanonicalId, RelayError> {
        let now = self.clock.now();
        let sender = message.sender;
        let profile = self.directory.profile(sender);

        if let Err(reason) = check_admission(profile.as_ref(), &message, &self.config.limits, now) {
            return Err(self.reject(&message, reason).await);
        }
        if !self.scores.increase(sender, spam_cost(&message, &self.config.spam)) {
            return Err(self.reject(&message, AdmissionRejected::SpamLimit).await);
        }

        let reply_to = message.reply_to.and_then(|copy| {
            match self.cache.lookup_canonical_from_copy(sender, copy) {
                Ok(canonical) => Some(canonical),
                Err(e) => {
                    debug!("[relay] Reply target not relayed: {}", e);
                    None
                }
            }
        });

        let canonical_id = self.cache.create_canonical(sender, now);
        let echo = profile.is_some_and(|p| p.debug_enabled);
        if !echo {
            if let Err(e) = self.cache.record_origin(canonical_id, message.origin_copy) {
                warn!("[relay] Could not record sender copy of {}: {}", canonical_id, e);
            }
        }
        self.roster.update(sender);

        let message = Arc::new(message);
        let mut jobs = Vec::new();
        for recipient in self.roster.get() {
            if recipient == sender {
                if !echo {
                    continue;
                }
            } else if !self
                .directory
                .profile(recipient)
                .is_some_and(|p| p.is_active())
            {
                debug!("[relay] Skipping inactive recipient {}", recipient);
                continue;
            }
            jobs.push(DeliveryJob {
                canonical_id,
                recipient,
                message: Arc::clone(&message),
                reply_to,
            });
        }

        let total = jobs.len();
        self.ledger.open(canonical_id, total);
        for job in jobs {
            if !self.pipeline.submit(job) {
                warn!("[relay] Delivery pipeline closed, dropping job for {}", canonical_id);
            }
        }

        info!(
            "[relay] Admitted {} from {}, fanning out to {} recipients",
            canonical_id, sender, total
        );
        Ok(canonical_id)
    }

    async fn moderate_delete(&self, canonical: CanonicalId) -> Result<RetractionReport, RelayError> {
        self.delete(canonical, true).await
    }

    async fn moderate_warn(&self, canonical: CanonicalId) -> Result<Duration, RelayError> {
        self.warn_sender(canonical, false).await
    }

    async fn moderate_warn_and_delete(
        &self,
        canonical: CanonicalId,
    ) -> Result<(Duration, RetractionReport), RelayError> {
        let cooldown = self.warn_sender(canonical, true).await?;
        let report = self.delete(canonical, false).await?;
        Ok((cooldown, report))
    }

    async fn upvote(
        &self,
        canonical: CanonicalId,
        voter: RecipientId,
    ) -> Result<UpvoteOutcome, RelayError> {
        let message = self.cache.get_canonical(canonical)?;
        if message.sender == voter {
            return Ok(UpvoteOutcome::SelfUpvote);
        }
        if !self.cache.add_upvote(canonical, voter)? {
            return Ok(UpvoteOutcome::AlreadyUpvoted);
        }

        let author = match self
            .directory
            .adjust_karma(message.sender, self.config.karma.plus_one)
        {
            Ok(author) => author,
            Err(e) => {
                if let Err(withdraw) = self.cache.withdraw_upvote(canonical, voter) {
                    debug!("[relay] Vote on {} not withdrawn: {}", canonical, withdraw);
                }
                return Err(e.into());
            }
        };
        if !author.hide_karma {
            let anchor = self.cache.lookup_delivered_copy(message.sender, canonical).ok();
            self.send_notice(message.sender, SystemNotice::KarmaReceived, anchor)
                .await;
        }
        let anchor = self.cache.lookup_delivered_copy(voter, canonical).ok();
        self.send_notice(voter, SystemNotice::KarmaThanks, anchor).await;

        debug!("[relay] {} upvoted {}", voter, canonical);
        Ok(UpvoteOutcome::Accepted)
    }

    fn resolve_reply(&self, recipient: RecipientId, copy: CopyId) -> Result<CanonicalId, RelayError> {
        Ok(self.cache.lookup_canonical_from_copy(recipient, copy)?)
    }

    fn decay_scores(&self) {
        self.scores.decay();
    }

    fn expire_cache(&self) -> usize {
        let expired = self.cache.expire(self.clock.now());
        for id in &expired {
            self.ledger.cancel(*id);
        }
        if !expired.is_empty() {
            info!("[relay] Expired {} cached messages", expired.len());
        }
        expired.len()
    }

    fn join(&self, id: RecipientId) -> bool {
        self.roster.add(id)
    }

    fn leave(&self, id: RecipientId) -> bool {
        self.roster.remove(id)
    }
}
