//! # Moderation Flows
//!
//! Moderator actions reach every copy a message was relayed as: deletes
//! retract them, warnings put the sender on cooldown, upvotes move karma.

#[cfg(test)]
mod tests {
    use super::super::support::*;
    use relay_core::ports::{SystemNotice, UserDirectory};
    use relay_core::{AdmissionRejected, RelayApi, RelayError, UpvoteOutcome};
    use shared_types::{CopyId, RecipientId, Timestamp, UserProfile};
    use std::time::Duration;

    fn profile(fx: &Fixture, id: RecipientId) -> UserProfile {
        fx.directory.profile(id).unwrap()
    }

    // =========================================================================
    // DELETE
    // =========================================================================

    #[tokio::test(start_paused = true)]
    async fn test_delete_retracts_every_relayed_copy() {
        let fx = Fixture::new(&[A, B, C]);
        let id = fx.send_and_drain(Fixture::text(A, 7, "oops")).await;

        let report = fx.relay.moderate_delete(id).await.unwrap();

        assert_eq!(report.canonical_id, id);
        assert_eq!(report.retracted, 2);
        assert_eq!(report.failed, 0);
        assert!(!report.cancelled_broadcast);

        let mut retracted = fx.transport.retracted();
        retracted.sort_unstable();
        assert_eq!(retracted, fx.copies_sent());

        // Sender keeps their original and is told about the delete
        let notices = fx.transport.notices_for(A);
        assert_eq!(notices.len(), 1);
        assert_eq!(notices[0].notice, SystemNotice::MessageDeleted);
        assert_eq!(notices[0].reply_to, Some(CopyId(7)));

        assert!(fx.relay.cache().is_empty());
        assert!(fx.relay.resolve_reply(B, fx.copies_sent()[0].1).is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_unreachable_copy_is_reported_not_fatal() {
        let fx = Fixture::new(&[A, B, C]);
        let id = fx.send_and_drain(Fixture::text(A, 1, "stuck")).await;
        fx.transport.make_unreachable(C);

        let report = fx.relay.moderate_delete(id).await.unwrap();

        assert_eq!(report.retracted, 1);
        assert_eq!(report.failed, 1);
        assert!(fx.relay.cache().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_delete_after_expiry_is_not_found() {
        let fx = Fixture::new(&[A, B]);
        let id = fx.send_and_drain(Fixture::text(A, 1, "old news")).await;

        fx.clock.advance(24 * 60 * 60 + 1);
        assert_eq!(fx.relay.expire_cache(), 1);

        let err = fx.relay.moderate_delete(id).await.unwrap_err();
        assert!(err.is_not_found());
        assert!(fx.transport.retracted().is_empty());

        let err = fx.relay.moderate_warn(id).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test(start_paused = true)]
    async fn test_expiry_keeps_messages_within_ttl() {
        let fx = Fixture::new(&[A, B]);
        fx.send_and_drain(Fixture::text(A, 1, "first")).await;
        fx.clock.advance(60 * 60);
        let fresh = fx.send_and_drain(Fixture::text(A, 2, "second")).await;

        fx.clock.advance(23 * 60 * 60 + 1);
        assert_eq!(fx.relay.expire_cache(), 1);
        assert_eq!(fx.relay.resolve_reply(A, CopyId(2)).unwrap(), fresh);
    }

    // =========================================================================
    // WARNINGS
    // =========================================================================

    #[tokio::test(start_paused = true)]
    async fn test_warnings_escalate_cooldown() {
        let fx = Fixture::new(&[A, B]);
        let first = fx.send_and_drain(Fixture::text(A, 1, "rude")).await;
        let second = fx.send_and_drain(Fixture::text(A, 2, "ruder")).await;

        let cooldown = fx.relay.moderate_warn(first).await.unwrap();
        assert_eq!(cooldown, Duration::from_secs(60));

        let warned = profile(&fx, A);
        assert_eq!(warned.warnings, 1);
        assert_eq!(warned.cooldown_until, Some(Timestamp::new(EPOCH + 60)));
        assert_eq!(warned.karma, -10);

        let notices = fx.transport.notices_for(A);
        assert_eq!(
            notices[0].notice,
            SystemNotice::GivenCooldown {
                duration: cooldown,
                deleted: false
            }
        );
        assert_eq!(notices[0].reply_to, Some(CopyId(1)));

        // One warning per message
        assert!(matches!(
            fx.relay.moderate_warn(first).await,
            Err(RelayError::AlreadyWarned(id)) if id == first
        ));

        fx.clock.advance(61);
        let cooldown = fx.relay.moderate_warn(second).await.unwrap();
        assert_eq!(cooldown, Duration::from_secs(5 * 60));
        assert_eq!(profile(&fx, A).warnings, 2);
        assert_eq!(profile(&fx, A).karma, -20);

        // Warned messages stay relayed
        assert!(fx.transport.retracted().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_sender_on_cooldown_is_rejected() {
        let fx = Fixture::new(&[A, B]);
        let id = fx.send_and_drain(Fixture::text(A, 1, "rude")).await;
        fx.relay.moderate_warn(id).await.unwrap();

        let err = fx
            .relay
            .submit_inbound(Fixture::text(A, 2, "sorry"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            RelayError::Admission(AdmissionRejected::OnCooldown { .. })
        ));

        let last = fx.transport.notices_for(A).pop().unwrap();
        assert!(matches!(
            last.notice,
            SystemNotice::Rejected(AdmissionRejected::OnCooldown { .. })
        ));
        assert_eq!(last.reply_to, Some(CopyId(2)));

        fx.clock.advance(60);
        fx.send_and_drain(Fixture::text(A, 3, "better now")).await;
        assert_eq!(fx.transport.sent_to(B).len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_warn_and_delete() {
        let fx = Fixture::new(&[A, B, C]);
        let id = fx.send_and_drain(Fixture::text(A, 1, "spam link")).await;

        let (cooldown, report) = fx.relay.moderate_warn_and_delete(id).await.unwrap();

        assert_eq!(cooldown, Duration::from_secs(60));
        assert_eq!(report.retracted, 2);
        assert_eq!(profile(&fx, A).warnings, 1);

        // A single notice that covers both actions
        let notices = fx.transport.notices_for(A);
        assert_eq!(notices.len(), 1);
        assert_eq!(
            notices[0].notice,
            SystemNotice::GivenCooldown {
                duration: cooldown,
                deleted: true
            }
        );
    }

    // =========================================================================
    // UPVOTES
    // =========================================================================

    #[tokio::test(start_paused = true)]
    async fn test_upvote_moves_karma_once() {
        let fx = Fixture::new(&[A, B, C]);
        let id = fx.send_and_drain(Fixture::text(A, 1, "good point")).await;
        let b_copy = fx.transport.sent_to(B)[0].copy;

        let voted = fx.relay.resolve_reply(B, b_copy).unwrap();
        assert_eq!(fx.relay.upvote(voted, B).await.unwrap(), UpvoteOutcome::Accepted);
        assert_eq!(fx.relay.upvote(id, B).await.unwrap(), UpvoteOutcome::AlreadyUpvoted);
        assert_eq!(fx.relay.upvote(id, C).await.unwrap(), UpvoteOutcome::Accepted);

        assert_eq!(profile(&fx, A).karma, 2);

        let to_author = fx.transport.notices_for(A);
        assert_eq!(to_author.len(), 2);
        assert!(to_author
            .iter()
            .all(|n| n.notice == SystemNotice::KarmaReceived && n.reply_to == Some(CopyId(1))));

        let to_voter = fx.transport.notices_for(B);
        assert_eq!(to_voter.len(), 1);
        assert_eq!(to_voter[0].notice, SystemNotice::KarmaThanks);
        assert_eq!(to_voter[0].reply_to, Some(b_copy));
    }

    #[tokio::test(start_paused = true)]
    async fn test_self_upvote_changes_nothing() {
        let fx = Fixture::new(&[A, B]);
        let id = fx.send_and_drain(Fixture::text(A, 1, "me")).await;

        assert_eq!(fx.relay.upvote(id, A).await.unwrap(), UpvoteOutcome::SelfUpvote);
        assert_eq!(profile(&fx, A).karma, 0);
        assert!(!fx.relay.cache().has_upvoted(id, A).unwrap());
        assert!(fx.transport.notices().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_hidden_karma_skips_author_notice() {
        let fx = Fixture::new(&[A, B]);
        fx.directory
            .update(A, |profile| profile.hide_karma = true)
            .unwrap();
        let id = fx.send_and_drain(Fixture::text(A, 1, "quiet")).await;

        fx.relay.upvote(id, B).await.unwrap();

        assert_eq!(profile(&fx, A).karma, 1);
        assert!(fx.transport.notices_for(A).is_empty());
        assert_eq!(fx.transport.notices_for(B).len(), 1);
    }
}
