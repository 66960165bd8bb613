//! # Relay Flows
//!
//! One message from admission to the last delivered copy, across the
//! service, the delivery pipeline, the cache and the ledger.
//!
//! ```text
//! A ──submit──→ [admission] ──→ [cache: #1] ──→ [ledger: 0/2]
//!                                   │
//!                   ┌───────────────┴───────────────┐
//!                   ↓                               ↓
//!            worker → B (copy)               worker → C (copy)
//!                   └──────→ [ledger: 2/2 → removed] ←──┘
//! ```

#[cfg(test)]
mod tests {
    use super::super::support::*;
    use relay_core::ports::TransportError;
    use relay_core::{PipelineConfig, RelayApi, RelayConfig, RelayError};
    use shared_types::{CopyId, RecipientId, Timestamp};
    use std::collections::HashSet;
    use std::time::Duration;
    use tokio::time::Instant;

    // =========================================================================
    // FAN-OUT
    // =========================================================================

    #[tokio::test(start_paused = true)]
    async fn test_message_reaches_every_other_member() {
        let fx = Fixture::new(&[A, B, C]);

        let id = fx
            .relay
            .submit_inbound(Fixture::text(A, 1, "hello"))
            .await
            .unwrap();

        // Jobs are queued, nothing is sent yet
        assert_eq!(fx.relay.ledger().progress(id), Some((0, 2)));

        fx.relay.drained().await;

        assert_eq!(fx.transport.sent_to(A).len(), 0);
        let to_b = fx.transport.sent_to(B);
        let to_c = fx.transport.sent_to(C);
        assert_eq!(to_b.len(), 1);
        assert_eq!(to_c.len(), 1);
        assert_eq!(to_b[0].payload.text, "hello");

        // Broadcast finished and every copy maps back to the canonical id
        assert_eq!(fx.relay.ledger().progress(id), None);
        assert_eq!(fx.relay.resolve_reply(A, CopyId(1)).unwrap(), id);
        assert_eq!(fx.relay.resolve_reply(B, to_b[0].copy).unwrap(), id);
        assert_eq!(fx.relay.resolve_reply(C, to_c[0].copy).unwrap(), id);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reply_threads_onto_each_recipients_copy() {
        let fx = Fixture::new(&[A, B, C]);
        let first = fx.send_and_drain(Fixture::text(A, 1, "question")).await;
        let b_copy = fx.transport.sent_to(B)[0].copy;
        let c_copy = fx.transport.sent_to(C)[0].copy;

        // B answers its own copy of the question
        let reply = Fixture::text(B, 50, "answer").replying_to(b_copy);
        let second = fx.send_and_drain(reply).await;
        assert_ne!(first, second);

        let to_a = fx.transport.sent_to(A);
        let to_c = fx.transport.sent_to(C);
        assert_eq!(to_a.len(), 1);
        assert_eq!(to_a[0].payload.reply_to, Some(CopyId(1)));
        assert_eq!(to_c.len(), 2);
        assert_eq!(to_c[1].payload.reply_to, Some(c_copy));
    }

    #[tokio::test(start_paused = true)]
    async fn test_reply_to_unknown_copy_is_sent_unthreaded() {
        let fx = Fixture::new(&[A, B]);

        let reply = Fixture::text(A, 1, "orphan").replying_to(CopyId(999));
        fx.send_and_drain(reply).await;

        let to_b = fx.transport.sent_to(B);
        assert_eq!(to_b.len(), 1);
        assert_eq!(to_b[0].payload.reply_to, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_departed_members_are_skipped() {
        let fx = Fixture::new(&[A, B, C]);
        fx.directory.leave(C, Timestamp::new(EPOCH)).unwrap();

        let id = fx
            .relay
            .submit_inbound(Fixture::text(A, 1, "hi"))
            .await
            .unwrap();
        assert_eq!(fx.relay.ledger().progress(id), Some((0, 1)));

        fx.relay.drained().await;
        assert_eq!(fx.transport.sent_to(B).len(), 1);
        assert!(fx.transport.sent_to(C).is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_lone_member_opens_no_broadcast() {
        let fx = Fixture::new(&[A]);

        let id = fx
            .relay
            .submit_inbound(Fixture::text(A, 1, "anyone?"))
            .await
            .unwrap();

        assert_eq!(fx.relay.ledger().progress(id), None);
        fx.relay.drained().await;
        assert!(fx.transport.sent().is_empty());
        assert_eq!(fx.relay.resolve_reply(A, CopyId(1)).unwrap(), id);
    }

    #[tokio::test(start_paused = true)]
    async fn test_debug_mode_echoes_to_sender() {
        let fx = Fixture::new(&[A, B]);
        fx.directory
            .update(A, |profile| profile.debug_enabled = true)
            .unwrap();

        let id = fx.send_and_drain(Fixture::text(A, 1, "echo")).await;

        let echoed = fx.transport.sent_to(A);
        assert_eq!(echoed.len(), 1);
        assert_eq!(fx.relay.resolve_reply(A, echoed[0].copy).unwrap(), id);
        // The original is not tracked, the echo is
        assert!(fx.relay.resolve_reply(A, CopyId(1)).is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_sender_moves_to_front_of_roster() {
        let fx = Fixture::new(&[A, B, C]);
        assert_eq!(fx.relay.roster().get(), vec![A, B, C]);

        fx.send_and_drain(Fixture::text(C, 1, "me first")).await;

        assert_eq!(fx.relay.roster().get()[0], C);
    }

    // =========================================================================
    // THROTTLING AND FAILURES
    // =========================================================================

    #[tokio::test(start_paused = true)]
    async fn test_throttled_copy_is_retried_after_the_hint() {
        let fx = Fixture::new(&[A, B, C]);
        let hint = Duration::from_secs(3);
        fx.transport
            .script_failure(B, TransportError::RateLimited { retry_after: hint });
        fx.transport
            .script_failure(B, TransportError::RateLimited { retry_after: hint });

        let start = Instant::now();
        let id = fx.send_and_drain(Fixture::text(A, 1, "patience")).await;

        assert!(start.elapsed() >= hint * 2);
        assert_eq!(fx.transport.sent_to(B).len(), 1);
        assert_eq!(fx.transport.sent_to(C).len(), 1);
        assert_eq!(fx.transport.send_attempts(), 4);
        assert_eq!(fx.relay.ledger().progress(id), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_permanent_failure_still_completes_broadcast() {
        let fx = Fixture::new(&[A, B, C]);
        fx.transport
            .script_failure(B, TransportError::Failed("bot was blocked".into()));

        let id = fx.send_and_drain(Fixture::text(A, 1, "hi")).await;

        assert!(fx.transport.sent_to(B).is_empty());
        assert_eq!(fx.transport.sent_to(C).len(), 1);
        assert_eq!(fx.relay.ledger().progress(id), None);
        assert!(fx.relay.ledger().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_single_worker_keeps_order_and_rate() {
        let config = RelayConfig {
            pipeline: PipelineConfig {
                workers: 1,
                max_calls_per_second: 10.0,
            },
            ..RelayConfig::default()
        };
        let fx = Fixture::with_config(config, &[A, B, C]);

        let start = Instant::now();
        for (i, body) in ["one", "two", "three"].into_iter().enumerate() {
            fx.relay
                .submit_inbound(Fixture::text(A, i as i64 + 1, body))
                .await
                .unwrap();
        }
        fx.relay.drained().await;

        let texts: Vec<_> = fx
            .transport
            .sent_to(B)
            .into_iter()
            .map(|sent| sent.payload.text)
            .collect();
        assert_eq!(texts, vec!["one", "two", "three"]);

        // Six sends, 100ms apart after the first
        assert_eq!(fx.transport.sent().len(), 6);
        assert!(start.elapsed() >= Duration::from_millis(500));
    }

    // =========================================================================
    // CANCELLATION
    // =========================================================================

    #[tokio::test(start_paused = true)]
    async fn test_delete_mid_broadcast_leaves_no_copy_behind() {
        let others: Vec<RecipientId> = (2..=9).map(RecipientId).collect();
        let mut members = vec![A];
        members.extend(&others);
        let fx = Fixture::new(&members);
        fx.transport.set_send_delay(Duration::from_millis(50));

        let id = fx
            .relay
            .submit_inbound(Fixture::text(A, 1, "regret"))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;

        let report = fx.relay.moderate_delete(id).await.unwrap();
        assert!(report.cancelled_broadcast);
        fx.relay.drained().await;

        let sent: HashSet<_> = fx.copies_sent().into_iter().collect();
        let retracted: HashSet<_> = fx.transport.retracted().into_iter().collect();
        assert!(!sent.is_empty());
        assert!(sent.len() < others.len());
        assert_eq!(sent, retracted);

        assert!(fx.relay.ledger().is_empty());
        assert!(matches!(
            fx.relay.moderate_delete(id).await,
            Err(RelayError::NotFound(_))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_finishes_queued_deliveries() {
        let fx = Fixture::new(&[A, B, C]);

        fx.relay
            .submit_inbound(Fixture::text(A, 1, "last words"))
            .await
            .unwrap();
        fx.relay.shutdown().await;

        assert_eq!(fx.transport.sent().len(), 2);
        assert!(fx.relay.ledger().is_empty());
    }
}
