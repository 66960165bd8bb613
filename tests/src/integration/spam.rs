//! # Spam Flows
//!
//! Bursts past the spam limit are rejected and punished; the scheduled decay
//! lets the sender back in.

#[cfg(test)]
mod tests {
    use super::super::support::*;
    use relay_core::ports::SystemNotice;
    use relay_core::{AdmissionRejected, RelayApi, RelayConfig, RelayError, SpamConfig};
    use relay_runtime::wiring::spawn_maintenance;
    use shared_types::{ContentKind, InboundMessage};
    use std::time::Duration;
    use tokio::sync::watch;

    /// Every message costs 0.7, so four fit under the limit of 3.
    fn flat_cost_config() -> RelayConfig {
        RelayConfig {
            spam: SpamConfig {
                score_base_message: 0.7,
                score_text_character: 0.0,
                score_text_linebreak: 0.0,
                ..SpamConfig::default()
            },
            ..RelayConfig::default()
        }
    }

    async fn burst(fx: &Fixture, count: i64) -> Vec<Result<shared_types::CanonicalId, RelayError>> {
        let mut results = Vec::new();
        for origin in 1..=count {
            results.push(
                fx.relay
                    .submit_inbound(Fixture::text(D, origin, "buy now"))
                    .await,
            );
        }
        results
    }

    // =========================================================================
    // BURST AND RECOVERY
    // =========================================================================

    #[tokio::test(start_paused = true)]
    async fn test_burst_is_cut_off_and_decays_away() {
        let fx = Fixture::with_config(flat_cost_config(), &[A, B, D]);

        let results = burst(&fx, 5).await;
        assert!(results[..4].iter().all(Result::is_ok));
        assert!(matches!(
            results[4],
            Err(RelayError::Admission(AdmissionRejected::SpamLimit))
        ));
        assert_eq!(fx.relay.scores().score(D), Some(6.0));
        assert_eq!(fx.relay.cache().len(), 4);

        let rejection = fx.transport.notices_for(D);
        assert_eq!(rejection.len(), 1);
        assert_eq!(
            rejection[0].notice,
            SystemNotice::Rejected(AdmissionRejected::SpamLimit)
        );

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let tasks = spawn_maintenance(
            fx.relay.clone(),
            Duration::from_secs(5),
            Duration::from_secs(6 * 60 * 60),
            shutdown_rx,
        );

        tokio::time::sleep(Duration::from_millis(5_100)).await;
        assert_eq!(fx.relay.scores().score(D), Some(5.0));

        tokio::time::sleep(Duration::from_secs(25)).await;
        assert_eq!(fx.relay.scores().score(D), None);

        fx.relay
            .submit_inbound(Fixture::text(D, 6, "hello again"))
            .await
            .unwrap();
        assert_eq!(fx.relay.scores().score(D), Some(0.7));

        shutdown_tx.send(true).unwrap();
        for task in tasks {
            task.await.unwrap();
        }
        fx.relay.drained().await;
        assert_eq!(fx.transport.sent_to(A).len(), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sending_before_recovery_resets_the_penalty() {
        let fx = Fixture::with_config(flat_cost_config(), &[A, D]);
        burst(&fx, 5).await;

        for _ in 0..3 {
            fx.relay.decay_scores();
        }
        assert_eq!(fx.relay.scores().score(D), Some(3.0));

        let err = fx
            .relay
            .submit_inbound(Fixture::text(D, 9, "still here"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            RelayError::Admission(AdmissionRejected::SpamLimit)
        ));
        assert_eq!(fx.relay.scores().score(D), Some(6.0));
    }

    #[tokio::test(start_paused = true)]
    async fn test_scores_are_per_sender() {
        let fx = Fixture::with_config(flat_cost_config(), &[A, B, D]);
        burst(&fx, 5).await;

        fx.send_and_drain(Fixture::text(A, 1, "unrelated")).await;

        assert_eq!(fx.relay.scores().score(A), Some(0.7));
        assert_eq!(fx.relay.scores().score(B), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stickers_hit_the_limit_sooner() {
        let fx = Fixture::new(&[A, B]);
        let sticker = |origin| InboundMessage {
            content: ContentKind::Sticker,
            file: Some("sticker-id".into()),
            ..Fixture::text(A, origin, "")
        };

        fx.relay.submit_inbound(sticker(1)).await.unwrap();
        fx.relay.submit_inbound(sticker(2)).await.unwrap();
        let err = fx.relay.submit_inbound(sticker(3)).await.unwrap_err();

        assert!(matches!(
            err,
            RelayError::Admission(AdmissionRejected::SpamLimit)
        ));
    }
}
