//! Shared fixtures for the integration scenarios.

use relay_core::adapters::{MemoryDirectory, PlainFormatter};
use relay_core::test_utils::{ManualClock, RecordingTransport};
use relay_core::{RelayApi, RelayConfig, RelayService};
use shared_types::{CopyId, InboundMessage, RecipientId, Timestamp};
use std::sync::Arc;

pub const A: RecipientId = RecipientId(1);
pub const B: RecipientId = RecipientId(2);
pub const C: RecipientId = RecipientId(3);
pub const D: RecipientId = RecipientId(4);

/// Clock start for every scenario.
pub const EPOCH: u64 = 1_700_000_000;

pub type TestRelay = RelayService<RecordingTransport, MemoryDirectory, PlainFormatter, ManualClock>;

/// A relay with recording doubles for every port.
pub struct Fixture {
    pub relay: Arc<TestRelay>,
    pub transport: Arc<RecordingTransport>,
    pub directory: Arc<MemoryDirectory>,
    pub clock: Arc<ManualClock>,
}

impl Fixture {
    /// Relay with default configuration and the given members joined.
    pub fn new(members: &[RecipientId]) -> Self {
        Self::with_config(RelayConfig::default(), members)
    }

    pub fn with_config(config: RelayConfig, members: &[RecipientId]) -> Self {
        let transport = Arc::new(RecordingTransport::new());
        let directory = Arc::new(MemoryDirectory::new());
        let clock = Arc::new(ManualClock::new(EPOCH));
        let relay = Arc::new(RelayService::new(
            config,
            Arc::clone(&transport),
            Arc::clone(&directory),
            Arc::new(PlainFormatter),
            Arc::clone(&clock),
        ));

        for id in members {
            directory.join(*id, Timestamp::new(EPOCH - 86_400));
            relay.join(*id);
        }

        Self {
            relay,
            transport,
            directory,
            clock,
        }
    }

    /// Text from `sender`, typed as message `origin` in their own chat.
    pub fn text(sender: RecipientId, origin: i64, body: &str) -> InboundMessage {
        InboundMessage::text(sender, CopyId(origin), body)
    }

    /// Copy ids the transport accepted, per recipient.
    pub fn copies_sent(&self) -> Vec<(RecipientId, CopyId)> {
        let mut copies: Vec<_> = self
            .transport
            .sent()
            .into_iter()
            .map(|sent| (sent.recipient, sent.copy))
            .collect();
        copies.sort_unstable();
        copies
    }

    pub async fn send_and_drain(&self, message: InboundMessage) -> shared_types::CanonicalId {
        let id = self
            .relay
            .submit_inbound(message)
            .await
            .expect("message should be admitted");
        self.relay.drained().await;
        id
    }
}
