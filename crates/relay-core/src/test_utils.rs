//! Test utilities for the relay.
//!
//! Deterministic doubles for the outbound ports. Enable with the
//! `test-utils` feature flag.

use async_trait::async_trait;
use parking_lot::Mutex;
use shared_types::{CopyId, RecipientId, Timestamp};
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use crate::ports::outbound::{Notifier, OutboundPayload, SystemNotice, TimeSource, Transport, TransportError};

/// A clock that only moves when told to.
#[derive(Debug, Default)]
pub struct ManualClock {
    secs: AtomicU64,
}

impl ManualClock {
    pub fn new(secs: u64) -> Self {
        Self {
            secs: AtomicU64::new(secs),
        }
    }

    pub fn advance(&self, secs: u64) {
        self.secs.fetch_add(secs, Ordering::SeqCst);
    }

    pub fn set(&self, secs: u64) {
        self.secs.store(secs, Ordering::SeqCst);
    }
}

impl TimeSource for ManualClock {
    fn now(&self) -> Timestamp {
        Timestamp::new(self.secs.load(Ordering::SeqCst))
    }
}

/// A copy the transport accepted.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SentCopy {
    pub recipient: RecipientId,
    pub copy: CopyId,
    pub payload: OutboundPayload,
}

/// A notice the transport delivered.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SentNotice {
    pub recipient: RecipientId,
    pub notice: SystemNotice,
    pub reply_to: Option<CopyId>,
}

#[derive(Default)]
struct TransportLog {
    last_copy: i64,
    sent: Vec<SentCopy>,
    retracted: Vec<(RecipientId, CopyId)>,
    notices: Vec<SentNotice>,
    scripted: HashMap<RecipientId, VecDeque<TransportError>>,
    unreachable: HashSet<RecipientId>,
    send_delay: Duration,
    send_attempts: usize,
}

/// Transport and notifier that records everything and can be scripted to
/// fail.
///
/// Copy ids are allocated from a counter starting at 1001.
#[derive(Default)]
pub struct RecordingTransport {
    log: Mutex<TransportLog>,
}

impl RecordingTransport {
    pub fn new() -> Self {
        let transport = Self::default();
        transport.log.lock().last_copy = 1000;
        transport
    }

    /// The next send to `recipient` fails with `error`. Calls queue up.
    pub fn script_failure(&self, recipient: RecipientId, error: TransportError) {
        self.log
            .lock()
            .scripted
            .entry(recipient)
            .or_default()
            .push_back(error);
    }

    /// Every retraction in `recipient`'s chat fails.
    pub fn make_unreachable(&self, recipient: RecipientId) {
        self.log.lock().unreachable.insert(recipient);
    }

    /// Every send takes `delay` before it is accepted.
    pub fn set_send_delay(&self, delay: Duration) {
        self.log.lock().send_delay = delay;
    }

    pub fn sent(&self) -> Vec<SentCopy> {
        self.log.lock().sent.clone()
    }

    pub fn sent_to(&self, recipient: RecipientId) -> Vec<SentCopy> {
        self.log
            .lock()
            .sent
            .iter()
            .filter(|sent| sent.recipient == recipient)
            .cloned()
            .collect()
    }

    /// Sends attempted, including failed ones.
    pub fn send_attempts(&self) -> usize {
        self.log.lock().send_attempts
    }

    pub fn retracted(&self) -> Vec<(RecipientId, CopyId)> {
        self.log.lock().retracted.clone()
    }

    pub fn notices(&self) -> Vec<SentNotice> {
        self.log.lock().notices.clone()
    }

    pub fn notices_for(&self, recipient: RecipientId) -> Vec<SentNotice> {
        self.log
            .lock()
            .notices
            .iter()
            .filter(|notice| notice.recipient == recipient)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl Transport for RecordingTransport {
    async fn send(
        &self,
        recipient: RecipientId,
        payload: OutboundPayload,
    ) -> Result<CopyId, TransportError> {
        let delay = {
            let mut log = self.log.lock();
            log.send_attempts += 1;
            if let Some(error) = log.scripted.get_mut(&recipient).and_then(VecDeque::pop_front) {
                return Err(error);
            }
            log.send_delay
        };
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let mut log = self.log.lock();
        log.last_copy += 1;
        let copy = CopyId(log.last_copy);
        log.sent.push(SentCopy {
            recipient,
            copy,
            payload,
        });
        Ok(copy)
    }

    async fn retract(&self, recipient: RecipientId, copy: CopyId) -> Result<(), TransportError> {
        let mut log = self.log.lock();
        if log.unreachable.contains(&recipient) {
            return Err(TransportError::Failed(format!("chat {recipient} unreachable")));
        }
        log.retracted.push((recipient, copy));
        Ok(())
    }
}

#[async_trait]
impl Notifier for RecordingTransport {
    async fn notify(
        &self,
        recipient: RecipientId,
        notice: SystemNotice,
        reply_to: Option<CopyId>,
    ) -> Result<(), TransportError> {
        self.log.lock().notices.push(SentNotice {
            recipient,
            notice,
            reply_to,
        });
        Ok(())
    }
}
