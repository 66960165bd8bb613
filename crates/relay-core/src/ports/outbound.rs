//! # Outbound Ports
//!
//! Everything the relay needs from the outside world: the chat platform, the
//! member profile store and a clock.

use async_trait::async_trait;
use shared_types::{ContentKind, CopyId, InboundMessage, RecipientId, Timestamp, UserProfile};
use std::fmt;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use thiserror::Error;

use crate::domain::AdmissionRejected;

/// Chat platform failures.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// Throttled by the platform. Always retried.
    #[error("Rate limited, retry after {retry_after:?}")]
    RateLimited { retry_after: Duration },

    /// Permanent failure (blocked bot, deleted chat, bad payload).
    #[error("Transport failure: {0}")]
    Failed(String),
}

/// Message as it is sent to one recipient.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OutboundPayload {
    pub content: ContentKind,
    pub text: String,
    pub file: Option<String>,
    pub forwarded: bool,
    /// Recipient's own copy of the message being replied to.
    pub reply_to: Option<CopyId>,
}

/// Chat platform client.
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    /// Send a payload; returns the id of the copy in the recipient's chat.
    async fn send(
        &self,
        recipient: RecipientId,
        payload: OutboundPayload,
    ) -> Result<CopyId, TransportError>;

    /// Delete a previously delivered copy.
    async fn retract(&self, recipient: RecipientId, copy: CopyId) -> Result<(), TransportError>;
}

/// Builds the per-recipient payload.
pub trait MessageFormatter: Send + Sync + 'static {
    fn format(
        &self,
        message: &InboundMessage,
        recipient: RecipientId,
        reply_to: Option<CopyId>,
    ) -> OutboundPayload;
}

/// Profile store failures.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DirectoryError {
    #[error("Unknown member: {0}")]
    UnknownMember(RecipientId),

    #[error("Directory unavailable: {0}")]
    Unavailable(String),
}

/// Persistent member profiles.
pub trait UserDirectory: Send + Sync + 'static {
    fn profile(&self, id: RecipientId) -> Option<UserProfile>;

    /// Count a warning, start a cooldown and deduct karma.
    fn apply_warning(
        &self,
        id: RecipientId,
        cooldown_until: Timestamp,
        karma_penalty: i64,
    ) -> Result<UserProfile, DirectoryError>;

    fn adjust_karma(&self, id: RecipientId, delta: i64) -> Result<UserProfile, DirectoryError>;
}

/// Relay-generated messages addressed to a single member.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SystemNotice {
    Rejected(AdmissionRejected),
    MessageDeleted,
    GivenCooldown {
        duration: Duration,
        deleted: bool,
    },
    KarmaReceived,
    KarmaThanks,
}

impl fmt::Display for SystemNotice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SystemNotice::Rejected(AdmissionRejected::SpamLimit) => {
                f.write_str("Your message has not been sent. Avoid sending messages too fast, try again later.")
            }
            SystemNotice::Rejected(AdmissionRejected::OnCooldown { until }) => {
                write!(f, "You're on cooldown. Your cooldown expires at {}", until.as_secs())
            }
            SystemNotice::Rejected(AdmissionRejected::Blacklisted { reason }) => match reason {
                Some(reason) => write!(f, "You've been blacklisted for: {reason}"),
                None => f.write_str("You've been blacklisted"),
            },
            SystemNotice::Rejected(AdmissionRejected::NotInChat) => {
                f.write_str("You're not in the chat yet. Use /start to join")
            }
            SystemNotice::Rejected(AdmissionRejected::MediaRestricted { .. }) => {
                f.write_str("You can't send media or forward messages at this time, try again later.")
            }
            SystemNotice::Rejected(AdmissionRejected::ContentDisabled(kind)) => {
                write!(f, "Sending a {kind} is not allowed in this chat.")
            }
            SystemNotice::MessageDeleted => f.write_str(
                "Your message has been deleted. No cooldown has been given this time, but refrain from posting it again.",
            ),
            SystemNotice::GivenCooldown { duration, deleted } => {
                write!(
                    f,
                    "You've been handed a cooldown of {} minutes for this message",
                    duration.as_secs() / 60
                )?;
                if *deleted {
                    f.write_str(" (message also deleted)")?;
                }
                Ok(())
            }
            SystemNotice::KarmaReceived => f.write_str("You've just been given sweet karma! (check /info to see your karma or /toggleKarma to turn these notifications off)"),
            SystemNotice::KarmaThanks => f.write_str("You just gave this message some sweet karma, awesome!"),
        }
    }
}

/// Delivery of system notices.
#[async_trait]
pub trait Notifier: Send + Sync + 'static {
    /// `reply_to` anchors the notice on one of the member's own messages.
    async fn notify(
        &self,
        recipient: RecipientId,
        notice: SystemNotice,
        reply_to: Option<CopyId>,
    ) -> Result<(), TransportError>;
}

/// Abstract interface for time operations.
pub trait TimeSource: Send + Sync + 'static {
    fn now(&self) -> Timestamp;
}

/// Wall clock.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemTimeSource;

impl TimeSource for SystemTimeSource {
    fn now(&self) -> Timestamp {
        let secs = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        Timestamp::new(secs)
    }
}
