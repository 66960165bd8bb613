//! # Admission Rules
//!
//! Checks applied to an inbound message before it is scored for spam:
//!
//! 1. Sender standing: member, not banned, not cooling down
//! 2. Content policy: disabled content kinds, media restriction for new members

use shared_types::{ContentKind, InboundMessage, Timestamp, UserProfile};
use thiserror::Error;

use super::LimitsConfig;

/// Reason a message was not relayed. Reported back to the sender.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AdmissionRejected {
    #[error("Sender is not in the chat")]
    NotInChat,

    #[error("Sender is blacklisted")]
    Blacklisted { reason: Option<String> },

    #[error("Sender is on cooldown until {}", .until.as_secs())]
    OnCooldown { until: Timestamp },

    #[error("Spam limit reached")]
    SpamLimit,

    #[error("Media is not allowed yet")]
    MediaRestricted { until: Timestamp },

    #[error("Content of kind {0} is disabled")]
    ContentDisabled(ContentKind),
}

/// Sender standing and content policy checks.
///
/// `profile` is `None` when the directory does not know the sender.
pub fn check_admission(
    profile: Option<&UserProfile>,
    message: &InboundMessage,
    limits: &LimitsConfig,
    now: Timestamp,
) -> Result<(), AdmissionRejected> {
    let profile = profile.ok_or(AdmissionRejected::NotInChat)?;

    if profile.is_blacklisted() {
        return Err(AdmissionRejected::Blacklisted {
            reason: profile.blacklist_reason.clone(),
        });
    }
    if !profile.is_active() {
        return Err(AdmissionRejected::NotInChat);
    }
    if profile.is_in_cooldown(now) {
        if let Some(until) = profile.cooldown_until {
            return Err(AdmissionRejected::OnCooldown { until });
        }
    }

    match message.content {
        ContentKind::Document if !limits.allow_documents => {
            return Err(AdmissionRejected::ContentDisabled(message.content));
        }
        ContentKind::Contact if !limits.allow_contacts => {
            return Err(AdmissionRejected::ContentDisabled(message.content));
        }
        _ => {}
    }

    if !limits.media_limit_period.is_zero()
        && (message.content.carries_file() || message.forwarded)
    {
        let until = profile
            .joined_at
            .add_secs(limits.media_limit_period.as_secs());
        if now < until {
            return Err(AdmissionRejected::MediaRestricted { until });
        }
    }

    Ok(())
}
