//! # Core Entities
//!
//! Identifiers and the inbound message shape.
//!
//! ## Identifier Spaces
//!
//! - [`RecipientId`]: a channel member (also the chat the member is reached in)
//! - [`CanonicalId`]: the relay's own id for one inbound message
//! - [`CopyId`]: the platform id of one delivered copy, scoped to a recipient

use serde::{Deserialize, Serialize};
use std::fmt;

/// A channel member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RecipientId(pub i64);

impl fmt::Display for RecipientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Relay-assigned id of one inbound message, allocated from a monotonic counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CanonicalId(pub u64);

impl fmt::Display for CanonicalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Platform message id of a copy, only unique within one recipient's chat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CopyId(pub i64);

impl fmt::Display for CopyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unix timestamp in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct Timestamp(pub u64);

impl Timestamp {
    /// Create a timestamp from seconds since the epoch.
    pub fn new(secs: u64) -> Self {
        Self(secs)
    }

    /// Seconds since the epoch.
    pub fn as_secs(&self) -> u64 {
        self.0
    }

    /// Timestamp `secs` seconds later, saturating.
    pub fn add_secs(&self, secs: u64) -> Self {
        Self(self.0.saturating_add(secs))
    }

    /// Seconds elapsed from `earlier` to `self`, zero if `earlier` is later.
    pub fn secs_since(&self, earlier: Timestamp) -> u64 {
        self.0.saturating_sub(earlier.0)
    }
}

/// Content type of an inbound message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentKind {
    Text,
    Sticker,
    Animation,
    Photo,
    Video,
    Audio,
    Voice,
    Document,
    VideoNote,
    Contact,
    Location,
    Venue,
}

impl ContentKind {
    /// Whether this kind carries a media file (everything past animations).
    pub fn carries_file(&self) -> bool {
        !matches!(
            self,
            ContentKind::Text | ContentKind::Sticker | ContentKind::Animation
        )
    }
}

impl fmt::Display for ContentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ContentKind::Text => "text",
            ContentKind::Sticker => "sticker",
            ContentKind::Animation => "animation",
            ContentKind::Photo => "photo",
            ContentKind::Video => "video",
            ContentKind::Audio => "audio",
            ContentKind::Voice => "voice",
            ContentKind::Document => "document",
            ContentKind::VideoNote => "video note",
            ContentKind::Contact => "contact",
            ContentKind::Location => "location",
            ContentKind::Venue => "venue",
        };
        f.write_str(name)
    }
}

/// A message as received from one member, before relaying.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InboundMessage {
    /// Member who sent the message.
    pub sender: RecipientId,
    /// Id of the original message in the sender's own chat.
    pub origin_copy: CopyId,
    /// Content type.
    pub content: ContentKind,
    /// Text body or caption.
    pub text: String,
    /// Media file reference, if any.
    pub file: Option<String>,
    /// Forwarded from another chat.
    pub forwarded: bool,
    /// Copy (in the sender's chat) this message replies to.
    pub reply_to: Option<CopyId>,
}

impl InboundMessage {
    /// Plain text message without reply.
    pub fn text(sender: RecipientId, origin_copy: CopyId, text: impl Into<String>) -> Self {
        Self {
            sender,
            origin_copy,
            content: ContentKind::Text,
            text: text.into(),
            file: None,
            forwarded: false,
            reply_to: None,
        }
    }

    /// Set the copy this message replies to.
    pub fn replying_to(mut self, copy: CopyId) -> Self {
        self.reply_to = Some(copy);
        self
    }

    /// Number of line breaks in the text body.
    pub fn line_breaks(&self) -> usize {
        self.text.matches('\n').count()
    }
}
