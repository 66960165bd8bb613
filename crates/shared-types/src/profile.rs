//! Member profiles as exposed by the user directory.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::entities::{RecipientId, Timestamp};

/// Member rank. Ordering follows privilege.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rank {
    Banned,
    User,
    Mod,
    Admin,
}

impl Rank {
    /// Moderators and admins.
    pub fn is_privileged(&self) -> bool {
        matches!(self, Rank::Mod | Rank::Admin)
    }
}

impl fmt::Display for Rank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Rank::Banned => "Banned",
            Rank::User => "User",
            Rank::Mod => "Mod",
            Rank::Admin => "Admin",
        };
        f.write_str(name)
    }
}

/// Profile fields the relay reads to decide admission and self-echo.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: RecipientId,
    pub rank: Rank,
    pub joined_at: Timestamp,
    pub left_at: Option<Timestamp>,
    pub cooldown_until: Option<Timestamp>,
    pub warnings: u32,
    pub karma: i64,
    /// Suppress karma notifications.
    pub hide_karma: bool,
    /// Receive a relayed copy of one's own messages.
    pub debug_enabled: bool,
    pub blacklist_reason: Option<String>,
}

impl UserProfile {
    /// Fresh member who joined at `joined_at`.
    pub fn new(id: RecipientId, joined_at: Timestamp) -> Self {
        Self {
            id,
            rank: Rank::User,
            joined_at,
            left_at: None,
            cooldown_until: None,
            warnings: 0,
            karma: 0,
            hide_karma: false,
            debug_enabled: false,
            blacklist_reason: None,
        }
    }

    /// Joined and not banned.
    pub fn is_active(&self) -> bool {
        self.rank != Rank::Banned && self.left_at.is_none()
    }

    pub fn is_blacklisted(&self) -> bool {
        self.rank == Rank::Banned
    }

    /// Cooldown still running at `now`.
    pub fn is_in_cooldown(&self, now: Timestamp) -> bool {
        self.cooldown_until.is_some_and(|until| now < until)
    }
}
