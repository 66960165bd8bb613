//! Domain services: spam cost of a message and the warning cooldown schedule.

use shared_types::{ContentKind, InboundMessage};
use std::time::Duration;

use super::{CooldownConfig, SpamConfig};

/// Score a message adds to its sender's spam score.
///
/// Stickers and forwards cost a flat amount. Text costs the base amount plus
/// a per-byte and per-line-break charge. Anything else costs the base.
pub fn spam_cost(message: &InboundMessage, config: &SpamConfig) -> f32 {
    if message.content == ContentKind::Sticker {
        return config.score_sticker;
    }
    if message.forwarded {
        return config.score_base_forward;
    }
    if message.content == ContentKind::Text {
        // Charged per UTF-8 byte
        let bytes = message.text.len() as f32;
        let breaks = message.line_breaks() as f32;
        return config.score_base_message
            + bytes * config.score_text_character
            + breaks * config.score_text_linebreak;
    }
    config.score_base_message
}

/// Cooldown given for a sender's next warning, where `warnings` is the count
/// before this one.
pub fn cooldown_for(warnings: u32, config: &CooldownConfig) -> Duration {
    let warnings = warnings as usize;
    let minutes = match config.begin.get(warnings) {
        Some(minutes) => *minutes,
        None => {
            let past_table = (warnings - config.begin.len()) as u64;
            config
                .linear_m
                .saturating_mul(past_table)
                .saturating_add(config.linear_b)
        }
    };
    Duration::from_secs(minutes.saturating_mul(60))
}
