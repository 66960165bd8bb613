//! # Runtime Configuration
//!
//! Relay settings loaded from a TOML file, overridable from the environment.
//! Every key is optional; missing keys keep their defaults and a missing file
//! means all defaults.
//!
//! ## File Format
//!
//! ```toml
//! [spam]
//! limit = 3.0
//! limit_hit = 6.0
//! interval_secs = 5
//!
//! [limits]
//! allow_documents = true
//! media_limit_period_hours = 0
//!
//! [cooldown]
//! begin = [1, 5, 25, 120, 720, 4320]
//! linear_m = 4320
//! linear_b = 10080
//!
//! [pipeline]
//! workers = 2
//! max_calls_per_second = 25.0
//!
//! [cache]
//! ttl_hours = 24
//! expire_interval_hours = 6
//!
//! [roster]
//! members = [1, 2, 3]
//! moderators = [1]
//! ```
//!
//! ## Environment
//!
//! - `RELAY_CONFIG`: config file path (default `relay.toml`)
//! - `RELAY_WORKERS`: delivery worker count
//! - `RELAY_MAX_CALLS_PER_SECOND`: platform send budget

use relay_core::RelayConfig;
use serde::Deserialize;
use shared_types::RecipientId;
use std::fs;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Default config file, relative to the working directory.
pub const DEFAULT_CONFIG_PATH: &str = "relay.toml";

const HOUR: u64 = 60 * 60;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid value for {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    #[serde(default)]
    spam: SpamSection,
    #[serde(default)]
    limits: LimitsSection,
    #[serde(default)]
    cooldown: CooldownSection,
    #[serde(default)]
    karma: KarmaSection,
    #[serde(default)]
    pipeline: PipelineSection,
    #[serde(default)]
    cache: CacheSection,
    #[serde(default)]
    roster: RosterSection,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct SpamSection {
    limit: Option<f32>,
    limit_hit: Option<f32>,
    interval_secs: Option<u64>,
    score_sticker: Option<f32>,
    score_base_message: Option<f32>,
    score_base_forward: Option<f32>,
    score_text_character: Option<f32>,
    score_text_linebreak: Option<f32>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct LimitsSection {
    allow_documents: Option<bool>,
    allow_contacts: Option<bool>,
    media_limit_period_hours: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct CooldownSection {
    begin: Option<Vec<u64>>,
    linear_m: Option<u64>,
    linear_b: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct KarmaSection {
    plus_one: Option<i64>,
    warn_penalty: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct PipelineSection {
    workers: Option<usize>,
    max_calls_per_second: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct CacheSection {
    ttl_hours: Option<u64>,
    expire_interval_hours: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RosterSection {
    #[serde(default)]
    members: Vec<i64>,
    #[serde(default)]
    moderators: Vec<i64>,
}

/// Complete runtime configuration.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RuntimeConfig {
    pub relay: RelayConfig,
    /// Members present at startup.
    pub members: Vec<RecipientId>,
    /// Members holding the moderator rank at startup.
    pub moderators: Vec<RecipientId>,
}

impl RuntimeConfig {
    /// Load from `RELAY_CONFIG` (or `relay.toml`), apply environment
    /// overrides and validate.
    pub fn from_env() -> Result<Self, ConfigError> {
        let path = std::env::var("RELAY_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        let mut config = Self::load(Path::new(&path))?;
        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file. A missing file yields defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        match fs::read_to_string(path) {
            Ok(content) => Self::parse(&content),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(source) => Err(ConfigError::Io {
                path: path.display().to_string(),
                source,
            }),
        }
    }

    /// Parse configuration from a TOML string.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let file: ConfigFile = toml::from_str(content)?;
        let mut relay = RelayConfig::default();

        let spam = &mut relay.spam;
        let s = file.spam;
        spam.limit = s.limit.unwrap_or(spam.limit);
        spam.limit_hit = s.limit_hit.unwrap_or(spam.limit_hit);
        if let Some(secs) = s.interval_secs {
            spam.interval = Duration::from_secs(secs);
        }
        spam.score_sticker = s.score_sticker.unwrap_or(spam.score_sticker);
        spam.score_base_message = s.score_base_message.unwrap_or(spam.score_base_message);
        spam.score_base_forward = s.score_base_forward.unwrap_or(spam.score_base_forward);
        spam.score_text_character = s.score_text_character.unwrap_or(spam.score_text_character);
        spam.score_text_linebreak = s.score_text_linebreak.unwrap_or(spam.score_text_linebreak);

        let limits = &mut relay.limits;
        limits.allow_documents = file.limits.allow_documents.unwrap_or(limits.allow_documents);
        limits.allow_contacts = file.limits.allow_contacts.unwrap_or(limits.allow_contacts);
        if let Some(hours) = file.limits.media_limit_period_hours {
            limits.media_limit_period = from_hours("limits.media_limit_period_hours", hours)?;
        }

        let cooldown = &mut relay.cooldown;
        if let Some(begin) = file.cooldown.begin {
            cooldown.begin = begin;
        }
        cooldown.linear_m = file.cooldown.linear_m.unwrap_or(cooldown.linear_m);
        cooldown.linear_b = file.cooldown.linear_b.unwrap_or(cooldown.linear_b);

        relay.karma.plus_one = file.karma.plus_one.unwrap_or(relay.karma.plus_one);
        relay.karma.warn_penalty = file.karma.warn_penalty.unwrap_or(relay.karma.warn_penalty);

        relay.pipeline.workers = file.pipeline.workers.unwrap_or(relay.pipeline.workers);
        relay.pipeline.max_calls_per_second = file
            .pipeline
            .max_calls_per_second
            .unwrap_or(relay.pipeline.max_calls_per_second);

        if let Some(hours) = file.cache.ttl_hours {
            relay.cache.ttl = from_hours("cache.ttl_hours", hours)?;
        }
        if let Some(hours) = file.cache.expire_interval_hours {
            relay.cache.expire_interval = from_hours("cache.expire_interval_hours", hours)?;
        }

        Ok(Self {
            relay,
            members: file.roster.members.into_iter().map(RecipientId).collect(),
            moderators: file.roster.moderators.into_iter().map(RecipientId).collect(),
        })
    }

    /// Apply `RELAY_*` overrides. `lookup` returns the variable's value.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(raw) = lookup("RELAY_WORKERS") {
            self.relay.pipeline.workers = raw.trim().parse().map_err(|_| ConfigError::Invalid {
                key: "RELAY_WORKERS",
                reason: format!("not a worker count: {raw}"),
            })?;
        }
        if let Some(raw) = lookup("RELAY_MAX_CALLS_PER_SECOND") {
            self.relay.pipeline.max_calls_per_second =
                raw.trim().parse().map_err(|_| ConfigError::Invalid {
                    key: "RELAY_MAX_CALLS_PER_SECOND",
                    reason: format!("not a number: {raw}"),
                })?;
        }
        Ok(())
    }

    /// Reject settings the relay cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let relay = &self.relay;
        if relay.pipeline.workers == 0 {
            return Err(invalid("pipeline.workers", "at least one worker is required"));
        }
        let rate = relay.pipeline.max_calls_per_second;
        if !rate.is_finite() || rate <= 0.0 {
            return Err(invalid("pipeline.max_calls_per_second", "must be positive"));
        }
        if relay.spam.limit <= 0.0 {
            return Err(invalid("spam.limit", "must be positive"));
        }
        if relay.spam.limit_hit < relay.spam.limit {
            return Err(invalid("spam.limit_hit", "must not be below spam.limit"));
        }
        if relay.spam.interval.is_zero() {
            return Err(invalid("spam.interval_secs", "must be positive"));
        }
        let costs = [
            relay.spam.score_sticker,
            relay.spam.score_base_message,
            relay.spam.score_base_forward,
            relay.spam.score_text_character,
            relay.spam.score_text_linebreak,
        ];
        if costs.iter().any(|cost| *cost < 0.0) {
            return Err(invalid("spam.score_*", "scores must not be negative"));
        }
        if relay.cache.ttl.is_zero() {
            return Err(invalid("cache.ttl_hours", "must be positive"));
        }
        if relay.cache.expire_interval.is_zero() {
            return Err(invalid("cache.expire_interval_hours", "must be positive"));
        }
        Ok(())
    }
}

fn from_hours(key: &'static str, hours: u64) -> Result<Duration, ConfigError> {
    hours
        .checked_mul(HOUR)
        .map(Duration::from_secs)
        .ok_or_else(|| invalid(key, "too large"))
}

fn invalid(key: &'static str, reason: &str) -> ConfigError {
    ConfigError::Invalid {
        key,
        reason: reason.to_string(),
    }
}
