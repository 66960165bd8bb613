//! Value objects for relay configuration.

use std::time::Duration;

/// Spam scoring parameters.
#[derive(Clone, Debug, PartialEq)]
pub struct SpamConfig {
    /// Score above which messages are rejected
    pub limit: f32,
    /// Punitive score assigned when a message would cross `limit`
    pub limit_hit: f32,
    /// Decay period (one point per tick)
    pub interval: Duration,
    /// Flat cost of a sticker
    pub score_sticker: f32,
    /// Base cost of any non-forwarded message
    pub score_base_message: f32,
    /// Flat cost of a forwarded message
    pub score_base_forward: f32,
    /// Cost per text character
    pub score_text_character: f32,
    /// Cost per line break
    pub score_text_linebreak: f32,
}

impl Default for SpamConfig {
    fn default() -> Self {
        Self {
            limit: 3.0,
            limit_hit: 6.0,
            interval: Duration::from_secs(5),
            score_sticker: 1.5,
            score_base_message: 0.75,
            score_base_forward: 1.25,
            score_text_character: 0.002,
            score_text_linebreak: 0.1,
        }
    }
}

/// Content policy.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LimitsConfig {
    pub allow_documents: bool,
    pub allow_contacts: bool,
    /// Period after joining during which media and forwards are refused.
    /// Zero disables the restriction.
    pub media_limit_period: Duration,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            allow_documents: true,
            allow_contacts: true,
            media_limit_period: Duration::ZERO,
        }
    }
}

/// Cooldown schedule for warnings.
///
/// The first warnings use `begin` (in minutes) in order; after the table runs
/// out the cooldown grows linearly: `linear_m * (w - begin.len()) + linear_b`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CooldownConfig {
    pub begin: Vec<u64>,
    pub linear_m: u64,
    pub linear_b: u64,
}

impl Default for CooldownConfig {
    fn default() -> Self {
        Self {
            begin: vec![1, 5, 25, 120, 720, 4320],
            linear_m: 4320,
            linear_b: 10080,
        }
    }
}

/// Karma bookkeeping.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KarmaConfig {
    /// Karma granted to an author per upvote
    pub plus_one: i64,
    /// Karma taken from an author per warning
    pub warn_penalty: i64,
}

impl Default for KarmaConfig {
    fn default() -> Self {
        Self {
            plus_one: 1,
            warn_penalty: 10,
        }
    }
}

/// Delivery worker pool.
#[derive(Clone, Debug, PartialEq)]
pub struct PipelineConfig {
    /// Number of delivery workers
    pub workers: usize,
    /// Platform send budget shared by all workers
    pub max_calls_per_second: f64,
}

impl PipelineConfig {
    /// Minimum gap between two sends of one worker.
    ///
    /// Each worker gets `max_calls_per_second / workers`, rounded up to whole
    /// nanoseconds.
    pub fn send_interval(&self) -> Duration {
        if self.workers == 0 || self.max_calls_per_second <= 0.0 {
            return Duration::ZERO;
        }
        let per_worker = self.max_calls_per_second / self.workers as f64;
        Duration::from_nanos((1e9 / per_worker).ceil() as u64)
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            workers: 2,
            max_calls_per_second: 25.0,
        }
    }
}

/// Relay cache lifetime.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CacheConfig {
    /// Age after which a canonical message and its copies are forgotten
    pub ttl: Duration,
    /// How often the expiry sweep runs
    pub expire_interval: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(24 * 60 * 60),
            expire_interval: Duration::from_secs(6 * 60 * 60),
        }
    }
}

/// Complete relay configuration.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RelayConfig {
    pub spam: SpamConfig,
    pub limits: LimitsConfig,
    pub cooldown: CooldownConfig,
    pub karma: KarmaConfig,
    pub pipeline: PipelineConfig,
    pub cache: CacheConfig,
}
