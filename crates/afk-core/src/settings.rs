//! Runtime settings of the core, derived from [`Config`].

use std::time::Duration;

use afk_config::Config;
use rand::Rng;

use crate::backoff::BackoffPolicy;

/// Chat-reply tuning.
#[derive(Debug, Clone, PartialEq)]
pub struct ReplySettings {
    /// Minimum time between two replies of one attempt.
    pub cooldown: Duration,
    /// Replies are sent after a random delay in `[delay_min, delay_max)`.
    pub delay_min: Duration,
    pub delay_max: Duration,
    pub replies: Vec<String>,
}

/// Everything the core needs besides connection options.
#[derive(Debug, Clone, PartialEq)]
pub struct BotSettings {
    pub watchdog_timeout: Duration,
    pub backoff: BackoffPolicy,
    /// Delay between establishment and the first action.
    pub settle_delay: Duration,
    /// Action ticks are spaced by a random delay in `[action_delay_min, action_delay_max)`.
    pub action_delay_min: Duration,
    pub action_delay_max: Duration,
    pub wander_radius: f64,
    pub reply: ReplySettings,
}

impl BotSettings {
    pub fn from_config(config: &Config) -> Self {
        let behavior = &config.behavior;
        Self {
            watchdog_timeout: config.session.watchdog_timeout(),
            backoff: BackoffPolicy::from_config(&config.session),
            settle_delay: config.session.settle_delay(),
            action_delay_min: Duration::from_millis(behavior.action_delay_min_ms),
            action_delay_max: Duration::from_millis(behavior.action_delay_max_ms),
            wander_radius: behavior.wander_radius,
            reply: ReplySettings {
                cooldown: behavior.reply_cooldown(),
                delay_min: Duration::from_millis(behavior.reply_delay_min_ms),
                delay_max: Duration::from_millis(behavior.reply_delay_max_ms),
                replies: behavior.replies.clone(),
            },
        }
    }
}

impl Default for BotSettings {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

/// Uniform delay in `[min, max)` at millisecond resolution; `min` when the range is empty.
pub(crate) fn uniform_delay<R: Rng>(rng: &mut R, min: Duration, max: Duration) -> Duration {
    let (lo, hi) = (min.as_millis() as u64, max.as_millis() as u64);
    if hi <= lo {
        return min;
    }
    Duration::from_millis(rng.random_range(lo..hi))
}
