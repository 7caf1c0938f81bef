//! Replies to chat lines that mention the bot.
//!
//! A line qualifies when someone other than the bot wrote it and the bot's
//! name appears in it, ignoring case. Replies are rate-limited per attempt:
//! after a qualifying line, further mentions are ignored until the cooldown
//! has passed. The reply itself goes out after a short random delay so it
//! reads like a person typing.

use std::time::Duration;

use rand::Rng;
use rand::seq::IndexedRandom;
use tokio::time::Instant;

use crate::settings::{ReplySettings, uniform_delay};

/// A reply the caller should send after `delay`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedReply {
    pub delay: Duration,
    pub text: String,
}

/// Decides whether and how to answer a chat line.
#[derive(Debug, Clone)]
pub struct MentionResponder {
    own_name: String,
    needle: String,
    settings: ReplySettings,
}

impl MentionResponder {
    pub fn new(own_name: &str, settings: ReplySettings) -> Self {
        Self {
            own_name: own_name.to_string(),
            needle: own_name.to_lowercase(),
            settings,
        }
    }

    /// Whether `message` from `username` addresses the bot.
    pub fn is_mention(&self, username: &str, message: &str) -> bool {
        username != self.own_name
            && !self.needle.is_empty()
            && message.to_lowercase().contains(&self.needle)
    }

    /// Handle one chat line.
    ///
    /// `last_reply_at` is the attempt's cooldown marker; it is updated when a
    /// reply is planned, not when it is sent.
    pub fn on_chat<R: Rng>(
        &self,
        username: &str,
        message: &str,
        now: Instant,
        last_reply_at: &mut Option<Instant>,
        rng: &mut R,
    ) -> Option<PlannedReply> {
        if !self.is_mention(username, message) {
            return None;
        }
        if let Some(last) = *last_reply_at
            && now.saturating_duration_since(last) < self.settings.cooldown
        {
            tracing::debug!("Mention by {} ignored, reply on cooldown", username);
            return None;
        }
        let text = self.settings.replies.choose(rng)?.clone();
        *last_reply_at = Some(now);

        let delay = uniform_delay(rng, self.settings.delay_min, self.settings.delay_max);
        tracing::info!("Mentioned by {}: {:?}, replying in {:?}", username, message, delay);
        Some(PlannedReply { delay, text })
    }
}
