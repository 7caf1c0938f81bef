//! Reconnect delay selection.

use std::time::Duration;

use afk_config::SessionConfig;

/// Two-tier reconnect delay.
///
/// An attempt that never reached the world usually means the server is down
/// or refusing us, so the next try waits much longer than after an attempt
/// that was established and later dropped. The delay is fixed per tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffPolicy {
    /// Delay after an attempt that never became established.
    pub never_established: Duration,
    /// Delay after an attempt that was established at least once.
    pub established: Duration,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            never_established: Duration::from_millis(300_000),
            established: Duration::from_millis(10_000),
        }
    }
}

impl BackoffPolicy {
    pub fn from_config(session: &SessionConfig) -> Self {
        Self {
            never_established: session.never_established_backoff(),
            established: session.established_backoff(),
        }
    }

    /// Delay before the next attempt.
    pub fn delay_for(&self, has_ever_established: bool) -> Duration {
        if has_ever_established {
            self.established
        } else {
            self.never_established
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_tiers() {
        let policy = BackoffPolicy::default();
        assert_eq!(policy.delay_for(false), Duration::from_millis(300_000));
        assert_eq!(policy.delay_for(true), Duration::from_millis(10_000));
    }

    #[test]
    fn test_tiers_follow_config() {
        let session = SessionConfig {
            never_established_backoff_ms: 60_000,
            established_backoff_ms: 2_000,
            ..SessionConfig::default()
        };
        let policy = BackoffPolicy::from_config(&session);
        assert_eq!(policy.delay_for(false), Duration::from_secs(60));
        assert_eq!(policy.delay_for(true), Duration::from_secs(2));
    }
}
