//! Disconnect coordination.
//!
//! A dying connection usually reports itself several times: an error, then a
//! kick, then the end of the stream, in any order. The coordinator turns all
//! of them into exactly one scheduled reconnect per attempt.

use std::time::Duration;

use tokio::time::Instant;

use crate::attempt::SessionAttempt;
use crate::backoff::BackoffPolicy;
use crate::job::Job;
use crate::timers::TimerQueue;

/// Why an attempt stopped.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionFailure {
    #[error("transport error: {0}")]
    Transport(String),
    #[error("kicked: {0}")]
    Kicked(String),
    #[error("connection ended: {0}")]
    Ended(String),
    #[error("event stream closed")]
    StreamClosed,
}

/// Funnels failure signals into reconnects.
#[derive(Debug)]
pub struct DisconnectCoordinator {
    policy: BackoffPolicy,
    reconnects_scheduled: u64,
}

impl DisconnectCoordinator {
    pub fn new(policy: BackoffPolicy) -> Self {
        Self {
            policy,
            reconnects_scheduled: 0,
        }
    }

    /// Total reconnects scheduled over the process lifetime.
    pub fn reconnects_scheduled(&self) -> u64 {
        self.reconnects_scheduled
    }

    /// Handle one failure signal of `attempt`.
    ///
    /// The first call per attempt marks it as disconnecting, stops its
    /// watchdog and schedules one [`Job::StartAttempt`]; it returns the chosen
    /// delay. Later calls for the same attempt return `None` and do nothing.
    pub fn handle_failure<S>(
        &mut self,
        attempt: &mut SessionAttempt<S>,
        timers: &mut TimerQueue<Job>,
        failure: &SessionFailure,
        now: Instant,
    ) -> Option<Duration> {
        if attempt.disconnect_in_flight {
            tracing::debug!(
                "Attempt {} already disconnecting, ignoring: {}",
                attempt.generation,
                failure
            );
            return None;
        }
        attempt.disconnect_in_flight = true;
        attempt.watchdog.stop(timers);

        let delay = self.policy.delay_for(attempt.has_ever_established);
        timers.schedule(now + delay, Job::StartAttempt);
        self.reconnects_scheduled += 1;

        tracing::warn!(
            "Attempt {} lost ({}), reconnecting in {:?}",
            attempt.generation,
            failure,
            delay
        );
        Some(delay)
    }
}
