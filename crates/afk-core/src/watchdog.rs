//! Liveness watchdog.
//!
//! A session that keeps reporting [`PhysicsTick`](afk_net::SessionEvent::PhysicsTick)s
//! is alive. The watchdog holds one pending deadline in the shared timer queue
//! and pushes it forward on every tick. If the deadline is ever reached the
//! watchdog reports expiry exactly once; the caller then asks the session to
//! quit and the normal disconnect path takes over.

use std::time::Duration;

use tokio::time::Instant;

use crate::job::{Generation, Job};
use crate::timers::{TimerId, TimerQueue};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WatchState {
    /// Not started yet; ticks are ignored.
    Idle,
    Armed(TimerId),
    /// Expired. Terminal for this attempt.
    Fired,
    /// Stopped by the disconnect path. Terminal for this attempt.
    Stopped,
}

/// Per-attempt liveness deadline.
#[derive(Debug)]
pub struct LivenessWatchdog {
    timeout: Duration,
    state: WatchState,
}

impl LivenessWatchdog {
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            state: WatchState::Idle,
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Start (or restart) the deadline at `now + timeout`.
    ///
    /// Returns false once the watchdog has fired or been stopped.
    pub fn arm(&mut self, timers: &mut TimerQueue<Job>, now: Instant, generation: Generation) -> bool {
        match self.state {
            WatchState::Fired | WatchState::Stopped => false,
            WatchState::Idle | WatchState::Armed(_) => {
                self.replace(timers, now, generation);
                true
            }
        }
    }

    /// Push the deadline forward. Only has an effect while armed.
    pub fn rearm(&mut self, timers: &mut TimerQueue<Job>, now: Instant, generation: Generation) -> bool {
        if !self.is_armed() {
            return false;
        }
        self.replace(timers, now, generation);
        true
    }

    /// Cancel the pending deadline for good.
    pub fn stop(&mut self, timers: &mut TimerQueue<Job>) {
        if let WatchState::Armed(id) = self.state {
            timers.cancel(id);
        }
        if self.state != WatchState::Fired {
            self.state = WatchState::Stopped;
        }
    }

    /// Called when a [`Job::WatchdogExpired`] fires. Returns true if `id` is
    /// the live deadline, which happens at most once per watchdog.
    pub fn on_fired(&mut self, id: TimerId) -> bool {
        if self.state == WatchState::Armed(id) {
            self.state = WatchState::Fired;
            true
        } else {
            false
        }
    }

    pub fn is_armed(&self) -> bool {
        matches!(self.state, WatchState::Armed(_))
    }

    pub fn has_fired(&self) -> bool {
        self.state == WatchState::Fired
    }

    fn replace(&mut self, timers: &mut TimerQueue<Job>, now: Instant, generation: Generation) {
        if let WatchState::Armed(id) = self.state {
            timers.cancel(id);
        }
        let id = timers.schedule(now + self.timeout, Job::WatchdogExpired { generation });
        self.state = WatchState::Armed(id);
    }
}
