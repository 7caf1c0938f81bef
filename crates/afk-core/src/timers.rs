//! Deadline-ordered queue of deferred jobs.
//!
//! The whole core shares one queue; the driver sleeps until
//! [`TimerQueue::next_deadline`] and then drains [`TimerQueue::pop_due`].
//! Jobs with equal deadlines fire in scheduling order.

use std::collections::BTreeMap;

use rustc_hash::FxHashMap;
use tokio::time::Instant;

/// Handle to one scheduled job, used for cancellation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(u64);

/// Jobs keyed by deadline.
#[derive(Debug)]
pub struct TimerQueue<J> {
    entries: BTreeMap<(Instant, TimerId), J>,
    deadlines: FxHashMap<TimerId, Instant>,
    next_id: u64,
}

impl<J> Default for TimerQueue<J> {
    fn default() -> Self {
        Self::new()
    }
}

impl<J> TimerQueue<J> {
    pub fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
            deadlines: FxHashMap::default(),
            next_id: 0,
        }
    }

    /// Schedule `job` to become due at `at`.
    pub fn schedule(&mut self, at: Instant, job: J) -> TimerId {
        let id = TimerId(self.next_id);
        self.next_id += 1;
        self.entries.insert((at, id), job);
        self.deadlines.insert(id, at);
        id
    }

    /// Remove a pending job. Returns `None` if it already fired or was cancelled.
    pub fn cancel(&mut self, id: TimerId) -> Option<J> {
        let at = self.deadlines.remove(&id)?;
        self.entries.remove(&(at, id))
    }

    /// Earliest pending deadline.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.entries.keys().next().map(|(at, _)| *at)
    }

    /// Remove and return the earliest job whose deadline is at or before `now`.
    pub fn pop_due(&mut self, now: Instant) -> Option<(TimerId, J)> {
        let (&(at, id), _) = self.entries.first_key_value()?;
        if at > now {
            return None;
        }
        self.deadlines.remove(&id);
        self.entries.remove(&(at, id)).map(|job| (id, job))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Pending jobs in firing order.
    pub fn iter(&self) -> impl Iterator<Item = (Instant, &J)> {
        self.entries.iter().map(|((at, _), job)| (*at, job))
    }
}
