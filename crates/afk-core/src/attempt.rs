//! One try at holding a connection.

use std::time::Duration;

use afk_net::SessionEvent;
use tokio::sync::mpsc;
use tokio::time::Instant;

use crate::job::Generation;
use crate::watchdog::LivenessWatchdog;

/// What the driver takes from an attempt's event stream.
#[derive(Debug, Clone, PartialEq)]
pub enum Incoming {
    Event(SessionEvent),
    /// The transport dropped its sender without a final event.
    StreamClosed,
}

/// State owned by one session attempt.
///
/// Created by the driver when the attempt starts and dropped when the next
/// attempt replaces it. Dropping the attempt drops the session handle, which
/// shuts the transport down.
#[derive(Debug)]
pub struct SessionAttempt<S> {
    pub generation: Generation,
    pub session: S,
    events: Option<mpsc::UnboundedReceiver<SessionEvent>>,
    pub started_at: Instant,
    /// Set on the first established or kicked signal. Never reset.
    pub has_ever_established: bool,
    /// Set by the first failure signal. Once set, no new work is scheduled.
    pub disconnect_in_flight: bool,
    pub last_reply_at: Option<Instant>,
    pub is_crouching: bool,
    /// The action loop has been scheduled for this attempt.
    pub actions_started: bool,
    pub watchdog: LivenessWatchdog,
}

impl<S> SessionAttempt<S> {
    pub fn new(
        generation: Generation,
        session: S,
        events: mpsc::UnboundedReceiver<SessionEvent>,
        watchdog_timeout: Duration,
        now: Instant,
    ) -> Self {
        Self {
            generation,
            session,
            events: Some(events),
            started_at: now,
            has_ever_established: false,
            disconnect_in_flight: false,
            last_reply_at: None,
            is_crouching: false,
            actions_started: false,
            watchdog: LivenessWatchdog::new(watchdog_timeout),
        }
    }

    /// Whether work may still be scheduled for this attempt.
    pub fn is_live(&self) -> bool {
        !self.disconnect_in_flight
    }

    /// Whether a job tagged with `generation` should still run.
    pub fn accepts(&self, generation: Generation) -> bool {
        self.generation == generation && self.is_live()
    }

    /// Wait for the next event. After the stream closes this reports
    /// [`Incoming::StreamClosed`] once and then never resolves again.
    pub async fn next_event(&mut self) -> Incoming {
        let Some(events) = self.events.as_mut() else {
            return std::future::pending().await;
        };
        match events.recv().await {
            Some(event) => Incoming::Event(event),
            None => {
                self.events = None;
                Incoming::StreamClosed
            }
        }
    }
}

/// The attempt in `slot`, if it is still live and matches `generation`.
pub fn live_attempt<S>(
    slot: &mut Option<SessionAttempt<S>>,
    generation: Generation,
) -> Option<&mut SessionAttempt<S>> {
    slot.as_mut().filter(|attempt| attempt.accepts(generation))
}
