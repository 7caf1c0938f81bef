//! The idle action loop.
//!
//! Each tick picks one [`Action`] uniformly, runs it and schedules the next
//! tick after a random delay. The loop belongs to one attempt: the first tick
//! that finds its attempt gone or disconnecting does nothing and schedules
//! nothing, which ends the loop.

use std::time::Duration;

use afk_net::{GameSession, Navigator};
use rand::Rng;
use tokio::time::Instant;

use crate::actions::{Action, ActionContext};
use crate::attempt::SessionAttempt;
use crate::job::{Generation, Job};
use crate::settings::{BotSettings, uniform_delay};
use crate::timers::TimerQueue;

#[derive(Debug, Clone)]
pub struct ActionScheduler {
    delay_min: Duration,
    delay_max: Duration,
    wander_radius: f64,
}

impl ActionScheduler {
    pub fn new(settings: &BotSettings) -> Self {
        Self {
            delay_min: settings.action_delay_min,
            delay_max: settings.action_delay_max,
            wander_radius: settings.wander_radius,
        }
    }

    /// One loop iteration for the attempt tagged `generation`.
    ///
    /// Returns the dispatched action, or `None` if the attempt is no longer
    /// live; in that case nothing is scheduled.
    pub fn tick<S, R>(
        &self,
        attempt: Option<&mut SessionAttempt<S>>,
        generation: Generation,
        timers: &mut TimerQueue<Job>,
        rng: &mut R,
        now: Instant,
    ) -> Option<Action>
    where
        S: GameSession + Navigator,
        R: Rng,
    {
        let Some(attempt) = attempt.filter(|a| a.accepts(generation)) else {
            tracing::debug!("Action loop of attempt {} ends", generation);
            return None;
        };
        let action = Action::pick(rng);
        self.run_action(action, attempt, timers, rng, now);

        let delay = uniform_delay(rng, self.delay_min, self.delay_max);
        timers.schedule(now + delay, Job::ActionTick { generation });
        Some(action)
    }

    /// Dispatch `action`, stopping navigation first if the action is stationary.
    pub fn run_action<S, R>(
        &self,
        action: Action,
        attempt: &mut SessionAttempt<S>,
        timers: &mut TimerQueue<Job>,
        rng: &mut R,
        now: Instant,
    ) where
        S: GameSession + Navigator,
        R: Rng,
    {
        if action.is_stationary() && attempt.session.is_moving() {
            attempt.session.stop();
        }
        ActionContext {
            attempt,
            timers,
            rng,
            now,
            wander_radius: self.wander_radius,
        }
        .perform(action);
    }
}
