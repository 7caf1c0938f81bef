//! Session lifecycle driver.
//!
//! [`Bot`] owns the connector, the current [`SessionAttempt`] and the shared
//! [`TimerQueue`]. Its loop waits for whichever comes first: the next event
//! of the current attempt or the next timer deadline. Both are handled to
//! completion on the same task, so no handler ever races another.
//!
//! ```text
//! start_attempt ──► connecting ──Established──► established ──failure──┐
//!       ▲               │                           │ (watchdog,        │
//!       │               └────────failure────────────┤  actions, chat)   │
//!       │                                           ▼                   │
//!       └──────── Job::StartAttempt ◄──── disconnecting ◄───────────────┘
//! ```

use afk_net::{
    ConnectOptions, Connector, GameSession, MovementProfile, Navigator, SessionEvent,
};
use rand::SeedableRng;
use rand::rngs::StdRng;
use tokio::time::Instant;

use crate::actions::ActionContext;
use crate::attempt::{Incoming, SessionAttempt, live_attempt};
use crate::chat::MentionResponder;
use crate::coordinator::{DisconnectCoordinator, SessionFailure};
use crate::job::{Generation, Job};
use crate::scheduler::ActionScheduler;
use crate::settings::BotSettings;
use crate::timers::{TimerId, TimerQueue};

/// Movement profile applied on every establishment.
const MOVEMENTS: MovementProfile = MovementProfile {
    allow_sprinting: false,
    can_dig: false,
};

/// Keeps one player logged in, forever.
pub struct Bot<C: Connector> {
    connector: C,
    options: ConnectOptions,
    settings: BotSettings,
    coordinator: DisconnectCoordinator,
    scheduler: ActionScheduler,
    responder: MentionResponder,
    timers: TimerQueue<Job>,
    attempt: Option<SessionAttempt<C::Session>>,
    last_generation: Generation,
    rng: StdRng,
}

impl<C: Connector> Bot<C> {
    pub fn new(connector: C, options: ConnectOptions, settings: BotSettings) -> Self {
        Self::with_rng(connector, options, settings, StdRng::from_os_rng())
    }

    /// Like [`Bot::new`] with a caller-supplied random source.
    pub fn with_rng(
        connector: C,
        options: ConnectOptions,
        settings: BotSettings,
        rng: StdRng,
    ) -> Self {
        let responder = MentionResponder::new(&options.username, settings.reply.clone());
        Self {
            connector,
            coordinator: DisconnectCoordinator::new(settings.backoff),
            scheduler: ActionScheduler::new(&settings),
            responder,
            options,
            settings,
            timers: TimerQueue::new(),
            attempt: None,
            last_generation: 0,
            rng,
        }
    }

    /// Start the first attempt and keep the bot running. Never returns.
    pub async fn run(mut self) {
        tracing::info!(
            "Keeping {} online at {}",
            self.options.username,
            self.options.address()
        );
        self.start(Instant::now());
        loop {
            self.step().await;
        }
    }

    /// Open the first attempt.
    pub fn start(&mut self, now: Instant) {
        self.start_attempt(now);
    }

    /// Wait for one event or timer deadline and handle it.
    pub async fn step(&mut self) {
        let deadline = self.timers.next_deadline();
        tokio::select! {
            incoming = next_incoming(&mut self.attempt) => {
                let now = Instant::now();
                match incoming {
                    Incoming::Event(event) => self.handle_event(event, now),
                    Incoming::StreamClosed => self.on_failure(SessionFailure::StreamClosed, now),
                }
            }
            _ = sleep_until(deadline) => self.run_due(Instant::now()),
        }
    }

    /// Handle one event of the current attempt.
    pub fn handle_event(&mut self, event: SessionEvent, now: Instant) {
        match event {
            SessionEvent::Established => self.on_established(now),
            SessionEvent::Kicked(reason) => {
                if let Some(attempt) = self.attempt.as_mut() {
                    attempt.has_ever_established = true;
                }
                self.on_failure(SessionFailure::Kicked(reason), now);
            }
            SessionEvent::Ended(reason) => self.on_failure(SessionFailure::Ended(reason), now),
            SessionEvent::Error(message) => self.on_failure(SessionFailure::Transport(message), now),
            SessionEvent::Chat { username, message } => self.on_chat(&username, &message, now),
            SessionEvent::PhysicsTick => self.on_tick(now),
        }
    }

    /// Run every job due at `now`.
    pub fn run_due(&mut self, now: Instant) {
        while let Some((id, job)) = self.timers.pop_due(now) {
            self.fire(id, job, now);
        }
    }

    pub fn attempt(&self) -> Option<&SessionAttempt<C::Session>> {
        self.attempt.as_ref()
    }

    pub fn timers(&self) -> &TimerQueue<Job> {
        &self.timers
    }

    pub fn coordinator(&self) -> &DisconnectCoordinator {
        &self.coordinator
    }

    // --- Attempt lifecycle ---

    fn start_attempt(&mut self, now: Instant) {
        if let Some(mut previous) = self.attempt.take() {
            previous.watchdog.stop(&mut self.timers);
            tracing::debug!("Dropping attempt {}", previous.generation);
        }
        self.last_generation += 1;
        let generation = self.last_generation;
        tracing::info!(
            "Attempt {}: connecting to {} as {}",
            generation,
            self.options.address(),
            self.options.username
        );
        let (session, events) = self.connector.connect(&self.options);
        self.attempt = Some(SessionAttempt::new(
            generation,
            session,
            events,
            self.settings.watchdog_timeout,
            now,
        ));
    }

    fn on_established(&mut self, now: Instant) {
        let Some(attempt) = self.attempt.as_mut().filter(|a| a.is_live()) else {
            return;
        };
        attempt.has_ever_established = true;
        attempt.session.set_movements(MOVEMENTS);
        attempt
            .watchdog
            .arm(&mut self.timers, now, attempt.generation);

        if attempt.actions_started {
            tracing::debug!("Attempt {}: respawned", attempt.generation);
            return;
        }
        attempt.actions_started = true;
        self.timers.schedule(
            now + self.settings.settle_delay,
            Job::StartActions {
                generation: attempt.generation,
            },
        );
        tracing::info!(
            "Attempt {}: established after {:?}",
            attempt.generation,
            now.saturating_duration_since(attempt.started_at)
        );
    }

    fn on_failure(&mut self, failure: SessionFailure, now: Instant) {
        let Some(attempt) = self.attempt.as_mut() else {
            return;
        };
        self.coordinator
            .handle_failure(attempt, &mut self.timers, &failure, now);
    }

    fn on_tick(&mut self, now: Instant) {
        if let Some(attempt) = self.attempt.as_mut()
            && attempt.is_live()
        {
            attempt
                .watchdog
                .rearm(&mut self.timers, now, attempt.generation);
        }
    }

    fn on_chat(&mut self, username: &str, message: &str, now: Instant) {
        let Some(attempt) = self.attempt.as_mut().filter(|a| a.is_live()) else {
            return;
        };
        let Some(reply) =
            self.responder
                .on_chat(username, message, now, &mut attempt.last_reply_at, &mut self.rng)
        else {
            return;
        };
        self.timers.schedule(
            now + reply.delay,
            Job::SendChat {
                generation: attempt.generation,
                message: reply.text,
            },
        );
    }

    // --- Deferred jobs ---

    fn fire(&mut self, id: TimerId, job: Job, now: Instant) {
        match job {
            Job::StartAttempt => self.start_attempt(now),
            Job::WatchdogExpired { generation } => {
                let Some(attempt) = live_attempt(&mut self.attempt, generation) else {
                    return;
                };
                if attempt.watchdog.on_fired(id) {
                    tracing::warn!(
                        "Attempt {}: no physics tick for {:?}, quitting",
                        generation,
                        attempt.watchdog.timeout()
                    );
                    attempt.session.quit("liveness watchdog expired");
                }
            }
            Job::StartActions { generation } | Job::ActionTick { generation } => {
                self.scheduler.tick(
                    self.attempt.as_mut(),
                    generation,
                    &mut self.timers,
                    &mut self.rng,
                    now,
                );
            }
            Job::ReleaseControl {
                generation,
                control,
            } => {
                if let Some(attempt) = live_attempt(&mut self.attempt, generation) {
                    attempt.session.set_control_state(control, false);
                }
            }
            Job::Swing {
                generation,
                remaining,
            } => {
                if let Some(attempt) = live_attempt(&mut self.attempt, generation) {
                    ActionContext {
                        attempt,
                        timers: &mut self.timers,
                        rng: &mut self.rng,
                        now,
                        wander_radius: self.settings.wander_radius,
                    }
                    .swing(remaining);
                }
            }
            Job::SendChat {
                generation,
                message,
            } => {
                if let Some(attempt) = live_attempt(&mut self.attempt, generation) {
                    tracing::info!("Attempt {}: replying {:?}", generation, message);
                    attempt.session.chat(&message);
                }
            }
        }
    }
}

async fn next_incoming<S>(attempt: &mut Option<SessionAttempt<S>>) -> Incoming {
    match attempt {
        Some(attempt) => attempt.next_event().await,
        None => std::future::pending().await,
    }
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
