//! Idle behaviours the scheduler picks from.
//!
//! Every action is short: it issues a few commands right away and, where it
//! needs to undo something later (release a key, swing again), schedules a
//! generation-tagged [`Job`] for it.

use std::f32::consts::{FRAC_PI_4, PI};
use std::time::Duration;

use afk_net::{Control, EntityKind, GameSession, GoalNearXZ, Navigator, look_angles};
use glam::DVec3;
use rand::Rng;
use rand::seq::IndexedRandom;
use tokio::time::Instant;

use crate::attempt::SessionAttempt;
use crate::job::Job;
use crate::settings::uniform_delay;
use crate::timers::TimerQueue;

/// Eye height of the bot's own player above its feet.
const EYE_HEIGHT: f64 = 1.62;
const WALK_MIN: Duration = Duration::from_millis(500);
const WALK_MAX: Duration = Duration::from_millis(1_500);
const JUMP_HOLD: Duration = Duration::from_millis(250);
const SWING_GAP_MIN: Duration = Duration::from_millis(250);
const SWING_GAP_MAX: Duration = Duration::from_millis(450);
const DIG_REACH: f64 = 4.5;
const LOOK_AT_RANGE: f64 = 16.0;
const HOTBAR_SLOTS: u8 = 9;
const WANDER_TOLERANCE: f64 = 1.0;

/// One dispatchable behaviour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    Walk,
    Jump,
    LookAround,
    ToggleCrouch,
    Wander,
    SwingArm,
    DigNearby,
    SwitchSlot,
    DropItem,
    LookAtEntity,
}

impl Action {
    /// The full catalog. Picks are uniform over it.
    pub const ALL: [Action; 10] = [
        Action::Walk,
        Action::Jump,
        Action::LookAround,
        Action::ToggleCrouch,
        Action::Wander,
        Action::SwingArm,
        Action::DigNearby,
        Action::SwitchSlot,
        Action::DropItem,
        Action::LookAtEntity,
    ];

    pub fn pick<R: Rng>(rng: &mut R) -> Action {
        Action::ALL[rng.random_range(0..Action::ALL.len())]
    }

    /// Stationary actions must not run while the navigator is steering.
    pub fn is_stationary(self) -> bool {
        self != Action::Wander
    }
}

/// What an action may touch.
pub struct ActionContext<'a, S, R> {
    pub attempt: &'a mut SessionAttempt<S>,
    pub timers: &'a mut TimerQueue<Job>,
    pub rng: &'a mut R,
    pub now: Instant,
    pub wander_radius: f64,
}

impl<S: GameSession + Navigator, R: Rng> ActionContext<'_, S, R> {
    /// Run `action`.
    pub fn perform(&mut self, action: Action) {
        tracing::debug!("Attempt {}: {:?}", self.attempt.generation, action);
        match action {
            Action::Walk => {
                let Some(&control) = Control::DIRECTIONS.choose(self.rng) else {
                    return;
                };
                let hold = uniform_delay(self.rng, WALK_MIN, WALK_MAX);
                self.hold(control, hold);
            }
            Action::Jump => self.hold(Control::Jump, JUMP_HOLD),
            Action::LookAround => {
                let yaw = self.rng.random_range(-PI..PI);
                let pitch = self.rng.random_range(-FRAC_PI_4..=FRAC_PI_4);
                self.attempt.session.look(yaw, pitch);
            }
            Action::ToggleCrouch => {
                self.attempt.is_crouching = !self.attempt.is_crouching;
                self.attempt
                    .session
                    .set_control_state(Control::Sneak, self.attempt.is_crouching);
            }
            Action::Wander => self.wander(),
            Action::SwingArm => {
                let swings = self.rng.random_range(2..=4u8);
                self.swing(swings);
            }
            Action::DigNearby => self.dig_nearby(),
            Action::SwitchSlot => {
                let slot = self.rng.random_range(0..HOTBAR_SLOTS);
                self.attempt.session.select_slot(slot);
            }
            Action::DropItem => {
                let inventory = self.attempt.session.inventory();
                match inventory.choose(self.rng) {
                    Some(stack) => self.attempt.session.toss(stack.slot, 1),
                    None => tracing::debug!("Inventory empty, nothing to drop"),
                }
            }
            Action::LookAtEntity => self.look_at_entity(),
        }
    }

    /// Swing once now and schedule `swings - 1` more.
    pub fn swing(&mut self, swings: u8) {
        self.attempt.session.swing_arm();
        if swings > 1 {
            let gap = uniform_delay(self.rng, SWING_GAP_MIN, SWING_GAP_MAX);
            self.timers.schedule(
                self.now + gap,
                Job::Swing {
                    generation: self.attempt.generation,
                    remaining: swings - 1,
                },
            );
        }
    }

    fn hold(&mut self, control: Control, duration: Duration) {
        self.attempt.session.set_control_state(control, true);
        self.timers.schedule(
            self.now + duration,
            Job::ReleaseControl {
                generation: self.attempt.generation,
                control,
            },
        );
    }

    fn wander(&mut self) {
        let session = &self.attempt.session;
        if session.is_moving() {
            tracing::debug!("Already navigating, not wandering");
            return;
        }
        let radius = self.wander_radius;
        let origin = session.position();
        let goal = GoalNearXZ {
            x: origin.x + self.rng.random_range(-radius..=radius),
            z: origin.z + self.rng.random_range(-radius..=radius),
            range: WANDER_TOLERANCE,
        };
        session.set_goal(Some(goal));
    }

    fn dig_nearby(&mut self) {
        let session = &self.attempt.session;
        let Some(block) = session.find_block(DIG_REACH, &|b| b.diggable && !b.is_air()) else {
            tracing::debug!("No diggable block in reach");
            return;
        };
        let center = block.position.as_dvec3() + DVec3::splat(0.5);
        let facing = look_angles(eye_position(session), center);
        session.look(facing.yaw, facing.pitch);
        session.dig(block.position);
    }

    fn look_at_entity(&mut self) {
        let session = &self.attempt.session;
        let own = session.username();
        let target = session.nearest_entity(LOOK_AT_RANGE, &|e| {
            e.kind == EntityKind::Player && e.name.as_deref() != Some(own)
        });
        match target {
            Some(entity) => {
                let facing = look_angles(eye_position(session), entity.eye_position());
                session.look(facing.yaw, facing.pitch);
            }
            None => tracing::debug!("Nobody around to look at"),
        }
    }
}

fn eye_position<S: GameSession>(session: &S) -> DVec3 {
    session.position() + DVec3::new(0.0, EYE_HEIGHT, 0.0)
}
