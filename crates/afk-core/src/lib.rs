//! Session-resilience core of the AFK keeper.
//!
//! One [`Bot`] drives an endless sequence of session attempts against a
//! [`Connector`](afk_net::Connector):
//!
//! - the [`LivenessWatchdog`] terminates connections that stop ticking,
//! - the [`DisconnectCoordinator`] funnels every failure signal of an attempt
//!   into exactly one reconnect, delayed by the [`BackoffPolicy`] tier,
//! - the [`ActionScheduler`] keeps dispatching idle [`Action`]s while the
//!   attempt is live,
//! - the [`MentionResponder`] answers chat lines that mention the bot.
//!
//! All of it runs on a single task. Deferred work is a [`Job`] in one
//! [`TimerQueue`]; every job that belongs to an attempt carries that attempt's
//! generation and becomes a no-op once the attempt is gone.

pub mod actions;
pub mod attempt;
pub mod backoff;
pub mod chat;
pub mod coordinator;
pub mod driver;
pub mod job;
pub mod scheduler;
pub mod settings;
pub mod timers;
pub mod watchdog;

#[cfg(test)]
mod test_support;

pub use actions::Action;
pub use attempt::SessionAttempt;
pub use backoff::BackoffPolicy;
pub use chat::{MentionResponder, PlannedReply};
pub use coordinator::{DisconnectCoordinator, SessionFailure};
pub use driver::Bot;
pub use job::{Generation, Job};
pub use scheduler::ActionScheduler;
pub use settings::{BotSettings, ReplySettings};
pub use timers::{TimerId, TimerQueue};
pub use watchdog::LivenessWatchdog;
