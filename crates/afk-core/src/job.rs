//! Deferred work items.

use afk_net::Control;

/// Identifies one session attempt. Strictly increasing over the process lifetime.
pub type Generation = u64;

/// A unit of deferred work in the shared [`TimerQueue`](crate::TimerQueue).
///
/// Every variant except [`Job::StartAttempt`] belongs to an attempt and is
/// discarded when it fires after that attempt stopped being live.
#[derive(Debug, Clone, PartialEq)]
pub enum Job {
    /// Tear down the current attempt and open a new one.
    StartAttempt,
    /// The liveness watchdog ran out.
    WatchdogExpired { generation: Generation },
    /// Settle delay after establishment elapsed; begin the action loop.
    StartActions { generation: Generation },
    /// Next iteration of the action loop.
    ActionTick { generation: Generation },
    /// Let go of a control pressed by a timed action.
    ReleaseControl {
        generation: Generation,
        control: Control,
    },
    /// One more arm swing of a swing sequence.
    Swing {
        generation: Generation,
        remaining: u8,
    },
    /// Deferred chat reply.
    SendChat {
        generation: Generation,
        message: String,
    },
}
