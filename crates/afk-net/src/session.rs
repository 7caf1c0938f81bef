//! Collaborator interface between the session core and a connected game session.
//!
//! A [`Connector`] opens one connection per call and hands back a session
//! handle plus the receiving end of that connection's [`SessionEvent`] stream.
//! Opening is non-blocking: connect failures surface later as
//! [`SessionEvent::Error`] followed by [`SessionEvent::Ended`].

use std::time::Duration;

use afk_config::{AuthMode, ServerConfig, ViewDistance};
use glam::{DVec3, IVec3};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

/// Everything a session reports back to its owner.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// Login finished and the player is in the world.
    Established,
    /// The server removed the player.
    Kicked(String),
    /// The connection is gone. Sent exactly once per connection.
    Ended(String),
    /// Transport or protocol failure.
    Error(String),
    /// Inbound chat line.
    Chat {
        /// Author of the message.
        username: String,
        /// Message text.
        message: String,
    },
    /// Periodic physics update from the server; proof that the session is alive.
    PhysicsTick,
}

// ---------------------------------------------------------------------------
// Value types
// ---------------------------------------------------------------------------

/// Named movement control states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Control {
    Forward,
    Back,
    Left,
    Right,
    Jump,
    Sprint,
    Sneak,
}

impl Control {
    /// Every control, in declaration order.
    pub const ALL: [Control; 7] = [
        Control::Forward,
        Control::Back,
        Control::Left,
        Control::Right,
        Control::Jump,
        Control::Sprint,
        Control::Sneak,
    ];

    /// The four planar walking directions.
    pub const DIRECTIONS: [Control; 4] =
        [Control::Forward, Control::Back, Control::Left, Control::Right];
}

/// Head orientation in radians. Yaw 0 faces -Z; pitch is positive looking up.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Orientation {
    pub yaw: f32,
    pub pitch: f32,
}

/// One inventory stack.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemStack {
    /// Inventory slot index.
    pub slot: u8,
    /// Item identifier, e.g. `"dirt"`.
    pub name: String,
    /// Units in the stack.
    pub count: u32,
}

/// A block known to the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    pub position: IVec3,
    /// Block identifier, e.g. `"grass_block"`.
    pub name: String,
    /// Whether the server allows breaking it.
    pub diggable: bool,
}

impl Block {
    /// Air blocks are never interesting targets.
    pub fn is_air(&self) -> bool {
        self.name == "air" || self.name.ends_with("_air")
    }
}

/// Broad entity category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntityKind {
    Player,
    Mob,
    Object,
}

/// An entity known to the session.
#[derive(Debug, Clone, PartialEq)]
pub struct Entity {
    pub id: u64,
    pub kind: EntityKind,
    /// Display name, if the server sent one.
    pub name: Option<String>,
    /// Feet position.
    pub position: DVec3,
    /// Eye height above the feet.
    pub eye_height: f64,
}

impl Entity {
    /// Position of the entity's eyes, used as a look target.
    pub fn eye_position(&self) -> DVec3 {
        self.position + DVec3::new(0.0, self.eye_height, 0.0)
    }
}

/// Navigation goal: get within `range` blocks of `(x, z)`, any height.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GoalNearXZ {
    pub x: f64,
    pub z: f64,
    pub range: f64,
}

impl GoalNearXZ {
    /// Whether `position` satisfies the goal.
    pub fn reached_by(&self, position: DVec3) -> bool {
        let dx = self.x - position.x;
        let dz = self.z - position.z;
        (dx * dx + dz * dz).sqrt() <= self.range
    }
}

/// What the navigator may do while moving.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MovementProfile {
    pub allow_sprinting: bool,
    pub can_dig: bool,
}

/// Yaw and pitch that make an observer at `from` look at `to`.
pub fn look_angles(from: DVec3, to: DVec3) -> Orientation {
    let delta = to - from;
    let horizontal = (delta.x * delta.x + delta.z * delta.z).sqrt();
    Orientation {
        yaw: (-delta.x).atan2(-delta.z) as f32,
        pitch: delta.y.atan2(horizontal) as f32,
    }
}

// ---------------------------------------------------------------------------
// Connection options
// ---------------------------------------------------------------------------

/// Everything needed to open one connection.
#[derive(Debug, Clone, PartialEq)]
pub struct ConnectOptions {
    pub host: String,
    pub port: u16,
    pub username: String,
    /// Protocol version string sent at login.
    pub version: String,
    pub view_distance: Option<ViewDistance>,
    pub auth: AuthMode,
    /// The transport's own keepalive check interval.
    pub liveness_check_interval: Duration,
}

impl ConnectOptions {
    /// Build options from the `server` config section.
    pub fn from_config(server: &ServerConfig) -> Self {
        Self {
            host: server.host.clone(),
            port: server.port,
            username: server.username.clone(),
            version: server.version.clone(),
            view_distance: server.view_distance,
            auth: server.auth.clone(),
            liveness_check_interval: Duration::from_millis(server.liveness_check_interval_ms),
        }
    }

    /// `host:port` string suitable for `TcpStream::connect`.
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

// ---------------------------------------------------------------------------
// Traits
// ---------------------------------------------------------------------------

/// Handle to one connected session: world queries and player commands.
///
/// Commands are fire-and-forget. Once the session has ended they are dropped
/// silently, so callers holding a stale handle never fail.
pub trait GameSession {
    /// Name the session logged in with.
    fn username(&self) -> &str;
    fn position(&self) -> DVec3;
    fn orientation(&self) -> Orientation;
    fn inventory(&self) -> Vec<ItemStack>;
    /// Nearest known block within `radius` for which `matches` returns true.
    fn find_block(&self, radius: f64, matches: &dyn Fn(&Block) -> bool) -> Option<Block>;
    /// Nearest known entity within `radius` for which `matches` returns true.
    fn nearest_entity(&self, radius: f64, matches: &dyn Fn(&Entity) -> bool) -> Option<Entity>;

    fn set_control_state(&self, control: Control, active: bool);
    /// Release every held control.
    fn clear_control_states(&self);
    /// Set absolute head orientation. Applied before any command issued after it.
    fn look(&self, yaw: f32, pitch: f32);
    fn dig(&self, position: IVec3);
    fn swing_arm(&self);
    /// Switch the active hotbar slot (0..9).
    fn select_slot(&self, slot: u8);
    /// Discard `count` units of the stack in `slot`.
    fn toss(&self, slot: u8, count: u32);
    fn chat(&self, message: &str);
    /// Terminate the connection. The session later reports [`SessionEvent::Ended`].
    fn quit(&self, reason: &str);
}

/// Pathing extension of a session.
pub trait Navigator {
    fn set_movements(&self, profile: MovementProfile);
    /// Replace the current goal; `None` clears it without releasing controls.
    fn set_goal(&self, goal: Option<GoalNearXZ>);
    /// Whether a goal is currently being pursued.
    fn is_moving(&self) -> bool;
    /// Drop the goal and release movement controls.
    fn stop(&self);
}

/// Opens sessions.
pub trait Connector {
    type Session: GameSession + Navigator;

    /// Start connecting and return immediately.
    fn connect(
        &mut self,
        options: &ConnectOptions,
    ) -> (Self::Session, mpsc::UnboundedReceiver<SessionEvent>);
}
