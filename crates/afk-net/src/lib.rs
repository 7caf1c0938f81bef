//! Connected-session layer: the event/command surface the session core drives,
//! and a TCP transport that implements it.
//!
//! [`session`] defines the collaborator traits ([`GameSession`], [`Navigator`],
//! [`Connector`]) and their event and value types. The remaining modules are
//! one concrete implementation: length-prefixed framing, postcard-encoded wire
//! messages, a cached view of the pushed world state, and the TCP client.

pub mod framing;
pub mod messages;
pub mod session;
pub mod tcp_client;
pub mod world;

pub use framing::{FrameConfig, FrameError, FrameReader, FrameWriter};
pub use messages::{MessageError, PROTOCOL_VERSION, WireMessage};
pub use session::{
    Block, ConnectOptions, Connector, Control, Entity, EntityKind, GameSession, GoalNearXZ,
    ItemStack, MovementProfile, Navigator, Orientation, SessionEvent, look_angles,
};
pub use tcp_client::{TcpConnector, TcpSession, TransportError};
pub use world::WorldView;
