//! Wire messages and their serialization.
//!
//! All messages are serialized with [`postcard`] and prefixed with a protocol
//! version byte. Use [`encode`] and [`decode`] for encoding/decoding; the
//! framing layer wraps the result in a length prefix.

use afk_config::{AuthMode, ViewDistance};
use serde::{Deserialize, Serialize};

use crate::session::{Control, EntityKind};

/// Current wire-protocol version. Prepended to every serialized message.
pub const PROTOCOL_VERSION: u8 = 1;

// ---------------------------------------------------------------------------
// Top-level enum
// ---------------------------------------------------------------------------

/// Top-level wire message. The enum discriminant is the type tag.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum WireMessage {
    // --- Login ---
    /// Client asks to join.
    LoginRequest(LoginRequest),
    /// Server accepts or rejects the login.
    LoginResponse(LoginResponse),
    /// Server removes the player.
    Kick(Kick),
    /// Client leaves voluntarily.
    Quit(Quit),

    // --- World (server → client) ---
    /// Authoritative player position; one per server physics tick.
    PlayerState(PlayerState),
    /// A block changed (or became known).
    BlockUpdate(BlockUpdate),
    /// An entity moved or appeared.
    EntityUpdate(EntityUpdate),
    /// An entity left view.
    EntityRemoved(EntityRemoved),
    /// An inventory slot changed. A count of 0 empties it.
    InventorySlot(InventorySlot),

    // --- Player (client → server) ---
    /// Press or release a control.
    ControlInput(ControlInput),
    /// Absolute head orientation.
    Look(Look),
    /// Discrete player action.
    Action(PlayerAction),

    // --- Chat ---
    /// Chat line. The server fills `sender`; the client leaves it empty.
    Chat(ChatLine),

    // --- System ---
    /// Keepalive ping. Sender expects a Pong in response.
    Ping(Ping),
    /// Keepalive pong. Response to a Ping.
    Pong(Ping),
}

// ---------------------------------------------------------------------------
// Payload structs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoginRequest {
    pub username: String,
    /// Protocol version string the client was configured with.
    pub client_version: String,
    pub view_distance: Option<ViewDistance>,
    pub auth: AuthMode,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoginResponse {
    pub accepted: bool,
    /// Rejection reason; empty on success.
    pub reason: String,
    /// Spawn position.
    pub spawn: [f64; 3],
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Kick {
    pub reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Quit {
    pub reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlayerState {
    /// Server tick number.
    pub tick: u64,
    pub position: [f64; 3],
    pub yaw: f32,
    pub pitch: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BlockUpdate {
    pub position: [i32; 3],
    pub name: String,
    pub diggable: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EntityUpdate {
    pub entity_id: u64,
    pub kind: EntityKind,
    pub name: Option<String>,
    pub position: [f64; 3],
    pub eye_height: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EntityRemoved {
    pub entity_id: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InventorySlot {
    pub slot: u8,
    pub name: String,
    pub count: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ControlInput {
    pub control: Control,
    pub active: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Look {
    pub yaw: f32,
    pub pitch: f32,
}

/// Discrete actions a client can perform.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum PlayerAction {
    /// Start breaking the block at the given position.
    Dig { position: [i32; 3] },
    /// Swing the main hand without a target.
    SwingArm,
    /// Make a hotbar slot active.
    SelectSlot { slot: u8 },
    /// Throw away units of a stack.
    Drop { slot: u8, count: u32 },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatLine {
    pub sender: String,
    pub content: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Ping {
    /// Sequence number, echoed in the pong.
    pub sequence: u32,
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors that can occur during message decoding.
#[derive(Debug, thiserror::Error)]
pub enum MessageError {
    /// The payload was empty (no version byte).
    #[error("empty payload, no version byte")]
    EmptyPayload,

    /// The version byte does not match [`PROTOCOL_VERSION`].
    #[error("unsupported protocol version: {0}")]
    UnsupportedVersion(u8),

    /// Postcard (de)serialization failed.
    #[error("postcard error: {0}")]
    Postcard(#[from] postcard::Error),
}

// ---------------------------------------------------------------------------
// Serialization helpers
// ---------------------------------------------------------------------------

/// Serialize a [`WireMessage`] into a versioned binary payload.
///
/// Wire format: `[version: u8] [postcard-encoded WireMessage]`
pub fn encode(msg: &WireMessage) -> Result<Vec<u8>, MessageError> {
    let body = postcard::to_allocvec(msg)?;
    let mut out = Vec::with_capacity(1 + body.len());
    out.push(PROTOCOL_VERSION);
    out.extend_from_slice(&body);
    Ok(out)
}

/// Deserialize a versioned binary payload into a [`WireMessage`].
pub fn decode(data: &[u8]) -> Result<WireMessage, MessageError> {
    let (&version, body) = data.split_first().ok_or(MessageError::EmptyPayload)?;
    if version != PROTOCOL_VERSION {
        return Err(MessageError::UnsupportedVersion(version));
    }
    Ok(postcard::from_bytes(body)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_login_request_survives_encoding() {
        let msg = WireMessage::LoginRequest(LoginRequest {
            username: "afk_keeper".to_string(),
            client_version: "1.20.4".to_string(),
            view_distance: Some(ViewDistance::Chunks(4)),
            auth: AuthMode::Token("secret".to_string()),
        });
        let decoded = decode(&encode(&msg).unwrap()).unwrap();
        assert_eq!(msg, decoded);
    }

    #[test]
    fn test_player_action_variants_survive_encoding() {
        let actions = [
            PlayerAction::Dig {
                position: [-3, 64, 12],
            },
            PlayerAction::SwingArm,
            PlayerAction::SelectSlot { slot: 8 },
            PlayerAction::Drop { slot: 36, count: 1 },
        ];
        for action in actions {
            let msg = WireMessage::Action(action);
            assert_eq!(decode(&encode(&msg).unwrap()).unwrap(), msg);
        }
    }

    #[test]
    fn test_ping_is_compact() {
        let bytes = encode(&WireMessage::Ping(Ping { sequence: 1 })).unwrap();
        assert!(bytes.len() < 8, "Ping should be compact, got {} bytes", bytes.len());
    }

    #[test]
    fn test_version_byte_is_first_byte() {
        let bytes = encode(&WireMessage::Quit(Quit {
            reason: "bye".to_string(),
        }))
        .unwrap();
        assert_eq!(bytes[0], PROTOCOL_VERSION);
    }

    #[test]
    fn test_unsupported_version_rejected() {
        let mut bytes = encode(&WireMessage::Ping(Ping { sequence: 0 })).unwrap();
        bytes[0] = 255;
        assert!(matches!(
            decode(&bytes),
            Err(MessageError::UnsupportedVersion(255))
        ));
    }

    #[test]
    fn test_empty_payload_rejected() {
        assert!(matches!(decode(&[]), Err(MessageError::EmptyPayload)));
    }

    #[test]
    fn test_corrupted_payload_rejected() {
        let result = decode(&[PROTOCOL_VERSION, 0xFF, 0xFF, 0xFF]);
        assert!(result.is_err(), "Corrupted payload should fail decoding");
    }
}
