//! Protocol Messages
//!
//! Messages exchanged between peers for bomb throws and skill upgrades.
//! Envelopes are serialized as JSON for debugging ease; the flat payload
//! structs also encode to binary (bincode).

use std::fmt;
use serde::{Serialize, Deserialize};

use crate::core::vec3::{Vec3, Rotator};
use crate::game::character::ActorId;
use crate::game::skill::SkillKind;

/// Peer identifier within a session.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct PeerId(pub u32);

impl PeerId {
    /// The hosting (authoritative) peer.
    pub const HOST: PeerId = PeerId(0);
}

impl fmt::Debug for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Peer#{}", self.0)
    }
}

impl fmt::Display for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "peer#{}", self.0)
    }
}

/// A throw waiting to be executed by the authority.
///
/// Produced once per trigger, consumed once, never stored.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ThrowRequest {
    /// Character that threw.
    pub origin: ActorId,
    /// Grid-snapped spawn position.
    pub position: Vec3,
    /// Thrower's facing at trigger time.
    pub orientation: Rotator,
}

/// An executed throw announced to observers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ThrowBroadcast {
    /// Character that threw.
    pub origin: ActorId,
    /// Peer whose Execute spawned the real bomb.
    pub executor: PeerId,
    /// Spawn position.
    pub position: Vec3,
    /// Spawn orientation.
    pub orientation: Rotator,
    /// Power read at Execute time.
    pub power: i32,
}

// =============================================================================
// REMOTE -> AUTHORITY
// =============================================================================

/// Messages sent from a remote peer to the authority.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Ask the authority to execute a throw.
    ThrowBomb(ThrowRequest),
}

// =============================================================================
// AUTHORITY -> OBSERVERS
// =============================================================================

/// Messages multicast from the authority to every observer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// A throw was executed; mirror it.
    BombThrown(ThrowBroadcast),

    /// Apply one upgrade event to a character replica.
    SkillUpgraded {
        /// Character upgraded
        actor_id: ActorId,
        /// Skill raised
        kind: SkillKind,
    },
}

// =============================================================================
// SERIALIZATION HELPERS
// =============================================================================

impl ClientMessage {
    /// Serialize to JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize from JSON string.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}

impl ServerMessage {
    /// Serialize to JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize from JSON string.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}

impl ThrowRequest {
    /// Serialize to binary.
    pub fn to_bytes(&self) -> Result<Vec<u8>, bincode::Error> {
        bincode::serialize(self)
    }

    /// Deserialize from binary.
    pub fn from_bytes(data: &[u8]) -> Result<Self, bincode::Error> {
        bincode::deserialize(data)
    }
}

impl ThrowBroadcast {
    /// Serialize to binary.
    pub fn to_bytes(&self) -> Result<Vec<u8>, bincode::Error> {
        bincode::serialize(self)
    }

    /// Deserialize from binary.
    pub fn from_bytes(data: &[u8]) -> Result<Self, bincode::Error> {
        bincode::deserialize(data)
    }
}
