//! Game Events
//!
//! Events recorded by a peer while it applies skill changes and throws.
//! Consumed by the HUD/telemetry side and by tests.

use serde::{Serialize, Deserialize};
use crate::core::vec3::Vec3;
use crate::game::bomb::BombId;
use crate::game::character::ActorId;
use crate::game::skill::SkillKind;

/// Game event data.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum GameEventData {
    /// A skill level moved
    SkillLeveled {
        actor_id: ActorId,
        kind: SkillKind,
        level: i32,
    },

    /// The authority ran Execute for a throw
    BombExecuted {
        actor_id: ActorId,
        bomb_id: BombId,
        position: Vec3,
        power: i32,
    },

    /// A peer mirrored a throw the authority executed
    BombMirrored {
        actor_id: ActorId,
        bomb_id: BombId,
        position: Vec3,
        power: i32,
    },

    /// A bomb's fuse ran out
    BombExpired {
        bomb_id: BombId,
        owner: Option<ActorId>,
    },
}

/// A game event with timing.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GameEvent {
    /// Tick when event occurred
    pub tick: u32,

    /// Event data
    pub data: GameEventData,
}

impl GameEvent {
    /// Create a new event.
    pub fn new(tick: u32, data: GameEventData) -> Self {
        Self { tick, data }
    }

    /// Create skill leveled event.
    pub fn skill_leveled(tick: u32, actor_id: ActorId, kind: SkillKind, level: i32) -> Self {
        Self::new(tick, GameEventData::SkillLeveled { actor_id, kind, level })
    }

    /// Create bomb executed event.
    pub fn bomb_executed(tick: u32, actor_id: ActorId, bomb_id: BombId, position: Vec3, power: i32) -> Self {
        Self::new(tick, GameEventData::BombExecuted { actor_id, bomb_id, position, power })
    }

    /// Create bomb mirrored event.
    pub fn bomb_mirrored(tick: u32, actor_id: ActorId, bomb_id: BombId, position: Vec3, power: i32) -> Self {
        Self::new(tick, GameEventData::BombMirrored { actor_id, bomb_id, position, power })
    }

    /// Create bomb expired event.
    pub fn bomb_expired(tick: u32, bomb_id: BombId, owner: Option<ActorId>) -> Self {
        Self::new(tick, GameEventData::BombExpired { bomb_id, owner })
    }

    /// Actor involved, if any.
    pub fn actor_id(&self) -> Option<ActorId> {
        match &self.data {
            GameEventData::SkillLeveled { actor_id, .. } => Some(*actor_id),
            GameEventData::BombExecuted { actor_id, .. } => Some(*actor_id),
            GameEventData::BombMirrored { actor_id, .. } => Some(*actor_id),
            GameEventData::BombExpired { owner, .. } => *owner,
        }
    }
}
