//! Arena State
//!
//! One peer's view of the arena: character replicas, the bombs it has
//! spawned or mirrored, and the events it recorded.
//! Uses BTreeMap for deterministic iteration order.

use std::collections::BTreeMap;

use crate::core::hash::WorldHash;
use crate::core::vec3::Vec3;
use crate::game::bomb::BombField;
use crate::game::character::{ActorId, Character, CharacterConfig};
use crate::game::events::GameEvent;
use crate::game::skill::{SkillError, SkillKind};

/// State of one peer's simulation.
#[derive(Clone, Debug, Default)]
pub struct ArenaState {
    /// Current tick
    pub tick: u32,
    /// Character replicas by id
    pub characters: BTreeMap<ActorId, Character>,
    /// Bombs known to this peer
    pub bombs: BombField,
    /// Events recorded this session
    pub events: Vec<GameEvent>,
}

impl ArenaState {
    /// Create an empty arena.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a character replica with the configured starting skills.
    pub fn add_character(
        &mut self,
        id: ActorId,
        position: Vec3,
        config: &CharacterConfig,
    ) -> Result<&mut Character, SkillError> {
        let character = Character::new(id, position, config)?;
        Ok(self.characters.entry(id).or_insert(character))
    }

    /// Get a character.
    pub fn character(&self, id: &ActorId) -> Option<&Character> {
        self.characters.get(id)
    }

    /// Get a character mutably.
    pub fn character_mut(&mut self, id: &ActorId) -> Option<&mut Character> {
        self.characters.get_mut(id)
    }

    /// Apply one upgrade event to a character and record the change.
    ///
    /// Returns `None` if the character is unknown on this peer.
    pub fn upgrade_skill(&mut self, id: ActorId, kind: SkillKind) -> Option<Result<i32, SkillError>> {
        let tick = self.tick;
        let events = &mut self.events;
        let character = self.characters.get_mut(&id)?;
        Some(character.upgrade_skill(kind, &mut |kind: SkillKind, level: i32| {
            events.push(GameEvent::skill_leveled(tick, id, kind, level));
        }))
    }

    /// Advance one tick: burn fuses and log expiries.
    pub fn advance(&mut self) {
        self.tick += 1;
        for bomb in self.bombs.tick_fuses() {
            self.events.push(GameEvent::bomb_expired(self.tick, bomb.id, bomb.owner));
        }
    }

    /// Digest of the replicated world.
    pub fn digest(&self) -> WorldHash {
        self.bombs.digest()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::bomb::{ActionSpawner, BombOrigin, BombTemplate};
    use crate::game::events::GameEventData;
    use crate::core::vec3::Rotator;

    #[test]
    fn test_upgrade_records_event() {
        let mut state = ArenaState::new();
        let id = ActorId::new([1; 16]);
        state.add_character(id, Vec3::ZERO, &CharacterConfig::default()).unwrap();

        let level = state.upgrade_skill(id, SkillKind::BlastRadius).unwrap().unwrap();
        assert_eq!(level, 3);
        assert_eq!(state.events.len(), 1);
        assert_eq!(
            state.events[0].data,
            GameEventData::SkillLeveled { actor_id: id, kind: SkillKind::BlastRadius, level: 3 }
        );
    }

    #[test]
    fn test_upgrade_unknown_character() {
        let mut state = ArenaState::new();
        assert!(state.upgrade_skill(ActorId::new([9; 16]), SkillKind::Speed).is_none());
    }

    #[test]
    fn test_add_character_keeps_existing_replica() {
        let mut state = ArenaState::new();
        let id = ActorId::new([1; 16]);
        state.add_character(id, Vec3::ZERO, &CharacterConfig::default()).unwrap();
        state.upgrade_skill(id, SkillKind::Speed);
        let again = state.add_character(id, Vec3::ZERO, &CharacterConfig::default()).unwrap();
        assert_eq!(again.skills().level_of(SkillKind::Speed).unwrap(), 2);
    }

    #[test]
    fn test_advance_expires_bombs() {
        let mut state = ArenaState::new();
        let template = BombTemplate { name: "bomb".to_string(), fuse_ticks: 1 };
        state.bombs.spawn(&template, Vec3::ZERO, Rotator::IDENTITY, BombOrigin::Executed);
        state.advance();
        assert!(state.bombs.is_empty());
        assert!(matches!(state.events[0].data, GameEventData::BombExpired { .. }));
    }
}
