//! Player Character
//!
//! A character owns its skill set and the values derived from it.
//! Derived values are recomputed synchronously when a level changes,
//! not polled every frame.

use std::fmt;
use serde::{Serialize, Deserialize};

use crate::core::vec3::{Vec3, Rotator};
use crate::game::skill::{SkillSet, SkillKind, SkillError, LevelSink};

// =============================================================================
// ACTOR ID
// =============================================================================

/// Unique actor identifier (UUID as bytes).
///
/// Implements Ord for deterministic BTreeMap ordering.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct ActorId(pub [u8; 16]);

impl ActorId {
    /// Create from raw bytes.
    pub const fn new(bytes: [u8; 16]) -> Self {
        Self(bytes)
    }

    /// Fresh random id.
    pub fn random() -> Self {
        Self(*uuid::Uuid::new_v4().as_bytes())
    }

    /// Create from UUID string.
    pub fn from_uuid_str(s: &str) -> Option<Self> {
        uuid::Uuid::parse_str(s)
            .ok()
            .map(|u| Self(*u.as_bytes()))
    }

    /// Convert to UUID string.
    pub fn to_uuid_string(&self) -> String {
        uuid::Uuid::from_bytes(self.0).to_string()
    }

    /// Get raw bytes.
    pub fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }

    /// Short hex prefix for logs.
    pub fn short(&self) -> String {
        hex::encode(&self.0[..4])
    }
}

impl fmt::Debug for ActorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ActorId({})", self.short())
    }
}

// =============================================================================
// CONFIGURATION
// =============================================================================

/// Inclusive level bounds for one skill kind.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkillBounds {
    /// Starting and lowest level
    pub min: i32,
    /// Highest reachable level
    pub max: i32,
}

impl SkillBounds {
    /// Create bounds.
    pub const fn new(min: i32, max: i32) -> Self {
        Self { min, max }
    }
}

/// Walk speed tuning.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MovementConfig {
    /// Walk speed before any `Speed` bonus
    pub base_walk_speed: f32,
    /// Walk speed added per `Speed` level
    pub speed_per_level: f32,
}

impl Default for MovementConfig {
    fn default() -> Self {
        Self {
            base_walk_speed: 200.0,
            speed_per_level: 100.0,
        }
    }
}

impl MovementConfig {
    /// Max walk speed for a `Speed` level.
    #[inline]
    pub fn walk_speed(&self, speed_level: i32) -> f32 {
        self.base_walk_speed + self.speed_per_level * speed_level as f32
    }
}

/// Starting skills and movement tuning for a new character.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CharacterConfig {
    /// Bounds for `BlastRadius`
    pub blast_radius: SkillBounds,
    /// Bounds for `BombCount`
    pub bomb_count: SkillBounds,
    /// Bounds for `Speed`
    pub speed: SkillBounds,
    /// Walk speed tuning
    #[serde(flatten)]
    pub movement: MovementConfig,
}

impl Default for CharacterConfig {
    fn default() -> Self {
        Self {
            blast_radius: SkillBounds::new(2, 8),
            bomb_count: SkillBounds::new(1, 4),
            speed: SkillBounds::new(1, 6),
            movement: MovementConfig::default(),
        }
    }
}

impl CharacterConfig {
    /// Bounds for a kind.
    pub fn bounds(&self, kind: SkillKind) -> SkillBounds {
        match kind {
            SkillKind::BlastRadius => self.blast_radius,
            SkillKind::BombCount => self.bomb_count,
            SkillKind::Speed => self.speed,
        }
    }

    /// Build the starting skill set.
    pub fn skill_set(&self) -> Result<SkillSet, SkillError> {
        SkillSet::from_bounds(SkillKind::ALL.iter().map(|&kind| {
            let bounds = self.bounds(kind);
            (kind, bounds.min, bounds.max)
        }))
    }

    /// Max walk speed for a `Speed` level.
    #[inline]
    pub fn walk_speed(&self, speed_level: i32) -> f32 {
        self.movement.walk_speed(speed_level)
    }
}

// =============================================================================
// CHARACTER
// =============================================================================

/// A player character as seen by one peer.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Character {
    id: ActorId,
    position: Vec3,
    orientation: Rotator,
    skills: SkillSet,
    max_walk_speed: f32,
    movement: MovementConfig,
}

impl Character {
    /// Create a character with the configured starting skills.
    pub fn new(id: ActorId, position: Vec3, config: &CharacterConfig) -> Result<Self, SkillError> {
        Self::with_skills(id, position, config, config.skill_set()?)
    }

    /// Create a character with an explicit skill set.
    ///
    /// The set must hold every declared kind.
    pub fn with_skills(
        id: ActorId,
        position: Vec3,
        config: &CharacterConfig,
        skills: SkillSet,
    ) -> Result<Self, SkillError> {
        skills.ensure_complete()?;
        let speed_level = skills.level_of(SkillKind::Speed)?;
        Ok(Self {
            id,
            position,
            orientation: Rotator::IDENTITY,
            skills,
            max_walk_speed: config.walk_speed(speed_level),
            movement: config.movement,
        })
    }

    /// Actor id.
    #[inline]
    pub fn id(&self) -> ActorId {
        self.id
    }

    /// Current world position.
    #[inline]
    pub fn position(&self) -> Vec3 {
        self.position
    }

    /// Current facing.
    #[inline]
    pub fn orientation(&self) -> Rotator {
        self.orientation
    }

    /// Skill levels.
    #[inline]
    pub fn skills(&self) -> &SkillSet {
        &self.skills
    }

    /// Current max walk speed.
    #[inline]
    pub fn max_walk_speed(&self) -> f32 {
        self.max_walk_speed
    }

    /// Move the character (engine-driven).
    pub fn set_transform(&mut self, position: Vec3, orientation: Rotator) {
        self.position = position;
        self.orientation = orientation;
    }

    /// Apply one upgrade event to `kind`.
    ///
    /// Derived values update before `sink` is notified. A no-op at the
    /// ceiling notifies nobody.
    pub fn upgrade_skill<S>(&mut self, kind: SkillKind, sink: &mut S) -> Result<i32, SkillError>
    where
        S: LevelSink + ?Sized,
    {
        let mut changed = None;
        let level = self
            .skills
            .upgrade(kind, &mut |k: SkillKind, l: i32| changed = Some((k, l)))?;

        if let Some((kind, level)) = changed {
            self.on_skill_changed(kind, level);
            sink.level_changed(kind, level);
        }
        Ok(level)
    }

    /// Recompute values derived from a skill level.
    fn on_skill_changed(&mut self, kind: SkillKind, level: i32) {
        if kind == SkillKind::Speed {
            self.max_walk_speed = self.movement.walk_speed(level);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::skill::NullSink;

    fn character() -> Character {
        Character::new(ActorId::new([1; 16]), Vec3::ZERO, &CharacterConfig::default()).unwrap()
    }

    #[test]
    fn test_default_roster() {
        let c = character();
        assert_eq!(c.skills().level_of(SkillKind::BlastRadius).unwrap(), 2);
        assert_eq!(c.skills().level_of(SkillKind::BombCount).unwrap(), 1);
        assert_eq!(c.skills().level_of(SkillKind::Speed).unwrap(), 1);
        assert_eq!(c.skills().get(SkillKind::BlastRadius).unwrap().max(), 8);
        assert_eq!(c.skills().get(SkillKind::BombCount).unwrap().max(), 4);
        assert_eq!(c.skills().get(SkillKind::Speed).unwrap().max(), 6);
    }

    #[test]
    fn test_speed_upgrade_recomputes_walk_speed() {
        let mut c = character();
        assert_eq!(c.max_walk_speed(), 300.0);

        c.upgrade_skill(SkillKind::Speed, &mut NullSink).unwrap();
        assert_eq!(c.max_walk_speed(), 400.0);

        for _ in 0..10 {
            c.upgrade_skill(SkillKind::Speed, &mut NullSink).unwrap();
        }
        assert_eq!(c.max_walk_speed(), 800.0);
    }

    #[test]
    fn test_custom_movement_drives_walk_speed() {
        let config = CharacterConfig {
            movement: MovementConfig { base_walk_speed: 50.0, speed_per_level: 25.0 },
            ..CharacterConfig::default()
        };
        let mut c = Character::new(ActorId::new([3; 16]), Vec3::ZERO, &config).unwrap();
        assert_eq!(c.max_walk_speed(), config.walk_speed(1));
        assert_eq!(c.max_walk_speed(), 75.0);

        c.upgrade_skill(SkillKind::Speed, &mut NullSink).unwrap();
        assert_eq!(c.max_walk_speed(), config.walk_speed(2));
        assert_eq!(c.max_walk_speed(), 100.0);
    }

    #[test]
    fn test_other_upgrades_leave_speed_alone() {
        let mut c = character();
        c.upgrade_skill(SkillKind::BlastRadius, &mut NullSink).unwrap();
        assert_eq!(c.max_walk_speed(), 300.0);
        assert_eq!(c.skills().level_of(SkillKind::BlastRadius).unwrap(), 3);
    }

    #[test]
    fn test_sink_sees_only_real_changes() {
        let mut c = character();
        let mut seen = Vec::new();
        let mut sink = |kind: SkillKind, level: i32| seen.push((kind, level));
        for _ in 0..5 {
            c.upgrade_skill(SkillKind::BombCount, &mut sink).unwrap();
        }
        assert_eq!(seen.len(), 3);
        assert_eq!(seen.last(), Some(&(SkillKind::BombCount, 4)));
    }

    #[test]
    fn test_incomplete_skill_set_rejected() {
        let mut skills = SkillSet::new();
        skills.init(SkillKind::Speed, 1, 6).unwrap();
        let err = Character::with_skills(
            ActorId::new([2; 16]),
            Vec3::ZERO,
            &CharacterConfig::default(),
            skills,
        )
        .unwrap_err();
        assert_eq!(err, SkillError::Incomplete(SkillKind::BlastRadius));
    }

    #[test]
    fn test_actor_id_uuid_roundtrip() {
        let id = ActorId::random();
        assert_eq!(ActorId::from_uuid_str(&id.to_uuid_string()), Some(id));
        assert_eq!(id.short().len(), 8);
    }
}
