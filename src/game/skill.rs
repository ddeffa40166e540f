//! Character Skills
//!
//! Each character carries one integer level per skill kind, clamped to the
//! bounds it was registered with. Other systems read the levels: movement
//! speed from `Speed`, bomb power from `BlastRadius`, and `BombCount` doubles
//! as the number of bombs the character may still drop.

use std::collections::BTreeMap;
use std::fmt;
use serde::{Serialize, Deserialize};

/// Skill kinds a character can level up.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum SkillKind {
    /// Flame length of dropped bombs
    BlastRadius = 0,
    /// Bombs available to drop (consumable)
    BombCount = 1,
    /// Walk speed bonus
    Speed = 2,
}

impl SkillKind {
    /// Every declared kind, in registration order.
    pub const ALL: [SkillKind; 3] = [SkillKind::BlastRadius, SkillKind::BombCount, SkillKind::Speed];

    /// Whether the level is also a spendable count.
    #[inline]
    pub fn is_consumable(self) -> bool {
        matches!(self, SkillKind::BombCount)
    }

    /// Get kind from index (0-2).
    pub fn from_index(index: u8) -> Option<SkillKind> {
        match index {
            0 => Some(SkillKind::BlastRadius),
            1 => Some(SkillKind::BombCount),
            2 => Some(SkillKind::Speed),
            _ => None,
        }
    }
}

impl fmt::Display for SkillKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SkillKind::BlastRadius => "blast_radius",
            SkillKind::BombCount => "bomb_count",
            SkillKind::Speed => "speed",
        };
        f.write_str(name)
    }
}

/// Skill contract violations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SkillError {
    /// Registration with `min > max`.
    #[error("invalid bounds for {kind}: min {min} > max {max}")]
    InvalidBounds {
        /// Offending kind
        kind: SkillKind,
        /// Requested minimum
        min: i32,
        /// Requested maximum
        max: i32,
    },

    /// Kind registered twice.
    #[error("skill {0} already registered")]
    AlreadyRegistered(SkillKind),

    /// Lookup of a kind that was never registered.
    #[error("skill {0} not registered")]
    Unregistered(SkillKind),

    /// Affordability asked of a modifier-only kind.
    #[error("skill {0} is not consumable")]
    NotConsumable(SkillKind),

    /// A skill set is missing a declared kind.
    #[error("skill set is missing {0}")]
    Incomplete(SkillKind),
}

/// A single leveled skill.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Skill {
    kind: SkillKind,
    level: i32,
    min: i32,
    max: i32,
}

impl Skill {
    /// Create a skill at its minimum level.
    pub fn new(kind: SkillKind, min: i32, max: i32) -> Result<Self, SkillError> {
        if min > max {
            return Err(SkillError::InvalidBounds { kind, min, max });
        }
        Ok(Self { kind, level: min, min, max })
    }

    /// Skill kind.
    #[inline]
    pub fn kind(&self) -> SkillKind {
        self.kind
    }

    /// Current level.
    #[inline]
    pub fn level(&self) -> i32 {
        self.level
    }

    /// Lower bound.
    #[inline]
    pub fn min(&self) -> i32 {
        self.min
    }

    /// Upper bound.
    #[inline]
    pub fn max(&self) -> i32 {
        self.max
    }

    /// Whether the level sits at the ceiling.
    #[inline]
    pub fn is_maxed(&self) -> bool {
        self.level == self.max
    }

    /// Raise the level by one. Returns the new level, or `None` at the ceiling.
    fn raise(&mut self) -> Option<i32> {
        if self.is_maxed() {
            return None;
        }
        self.level += 1;
        Some(self.level)
    }
}

/// Receives level changes. Fire-and-forget.
pub trait LevelSink {
    /// Called once per effective level change.
    fn level_changed(&mut self, kind: SkillKind, level: i32);
}

impl<F> LevelSink for F
where
    F: FnMut(SkillKind, i32),
{
    fn level_changed(&mut self, kind: SkillKind, level: i32) {
        self(kind, level)
    }
}

/// Sink that drops every notification.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl LevelSink for NullSink {
    fn level_changed(&mut self, _kind: SkillKind, _level: i32) {}
}

/// Per-kind skill levels owned by one character.
///
/// Uses BTreeMap so iteration (and serialization) is ordered by kind.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkillSet {
    skills: BTreeMap<SkillKind, Skill>,
}

impl SkillSet {
    /// Create an empty set. Use [`SkillSet::init`] to register kinds.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a complete set from `(kind, min, max)` triples.
    pub fn from_bounds<I>(bounds: I) -> Result<Self, SkillError>
    where
        I: IntoIterator<Item = (SkillKind, i32, i32)>,
    {
        let mut set = Self::new();
        for (kind, min, max) in bounds {
            set.init(kind, min, max)?;
        }
        set.ensure_complete()?;
        Ok(set)
    }

    /// Register `kind` with level starting at `min`.
    pub fn init(&mut self, kind: SkillKind, min: i32, max: i32) -> Result<(), SkillError> {
        if self.skills.contains_key(&kind) {
            return Err(SkillError::AlreadyRegistered(kind));
        }
        self.skills.insert(kind, Skill::new(kind, min, max)?);
        Ok(())
    }

    /// Fail unless every declared kind is registered.
    pub fn ensure_complete(&self) -> Result<(), SkillError> {
        match SkillKind::ALL.iter().find(|kind| !self.skills.contains_key(*kind)) {
            Some(missing) => Err(SkillError::Incomplete(*missing)),
            None => Ok(()),
        }
    }

    /// Look up a skill.
    pub fn get(&self, kind: SkillKind) -> Result<&Skill, SkillError> {
        self.skills.get(&kind).ok_or(SkillError::Unregistered(kind))
    }

    /// Current level of `kind`.
    pub fn level_of(&self, kind: SkillKind) -> Result<i32, SkillError> {
        self.get(kind).map(Skill::level)
    }

    /// Whether a consumable kind has anything left to spend.
    pub fn can_afford(&self, kind: SkillKind) -> Result<bool, SkillError> {
        if !kind.is_consumable() {
            return Err(SkillError::NotConsumable(kind));
        }
        Ok(self.level_of(kind)? > 0)
    }

    /// Raise `kind` by one level, saturating at its maximum.
    ///
    /// `sink` hears about the change only if the level actually moved.
    /// Returns the level after the call.
    pub fn upgrade<S>(&mut self, kind: SkillKind, sink: &mut S) -> Result<i32, SkillError>
    where
        S: LevelSink + ?Sized,
    {
        let skill = self.skills.get_mut(&kind).ok_or(SkillError::Unregistered(kind))?;
        match skill.raise() {
            Some(level) => {
                sink.level_changed(kind, level);
                Ok(level)
            }
            None => Ok(skill.level()),
        }
    }

    /// Iterate skills in kind order.
    pub fn iter(&self) -> impl Iterator<Item = &Skill> {
        self.skills.values()
    }

    /// Number of registered kinds.
    pub fn len(&self) -> usize {
        self.skills.len()
    }

    /// Whether no kind is registered.
    pub fn is_empty(&self) -> bool {
        self.skills.is_empty()
    }
}
