//! Game Logic Module
//!
//! Per-peer simulation state. Nothing in here knows about roles or messages.
//!
//! ## Module Structure
//!
//! - `skill`: Skill kinds, bounded levels, level-change sinks
//! - `character`: Character entity owning a skill set
//! - `bomb`: Bomb objects and the spawner seam
//! - `level`: Tile matrix to world placements
//! - `state`: One peer's arena state
//! - `events`: Events for HUD/telemetry and tests

pub mod skill;
pub mod character;
pub mod bomb;
pub mod level;
pub mod state;
pub mod events;

// Re-export key types
pub use skill::{SkillKind, Skill, SkillSet, SkillError, LevelSink, NullSink};
pub use character::{ActorId, Character, CharacterConfig, MovementConfig, SkillBounds};
pub use bomb::{ActionSpawner, Bomb, BombField, BombId, BombOrigin, BombTemplate};
pub use level::{LevelGrid, LevelError, Placement, Tile};
pub use state::ArenaState;
pub use events::{GameEvent, GameEventData};
