//! # Blast Arena
//!
//! Character skills and bomb-throw replication for a grid-based bomb arena.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                       BLAST ARENA                            │
//! ├─────────────────────────────────────────────────────────────┤
//! │  core/             - Shared primitives                       │
//! │  ├── vec3.rs       - World position and rotation             │
//! │  ├── grid.rs       - Cell quantization, spawn points         │
//! │  └── hash.rs       - World digests for convergence checks    │
//! │                                                              │
//! │  game/             - Per-peer simulation                     │
//! │  ├── skill.rs      - Bounded skill levels                    │
//! │  ├── character.rs  - Character owning a skill set            │
//! │  ├── bomb.rs       - Bombs and the spawner seam              │
//! │  ├── level.rs      - Tile matrix to world layout             │
//! │  ├── events.rs     - Event log                               │
//! │  └── state.rs      - One peer's arena                        │
//! │                                                              │
//! │  network/          - Replication                             │
//! │  ├── protocol.rs   - Message types                           │
//! │  ├── replicator.rs - Role dispatch for throws                │
//! │  ├── peer.rs       - Applies effects, queues messages        │
//! │  └── session.rs    - Loopback channels, host + remotes       │
//! │                                                              │
//! │  config.rs         - ArenaConfig (JSON)                      │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Replication Guarantee
//!
//! Every throw runs Execute exactly once, at the authority. Observers build
//! a copy from the broadcast; the executing peer never copies its own throw.
//! Grid snapping uses one fixed tie-break, so every peer places a bomb in
//! the same cell.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod config;
pub mod core;
pub mod game;
pub mod network;

// Re-export commonly used types
pub use config::{ArenaConfig, ConfigError};
pub use core::grid::{quantize, GridConfig};
pub use core::vec3::{Rotator, Vec3};
pub use game::character::{ActorId, Character, CharacterConfig};
pub use game::skill::{SkillKind, SkillSet};
pub use network::replicator::{ActionReplicator, Effect, Role, TriggerOutcome};
pub use network::session::LoopbackSession;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Simulation ticks per second
pub const TICK_RATE: u32 = 60;
