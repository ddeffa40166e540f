//! Core primitives.
//!
//! World-space value types, the shared arena grid, and hashing used to
//! compare peers.

pub mod vec3;
pub mod grid;
pub mod hash;

// Re-export core types
pub use vec3::{Vec3, Rotator};
pub use grid::{quantize, quantize_with, GridConfig, GridError, CELL_SIZE, SPAWN_VERTICAL_OFFSET};
pub use hash::{WorldHash, WorldHasher};
