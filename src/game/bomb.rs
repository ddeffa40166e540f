//! Bombs and the Bomb Spawner
//!
//! The hosting engine owns real world objects. The replication code only
//! needs three calls on it (spawn, set owner, set power), expressed here as
//! the [`ActionSpawner`] trait. [`BombField`] is the in-memory spawner each
//! peer uses for its own view of the arena.

use std::collections::BTreeMap;
use serde::{Serialize, Deserialize};

use crate::core::vec3::{Vec3, Rotator};
use crate::core::hash::{WorldHash, WorldHasher};
use crate::game::character::ActorId;

/// Spawnable bomb class.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BombTemplate {
    /// Asset or class name known to the engine.
    pub name: String,
    /// Fuse length in ticks before detonation.
    pub fuse_ticks: u32,
}

impl Default for BombTemplate {
    fn default() -> Self {
        Self {
            name: "bomb".to_string(),
            fuse_ticks: 180, // 3 seconds @ 60Hz
        }
    }
}

/// Handle to a spawned bomb, unique within one peer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BombId(pub u32);

/// How a bomb came to exist on this peer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BombOrigin {
    /// Spawned by the authority's Execute.
    Executed,
    /// Local copy of a bomb the authority executed.
    Mirrored,
}

/// A bomb in the world.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Bomb {
    /// Handle
    pub id: BombId,
    /// Class it was spawned from
    pub template: String,
    /// Grid-aligned position
    pub position: Vec3,
    /// Facing at spawn
    pub orientation: Rotator,
    /// Owning character, once set
    pub owner: Option<ActorId>,
    /// Flame length, once set
    pub power: i32,
    /// Execute or mirror
    pub origin: BombOrigin,
    /// Fuse remaining
    pub fuse_ticks: u32,
}

/// Engine-side spawner for action objects.
pub trait ActionSpawner {
    /// Spawn an object of `template` and return its handle.
    fn spawn(
        &mut self,
        template: &BombTemplate,
        position: Vec3,
        orientation: Rotator,
        origin: BombOrigin,
    ) -> BombId;

    /// Set the owning actor of a spawned object.
    fn set_owner(&mut self, handle: BombId, owner: ActorId);

    /// Set the power (flame length) of a spawned object.
    fn set_power(&mut self, handle: BombId, power: i32);
}

/// All bombs one peer knows about.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct BombField {
    bombs: BTreeMap<BombId, Bomb>,
    next_id: u32,
}

impl BombField {
    /// Create an empty field.
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a bomb.
    pub fn get(&self, id: BombId) -> Option<&Bomb> {
        self.bombs.get(&id)
    }

    /// Bombs in spawn order.
    pub fn iter(&self) -> impl Iterator<Item = &Bomb> {
        self.bombs.values()
    }

    /// Number of live bombs.
    pub fn len(&self) -> usize {
        self.bombs.len()
    }

    /// Whether the field is empty.
    pub fn is_empty(&self) -> bool {
        self.bombs.is_empty()
    }

    /// Count bombs by origin.
    pub fn count(&self, origin: BombOrigin) -> usize {
        self.bombs.values().filter(|b| b.origin == origin).count()
    }

    /// Advance fuses by one tick and remove bombs that ran out.
    ///
    /// Returns the removed bombs in id order.
    pub fn tick_fuses(&mut self) -> Vec<Bomb> {
        let mut expired = Vec::new();
        self.bombs.retain(|_, bomb| {
            bomb.fuse_ticks = bomb.fuse_ticks.saturating_sub(1);
            if bomb.fuse_ticks == 0 {
                expired.push(bomb.clone());
                false
            } else {
                true
            }
        });
        expired
    }

    /// Digest of the replicated bomb state.
    ///
    /// Covers position, orientation, power and owner. Local handles and the
    /// executed/mirrored flag are peer-specific and left out.
    pub fn digest(&self) -> WorldHash {
        let mut hasher = WorldHasher::for_bomb_field();
        hasher.update_u32(self.bombs.len() as u32);
        for bomb in self.bombs.values() {
            hasher.update_vec3(bomb.position);
            hasher.update_rotator(bomb.orientation);
            hasher.update_i32(bomb.power);
            match bomb.owner {
                Some(owner) => hasher.update_id(owner.as_bytes()),
                None => hasher.update_id(&[0; 16]),
            }
        }
        hasher.finalize()
    }
}

impl ActionSpawner for BombField {
    fn spawn(
        &mut self,
        template: &BombTemplate,
        position: Vec3,
        orientation: Rotator,
        origin: BombOrigin,
    ) -> BombId {
        let id = BombId(self.next_id);
        self.next_id += 1;
        self.bombs.insert(id, Bomb {
            id,
            template: template.name.clone(),
            position,
            orientation,
            owner: None,
            power: 0,
            origin,
            fuse_ticks: template.fuse_ticks,
        });
        id
    }

    fn set_owner(&mut self, handle: BombId, owner: ActorId) {
        if let Some(bomb) = self.bombs.get_mut(&handle) {
            bomb.owner = Some(owner);
        }
    }

    fn set_power(&mut self, handle: BombId, power: i32) {
        if let Some(bomb) = self.bombs.get_mut(&handle) {
            bomb.power = power;
        }
    }
}
