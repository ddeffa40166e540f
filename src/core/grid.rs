//! Arena Grid Quantization
//!
//! Bombs and walls sit on a shared grid of square cells. Every peer must snap
//! a continuous coordinate to the same cell, so the tie-break is fixed here
//! instead of relying on a platform rounding mode.
//!
//! ## Rule
//!
//! ```text
//! a > 0  :  trunc(a / CELL + 0.5) * CELL
//! a < 0  :  trunc(a / CELL - 0.5) * CELL
//! a == 0 :  0
//! ```
//!
//! Halves round away from zero: `50 -> 100`, `-50 -> -100`, `149 -> 100`.

use serde::{Serialize, Deserialize};

use super::vec3::Vec3;

/// Default cell edge length in world units.
pub const CELL_SIZE: f32 = 100.0;

/// Default height subtracted from a character's position to reach the floor.
pub const SPAWN_VERTICAL_OFFSET: f32 = 60.0;

/// Snap one horizontal coordinate to the nearest cell on a `CELL_SIZE` grid.
#[inline]
pub fn quantize(a: f32) -> i32 {
    quantize_with(a, CELL_SIZE)
}

/// Snap one horizontal coordinate to the nearest cell on a grid of `cell` units.
///
/// `cell` must be a positive whole number (see [`GridConfig::validate`]).
/// NaN snaps to the origin cell.
#[inline]
pub fn quantize_with(a: f32, cell: f32) -> i32 {
    cell_index(a, cell).saturating_mul(cell as i32)
}

/// Index of the cell containing `a`, with the same tie-break as [`quantize_with`].
///
/// The division happens in `f32`, the half-cell offset in `f64`, so values
/// just below a half cell never round up into the next cell.
#[inline]
pub fn cell_index(a: f32, cell: f32) -> i32 {
    let scaled = f64::from(a / cell);
    let snapped = if a > 0.0 {
        scaled + 0.5
    } else if a < 0.0 {
        scaled - 0.5
    } else {
        return 0;
    };
    // `as` truncates toward zero and saturates; NaN never reaches here.
    snapped.trunc() as i32
}

/// Grid setup errors.
#[derive(Debug, Clone, Copy, PartialEq, thiserror::Error)]
pub enum GridError {
    /// Cell size is not a positive whole number of world units.
    #[error("cell size {0} must be a positive whole number")]
    InvalidCellSize(f32),
}

/// Grid settings shared by the throw path and the scene builder.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridConfig {
    /// Cell edge length in world units.
    pub cell_size: f32,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self { cell_size: CELL_SIZE }
    }
}

impl GridConfig {
    /// Create a grid, rejecting unusable cell sizes.
    pub fn new(cell_size: f32) -> Result<Self, GridError> {
        let grid = Self { cell_size };
        grid.validate()?;
        Ok(grid)
    }

    /// Check that the cell size is finite, positive, whole and fits an `i32`.
    pub fn validate(&self) -> Result<(), GridError> {
        let cell = self.cell_size;
        if !cell.is_finite() || cell < 1.0 || cell.fract() != 0.0 || cell > i32::MAX as f32 {
            return Err(GridError::InvalidCellSize(cell));
        }
        Ok(())
    }

    /// Snap X and Y of `position` to cell centers. Z is left untouched.
    pub fn snap(&self, position: Vec3) -> Vec3 {
        Vec3 {
            x: quantize_with(position.x, self.cell_size) as f32,
            y: quantize_with(position.y, self.cell_size) as f32,
            z: position.z,
        }
    }

    /// Spawn point for an object dropped by an actor standing at `position`.
    pub fn spawn_point(&self, position: Vec3, vertical_offset: f32) -> Vec3 {
        self.snap(position.lowered(vertical_offset))
    }

    /// World position of the cell at (`row`, `col`), at height `z`.
    pub fn cell_to_world(&self, row: usize, col: usize, z: f32) -> Vec3 {
        Vec3::new(col as f32 * self.cell_size, row as f32 * self.cell_size, z)
    }

    /// Cell coordinates `(row, col)` containing a world position.
    ///
    /// Same order as [`cell_to_world`](Self::cell_to_world) takes.
    pub fn world_to_cell(&self, position: Vec3) -> (i32, i32) {
        (
            cell_index(position.y, self.cell_size),
            cell_index(position.x, self.cell_size),
        )
    }
}
