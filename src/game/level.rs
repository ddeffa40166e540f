//! Scene Builder Layout
//!
//! Turns a tile matrix into world placements on the arena grid. Spawning the
//! actual actors is the engine's job; this module only decides what goes where.

use serde::{Serialize, Deserialize};

use crate::core::grid::GridConfig;
use crate::core::vec3::Vec3;

/// Tile codes used in level matrices.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum Tile {
    /// Walkable floor
    Ground = 0,
    /// Indestructible interior wall
    Wall = 1,
    /// Wall a blast can remove
    DestroyableWall = 2,
    /// Arena boundary
    ExternWall = 3,
}

impl Tile {
    /// Get tile from its matrix code.
    pub fn from_code(code: u8) -> Option<Tile> {
        match code {
            0 => Some(Tile::Ground),
            1 => Some(Tile::Wall),
            2 => Some(Tile::DestroyableWall),
            3 => Some(Tile::ExternWall),
            _ => None,
        }
    }

    /// Whether the tile blocks movement.
    #[inline]
    pub fn is_solid(self) -> bool {
        self != Tile::Ground
    }
}

/// Level matrix errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LevelError {
    /// Matrix has no rows or no columns.
    #[error("level is empty")]
    Empty,

    /// A row's width differs from the first row.
    #[error("row {row} has {found} tiles, expected {expected}")]
    RaggedRow {
        /// Offending row
        row: usize,
        /// Width of row 0
        expected: usize,
        /// Width found
        found: usize,
    },

    /// Unknown tile code.
    #[error("unknown tile code {0}")]
    UnknownTile(u8),
}

/// One object the engine should spawn.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Placement {
    /// What to spawn
    pub tile: Tile,
    /// Matrix row
    pub row: usize,
    /// Matrix column
    pub col: usize,
    /// World position
    pub position: Vec3,
}

/// Rectangular `H x W` tile matrix.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelGrid {
    height: usize,
    width: usize,
    tiles: Vec<Tile>,
}

impl LevelGrid {
    /// Build from rows of tile codes.
    pub fn from_codes(rows: &[Vec<u8>]) -> Result<Self, LevelError> {
        let width = rows.first().map(Vec::len).unwrap_or(0);
        if width == 0 {
            return Err(LevelError::Empty);
        }

        let mut tiles = Vec::with_capacity(rows.len() * width);
        for (row, codes) in rows.iter().enumerate() {
            if codes.len() != width {
                return Err(LevelError::RaggedRow { row, expected: width, found: codes.len() });
            }
            for &code in codes {
                tiles.push(Tile::from_code(code).ok_or(LevelError::UnknownTile(code))?);
            }
        }

        Ok(Self { height: rows.len(), width, tiles })
    }

    /// Open field of ground ringed by boundary walls.
    pub fn bordered(height: usize, width: usize) -> Result<Self, LevelError> {
        if height == 0 || width == 0 {
            return Err(LevelError::Empty);
        }
        let grid = Self { height, width, tiles: vec![Tile::Ground; height * width] };
        Ok(grid.with_border())
    }

    /// Same grid with every edge cell forced to `ExternWall`.
    pub fn with_border(mut self) -> Self {
        for row in 0..self.height {
            for col in 0..self.width {
                if row == 0 || col == 0 || row + 1 == self.height || col + 1 == self.width {
                    self.tiles[row * self.width + col] = Tile::ExternWall;
                }
            }
        }
        self
    }

    /// Rows (H).
    pub fn height(&self) -> usize {
        self.height
    }

    /// Columns (W).
    pub fn width(&self) -> usize {
        self.width
    }

    /// Tile at (`row`, `col`).
    pub fn tile(&self, row: usize, col: usize) -> Option<Tile> {
        if row >= self.height || col >= self.width {
            return None;
        }
        Some(self.tiles[row * self.width + col])
    }

    /// Placements in row-major order.
    ///
    /// Every cell gets a ground tile at floor height; solid tiles also get
    /// their wall one cell above the floor.
    pub fn layout(&self, grid: &GridConfig) -> Vec<Placement> {
        let mut placements = Vec::with_capacity(self.tiles.len() * 2);
        for row in 0..self.height {
            for col in 0..self.width {
                let tile = self.tiles[row * self.width + col];
                placements.push(Placement {
                    tile: Tile::Ground,
                    row,
                    col,
                    position: grid.cell_to_world(row, col, 0.0),
                });
                if tile.is_solid() {
                    placements.push(Placement {
                        tile,
                        row,
                        col,
                        position: grid.cell_to_world(row, col, grid.cell_size),
                    });
                }
            }
        }
        placements
    }

    /// Whether a world position falls on a walkable cell.
    pub fn is_walkable(&self, grid: &GridConfig, position: Vec3) -> bool {
        let (row, col) = grid.world_to_cell(position);
        if row < 0 || col < 0 {
            return false;
        }
        self.tile(row as usize, col as usize)
            .is_some_and(|tile| !tile.is_solid())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_codes() {
        let grid = LevelGrid::from_codes(&[vec![3, 3, 3], vec![3, 0, 2], vec![3, 1, 3]]).unwrap();
        assert_eq!(grid.height(), 3);
        assert_eq!(grid.width(), 3);
        assert_eq!(grid.tile(1, 2), Some(Tile::DestroyableWall));
        assert_eq!(grid.tile(2, 1), Some(Tile::Wall));
        assert_eq!(grid.tile(3, 0), None);
    }

    #[test]
    fn test_rejects_bad_matrices() {
        assert_eq!(LevelGrid::from_codes(&[]).unwrap_err(), LevelError::Empty);
        assert_eq!(
            LevelGrid::from_codes(&[vec![0, 0], vec![0]]).unwrap_err(),
            LevelError::RaggedRow { row: 1, expected: 2, found: 1 }
        );
        assert_eq!(LevelGrid::from_codes(&[vec![9]]).unwrap_err(), LevelError::UnknownTile(9));
    }

    #[test]
    fn test_bordered() {
        let grid = LevelGrid::bordered(4, 5).unwrap();
        assert_eq!(grid.tile(0, 2), Some(Tile::ExternWall));
        assert_eq!(grid.tile(3, 4), Some(Tile::ExternWall));
        assert_eq!(grid.tile(1, 1), Some(Tile::Ground));
        assert_eq!(grid.tile(2, 3), Some(Tile::Ground));
    }

    #[test]
    fn test_layout_positions() {
        let grid = LevelGrid::from_codes(&[vec![0, 2], vec![1, 0]]).unwrap();
        let placements = grid.layout(&GridConfig::default());

        // 4 ground + 2 walls
        assert_eq!(placements.len(), 6);
        assert_eq!(placements.iter().filter(|p| p.tile == Tile::Ground).count(), 4);

        let destroyable = placements.iter().find(|p| p.tile == Tile::DestroyableWall).unwrap();
        assert_eq!(destroyable.position, Vec3::new(100.0, 0.0, 100.0));

        let wall = placements.iter().find(|p| p.tile == Tile::Wall).unwrap();
        assert_eq!((wall.row, wall.col), (1, 0));
        assert_eq!(wall.position, Vec3::new(0.0, 100.0, 100.0));
    }

    #[test]
    fn test_walls_align_with_bomb_grid() {
        let cfg = GridConfig::default();
        let grid = LevelGrid::bordered(5, 5).unwrap();
        for p in grid.layout(&cfg) {
            assert_eq!(cfg.snap(p.position), p.position);
        }
    }

    #[test]
    fn test_is_walkable() {
        let cfg = GridConfig::default();
        let grid = LevelGrid::bordered(5, 5).unwrap();
        assert!(grid.is_walkable(&cfg, Vec3::new(210.0, 190.0, 0.0)));
        assert!(!grid.is_walkable(&cfg, Vec3::new(20.0, 200.0, 0.0)));
        assert!(!grid.is_walkable(&cfg, Vec3::new(-300.0, 200.0, 0.0)));
    }
}
