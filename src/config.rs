//! Arena Configuration
//!
//! Everything tunable about an arena in one serde struct. Every section has
//! defaults, so a config file only lists what it overrides.
//!
//! ```json
//! {
//!   "character": { "blast_radius": { "min": 2, "max": 8 } },
//!   "throw": { "trust_client": false },
//!   "level": [[3, 3, 3], [3, 0, 3], [3, 3, 3]]
//! }
//! ```

use std::path::Path;
use serde::{Serialize, Deserialize};

use crate::core::grid::{GridConfig, GridError};
use crate::game::bomb::BombTemplate;
use crate::game::character::CharacterConfig;
use crate::game::level::{LevelError, LevelGrid};
use crate::network::replicator::{ActionReplicator, ThrowConfig};
use crate::network::session::SessionConfig;

/// Config loading errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File could not be read.
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    /// File is not a valid config.
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    /// File parsed but holds unusable values.
    #[error("invalid config: {0}")]
    Invalid(#[from] GridError),
}

/// Full arena configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArenaConfig {
    /// Starting skills and movement.
    pub character: CharacterConfig,
    /// Throw tuning.
    pub throw: ThrowConfig,
    /// Arena grid.
    pub grid: GridConfig,
    /// Bomb class; `null` leaves throws unconfigured.
    pub template: Option<BombTemplate>,
    /// Tile matrix for the scene builder.
    pub level: Option<Vec<Vec<u8>>>,
    /// Loopback channel sizing.
    pub session: SessionConfig,
}

impl Default for ArenaConfig {
    fn default() -> Self {
        Self {
            character: CharacterConfig::default(),
            throw: ThrowConfig::default(),
            grid: GridConfig::default(),
            template: Some(BombTemplate::default()),
            level: None,
            session: SessionConfig::default(),
        }
    }
}

impl ArenaConfig {
    /// Parse from a JSON string.
    pub fn from_json_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values that would break snapping at run time.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.grid.validate()?;
        Ok(())
    }

    /// Load from a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    /// Serialize to pretty JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Replicator built from the throw, grid and template sections.
    pub fn replicator(&self) -> ActionReplicator {
        ActionReplicator::new(self.template.clone(), self.grid, self.throw)
    }

    /// Configured level, or a bordered `rows x cols` field if none is set.
    pub fn level_grid(&self, rows: usize, cols: usize) -> Result<LevelGrid, LevelError> {
        match &self.level {
            Some(codes) => LevelGrid::from_codes(codes),
            None => LevelGrid::bordered(rows, cols),
        }
    }
}
