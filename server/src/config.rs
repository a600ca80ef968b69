//! Server configuration loaded once at startup

use crate::error::ConfigError;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Directory layout and timing settings.
///
/// Every field has a default so a partial TOML file is valid.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Root directory of the server data
    pub server_path: PathBuf,
    /// Level files, relative to `server_path`
    pub levels_dir: String,
    /// Weapon definitions, relative to `server_path`
    pub weapons_dir: String,
    /// Compiled weapon bytecode, relative to `server_path`
    pub bytecode_dir: String,
    /// Seconds between timed level events
    pub tick_interval_secs: u64,
    /// Seconds a dropped item stays on a level
    pub item_lifetime_secs: u64,
    /// Seconds before a board patch respawns the tiles it replaced
    pub board_change_lifetime_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            server_path: PathBuf::from("servers/default"),
            levels_dir: "world".to_string(),
            weapons_dir: "weapons".to_string(),
            bytecode_dir: "weapon_bytecode".to_string(),
            tick_interval_secs: 1,
            item_lifetime_secs: 30,
            board_change_lifetime_secs: crate::level::BOARD_CHANGE_LIFETIME_SECS,
        }
    }
}

impl ServerConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn from_toml(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    pub fn levels_path(&self) -> PathBuf {
        self.server_path.join(&self.levels_dir)
    }

    pub fn weapons_path(&self) -> PathBuf {
        self.server_path.join(&self.weapons_dir)
    }

    pub fn bytecode_path(&self) -> PathBuf {
        self.server_path.join(&self.bytecode_dir)
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_secs(self.tick_interval_secs.max(1))
    }

    /// Unix time at which an item dropped at `now` disappears
    pub fn item_expires_at(&self, now: u64) -> u64 {
        now + self.item_lifetime_secs
    }

    /// Paths handed to weapon load/save
    pub fn weapon_paths(&self) -> crate::weapon::WeaponPaths {
        crate::weapon::WeaponPaths {
            definitions: self.weapons_path(),
            bytecode: self.bytecode_path(),
        }
    }
}
