//! Server-wide level lookup
//!
//! Levels are loaded on first access and shared behind their own lock, so
//! mutations of one level never wait on another. Each name gets its own load
//! slot: concurrent lookups of one name share a single load, and the disk read
//! runs off the async workers without holding the registry map.

use super::Level;
use crate::error::LevelResult;
use log::{debug, info};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::{OnceCell, RwLock};

pub type SharedLevel = Arc<RwLock<Level>>;

type LevelSlot = Arc<OnceCell<SharedLevel>>;

#[derive(Debug)]
pub struct LevelRegistry {
    levels_dir: PathBuf,
    change_lifetime: Option<u64>,
    levels: RwLock<HashMap<String, LevelSlot>>,
}

impl LevelRegistry {
    pub fn new(levels_dir: &Path) -> Self {
        Self {
            levels_dir: levels_dir.to_path_buf(),
            change_lifetime: None,
            levels: RwLock::new(HashMap::new()),
        }
    }

    /// Board change lifetime applied to every level this registry loads or adopts.
    pub fn with_board_change_lifetime(mut self, secs: u64) -> Self {
        self.change_lifetime = Some(secs);
        self
    }

    /// Returns the loaded level or loads it from the levels directory.
    pub async fn find_level(&self, name: &str) -> LevelResult<SharedLevel> {
        let key = name.to_ascii_lowercase();
        let slot = self.slot(&key).await;

        let result = slot.get_or_try_init(|| self.load(name)).await.map(Arc::clone);
        if result.is_err() {
            drop(slot);
            self.forget_failed(&key).await;
        }
        result
    }

    async fn slot(&self, key: &str) -> LevelSlot {
        if let Some(slot) = self.levels.read().await.get(key) {
            return Arc::clone(slot);
        }
        Arc::clone(self.levels.write().await.entry(key.to_string()).or_default())
    }

    async fn load(&self, name: &str) -> LevelResult<SharedLevel> {
        let path = self.levels_dir.join(name);
        let mut level = tokio::task::spawn_blocking(move || Level::load(&path)).await??;
        if let Some(secs) = self.change_lifetime {
            level.set_board_change_lifetime(secs);
        }
        debug!("Loaded {} into the level registry", level.actual_name());
        Ok(Arc::new(RwLock::new(level)))
    }

    /// Drops an empty slot unless another lookup is still retrying it.
    async fn forget_failed(&self, key: &str) {
        let mut levels = self.levels.write().await;
        let unused = levels
            .get(key)
            .map_or(false, |slot| !slot.initialized() && Arc::strong_count(slot) == 1);
        if unused {
            levels.remove(key);
        }
    }

    /// Registers an already built level, replacing one with the same name.
    pub async fn insert(&self, mut level: Level) -> SharedLevel {
        if let Some(secs) = self.change_lifetime {
            level.set_board_change_lifetime(secs);
        }
        let key = level.actual_name().to_ascii_lowercase();
        let shared = Arc::new(RwLock::new(level));
        let slot = Arc::new(OnceCell::new_with(Some(Arc::clone(&shared))));
        self.levels.write().await.insert(key, slot);
        shared
    }

    pub async fn remove(&self, name: &str) -> Option<SharedLevel> {
        let removed = self
            .levels
            .write()
            .await
            .remove(&name.to_ascii_lowercase())
            .and_then(|slot| slot.get().cloned());
        if removed.is_some() {
            info!("Unloaded level {}", name);
        }
        removed
    }

    /// Snapshot of every loaded level
    pub async fn loaded(&self) -> Vec<SharedLevel> {
        self.levels
            .read()
            .await
            .values()
            .filter_map(|slot| slot.get().cloned())
            .collect()
    }

    pub async fn len(&self) -> usize {
        self.loaded().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Runs the per-second level hook on every loaded level.
    pub async fn do_timed_events(&self, now: u64) {
        for level in self.loaded().await {
            level.write().await.do_timed_events(now);
        }
    }
}
