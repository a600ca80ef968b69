//! # Level State
//!
//! A level is one 64x64 area of the world. It owns its tile board, its
//! baddies, chests, horses, items, links and signs, and a log of board
//! patches used to resynchronise clients. Players and NPCs are owned by
//! server-wide registries; the level only keeps their ids.
//!
//! All mutators validate their input and report rejection through `bool` or
//! `Option` without touching state. Serialisation of a level to the wire
//! lives in [`packets`], loading from disk in [`loader`].

pub mod board;
pub mod entities;
pub mod item;
pub mod loader;
pub mod packets;
pub mod players;
pub mod registry;
pub mod tiletypes;

pub use board::{Board, BoardChange};
pub use entities::{Baddy, BaddyMode, Chest, Horse, Link, Sign, MAX_BADDIES};
pub use item::{LevelItem, LevelItemType};
pub use loader::LevelFormat;
pub use players::{PlayerId, PlayerSlots};
pub use registry::LevelRegistry;
pub use tiletypes::{wall_flags, TileType, TileTypes};

use crate::npc::{npc_events, NpcId, NpcLookup};
use crate::utils::unix_time;
use log::{debug, info};
use std::collections::HashMap;
use std::path::PathBuf;

/// Seconds a board change stands before the overwritten tiles return
pub const BOARD_CHANGE_LIFETIME_SECS: u64 = 15;

/// NPC as declared by the level file, before the NPC registry spawns it
#[derive(Debug, Clone, PartialEq)]
pub struct NpcDef {
    pub x: f32,
    pub y: f32,
    pub image: String,
    pub script: String,
}

/// Placement inside a grid of levels
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MapPlacement {
    pub map: String,
    pub x: i32,
    pub y: i32,
}

#[derive(Debug, Clone, Default)]
pub struct Level {
    /// Display name, may be changed for cosmetic renames
    name: String,
    /// File name the level was loaded from
    actual_name: String,
    source_path: Option<PathBuf>,
    mod_time: u64,
    pub(crate) board: Board,
    spar: bool,
    singleplayer: bool,
    map: Option<MapPlacement>,

    /// Alive baddies by id, plus their creation order for broadcasts
    baddies: HashMap<u8, Baddy>,
    baddy_order: Vec<u8>,

    pub(crate) chests: Vec<Chest>,
    pub(crate) horses: Vec<Horse>,
    pub(crate) items: Vec<LevelItem>,
    pub(crate) links: Vec<Link>,
    pub(crate) signs: Vec<Sign>,
    pub(crate) npc_defs: Vec<NpcDef>,

    npcs: Vec<NpcId>,
    players: PlayerSlots,
    changes: Vec<BoardChange>,
    change_lifetime: Option<u64>,
}

impl Level {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            actual_name: name.to_string(),
            mod_time: unix_time(),
            ..Self::default()
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn actual_name(&self) -> &str {
        &self.actual_name
    }

    pub fn set_level_name(&mut self, name: &str) {
        self.name = name.to_string();
    }

    pub fn mod_time(&self) -> u64 {
        self.mod_time
    }

    pub fn source_path(&self) -> Option<&std::path::Path> {
        self.source_path.as_deref()
    }

    pub(crate) fn set_source(&mut self, path: PathBuf, mod_time: u64) {
        self.source_path = Some(path);
        self.mod_time = mod_time;
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn is_sparring_zone(&self) -> bool {
        self.spar
    }

    pub fn set_sparring_zone(&mut self, spar: bool) {
        self.spar = spar;
    }

    pub fn is_singleplayer(&self) -> bool {
        self.singleplayer
    }

    pub fn set_singleplayer(&mut self, singleplayer: bool) {
        self.singleplayer = singleplayer;
    }

    pub fn map(&self) -> Option<&MapPlacement> {
        self.map.as_ref()
    }

    pub fn set_map(&mut self, map: Option<&str>, x: i32, y: i32) {
        self.map = map.map(|map| MapPlacement {
            map: map.to_string(),
            x,
            y,
        });
    }

    pub fn chests(&self) -> &[Chest] {
        &self.chests
    }

    pub fn horses(&self) -> &[Horse] {
        &self.horses
    }

    pub fn items(&self) -> &[LevelItem] {
        &self.items
    }

    pub fn links(&self) -> &[Link] {
        &self.links
    }

    pub fn signs(&self) -> &[Sign] {
        &self.signs
    }

    pub fn npc_defs(&self) -> &[NpcDef] {
        &self.npc_defs
    }

    pub fn changes(&self) -> &[BoardChange] {
        &self.changes
    }

    pub fn board_change_lifetime(&self) -> u64 {
        self.change_lifetime.unwrap_or(BOARD_CHANGE_LIFETIME_SECS)
    }

    pub fn set_board_change_lifetime(&mut self, secs: u64) {
        self.change_lifetime = Some(secs);
    }

    /// Applies a row-major tile patch and records it.
    ///
    /// Clients only ever edit layer 0, so that is the layer patched here;
    /// upper layers come from the level file alone.
    pub fn alter_board(
        &mut self,
        patch: &[u16],
        x: i32,
        y: i32,
        width: i32,
        height: i32,
        actor: Option<PlayerId>,
    ) -> bool {
        let Some(previous) = self.board.write_region(0, x, y, width, height, patch) else {
            return false;
        };

        self.changes.push(BoardChange {
            x: x as u8,
            y: y as u8,
            width: width as u8,
            height: height as u8,
            tiles: patch.to_vec(),
            previous,
            mod_time: unix_time(),
            actor,
        });
        true
    }

    /// Same as [`Level::alter_board`] for GShort packed tiles as clients send them.
    pub fn alter_board_packed(
        &mut self,
        data: &[u8],
        x: i32,
        y: i32,
        width: i32,
        height: i32,
        actor: Option<PlayerId>,
    ) -> bool {
        match board::unpack_tiles(data) {
            Some(tiles) => self.alter_board(&tiles, x, y, width, height, actor),
            None => false,
        }
    }

    pub fn add_item(&mut self, x: f32, y: f32, kind: LevelItemType) -> bool {
        self.place_item(LevelItem::new(x, y, kind))
    }

    /// Adds an item that disappears once `expires_at` has passed.
    pub fn drop_item(&mut self, x: f32, y: f32, kind: LevelItemType, expires_at: u64) -> bool {
        let mut item = LevelItem::new(x, y, kind);
        item.expires_at = Some(expires_at);
        self.place_item(item)
    }

    fn place_item(&mut self, item: LevelItem) -> bool {
        if self.items.iter().any(|existing| existing.is_at(item.x, item.y)) {
            return false;
        }
        self.items.push(item);
        true
    }

    pub fn remove_item(&mut self, x: f32, y: f32) -> Option<LevelItemType> {
        let index = self.items.iter().position(|item| item.is_at(x, y))?;
        Some(self.items.remove(index).kind)
    }

    /// Rejects a second horse on the same spot.
    pub fn add_horse(&mut self, image: &str, x: f32, y: f32, dir: u8, bushes: u8) -> bool {
        if self.horses.iter().any(|h| h.x == x && h.y == y) {
            return false;
        }
        self.horses.push(Horse {
            x,
            y,
            image: image.to_string(),
            dir,
            bushes,
        });
        true
    }

    pub fn remove_horse(&mut self, x: f32, y: f32) -> Option<Horse> {
        let index = self.horses.iter().position(|h| h.x == x && h.y == y)?;
        Some(self.horses.remove(index))
    }

    /// Creates a baddy with the lowest free id. Returns `None` once the level is full.
    pub fn add_baddy(&mut self, x: f32, y: f32, kind: u8) -> Option<&mut Baddy> {
        let id = (1..=MAX_BADDIES as u8).find(|id| !self.baddies.contains_key(id))?;
        let mut baddy = Baddy::new(x, y, kind);
        baddy.id = id;
        self.baddy_order.push(id);
        Some(self.baddies.entry(id).or_insert(baddy))
    }

    pub fn remove_baddy(&mut self, id: u8) -> Option<Baddy> {
        let baddy = self.baddies.remove(&id)?;
        self.baddy_order.retain(|&alive| alive != id);
        Some(baddy)
    }

    pub fn get_baddy(&self, id: u8) -> Option<&Baddy> {
        self.baddies.get(&id)
    }

    pub fn get_baddy_mut(&mut self, id: u8) -> Option<&mut Baddy> {
        self.baddies.get_mut(&id)
    }

    /// Alive baddies in creation order
    pub fn baddies(&self) -> impl Iterator<Item = &Baddy> + '_ {
        self.baddy_order.iter().filter_map(|id| self.baddies.get(id))
    }

    pub fn baddy_count(&self) -> usize {
        self.baddies.len()
    }

    pub fn add_player(&mut self, player: PlayerId) -> u16 {
        let slot = self.players.add(player);
        info!("Player {} entered {}", player.0, self.actual_name);
        slot
    }

    pub fn remove_player(&mut self, player: PlayerId) -> bool {
        let removed = self.players.remove(player);
        if removed {
            info!("Player {} left {}", player.0, self.actual_name);
        }
        removed
    }

    /// Slot 0 is the level leader.
    pub fn get_player(&self, slot: u16) -> Option<PlayerId> {
        self.players.get(slot)
    }

    pub fn players(&self) -> &PlayerSlots {
        &self.players
    }

    pub fn has_players(&self) -> bool {
        !self.players.is_empty()
    }

    /// Returns false if the NPC is already registered.
    pub fn add_npc(&mut self, npc: NpcId) -> bool {
        if self.npcs.contains(&npc) {
            return false;
        }
        self.npcs.push(npc);
        true
    }

    pub fn remove_npc(&mut self, npc: NpcId) -> bool {
        let before = self.npcs.len();
        self.npcs.retain(|&id| id != npc);
        before != self.npcs.len()
    }

    pub fn npcs(&self) -> &[NpcId] {
        &self.npcs
    }

    /// Per-second hook. Clears expired dropped items and respawns board
    /// changes that outlived [`Level::board_change_lifetime`].
    pub fn do_timed_events(&mut self, now: u64) -> bool {
        let before = self.items.len();
        self.items
            .retain(|item| item.expires_at.map_or(true, |expires| expires > now));
        let expired = before - self.items.len();
        if expired > 0 {
            debug!("{} items expired on {}", expired, self.actual_name);
        }

        let restored = self.respawn_board_changes(now);
        if restored > 0 {
            debug!("{} board changes respawned on {}", restored, self.actual_name);
        }
        true
    }

    /// Drops expired changes from the log and puts their overwritten tiles
    /// back wherever the board still shows the patch. Each restore is logged
    /// as a change of its own so returning clients catch up on it; restores
    /// simply leave the log once they expire.
    fn respawn_board_changes(&mut self, now: u64) -> usize {
        let lifetime = self.board_change_lifetime();
        let (expired, live): (Vec<BoardChange>, Vec<BoardChange>) =
            std::mem::take(&mut self.changes)
                .into_iter()
                .partition(|change| change.mod_time.saturating_add(lifetime) <= now);
        self.changes = live;

        let mut restored = 0;
        for change in expired.iter().rev().filter(|change| !change.previous.is_empty()) {
            let (x, y) = (i32::from(change.x), i32::from(change.y));
            let (width, height) = (i32::from(change.width), i32::from(change.height));
            let Some(current) = self.board.read_region(0, x, y, width, height) else {
                continue;
            };

            let tiles: Vec<u16> = current
                .iter()
                .zip(&change.tiles)
                .zip(&change.previous)
                .map(|((&shown, &written), &old)| if shown == written { old } else { shown })
                .collect();
            if tiles == current {
                continue;
            }
            if self.board.write_region(0, x, y, width, height, &tiles).is_none() {
                continue;
            }

            self.changes.push(BoardChange {
                x: change.x,
                y: change.y,
                width: change.width,
                height: change.height,
                tiles,
                previous: Vec::new(),
                mod_time: now,
                actor: None,
            });
            restored += 1;
        }
        restored
    }

    fn tile_type(&self, tiles: &TileTypes, x: i32, y: i32) -> Option<TileType> {
        self.board.tile(0, x, y).map(|tile| tiles.get(tile))
    }

    /// Tiles outside the board count as walls.
    pub fn is_on_wall(&self, tiles: &TileTypes, x: i32, y: i32) -> bool {
        self.tile_type(tiles, x, y).map_or(true, TileType::is_wall)
    }

    /// Rectangle test with [`wall_flags`] selecting which sub-types block.
    /// A rectangle reaching past the board edge is on a wall.
    pub fn is_on_wall2(
        &self,
        tiles: &TileTypes,
        x: i32,
        y: i32,
        width: i32,
        height: i32,
        flags: u8,
    ) -> bool {
        let (width, height) = (width.max(1), height.max(1));
        if !board::region_in_bounds(x, y, width, height) {
            return true;
        }
        for cy in y..y + height {
            for cx in x..x + width {
                let Some(kind) = self.tile_type(tiles, cx, cy) else {
                    return true;
                };
                let blocks = match kind {
                    TileType::ThrowThrough => flags & wall_flags::PASS_THROW_THROUGH == 0,
                    TileType::Water | TileType::Lava => flags & wall_flags::BLOCK_WATER != 0,
                    TileType::Chair | TileType::BedUpper | TileType::BedLower => {
                        flags & wall_flags::BLOCK_FURNITURE != 0
                    }
                    other => other.is_wall(),
                };
                if blocks {
                    return true;
                }
            }
        }
        false
    }

    pub fn is_on_water(&self, tiles: &TileTypes, x: i32, y: i32) -> bool {
        self.tile_type(tiles, x, y) == Some(TileType::Water)
    }

    pub fn get_chest(&self, x: i32, y: i32) -> Option<&Chest> {
        self.chests
            .iter()
            .find(|chest| i32::from(chest.x) == x && i32::from(chest.y) == y)
    }

    pub fn get_link(&self, x: i32, y: i32) -> Option<&Link> {
        self.links.iter().find(|link| link.contains(x, y))
    }

    /// NPCs overlapping the rectangle
    pub fn find_area_npcs(
        &self,
        npcs: &impl NpcLookup,
        x: f32,
        y: f32,
        width: f32,
        height: f32,
    ) -> Vec<NpcId> {
        self.npcs
            .iter()
            .copied()
            .filter(|&id| {
                npcs.npc(id)
                    .map_or(false, |npc| npc.intersects(x, y, width, height))
            })
            .collect()
    }

    /// NPCs under the point that react to being touched
    pub fn test_touch(&self, npcs: &impl NpcLookup, x: f32, y: f32) -> Vec<NpcId> {
        self.npcs
            .iter()
            .copied()
            .filter(|&id| {
                npcs.npc(id).map_or(false, |npc| {
                    npc.has_event(npc_events::PLAYER_TOUCHES) && npc.contains(x, y)
                })
            })
            .collect()
    }

    /// Topmost visible NPC under the point. Later registrations are on top.
    pub fn is_on_npc(
        &self,
        npcs: &impl NpcLookup,
        x: f32,
        y: f32,
        check_event_flag: bool,
    ) -> Option<NpcId> {
        self.npcs.iter().rev().copied().find(|&id| {
            npcs.npc(id).map_or(false, |npc| {
                npc.visible
                    && npc.contains(x, y)
                    && (!check_event_flag || npc.has_event(npc_events::PLAYER_TOUCHES))
            })
        })
    }

    /// Independent copy for a private instance: same board and entities,
    /// empty change log, no players or NPC registrations.
    pub fn clone_instance(&self) -> Level {
        Level {
            npcs: Vec::new(),
            players: PlayerSlots::new(),
            changes: Vec::new(),
            ..self.clone()
        }
    }

    /// Swaps in freshly loaded tile and entity state, keeping the display
    /// name, map placement and every player and NPC registration.
    pub(crate) fn replace_content(&mut self, fresh: Level) {
        self.actual_name = fresh.actual_name;
        self.source_path = fresh.source_path;
        self.mod_time = fresh.mod_time;
        self.board = fresh.board;
        self.baddies = fresh.baddies;
        self.baddy_order = fresh.baddy_order;
        self.chests = fresh.chests;
        self.horses = fresh.horses;
        self.items = fresh.items;
        self.links = fresh.links;
        self.signs = fresh.signs;
        self.npc_defs = fresh.npc_defs;
        self.changes = fresh.changes;
    }
}
