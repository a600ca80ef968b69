//! Server-wide NPC ownership
//!
//! NPCs live in the [`NpcRegistry`]; levels only hold their ids. Level-file
//! NPC definitions are turned into registry entries by
//! [`NpcRegistry::spawn_level_npcs`].

use crate::level::{Level, NpcDef};
use crate::script::{format_client_script, SourceCode};
use crate::utils::unix_time;
use bytes::BytesMut;
use log::debug;
use shared::{
    write_gblob, write_gchar, write_gshort, write_gstring, ClientVersion, CodecResult, NpcProp,
};
use std::collections::BTreeMap;

/// Handle into the NPC registry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NpcId(pub u32);

/// Event bits an NPC script can opt into
pub mod npc_events {
    pub const CREATED: u8 = 1 << 0;
    pub const TIMEOUT: u8 = 1 << 1;
    pub const PLAYER_CHATS: u8 = 1 << 2;
    pub const PLAYER_ENTERS: u8 = 1 << 3;
    pub const PLAYER_LEAVES: u8 = 1 << 4;
    pub const PLAYER_TOUCHES: u8 = 1 << 5;
}

#[derive(Debug, Clone, PartialEq)]
pub struct Npc {
    pub id: NpcId,
    pub level: Option<String>,
    /// Position in tiles
    pub x: f32,
    pub y: f32,
    /// Size in tiles
    pub width: f32,
    pub height: f32,
    pub image: String,
    pub gani: String,
    pub nickname: String,
    pub message: String,
    pub visible: bool,
    pub event_flags: u8,
    pub source: SourceCode,
    /// Inline client script sent with the props
    pub client_script: Vec<u8>,
    /// Unix time of the last property change
    pub mod_time: u64,
}

impl Npc {
    pub fn new(id: NpcId, x: f32, y: f32, image: &str, script: &str) -> Self {
        let source = SourceCode::new(script.to_string());
        let client_script = format_client_script(source.client_side());
        Self {
            id,
            level: None,
            x,
            y,
            width: 2.0,
            height: 2.0,
            image: image.to_string(),
            gani: String::new(),
            nickname: String::new(),
            message: String::new(),
            visible: true,
            event_flags: 0,
            source,
            client_script,
            mod_time: unix_time(),
        }
    }

    pub fn contains(&self, x: f32, y: f32) -> bool {
        x >= self.x && x < self.x + self.width && y >= self.y && y < self.y + self.height
    }

    pub fn intersects(&self, x: f32, y: f32, width: f32, height: f32) -> bool {
        self.x < x + width && x < self.x + self.width && self.y < y + height && y < self.y + self.height
    }

    pub fn has_event(&self, flag: u8) -> bool {
        self.event_flags & flag != 0
    }

    pub fn set_position(&mut self, x: f32, y: f32) {
        self.x = x;
        self.y = y;
        self.mod_time = unix_time();
    }

    /// Property block for the NPC props packet
    pub fn props(&self, version: ClientVersion) -> CodecResult<BytesMut> {
        let mut buf = BytesMut::new();

        write_gchar(&mut buf, NpcProp::Image.as_u8());
        write_gstring(&mut buf, self.image.as_bytes())?;

        if !self.client_script.is_empty() {
            write_gchar(&mut buf, NpcProp::Script.as_u8());
            write_gblob(&mut buf, &self.client_script)?;
        }

        write_gchar(&mut buf, NpcProp::X.as_u8());
        write_gchar(&mut buf, (self.x * 2.0) as i32 as u8);
        write_gchar(&mut buf, NpcProp::Y.as_u8());
        write_gchar(&mut buf, (self.y * 2.0) as i32 as u8);

        if version >= ClientVersion::V2_1 && !self.gani.is_empty() {
            write_gchar(&mut buf, NpcProp::Gani.as_u8());
            write_gstring(&mut buf, self.gani.as_bytes())?;
        }

        write_gchar(&mut buf, NpcProp::VisFlags.as_u8());
        write_gchar(&mut buf, u8::from(self.visible));

        if !self.message.is_empty() {
            write_gchar(&mut buf, NpcProp::Message.as_u8());
            write_gstring(&mut buf, self.message.as_bytes())?;
        }
        if !self.nickname.is_empty() {
            write_gchar(&mut buf, NpcProp::Nickname.as_u8());
            write_gstring(&mut buf, self.nickname.as_bytes())?;
        }

        if version.supports_pixel_positions() {
            write_gchar(&mut buf, NpcProp::X2.as_u8());
            write_gshort(&mut buf, pixel_coordinate(self.x));
            write_gchar(&mut buf, NpcProp::Y2.as_u8());
            write_gshort(&mut buf, pixel_coordinate(self.y));
        }

        Ok(buf)
    }
}

/// Pixel position with the sign carried in the lowest bit
fn pixel_coordinate(tiles: f32) -> u16 {
    let pixels = (tiles * 16.0) as i32;
    ((pixels.unsigned_abs() as u16) << 1) | u16::from(pixels < 0)
}

/// Read access to NPCs by id
pub trait NpcLookup {
    fn npc(&self, id: NpcId) -> Option<&Npc>;
}

#[derive(Debug, Default)]
pub struct NpcRegistry {
    npcs: BTreeMap<NpcId, Npc>,
    next_id: u32,
}

impl NpcRegistry {
    pub fn new() -> Self {
        Self {
            npcs: BTreeMap::new(),
            next_id: 1,
        }
    }

    pub fn create(&mut self, x: f32, y: f32, image: &str, script: &str) -> NpcId {
        let id = NpcId(self.next_id.max(1));
        self.next_id = id.0 + 1;
        self.npcs.insert(id, Npc::new(id, x, y, image, script));
        id
    }

    pub fn remove(&mut self, id: NpcId) -> Option<Npc> {
        self.npcs.remove(&id)
    }

    pub fn get_mut(&mut self, id: NpcId) -> Option<&mut Npc> {
        self.npcs.get_mut(&id)
    }

    pub fn len(&self) -> usize {
        self.npcs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.npcs.is_empty()
    }

    /// Creates NPCs for every definition in the level file and registers them with the level.
    pub fn spawn_level_npcs(&mut self, level: &mut Level) -> Vec<NpcId> {
        let defs: Vec<NpcDef> = level.npc_defs().to_vec();
        let mut spawned = Vec::with_capacity(defs.len());
        for def in defs {
            let id = self.create(def.x, def.y, &def.image, &def.script);
            if let Some(npc) = self.npcs.get_mut(&id) {
                npc.level = Some(level.actual_name().to_string());
            }
            if level.add_npc(id) {
                spawned.push(id);
            }
        }
        debug!("Spawned {} npcs on {}", spawned.len(), level.actual_name());
        spawned
    }
}

impl NpcLookup for NpcRegistry {
    fn npc(&self, id: NpcId) -> Option<&Npc> {
        self.npcs.get(&id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::GReader;

    #[test]
    fn test_registry_assigns_unique_ids() {
        let mut registry = NpcRegistry::new();
        let a = registry.create(1.0, 1.0, "a.png", "");
        let b = registry.create(2.0, 2.0, "b.png", "");
        assert_ne!(a, b);
        assert_eq!(registry.len(), 2);
        assert!(registry.remove(a).is_some());
        assert!(registry.npc(a).is_none());
        assert!(registry.npc(b).is_some());
    }

    #[test]
    fn test_hit_tests() {
        let npc = Npc::new(NpcId(1), 10.0, 10.0, "", "");
        assert!(npc.contains(10.0, 11.5));
        assert!(!npc.contains(12.0, 10.0));
        assert!(npc.intersects(11.0, 11.0, 5.0, 5.0));
        assert!(!npc.intersects(12.0, 12.0, 1.0, 1.0));
    }

    #[test]
    fn test_props_branch_on_version() {
        let mut npc = Npc::new(NpcId(1), 3.0, 4.0, "door.png", "//#CLIENTSIDE\nsetshape 1,32,32;");
        npc.gani = "idle".into();

        let legacy = npc.props(ClientVersion::V1_41).unwrap();
        let modern = npc.props(ClientVersion::V6_037).unwrap();
        assert!(modern.len() > legacy.len());

        let mut reader = GReader::new(&legacy);
        assert_eq!(reader.read_gchar().unwrap(), NpcProp::Image.as_u8());
        assert_eq!(reader.read_gstring().unwrap(), b"door.png");
        assert_eq!(reader.read_gchar().unwrap(), NpcProp::Script.as_u8());
        assert_eq!(reader.read_gblob().unwrap(), b"setshape 1,32,32;\xa7");
        assert_eq!(reader.read_gchar().unwrap(), NpcProp::X.as_u8());
        assert_eq!(reader.read_gchar().unwrap(), 6);
    }

    #[test]
    fn test_pixel_coordinate_sign_bit() {
        assert_eq!(pixel_coordinate(2.0), 64);
        assert_eq!(pixel_coordinate(-1.0), 33);
    }
}
