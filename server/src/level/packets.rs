//! Outbound packets rendered from level state
//!
//! Every encoder borrows the level immutably and produces the same bytes for
//! the same state, so snapshots can be built from a read guard while other
//! readers do the same.

use super::board::BoardChange;
use super::entities::{encode_sign_text, Baddy, Chest};
use super::item::write_half_tile;
use super::Level;
use crate::npc::NpcLookup;
use bytes::{BufMut, BytesMut};
use shared::{
    finish, write_gchar, write_gint, write_gshort, write_gstring, BaddyLayout, BaddyProp,
    BoardChangeFraming, ClientVersion, CodecResult, PlayerOutPacket, BOARD_HEIGHT, BOARD_TILES,
    BOARD_WIDTH,
};

impl Level {
    /// Base layer as raw little-endian tiles
    pub fn board_packet(&self) -> Vec<u8> {
        let mut buf = PlayerOutPacket::BoardPacket.begin();
        buf.reserve(BOARD_TILES * 2 + 1);
        for &tile in self.board.layer(0).unwrap_or(&[]) {
            buf.put_u16_le(tile);
        }
        finish(buf)
    }

    /// Full snapshot of one overlay layer. `None` for layers that were never populated.
    pub fn layer_packet(&self, layer: u8) -> Option<Vec<u8>> {
        let tiles = self.board.layer(layer)?;
        let mut buf = PlayerOutPacket::BoardLayer.begin();
        write_gchar(&mut buf, layer);
        write_gchar(&mut buf, 0);
        write_gchar(&mut buf, 0);
        write_gchar(&mut buf, BOARD_WIDTH as u8);
        write_gchar(&mut buf, BOARD_HEIGHT as u8);
        for &tile in tiles {
            write_gshort(&mut buf, tile);
        }
        Some(finish(buf))
    }

    /// Board packet followed by one packet per populated overlay layer
    pub fn board_packets(&self) -> Vec<Vec<u8>> {
        let mut packets = vec![self.board_packet()];
        packets.extend(
            self.board
                .active_layers()
                .filter(|&layer| layer != 0)
                .filter_map(|layer| self.layer_packet(layer)),
        );
        packets
    }

    pub fn baddy_packets(&self, version: ClientVersion) -> CodecResult<Vec<Vec<u8>>> {
        let layout = version.baddy_layout();
        self.baddies()
            .map(|baddy| baddy_packet(baddy, layout))
            .collect()
    }

    /// Board changes made at or after `since`, in the framing the client version expects.
    pub fn board_changes_packets(&self, since: u64, version: ClientVersion) -> Vec<Vec<u8>> {
        self.board_changes_framed(since, version.board_change_framing())
    }

    pub fn board_changes_framed(&self, since: u64, framing: BoardChangeFraming) -> Vec<Vec<u8>> {
        let changes = self.changes().iter().filter(|change| change.mod_time >= since);
        match framing {
            BoardChangeFraming::Bulk => {
                let mut buf = PlayerOutPacket::LevelBoard.begin();
                for change in changes {
                    write_board_change(&mut buf, change);
                }
                vec![finish(buf)]
            }
            BoardChangeFraming::PerChange => changes
                .map(|change| {
                    let mut buf = PlayerOutPacket::BoardModify.begin();
                    write_board_change(&mut buf, change);
                    finish(buf)
                })
                .collect(),
        }
    }

    /// Chest packets; `opened` tells whether the viewing player already looted a chest.
    pub fn chest_packets(&self, opened: impl Fn(&Chest) -> bool) -> Vec<Vec<u8>> {
        self.chests
            .iter()
            .map(|chest| {
                let is_open = opened(chest);
                let mut buf = PlayerOutPacket::LevelChest.begin();
                write_gchar(&mut buf, u8::from(is_open));
                write_gchar(&mut buf, chest.x);
                write_gchar(&mut buf, chest.y);
                if !is_open {
                    write_gchar(&mut buf, chest.item.id());
                    write_gchar(&mut buf, chest.sign_index);
                }
                finish(buf)
            })
            .collect()
    }

    pub fn horse_packets(&self) -> Vec<Vec<u8>> {
        self.horses
            .iter()
            .map(|horse| {
                let mut buf = PlayerOutPacket::HorseAdd.begin();
                write_half_tile(&mut buf, horse.x);
                write_half_tile(&mut buf, horse.y);
                write_gchar(&mut buf, (horse.dir & 0x03) | (horse.bushes << 2));
                buf.put_slice(horse.image.as_bytes());
                finish(buf)
            })
            .collect()
    }

    pub fn item_packets(&self) -> Vec<Vec<u8>> {
        self.items.iter().map(|item| item.add_packet()).collect()
    }

    pub fn link_packets(&self) -> Vec<Vec<u8>> {
        self.links
            .iter()
            .map(|link| {
                let mut buf = PlayerOutPacket::LevelLink.begin();
                buf.put_slice(link.link_str().as_bytes());
                finish(buf)
            })
            .collect()
    }

    pub fn sign_packets(&self) -> Vec<Vec<u8>> {
        self.signs
            .iter()
            .map(|sign| {
                let mut buf = PlayerOutPacket::LevelSign.begin();
                write_gchar(&mut buf, sign.x);
                write_gchar(&mut buf, sign.y);
                buf.put_slice(&encode_sign_text(&sign.text));
                finish(buf)
            })
            .collect()
    }

    /// Props of registered NPCs changed at or after `since`
    pub fn npc_packets(
        &self,
        npcs: &impl NpcLookup,
        since: u64,
        version: ClientVersion,
    ) -> CodecResult<Vec<Vec<u8>>> {
        let mut packets = Vec::new();
        for npc in self.npcs().iter().filter_map(|&id| npcs.npc(id)) {
            if npc.mod_time < since {
                continue;
            }
            let mut buf = PlayerOutPacket::NpcProps.begin();
            write_gint(&mut buf, npc.id.0);
            buf.put_slice(&npc.props(version)?);
            packets.push(finish(buf));
        }
        Ok(packets)
    }
}

fn write_board_change(buf: &mut BytesMut, change: &BoardChange) {
    write_gchar(buf, change.x);
    write_gchar(buf, change.y);
    write_gchar(buf, change.width);
    write_gchar(buf, change.height);
    for &tile in &change.tiles {
        write_gshort(buf, tile);
    }
}

fn baddy_packet(baddy: &Baddy, layout: BaddyLayout) -> CodecResult<Vec<u8>> {
    let mut buf = PlayerOutPacket::BaddyProps.begin();
    write_gchar(&mut buf, baddy.id);

    write_gchar(&mut buf, BaddyProp::X.as_u8());
    write_half_tile(&mut buf, baddy.x);
    write_gchar(&mut buf, BaddyProp::Y.as_u8());
    write_half_tile(&mut buf, baddy.y);
    write_gchar(&mut buf, BaddyProp::Type.as_u8());
    write_gchar(&mut buf, baddy.kind);
    write_gchar(&mut buf, BaddyProp::PowerImage.as_u8());
    write_gchar(&mut buf, baddy.power);
    write_gstring(&mut buf, baddy.image.as_bytes())?;
    write_gchar(&mut buf, BaddyProp::Mode.as_u8());
    write_gchar(&mut buf, baddy.mode as u8);
    if layout == BaddyLayout::Extended {
        write_gchar(&mut buf, BaddyProp::Ani.as_u8());
        write_gstring(&mut buf, baddy.ani.as_bytes())?;
    }
    write_gchar(&mut buf, BaddyProp::Dir.as_u8());
    write_gchar(&mut buf, baddy.dir);

    let verse_props = [BaddyProp::VerseSight, BaddyProp::VerseHurt, BaddyProp::VerseAttack];
    for (prop, verse) in verse_props.into_iter().zip(&baddy.verses) {
        write_gchar(&mut buf, prop.as_u8());
        write_gstring(&mut buf, verse.as_bytes())?;
    }

    Ok(finish(buf))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::level::{Horse, LevelItemType, PlayerId, Sign};
    use crate::npc::NpcRegistry;
    use shared::GReader;

    #[test]
    fn test_board_packet_layout() {
        let mut level = Level::new("test.nw");
        level.alter_board(&[0x1234], 1, 0, 1, 1, None);
        let packet = level.board_packet();

        assert_eq!(packet.len(), 1 + BOARD_TILES * 2 + 1);
        assert_eq!(packet[0], 101 + 32);
        assert_eq!(&packet[3..5], &[0x34, 0x12]);
        assert_eq!(packet.last(), Some(&b'\n'));
    }

    #[test]
    fn test_layer_packets_follow_board() {
        let mut level = Level::new("test.nw");
        level.board.set_tile(2, 0, 0, 300);

        let packets = level.board_packets();
        assert_eq!(packets.len(), 2);
        let layer = &packets[1];
        assert_eq!(layer[0], 107 + 32);
        assert_eq!(&layer[1..6], &[34, 32, 32, 96, 96]);

        let mut reader = GReader::new(&layer[6..]);
        assert_eq!(reader.read_gshort().unwrap(), 300);
        assert_eq!(layer.len(), 6 + BOARD_TILES * 2 + 1);
        assert!(level.layer_packet(5).is_none());
    }

    #[test]
    fn test_board_change_framings_select_same_changes() {
        let mut level = Level::new("test.nw");
        level.alter_board(&[1, 2], 3, 4, 2, 1, Some(PlayerId(1)));
        level.alter_board(&[9], 10, 10, 1, 1, None);

        let per_change = level.board_changes_framed(0, BoardChangeFraming::PerChange);
        assert_eq!(per_change.len(), 2);
        assert_eq!(per_change[0], vec![7 + 32, 35, 36, 34, 33, 32, 33, 32, 34, b'\n']);

        let bulk = level.board_changes_framed(0, BoardChangeFraming::Bulk);
        assert_eq!(bulk.len(), 1);
        let body: Vec<u8> = per_change
            .iter()
            .flat_map(|p| p[1..p.len() - 1].to_vec())
            .collect();
        assert_eq!(&bulk[0][1..bulk[0].len() - 1], &body[..]);

        assert!(level
            .board_changes_framed(u64::MAX, BoardChangeFraming::PerChange)
            .is_empty());
        assert_eq!(
            level.board_changes_framed(u64::MAX, BoardChangeFraming::Bulk),
            vec![vec![32, b'\n']]
        );
    }

    #[test]
    fn test_baddy_layout_by_version() {
        let mut level = Level::new("test.nw");
        level.add_baddy(10.0, 11.0, 0);
        level.add_baddy(12.0, 13.0, 1);

        let old = level.baddy_packets(ClientVersion::V1_41).unwrap();
        let new = level.baddy_packets(ClientVersion::V2_17).unwrap();
        assert_eq!(old.len(), 2);
        assert_eq!(new[0].len() - old[0].len(), 1 + 1 + "idle".len());

        let mut reader = GReader::new(&new[1]);
        assert_eq!(reader.read_gchar().unwrap(), 2);
        assert_eq!(reader.read_gchar().unwrap(), 2);
        assert_eq!(reader.read_gchar().unwrap(), BaddyProp::X.as_u8());
        assert_eq!(reader.read_gchar().unwrap(), 24);
    }

    #[test]
    fn test_chest_packet_hides_opened_contents() {
        let mut level = Level::new("test.nw");
        level.chests.push(Chest {
            x: 4,
            y: 5,
            item: LevelItemType::Sword,
            sign_index: 1,
        });

        let closed = level.chest_packets(|_| false);
        assert_eq!(closed[0], vec![36, 32, 36, 37, 42, 33, b'\n']);
        let opened = level.chest_packets(|chest| chest.x == 4);
        assert_eq!(opened[0], vec![36, 33, 36, 37, b'\n']);
    }

    #[test]
    fn test_entity_packets() {
        let mut level = Level::new("test.nw");
        level.horses.push(Horse {
            x: 1.0,
            y: 2.0,
            image: "horse.png".into(),
            dir: 2,
            bushes: 1,
        });
        level.signs.push(Sign {
            x: 3,
            y: 4,
            text: "A".into(),
        });
        level.links.push(crate::level::Link::parse("a.nw 0 0 1 1 5 5").unwrap());
        level.add_item(1.0, 1.0, LevelItemType::Bombs);

        assert_eq!(level.horse_packets()[0], b"1\"$&horse.png\n".to_vec());
        assert_eq!(level.sign_packets()[0], vec![37, 35, 36, 32, b'\n']);
        assert_eq!(level.link_packets()[0], b"!a.nw 0 0 1 1 5 5\n".to_vec());
        assert_eq!(level.item_packets().len(), 1);
    }

    #[test]
    fn test_npc_packets_filter_by_time() {
        let mut level = Level::new("test.nw");
        let mut registry = NpcRegistry::new();
        let old = registry.create(1.0, 1.0, "old.png", "");
        let fresh = registry.create(2.0, 2.0, "new.png", "");
        if let Some(npc) = registry.get_mut(old) {
            npc.mod_time = 100;
        }
        if let Some(npc) = registry.get_mut(fresh) {
            npc.mod_time = 200;
        }
        level.add_npc(old);
        level.add_npc(fresh);

        let packets = level.npc_packets(&registry, 150, ClientVersion::V2_17).unwrap();
        assert_eq!(packets.len(), 1);
        let mut reader = GReader::new(&packets[0]);
        assert_eq!(reader.read_gchar().unwrap(), 3);
        assert_eq!(reader.read_gint().unwrap(), fresh.0);

        assert_eq!(level.npc_packets(&registry, 0, ClientVersion::V2_17).unwrap().len(), 2);
    }

    #[test]
    fn test_encoding_is_deterministic() {
        let mut level = Level::new("test.nw");
        level.add_baddy(5.0, 5.0, 3);
        level.alter_board(&[4; 9], 0, 0, 3, 3, None);
        assert_eq!(level.board_packets(), level.board_packets());
        assert_eq!(
            level.baddy_packets(ClientVersion::V6_037).unwrap(),
            level.baddy_packets(ClientVersion::V6_037).unwrap()
        );
        assert_eq!(
            level.board_changes_packets(0, ClientVersion::V1_41),
            level.board_changes_packets(0, ClientVersion::V1_41)
        );
    }
}
