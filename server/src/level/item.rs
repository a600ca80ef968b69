//! Item kinds that can lie on a level or be granted as default weapons

use bytes::BytesMut;
use shared::{finish, write_gchar, PlayerOutPacket};

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LevelItemType {
    GreenRupee = 0,
    BlueRupee,
    RedRupee,
    Bombs,
    Darts,
    Heart,
    Glove1,
    Bow,
    Bomb,
    Shield,
    Sword,
    FullHeart,
    SuperBomb,
    BattleAxe,
    GoldenSword,
    MirrorShield,
    Glove2,
    LizardShield,
    LizardSword,
    GoldRupee,
    Fireball,
    Fireblast,
    Nukeshot,
    Joltbomb,
    SpinAttack,
}

const ITEM_NAMES: [&str; 25] = [
    "greenrupee",
    "bluerupee",
    "redrupee",
    "bombs",
    "darts",
    "heart",
    "glove1",
    "bow",
    "bomb",
    "shield",
    "sword",
    "fullheart",
    "superbomb",
    "battleaxe",
    "goldensword",
    "mirrorshield",
    "glove2",
    "lizardshield",
    "lizardsword",
    "goldrupee",
    "fireball",
    "fireblast",
    "nukeshot",
    "joltbomb",
    "spinattack",
];

impl LevelItemType {
    pub const ALL: [LevelItemType; 25] = [
        LevelItemType::GreenRupee,
        LevelItemType::BlueRupee,
        LevelItemType::RedRupee,
        LevelItemType::Bombs,
        LevelItemType::Darts,
        LevelItemType::Heart,
        LevelItemType::Glove1,
        LevelItemType::Bow,
        LevelItemType::Bomb,
        LevelItemType::Shield,
        LevelItemType::Sword,
        LevelItemType::FullHeart,
        LevelItemType::SuperBomb,
        LevelItemType::BattleAxe,
        LevelItemType::GoldenSword,
        LevelItemType::MirrorShield,
        LevelItemType::Glove2,
        LevelItemType::LizardShield,
        LevelItemType::LizardSword,
        LevelItemType::GoldRupee,
        LevelItemType::Fireball,
        LevelItemType::Fireblast,
        LevelItemType::Nukeshot,
        LevelItemType::Joltbomb,
        LevelItemType::SpinAttack,
    ];

    pub fn id(self) -> u8 {
        self as u8
    }

    pub fn from_id(id: u8) -> Option<Self> {
        Self::ALL.get(id as usize).copied()
    }

    pub fn name(self) -> &'static str {
        ITEM_NAMES[self as usize]
    }

    pub fn from_name(name: &str) -> Option<Self> {
        ITEM_NAMES
            .iter()
            .position(|n| n.eq_ignore_ascii_case(name.trim()))
            .and_then(|index| Self::from_id(index as u8))
    }
}

/// An item lying on the level at a sub-tile position
#[derive(Debug, Clone, PartialEq)]
pub struct LevelItem {
    pub x: f32,
    pub y: f32,
    pub kind: LevelItemType,
    /// Unix time after which the item disappears
    pub expires_at: Option<u64>,
}

impl LevelItem {
    pub fn new(x: f32, y: f32, kind: LevelItemType) -> Self {
        Self {
            x,
            y,
            kind,
            expires_at: None,
        }
    }

    pub fn is_at(&self, x: f32, y: f32) -> bool {
        self.x == x && self.y == y
    }

    pub fn add_packet(&self) -> Vec<u8> {
        let mut buf = PlayerOutPacket::ItemAdd.begin();
        write_half_tile(&mut buf, self.x);
        write_half_tile(&mut buf, self.y);
        write_gchar(&mut buf, self.kind.id());
        finish(buf)
    }
}

/// Positions travel in half-tile units
pub(crate) fn write_half_tile(buf: &mut BytesMut, value: f32) {
    write_gchar(buf, (value * 2.0) as i32 as u8);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_item_names_roundtrip() {
        for kind in LevelItemType::ALL {
            assert_eq!(LevelItemType::from_name(kind.name()), Some(kind));
            assert_eq!(LevelItemType::from_id(kind.id()), Some(kind));
        }
        assert_eq!(LevelItemType::from_name("Bow"), Some(LevelItemType::Bow));
        assert_eq!(LevelItemType::from_name("rocket"), None);
        assert_eq!(LevelItemType::from_id(25), None);
    }

    #[test]
    fn test_item_add_packet() {
        let item = LevelItem::new(10.5, 20.0, LevelItemType::Heart);
        let packet = item.add_packet();
        assert_eq!(packet, vec![22 + 32, 21 + 32, 40 + 32, 5 + 32, b'\n']);
    }
}
