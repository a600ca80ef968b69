//! Tile attribute table used by wall and water queries

use std::path::Path;

/// Number of distinct tile codes in a tileset
pub const TILESET_SIZE: usize = 4096;

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum TileType {
    NonBlocking = 0,
    HurtUnderground = 2,
    Chair = 3,
    BedUpper = 4,
    BedLower = 5,
    Swamp = 6,
    LavaSwamp = 7,
    NearWater = 8,
    Water = 11,
    Lava = 12,
    ThrowThrough = 20,
    Jumpstone = 21,
    Blocking = 22,
}

impl TileType {
    pub fn from_u8(value: u8) -> Self {
        match value {
            2 => TileType::HurtUnderground,
            3 => TileType::Chair,
            4 => TileType::BedUpper,
            5 => TileType::BedLower,
            6 => TileType::Swamp,
            7 => TileType::LavaSwamp,
            8 => TileType::NearWater,
            11 => TileType::Water,
            12 => TileType::Lava,
            20 => TileType::ThrowThrough,
            21 => TileType::Jumpstone,
            22 => TileType::Blocking,
            _ => TileType::NonBlocking,
        }
    }

    pub fn is_wall(self) -> bool {
        self >= TileType::ThrowThrough
    }
}

/// Filter bits for rectangular wall tests
pub mod wall_flags {
    /// Water tiles block
    pub const BLOCK_WATER: u8 = 0x01;
    /// Chairs and beds block
    pub const BLOCK_FURNITURE: u8 = 0x02;
    /// Throw-through tiles do not block
    pub const PASS_THROW_THROUGH: u8 = 0x04;
}

/// Maps tile codes to their attributes. One table is shared by all levels.
#[derive(Debug, Clone)]
pub struct TileTypes {
    types: Vec<TileType>,
}

impl Default for TileTypes {
    fn default() -> Self {
        Self {
            types: vec![TileType::NonBlocking; TILESET_SIZE],
        }
    }
}

impl TileTypes {
    /// One byte per tile code; missing entries are non-blocking.
    pub fn from_bytes(data: &[u8]) -> Self {
        let mut table = Self::default();
        for (slot, &value) in table.types.iter_mut().zip(data) {
            *slot = TileType::from_u8(value);
        }
        table
    }

    pub fn load(path: &Path) -> std::io::Result<Self> {
        Ok(Self::from_bytes(&std::fs::read(path)?))
    }

    pub fn set(&mut self, tile: u16, kind: TileType) {
        if let Some(slot) = self.types.get_mut(tile as usize) {
            *slot = kind;
        }
    }

    pub fn get(&self, tile: u16) -> TileType {
        self.types
            .get(tile as usize)
            .copied()
            .unwrap_or(TileType::NonBlocking)
    }
}
