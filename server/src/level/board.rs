//! Tile layers and the board change log

use super::players::PlayerId;
use shared::{GReader, BOARD_HEIGHT, BOARD_TILES, BOARD_WIDTH};
use std::collections::BTreeMap;

/// Returns true when the rectangle lies entirely inside the board.
pub fn region_in_bounds(x: i32, y: i32, width: i32, height: i32) -> bool {
    x >= 0
        && y >= 0
        && width > 0
        && height > 0
        && width <= BOARD_WIDTH as i32 - x
        && height <= BOARD_HEIGHT as i32 - y
}

/// Unpacks GShort encoded tiles as sent by clients.
pub fn unpack_tiles(data: &[u8]) -> Option<Vec<u16>> {
    if data.len() % 2 != 0 {
        return None;
    }
    let mut reader = GReader::new(data);
    let mut tiles = Vec::with_capacity(data.len() / 2);
    while !reader.is_empty() {
        tiles.push(reader.read_gshort().ok()?);
    }
    Some(tiles)
}

/// Layered 64x64 tile grid. Layer 0 always exists; other layers exist once written.
#[derive(Debug, Clone, PartialEq)]
pub struct Board {
    layers: BTreeMap<u8, Vec<u16>>,
}

impl Default for Board {
    fn default() -> Self {
        let mut layers = BTreeMap::new();
        layers.insert(0, vec![0; BOARD_TILES]);
        Self { layers }
    }
}

impl Board {
    pub fn new() -> Self {
        Self::default()
    }

    fn index(x: i32, y: i32) -> Option<usize> {
        if (0..BOARD_WIDTH as i32).contains(&x) && (0..BOARD_HEIGHT as i32).contains(&y) {
            Some(y as usize * BOARD_WIDTH + x as usize)
        } else {
            None
        }
    }

    pub fn tile(&self, layer: u8, x: i32, y: i32) -> Option<u16> {
        let tiles = self.layers.get(&layer)?;
        Self::index(x, y).map(|i| tiles[i])
    }

    pub fn set_tile(&mut self, layer: u8, x: i32, y: i32, tile: u16) -> bool {
        match Self::index(x, y) {
            Some(i) => {
                self.layer_mut(layer)[i] = tile;
                true
            }
            None => false,
        }
    }

    pub fn layer(&self, layer: u8) -> Option<&[u16]> {
        self.layers.get(&layer).map(Vec::as_slice)
    }

    /// Creates the layer on first access.
    pub fn layer_mut(&mut self, layer: u8) -> &mut [u16] {
        self.layers
            .entry(layer)
            .or_insert_with(|| vec![0; BOARD_TILES])
            .as_mut_slice()
    }

    /// Populated layers in ascending order
    pub fn active_layers(&self) -> impl Iterator<Item = u8> + '_ {
        self.layers.keys().copied()
    }

    pub fn read_region(&self, layer: u8, x: i32, y: i32, width: i32, height: i32) -> Option<Vec<u16>> {
        if !region_in_bounds(x, y, width, height) {
            return None;
        }
        let tiles = self.layers.get(&layer)?;
        let mut out = Vec::with_capacity((width * height) as usize);
        for row in y..y + height {
            let start = row as usize * BOARD_WIDTH + x as usize;
            out.extend_from_slice(&tiles[start..start + width as usize]);
        }
        Some(out)
    }

    /// Overwrites a region row-major and returns the tiles it replaced.
    pub fn write_region(
        &mut self,
        layer: u8,
        x: i32,
        y: i32,
        width: i32,
        height: i32,
        patch: &[u16],
    ) -> Option<Vec<u16>> {
        if !region_in_bounds(x, y, width, height) || patch.len() != (width * height) as usize {
            return None;
        }
        let previous = self.read_region(layer, x, y, width, height).unwrap_or_default();
        let tiles = self.layer_mut(layer);
        for (row_index, row) in patch.chunks(width as usize).enumerate() {
            let start = (y as usize + row_index) * BOARD_WIDTH + x as usize;
            tiles[start..start + width as usize].copy_from_slice(row);
        }
        Some(previous)
    }
}

/// One applied board patch
#[derive(Debug, Clone, PartialEq)]
pub struct BoardChange {
    pub x: u8,
    pub y: u8,
    pub width: u8,
    pub height: u8,
    pub tiles: Vec<u16>,
    /// Tiles that were overwritten. Empty for changes that restore tiles,
    /// which are never reverted themselves.
    pub previous: Vec<u16>,
    pub mod_time: u64,
    pub actor: Option<PlayerId>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::{write_gshort, BOARD_TILES};

    #[test]
    fn test_region_bounds() {
        assert!(region_in_bounds(0, 0, 64, 64));
        assert!(region_in_bounds(63, 63, 1, 1));
        assert!(!region_in_bounds(63, 63, 2, 1));
        assert!(!region_in_bounds(-1, 0, 2, 2));
        assert!(!region_in_bounds(0, 0, 0, 1));
        assert!(!region_in_bounds(10, 60, 2, 5));
    }

    #[test]
    fn test_region_bounds_extreme_values() {
        assert!(!region_in_bounds(i32::MAX, 0, 1, 1));
        assert!(!region_in_bounds(0, i32::MAX, 1, 1));
        assert!(!region_in_bounds(i32::MIN, i32::MIN, 1, 1));
        assert!(!region_in_bounds(1, 1, i32::MAX, i32::MAX));
        assert!(!region_in_bounds(0, 0, i32::MIN, 1));

        let mut board = Board::new();
        assert!(board.read_region(0, i32::MAX, i32::MAX, 1, 1).is_none());
        assert!(board.write_region(0, i32::MAX, 0, 1, 1, &[7]).is_none());
        assert!(board.write_region(0, 0, 0, i32::MAX, 2, &[7]).is_none());
    }

    #[test]
    fn test_write_then_read_region() {
        let mut board = Board::new();
        let patch = vec![1, 2, 3, 4, 5, 6];
        let previous = board.write_region(0, 10, 20, 3, 2, &patch).unwrap();
        assert_eq!(previous, vec![0; 6]);
        assert_eq!(board.read_region(0, 10, 20, 3, 2).unwrap(), patch);
        assert_eq!(board.tile(0, 12, 21), Some(6));
        assert_eq!(board.tile(0, 13, 21), Some(0));
    }

    #[test]
    fn test_write_rejects_wrong_length() {
        let mut board = Board::new();
        assert!(board.write_region(0, 0, 0, 2, 2, &[1, 2, 3]).is_none());
        assert_eq!(board.layer(0).unwrap(), &vec![0; BOARD_TILES][..]);
    }

    #[test]
    fn test_layers_created_on_write() {
        let mut board = Board::new();
        assert_eq!(board.active_layers().collect::<Vec<_>>(), vec![0]);
        assert!(board.set_tile(3, 1, 1, 77));
        assert_eq!(board.active_layers().collect::<Vec<_>>(), vec![0, 3]);
        assert_eq!(board.tile(3, 1, 1), Some(77));
        assert_eq!(board.tile(2, 1, 1), None);
        assert!(!board.set_tile(0, 64, 0, 1));
    }

    #[test]
    fn test_unpack_tiles() {
        let mut buf = bytes::BytesMut::new();
        write_gshort(&mut buf, 512);
        write_gshort(&mut buf, 3);
        assert_eq!(unpack_tiles(&buf), Some(vec![512, 3]));
        assert_eq!(unpack_tiles(&buf[..3]), None);
    }
}
