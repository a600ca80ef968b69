//! Level file loading
//!
//! Three file families are understood, told apart by the signature in the
//! first eight bytes:
//!
//! - `GLEVNW01`: line oriented text with base64 tile rows
//! - `GR-V1.00` to `GR-V1.03`: bit-packed tiles followed by text sections
//! - `Z3-V1.03` and `Z3-V1.04`: bit-packed tiles with links, baddies and signs
//!
//! Every family fills the same [`Level`] shape.

use super::entities::{decode_sign_text, Chest, Link, Sign};
use super::item::LevelItemType;
use super::{Level, NpcDef, MAX_BADDIES};
use crate::error::{LevelError, LevelResult};
use crate::utils::file_mod_time;
use log::{debug, info, warn};
use shared::{GReader, BOARD_TILES, MAX_LAYERS, SCRIPT_LINE_SEPARATOR};
use std::path::Path;

const SIGNATURE_LEN: usize = 8;
const BASE64: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789+/";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LevelFormat {
    Nw,
    /// Revision is the last digit of `GR-V1.0x`
    Graal { revision: u8 },
    Zelda { revision: u8 },
}

impl LevelFormat {
    pub fn detect(data: &[u8]) -> Option<Self> {
        let signature = data.get(..SIGNATURE_LEN)?;
        match signature {
            b"GLEVNW01" => Some(LevelFormat::Nw),
            b"GR-V1.00" | b"GR-V1.01" | b"GR-V1.02" | b"GR-V1.03" => Some(LevelFormat::Graal {
                revision: signature[7] - b'0',
            }),
            b"Z3-V1.03" | b"Z3-V1.04" => Some(LevelFormat::Zelda {
                revision: signature[7] - b'0',
            }),
            _ => None,
        }
    }

    fn tile_bits(self) -> u32 {
        match self {
            LevelFormat::Graal { revision } if revision >= 2 => 13,
            _ => 12,
        }
    }

    fn has_npcs(self) -> bool {
        matches!(self, LevelFormat::Graal { revision } if revision >= 1)
    }

    fn has_chests(self) -> bool {
        matches!(self, LevelFormat::Graal { revision } if revision >= 2)
    }
}

impl Level {
    /// Loads a level file. The file name becomes the level name.
    pub fn load(path: &Path) -> LevelResult<Level> {
        let data = std::fs::read(path).map_err(|source| LevelError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        let mut level = Level::parse(&name, &data)?;
        level.set_source(path.to_path_buf(), file_mod_time(path));
        info!("Loaded level {} ({} baddies, {} links)", name, level.baddy_count(), level.links.len());
        Ok(level)
    }

    /// Parses level file contents without touching the filesystem.
    pub fn parse(name: &str, data: &[u8]) -> LevelResult<Level> {
        let format = LevelFormat::detect(data).ok_or_else(|| LevelError::UnknownFormat {
            name: name.to_string(),
        })?;
        debug!("Level {} detected as {:?}", name, format);

        let mut level = Level::new(name);
        let body = &data[SIGNATURE_LEN..];
        match format {
            LevelFormat::Nw => parse_nw(&mut level, body),
            LevelFormat::Graal { .. } | LevelFormat::Zelda { .. } => {
                parse_binary(&mut level, format, body)?
            }
        }
        Ok(level)
    }

    /// Re-reads the backing file, keeping players and NPC registrations.
    pub fn reload(&mut self) -> LevelResult<()> {
        let path = self
            .source_path()
            .map(Path::to_path_buf)
            .ok_or_else(|| LevelError::NotOnDisk {
                name: self.actual_name().to_string(),
            })?;
        let fresh = Level::load(&path)?;
        self.replace_content(fresh);
        info!("Reloaded level {}", self.actual_name());
        Ok(())
    }
}

fn base64_value(c: u8) -> Option<u16> {
    BASE64.iter().position(|&b| b == c).map(|v| v as u16)
}

fn parse_nw(level: &mut Level, body: &[u8]) {
    let text = String::from_utf8_lossy(body).replace('\r', "");
    let mut lines = text.lines();

    while let Some(line) = lines.next() {
        let words: Vec<&str> = line.split_whitespace().collect();
        let Some(&keyword) = words.first() else {
            continue;
        };

        match keyword {
            "BOARD" => parse_nw_board(level, &words),
            "LINK" => match Link::parse(line.trim_start()["LINK".len()..].trim()) {
                Some(link) => level.links.push(link),
                None => warn!("Bad link in {}: {}", level.actual_name(), line),
            },
            "SIGN" => {
                let text = collect_block(&mut lines, "SIGNEND");
                if let (Some(x), Some(y)) = (parse_at(&words, 1), parse_at(&words, 2)) {
                    level.signs.push(Sign { x, y, text });
                }
            }
            "NPC" => {
                let script = collect_block(&mut lines, "NPCEND");
                let image = words.get(1).copied().unwrap_or("-");
                if let (Some(x), Some(y)) = (parse_at::<f32>(&words, 2), parse_at::<f32>(&words, 3)) {
                    level.npc_defs.push(NpcDef {
                        x,
                        y,
                        image: if image == "-" { String::new() } else { image.to_string() },
                        script,
                    });
                }
            }
            "CHEST" => {
                let item = words.get(3).and_then(|name| LevelItemType::from_name(name));
                match (parse_at(&words, 1), parse_at(&words, 2), item, parse_at(&words, 4)) {
                    (Some(x), Some(y), Some(item), Some(sign_index)) => {
                        level.chests.push(Chest { x, y, item, sign_index })
                    }
                    _ => warn!("Bad chest in {}: {}", level.actual_name(), line),
                }
            }
            "BADDY" => {
                let verses: Vec<String> = collect_block(&mut lines, "BADDYEND")
                    .lines()
                    .map(str::to_string)
                    .collect();
                if let (Some(x), Some(y), Some(kind)) =
                    (parse_at::<f32>(&words, 1), parse_at::<f32>(&words, 2), parse_at(&words, 3))
                {
                    if let Some(baddy) = level.add_baddy(x, y, kind) {
                        baddy.set_verses(&verses);
                    }
                }
            }
            _ => debug!("Skipping line in {}: {}", level.actual_name(), keyword),
        }
    }
}

fn parse_at<T: std::str::FromStr>(words: &[&str], index: usize) -> Option<T> {
    words.get(index)?.parse().ok()
}

/// Collects lines up to the terminator. An unterminated block takes the rest of the file.
fn collect_block<'a>(lines: &mut impl Iterator<Item = &'a str>, end: &str) -> String {
    let mut block = Vec::new();
    for line in lines.by_ref() {
        if line.trim() == end {
            break;
        }
        block.push(line);
    }
    block.join("\n")
}

/// `BOARD x y width layer tiles` with two base64 characters per tile.
fn parse_nw_board(level: &mut Level, words: &[&str]) {
    let (Some(x), Some(y), Some(width), Some(layer), Some(data)) = (
        parse_at::<i32>(words, 1),
        parse_at::<i32>(words, 2),
        parse_at::<i32>(words, 3),
        parse_at::<usize>(words, 4),
        words.get(5),
    ) else {
        warn!("Bad board row in {}", level.actual_name());
        return;
    };

    if layer >= MAX_LAYERS || width <= 0 || data.len() != width as usize * 2 {
        warn!("Bad board row in {} at y={}", level.actual_name(), y);
        return;
    }

    let tiles: Option<Vec<u16>> = data
        .as_bytes()
        .chunks(2)
        .map(|pair| Some((base64_value(pair[0])? << 6) | base64_value(pair[1])?))
        .collect();
    let Some(tiles) = tiles else {
        warn!("Bad tile data in {} at y={}", level.actual_name(), y);
        return;
    };

    if level.board.write_region(layer as u8, x, y, width, 1, &tiles).is_none() {
        warn!("Board row out of range in {} at y={}", level.actual_name(), y);
    }
}

/// Little-endian bit reader over the packed tile stream
struct BitReader<'a> {
    data: &'a [u8],
    pos: usize,
    buffer: u32,
    bits: u32,
}

impl<'a> BitReader<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            pos: 0,
            buffer: 0,
            bits: 0,
        }
    }

    fn read(&mut self, count: u32) -> Option<u16> {
        while self.bits < count {
            let byte = *self.data.get(self.pos)?;
            self.pos += 1;
            self.buffer |= u32::from(byte) << self.bits;
            self.bits += 8;
        }
        let value = self.buffer & ((1 << count) - 1);
        self.buffer >>= count;
        self.bits -= count;
        Some(value as u16)
    }
}

/// Decodes the run-length packed board. Returns the tiles and the number of bytes consumed.
fn unpack_board(data: &[u8], bits: u32) -> Option<(Vec<u16>, usize)> {
    let mut reader = BitReader::new(data);
    let mut tiles = Vec::with_capacity(BOARD_TILES);
    let mut count = 1usize;
    let mut double = false;
    let mut first: Option<u16> = None;
    let repeat_flag = 1u16 << (bits - 1);

    while tiles.len() < BOARD_TILES {
        let code = reader.read(bits)?;
        if code & repeat_flag != 0 {
            double = code & 0x100 != 0;
            count = usize::from(code & 0xff);
            continue;
        }

        if count <= 1 {
            tiles.push(code);
        } else if double {
            match first.take() {
                None => first = Some(code),
                Some(lead) => {
                    for _ in 0..count {
                        tiles.push(lead);
                        tiles.push(code);
                    }
                    double = false;
                    count = 1;
                }
            }
        } else {
            tiles.extend(std::iter::repeat(code).take(count));
            count = 1;
        }
    }

    tiles.truncate(BOARD_TILES);
    Some((tiles, reader.pos))
}

fn parse_binary(level: &mut Level, format: LevelFormat, body: &[u8]) -> LevelResult<()> {
    let malformed = |reason: &str| LevelError::Malformed {
        name: level.actual_name().to_string(),
        reason: reason.to_string(),
    };

    let (tiles, consumed) =
        unpack_board(body, format.tile_bits()).ok_or_else(|| malformed("board data ends early"))?;
    level.board.layer_mut(0).copy_from_slice(&tiles);

    let mut reader = GReader::new(&body[consumed..]);

    // Links
    loop {
        let line = reader.read_line();
        if line == b"#" || (line.is_empty() && reader.is_empty()) {
            break;
        }
        match Link::parse(&String::from_utf8_lossy(line)) {
            Some(link) => level.links.push(link),
            None => warn!("Bad link in {}", level.actual_name()),
        }
    }

    // Baddies: three raw bytes each, 0xff 0xff 0xff ends the list
    while reader.remaining() >= 3 {
        let record = reader.read_bytes(3)?;
        if record == [0xff; 3] {
            break;
        }
        let verses: Vec<String> = String::from_utf8_lossy(reader.read_line())
            .split('\\')
            .map(str::to_string)
            .collect();
        if level.baddy_count() >= MAX_BADDIES {
            continue;
        }
        if let Some(baddy) = level.add_baddy(f32::from(record[0]), f32::from(record[1]), record[2]) {
            baddy.set_verses(&verses);
        }
    }

    if format.has_npcs() {
        loop {
            let line = reader.read_line();
            if line == b"#" || (line.is_empty() && reader.is_empty()) {
                break;
            }
            let mut fields = GReader::new(line);
            let x = fields.read_gchar()?;
            let y = fields.read_gchar()?;
            let rest = fields.rest();
            let (image, script) = match rest.iter().position(|&b| b == b'#') {
                Some(split) => (&rest[..split], &rest[split + 1..]),
                None => (rest, &[][..]),
            };
            let script: Vec<u8> = script
                .iter()
                .map(|&b| if b == SCRIPT_LINE_SEPARATOR { b'\n' } else { b })
                .collect();
            level.npc_defs.push(NpcDef {
                x: f32::from(x),
                y: f32::from(y),
                image: String::from_utf8_lossy(image).into_owned(),
                script: String::from_utf8_lossy(&script).into_owned(),
            });
        }
    }

    if format.has_chests() {
        loop {
            let line = reader.read_line();
            if line == b"#" || (line.is_empty() && reader.is_empty()) {
                break;
            }
            let mut fields = GReader::new(line);
            let (x, y) = (fields.read_gchar()?, fields.read_gchar()?);
            let item = fields.read_gchar()?;
            let sign_index = fields.read_gchar()?;
            match LevelItemType::from_id(item) {
                Some(item) => level.chests.push(Chest { x, y, item, sign_index }),
                None => warn!("Unknown chest item {} in {}", item, level.actual_name()),
            }
        }
    }

    // Signs run to the first empty line
    loop {
        let line = reader.read_line();
        if line.is_empty() {
            break;
        }
        let mut fields = GReader::new(line);
        let (x, y) = (fields.read_gchar()?, fields.read_gchar()?);
        level.signs.push(Sign {
            x,
            y,
            text: decode_sign_text(fields.rest()),
        });
    }

    Ok(())
}
