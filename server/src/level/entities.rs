//! Level-owned entities: baddies, chests, horses, links and signs

use super::item::LevelItemType;

/// Hard cap on simultaneously alive baddies per level
pub const MAX_BADDIES: usize = 50;

/// Baddy behaviour modes as the client numbers them
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BaddyMode {
    Walk = 0,
    Look,
    Hunt,
    Hurt,
    Bump,
    Die,
    SwampShot,
    HareJump,
    OctoShot,
    Dead,
}

const BADDY_IMAGES: [&str; 10] = [
    "baddygray.png",
    "baddyblue.png",
    "baddyred.png",
    "baddyblue.png",
    "baddygray.png",
    "baddyhare.png",
    "baddyoctopus.png",
    "baddygold.png",
    "baddylizardon.png",
    "baddydragon.png",
];

const BADDY_POWER: [u8; 10] = [2, 3, 4, 3, 2, 1, 1, 6, 12, 8];

pub const BADDY_TYPES: u8 = BADDY_IMAGES.len() as u8;

#[derive(Debug, Clone, PartialEq)]
pub struct Baddy {
    pub id: u8,
    pub x: f32,
    pub y: f32,
    pub start_x: f32,
    pub start_y: f32,
    pub kind: u8,
    pub power: u8,
    pub image: String,
    pub mode: BaddyMode,
    pub ani: String,
    pub dir: u8,
    /// Sight, hurt and attack lines
    pub verses: [String; 3],
}

impl Baddy {
    /// Unknown kinds fall back to the first baddy type.
    pub fn new(x: f32, y: f32, kind: u8) -> Self {
        let kind = if kind < BADDY_TYPES { kind } else { 0 };
        Self {
            id: 0,
            x,
            y,
            start_x: x,
            start_y: y,
            kind,
            power: BADDY_POWER[kind as usize],
            image: BADDY_IMAGES[kind as usize].to_string(),
            mode: BaddyMode::Walk,
            ani: "idle".to_string(),
            dir: 2,
            verses: Default::default(),
        }
    }

    pub fn set_verses(&mut self, verses: &[String]) {
        for (slot, verse) in self.verses.iter_mut().zip(verses) {
            *slot = verse.clone();
        }
    }

    /// Puts the baddy back where the level placed it.
    pub fn reset(&mut self) {
        self.x = self.start_x;
        self.y = self.start_y;
        self.power = BADDY_POWER[self.kind as usize];
        self.mode = BaddyMode::Walk;
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chest {
    pub x: u8,
    pub y: u8,
    pub item: LevelItemType,
    pub sign_index: u8,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Horse {
    pub x: f32,
    pub y: f32,
    pub image: String,
    pub dir: u8,
    /// Bushes eaten so far
    pub bushes: u8,
}

/// Warp rectangle leading to another level
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Link {
    pub new_level: String,
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
    /// Destination coordinates, or `playerx` / `playery` to keep the current one
    pub new_x: String,
    pub new_y: String,
}

impl Link {
    /// Parses `level x y width height newx newy`. Level names may contain spaces.
    pub fn parse(line: &str) -> Option<Self> {
        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.len() < 7 {
            return None;
        }
        let split = parts.len() - 6;
        let nums = &parts[split..];
        Some(Self {
            new_level: parts[..split].join(" "),
            x: nums[0].parse().ok()?,
            y: nums[1].parse().ok()?,
            width: nums[2].parse().ok()?,
            height: nums[3].parse().ok()?,
            new_x: nums[4].to_string(),
            new_y: nums[5].to_string(),
        })
    }

    pub fn link_str(&self) -> String {
        format!(
            "{} {} {} {} {} {} {}",
            self.new_level, self.x, self.y, self.width, self.height, self.new_x, self.new_y
        )
    }

    pub fn contains(&self, x: i32, y: i32) -> bool {
        x >= self.x
            && x < self.x.saturating_add(self.width)
            && y >= self.y
            && y < self.y.saturating_add(self.height)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sign {
    pub x: u8,
    pub y: u8,
    pub text: String,
}

// Sign character table; '#' slots are reserved for the symbols below.
const SIGN_TEXT: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789!?-.,#>()#####\"####':/~&### <####;\n";
const SIGN_SYMBOLS: [(u8, &[u8]); 14] = [
    (b'A', &[91]),
    (b'B', &[92]),
    (b'X', &[93]),
    (b'Y', &[94]),
    (b'u', &[77]),
    (b'd', &[78]),
    (b'l', &[79]),
    (b'r', &[80]),
    (b'h', &[74]),
    (b'x', &[75, 71]),
    (b'y', &[72, 73]),
    (b'z', &[86, 86]),
    (b'#', &[87, 88]),
    (b'4', &[67]),
];

/// Encodes sign text into client glyph codes. `#A`-style escapes become symbols.
pub fn encode_sign_text(text: &str) -> Vec<u8> {
    let bytes = text.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        let ch = bytes[i];
        if ch == b'#' {
            if let Some((_, codes)) = bytes
                .get(i + 1)
                .and_then(|next| SIGN_SYMBOLS.iter().find(|(symbol, _)| symbol == next))
            {
                out.extend(codes.iter().map(|code| code + 32));
                i += 2;
                continue;
            }
        }
        if let Some(code) = SIGN_TEXT.iter().position(|&c| c == ch && c != b'#') {
            out.push(code as u8 + 32);
        }
        i += 1;
    }
    out
}

pub fn decode_sign_text(encoded: &[u8]) -> String {
    let codes: Vec<u8> = encoded.iter().map(|b| b.wrapping_sub(32)).collect();
    let mut out = String::with_capacity(codes.len());
    let mut i = 0;
    'codes: while i < codes.len() {
        // Two-code symbols first so their leading code is not read alone
        for len in [2, 1] {
            if let Some((symbol, _)) = SIGN_SYMBOLS
                .iter()
                .find(|(_, seq)| seq.len() == len && codes[i..].starts_with(seq))
            {
                out.push('#');
                out.push(*symbol as char);
                i += len;
                continue 'codes;
            }
        }
        if let Some(&c) = SIGN_TEXT.get(codes[i] as usize) {
            if c != b'#' {
                out.push(c as char);
            }
        }
        i += 1;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_baddy_defaults_by_kind() {
        let baddy = Baddy::new(10.0, 12.0, 2);
        assert_eq!(baddy.image, "baddyred.png");
        assert_eq!(baddy.power, 4);

        let unknown = Baddy::new(0.0, 0.0, 42);
        assert_eq!(unknown.kind, 0);
    }

    #[test]
    fn test_baddy_reset() {
        let mut baddy = Baddy::new(5.0, 6.0, 1);
        baddy.x = 30.0;
        baddy.mode = BaddyMode::Dead;
        baddy.power = 0;
        baddy.reset();
        assert_eq!((baddy.x, baddy.y), (5.0, 6.0));
        assert_eq!(baddy.mode, BaddyMode::Walk);
        assert_eq!(baddy.power, 3);
    }

    #[test]
    fn test_link_parse() {
        let link = Link::parse("my house.nw 0 10 1 5 62 playery").unwrap();
        assert_eq!(link.new_level, "my house.nw");
        assert_eq!((link.x, link.y, link.width, link.height), (0, 10, 1, 5));
        assert_eq!(link.new_y, "playery");
        assert_eq!(link.link_str(), "my house.nw 0 10 1 5 62 playery");
        assert!(link.contains(0, 14));
        assert!(!link.contains(0, 15));

        assert!(Link::parse("broken.nw 1 2").is_none());
    }

    #[test]
    fn test_link_contains_near_integer_limits() {
        let link = Link::parse(&format!("edge.nw {} {} 10 10 0 0", i32::MAX - 1, i32::MAX - 1)).unwrap();
        assert!(link.contains(i32::MAX - 1, i32::MAX - 1));
        assert!(!link.contains(i32::MAX, i32::MAX));
        assert!(!link.contains(i32::MIN, 0));
    }

    #[test]
    fn test_sign_text_roundtrip() {
        let text = "Hello, world!\nPress #A to talk.";
        assert_eq!(decode_sign_text(&encode_sign_text(text)), text);
    }

    #[test]
    fn test_sign_unknown_characters_dropped() {
        assert_eq!(decode_sign_text(&encode_sign_text("a{b}")), "ab");
    }
}
