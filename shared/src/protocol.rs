//! Outbound opcode and property id tables
//!
//! Numeric values follow the Graal client protocol and must not change.

use bytes::{BufMut, BytesMut};

use crate::codec::write_gchar;

/// Server to client packet ids (PLO_*)
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PlayerOutPacket {
    LevelBoard = 0,
    LevelLink = 1,
    BaddyProps = 2,
    NpcProps = 3,
    LevelChest = 4,
    LevelSign = 5,
    BoardModify = 7,
    HorseAdd = 17,
    ItemAdd = 22,
    NpcWeaponAdd = 33,
    DefaultWeapon = 43,
    RawData = 100,
    BoardPacket = 101,
    BoardLayer = 107,
    NpcWeaponScript = 140,
    Unknown197 = 197,
}

impl PlayerOutPacket {
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    /// Starts a packet buffer with this opcode.
    pub fn begin(self) -> BytesMut {
        let mut buf = BytesMut::new();
        write_gchar(&mut buf, self.as_u8());
        buf
    }
}

/// Terminates a packet.
pub fn finish(mut buf: BytesMut) -> Vec<u8> {
    buf.put_u8(b'\n');
    buf.to_vec()
}

/// NPC property ids (NPCPROP_*)
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NpcProp {
    Image = 0,
    Script = 1,
    X = 2,
    Y = 3,
    Gani = 12,
    VisFlags = 13,
    Message = 15,
    Id = 17,
    Nickname = 20,
    Class = 74,
    X2 = 75,
    Y2 = 76,
}

impl NpcProp {
    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

/// Baddy property ids (BDPROP_*)
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BaddyProp {
    Id = 0,
    X = 1,
    Y = 2,
    Type = 3,
    PowerImage = 4,
    Mode = 5,
    Ani = 6,
    Dir = 7,
    VerseSight = 8,
    VerseHurt = 9,
    VerseAttack = 10,
}

impl BaddyProp {
    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

/// Separator the client uses in place of newlines inside inline scripts
pub const SCRIPT_LINE_SEPARATOR: u8 = 0xa7;
