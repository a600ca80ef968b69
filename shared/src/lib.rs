//! # Shared Protocol Primitives
//!
//! Wire-level building blocks used by the server when rendering level and
//! weapon state for connected clients:
//!
//! - [`codec`]: offset-32 integer encodings and length-prefixed strings/blobs
//! - [`tokenize`]: the reversible comma/quote transform used for header fields
//! - [`protocol`]: outbound opcode and property id tables
//! - [`version`]: client protocol generations and the capabilities they imply

pub mod codec;
pub mod protocol;
pub mod tokenize;
pub mod version;

pub use codec::{
    write_gblob, write_gchar, write_gint, write_gint5, write_gshort, write_gstring, CodecError,
    CodecResult, GReader, GCHAR_MAX, GSHORT_MAX,
};
pub use protocol::{finish, BaddyProp, NpcProp, PlayerOutPacket, SCRIPT_LINE_SEPARATOR};
pub use tokenize::{detokenize, tokenize};
pub use version::{BaddyLayout, BoardChangeFraming, ClientVersion};

/// Board dimensions in tiles
pub const BOARD_WIDTH: usize = 64;
pub const BOARD_HEIGHT: usize = 64;
pub const BOARD_TILES: usize = BOARD_WIDTH * BOARD_HEIGHT;
/// Number of addressable tile layers
pub const MAX_LAYERS: usize = 256;
