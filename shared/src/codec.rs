//! Graal integer and string encodings
//!
//! Every field on the wire is offset by 32 so that packets never contain
//! control bytes (the newline terminates a packet). Multi-byte integers carry
//! seven bits per byte, most significant group first.

use bytes::{BufMut, BytesMut};
use thiserror::Error;

/// Largest value a GChar length prefix can carry
pub const GCHAR_MAX: usize = 223;
/// Largest value a GShort can carry
pub const GSHORT_MAX: usize = 28767;
/// Largest value a GInt can carry
pub const GINT_MAX: u32 = 3_682_399;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    #[error("length {len} does not fit a prefix with maximum {max}")]
    LengthOverflow { len: usize, max: usize },

    #[error("truncated input: needed {needed} more bytes at offset {offset}")]
    Truncated { offset: usize, needed: usize },
}

pub type CodecResult<T> = Result<T, CodecError>;

/// Writes a single byte with the +32 offset. Values wrap like the client expects.
pub fn write_gchar(buf: &mut BytesMut, value: u8) {
    buf.put_u8(value.wrapping_add(32));
}

pub fn write_gshort(buf: &mut BytesMut, value: u16) {
    let value = (value as usize).min(GSHORT_MAX);
    let high = ((value >> 7) as u8).min(GCHAR_MAX as u8);
    buf.put_u8(high + 32);
    buf.put_u8((value & 0x7f) as u8 + 32);
}

pub fn write_gint(buf: &mut BytesMut, value: u32) {
    let value = value.min(GINT_MAX);
    let high = ((value >> 14) as u8).min(GCHAR_MAX as u8);
    buf.put_u8(high + 32);
    buf.put_u8(((value >> 7) & 0x7f) as u8 + 32);
    buf.put_u8((value & 0x7f) as u8 + 32);
}

/// Five byte encoding used for timestamps.
pub fn write_gint5(buf: &mut BytesMut, value: u64) {
    let value = value.min(u32::MAX as u64);
    buf.put_u8(((value >> 28) & 0x7f) as u8 + 32);
    buf.put_u8(((value >> 21) & 0x7f) as u8 + 32);
    buf.put_u8(((value >> 14) & 0x7f) as u8 + 32);
    buf.put_u8(((value >> 7) & 0x7f) as u8 + 32);
    buf.put_u8((value & 0x7f) as u8 + 32);
}

/// Writes a string prefixed by its GChar length.
pub fn write_gstring(buf: &mut BytesMut, value: &[u8]) -> CodecResult<()> {
    if value.len() > GCHAR_MAX {
        return Err(CodecError::LengthOverflow {
            len: value.len(),
            max: GCHAR_MAX,
        });
    }
    write_gchar(buf, value.len() as u8);
    buf.put_slice(value);
    Ok(())
}

/// Writes a blob prefixed by its GShort length.
pub fn write_gblob(buf: &mut BytesMut, value: &[u8]) -> CodecResult<()> {
    if value.len() > GSHORT_MAX {
        return Err(CodecError::LengthOverflow {
            len: value.len(),
            max: GSHORT_MAX,
        });
    }
    write_gshort(buf, value.len() as u16);
    buf.put_slice(value);
    Ok(())
}

/// Cursor over an encoded buffer
#[derive(Debug, Clone)]
pub struct GReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> GReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    pub fn read_bytes(&mut self, len: usize) -> CodecResult<&'a [u8]> {
        if self.remaining() < len {
            return Err(CodecError::Truncated {
                offset: self.pos,
                needed: len - self.remaining(),
            });
        }
        let slice = &self.data[self.pos..self.pos + len];
        self.pos += len;
        Ok(slice)
    }

    pub fn read_u8(&mut self) -> CodecResult<u8> {
        Ok(self.read_bytes(1)?[0])
    }

    pub fn read_gchar(&mut self) -> CodecResult<u8> {
        Ok(self.read_u8()?.wrapping_sub(32))
    }

    pub fn read_gshort(&mut self) -> CodecResult<u16> {
        let b = self.read_bytes(2)?;
        Ok(((b[0].wrapping_sub(32) as u16) << 7) + b[1].wrapping_sub(32) as u16)
    }

    pub fn read_gint(&mut self) -> CodecResult<u32> {
        let b = self.read_bytes(3)?;
        Ok(((b[0].wrapping_sub(32) as u32) << 14)
            + ((b[1].wrapping_sub(32) as u32) << 7)
            + b[2].wrapping_sub(32) as u32)
    }

    pub fn read_gint5(&mut self) -> CodecResult<u64> {
        let b = self.read_bytes(5)?;
        Ok(b.iter()
            .fold(0u64, |acc, byte| (acc << 7) + byte.wrapping_sub(32) as u64))
    }

    pub fn read_gstring(&mut self) -> CodecResult<&'a [u8]> {
        let len = self.read_gchar()? as usize;
        self.read_bytes(len)
    }

    pub fn read_gblob(&mut self) -> CodecResult<&'a [u8]> {
        let len = self.read_gshort()? as usize;
        self.read_bytes(len)
    }

    /// Reads up to (not including) the next newline and consumes the newline.
    pub fn read_line(&mut self) -> &'a [u8] {
        let rest = &self.data[self.pos..];
        match rest.iter().position(|&b| b == b'\n') {
            Some(end) => {
                self.pos += end + 1;
                &rest[..end]
            }
            None => {
                self.pos = self.data.len();
                rest
            }
        }
    }

    pub fn rest(&mut self) -> &'a [u8] {
        let rest = &self.data[self.pos..];
        self.pos = self.data.len();
        rest
    }
}
