//! Weapon-add packets
//!
//! Clients that cannot run bytecode, or that are forced onto the
//! compatibility path, receive the inline script. Everyone else gets the
//! weapon preamble, the bytecode header with a freshness stamp, and the raw
//! bytecode.

use super::{Weapon, WeaponKind};
use crate::error::WeaponResult;
use bytes::BufMut;
use shared::{
    detokenize, finish, tokenize, write_gblob, write_gchar, write_gint, write_gint5, write_gshort,
    write_gstring, ClientVersion, GReader, NpcProp, PlayerOutPacket,
};

/// Identification block at the start of compiled bytecode
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BytecodeHeader {
    /// Tag byte in front of the header
    pub tag: u8,
    pub kind: String,
    pub name: String,
    pub unknown: String,
    pub hash: String,
    /// Header exactly as stored, still tokenized
    pub raw: Vec<u8>,
}

impl BytecodeHeader {
    pub fn decode(bytecode: &[u8]) -> WeaponResult<Self> {
        let mut reader = GReader::new(bytecode);
        let tag = reader.read_gchar()?;
        let raw = reader.read_gblob()?.to_vec();

        let fields = detokenize(&raw);
        let mut lines = fields
            .split(|&b| b == b'\n')
            .map(|line| String::from_utf8_lossy(line).into_owned());
        let mut next = || lines.next().unwrap_or_default();

        Ok(Self {
            tag,
            kind: next(),
            name: next(),
            unknown: next(),
            hash: next(),
            raw,
        })
    }
}

impl Weapon {
    /// Packet for a client of the given version.
    pub fn packet_for(&self, version: ClientVersion, now: u64) -> WeaponResult<Vec<u8>> {
        self.weapon_packet(!version.supports_bytecode(), now)
    }

    /// `now` stamps the bytecode header so clients can tell whether their cached copy is current.
    pub fn weapon_packet(&self, force_compat: bool, now: u64) -> WeaponResult<Vec<u8>> {
        if let WeaponKind::Default(item) = self.kind {
            let mut buf = PlayerOutPacket::DefaultWeapon.begin();
            write_gchar(&mut buf, item.id());
            return Ok(finish(buf));
        }

        if force_compat || !self.form.has_bytecode() {
            let mut buf = self.weapon_add_preamble()?;
            write_gchar(&mut buf, NpcProp::Script.as_u8());
            write_gblob(&mut buf, &self.formatted_client_script)?;
            return Ok(finish(buf));
        }

        let header = BytecodeHeader::decode(&self.bytecode)?;

        let mut buf = self.weapon_add_preamble()?;
        write_gchar(&mut buf, NpcProp::Class.as_u8());
        write_gshort(&mut buf, 0);
        let mut out = finish(buf);

        let mut stamp = bytes::BytesMut::new();
        write_gint5(&mut stamp, now);
        let mut buf = PlayerOutPacket::Unknown197.begin();
        buf.put_slice(&header.raw);
        buf.put_u8(b',');
        buf.put_slice(&tokenize(&stamp));
        out.extend(finish(buf));

        let mut buf = PlayerOutPacket::RawData.begin();
        write_gint(&mut buf, self.bytecode.len() as u32);
        out.extend(finish(buf));
        out.extend_from_slice(&self.bytecode);
        Ok(out)
    }

    fn weapon_add_preamble(&self) -> WeaponResult<bytes::BytesMut> {
        let mut buf = PlayerOutPacket::NpcWeaponAdd.begin();
        write_gstring(&mut buf, self.name.as_bytes())?;
        write_gchar(&mut buf, NpcProp::Image.as_u8());
        write_gstring(&mut buf, self.image.as_bytes())?;
        Ok(buf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::WeaponError;
    use crate::level::LevelItemType;
    use crate::script::{CompileError, NoCompiler, ScriptEngine};
    use crate::weapon::{ScriptForm, WeaponPaths};
    use std::sync::Arc;

    /// Produces bytecode with a proper header block
    struct HeaderCompiler;

    impl ScriptEngine for HeaderCompiler {
        fn compile(
            &self,
            _source: &str,
            kind: &str,
            name: &str,
            _is_weapon: bool,
        ) -> Result<Vec<u8>, Vec<CompileError>> {
            Ok(fake_bytecode_body(kind, name))
        }
    }

    fn fake_bytecode_body(kind: &str, name: &str) -> Vec<u8> {
        let header = tokenize(format!("{}\n{}\n1\nabc123", kind, name).as_bytes());
        let mut buf = bytes::BytesMut::new();
        write_gblob(&mut buf, &header).unwrap();
        buf.put_slice(b"\x01\x02\x03 body");
        buf.to_vec()
    }

    #[test]
    fn test_default_weapon_packet() {
        let weapon = Weapon::new_default(LevelItemType::Sword, Arc::new(NoCompiler));
        assert_eq!(
            weapon.weapon_packet(false, 0).unwrap(),
            vec![43 + 32, 10 + 32, b'\n']
        );
    }

    #[test]
    fn test_inline_script_packet() {
        let weapon = Weapon::new("Bomb", "bomb.png", "//#CLIENTSIDE\nsay 1;", 1, Arc::new(NoCompiler));
        let packet = weapon.weapon_packet(false, 0).unwrap();

        let mut reader = GReader::new(&packet);
        assert_eq!(reader.read_gchar().unwrap(), 33);
        assert_eq!(reader.read_gstring().unwrap(), b"Bomb");
        assert_eq!(reader.read_gchar().unwrap(), NpcProp::Image.as_u8());
        assert_eq!(reader.read_gstring().unwrap(), b"bomb.png");
        assert_eq!(reader.read_gchar().unwrap(), NpcProp::Script.as_u8());
        assert_eq!(reader.read_gblob().unwrap(), b"say 1;\xa7");
        assert_eq!(reader.rest(), b"\n");
    }

    #[test]
    fn test_bytecode_packet_sequence() {
        let weapon = Weapon::new("Fire", "fire.gif", "//#CLIENTSIDE\nx=1;", 1, Arc::new(HeaderCompiler));
        assert_eq!(weapon.script_form(), ScriptForm::Both);

        let packet = weapon.weapon_packet(false, 1_700_000_000).unwrap();
        let mut reader = GReader::new(&packet);

        assert_eq!(reader.read_gchar().unwrap(), 33);
        assert_eq!(reader.read_gstring().unwrap(), b"Fire");
        reader.read_gchar().unwrap();
        reader.read_gstring().unwrap();
        assert_eq!(reader.read_gchar().unwrap(), NpcProp::Class.as_u8());
        assert_eq!(reader.read_gshort().unwrap(), 0);
        assert_eq!(reader.read_u8().unwrap(), b'\n');

        assert_eq!(reader.read_gchar().unwrap(), 197);
        let stamp_line = reader.read_line();
        let header = BytecodeHeader::decode(weapon.bytecode()).unwrap();
        assert!(stamp_line.starts_with(&header.raw));
        assert_eq!(stamp_line[header.raw.len()], b',');

        assert_eq!(reader.read_gchar().unwrap(), 100);
        assert_eq!(reader.read_gint().unwrap() as usize, weapon.bytecode().len());
        assert_eq!(reader.read_u8().unwrap(), b'\n');
        assert_eq!(reader.rest(), weapon.bytecode());
    }

    #[test]
    fn test_header_decode() {
        let mut bytecode = vec![140 + 32];
        bytecode.extend(fake_bytecode_body("weapon", "Fire"));
        let header = BytecodeHeader::decode(&bytecode).unwrap();
        assert_eq!(header.tag, 140);
        assert_eq!(header.kind, "weapon");
        assert_eq!(header.name, "Fire");
        assert_eq!(header.unknown, "1");
        assert_eq!(header.hash, "abc123");
    }

    #[test]
    fn test_force_compat_and_version_select_inline() {
        let weapon = Weapon::new("Fire", "fire.gif", "//#CLIENTSIDE\nx=1;", 1, Arc::new(HeaderCompiler));
        let inline = weapon.weapon_packet(true, 5).unwrap();
        assert_eq!(weapon.packet_for(ClientVersion::V2_17, 5).unwrap(), inline);
        assert_ne!(weapon.packet_for(ClientVersion::V6_037, 5).unwrap(), inline);
    }

    #[test]
    fn test_truncated_bytecode_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let paths = WeaponPaths {
            definitions: dir.path().join("weapons"),
            bytecode: dir.path().join("weapon_bytecode"),
        };
        std::fs::create_dir_all(&paths.definitions).unwrap();
        std::fs::create_dir_all(&paths.bytecode).unwrap();
        std::fs::write(paths.bytecode.join("broken.gs2bc"), [172u8, 40]).unwrap();
        std::fs::write(
            paths.definitions.join("weaponBroken.txt"),
            "GRAWP001\nREALNAME Broken\nBYTECODE broken.gs2bc\n",
        )
        .unwrap();

        let weapon = Weapon::load("weaponBroken.txt", &paths, Arc::new(NoCompiler)).unwrap();
        assert_eq!(weapon.script_form(), ScriptForm::BytecodeOnly);
        assert!(matches!(
            weapon.weapon_packet(false, 0),
            Err(WeaponError::MalformedBytecode(_))
        ));
        assert!(weapon.weapon_packet(true, 0).is_ok());
    }

    #[test]
    fn test_packets_are_deterministic() {
        let weapon = Weapon::new("Fire", "fire.gif", "//#CLIENTSIDE\nx=1;", 1, Arc::new(HeaderCompiler));
        assert_eq!(
            weapon.weapon_packet(false, 42).unwrap(),
            weapon.weapon_packet(false, 42).unwrap()
        );
    }
}
