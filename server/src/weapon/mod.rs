//! # Weapons
//!
//! A weapon is either one of the built-in default items, known only by its
//! item id, or a custom scripted weapon with an image, authored source and
//! optionally compiled bytecode.
//!
//! Custom weapons are stored as `weapon<name>.txt` in the weapons directory:
//!
//! ```text
//! GRAWP001
//! REALNAME -Bow
//! IMAGE wbow1.gif
//! BYTECODE weapon-Bow.gs2bc
//! SCRIPT
//! ...
//! SCRIPTEND
//! ```
//!
//! The `BYTECODE` line names a sidecar file in the bytecode directory.

pub mod packets;

pub use packets::BytecodeHeader;

use crate::error::{WeaponError, WeaponResult};
use crate::level::{LevelItemType, PlayerId};
use crate::script::{format_client_script, ActionQueue, ScriptAction, ScriptEngine, SourceCode};
use crate::utils::{file_mod_time, sanitize_file_name, unix_time};
use log::{debug, info, warn};
use shared::PlayerOutPacket;
use std::fmt;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

const HEADER: &str = "GRAWP001";
const BYTECODE_EXTENSION: &str = "gs2bc";

/// Where weapon definitions and their compiled sidecars live
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeaponPaths {
    pub definitions: PathBuf,
    pub bytecode: PathBuf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WeaponKind {
    Default(LevelItemType),
    Custom,
}

/// Which script representations a custom weapon currently holds.
/// Bytecode wins whenever it is present.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptForm {
    SourceOnly,
    BytecodeOnly,
    Both,
}

impl ScriptForm {
    fn of(source: &SourceCode, bytecode: &[u8]) -> Self {
        match (source.is_empty(), bytecode.is_empty()) {
            (_, true) => ScriptForm::SourceOnly,
            (true, false) => ScriptForm::BytecodeOnly,
            (false, false) => ScriptForm::Both,
        }
    }

    pub fn has_bytecode(self) -> bool {
        self != ScriptForm::SourceOnly
    }
}

pub struct Weapon {
    kind: WeaponKind,
    name: String,
    image: String,
    source: SourceCode,
    formatted_client_script: Vec<u8>,
    bytecode: Vec<u8>,
    form: ScriptForm,
    mod_time: u64,
    actions: ActionQueue,
    engine: Arc<dyn ScriptEngine>,
}

impl fmt::Debug for Weapon {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Weapon")
            .field("kind", &self.kind)
            .field("name", &self.name)
            .field("image", &self.image)
            .field("form", &self.form)
            .field("bytecode_len", &self.bytecode.len())
            .field("mod_time", &self.mod_time)
            .finish_non_exhaustive()
    }
}

impl Weapon {
    fn blank(kind: WeaponKind, name: String, engine: Arc<dyn ScriptEngine>) -> Self {
        Self {
            kind,
            name,
            image: String::new(),
            source: SourceCode::default(),
            formatted_client_script: Vec::new(),
            bytecode: Vec::new(),
            form: ScriptForm::SourceOnly,
            mod_time: 0,
            actions: ActionQueue::default(),
            engine,
        }
    }

    /// Built-in weapon named after its item
    pub fn new_default(item: LevelItemType, engine: Arc<dyn ScriptEngine>) -> Self {
        Self::blank(WeaponKind::Default(item), item.name().to_string(), engine)
    }

    /// Custom weapon built from source. A `mod_time` of 0 means now.
    pub fn new(
        name: &str,
        image: &str,
        source: &str,
        mod_time: u64,
        engine: Arc<dyn ScriptEngine>,
    ) -> Self {
        let mut weapon = Self::blank(WeaponKind::Custom, name.to_string(), engine);
        weapon.apply_update(image, source, mod_time);
        weapon
    }

    /// Loads `file_name` from the definitions directory.
    pub fn load(
        file_name: &str,
        paths: &WeaponPaths,
        engine: Arc<dyn ScriptEngine>,
    ) -> WeaponResult<Self> {
        let path = paths.definitions.join(file_name);
        let raw = std::fs::read(&path).map_err(|source| WeaponError::Io {
            path: path.clone(),
            source,
        })?;
        let text = String::from_utf8_lossy(&raw).replace('\r', "");
        let mut lines = text.lines();

        if lines.next() != Some(HEADER) {
            return Err(WeaponError::InvalidHeader { path });
        }

        let mut name = String::new();
        let mut image = String::new();
        let mut script = String::new();
        let mut sidecar = Vec::new();

        while let Some(line) = lines.next() {
            let (command, value) = line.split_once(' ').unwrap_or((line, ""));
            match command {
                "REALNAME" => name = value.to_string(),
                "IMAGE" => image = value.to_string(),
                "BYTECODE" => {
                    let sidecar_path = paths.bytecode.join(value.trim());
                    match std::fs::read(&sidecar_path) {
                        Ok(data) => sidecar = data,
                        Err(e) => debug!("No bytecode at {}: {}", sidecar_path.display(), e),
                    }
                }
                "SCRIPT" => {
                    let mut terminated = false;
                    for script_line in lines.by_ref() {
                        if script_line == "SCRIPTEND" {
                            terminated = true;
                            break;
                        }
                        script.push_str(script_line);
                        script.push('\n');
                    }
                    if !terminated {
                        warn!(
                            "Weapon file {} is malformed: SCRIPTEND needs to be on its own line",
                            path.display()
                        );
                    }
                }
                _ => {}
            }
        }

        if name.is_empty() {
            return Err(WeaponError::MissingName { path });
        }

        if !script.is_empty() && !sidecar.is_empty() {
            warn!("Weapon {} includes both script and bytecode. Using bytecode.", name);
        }

        let mut weapon = Weapon::new(&name, &image, &script, file_mod_time(&path), engine);
        if weapon.bytecode.is_empty() && !sidecar.is_empty() {
            weapon.bytecode = sidecar;
            weapon.form = ScriptForm::of(&weapon.source, &weapon.bytecode);
        }
        debug!("Loaded weapon {} ({:?})", weapon.name, weapon.form);
        Ok(weapon)
    }

    /// Writes the definition and, when present, the bytecode sidecar.
    /// Returns the path of the definition file.
    pub fn save(&self, paths: &WeaponPaths) -> WeaponResult<PathBuf> {
        if self.is_default() || self.name.is_empty() {
            return Err(WeaponError::NotPersistable);
        }

        let base = format!("weapon{}", sanitize_file_name(&self.name));
        let bytecode_file = format!("{}.{}", base, BYTECODE_EXTENSION);

        let mut output = format!("{}\r\nREALNAME {}\r\nIMAGE {}\r\n", HEADER, self.name, self.image);
        if !self.bytecode.is_empty() {
            output.push_str(&format!("BYTECODE {}\r\n", bytecode_file));
        }
        if !self.source.is_empty() {
            output.push_str("SCRIPT\r\n");
            output.push_str(&self.source.source().replace('\n', "\r\n"));
            if !self.source.source().ends_with('\n') {
                output.push_str("\r\n");
            }
            output.push_str("SCRIPTEND\r\n");
        }

        if !self.bytecode.is_empty() {
            write_atomic(&paths.bytecode.join(&bytecode_file), &self.bytecode)?;
        }
        let path = paths.definitions.join(format!("{}.txt", base));
        write_atomic(&path, output.as_bytes())?;
        info!("Saved weapon {} to {}", self.name, path.display());
        Ok(path)
    }

    /// Replaces image and source, recompiles and optionally saves.
    /// Default weapons have no script and are refused.
    pub fn update(
        &mut self,
        image: &str,
        source: &str,
        mod_time: u64,
        save_to: Option<&WeaponPaths>,
    ) -> WeaponResult<()> {
        if self.is_default() {
            return Err(WeaponError::DefaultWeapon {
                name: self.name.clone(),
            });
        }
        self.apply_update(image, source, mod_time);
        if let Some(paths) = save_to {
            self.save(paths)?;
        }
        Ok(())
    }

    fn apply_update(&mut self, image: &str, source: &str, mod_time: u64) {
        self.free_script_resources();

        self.source = SourceCode::new(source.to_string());
        self.image = image.to_string();
        self.mod_time = if mod_time == 0 { unix_time() } else { mod_time };
        self.set_client_script(&self.source.client_side().to_string());

        if !self.source.server_side().trim().is_empty() {
            self.actions.push(ScriptAction {
                event: "weapon.created".to_string(),
                player: None,
                args: String::new(),
            });
            self.engine.register_update(&self.name);
        }

        let client = self.source.client_side();
        if !client.trim().is_empty() {
            match self.engine.compile(client, "weapon", &self.name, true) {
                Ok(code) => {
                    let mut bytecode = Vec::with_capacity(code.len() + 1);
                    bytecode.push(PlayerOutPacket::NpcWeaponScript.as_u8().wrapping_add(32));
                    bytecode.extend_from_slice(&code);
                    self.bytecode = bytecode;
                }
                Err(errors) => {
                    for error in &errors {
                        warn!("Weapon {} failed to compile: {}", self.name, error);
                    }
                }
            }
        }

        self.form = ScriptForm::of(&self.source, &self.bytecode);
    }

    /// Precomputes the inline script embedded in legacy packets. Ignored for default weapons.
    pub fn set_client_script(&mut self, raw: &str) {
        if self.is_default() {
            return;
        }
        self.formatted_client_script = format_client_script(raw);
    }

    /// Queues a server-side trigger from a player and asks the engine to run it.
    pub fn queue_action(&mut self, player: PlayerId, args: &str) {
        self.actions.push(ScriptAction {
            event: "weapon.serverside".to_string(),
            player: Some(player),
            args: args.to_string(),
        });
        self.engine.register_update(&self.name);
    }

    /// Releases everything the engine holds for this weapon and drops queued actions.
    pub fn free_script_resources(&mut self) {
        self.engine.release(&self.name, self.source.server_side());
        if !self.actions.is_empty() {
            self.engine.unregister_update(&self.name);
            let dropped = self.actions.drain();
            debug!("Dropped {} queued actions of {}", dropped.len(), self.name);
        }
    }

    pub fn kind(&self) -> WeaponKind {
        self.kind
    }

    pub fn is_default(&self) -> bool {
        matches!(self.kind, WeaponKind::Default(_))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn image(&self) -> &str {
        &self.image
    }

    pub fn source(&self) -> &SourceCode {
        &self.source
    }

    pub fn formatted_client_script(&self) -> &[u8] {
        &self.formatted_client_script
    }

    pub fn bytecode(&self) -> &[u8] {
        &self.bytecode
    }

    pub fn script_form(&self) -> ScriptForm {
        self.form
    }

    pub fn mod_time(&self) -> u64 {
        self.mod_time
    }

    pub fn pending_actions(&self) -> usize {
        self.actions.len()
    }

    /// Next queued action for the engine
    pub fn next_action(&mut self) -> Option<ScriptAction> {
        self.actions.pop()
    }
}

impl Drop for Weapon {
    fn drop(&mut self) {
        self.free_script_resources();
    }
}

/// Writes through a temporary file in the target directory so a failed
/// write never leaves a truncated file behind.
fn write_atomic(path: &Path, data: &[u8]) -> WeaponResult<()> {
    let io_error = |source| WeaponError::Io {
        path: path.to_path_buf(),
        source,
    };
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(dir).map_err(io_error)?;

    let mut file = tempfile::NamedTempFile::new_in(dir).map_err(io_error)?;
    file.write_all(data).map_err(io_error)?;
    file.persist(path).map_err(|e| io_error(e.error))?;
    Ok(())
}
