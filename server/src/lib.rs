//! # Level Server Library
//!
//! Authoritative level and weapon state for a Graal-style multiplayer world,
//! and the encoders that render that state into client packets.
//!
//! ## Core Responsibilities
//!
//! ### Level State
//! Each level owns a layered 64x64 tile board and the entities placed on it.
//! Mutations are validated before they touch anything, so a rejected board
//! patch or duplicate item leaves the level exactly as it was. Board patches
//! are logged with their time and actor so reconnecting clients can catch up.
//!
//! ### Packet Encoding
//! Encoders are pure functions of level or weapon state plus the client
//! version. Older clients get older layouts; nothing in the state depends on
//! who is asking.
//!
//! ### Weapons
//! Custom weapons keep their authored source, the inline script form older
//! clients run, and compiled bytecode for newer clients. Compilation goes
//! through the [`script::ScriptEngine`] trait and never blocks a weapon from
//! being used.
//!
//! ## Module Organization
//!
//! ### Level Module (`level`)
//! - Board, layers and the change log
//! - Baddies, chests, horses, items, links and signs
//! - Player slots and NPC registrations
//! - File loading for the NW, Graal and Zelda formats
//! - Packet encoders and the shared level registry
//!
//! ### NPC Module (`npc`)
//! Server-wide NPC storage. Levels refer to NPCs by id and query them through
//! [`npc::NpcLookup`].
//!
//! ### Weapon Module (`weapon`)
//! Weapon definitions, their file format and the weapon-add packets.
//!
//! ### Script Module (`script`)
//! Source splitting, comment stripping and the contract of the external
//! script engine.
//!
//! ## Concurrency
//! Levels are shared as `Arc<tokio::sync::RwLock<Level>>`. Mutators take the
//! write guard; encoders only need a read guard, so several clients can be
//! served from one level at once.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use server::level::LevelRegistry;
//! use shared::ClientVersion;
//! use std::path::Path;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let registry = LevelRegistry::new(Path::new("servers/default/world"));
//!     let level = registry.find_level("onlinestartlocal.nw").await?;
//!
//!     let level = level.read().await;
//!     let board = level.board_packets();
//!     let baddies = level.baddy_packets(ClientVersion::V2_17)?;
//!     println!("{} board packets, {} baddies", board.len(), baddies.len());
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod level;
pub mod npc;
pub mod script;
pub mod utils;
pub mod weapon;
