//! Error types for level and weapon handling

use shared::CodecError;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LevelError {
    #[error("level file {path} could not be read: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("level {name} has an unrecognized signature")]
    UnknownFormat { name: String },

    #[error("level {name} is malformed: {reason}")]
    Malformed { name: String, reason: String },

    #[error("level {name} has no backing file")]
    NotOnDisk { name: String },

    #[error("encoding failed: {0}")]
    Codec(#[from] CodecError),

    #[error("level load task failed: {0}")]
    LoadTask(#[from] tokio::task::JoinError),
}

#[derive(Error, Debug)]
pub enum WeaponError {
    #[error("weapon file {path} could not be accessed: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("weapon file {path} has an invalid header")]
    InvalidHeader { path: PathBuf },

    #[error("weapon file {path} does not name a weapon")]
    MissingName { path: PathBuf },

    #[error("default and unnamed weapons are not persisted")]
    NotPersistable,

    #[error("default weapon {name} has no script to update")]
    DefaultWeapon { name: String },

    #[error("bytecode is malformed: {0}")]
    MalformedBytecode(#[from] CodecError),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("config file {path} could not be read: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("config file {path} is invalid: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

pub type LevelResult<T> = Result<T, LevelError>;
pub type WeaponResult<T> = Result<T, WeaponError>;
