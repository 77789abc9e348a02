//! Error types for the fallible surface operations in §6/§7 of the design.
//!
//! Errors that occur *inside* a processing pass (malformed UTF-8, unknown
//! CSI sequences, parameter overflow) are never represented here — per the
//! propagation policy they are swallowed locally and the pass completes as
//! far as possible. This enum only covers operations a caller invokes
//! directly and that can fail in a way the caller needs to react to.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("unknown encoding {0:?}")]
    UnknownEncoding(String),

    #[error("unknown terminal emulation {0:?}")]
    UnknownEmulation(String),

    #[error("invalid match regex: {0}")]
    Regex(#[from] regex::Error),

    #[error("invalid word-character spec {spec:?}: {reason}")]
    WordCharSpec { spec: String, reason: &'static str },

    #[error("failed to parse configuration: {0}")]
    Config(#[from] toml::de::Error),

    #[error("failed to read configuration file: {0}")]
    ConfigIo(#[from] std::io::Error),

    #[error("resize rejected: {0}")]
    Resize(&'static str),
}

pub type Result<T> = std::result::Result<T, Error>;
