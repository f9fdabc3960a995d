//! Error types for the hopping core

use thiserror::Error;

/// Result alias used across the core
pub type Result<T> = std::result::Result<T, Error>;

/// Failure classes.
///
/// `Configuration` errors are programming or setup bugs and abort the run.
/// `DegenerateState` covers inputs that leave nothing to hop on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Configuration,
    DegenerateState,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error("Usable channel count mismatch: declared {declared}, map has {actual}")]
    UsableCountMismatch { declared: usize, actual: usize },

    #[error("Channel out of range: {0}")]
    ChannelOutOfRange(i64),

    #[error("Invalid hopping mode: {0}")]
    InvalidHoppingMode(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Channel map has no usable channels")]
    NoUsableChannels,

    #[error("Failed to read configuration: {0}")]
    ConfigIo(String),
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::NoUsableChannels => ErrorKind::DegenerateState,
            _ => ErrorKind::Configuration,
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::InvalidConfig(e.to_string())
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::ConfigIo(e.to_string())
    }
}
