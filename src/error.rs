use std::io;
use thiserror::Error;

/// fatal start-up failures; nothing here is recoverable
#[derive(Error, Debug)]
pub enum HarnessError {
    #[error("no drawing surface available: {0}")]
    Surface(#[source] io::Error),

    #[error("no audio backend available: {0}")]
    Audio(#[from] AudioError),

    #[error("terminal I/O failed: {0}")]
    Io(#[from] io::Error),
}

/// why a ROM image never turned into a running core
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LoadError {
    #[error("failed to fetch {path}: {message}")]
    Fetch { path: String, message: String },

    #[error("{path} is empty")]
    Empty { path: String },

    #[error("image rejected: {0}")]
    Rejected(String),

    #[error("load abandoned before completion")]
    Abandoned,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AudioError {
    #[error("audio backend unavailable: {0}")]
    Unavailable(String),

    #[error("audio backend failed: {0}")]
    Backend(String),
}

/// a hex key outside 0x0-0xf
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("invalid key 0x{0:02x}: keypad keys are 0x0-0xf")]
pub struct InvalidKey(pub u8);

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyWaitError {
    #[error("key wait was replaced by a newer request")]
    Superseded,
}
