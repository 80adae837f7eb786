//! Error types for the work list core.
//!
//! Absence (no file yet, no state for an item, no current item) is never an
//! error. What remains is I/O, malformed definitions, missing source tables
//! and a handful of usage errors.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("cannot read work list definition {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot write work list definition {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed work list definition {}: {message}", path.display())]
    Malformed { path: PathBuf, message: String },

    #[error("cannot serialize work list definition {}: {message}", path.display())]
    Serialize { path: PathBuf, message: String },

    #[error("source table not available: {0}")]
    MissingTable(String),

    #[error("work list already registered: {0}")]
    DuplicateWorkList(String),

    #[error("unknown work list type: {0}")]
    UnknownKind(String),

    #[error("{0} is not a valid layer URI")]
    InvalidUri(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, Error>;
