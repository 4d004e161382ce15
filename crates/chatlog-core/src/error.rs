use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// The kind of entity a relationship lookup or registration refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Server,
    Channel,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityKind::Server => f.write_str("server"),
            EntityKind::Channel => f.write_str("channel"),
        }
    }
}

/// All errors produced while loading or querying a chat archive.
#[derive(Error, Debug)]
pub enum ArchiveError {
    /// A file could not be opened or read from disk.
    #[error("Failed to read file {path}: {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A JSON document could not be parsed.
    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    /// The archive container itself (zip or directory) is unusable.
    #[error("Archive error: {0}")]
    Archive(String),

    /// A file or record does not match the export format.
    #[error("Malformed input: {0}")]
    MalformedInput(String),

    /// A relationship points at an id that was never registered.
    #[error("{entity} {id} not found")]
    NotFound { entity: EntityKind, id: u64 },

    /// An id was registered twice.
    #[error("{entity} {id} is already registered")]
    KeyConflict { entity: EntityKind, id: u64 },

    /// An operation was requested on a record that cannot support it.
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// A configuration value is missing or invalid.
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Convenience alias used throughout the chatlog crates.
pub type Result<T> = std::result::Result<T, ArchiveError>;
