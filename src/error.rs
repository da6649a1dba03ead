use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Which partition a record lives in, for error reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    Task,
    Tag,
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Task => f.write_str("task"),
            Self::Tag => f.write_str("tag"),
        }
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to open store at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("store at {} is locked by another process", path.display())]
    Locked { path: PathBuf },

    #[error("{} is not a tsk store", path.display())]
    NotAStore { path: PathBuf },

    #[error("store at {} has schema version {found}; this build supports {supported}", path.display())]
    UnsupportedVersion {
        path: PathBuf,
        found: i64,
        supported: i64,
    },

    #[error("failed to decode {kind} {key}: {source}")]
    Decode {
        kind: RecordKind,
        key: u64,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to encode {kind} {key}: {source}")]
    Encode {
        kind: RecordKind,
        key: u64,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid {kind} key: expected 8 bytes, found {len}")]
    InvalidKey { kind: RecordKind, len: usize },

    #[error(transparent)]
    Engine(#[from] rusqlite::Error),

    #[error("{kind} {key} not found")]
    NotFound { kind: RecordKind, key: u64 },

    #[error("{0} text must not be empty")]
    EmptyText(RecordKind),
}

impl StoreError {
    /// True for failures that mean a stored value could not be read back.
    pub fn is_encoding(&self) -> bool {
        matches!(
            self,
            Self::Decode { .. } | Self::Encode { .. } | Self::InvalidKey { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, StoreError>;
