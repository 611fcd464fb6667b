use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Result alias used throughout the zjson crates.
pub type Result<T> = std::result::Result<T, Error>;

/// Everything that can go wrong while resolving, reading or writing a
/// compressed JSON-lines file.
#[derive(Debug, Error)]
pub enum Error {
    // ── configuration ──────────────────────────────────────────────────────
    #[error("extension {0:?} is already registered")]
    DuplicateExtension(String),

    #[error("no codec registered for extension {extension:?} ({path:?})")]
    UnknownExtension { extension: String, path: PathBuf },

    #[error("level {level} is out of range for codec {codec}")]
    InvalidLevel { codec: &'static str, level: i32 },

    #[error("codec {codec} failed to initialize: {source}")]
    Codec {
        codec: &'static str,
        #[source]
        source: io::Error,
    },

    // ── directory scan ─────────────────────────────────────────────────────
    #[error("resume file {name:?} not found in {directory:?}")]
    FileNotFound { directory: PathBuf, name: String },

    // ── per-record ─────────────────────────────────────────────────────────
    #[error("{path:?} line {line}: {kind} (raw prefix {prefix:?})")]
    Record {
        path: PathBuf,
        line: u64,
        kind: RecordErrorKind,
        prefix: String,
    },

    #[error("{path:?}: decompression failed after line {line}: {source}")]
    Decompress {
        path: PathBuf,
        line: u64,
        #[source]
        source: io::Error,
    },

    // ── resources ──────────────────────────────────────────────────────────
    #[error("I/O error on {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to serialize record for {path:?}: {source}")]
    Serialize {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Why a single decompressed line could not become a record.
#[derive(Debug, Error)]
pub enum RecordErrorKind {
    #[error("invalid UTF-8: {0}")]
    Utf8(#[from] std::str::Utf8Error),

    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }

    /// The underlying `io::ErrorKind`, for errors that wrap one.
    pub fn io_kind(&self) -> Option<io::ErrorKind> {
        match self {
            Error::Io { source, .. } | Error::Decompress { source, .. } => Some(source.kind()),
            _ => None,
        }
    }

    /// The 1-based line number an error refers to, if any.
    pub fn line(&self) -> Option<u64> {
        match self {
            Error::Record { line, .. } | Error::Decompress { line, .. } => Some(*line),
            _ => None,
        }
    }
}
