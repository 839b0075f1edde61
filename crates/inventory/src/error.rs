//! Error types for inventory parsing and lookup.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while reading or querying an inventory.
#[derive(Debug, Error)]
pub enum Error {
    /// Inventory file could not be read
    #[error("failed to read inventory {path}: {source}")]
    Io {
        /// Path of the inventory file
        path: PathBuf,
        /// Underlying IO error
        #[source]
        source: std::io::Error,
    },

    /// A host line appeared before any `[section]` header
    #[error("line {line}: need a host set entry first")]
    MissingHostSet {
        /// Line number of the host line (1-indexed)
        line: usize,
    },

    /// A line that is neither a comment, a header, nor a host entry
    #[error("line {line}: cannot parse {content:?}")]
    Parse {
        /// Line number where the parse error occurred (1-indexed)
        line: usize,
        /// The offending line
        content: String,
    },

    /// No host set with the requested name
    #[error("unknown host set: {0}")]
    UnknownHostSet(String),
}

impl Error {
    /// Whether this error came from malformed inventory content.
    pub fn is_parse_error(&self) -> bool {
        matches!(self, Self::MissingHostSet { .. } | Self::Parse { .. })
    }
}

/// Result type for inventory operations.
pub type Result<T> = std::result::Result<T, Error>;
