//! Error types for golden documents.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while loading, editing or persisting a golden document.
#[derive(Debug, Error)]
pub enum DocumentError {
    /// The golden file does not exist and missing files are not allowed.
    #[error("golden file not found: {}", path.display())]
    NotFound { path: PathBuf },

    /// The golden file exists but could not be read.
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The golden file is not well-formed YAML.
    #[error("failed to parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// The top level of the golden file is not a mapping.
    #[error("{} must contain a mapping at the top level", path.display())]
    NotAMapping { path: PathBuf },

    /// A top-level key is a sequence, mapping or other non-scalar node.
    #[error("{} has a non-scalar top-level key: {key}", path.display())]
    InvalidKey { path: PathBuf, key: String },

    /// The requested key is not present in the document.
    #[error("key {key:?} not found in {}", path.display())]
    KeyMissing { path: PathBuf, key: String },

    /// A tag given at registration is empty once its `!` is removed.
    #[error("invalid tag {tag:?}: tags must not be empty")]
    EmptyTag { tag: String },

    /// A registered constructor rejected a tagged node.
    #[error("constructor for tag !{tag} failed: {message}")]
    Construct { tag: String, message: String },

    /// A value could not be rendered back to YAML.
    #[error("failed to serialize {key:?}: {source}")]
    Serialize {
        key: String,
        #[source]
        source: serde_yaml::Error,
    },

    /// The atomic rewrite of the golden file failed.
    #[error("failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Result type for document operations.
pub type DocumentResult<T> = Result<T, DocumentError>;
