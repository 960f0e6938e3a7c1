//! Error types for golden fixtures.
//!
//! Document-level failures (missing file, missing key, parse errors) come
//! from [`DocumentError`] and are wrapped transparently.

use golden_fixtures_document::DocumentError;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while collecting, running or flushing golden tests.
#[derive(Debug, Error)]
pub enum GoldenError {
    /// Loading or editing the golden document failed.
    #[error(transparent)]
    Document(#[from] DocumentError),

    /// A stored value does not deserialize into the requested type.
    #[error("failed to decode {key:?} from {}: {source}", path.display())]
    Decode {
        path: PathBuf,
        key: String,
        #[source]
        source: serde_yaml::Error,
    },

    /// A glob pattern matched no golden file.
    #[error("the patterns {patterns:?} didn't match anything in {}", dir.display())]
    NoMatch { patterns: Vec<String>, dir: PathBuf },

    /// A glob pattern could not be compiled or walked.
    #[error("invalid golden pattern {pattern:?}: {message}")]
    Pattern { pattern: String, message: String },

    /// A pending golden output was used for something other than `==`.
    #[error("unsupported operation `{operation}` on golden output {key:?}; only `==` is allowed in update mode")]
    UnsupportedProxyOperation {
        key: String,
        operation: &'static str,
    },

    /// Rewriting the golden file failed during teardown.
    #[error("failed to update golden file {}: {source}", path.display())]
    FlushIo {
        path: PathBuf,
        #[source]
        source: DocumentError,
    },

    /// The settings file or environment is invalid.
    #[error("invalid golden settings in {path}: {message}")]
    Settings { path: String, message: String },
}

impl GoldenError {
    /// True if the golden file itself is missing.
    pub fn is_not_found(&self) -> bool {
        matches!(self, GoldenError::Document(DocumentError::NotFound { .. }))
    }

    /// True if a requested key is absent from the golden file.
    pub fn is_key_missing(&self) -> bool {
        matches!(self, GoldenError::Document(DocumentError::KeyMissing { .. }))
    }
}

/// Result type for golden fixture operations.
pub type GoldenResult<T> = Result<T, GoldenError>;

/// Error type accepted from test bodies, so they can use `?` freely.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;
