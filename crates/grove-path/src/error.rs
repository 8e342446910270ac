//! Error types for path and name handling.

use thiserror::Error;

/// Errors produced while parsing paths or validating names.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum PathError {
    /// The path is malformed (relative, empty segment, bad character).
    #[error("invalid path {path:?}: {reason}")]
    InvalidPath { path: String, reason: String },

    /// A single node name is not usable as a path segment.
    #[error("invalid node name {name:?}: {reason}")]
    InvalidName { name: String, reason: String },

    /// A name translation entry collides with an existing one.
    #[error("conflicting name translation for {name:?}")]
    ConflictingTranslation { name: String },
}

/// Convenience type alias for path operations.
pub type PathResult<T> = std::result::Result<T, PathError>;
