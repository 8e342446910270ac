//! Error types for the object tree.

use std::io;
use std::path::PathBuf;

use grove_path::{NodePath, PathError};
use grove_store::StoreError;
use thiserror::Error;

use crate::warning::Warning;

/// Structural errors: name collisions and invalid move/copy topology.
///
/// All of these are recoverable: the caller picks `overwrite`, another
/// name or another destination.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum NodeError {
    /// The destination name is already taken.
    #[error("node {path} already exists")]
    AlreadyExists { path: NodePath },

    /// Non-recursive removal of a group that still has children.
    #[error("group {path} has children; remove it recursively")]
    NotEmpty { path: NodePath },

    /// A group would end up inside its own subtree.
    #[error("cannot place {src} inside itself (destination {dst})")]
    IntoItself { src: NodePath, dst: NodePath },

    /// Overwriting the destination would delete the source with it.
    #[error("overwriting {dst} would remove its descendant {src}")]
    OverwriteAncestor { src: NodePath, dst: NodePath },

    /// A group was required.
    #[error("{path} is not a group")]
    NotAGroup { path: NodePath },

    /// A leaf was required.
    #[error("{path} is not a leaf")]
    NotALeaf { path: NodePath },

    /// The root node cannot take part in this operation.
    #[error("the root node cannot be {0}")]
    Root(&'static str),

    /// The name is reserved for the tree's own use.
    #[error("name {name:?} is reserved")]
    Reserved { name: String },

    /// The handle belongs to another file.
    #[error("node {path} belongs to another file")]
    ForeignNode { path: NodePath },
}

/// Errors that can occur during tree operations.
#[derive(Debug, Error)]
pub enum TreeError {
    /// The file session is closed.
    #[error("the file is closed")]
    ClosedFile,

    /// The node handle is closed; look the path up again.
    #[error("node {path} is closed")]
    ClosedNode { path: NodePath },

    /// A mutation was attempted on a read-only session.
    #[error("file is read-only; {operation} needs a writable mode")]
    FileMode { operation: &'static str },

    /// The path does not resolve.
    #[error("no such node: {path}")]
    NoSuchNode { path: NodePath },

    /// Collision or topology error.
    #[error(transparent)]
    Node(#[from] NodeError),

    /// Malformed path or name.
    #[error("invalid path: {0}")]
    InvalidPath(#[from] PathError),

    /// The node's payload kind cannot be decoded.
    #[error("node {path} has an unsupported payload and cannot be {operation}")]
    UnsupportedPayload {
        path: NodePath,
        operation: &'static str,
    },

    /// Unknown flavor name.
    #[error("invalid flavor {name:?}")]
    Flavor { name: String },

    /// The attribute is not set.
    #[error("node {path} has no attribute {name:?}")]
    NoSuchAttribute { path: NodePath, name: String },

    /// No front-end member with that name is assigned.
    #[error("node {path} has no member {name:?}")]
    NoSuchMember { path: NodePath, name: String },

    /// Undo log misuse (disabled log, unknown mark).
    #[error("undo: {0}")]
    Undo(String),

    /// Unknown mode string.
    #[error("invalid file mode {0:?}")]
    InvalidMode(String),

    /// An advisory warning escalated by the session's warning policy.
    #[error("{0}")]
    Warning(Warning),

    /// The file exists but is not a Grove image.
    #[error("{}: not a grove file: {reason}", .path.display())]
    Format { path: PathBuf, reason: String },

    /// Store backend failure.
    #[error("store error: {0}")]
    Store(StoreError),

    /// I/O failure, including a missing file.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl From<StoreError> for TreeError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Path(e) => Self::InvalidPath(e),
            StoreError::Io(e) => Self::Io(e),
            other => Self::Store(other),
        }
    }
}

/// Convenience alias for tree results.
pub type TreeResult<T> = Result<T, TreeError>;
