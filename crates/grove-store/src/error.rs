use grove_path::PathError;

use crate::traits::EntryId;

/// Errors from hierarchical store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The entry handle does not refer to a live entry.
    #[error("entry not found: {0}")]
    NotFound(EntryId),

    /// A child with this name already exists under the parent.
    #[error("entry {name:?} already exists under {parent}")]
    AlreadyExists { parent: EntryId, name: String },

    /// A group operation was attempted on a leaf.
    #[error("entry {0} is not a group")]
    NotAGroup(EntryId),

    /// A data operation was attempted on a group.
    #[error("entry {0} is not a leaf")]
    NotALeaf(EntryId),

    /// Only childless entries may be deleted.
    #[error("entry {0} still has children")]
    NotEmpty(EntryId),

    /// The root entry cannot be deleted or renamed.
    #[error("the root entry cannot be {0}")]
    Root(&'static str),

    /// A rename would place an entry inside its own subtree.
    #[error("cannot move entry {entry} below itself (target parent {target})")]
    Cycle { entry: EntryId, target: EntryId },

    /// The payload kind cannot be decoded by this reader.
    #[error("payload of type {type_name:?} cannot be decoded")]
    Undecodable { type_name: String },

    /// An invalid slice was requested.
    #[error("invalid slice: {0}")]
    InvalidSlice(String),

    /// An entry name is not valid.
    #[error(transparent)]
    Path(#[from] PathError),

    /// The image file exists but is not in this format.
    #[error("not a grove image: {0}")]
    Format(String),

    /// The image body does not match its checksum.
    #[error("image checksum mismatch: expected {expected:08x}, computed {computed:08x}")]
    ChecksumMismatch { expected: u32, computed: u32 },

    /// Serialization or deserialization failure.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// I/O error from the underlying storage backend.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// An internal lock was poisoned by a panicking writer.
    #[error("store lock poisoned: {0}")]
    Poisoned(String),
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
