use std::fmt;

use grove_path::NodePath;
use serde::{Deserialize, Serialize};

use crate::error::StoreResult;
use crate::value::{AttrValue, LeafClass, Payload};

/// Stable handle to a store entry.
///
/// A handle survives renames and moves of its entry; it is invalidated only
/// when the entry is deleted.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntryId(pub u64);

impl fmt::Debug for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EntryId({})", self.0)
    }
}

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// The structural kind of an entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntryKind {
    Group,
    Leaf(LeafClass),
}

impl EntryKind {
    /// Returns `true` for groups.
    pub fn is_group(&self) -> bool {
        matches!(self, Self::Group)
    }
}

/// Summary of a single entry.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EntryInfo {
    pub id: EntryId,
    /// Name under the parent (the root's name is `/`).
    pub name: String,
    pub parent: Option<EntryId>,
    pub kind: EntryKind,
}

/// A hierarchical key-path store made of groups, leaves and attributes.
///
/// This is the boundary the object tree is built on. Implementations must
/// satisfy these invariants:
/// - Names are unique among the children of one group.
/// - `rename` keeps the entry's handle, attributes and subtree intact.
/// - `delete` only removes childless entries; subtrees are removed
///   bottom-up by the caller.
/// - The store never interprets attribute values or payloads beyond the
///   payload's [`LeafClass`].
/// - All I/O errors are propagated, never silently ignored.
pub trait HierStore: Send + Sync {
    /// Handle of the root group.
    fn root(&self) -> EntryId;

    /// Describe an entry.
    fn info(&self, id: EntryId) -> StoreResult<EntryInfo>;

    /// Find a child of `parent` by name.
    ///
    /// Returns `Ok(None)` if there is no such child. Fails if `parent` is
    /// not a group.
    fn lookup(&self, parent: EntryId, name: &str) -> StoreResult<Option<EntryId>>;

    /// Names of the children of a group, sorted.
    fn children(&self, group: EntryId) -> StoreResult<Vec<String>>;

    /// Create an empty group.
    fn create_group(&self, parent: EntryId, name: &str) -> StoreResult<EntryId>;

    /// Create a leaf holding `payload`.
    fn create_leaf(&self, parent: EntryId, name: &str, payload: Payload) -> StoreResult<EntryId>;

    /// Delete a leaf or an empty group.
    fn delete(&self, id: EntryId) -> StoreResult<()>;

    /// Move `id` under `new_parent` with `new_name`.
    fn rename(&self, id: EntryId, new_parent: EntryId, new_name: &str) -> StoreResult<()>;

    /// Read an attribute. Returns `Ok(None)` if it is not set.
    fn read_attr(&self, id: EntryId, name: &str) -> StoreResult<Option<AttrValue>>;

    /// Create or replace an attribute.
    fn write_attr(&self, id: EntryId, name: &str, value: AttrValue) -> StoreResult<()>;

    /// Delete an attribute. Returns `true` if it existed.
    fn delete_attr(&self, id: EntryId, name: &str) -> StoreResult<bool>;

    /// Names of all attributes of an entry, sorted.
    fn attr_names(&self, id: EntryId) -> StoreResult<Vec<String>>;

    /// The payload of a leaf.
    fn read_payload(&self, id: EntryId) -> StoreResult<Payload>;

    /// Walk `path` from `start`, returning `Ok(None)` at the first missing
    /// segment.
    fn resolve_from(&self, start: EntryId, path: &NodePath) -> StoreResult<Option<EntryId>> {
        let mut current = start;
        for segment in path.segments() {
            match self.lookup(current, segment)? {
                Some(next) => current = next,
                None => return Ok(None),
            }
        }
        Ok(Some(current))
    }

    /// Persist pending changes, if the backend buffers any.
    fn flush(&self) -> StoreResult<()> {
        Ok(())
    }
}
