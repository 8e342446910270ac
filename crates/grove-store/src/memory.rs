use std::collections::BTreeMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use grove_path::validate_name;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{StoreError, StoreResult};
use crate::traits::{EntryId, EntryInfo, EntryKind, HierStore};
use crate::value::{AttrValue, Payload};

/// Body of an entry: children for groups, data for leaves.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub(crate) enum Body {
    Group { children: BTreeMap<String, EntryId> },
    Leaf { payload: Payload },
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub(crate) struct Entry {
    pub(crate) name: String,
    pub(crate) parent: Option<EntryId>,
    pub(crate) body: Body,
    pub(crate) attrs: BTreeMap<String, AttrValue>,
}

impl Entry {
    fn kind(&self) -> EntryKind {
        match &self.body {
            Body::Group { .. } => EntryKind::Group,
            Body::Leaf { payload } => EntryKind::Leaf(payload.class()),
        }
    }
}

/// All entries of a store, keyed by handle. This is also the unit the
/// image file persists.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub(crate) struct Arena {
    pub(crate) next_id: u64,
    pub(crate) root: EntryId,
    pub(crate) entries: BTreeMap<EntryId, Entry>,
}

impl Arena {
    fn new() -> Self {
        let root = EntryId(0);
        let mut entries = BTreeMap::new();
        entries.insert(
            root,
            Entry {
                name: "/".into(),
                parent: None,
                body: Body::Group {
                    children: BTreeMap::new(),
                },
                attrs: BTreeMap::new(),
            },
        );
        Self {
            next_id: 1,
            root,
            entries,
        }
    }

    fn entry(&self, id: EntryId) -> StoreResult<&Entry> {
        self.entries.get(&id).ok_or(StoreError::NotFound(id))
    }

    fn entry_mut(&mut self, id: EntryId) -> StoreResult<&mut Entry> {
        self.entries.get_mut(&id).ok_or(StoreError::NotFound(id))
    }

    fn children_of(&self, id: EntryId) -> StoreResult<&BTreeMap<String, EntryId>> {
        match &self.entry(id)?.body {
            Body::Group { children } => Ok(children),
            Body::Leaf { .. } => Err(StoreError::NotAGroup(id)),
        }
    }

    fn children_of_mut(&mut self, id: EntryId) -> StoreResult<&mut BTreeMap<String, EntryId>> {
        match &mut self.entry_mut(id)?.body {
            Body::Group { children } => Ok(children),
            Body::Leaf { .. } => Err(StoreError::NotAGroup(id)),
        }
    }

    fn insert(&mut self, parent: EntryId, name: &str, body: Body) -> StoreResult<EntryId> {
        validate_name(name)?;
        if self.children_of(parent)?.contains_key(name) {
            return Err(StoreError::AlreadyExists {
                parent,
                name: name.to_string(),
            });
        }
        let id = EntryId(self.next_id);
        self.next_id += 1;
        self.children_of_mut(parent)?.insert(name.to_string(), id);
        self.entries.insert(
            id,
            Entry {
                name: name.to_string(),
                parent: Some(parent),
                body,
                attrs: BTreeMap::new(),
            },
        );
        Ok(id)
    }

    /// Returns `true` if `ancestor` is `id` or one of its ancestors.
    fn is_self_or_ancestor(&self, ancestor: EntryId, id: EntryId) -> StoreResult<bool> {
        let mut current = Some(id);
        while let Some(cur) = current {
            if cur == ancestor {
                return Ok(true);
            }
            current = self.entry(cur)?.parent;
        }
        Ok(false)
    }
}

/// In-memory, arena-based hierarchical store.
///
/// Intended for tests, embedding and as the working copy of an image file
/// (see [`crate::image`]). All entries are held behind a `RwLock`.
pub struct InMemoryStore {
    root: EntryId,
    arena: RwLock<Arena>,
}

impl InMemoryStore {
    /// Create a store holding only an empty root group.
    pub fn new() -> Self {
        Self::from_arena(Arena::new())
    }

    pub(crate) fn from_arena(arena: Arena) -> Self {
        Self {
            root: arena.root,
            arena: RwLock::new(arena),
        }
    }

    pub(crate) fn snapshot(&self) -> StoreResult<Arena> {
        Ok(self.read_arena()?.clone())
    }

    /// Number of entries, the root included.
    pub fn len(&self) -> StoreResult<usize> {
        Ok(self.read_arena()?.entries.len())
    }

    /// Returns `true` if only the root exists.
    pub fn is_empty(&self) -> StoreResult<bool> {
        Ok(self.len()? <= 1)
    }

    fn read_arena(&self) -> StoreResult<RwLockReadGuard<'_, Arena>> {
        self.arena
            .read()
            .map_err(|e| StoreError::Poisoned(e.to_string()))
    }

    fn write_arena(&self) -> StoreResult<RwLockWriteGuard<'_, Arena>> {
        self.arena
            .write()
            .map_err(|e| StoreError::Poisoned(e.to_string()))
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl HierStore for InMemoryStore {
    fn root(&self) -> EntryId {
        self.root
    }

    fn info(&self, id: EntryId) -> StoreResult<EntryInfo> {
        let arena = self.read_arena()?;
        let entry = arena.entry(id)?;
        Ok(EntryInfo {
            id,
            name: entry.name.clone(),
            parent: entry.parent,
            kind: entry.kind(),
        })
    }

    fn lookup(&self, parent: EntryId, name: &str) -> StoreResult<Option<EntryId>> {
        let arena = self.read_arena()?;
        Ok(arena.children_of(parent)?.get(name).copied())
    }

    fn children(&self, group: EntryId) -> StoreResult<Vec<String>> {
        let arena = self.read_arena()?;
        Ok(arena.children_of(group)?.keys().cloned().collect())
    }

    fn create_group(&self, parent: EntryId, name: &str) -> StoreResult<EntryId> {
        let mut arena = self.write_arena()?;
        let id = arena.insert(
            parent,
            name,
            Body::Group {
                children: BTreeMap::new(),
            },
        )?;
        debug!(%id, %parent, name, "created group entry");
        Ok(id)
    }

    fn create_leaf(&self, parent: EntryId, name: &str, payload: Payload) -> StoreResult<EntryId> {
        let mut arena = self.write_arena()?;
        let class = payload.class();
        let id = arena.insert(parent, name, Body::Leaf { payload })?;
        debug!(%id, %parent, name, %class, "created leaf entry");
        Ok(id)
    }

    fn delete(&self, id: EntryId) -> StoreResult<()> {
        let mut arena = self.write_arena()?;
        let entry = arena.entry(id)?;
        let parent = entry.parent.ok_or(StoreError::Root("deleted"))?;
        if let Body::Group { children } = &entry.body {
            if !children.is_empty() {
                return Err(StoreError::NotEmpty(id));
            }
        }
        let name = entry.name.clone();
        arena.children_of_mut(parent)?.remove(&name);
        arena.entries.remove(&id);
        debug!(%id, name, "deleted entry");
        Ok(())
    }

    fn rename(&self, id: EntryId, new_parent: EntryId, new_name: &str) -> StoreResult<()> {
        validate_name(new_name)?;
        let mut arena = self.write_arena()?;
        let entry = arena.entry(id)?;
        let old_parent = entry.parent.ok_or(StoreError::Root("renamed"))?;
        let old_name = entry.name.clone();

        if arena.is_self_or_ancestor(id, new_parent)? {
            return Err(StoreError::Cycle {
                entry: id,
                target: new_parent,
            });
        }
        if old_parent == new_parent && old_name == new_name {
            return Ok(());
        }
        if arena.children_of(new_parent)?.contains_key(new_name) {
            return Err(StoreError::AlreadyExists {
                parent: new_parent,
                name: new_name.to_string(),
            });
        }

        arena.children_of_mut(old_parent)?.remove(&old_name);
        arena
            .children_of_mut(new_parent)?
            .insert(new_name.to_string(), id);
        let entry = arena.entry_mut(id)?;
        entry.parent = Some(new_parent);
        entry.name = new_name.to_string();
        debug!(%id, from = %old_parent, to = %new_parent, new_name, "renamed entry");
        Ok(())
    }

    fn read_attr(&self, id: EntryId, name: &str) -> StoreResult<Option<AttrValue>> {
        let arena = self.read_arena()?;
        Ok(arena.entry(id)?.attrs.get(name).cloned())
    }

    fn write_attr(&self, id: EntryId, name: &str, value: AttrValue) -> StoreResult<()> {
        let mut arena = self.write_arena()?;
        arena.entry_mut(id)?.attrs.insert(name.to_string(), value);
        Ok(())
    }

    fn delete_attr(&self, id: EntryId, name: &str) -> StoreResult<bool> {
        let mut arena = self.write_arena()?;
        Ok(arena.entry_mut(id)?.attrs.remove(name).is_some())
    }

    fn attr_names(&self, id: EntryId) -> StoreResult<Vec<String>> {
        let arena = self.read_arena()?;
        Ok(arena.entry(id)?.attrs.keys().cloned().collect())
    }

    fn read_payload(&self, id: EntryId) -> StoreResult<Payload> {
        let arena = self.read_arena()?;
        match &arena.entry(id)?.body {
            Body::Leaf { payload } => Ok(payload.clone()),
            Body::Group { .. } => Err(StoreError::NotALeaf(id)),
        }
    }
}

impl std::fmt::Debug for InMemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let count = self.len().unwrap_or(0);
        f.debug_struct("InMemoryStore")
            .field("entry_count", &count)
            .finish()
    }
}
