//! Structural tree operations: create, remove, move and copy.

use grove_path::{validate_name, NodePath};
use grove_store::{EntryId, EntryKind, HierStore, InMemoryStore, LeafClass, Payload, SliceRange};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::attrs::{is_system_attr, TITLE};
use crate::error::{NodeError, TreeError, TreeResult};
use crate::node::{Locator, Node, NodeClass};
use crate::session::{OpenSession, UNDO_GROUP};
use crate::undo::Action;
use crate::warning::Warning;

/// What a new node holds.
#[derive(Clone, Debug, PartialEq)]
pub enum NodeSpec {
    Group,
    Leaf(Payload),
}

/// Options for [`File::copy_node`](crate::File::copy_node).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CopyOptions {
    /// Replace an existing destination (removed recursively first).
    pub overwrite: bool,
    /// Copy the whole subtree of a group instead of the group alone.
    pub recursive: bool,
    /// Copy user attributes; system attributes are always copied.
    pub copy_user_attrs: bool,
    /// Slice applied to every copied leaf payload.
    pub range: SliceRange,
    /// Title for the new top-level node.
    pub title: Option<String>,
}

impl Default for CopyOptions {
    fn default() -> Self {
        Self {
            overwrite: false,
            recursive: false,
            copy_user_attrs: true,
            range: SliceRange::full(),
            title: None,
        }
    }
}

impl CopyOptions {
    pub fn overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }

    pub fn recursive(mut self, recursive: bool) -> Self {
        self.recursive = recursive;
        self
    }

    pub fn copy_user_attrs(mut self, copy: bool) -> Self {
        self.copy_user_attrs = copy;
        self
    }

    pub fn range(mut self, range: SliceRange) -> Self {
        self.range = range;
        self
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }
}

/// Delete an entry and everything below it, children first.
pub(crate) fn delete_subtree(store: &dyn HierStore, entry: EntryId) -> TreeResult<()> {
    if store.info(entry)?.kind.is_group() {
        for name in store.children(entry)? {
            if let Some(child) = store.lookup(entry, &name)? {
                delete_subtree(store, child)?;
            }
        }
    }
    store.delete(entry)?;
    Ok(())
}

/// Copy attributes and children of `src` onto the existing `dst`, verbatim.
fn clone_into(
    src: &dyn HierStore,
    src_entry: EntryId,
    dst: &dyn HierStore,
    dst_entry: EntryId,
    skip: Option<&str>,
) -> TreeResult<()> {
    for name in src.attr_names(src_entry)? {
        if let Some(value) = src.read_attr(src_entry, &name)? {
            dst.write_attr(dst_entry, &name, value)?;
        }
    }
    if !src.info(src_entry)?.kind.is_group() {
        return Ok(());
    }
    for name in src.children(src_entry)? {
        if skip == Some(name.as_str()) {
            continue;
        }
        let Some(child) = src.lookup(src_entry, &name)? else {
            continue;
        };
        let copy = match src.info(child)?.kind {
            EntryKind::Group => dst.create_group(dst_entry, &name)?,
            EntryKind::Leaf(_) => dst.create_leaf(dst_entry, &name, src.read_payload(child)?)?,
        };
        clone_into(src, child, dst, copy, None)?;
    }
    Ok(())
}

impl OpenSession {
    // -----------------------------------------------------------------------
    // Create
    // -----------------------------------------------------------------------

    pub(crate) fn create(
        &mut self,
        parent: Locator<'_>,
        name: &str,
        spec: NodeSpec,
        title: Option<&str>,
    ) -> TreeResult<Node> {
        self.ensure_writable("creating a node")?;
        validate_name(name)?;
        let parent = self.locate(parent)?;
        if !parent.is_group() {
            return Err(NodeError::NotAGroup {
                path: parent.path(),
            }
            .into());
        }
        let path = parent.path().join(name)?;
        self.check_new_name(&parent, name)?;
        if self.child_exists(&parent, name)? {
            return Err(NodeError::AlreadyExists { path }.into());
        }

        let stored = self.names.to_store(name).to_string();
        let entry = match spec {
            NodeSpec::Group => self.store.create_group(parent.entry(), &stored)?,
            NodeSpec::Leaf(payload) => self.store.create_leaf(parent.entry(), &stored, payload)?,
        };
        let class = NodeClass::from(self.store.info(entry)?.kind);
        self.stamp(entry, class, title)?;

        let node = Node::new(entry, class, path.clone(), Some(&parent), self.shared.clone());
        self.cache.register(node.clone());
        debug!(path = %path, class = class.class_tag(), "created node");
        let parked = self.park_name();
        self.record(Action::Create { path, parked })?;
        Ok(node)
    }

    // -----------------------------------------------------------------------
    // Remove
    // -----------------------------------------------------------------------

    pub(crate) fn remove(&mut self, target: Locator<'_>, recursive: bool) -> TreeResult<()> {
        self.ensure_writable("removing a node")?;
        let node = self.locate(target)?;
        if node.path().is_root() {
            return Err(NodeError::Root("removed").into());
        }
        if node.is_group() && !recursive && !self.list_children(&node)?.is_empty() {
            return Err(NodeError::NotEmpty { path: node.path() }.into());
        }
        self.discard(&node)
    }

    /// Take a node out of the tree: parked for undo when the log is on,
    /// deleted otherwise. Attached handles are closed either way.
    pub(crate) fn discard(&mut self, node: &Node) -> TreeResult<()> {
        let path = node.path();
        if self.undo.is_some() {
            let parked = self.park_name();
            self.park(&path, &parked)?;
            self.record(Action::Remove { path, parked })
        } else {
            self.cache.evict(&path);
            delete_subtree(self.store.as_ref(), node.entry())?;
            debug!(path = %path, "removed node");
            Ok(())
        }
    }

    // -----------------------------------------------------------------------
    // Move
    // -----------------------------------------------------------------------

    /// Move an attached node in the store and in the cache; no checks, no
    /// undo record.
    pub(crate) fn relocate(&mut self, node: &Node, parent: &Node, name: &str) -> TreeResult<()> {
        let old = node.path();
        let new = parent.path().join(name)?;
        let stored = self.names.to_store(name).to_string();
        self.store.rename(node.entry(), parent.entry(), &stored)?;
        self.cache.rebase(&old, &new);
        node.set_parent(parent);
        debug!(from = %old, to = %new, "moved node");
        Ok(())
    }

    fn parent_of(&mut self, node: &Node, operation: &'static str) -> TreeResult<Node> {
        let parent = node.path().parent().ok_or(NodeError::Root(operation))?;
        self.resolve(&parent)
    }

    /// Validate a destination and clear it if `overwrite` allows.
    fn prepare_destination(
        &mut self,
        src: &NodePath,
        parent: &Node,
        name: &str,
        overwrite: bool,
    ) -> TreeResult<()> {
        let dst = parent.path().join(name)?;
        self.check_new_name(parent, name)?;
        if !self.child_exists(parent, name)? {
            return Ok(());
        }
        if !overwrite {
            return Err(NodeError::AlreadyExists { path: dst }.into());
        }
        if dst.is_ancestor_of(src) {
            return Err(NodeError::OverwriteAncestor {
                src: src.clone(),
                dst,
            }
            .into());
        }
        let existing = self.resolve(&dst)?;
        self.discard(&existing)
    }

    pub(crate) fn move_node(
        &mut self,
        src: Locator<'_>,
        dst_parent: Option<Locator<'_>>,
        new_name: Option<&str>,
        overwrite: bool,
    ) -> TreeResult<Node> {
        self.ensure_writable("moving a node")?;
        let node = self.locate(src)?;
        let src_path = node.path();
        if src_path.is_root() {
            return Err(NodeError::Root("moved").into());
        }
        let parent = match dst_parent {
            Some(locator) => self.locate(locator)?,
            None => self.parent_of(&node, "moved")?,
        };
        if !parent.is_group() {
            return Err(NodeError::NotAGroup {
                path: parent.path(),
            }
            .into());
        }
        let name = new_name.unwrap_or(src_path.name()).to_string();
        validate_name(&name)?;
        let dst_path = parent.path().join(&name)?;
        if dst_path == src_path {
            return Ok(node);
        }
        if src_path.contains(&parent.path()) {
            return Err(NodeError::IntoItself {
                src: src_path,
                dst: dst_path,
            }
            .into());
        }
        self.prepare_destination(&src_path, &parent, &name, overwrite)?;
        self.relocate(&node, &parent, &name)?;
        self.record(Action::Move {
            from: src_path,
            to: dst_path,
        })?;
        Ok(node)
    }

    // -----------------------------------------------------------------------
    // Copy
    // -----------------------------------------------------------------------

    pub(crate) fn copy_node(
        &mut self,
        src: Locator<'_>,
        dst_parent: Option<Locator<'_>>,
        new_name: Option<&str>,
        options: &CopyOptions,
    ) -> TreeResult<Node> {
        self.ensure_writable("copying a node")?;
        let node = self.locate(src)?;
        let src_path = node.path();
        let recursive = options.recursive && node.is_group();
        if let Some(path) = self.find_unsupported(&src_path, node.entry(), recursive)? {
            self.warn(Warning::Unsupported { path: path.clone() })?;
            return Err(TreeError::UnsupportedPayload {
                path,
                operation: "copied",
            });
        }
        let parent = match dst_parent {
            Some(locator) => self.locate(locator)?,
            None => self.parent_of(&node, "copied")?,
        };
        if !parent.is_group() {
            return Err(NodeError::NotAGroup {
                path: parent.path(),
            }
            .into());
        }
        let name = new_name.unwrap_or(src_path.name()).to_string();
        validate_name(&name)?;
        let dst_path = parent.path().join(&name)?;
        if dst_path == src_path {
            return if options.overwrite {
                Ok(node)
            } else {
                Err(NodeError::AlreadyExists { path: dst_path }.into())
            };
        }
        if recursive && src_path.contains(&parent.path()) {
            return Err(NodeError::IntoItself {
                src: src_path,
                dst: dst_path,
            }
            .into());
        }
        self.prepare_destination(&src_path, &parent, &name, options.overwrite)?;

        let stored = self.names.to_store(&name).to_string();
        let entry = self.copy_entry(node.entry(), parent.entry(), &stored, options, recursive)?;
        if let Some(title) = &options.title {
            self.store.write_attr(entry, TITLE, title.as_str().into())?;
        }
        let copy = Node::new(
            entry,
            node.class(),
            dst_path.clone(),
            Some(&parent),
            self.shared.clone(),
        );
        self.cache.register(copy.clone());
        debug!(from = %src_path, to = %dst_path, recursive, "copied node");
        let parked = self.park_name();
        self.record(Action::Create {
            path: dst_path,
            parked,
        })?;
        Ok(copy)
    }

    /// The first unsupported leaf a copy of `src` would meet, if any.
    fn find_unsupported(
        &self,
        path: &NodePath,
        src: EntryId,
        recursive: bool,
    ) -> TreeResult<Option<NodePath>> {
        match self.store.info(src)?.kind {
            EntryKind::Leaf(LeafClass::Unsupported) => return Ok(Some(path.clone())),
            EntryKind::Group if recursive => {}
            _ => return Ok(None),
        }
        for child in self.store.children(src)? {
            if src == self.root_entry && child == UNDO_GROUP {
                continue;
            }
            let Some(entry) = self.store.lookup(src, &child)? else {
                continue;
            };
            let child_path = path.join(self.names.to_front(&child))?;
            if let Some(found) = self.find_unsupported(&child_path, entry, true)? {
                return Ok(Some(found));
            }
        }
        Ok(None)
    }

    /// Duplicate `src` under `dst_parent`, slicing leaves by the copy range.
    /// The source must already be free of unsupported leaves.
    fn copy_entry(
        &self,
        src: EntryId,
        dst_parent: EntryId,
        name: &str,
        options: &CopyOptions,
        recursive: bool,
    ) -> TreeResult<EntryId> {
        let info = self.store.info(src)?;
        let copy = match info.kind {
            EntryKind::Group => self.store.create_group(dst_parent, name)?,
            EntryKind::Leaf(_) => {
                let payload = self.store.read_payload(src)?.slice(&options.range)?;
                self.store.create_leaf(dst_parent, name, payload)?
            }
        };
        for attr in self.store.attr_names(src)? {
            if !options.copy_user_attrs && !is_system_attr(&attr) {
                continue;
            }
            if let Some(value) = self.store.read_attr(src, &attr)? {
                self.store.write_attr(copy, &attr, value)?;
            }
        }
        if recursive && info.kind.is_group() {
            for child in self.store.children(src)? {
                if src == self.root_entry && child == UNDO_GROUP {
                    continue;
                }
                let Some(child_entry) = self.store.lookup(src, &child)? else {
                    continue;
                };
                self.copy_entry(child_entry, copy, &child, options, true)?;
            }
        }
        Ok(copy)
    }

    // -----------------------------------------------------------------------
    // Whole-file copy
    // -----------------------------------------------------------------------

    /// A standalone store holding the visible tree below the session root.
    pub(crate) fn export(&self) -> TreeResult<InMemoryStore> {
        let copy = InMemoryStore::new();
        clone_into(
            self.store.as_ref(),
            self.root_entry,
            &copy,
            copy.root(),
            Some(UNDO_GROUP),
        )?;
        Ok(copy)
    }
}
