//! State of an open file session.
//!
//! Everything here runs with the session lock held; nothing in this module
//! calls back into the public [`Node`] or [`File`](crate::File) API.

use std::path::Path;
use std::sync::{Arc, Weak};

use grove_path::{is_natural_name, NameMap, NodePath};
use grove_store::{image, AttrValue, EntryId, HierStore, InMemoryStore, SliceRange};
use tracing::{debug, info};

use crate::attrs::{CLASS, FLAVOR, NODE_VERSION, TITLE, VERSION};
use crate::cache::NodeCache;
use crate::config::FileMode;
use crate::error::{NodeError, TreeError, TreeResult};
use crate::file::FileShared;
use crate::flavor::{self, Flavor, LeafData};
use crate::node::{Locator, Node, NodeClass};
use crate::undo::{Action, UndoLog};
use crate::warning::{Warning, WarningLog};

/// Name of the hidden group under the session root that holds subtrees
/// kept for undo.
pub(crate) const UNDO_GROUP: &str = "_p_undo";

pub(crate) struct OpenSession {
    pub(crate) mode: FileMode,
    pub(crate) store: Arc<dyn HierStore>,
    /// Set when the store is backed by an image file.
    pub(crate) image: Option<Arc<InMemoryStore>>,
    pub(crate) root_entry: EntryId,
    pub(crate) cache: NodeCache,
    pub(crate) undo: Option<UndoLog>,
    pub(crate) warnings: WarningLog,
    pub(crate) names: NameMap,
    pub(crate) shared: Weak<FileShared>,
}

impl OpenSession {
    pub(crate) fn ensure_writable(&self, operation: &'static str) -> TreeResult<()> {
        if self.mode.is_writable() {
            Ok(())
        } else {
            Err(TreeError::FileMode { operation })
        }
    }

    pub(crate) fn warn(&mut self, warning: Warning) -> TreeResult<()> {
        self.warnings.emit(warning)
    }

    // -----------------------------------------------------------------------
    // Resolution
    // -----------------------------------------------------------------------

    pub(crate) fn root_node(&mut self) -> TreeResult<Node> {
        let root = NodePath::root();
        if let Some(node) = self.cache.get(&root) {
            return Ok(node);
        }
        let node = Node::new(
            self.root_entry,
            NodeClass::Group,
            root,
            None,
            self.shared.clone(),
        );
        self.cache.register(node.clone());
        Ok(node)
    }

    /// Return the attached node at `path`, loading missing segments from
    /// the store and registering them on the way down.
    pub(crate) fn resolve(&mut self, path: &NodePath) -> TreeResult<Node> {
        if let Some(node) = self.cache.get(path) {
            return Ok(node);
        }
        let mut current = self.root_node()?;
        let mut current_path = NodePath::root();
        for segment in path.segments() {
            let next_path = current_path.join(segment)?;
            let next = match self.cache.get(&next_path) {
                Some(node) => node,
                None => self.load_child(&current, segment, &next_path)?,
            };
            current = next;
            current_path = next_path;
        }
        Ok(current)
    }

    fn load_child(&mut self, parent: &Node, name: &str, path: &NodePath) -> TreeResult<Node> {
        if !parent.is_group() {
            return Err(NodeError::NotAGroup {
                path: parent.path(),
            }
            .into());
        }
        let entry = self
            .lookup_entry(parent, name)?
            .ok_or_else(|| TreeError::NoSuchNode { path: path.clone() })?;
        let class = NodeClass::from(self.store.info(entry)?.kind);
        if class == NodeClass::Unsupported {
            self.warn(Warning::Unsupported { path: path.clone() })?;
        }
        let node = Node::new(entry, class, path.clone(), Some(parent), self.shared.clone());
        self.cache.register(node.clone());
        Ok(node)
    }

    /// Reject closed and foreign handles.
    pub(crate) fn check_handle(&self, node: &Node) -> TreeResult<()> {
        if node.is_closed() {
            return Err(TreeError::ClosedNode { path: node.path() });
        }
        if !node.belongs_to(&self.shared) {
            return Err(NodeError::ForeignNode { path: node.path() }.into());
        }
        Ok(())
    }

    pub(crate) fn locate(&mut self, locator: Locator<'_>) -> TreeResult<Node> {
        match locator {
            Locator::Path(path) => self.resolve(&NodePath::parse(path)?),
            Locator::NodePath(path) => self.resolve(path),
            Locator::Node(node) => {
                self.check_handle(node)?;
                Ok(node.clone())
            }
        }
    }

    pub(crate) fn child(&mut self, parent: &Node, name: &str) -> TreeResult<Node> {
        self.resolve(&parent.path().join(name)?)
    }

    pub(crate) fn contains(&mut self, path: &NodePath) -> TreeResult<bool> {
        match self.resolve(path) {
            Ok(_) => Ok(true),
            Err(TreeError::NoSuchNode { .. }) | Err(TreeError::Node(NodeError::NotAGroup { .. })) => {
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    fn is_undo_area(&self, parent: EntryId, stored: &str) -> bool {
        parent == self.root_entry && stored == UNDO_GROUP
    }

    /// Store handle of the child `name` (front-end name) of `parent`.
    pub(crate) fn lookup_entry(&self, parent: &Node, name: &str) -> TreeResult<Option<EntryId>> {
        if !self.names.is_addressable(name) {
            return Ok(None);
        }
        let stored = self.names.to_store(name);
        if self.is_undo_area(parent.entry(), stored) {
            return Ok(None);
        }
        Ok(self.store.lookup(parent.entry(), stored)?)
    }

    pub(crate) fn child_exists(&self, parent: &Node, name: &str) -> TreeResult<bool> {
        Ok(self.lookup_entry(parent, name)?.is_some())
    }

    /// Sorted front-end names of the visible children of a group.
    pub(crate) fn list_children(&self, group: &Node) -> TreeResult<Vec<String>> {
        if !group.is_group() {
            return Err(NodeError::NotAGroup { path: group.path() }.into());
        }
        let mut names: Vec<String> = self
            .store
            .children(group.entry())?
            .into_iter()
            .filter(|stored| !self.is_undo_area(group.entry(), stored))
            .map(|stored| self.names.to_front(&stored).to_string())
            .collect();
        names.sort();
        Ok(names)
    }

    // -----------------------------------------------------------------------
    // Name checks
    // -----------------------------------------------------------------------

    /// Hard checks and advisory warnings for a new child name.
    pub(crate) fn check_new_name(&mut self, parent: &Node, name: &str) -> TreeResult<()> {
        if parent.entry() == self.root_entry && self.names.to_store(name) == UNDO_GROUP {
            return Err(NodeError::Reserved {
                name: name.to_string(),
            }
            .into());
        }
        if !is_natural_name(name) {
            self.warn(Warning::NaturalName {
                name: name.to_string(),
                reason: "it cannot be used as a member name".into(),
            })?;
        } else if parent.has_member(name) {
            self.warn(Warning::NaturalName {
                name: name.to_string(),
                reason: format!("it is shadowed by a member of {}", parent.path()),
            })?;
        }
        Ok(())
    }

    pub(crate) fn check_member_name(&mut self, node: &Node, name: &str) -> TreeResult<()> {
        if !is_natural_name(name) {
            self.warn(Warning::NaturalName {
                name: name.to_string(),
                reason: "it is not a valid identifier".into(),
            })
        } else if node.is_group() && self.child_exists(node, name)? {
            self.warn(Warning::NaturalName {
                name: name.to_string(),
                reason: format!("the member shadows a child of {}", node.path()),
            })
        } else {
            Ok(())
        }
    }

    // -----------------------------------------------------------------------
    // Attributes
    // -----------------------------------------------------------------------

    pub(crate) fn attr_get(&self, node: &Node, name: &str) -> TreeResult<Option<AttrValue>> {
        Ok(self.store.read_attr(node.entry(), name)?)
    }

    pub(crate) fn attr_names(&self, node: &Node) -> TreeResult<Vec<String>> {
        Ok(self.store.attr_names(node.entry())?)
    }

    pub(crate) fn attr_set(&mut self, node: &Node, name: &str, value: AttrValue) -> TreeResult<()> {
        self.ensure_writable("setting an attribute")?;
        let previous = self.store.read_attr(node.entry(), name)?;
        self.store.write_attr(node.entry(), name, value.clone())?;
        debug!(path = %node.path(), attr = name, "set attribute");
        self.record(Action::SetAttr {
            path: node.path(),
            name: name.to_string(),
            previous,
            value,
        })
    }

    pub(crate) fn attr_delete(&mut self, node: &Node, name: &str) -> TreeResult<()> {
        self.ensure_writable("deleting an attribute")?;
        let previous =
            self.store
                .read_attr(node.entry(), name)?
                .ok_or_else(|| TreeError::NoSuchAttribute {
                    path: node.path(),
                    name: name.to_string(),
                })?;
        self.store.delete_attr(node.entry(), name)?;
        debug!(path = %node.path(), attr = name, "deleted attribute");
        self.record(Action::DelAttr {
            path: node.path(),
            name: name.to_string(),
            previous,
        })
    }

    /// Write the metadata every new node carries.
    pub(crate) fn stamp(
        &self,
        entry: EntryId,
        class: NodeClass,
        title: Option<&str>,
    ) -> TreeResult<()> {
        self.store
            .write_attr(entry, CLASS, class.class_tag().into())?;
        self.store.write_attr(entry, VERSION, NODE_VERSION.into())?;
        if let Some(title) = title {
            self.store.write_attr(entry, TITLE, title.into())?;
        }
        if class.is_leaf() {
            self.store
                .write_attr(entry, FLAVOR, Flavor::default().as_str().into())?;
        }
        Ok(())
    }

    /// Warn if the session root lacks the format metadata.
    pub(crate) fn check_format(&mut self) -> TreeResult<()> {
        let mut missing = Vec::new();
        for name in [CLASS, VERSION] {
            if self.store.read_attr(self.root_entry, name)?.is_none() {
                missing.push(name);
            }
        }
        if missing.is_empty() {
            return Ok(());
        }
        self.warn(Warning::FormatCompat {
            reason: format!("root group lacks {}", missing.join(" and ")),
        })
    }

    // -----------------------------------------------------------------------
    // Leaf data
    // -----------------------------------------------------------------------

    pub(crate) fn leaf_flavor(&mut self, node: &Node) -> TreeResult<Flavor> {
        if node.is_group() {
            return Err(NodeError::NotALeaf { path: node.path() }.into());
        }
        let Some(stored) = self.store.read_attr(node.entry(), FLAVOR)? else {
            return Ok(Flavor::default());
        };
        match stored.as_str().map(str::parse::<Flavor>) {
            Some(Ok(flavor)) => Ok(flavor),
            _ => {
                self.warn(Warning::Flavor {
                    path: node.path(),
                    flavor: stored.as_str().map_or_else(|| stored.to_string(), str::to_string),
                })?;
                Ok(Flavor::default())
            }
        }
    }

    pub(crate) fn set_flavor(&mut self, node: &Node, name: &str) -> TreeResult<()> {
        let flavor: Flavor = name.parse()?;
        if node.is_group() {
            return Err(NodeError::NotALeaf { path: node.path() }.into());
        }
        self.attr_set(node, FLAVOR, flavor.as_str().into())
    }

    pub(crate) fn read_leaf(&mut self, node: &Node, range: &SliceRange) -> TreeResult<LeafData> {
        match node.class() {
            NodeClass::Group => return Err(NodeError::NotALeaf { path: node.path() }.into()),
            NodeClass::Unsupported => {
                return Err(TreeError::UnsupportedPayload {
                    path: node.path(),
                    operation: "read",
                })
            }
            NodeClass::Array | NodeClass::Table => {}
        }
        let flavor = self.leaf_flavor(node)?;
        let payload = self.store.read_payload(node.entry())?.slice(range)?;
        Ok(flavor::render(payload, flavor))
    }

    // -----------------------------------------------------------------------
    // Persistence
    // -----------------------------------------------------------------------

    /// Write the image (if any) and flush the store.
    pub(crate) fn persist(&self, path: Option<&Path>) -> TreeResult<()> {
        if let (Some(backing), Some(path)) = (&self.image, path) {
            image::save(backing, path)?;
        }
        self.store.flush()?;
        Ok(())
    }

    /// Close every attached node, drop the undo area and persist.
    pub(crate) fn shutdown(mut self, path: Option<&Path>) -> TreeResult<()> {
        let closed = self.cache.close_all();
        if self.mode.is_writable() {
            self.undo = None;
            self.purge_undo_area()?;
            self.persist(path)?;
        }
        info!(mode = %self.mode, closed, "closed file session");
        Ok(())
    }
}
