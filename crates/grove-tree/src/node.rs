//! Live node handles.
//!
//! A [`Node`] is a cheap, clonable handle to one attached node instance.
//! Two handles are equal only if they refer to the same instance, so
//! repeated lookups of the same path compare equal for as long as the node
//! stays attached. Parents are held weakly; ownership of attached nodes
//! lies with the session's node cache.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard, Weak};

use grove_path::NodePath;
use grove_store::{AttrValue, EntryId, EntryKind, LeafClass, SliceRange};

use crate::attrs::{AttributeSet, TITLE};
use crate::error::{TreeError, TreeResult};
use crate::file::{File, FileShared};
use crate::flavor::{Flavor, LeafData};
use crate::session::OpenSession;

/// What a node is.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum NodeClass {
    Group,
    Array,
    Table,
    /// A leaf whose payload type cannot be decoded.
    Unsupported,
}

impl NodeClass {
    /// The value stored in the `CLASS` attribute.
    pub fn class_tag(&self) -> &'static str {
        match self {
            Self::Group => "GROUP",
            Self::Array => "ARRAY",
            Self::Table => "TABLE",
            Self::Unsupported => "UNSUPPORTED",
        }
    }

    pub fn is_group(&self) -> bool {
        matches!(self, Self::Group)
    }

    pub fn is_leaf(&self) -> bool {
        !self.is_group()
    }
}

impl From<EntryKind> for NodeClass {
    fn from(kind: EntryKind) -> Self {
        match kind {
            EntryKind::Group => Self::Group,
            EntryKind::Leaf(LeafClass::Array) => Self::Array,
            EntryKind::Leaf(LeafClass::Table) => Self::Table,
            EntryKind::Leaf(LeafClass::Unsupported) => Self::Unsupported,
        }
    }
}

/// A front-end member assigned on a node instance.
///
/// Members live only as long as the instance and are never persisted.
#[derive(Clone, Debug, PartialEq)]
pub enum Member {
    Value(AttrValue),
    Node(Node),
}

impl From<AttrValue> for Member {
    fn from(value: AttrValue) -> Self {
        Self::Value(value)
    }
}

impl From<Node> for Member {
    fn from(node: Node) -> Self {
        Self::Node(node)
    }
}

/// Where a tree operation should act: a path or a live handle.
#[derive(Clone, Copy, Debug)]
pub enum Locator<'a> {
    Path(&'a str),
    NodePath(&'a NodePath),
    Node(&'a Node),
}

impl<'a> From<&'a str> for Locator<'a> {
    fn from(path: &'a str) -> Self {
        Self::Path(path)
    }
}

impl<'a> From<&'a String> for Locator<'a> {
    fn from(path: &'a String) -> Self {
        Self::Path(path)
    }
}

impl<'a> From<&'a NodePath> for Locator<'a> {
    fn from(path: &'a NodePath) -> Self {
        Self::NodePath(path)
    }
}

impl<'a> From<&'a Node> for Locator<'a> {
    fn from(node: &'a Node) -> Self {
        Self::Node(node)
    }
}

struct NodeState {
    path: NodePath,
    parent: Weak<NodeInner>,
    closed: bool,
}

pub(crate) struct NodeInner {
    entry: EntryId,
    class: NodeClass,
    file: Weak<FileShared>,
    state: RwLock<NodeState>,
    members: RwLock<BTreeMap<String, Member>>,
}

/// Handle to a node of an open file.
#[derive(Clone)]
pub struct Node {
    inner: Arc<NodeInner>,
}

impl Node {
    pub(crate) fn new(
        entry: EntryId,
        class: NodeClass,
        path: NodePath,
        parent: Option<&Node>,
        file: Weak<FileShared>,
    ) -> Self {
        Self {
            inner: Arc::new(NodeInner {
                entry,
                class,
                file,
                state: RwLock::new(NodeState {
                    path,
                    parent: parent.map(|p| Arc::downgrade(&p.inner)).unwrap_or_default(),
                    closed: false,
                }),
                members: RwLock::new(BTreeMap::new()),
            }),
        }
    }

    fn state(&self) -> RwLockReadGuard<'_, NodeState> {
        self.inner.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn state_mut(&self) -> RwLockWriteGuard<'_, NodeState> {
        self.inner.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn members(&self) -> RwLockReadGuard<'_, BTreeMap<String, Member>> {
        self.inner.members.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn members_mut(&self) -> RwLockWriteGuard<'_, BTreeMap<String, Member>> {
        self.inner.members.write().unwrap_or_else(PoisonError::into_inner)
    }

    // -----------------------------------------------------------------------
    // Crate-internal bookkeeping (driven by the session)
    // -----------------------------------------------------------------------

    pub(crate) fn entry(&self) -> EntryId {
        self.inner.entry
    }

    pub(crate) fn belongs_to(&self, file: &Weak<FileShared>) -> bool {
        Weak::ptr_eq(&self.inner.file, file)
    }

    pub(crate) fn set_path(&self, path: NodePath) {
        self.state_mut().path = path;
    }

    pub(crate) fn set_parent(&self, parent: &Node) {
        self.state_mut().parent = Arc::downgrade(&parent.inner);
    }

    pub(crate) fn has_member(&self, name: &str) -> bool {
        self.members().contains_key(name)
    }

    /// Detach this instance: it keeps its last path for error messages but
    /// drops its parent link and every front-end member.
    pub(crate) fn mark_closed(&self) {
        {
            let mut state = self.state_mut();
            state.closed = true;
            state.parent = Weak::new();
        }
        let members = std::mem::take(&mut *self.members_mut());
        drop(members);
    }

    /// Run `f` against the owning session after checking this handle.
    pub(crate) fn with_session<T>(
        &self,
        f: impl FnOnce(&mut OpenSession) -> TreeResult<T>,
    ) -> TreeResult<T> {
        if self.is_closed() {
            return Err(TreeError::ClosedNode { path: self.path() });
        }
        let file = self.inner.file.upgrade().ok_or(TreeError::ClosedFile)?;
        file.with_open(|session| {
            session.check_handle(self)?;
            f(session)
        })
    }

    // -----------------------------------------------------------------------
    // Identity and location
    // -----------------------------------------------------------------------

    /// Returns `true` if both handles refer to the same node instance.
    pub fn ptr_eq(&self, other: &Node) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// The node's path. For a closed node, the last path it had.
    pub fn path(&self) -> NodePath {
        self.state().path.clone()
    }

    /// The last path segment (`/` for the root).
    pub fn name(&self) -> String {
        self.state().path.name().to_string()
    }

    pub fn depth(&self) -> usize {
        self.state().path.depth()
    }

    pub fn class(&self) -> NodeClass {
        self.inner.class
    }

    pub fn is_group(&self) -> bool {
        self.inner.class.is_group()
    }

    pub fn is_leaf(&self) -> bool {
        self.inner.class.is_leaf()
    }

    pub fn is_closed(&self) -> bool {
        self.state().closed
    }

    /// The parent instance; `None` for the root and for closed nodes.
    pub fn parent(&self) -> Option<Node> {
        self.state().parent.upgrade().map(|inner| Node { inner })
    }

    /// The file this node belongs to, if it is still alive.
    pub fn file(&self) -> Option<File> {
        self.inner.file.upgrade().map(File::from_shared)
    }

    // -----------------------------------------------------------------------
    // Session-backed accessors
    // -----------------------------------------------------------------------

    /// The persisted attributes of this node.
    pub fn attrs(&self) -> TreeResult<AttributeSet> {
        if self.is_closed() {
            return Err(TreeError::ClosedNode { path: self.path() });
        }
        Ok(AttributeSet::new(self.clone()))
    }

    /// The `TITLE` attribute, or an empty string.
    pub fn title(&self) -> TreeResult<String> {
        self.with_session(|s| {
            Ok(s.attr_get(self, TITLE)?
                .and_then(|v| v.as_str().map(str::to_string))
                .unwrap_or_default())
        })
    }

    /// The persisted child `name`, ignoring front-end members.
    pub fn child(&self, name: &str) -> TreeResult<Node> {
        self.with_session(|s| s.child(self, name))
    }

    /// Sorted names of the persisted children of a group.
    pub fn list_children(&self) -> TreeResult<Vec<String>> {
        self.with_session(|s| s.list_children(self))
    }

    /// Look `name` up as a front-end member first, then as a child.
    pub fn member(&self, name: &str) -> TreeResult<Member> {
        self.with_session(|s| {
            if let Some(member) = self.members().get(name) {
                return Ok(member.clone());
            }
            if !self.is_group() {
                return Err(TreeError::NoSuchNode {
                    path: self.path().join(name)?,
                });
            }
            s.child(self, name).map(Member::Node)
        })
    }

    /// Assign a front-end member. A same-named child is shadowed, never
    /// touched.
    pub fn set_member(&self, name: &str, member: impl Into<Member>) -> TreeResult<()> {
        let member = member.into();
        self.with_session(|s| {
            s.check_member_name(self, name)?;
            self.members_mut().insert(name.to_string(), member);
            Ok(())
        })
    }

    /// Remove a front-end member, revealing any same-named child.
    pub fn del_member(&self, name: &str) -> TreeResult<()> {
        self.with_session(|_| match self.members_mut().remove(name) {
            Some(_) => Ok(()),
            None => Err(TreeError::NoSuchMember {
                path: self.path(),
                name: name.to_string(),
            }),
        })
    }

    /// Names of the assigned front-end members.
    pub fn member_names(&self) -> Vec<String> {
        self.members().keys().cloned().collect()
    }

    /// Read a slice of a leaf's payload in the leaf's flavor.
    pub fn read(&self, range: &SliceRange) -> TreeResult<LeafData> {
        self.with_session(|s| s.read_leaf(self, range))
    }

    /// Read a leaf's whole payload.
    pub fn read_all(&self) -> TreeResult<LeafData> {
        self.read(&SliceRange::full())
    }

    /// The flavor `read` uses for this leaf.
    pub fn flavor(&self) -> TreeResult<Flavor> {
        self.with_session(|s| s.leaf_flavor(self))
    }

    /// Persist a new flavor for this leaf.
    pub fn set_flavor(&self, name: &str) -> TreeResult<()> {
        self.with_session(|s| s.set_flavor(self, name))
    }

    /// Close this node and every attached descendant.
    ///
    /// The stored data is untouched; a later lookup yields a new instance.
    /// Closing a closed node does nothing.
    pub fn close(&self) -> TreeResult<()> {
        if self.is_closed() {
            return Ok(());
        }
        self.with_session(|s| {
            s.cache.evict(&self.path());
            Ok(())
        })
    }
}

impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl Eq for Node {}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state();
        f.debug_struct("Node")
            .field("path", &state.path)
            .field("class", &self.inner.class)
            .field("closed", &state.closed)
            .finish()
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state();
        write!(f, "{} ({})", state.path, self.inner.class.class_tag())?;
        if state.closed {
            write!(f, " [closed]")?;
        }
        Ok(())
    }
}
