//! Persisted node attributes.

use grove_store::AttrValue;

use crate::error::TreeResult;
use crate::node::Node;

/// Node class tag (`GROUP`, `ARRAY`, `TABLE`).
pub const CLASS: &str = "CLASS";
/// Free-form node title.
pub const TITLE: &str = "TITLE";
/// Node format version.
pub const VERSION: &str = "VERSION";
/// Leaf data flavor.
pub const FLAVOR: &str = "FLAVOR";

/// Attribute names the tree maintains itself.
pub const SYSTEM_ATTRS: &[&str] = &[CLASS, TITLE, VERSION, FLAVOR];

/// Value written to `VERSION` on node creation.
pub const NODE_VERSION: &str = "1.0";

/// Returns `true` for the reserved system attribute names.
pub fn is_system_attr(name: &str) -> bool {
    SYSTEM_ATTRS.contains(&name)
}

/// The attribute set of one node.
///
/// Values are read from and written to the store on every access; nothing
/// is cached, so every handle to the same entry sees the same values.
#[derive(Clone, Debug)]
pub struct AttributeSet {
    node: Node,
}

impl AttributeSet {
    pub(crate) fn new(node: Node) -> Self {
        Self { node }
    }

    /// The node these attributes belong to.
    pub fn node(&self) -> &Node {
        &self.node
    }

    pub fn get(&self, name: &str) -> TreeResult<Option<AttrValue>> {
        self.node.with_session(|s| s.attr_get(&self.node, name))
    }

    /// Create or replace an attribute.
    pub fn set(&self, name: &str, value: impl Into<AttrValue>) -> TreeResult<()> {
        let value = value.into();
        self.node.with_session(|s| s.attr_set(&self.node, name, value))
    }

    /// Delete an attribute; fails with `NoSuchAttribute` if it is not set.
    pub fn delete(&self, name: &str) -> TreeResult<()> {
        self.node.with_session(|s| s.attr_delete(&self.node, name))
    }

    pub fn contains(&self, name: &str) -> TreeResult<bool> {
        Ok(self.get(name)?.is_some())
    }

    /// All attribute names, sorted.
    pub fn names(&self) -> TreeResult<Vec<String>> {
        self.node.with_session(|s| s.attr_names(&self.node))
    }

    /// Names set by users, i.e. everything but the system attributes.
    pub fn user_names(&self) -> TreeResult<Vec<String>> {
        let mut names = self.names()?;
        names.retain(|n| !is_system_attr(n));
        Ok(names)
    }

    pub fn system_names(&self) -> TreeResult<Vec<String>> {
        let mut names = self.names()?;
        names.retain(|n| is_system_attr(n));
        Ok(names)
    }
}
