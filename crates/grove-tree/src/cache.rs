//! Registry of attached node instances.

use std::cmp::Reverse;
use std::collections::BTreeMap;

use grove_path::NodePath;
use tracing::debug;

use crate::node::Node;

/// Path-keyed registry holding at most one live node per path.
///
/// Only tree operations register, evict and rebase; lookups go through
/// the session.
#[derive(Default)]
pub(crate) struct NodeCache {
    nodes: BTreeMap<NodePath, Node>,
}

impl NodeCache {
    pub(crate) fn get(&self, path: &NodePath) -> Option<Node> {
        self.nodes.get(path).cloned()
    }

    pub(crate) fn register(&mut self, node: Node) {
        let previous = self.nodes.insert(node.path(), node);
        debug_assert!(previous.is_none(), "two live nodes registered for one path");
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.nodes.len()
    }

    fn paths_under(&self, path: &NodePath) -> Vec<NodePath> {
        self.nodes
            .keys()
            .filter(|k| path.contains(k))
            .cloned()
            .collect()
    }

    /// Close and drop `path` and every attached descendant, deepest first.
    ///
    /// The store is not touched.
    pub(crate) fn evict(&mut self, path: &NodePath) -> usize {
        let mut victims = self.paths_under(path);
        victims.sort_by_key(|p| Reverse(p.depth()));
        for victim in &victims {
            if let Some(node) = self.nodes.remove(victim) {
                node.mark_closed();
            }
        }
        if !victims.is_empty() {
            debug!(path = %path, closed = victims.len(), "evicted nodes");
        }
        victims.len()
    }

    /// Re-key `old` and its attached descendants under `new`, updating the
    /// paths stored in the instances.
    pub(crate) fn rebase(&mut self, old: &NodePath, new: &NodePath) {
        let moved: Vec<(NodePath, Node)> = self
            .paths_under(old)
            .into_iter()
            .filter_map(|p| self.nodes.remove(&p).map(|n| (p, n)))
            .collect();
        for (path, node) in moved {
            if let Some(rebased) = path.rebase(old, new) {
                node.set_path(rebased.clone());
                self.nodes.insert(rebased, node);
            }
        }
    }

    /// Close every attached node.
    pub(crate) fn close_all(&mut self) -> usize {
        self.evict(&NodePath::root())
    }
}
