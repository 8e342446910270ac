//! Lazy tree traversal.

use std::collections::VecDeque;

use grove_path::NodePath;

use crate::error::TreeResult;
use crate::file::File;
use crate::node::Node;

/// Traversal order for [`File::walk`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum WalkOrder {
    /// Pre-order: a group, then each child subtree in name order.
    #[default]
    DepthFirst,
    /// Level by level, children in name order.
    BreadthFirst,
}

/// Iterator over the nodes below (and including) a starting group.
///
/// Each step resolves one node under the session lock, so a closed
/// session surfaces as an error on the next call. The first error ends
/// the walk.
pub struct Walk {
    file: File,
    order: WalkOrder,
    pending: VecDeque<NodePath>,
}

impl Walk {
    pub(crate) fn new(file: File, start: NodePath, order: WalkOrder) -> Self {
        Self {
            file,
            order,
            pending: VecDeque::from([start]),
        }
    }

    fn visit(&mut self, path: &NodePath) -> TreeResult<Node> {
        let (node, children) = self.file.shared().with_open(|s| {
            let node = s.resolve(path)?;
            let children = if node.is_group() {
                s.list_children(&node)?
            } else {
                Vec::new()
            };
            Ok((node, children))
        })?;
        let mut paths = children
            .iter()
            .map(|name| path.join(name))
            .collect::<Result<Vec<_>, _>>()?;
        match self.order {
            WalkOrder::DepthFirst => {
                paths.reverse();
                self.pending.extend(paths);
            }
            WalkOrder::BreadthFirst => self.pending.extend(paths),
        }
        Ok(node)
    }
}

impl Iterator for Walk {
    type Item = TreeResult<Node>;

    fn next(&mut self) -> Option<Self::Item> {
        let path = match self.order {
            WalkOrder::DepthFirst => self.pending.pop_back()?,
            WalkOrder::BreadthFirst => self.pending.pop_front()?,
        };
        let result = self.visit(&path);
        if result.is_err() {
            self.pending.clear();
        }
        Some(result)
    }
}
