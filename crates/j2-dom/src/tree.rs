//! Parent links of the host tree

use std::collections::HashMap;

use crate::{DomError, NodeId, Result};

/// Read access to the parent of each node.
///
/// Implemented by whatever owns the real tree; bindings only ever walk
/// upwards.
pub trait NodeParents {
    /// Parent of `node`, `None` for roots and unknown nodes
    fn parent(&self, node: NodeId) -> Option<NodeId>;

    /// Ancestors of `node`, nearest first
    fn ancestors(&self, node: NodeId) -> Vec<NodeId> {
        std::iter::successors(self.parent(node), |&n| self.parent(n)).collect()
    }

    /// DOM `contains`: true if `node` is `ancestor` or lies beneath it
    fn contains(&self, ancestor: NodeId, node: NodeId) -> bool {
        node == ancestor || std::iter::successors(self.parent(node), |&n| self.parent(n)).any(|n| n == ancestor)
    }
}

/// Standalone parent table
#[derive(Debug, Default, Clone)]
pub struct ParentMap {
    parents: HashMap<NodeId, NodeId>,
}

impl ParentMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach `child` under `parent`, replacing any previous parent
    pub fn set_parent(&mut self, child: NodeId, parent: NodeId) -> Result<()> {
        if self.contains(child, parent) {
            return Err(DomError::Cycle { child, parent });
        }
        self.parents.insert(child, parent);
        Ok(())
    }

    /// Detach `child` from its parent. Its own subtree stays intact.
    pub fn detach(&mut self, child: NodeId) -> Option<NodeId> {
        self.parents.remove(&child)
    }

    /// Number of parent links
    pub fn len(&self) -> usize {
        self.parents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parents.is_empty()
    }
}

impl NodeParents for ParentMap {
    fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.parents.get(&node).copied()
    }
}
