//! JSquared DOM - Element event bindings
//!
//! Per-node, per-event-type dispatchers with bubbling, delegates and
//! cross-browser event normalization. Nodes are referred to by [`NodeId`];
//! the tree that owns them is reached through [`NodeParents`].

mod binding;
mod delegate;
mod dom_events;
mod tree;

pub use binding::{BoundNode, ElementBindings};
pub use delegate::DelegateCheck;
pub use dom_events::{DomEvent, MousePosition, RawEvent, ScrollOffset};
pub use tree::{NodeParents, ParentMap};

pub use j2_core::{Context, Dispatcher, Listener, Priority, Verdict};

use serde::{Deserialize, Serialize};

/// Host-assigned node identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub u32);

impl NodeId {
    /// Document node
    pub const ROOT: NodeId = NodeId(0);
}

/// Listener for DOM events. Its context is the node handling the event.
pub type EventListener = Listener<DomEvent>;

/// Result alias for binding operations
pub type Result<T> = std::result::Result<T, DomError>;

/// Binding error
#[derive(Debug, thiserror::Error)]
pub enum DomError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Parenting {child:?} under {parent:?} would create a cycle")]
    Cycle { child: NodeId, parent: NodeId },

    #[error(transparent)]
    Dispatch(#[from] j2_core::DispatchError),
}

/// Node handling the current invocation, from a listener's context
pub fn context_node(ctx: &Context) -> Option<NodeId> {
    ctx.downcast::<NodeId>().copied()
}
