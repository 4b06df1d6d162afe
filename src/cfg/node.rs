//! Node handles for the flow graph arena.
//!
//! The flow graph mutually links predecessors and successors, which would be
//! an ownership cycle with owned pointers. Nodes therefore live in an arena
//! indexed by [`NodeId`]; cycles are just index pairs.

use std::fmt;

/// Unique identifier for a node in a [`crate::cfg::FlowGraph`].
///
/// This is a lightweight handle into the graph's node arena, providing O(1)
/// access to node data. The identifier is unique within a single graph but
/// not globally unique across graphs.
///
/// # Examples
///
/// ```rust
/// use shadelift::cfg::NodeId;
///
/// let id = NodeId::new(3);
/// assert_eq!(id.index(), 3);
/// assert_eq!(id.to_string(), "n3");
/// ```
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
    /// Creates a new node identifier.
    ///
    /// # Arguments
    ///
    /// * `index` - The index into the graph's node arena
    #[must_use]
    pub const fn new(index: usize) -> Self {
        Self(index)
    }

    /// Returns the underlying arena index.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeId({})", self.0)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "n{}", self.0)
    }
}

impl From<usize> for NodeId {
    fn from(index: usize) -> Self {
        Self(index)
    }
}

impl From<NodeId> for usize {
    fn from(id: NodeId) -> Self {
        id.0
    }
}
