//! Break and continue discovery.
//!
//! Once every loop and labelled block exists, the flat edges that are left
//! over are classified against the jump targets those structures own: an
//! edge to an enclosing loop's escaping successor or an enclosing block's
//! exit is a break, an edge back to an enclosing loop's entry is a
//! continue. The classification walks structural ancestors innermost
//! first, so a jump past an inner loop lands on the outer structure and
//! keeps its label. The resulting [`JumpTable`] is consumed by AST
//! lowering; the edges themselves stay in the graph untouched.

use std::collections::HashMap;

use crate::cfg::{FlowGraph, NodeId};
use crate::structure::set::{SetId, SetKind, StructureTree};

/// Which statement an edge lowers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JumpKind {
    /// The edge leaves the structure towards its continuation.
    Break,
    /// The edge returns to the loop entry for the next iteration.
    Continue,
}

/// A classified edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Jump {
    /// Break or continue.
    pub kind: JumpKind,
    /// The structure node the jump refers to.
    pub target: SetId,
    /// The jump label that structure owns.
    pub label: u32,
}

/// Every classified edge of a procedure, keyed by edge endpoints.
#[derive(Debug, Clone, Default)]
pub struct JumpTable {
    jumps: HashMap<(NodeId, NodeId), Jump>,
}

impl JumpTable {
    /// Returns the classification of the edge from `from` to `to`, if any.
    #[must_use]
    pub fn get(&self, from: NodeId, to: NodeId) -> Option<&Jump> {
        self.jumps.get(&(from, to))
    }

    /// Returns the number of classified edges.
    #[must_use]
    pub fn len(&self) -> usize {
        self.jumps.len()
    }

    /// Returns `true` if no edge was classified.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.jumps.is_empty()
    }
}

/// Classifies every break edge, then every continue edge.
#[must_use]
pub fn discover_jumps(graph: &FlowGraph, tree: &StructureTree) -> JumpTable {
    let mut edges: Vec<(NodeId, NodeId)> = Vec::new();
    for from in graph.node_ids() {
        for &(to, _) in graph.successors(from) {
            if !edges.contains(&(from, to)) {
                edges.push((from, to));
            }
        }
    }

    let mut jumps: HashMap<(NodeId, NodeId), Jump> = HashMap::new();
    for &(from, to) in &edges {
        if let Some(jump) = classify_break(tree, from, to) {
            jumps.insert((from, to), jump);
        }
    }
    for &(from, to) in &edges {
        if jumps.contains_key(&(from, to)) {
            continue;
        }
        if let Some(jump) = classify_continue(tree, from, to) {
            jumps.insert((from, to), jump);
        }
    }
    JumpTable { jumps }
}

/// Walks ancestors of `from` for a loop escape or block exit equal to `to`.
fn classify_break(tree: &StructureTree, from: NodeId, to: NodeId) -> Option<Jump> {
    let mut current = Some(tree.deepest_containing(from));
    while let Some(id) = current {
        match *tree.node(id).kind() {
            SetKind::Loop { label, escape, .. } if escape == Some(to) => {
                return Some(Jump {
                    kind: JumpKind::Break,
                    target: id,
                    label,
                });
            }
            SetKind::LabelledBlock { label, exit } if exit == to => {
                return Some(Jump {
                    kind: JumpKind::Break,
                    target: id,
                    label,
                });
            }
            _ => {}
        }
        current = tree.node(id).parent();
    }
    None
}

/// Walks ancestors of `from` for a loop entry equal to `to`.
fn classify_continue(tree: &StructureTree, from: NodeId, to: NodeId) -> Option<Jump> {
    let mut current = Some(tree.deepest_containing(from));
    while let Some(id) = current {
        if let SetKind::Loop { label, entry, .. } = *tree.node(id).kind() {
            if entry == to {
                return Some(Jump {
                    kind: JumpKind::Continue,
                    target: id,
                    label,
                });
            }
        }
        current = tree.node(id).parent();
    }
    None
}
