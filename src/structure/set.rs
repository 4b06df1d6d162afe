//! The structure tree arena.
//!
//! A [`SetNode`] owns a set of flow graph nodes called its *body*,
//! partitioned into one or more disjoint *sub-bodies* whose union is
//! exactly the body. Children are structure nodes whose body is a strict
//! subset of exactly one sub-body of the parent. [`StructureTree::insert`]
//! walks down to the deepest node that can contain a new node and
//! re-parents existing children underneath it, so recovery passes may
//! discover structures in any order.

use std::collections::HashSet;
use std::fmt;

use crate::cfg::NodeId;
use crate::Result;

/// Handle to a node in the structure tree arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SetId(u32);

impl SetId {
    /// Returns the underlying arena index.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for SetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "s{}", self.0)
    }
}

/// The structural variant of a tree node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SetKind {
    /// The whole-procedure root.
    Root,

    /// A maximal straight-line chain with interior in-degree one.
    Sequence,

    /// A one-sided conditional.
    If {
        /// The two-way branch node heading the conditional.
        branch: NodeId,
        /// The entry of the guarded arm.
        arm: NodeId,
        /// `true` when the arm hangs off the false edge, so the emitted
        /// condition is the branch condition negated.
        inverted: bool,
    },

    /// A two-sided conditional with disjoint arms.
    IfElse {
        /// The two-way branch node heading the conditional.
        branch: NodeId,
        /// The entry of the taken-branch arm.
        then_entry: NodeId,
        /// The entry of the fall-through arm.
        else_entry: NodeId,
    },

    /// A loop recovered from a strongly connected component.
    Loop {
        /// The jump label owned by this loop.
        label: u32,
        /// The sole entry node of the loop body.
        entry: NodeId,
        /// Where control continues after the loop, when the loop has an
        /// exit at all.
        escape: Option<NodeId>,
    },

    /// A labelled block introduced at an irreducible sibling merge.
    LabelledBlock {
        /// The jump label owned by this block.
        label: u32,
        /// The node control re-merges on; it lies outside the block body
        /// and jumps to it from inside become breaks.
        exit: NodeId,
    },
}

impl SetKind {
    /// Returns the jump label owned by this node, if the variant has one.
    #[must_use]
    pub const fn label(&self) -> Option<u32> {
        match self {
            Self::Loop { label, .. } | Self::LabelledBlock { label, .. } => Some(*label),
            _ => None,
        }
    }
}

/// One node of the structure tree.
#[derive(Debug, Clone)]
pub struct SetNode {
    kind: SetKind,
    body: HashSet<NodeId>,
    sub_bodies: Vec<HashSet<NodeId>>,
    parent: Option<SetId>,
    children: Vec<SetId>,
}

impl SetNode {
    /// Returns the structural variant.
    #[must_use]
    pub fn kind(&self) -> &SetKind {
        &self.kind
    }

    /// Returns the flow graph nodes this node owns.
    #[must_use]
    pub fn body(&self) -> &HashSet<NodeId> {
        &self.body
    }

    /// Returns the disjoint partition of the body.
    #[must_use]
    pub fn sub_bodies(&self) -> &[HashSet<NodeId>] {
        &self.sub_bodies
    }

    /// Returns the parent handle, `None` for the root.
    #[must_use]
    pub const fn parent(&self) -> Option<SetId> {
        self.parent
    }

    /// Returns the direct children, in insertion order.
    #[must_use]
    pub fn children(&self) -> &[SetId] {
        &self.children
    }
}

/// Arena of structure nodes rooted at the whole-procedure node.
#[derive(Debug, Clone)]
pub struct StructureTree {
    nodes: Vec<SetNode>,
    root: SetId,
    next_label: u32,
}

impl StructureTree {
    /// Creates a tree whose root owns `body` as a single sub-body.
    #[must_use]
    pub fn new(body: HashSet<NodeId>) -> Self {
        let root = SetNode {
            kind: SetKind::Root,
            sub_bodies: vec![body.clone()],
            body,
            parent: None,
            children: Vec::new(),
        };
        Self {
            nodes: vec![root],
            root: SetId(0),
            next_label: 0,
        }
    }

    /// Returns the root handle.
    #[must_use]
    pub const fn root(&self) -> SetId {
        self.root
    }

    /// Returns the node behind `id`.
    #[must_use]
    pub fn node(&self, id: SetId) -> &SetNode {
        &self.nodes[id.index()]
    }

    /// Iterates over every node handle in the arena.
    pub fn set_ids(&self) -> impl Iterator<Item = SetId> + '_ {
        (0..self.nodes.len()).map(|i| SetId(i as u32))
    }

    /// Returns the number of structure nodes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns `true` if the tree holds only the root.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.len() <= 1
    }

    /// Allocates a fresh jump label.
    pub fn fresh_label(&mut self) -> u32 {
        let label = self.next_label;
        self.next_label += 1;
        label
    }

    /// Returns the deepest node whose body contains `node`.
    #[must_use]
    pub fn deepest_containing(&self, node: NodeId) -> SetId {
        let mut current = self.root;
        'descend: loop {
            for &child in &self.nodes[current.index()].children {
                if self.nodes[child.index()].body.contains(&node) {
                    current = child;
                    continue 'descend;
                }
            }
            return current;
        }
    }

    /// Returns the structure node owning `label`, if any.
    #[must_use]
    pub fn labelled(&self, label: u32) -> Option<SetId> {
        self.set_ids()
            .find(|&id| self.nodes[id.index()].kind.label() == Some(label))
    }

    /// Inserts a new structure node.
    ///
    /// Walks down to the deepest existing node whose body contains the new
    /// body, attaches the new node under it, and re-parents any of its
    /// children that fall inside the new body.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::StructuralInvariant`] when the body does not
    /// fit inside a single sub-body of the chosen parent, or a re-parented
    /// child straddles the new partition.
    pub fn insert(
        &mut self,
        kind: SetKind,
        body: HashSet<NodeId>,
        sub_bodies: Vec<HashSet<NodeId>>,
    ) -> Result<SetId> {
        let parent = self.containing_parent(&body);
        self.fitting_sub_body(parent, &body)?;

        let id = SetId(self.nodes.len() as u32);
        let adopted: Vec<SetId> = self.nodes[parent.index()]
            .children
            .iter()
            .copied()
            .filter(|&child| self.nodes[child.index()].body.is_subset(&body))
            .collect();
        self.nodes[parent.index()]
            .children
            .retain(|child| !adopted.contains(child));
        self.nodes[parent.index()].children.push(id);

        let node = SetNode {
            kind,
            body,
            sub_bodies,
            parent: Some(parent),
            children: adopted.clone(),
        };
        self.nodes.push(node);

        for child in adopted {
            self.nodes[child.index()].parent = Some(id);
            let child_body = self.nodes[child.index()].body.clone();
            self.fitting_sub_body(id, &child_body)?;
        }
        Ok(id)
    }

    /// Checks the partition invariant on every node.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::StructuralInvariant`] when some node's
    /// sub-bodies overlap or fail to cover its body.
    pub fn check_partition(&self) -> Result<()> {
        for id in self.set_ids() {
            let node = &self.nodes[id.index()];
            let mut seen: HashSet<NodeId> = HashSet::new();
            for sub_body in &node.sub_bodies {
                for &member in sub_body {
                    if !seen.insert(member) {
                        return Err(structural_error!(
                            "sub-bodies of {id} overlap on {member}"
                        ));
                    }
                }
            }
            if seen != node.body {
                return Err(structural_error!(
                    "sub-bodies of {id} do not cover its body"
                ));
            }
        }
        Ok(())
    }

    /// Adds freshly synthesized flow graph nodes to every body on the
    /// path from the root to the deepest node containing `anchor`.
    ///
    /// Dispatch synthesis creates nodes after the tree's bodies were
    /// captured; they join the region the anchor already lives in.
    pub(crate) fn extend_containing(&mut self, anchor: NodeId, nodes: &HashSet<NodeId>) {
        let mut current = self.root;
        loop {
            let node = &mut self.nodes[current.index()];
            node.body.extend(nodes.iter().copied());
            if let Some(sub_body) = node
                .sub_bodies
                .iter_mut()
                .find(|sub_body| sub_body.contains(&anchor))
            {
                sub_body.extend(nodes.iter().copied());
            }
            let next = self.nodes[current.index()]
                .children
                .iter()
                .copied()
                .find(|&child| self.nodes[child.index()].body.contains(&anchor));
            match next {
                Some(child) => current = child,
                None => break,
            }
        }
    }

    /// Returns the deepest existing node whose body contains `body`.
    fn containing_parent(&self, body: &HashSet<NodeId>) -> SetId {
        let mut current = self.root;
        'descend: loop {
            for &child in &self.nodes[current.index()].children {
                if body.is_subset(&self.nodes[child.index()].body) {
                    current = child;
                    continue 'descend;
                }
            }
            return current;
        }
    }

    fn fitting_sub_body(&self, parent: SetId, body: &HashSet<NodeId>) -> Result<()> {
        let node = &self.nodes[parent.index()];
        if node
            .sub_bodies
            .iter()
            .any(|sub_body| body.is_subset(sub_body))
        {
            Ok(())
        } else {
            Err(structural_error!(
                "body of a new child straddles the sub-body partition of {parent}"
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn n(index: usize) -> NodeId {
        NodeId::new(index)
    }

    fn set(members: &[usize]) -> HashSet<NodeId> {
        members.iter().map(|&i| n(i)).collect()
    }

    fn sequence(tree: &mut StructureTree, members: &[usize]) -> SetId {
        tree.insert(SetKind::Sequence, set(members), vec![set(members)])
            .unwrap()
    }

    #[test]
    fn test_insert_nests_under_deepest_container() {
        let mut tree = StructureTree::new(set(&[0, 1, 2, 3, 4]));
        let label = tree.fresh_label();
        let outer = tree
            .insert(
                SetKind::Loop {
                    label,
                    entry: n(1),
                    escape: Some(n(4)),
                },
                set(&[1, 2, 3]),
                vec![set(&[1, 2, 3])],
            )
            .unwrap();
        let inner = sequence(&mut tree, &[2, 3]);

        assert_eq!(tree.node(inner).parent(), Some(outer));
        assert_eq!(tree.node(outer).children(), &[inner]);
        assert_eq!(tree.deepest_containing(n(2)), inner);
        assert_eq!(tree.deepest_containing(n(0)), tree.root());
    }

    #[test]
    fn test_insert_reparents_enclosed_children() {
        let mut tree = StructureTree::new(set(&[0, 1, 2, 3]));
        let inner = sequence(&mut tree, &[1, 2]);
        // The enclosing node arrives after its future child.
        let label = tree.fresh_label();
        let outer = tree
            .insert(
                SetKind::Loop {
                    label,
                    entry: n(1),
                    escape: Some(n(3)),
                },
                set(&[1, 2]),
                vec![set(&[1, 2])],
            )
            .unwrap();

        assert_eq!(tree.node(inner).parent(), Some(outer));
        assert_eq!(tree.node(outer).parent(), Some(tree.root()));
        assert_eq!(tree.node(tree.root()).children(), &[outer]);
    }

    #[test]
    fn test_insert_rejects_straddling_body() {
        let mut tree = StructureTree::new(set(&[0, 1, 2, 3]));
        tree.insert(
            SetKind::IfElse {
                branch: n(0),
                then_entry: n(1),
                else_entry: n(2),
            },
            set(&[0, 1, 2]),
            vec![set(&[0]), set(&[1]), set(&[2])],
        )
        .unwrap();
        // A chain across both arms fits inside no single sub-body.
        let err = tree
            .insert(SetKind::Sequence, set(&[1, 2]), vec![set(&[1, 2])])
            .unwrap_err();
        assert!(matches!(err, crate::Error::StructuralInvariant { .. }));
    }

    #[test]
    fn test_check_partition_detects_overlap_and_gap() {
        let mut tree = StructureTree::new(set(&[0, 1]));
        sequence(&mut tree, &[0, 1]);
        assert!(tree.check_partition().is_ok());

        let mut overlapping = StructureTree::new(set(&[0, 1]));
        overlapping
            .insert(
                SetKind::IfElse {
                    branch: n(0),
                    then_entry: n(1),
                    else_entry: n(1),
                },
                set(&[0, 1]),
                vec![set(&[0, 1]), set(&[1])],
            )
            .unwrap();
        assert!(overlapping.check_partition().is_err());

        let gapped = StructureTree::new(set(&[0, 1]));
        let mut gapped = gapped;
        gapped
            .insert(SetKind::Sequence, set(&[0, 1]), vec![set(&[0])])
            .unwrap();
        assert!(gapped.check_partition().is_err());
    }

    #[test]
    fn test_labelled_lookup() {
        let mut tree = StructureTree::new(set(&[0, 1, 2]));
        let label = tree.fresh_label();
        let block = tree
            .insert(
                SetKind::LabelledBlock { label, exit: n(2) },
                set(&[0, 1]),
                vec![set(&[0, 1])],
            )
            .unwrap();
        assert_eq!(tree.labelled(label), Some(block));
        assert_eq!(tree.labelled(label + 1), None);
    }
}
