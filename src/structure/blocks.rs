//! Labelled-block synthesis and sibling ordering.
//!
//! Within one region of the structure tree, the recovered children and the
//! remaining bare flow graph nodes form a set of *siblings*. This module
//! orders them by an extended topological sort (depth-first from the
//! region's entries, back edges ignored) and introduces a labelled block
//! wherever a sibling is entered by more than one earlier sibling: the
//! prefix up to the merge becomes the block, the merge target becomes its
//! exit, and jumps to the exit from inside become breaks. The computed
//! sibling order is reused verbatim by AST lowering, so statements come out
//! in execution order.

use std::collections::{HashMap, HashSet};

use crate::cfg::{FlowGraph, NodeId};
use crate::structure::set::{SetId, SetKind, StructureTree};
use crate::Result;

/// One sibling of a region: a recovered child structure or a bare node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Sibling {
    /// A flow graph node owned by no child structure.
    Bare(NodeId),
    /// A child structure node, standing in for its whole body.
    Structure(SetId),
}

/// The siblings of one region, in extended topological order.
#[derive(Debug, Clone)]
pub(crate) struct SiblingGraph {
    /// The siblings, ordered.
    pub(crate) order: Vec<Sibling>,
    /// Members of each sibling, sorted, aligned with `order`.
    pub(crate) members: Vec<Vec<NodeId>>,
    /// Successor positions per sibling, deduplicated, in first-seen order.
    pub(crate) succs: Vec<Vec<usize>>,
    /// Predecessor positions per sibling.
    pub(crate) preds: Vec<Vec<usize>>,
    /// Flow graph node to owning sibling position.
    pub(crate) owner_of: HashMap<NodeId, usize>,
}

impl SiblingGraph {
    /// Returns the position of the sibling owning `node`, if it is in the
    /// region.
    pub(crate) fn position_of(&self, node: NodeId) -> Option<usize> {
        self.owner_of.get(&node).copied()
    }
}

/// Computes the ordered sibling graph of `region`, one sub-body of `owner`.
pub(crate) fn sibling_graph(
    graph: &FlowGraph,
    tree: &StructureTree,
    owner: SetId,
    region: &HashSet<NodeId>,
) -> SiblingGraph {
    let mut raw: Vec<Sibling> = Vec::new();
    let mut members: Vec<Vec<NodeId>> = Vec::new();
    let mut owner_of: HashMap<NodeId, usize> = HashMap::new();
    for &child in tree.node(owner).children() {
        if tree.node(child).body().is_subset(region) {
            let index = raw.len();
            raw.push(Sibling::Structure(child));
            let mut body: Vec<NodeId> = tree.node(child).body().iter().copied().collect();
            body.sort_unstable();
            for &member in &body {
                owner_of.insert(member, index);
            }
            members.push(body);
        }
    }
    let mut bare: Vec<NodeId> = region
        .iter()
        .copied()
        .filter(|node| !owner_of.contains_key(node))
        .collect();
    bare.sort_unstable();
    for node in bare {
        owner_of.insert(node, raw.len());
        raw.push(Sibling::Bare(node));
        members.push(vec![node]);
    }

    let count = raw.len();
    let mut succs: Vec<Vec<usize>> = vec![Vec::new(); count];
    for (index, nodes) in members.iter().enumerate() {
        for &node in nodes {
            for &(succ, _) in graph.successors(node) {
                if let Some(&target) = owner_of.get(&succ) {
                    if target != index && !succs[index].contains(&target) {
                        succs[index].push(target);
                    }
                }
            }
        }
    }

    // Entry siblings: those control can enter from outside the region.
    let mut roots: Vec<usize> = (0..count)
        .filter(|&index| {
            members[index].iter().any(|&node| {
                node == graph.start()
                    || graph
                        .predecessors(node)
                        .iter()
                        .any(|pred| !region.contains(pred))
            })
        })
        .collect();
    roots.sort_by_key(|&index| members[index][0]);

    // Reverse postorder from the roots; back edges are skipped by the
    // visited check, which is the whole of "extended" topological sorting.
    let mut visited = vec![false; count];
    let mut postorder: Vec<usize> = Vec::new();
    for &root in &roots {
        if visited[root] {
            continue;
        }
        visited[root] = true;
        let mut stack: Vec<(usize, usize)> = vec![(root, 0)];
        while let Some((sibling, next)) = stack.pop() {
            if next < succs[sibling].len() {
                stack.push((sibling, next + 1));
                let succ = succs[sibling][next];
                if !visited[succ] {
                    visited[succ] = true;
                    stack.push((succ, 0));
                }
            } else {
                postorder.push(sibling);
            }
        }
    }
    let mut order_indices: Vec<usize> = postorder;
    order_indices.reverse();
    for index in 0..count {
        if !visited[index] {
            order_indices.push(index);
        }
    }

    let mut position = vec![0usize; count];
    for (pos, &index) in order_indices.iter().enumerate() {
        position[index] = pos;
    }
    let order: Vec<Sibling> = order_indices.iter().map(|&index| raw[index]).collect();
    let ordered_members: Vec<Vec<NodeId>> = order_indices
        .iter()
        .map(|&index| members[index].clone())
        .collect();
    let mut ordered_succs: Vec<Vec<usize>> = vec![Vec::new(); count];
    let mut ordered_preds: Vec<Vec<usize>> = vec![Vec::new(); count];
    for (index, targets) in succs.iter().enumerate() {
        for &target in targets {
            ordered_succs[position[index]].push(position[target]);
            ordered_preds[position[target]].push(position[index]);
        }
    }
    for node_owner in owner_of.values_mut() {
        *node_owner = position[*node_owner];
    }

    SiblingGraph {
        order,
        members: ordered_members,
        succs: ordered_succs,
        preds: ordered_preds,
        owner_of,
    }
}

/// Returns the node control enters `sibling` through.
pub(crate) fn sibling_entry(
    graph: &FlowGraph,
    tree: &StructureTree,
    sibling: Sibling,
) -> Result<NodeId> {
    match sibling {
        Sibling::Bare(node) => Ok(node),
        Sibling::Structure(id) => structure_entry(graph, tree, id),
    }
}

fn structure_entry(graph: &FlowGraph, tree: &StructureTree, id: SetId) -> Result<NodeId> {
    let node = tree.node(id);
    match *node.kind() {
        SetKind::Loop { entry, .. } => Ok(entry),
        SetKind::If { branch, .. } | SetKind::IfElse { branch, .. } => Ok(branch),
        SetKind::Root | SetKind::Sequence | SetKind::LabelledBlock { .. } => {
            let body = node.body();
            body.iter()
                .copied()
                .filter(|&member| {
                    member == graph.start()
                        || graph
                            .predecessors(member)
                            .iter()
                            .any(|pred| !body.contains(pred))
                })
                .min()
                .or_else(|| body.iter().copied().min())
                .ok_or_else(|| structural_error!("structure node {id} has an empty body"))
        }
    }
}

/// Introduces labelled blocks at irreducible sibling merges.
///
/// # Errors
///
/// Propagates tree insertion errors.
pub fn recover_blocks(graph: &FlowGraph, tree: &mut StructureTree) -> Result<()> {
    let sets: Vec<SetId> = tree.set_ids().collect();
    for owner in sets {
        let sub_bodies: Vec<HashSet<NodeId>> = tree.node(owner).sub_bodies().to_vec();
        for region in &sub_bodies {
            synthesize_in_region(graph, tree, owner, region)?;
        }
    }
    Ok(())
}

fn synthesize_in_region(
    graph: &FlowGraph,
    tree: &mut StructureTree,
    owner: SetId,
    region: &HashSet<NodeId>,
) -> Result<()> {
    let siblings = sibling_graph(graph, tree, owner, region);
    let merges: Vec<usize> = (0..siblings.order.len())
        .filter(|&pos| {
            siblings.preds[pos]
                .iter()
                .filter(|&&pred| pred < pos)
                .count()
                > 1
        })
        .collect();
    for merge in merges {
        let mut body: HashSet<NodeId> = HashSet::new();
        for nodes in &siblings.members[..merge] {
            body.extend(nodes.iter().copied());
        }
        let exit = sibling_entry(graph, tree, siblings.order[merge])?;
        let label = tree.fresh_label();
        tree.insert(
            SetKind::LabelledBlock { label, exit },
            body.clone(),
            vec![body],
        )?;
    }
    Ok(())
}
