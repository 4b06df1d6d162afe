//! Statement-sequence grouping.
//!
//! A maximal straight-line chain of statement nodes whose interior has
//! in-degree one becomes a [`SetKind::Sequence`] node. Branch and switch
//! nodes never join a chain; they head their own structures or lower as
//! guards. Singleton chains stay bare, the tree does not gain anything by
//! wrapping them.

use std::collections::{HashMap, HashSet};

use crate::cfg::{FlowGraph, FlowInstruction, NodeId};
use crate::structure::set::{SetId, SetKind, StructureTree};
use crate::Result;

/// Groups straight-line statement chains into sequence nodes.
///
/// # Errors
///
/// Propagates tree insertion errors.
pub fn recover_sequences(graph: &FlowGraph, tree: &mut StructureTree) -> Result<()> {
    let sets: Vec<SetId> = tree.set_ids().collect();
    for set_id in sets {
        let sub_bodies: Vec<HashSet<NodeId>> = tree.node(set_id).sub_bodies().to_vec();
        for region in sub_bodies {
            let bare = bare_statements(graph, tree, set_id, &region);
            for chain in chains(graph, &bare) {
                if chain.len() < 2 {
                    continue;
                }
                let body: HashSet<NodeId> = chain.into_iter().collect();
                tree.insert(SetKind::Sequence, body.clone(), vec![body])?;
            }
        }
    }
    Ok(())
}

/// Region statement nodes not owned by any child structure.
fn bare_statements(
    graph: &FlowGraph,
    tree: &StructureTree,
    set_id: SetId,
    region: &HashSet<NodeId>,
) -> HashSet<NodeId> {
    let mut bare: HashSet<NodeId> = region
        .iter()
        .copied()
        .filter(|&node| matches!(graph.instruction(node), FlowInstruction::Statement(_)))
        .collect();
    for &child in tree.node(set_id).children() {
        if tree.node(child).body().is_subset(region) {
            for node in tree.node(child).body() {
                bare.remove(node);
            }
        }
    }
    bare
}

/// Splits `bare` into maximal chains, each in execution order.
fn chains(graph: &FlowGraph, bare: &HashSet<NodeId>) -> Vec<Vec<NodeId>> {
    let mut next_of: HashMap<NodeId, NodeId> = HashMap::new();
    let mut has_prev: HashSet<NodeId> = HashSet::new();
    for &node in bare {
        let Some(next) = graph.single_successor(node) else {
            continue;
        };
        // Interior nodes admit exactly one predecessor.
        if bare.contains(&next)
            && next != node
            && graph.predecessors(next).len() == 1
        {
            next_of.insert(node, next);
            has_prev.insert(next);
        }
    }

    let mut heads: Vec<NodeId> = bare
        .iter()
        .copied()
        .filter(|node| !has_prev.contains(node))
        .collect();
    heads.sort_unstable();

    let mut result = Vec::new();
    for head in heads {
        let mut chain = vec![head];
        let mut current = head;
        while let Some(&next) = next_of.get(&current) {
            chain.push(next);
            current = next;
        }
        result.push(chain);
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cfg::EdgeKind;
    use crate::ir::{Instruction, Location, TypeRef, Value, Variable};
    use crate::structure::conditionals::recover_conditionals;

    fn n(index: usize) -> NodeId {
        NodeId::new(index)
    }

    fn set(members: &[usize]) -> HashSet<NodeId> {
        members.iter().map(|&i| n(i)).collect()
    }

    fn assign_node(graph: &mut FlowGraph, index: u32) -> NodeId {
        graph.add_node(FlowInstruction::Statement(Instruction::Assign {
            target: Location::Variable(Variable::local(index, TypeRef::Int)),
            value: Value::int(0),
        }))
    }

    fn branch_node(graph: &mut FlowGraph, index: u32) -> NodeId {
        graph.add_node(FlowInstruction::Branch {
            condition: Value::Variable(Variable::local(index, TypeRef::Bool)),
        })
    }

    fn return_node(graph: &mut FlowGraph) -> NodeId {
        graph.add_node(FlowInstruction::Statement(Instruction::Return(None)))
    }

    fn sequence_bodies(tree: &StructureTree) -> Vec<HashSet<NodeId>> {
        tree.set_ids()
            .filter(|&id| matches!(tree.node(id).kind(), SetKind::Sequence))
            .map(|id| tree.node(id).body().clone())
            .collect()
    }

    #[test]
    fn test_straight_line_procedure_is_one_sequence() {
        let mut graph = FlowGraph::new();
        let a = assign_node(&mut graph, 0);
        let b = assign_node(&mut graph, 1);
        let c = assign_node(&mut graph, 2);
        let d = return_node(&mut graph);
        graph.link(a, b, EdgeKind::Unconditional);
        graph.link(b, c, EdgeKind::Unconditional);
        graph.link(c, d, EdgeKind::Unconditional);
        graph.set_start(a);
        graph.recompute_sets();

        let mut tree = StructureTree::new(graph.node_ids().collect());
        recover_sequences(&graph, &mut tree).unwrap();
        assert_eq!(sequence_bodies(&tree), vec![set(&[0, 1, 2, 3])]);
    }

    #[test]
    fn test_merge_node_starts_a_new_chain() {
        // 0(branch) -> 1 | 2, both into 3 -> 4 -> 5; the merge at 3 has
        // two predecessors and cannot be a chain interior.
        let mut graph = FlowGraph::new();
        let head = branch_node(&mut graph, 0);
        let left = assign_node(&mut graph, 1);
        let right = assign_node(&mut graph, 2);
        let join = assign_node(&mut graph, 3);
        let after = assign_node(&mut graph, 4);
        let tail = return_node(&mut graph);
        graph.link(head, left, EdgeKind::BranchTrue);
        graph.link(head, right, EdgeKind::BranchFalse);
        graph.link(left, join, EdgeKind::Unconditional);
        graph.link(right, join, EdgeKind::Unconditional);
        graph.link(join, after, EdgeKind::Unconditional);
        graph.link(after, tail, EdgeKind::Unconditional);
        graph.set_start(head);
        graph.recompute_sets();

        let mut tree = StructureTree::new(graph.node_ids().collect());
        recover_sequences(&graph, &mut tree).unwrap();
        assert_eq!(sequence_bodies(&tree), vec![set(&[3, 4, 5])]);
    }

    #[test]
    fn test_child_structures_are_not_re_grouped() {
        let mut graph = FlowGraph::new();
        let head = branch_node(&mut graph, 0);
        let left = assign_node(&mut graph, 1);
        let right = assign_node(&mut graph, 2);
        let join = assign_node(&mut graph, 3);
        let tail = return_node(&mut graph);
        graph.link(head, left, EdgeKind::BranchTrue);
        graph.link(head, right, EdgeKind::BranchFalse);
        graph.link(left, join, EdgeKind::Unconditional);
        graph.link(right, join, EdgeKind::Unconditional);
        graph.link(join, tail, EdgeKind::Unconditional);
        graph.set_start(head);
        graph.recompute_sets();

        let mut tree = StructureTree::new(graph.node_ids().collect());
        recover_conditionals(&graph, &mut tree).unwrap();
        recover_sequences(&graph, &mut tree).unwrap();

        // The if/else arms are claimed; only the join chain remains.
        assert_eq!(sequence_bodies(&tree), vec![set(&[3, 4])]);
    }
}
