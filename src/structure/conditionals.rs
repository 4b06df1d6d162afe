//! Conditional recovery from two-way branches.
//!
//! A branch whose targets both lie in the branch's own region is either a
//! one-sided `if` (one target reaches the other without crossing the
//! branch, making the reached target the join) or a two-sided `if`/`else`
//! (neither target reaches the other). A branch with a target outside its
//! region is a loop or block guard; it is left alone here and lowered as
//! a break or continue guard later.

use std::collections::HashSet;

use crate::cfg::{EdgeKind, FlowGraph, FlowInstruction, NodeId};
use crate::structure::set::{SetKind, StructureTree};
use crate::Result;

/// Recovers every structurable two-way branch into the tree.
///
/// # Errors
///
/// Returns [`crate::Error::StructuralInvariant`] when a branch node lacks
/// one of its two edges, and propagates tree insertion errors.
pub fn recover_conditionals(graph: &FlowGraph, tree: &mut StructureTree) -> Result<()> {
    let mut branches: Vec<NodeId> = graph
        .node_ids()
        .filter(|&id| matches!(graph.instruction(id), FlowInstruction::Branch { .. }))
        .collect();
    branches.sort_unstable();

    for branch in branches {
        let taken = branch_target(graph, branch, EdgeKind::BranchTrue)?;
        let fallthrough = branch_target(graph, branch, EdgeKind::BranchFalse)?;
        if taken == fallthrough || taken == branch || fallthrough == branch {
            continue;
        }
        let region = region_of(tree, branch);
        if !region.contains(&taken) || !region.contains(&fallthrough) {
            // A guard jumping out of its region; break/continue territory.
            continue;
        }

        let taken_reaches = reaches_without(graph, &region, taken, fallthrough, branch);
        let fallthrough_reaches = reaches_without(graph, &region, fallthrough, taken, branch);
        match (taken_reaches, fallthrough_reaches) {
            (true, true) => {
                // Mutually reachable arms are an irreducible merge; the
                // labelled-block pass picks these up.
            }
            (true, false) => {
                let arm_body = dominated_in(graph, &region, taken);
                insert_if(tree, branch, taken, false, arm_body)?;
            }
            (false, true) => {
                let arm_body = dominated_in(graph, &region, fallthrough);
                insert_if(tree, branch, fallthrough, true, arm_body)?;
            }
            (false, false) => {
                let then_body = dominated_in(graph, &region, taken);
                let else_body = dominated_in(graph, &region, fallthrough);
                let mut body: HashSet<NodeId> = [branch].into_iter().collect();
                body.extend(then_body.iter().copied());
                body.extend(else_body.iter().copied());
                tree.insert(
                    SetKind::IfElse {
                        branch,
                        then_entry: taken,
                        else_entry: fallthrough,
                    },
                    body,
                    vec![[branch].into_iter().collect(), then_body, else_body],
                )?;
            }
        }
    }
    Ok(())
}

fn insert_if(
    tree: &mut StructureTree,
    branch: NodeId,
    arm: NodeId,
    inverted: bool,
    arm_body: HashSet<NodeId>,
) -> Result<()> {
    let mut body: HashSet<NodeId> = [branch].into_iter().collect();
    body.extend(arm_body.iter().copied());
    tree.insert(
        SetKind::If {
            branch,
            arm,
            inverted,
        },
        body,
        vec![[branch].into_iter().collect(), arm_body],
    )?;
    Ok(())
}

fn branch_target(graph: &FlowGraph, branch: NodeId, kind: EdgeKind) -> Result<NodeId> {
    graph
        .successors(branch)
        .iter()
        .find(|&&(_, edge)| edge == kind)
        .map(|&(target, _)| target)
        .ok_or_else(|| structural_error!("branch {branch} lacks its {kind:?} edge"))
}

/// The sub-body of the deepest containing structure node that holds `node`.
fn region_of(tree: &StructureTree, node: NodeId) -> HashSet<NodeId> {
    let owner = tree.deepest_containing(node);
    tree.node(owner)
        .sub_bodies()
        .iter()
        .find(|sub_body| sub_body.contains(&node))
        .cloned()
        .unwrap_or_default()
}

/// `true` if `from` reaches `to` inside `region` on a path avoiding
/// `crossing`.
fn reaches_without(
    graph: &FlowGraph,
    region: &HashSet<NodeId>,
    from: NodeId,
    to: NodeId,
    crossing: NodeId,
) -> bool {
    let mut visited: HashSet<NodeId> = HashSet::new();
    let mut stack = vec![from];
    visited.insert(from);
    while let Some(node) = stack.pop() {
        if node == to {
            return true;
        }
        for &(succ, _) in graph.successors(node) {
            if succ != crossing && region.contains(&succ) && visited.insert(succ) {
                stack.push(succ);
            }
        }
    }
    false
}

/// Every region node dominated by `head`, `head` included.
fn dominated_in(graph: &FlowGraph, region: &HashSet<NodeId>, head: NodeId) -> HashSet<NodeId> {
    region
        .iter()
        .copied()
        .filter(|&node| graph.dominates(head, node))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{Instruction, Location, TypeRef, Value, Variable};
    use crate::structure::loops::recover_loops;
    use crate::structure::set::SetId;

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

    fn conditional_sets(tree: &StructureTree) -> Vec<SetId> {
        tree.set_ids()
            .filter(|&id| {
                matches!(
                    tree.node(id).kind(),
                    SetKind::If { .. } | SetKind::IfElse { .. }
                )
            })
            .collect()
    }

    #[test]
    fn test_one_sided_if_on_taken_edge() {
        let mut graph = FlowGraph::new();
        let head = branch_node(&mut graph, 0);
        let arm = assign_node(&mut graph, 1);
        let join = return_node(&mut graph);
        graph.link(head, arm, EdgeKind::BranchTrue);
        graph.link(head, join, EdgeKind::BranchFalse);
        graph.link(arm, join, EdgeKind::Unconditional);
        graph.set_start(head);
        graph.recompute_sets();

        let mut tree = StructureTree::new(graph.node_ids().collect());
        recover_conditionals(&graph, &mut tree).unwrap();

        let sets = conditional_sets(&tree);
        assert_eq!(sets.len(), 1);
        let node = tree.node(sets[0]);
        assert_eq!(
            node.kind(),
            &SetKind::If {
                branch: head,
                arm,
                inverted: false,
            }
        );
        assert_eq!(node.body(), &set(&[0, 1]));
    }

    #[test]
    fn test_one_sided_if_inverts_on_fallthrough_arm() {
        let mut graph = FlowGraph::new();
        let head = branch_node(&mut graph, 0);
        let arm = assign_node(&mut graph, 1);
        let join = return_node(&mut graph);
        graph.link(head, join, EdgeKind::BranchTrue);
        graph.link(head, arm, EdgeKind::BranchFalse);
        graph.link(arm, join, EdgeKind::Unconditional);
        graph.set_start(head);
        graph.recompute_sets();

        let mut tree = StructureTree::new(graph.node_ids().collect());
        recover_conditionals(&graph, &mut tree).unwrap();

        let sets = conditional_sets(&tree);
        assert_eq!(sets.len(), 1);
        assert_eq!(
            tree.node(sets[0]).kind(),
            &SetKind::If {
                branch: head,
                arm,
                inverted: true,
            }
        );
    }

    #[test]
    fn test_disjoint_arms_become_if_else() {
        let mut graph = FlowGraph::new();
        let head = branch_node(&mut graph, 0);
        let left = assign_node(&mut graph, 1);
        let right = assign_node(&mut graph, 2);
        let join = return_node(&mut graph);
        graph.link(head, left, EdgeKind::BranchTrue);
        graph.link(head, right, EdgeKind::BranchFalse);
        graph.link(left, join, EdgeKind::Unconditional);
        graph.link(right, join, EdgeKind::Unconditional);
        graph.set_start(head);
        graph.recompute_sets();

        let mut tree = StructureTree::new(graph.node_ids().collect());
        recover_conditionals(&graph, &mut tree).unwrap();

        let sets = conditional_sets(&tree);
        assert_eq!(sets.len(), 1);
        let node = tree.node(sets[0]);
        assert_eq!(
            node.kind(),
            &SetKind::IfElse {
                branch: head,
                then_entry: left,
                else_entry: right,
            }
        );
        assert_eq!(node.body(), &set(&[0, 1, 2]));
        assert!(!node.body().contains(&join));
    }

    #[test]
    fn test_inner_conditional_nests_inside_outer_arm() {
        // 0 guards the whole diamond 1/2/3 -> 4; 5 is the outer join.
        let mut graph = FlowGraph::new();
        let outer = branch_node(&mut graph, 0);
        let inner = branch_node(&mut graph, 1);
        let left = assign_node(&mut graph, 2);
        let right = assign_node(&mut graph, 3);
        let merge = assign_node(&mut graph, 4);
        let join = return_node(&mut graph);
        graph.link(outer, inner, EdgeKind::BranchTrue);
        graph.link(outer, join, EdgeKind::BranchFalse);
        graph.link(inner, left, EdgeKind::BranchTrue);
        graph.link(inner, right, EdgeKind::BranchFalse);
        graph.link(left, merge, EdgeKind::Unconditional);
        graph.link(right, merge, EdgeKind::Unconditional);
        graph.link(merge, join, EdgeKind::Unconditional);
        graph.set_start(outer);
        graph.recompute_sets();

        let mut tree = StructureTree::new(graph.node_ids().collect());
        recover_conditionals(&graph, &mut tree).unwrap();

        let sets = conditional_sets(&tree);
        assert_eq!(sets.len(), 2);
        let outer_set = sets
            .iter()
            .copied()
            .find(|&id| tree.node(id).body().contains(&outer))
            .unwrap();
        let inner_set = sets.iter().copied().find(|&id| id != outer_set).unwrap();
        assert_eq!(tree.node(inner_set).parent(), Some(outer_set));
        assert_eq!(tree.node(outer_set).body(), &set(&[0, 1, 2, 3, 4]));
        assert_eq!(tree.node(inner_set).body(), &set(&[1, 2, 3]));
        assert!(matches!(
            tree.node(inner_set).kind(),
            SetKind::IfElse { .. }
        ));
    }

    #[test]
    fn test_loop_guard_branch_is_left_alone() {
        let mut graph = FlowGraph::new();
        let init = assign_node(&mut graph, 0);
        let header = branch_node(&mut graph, 0);
        let body = assign_node(&mut graph, 1);
        let exit = return_node(&mut graph);
        graph.link(init, header, EdgeKind::Unconditional);
        graph.link(header, body, EdgeKind::BranchTrue);
        graph.link(header, exit, EdgeKind::BranchFalse);
        graph.link(body, header, EdgeKind::Unconditional);
        graph.set_start(init);
        graph.recompute_sets();

        let mut tree = StructureTree::new(graph.node_ids().collect());
        recover_loops(&mut graph, &mut tree).unwrap();
        recover_conditionals(&graph, &mut tree).unwrap();

        // The header's false edge leaves the loop body, so no conditional
        // is recovered for it.
        assert!(conditional_sets(&tree).is_empty());
    }
}
