//! Loop recovery from strongly connected components.
//!
//! Every strongly connected component of size greater than one, or a
//! single node with a self edge, becomes a [`SetKind::Loop`] node. A
//! component with several entry points first gets a synthesized dispatch:
//! a fresh integer flag variable, a flag assignment on every edge into an
//! entry point, and a switch node that becomes the sole entry. Recovery
//! recurses into each recovered body with the entry excluded, so nested
//! loops are found without re-detecting the enclosing one.

use std::collections::{HashSet, VecDeque};

use crate::cfg::{EdgeKind, FlowGraph, FlowInstruction, NodeId};
use crate::ir::{Instruction, Location, TypeRef, Value, VarNamespace, Variable};
use crate::structure::scc::{is_loop, strongly_connected_components};
use crate::structure::set::{SetKind, StructureTree};
use crate::Result;

/// Recovers every loop in the graph into the structure tree.
///
/// # Errors
///
/// Returns [`crate::Error::StructuralInvariant`] when a component still
/// has several entries after dispatch synthesis, and propagates tree
/// insertion errors.
pub fn recover_loops(graph: &mut FlowGraph, tree: &mut StructureTree) -> Result<()> {
    let mut synthetic = next_synthetic_index(graph);
    let region: HashSet<NodeId> = graph.node_ids().collect();
    recover_in_region(graph, tree, region, HashSet::new(), &mut synthetic)
}

fn recover_in_region(
    graph: &mut FlowGraph,
    tree: &mut StructureTree,
    mut region: HashSet<NodeId>,
    excluded: HashSet<NodeId>,
    synthetic: &mut u32,
) -> Result<()> {
    let components = strongly_connected_components(graph, &region, &excluded);
    for component in components {
        if !is_loop(graph, &component) {
            continue;
        }
        let mut loop_nodes: HashSet<NodeId> = component.iter().copied().collect();
        let mut entries = entry_points(graph, &loop_nodes);
        if entries.is_empty() {
            // The procedure start can sit inside the component, leaving no
            // external predecessor at all.
            entries.push(if loop_nodes.contains(&graph.start()) {
                graph.start()
            } else {
                component[0]
            });
        }

        let entry = if let [entry] = entries[..] {
            entry
        } else {
            let synthesized = synthesize_dispatch(graph, &loop_nodes, &entries, synthetic)?;
            tree.extend_containing(entries[0], &synthesized.created);
            region.extend(synthesized.created.iter().copied());
            loop_nodes.insert(synthesized.dispatch);
            loop_nodes.extend(synthesized.internal.iter().copied());
            let after = entry_points(graph, &loop_nodes);
            if after != [synthesized.dispatch] {
                return Err(structural_error!(
                    "loop keeps {} entries after dispatch synthesis",
                    after.len()
                ));
            }
            synthesized.dispatch
        };

        let escape = select_escape(graph, &loop_nodes, entry);
        let body = loop_body(graph, &region, &loop_nodes, entry, escape);
        let label = tree.fresh_label();
        tree.insert(
            SetKind::Loop {
                label,
                entry,
                escape,
            },
            body.clone(),
            vec![body.clone()],
        )?;

        let mut inner_excluded = excluded.clone();
        inner_excluded.insert(entry);
        recover_in_region(graph, tree, body, inner_excluded, synthetic)?;
    }
    Ok(())
}

/// Nodes of the component with a predecessor outside it, sorted.
fn entry_points(graph: &FlowGraph, loop_nodes: &HashSet<NodeId>) -> Vec<NodeId> {
    let mut entries: Vec<NodeId> = loop_nodes
        .iter()
        .copied()
        .filter(|&node| {
            graph
                .predecessors(node)
                .iter()
                .any(|pred| !loop_nodes.contains(pred))
        })
        .collect();
    entries.sort_unstable();
    entries
}

struct SynthesizedDispatch {
    dispatch: NodeId,
    internal: Vec<NodeId>,
    created: HashSet<NodeId>,
}

/// Replaces several entry points with a single dispatch switch.
///
/// Every edge into an entry point, external and internal alike, is
/// rerouted through a flag assignment into the switch; internal edges
/// must be rerouted too, or the component would be re-detected when
/// recursing into the body.
fn synthesize_dispatch(
    graph: &mut FlowGraph,
    component: &HashSet<NodeId>,
    entries: &[NodeId],
    synthetic: &mut u32,
) -> Result<SynthesizedDispatch> {
    let flag = Variable::synthetic(*synthetic, TypeRef::Int);
    *synthetic += 1;
    let dispatch = graph.add_node(FlowInstruction::Switch {
        selector: Value::Variable(flag.clone()),
    });
    let mut internal = Vec::new();
    let mut created: HashSet<NodeId> = [dispatch].into_iter().collect();

    for (index, &entry) in entries.iter().enumerate() {
        let mut preds: Vec<NodeId> = graph.predecessors(entry).iter().copied().collect();
        preds.sort_unstable();
        for pred in preds {
            let assign = graph.add_node(FlowInstruction::Statement(Instruction::Assign {
                target: Location::Variable(flag.clone()),
                value: Value::int(index as i64),
            }));
            graph.retarget(pred, entry, assign);
            graph.link(assign, dispatch, EdgeKind::Unconditional);
            created.insert(assign);
            if component.contains(&pred) {
                internal.push(assign);
            }
        }
        let kind = if index + 1 == entries.len() {
            EdgeKind::Default
        } else {
            EdgeKind::Case(index as i64)
        };
        graph.link(dispatch, entry, kind);
    }
    graph.recompute_sets();
    Ok(SynthesizedDispatch {
        dispatch,
        internal,
        created,
    })
}

/// Picks where control continues after the loop.
///
/// A two-way branch at the entry with one target outside the loop names
/// the escape directly. Otherwise, among all external successors the one
/// whose shortest path to a return is longest wins; a loop with no
/// external successor has no escape.
fn select_escape(
    graph: &FlowGraph,
    loop_nodes: &HashSet<NodeId>,
    entry: NodeId,
) -> Option<NodeId> {
    if matches!(graph.instruction(entry), FlowInstruction::Branch { .. }) {
        if let Some(&(target, _)) = graph
            .successors(entry)
            .iter()
            .find(|(target, _)| !loop_nodes.contains(target))
        {
            return Some(target);
        }
    }

    let mut external: Vec<NodeId> = loop_nodes
        .iter()
        .flat_map(|&node| graph.successors(node).iter().map(|&(succ, _)| succ))
        .filter(|succ| !loop_nodes.contains(succ))
        .collect();
    external.sort_unstable();
    external.dedup();
    match external[..] {
        [] => None,
        [only] => Some(only),
        _ => external.into_iter().max_by_key(|&candidate| {
            // None sorts above every Some, so an exit that never reaches
            // a return ranks longest.
            match distance_to_return(graph, candidate) {
                None => (1, 0),
                Some(distance) => (0, distance),
            }
        }),
    }
}

/// Breadth-first distance from `from` to the nearest return node.
fn distance_to_return(graph: &FlowGraph, from: NodeId) -> Option<usize> {
    let mut queue: VecDeque<(NodeId, usize)> = VecDeque::new();
    let mut visited: HashSet<NodeId> = HashSet::new();
    queue.push_back((from, 0));
    visited.insert(from);
    while let Some((node, distance)) = queue.pop_front() {
        if matches!(
            graph.instruction(node).as_statement(),
            Some(Instruction::Return(_))
        ) {
            return Some(distance);
        }
        for &(succ, _) in graph.successors(node) {
            if visited.insert(succ) {
                queue.push_back((succ, distance + 1));
            }
        }
    }
    None
}

/// The component plus every node dominated by the entry that the escape
/// cannot reach without re-entering the loop.
fn loop_body(
    graph: &FlowGraph,
    region: &HashSet<NodeId>,
    loop_nodes: &HashSet<NodeId>,
    entry: NodeId,
    escape: Option<NodeId>,
) -> HashSet<NodeId> {
    let mut body = loop_nodes.clone();
    let after_escape = escape.map_or_else(HashSet::new, |escape| {
        reachable_avoiding(graph, escape, entry)
    });
    for &node in region {
        if !body.contains(&node)
            && graph.dominates(entry, node)
            && !after_escape.contains(&node)
        {
            body.insert(node);
        }
    }
    body
}

/// Nodes reachable from `from` along paths that never pass `avoided`,
/// including `from` itself.
fn reachable_avoiding(graph: &FlowGraph, from: NodeId, avoided: NodeId) -> HashSet<NodeId> {
    let mut visited: HashSet<NodeId> = HashSet::new();
    if from == avoided {
        return visited;
    }
    let mut stack = vec![from];
    visited.insert(from);
    while let Some(node) = stack.pop() {
        for &(succ, _) in graph.successors(node) {
            if succ != avoided && visited.insert(succ) {
                stack.push(succ);
            }
        }
    }
    visited
}

/// The lowest unused synthetic variable index in the graph.
fn next_synthetic_index(graph: &FlowGraph) -> u32 {
    let mut next = 0;
    for node in graph.node_ids() {
        let instruction = graph.instruction(node);
        instruction.for_each_read(&mut |key| {
            if key.namespace == VarNamespace::Synthetic {
                next = next.max(key.index + 1);
            }
        });
        if let Some(Instruction::Assign {
            target: Location::Variable(variable),
            ..
        }) = instruction.as_statement()
        {
            if variable.namespace == VarNamespace::Synthetic {
                next = next.max(variable.index + 1);
            }
        }
    }
    next
}
