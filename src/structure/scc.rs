//! Strongly connected component detection.
//!
//! Kosaraju's two-pass algorithm over a region of the flow graph: a
//! forward depth-first pass records finish order, a second pass over the
//! transposed edges in reverse finish order peels off one component per
//! root. The loop recovery pass restricts the search to a region and
//! excludes already-claimed loop entries so a recovered loop is not
//! re-detected when recursing into its own body.

use std::collections::HashSet;

use crate::cfg::{FlowGraph, NodeId};

/// Returns the strongly connected components of `region`, ordered by
/// their smallest member id.
///
/// Nodes in `excluded` are treated as absent; edges leaving `region` are
/// ignored. Every returned component is sorted by node id.
#[must_use]
pub fn strongly_connected_components(
    graph: &FlowGraph,
    region: &HashSet<NodeId>,
    excluded: &HashSet<NodeId>,
) -> Vec<Vec<NodeId>> {
    let in_scope = |node: NodeId| region.contains(&node) && !excluded.contains(&node);
    let mut members: Vec<NodeId> = region
        .iter()
        .copied()
        .filter(|&node| !excluded.contains(&node))
        .collect();
    members.sort_unstable();

    // Pass one: forward DFS finish order.
    let mut finished: Vec<NodeId> = Vec::with_capacity(members.len());
    let mut visited: HashSet<NodeId> = HashSet::new();
    for &root in &members {
        if visited.contains(&root) {
            continue;
        }
        // Iterative DFS; the second stack entry flags the post-visit.
        let mut stack: Vec<(NodeId, bool)> = vec![(root, false)];
        while let Some((node, post)) = stack.pop() {
            if post {
                finished.push(node);
                continue;
            }
            if !visited.insert(node) {
                continue;
            }
            stack.push((node, true));
            for &(succ, _) in graph.successors(node) {
                if in_scope(succ) && !visited.contains(&succ) {
                    stack.push((succ, false));
                }
            }
        }
    }

    // Pass two: transposed DFS in reverse finish order.
    let mut components: Vec<Vec<NodeId>> = Vec::new();
    let mut assigned: HashSet<NodeId> = HashSet::new();
    for &root in finished.iter().rev() {
        if assigned.contains(&root) {
            continue;
        }
        let mut component = Vec::new();
        let mut stack = vec![root];
        while let Some(node) = stack.pop() {
            if !assigned.insert(node) {
                continue;
            }
            component.push(node);
            for &pred in graph.predecessors(node) {
                if in_scope(pred) && !assigned.contains(&pred) {
                    stack.push(pred);
                }
            }
        }
        component.sort_unstable();
        components.push(component);
    }
    components.sort_by_key(|component| component[0]);
    components
}

/// Returns `true` if `component` forms a loop: more than one node, or a
/// single node with an edge to itself.
#[must_use]
pub fn is_loop(graph: &FlowGraph, component: &[NodeId]) -> bool {
    match component {
        [] => false,
        [node] => graph
            .successors(*node)
            .iter()
            .any(|&(succ, _)| succ == *node),
        _ => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cfg::{EdgeKind, FlowInstruction};
    use crate::ir::Instruction;

    fn make_graph(count: usize, edges: &[(usize, usize)]) -> FlowGraph {
        let mut graph = FlowGraph::new();
        let ids: Vec<NodeId> = (0..count)
            .map(|_| {
                graph.add_node(FlowInstruction::Statement(Instruction::Return(None)))
            })
            .collect();
        for &(from, to) in edges {
            graph.link(ids[from], ids[to], EdgeKind::Unconditional);
        }
        graph.set_start(ids[0]);
        graph.recompute_sets();
        graph
    }

    fn n(index: usize) -> NodeId {
        NodeId::new(index)
    }

    fn all(count: usize) -> HashSet<NodeId> {
        (0..count).map(n).collect()
    }

    #[test]
    fn test_two_cycles_are_separate_components() {
        // 0 -> {1 <-> 2} -> {3 <-> 4}
        let graph = make_graph(5, &[(0, 1), (1, 2), (2, 1), (2, 3), (3, 4), (4, 3)]);
        let components =
            strongly_connected_components(&graph, &all(5), &HashSet::new());
        let loops: Vec<Vec<NodeId>> = components
            .into_iter()
            .filter(|c| is_loop(&graph, c))
            .collect();
        assert_eq!(loops, vec![vec![n(1), n(2)], vec![n(3), n(4)]]);
    }

    #[test]
    fn test_self_loop_is_a_loop_component() {
        let graph = make_graph(3, &[(0, 1), (1, 1), (1, 2)]);
        let components =
            strongly_connected_components(&graph, &all(3), &HashSet::new());
        let loops: Vec<Vec<NodeId>> = components
            .into_iter()
            .filter(|c| is_loop(&graph, c))
            .collect();
        assert_eq!(loops, vec![vec![n(1)]]);
    }

    #[test]
    fn test_acyclic_region_has_no_loop_components() {
        let graph = make_graph(4, &[(0, 1), (0, 2), (1, 3), (2, 3)]);
        let components =
            strongly_connected_components(&graph, &all(4), &HashSet::new());
        assert_eq!(components.len(), 4);
        assert!(components.iter().all(|c| !is_loop(&graph, c)));
    }

    #[test]
    fn test_excluded_entry_breaks_the_cycle() {
        // 1 -> 2 -> 3 -> 1 is a loop, but excluding the entry 1 splits it.
        let graph = make_graph(4, &[(0, 1), (1, 2), (2, 3), (3, 1)]);
        let excluded: HashSet<NodeId> = [n(1)].into_iter().collect();
        let components = strongly_connected_components(&graph, &all(4), &excluded);
        assert!(components.iter().all(|c| !is_loop(&graph, c)));
        assert!(!components.iter().any(|c| c.contains(&n(1))));
    }

    #[test]
    fn test_region_restriction_ignores_outside_edges() {
        // The cycle 1 -> 2 -> 1 leaves the region through 2 -> 3 -> 1; with
        // 3 outside the region the component is just {1, 2}.
        let graph = make_graph(4, &[(0, 1), (1, 2), (2, 1), (2, 3), (3, 1)]);
        let region: HashSet<NodeId> = [n(1), n(2)].into_iter().collect();
        let components =
            strongly_connected_components(&graph, &region, &HashSet::new());
        assert_eq!(components, vec![vec![n(1), n(2)]]);
    }
}
