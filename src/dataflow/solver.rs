//! Round-robin fixed-point solver.
//!
//! The solver sweeps every node in reverse postorder (forward analyses) or
//! postorder (backward analyses) and repeats the whole sweep until no fact
//! changes. There is no worklist; a sweep over an already-stable graph is
//! cheap, and the sweep order means most facts settle within the first one
//! or two rounds on reducible flow.
//!
//! # Convergence
//!
//! Each node's fact can only descend in its lattice: inputs are meets of
//! neighbour facts, and transfer functions are monotone for every analysis
//! in this crate. With a finite-height lattice the sweeps therefore
//! terminate. A lattice of unbounded height is a programming error, not a
//! runtime condition the solver guards against.

use std::collections::HashMap;

use crate::cfg::{FlowGraph, NodeId};
use crate::dataflow::{Analysis, AnalysisResults, Direction, Lattice};
use crate::Result;

/// Solves `analysis` over `graph` to a fixed point.
///
/// Returns the per-node input and output facts, in execution order (see
/// [`AnalysisResults`]).
///
/// # Errors
///
/// Propagates the first error returned by the analysis transfer function.
pub fn solve<A: Analysis>(analysis: &A, graph: &FlowGraph) -> Result<AnalysisResults<A::Fact>> {
    let top = analysis.top(graph);
    let entry = analysis.entry(graph);

    let mut inputs: HashMap<NodeId, A::Fact> =
        graph.node_ids().map(|id| (id, top.clone())).collect();
    let mut outputs = inputs.clone();

    let order = match A::DIRECTION {
        Direction::Forward => graph.reverse_postorder(),
        Direction::Backward => graph.postorder(),
    };

    loop {
        let mut changed = false;
        for &node in &order {
            match A::DIRECTION {
                Direction::Forward => {
                    let input = if node == graph.start() {
                        entry.clone()
                    } else {
                        meet_all(graph.predecessors(node).iter().map(|p| &outputs[p]), &top)
                    };
                    let output = analysis.transfer(&input, node, graph)?;
                    changed |= store(&mut inputs, node, input);
                    changed |= store(&mut outputs, node, output);
                }
                Direction::Backward => {
                    let successors = graph.successors(node);
                    let output = if successors.is_empty() {
                        entry.clone()
                    } else {
                        meet_all(successors.iter().map(|(s, _)| &inputs[s]), &top)
                    };
                    let input = analysis.transfer(&output, node, graph)?;
                    changed |= store(&mut outputs, node, output);
                    changed |= store(&mut inputs, node, input);
                }
            }
        }
        if !changed {
            break;
        }
    }

    Ok(AnalysisResults::new(inputs, outputs))
}

/// Meets an iterator of facts; an empty iterator yields the top element.
fn meet_all<'a, F: Lattice + 'a>(facts: impl Iterator<Item = &'a F>, top: &F) -> F {
    facts
        .fold(None, |met: Option<F>, fact| {
            Some(match met {
                None => fact.clone(),
                Some(met) => met.meet(fact),
            })
        })
        .unwrap_or_else(|| top.clone())
}

/// Stores `fact` for `node`, reporting whether it differs from the old one.
fn store<F: Lattice>(facts: &mut HashMap<NodeId, F>, node: NodeId, fact: F) -> bool {
    if facts.get(&node) == Some(&fact) {
        return false;
    }
    facts.insert(node, fact);
    true
}
