//! Live-variable analysis and dead-store elimination.
//!
//! The backward analysis computes, for every node, the set of variables
//! whose current value may still be read on some path from that node. An
//! assignment to a variable that is dead immediately afterwards is a dead
//! store. Dead stores are removed from the graph, except that a discarded
//! call result keeps its call when the mutation oracle reports the callee
//! as side-effecting.

use std::collections::HashSet;

use crate::cfg::{FlowGraph, FlowInstruction, NodeId};
use crate::dataflow::{solve, Analysis, Direction, Lattice};
use crate::ir::{Instruction, Location, Value, VarKey};
use crate::oracle::MutationOracle;
use crate::Result;

/// The set of variables live at a program point.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LiveSet(HashSet<VarKey>);

impl LiveSet {
    /// Creates an empty live set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if `key` is live.
    #[must_use]
    pub fn contains(&self, key: VarKey) -> bool {
        self.0.contains(&key)
    }

    /// Returns the number of live variables.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if no variable is live.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Lattice for LiveSet {
    // Liveness is a may-analysis: live on any path means live.
    fn meet(&self, other: &Self) -> Self {
        Self(self.0.union(&other.0).copied().collect())
    }
}

/// The backward live-variable analysis.
pub struct LiveVariables;

impl Analysis for LiveVariables {
    type Fact = LiveSet;
    const DIRECTION: Direction = Direction::Backward;

    fn top(&self, _graph: &FlowGraph) -> LiveSet {
        LiveSet::new()
    }

    fn entry(&self, _graph: &FlowGraph) -> LiveSet {
        LiveSet::new()
    }

    fn transfer(&self, fact: &LiveSet, node: NodeId, graph: &FlowGraph) -> Result<LiveSet> {
        let mut live = fact.clone();
        let instruction = graph.instruction(node);
        if let Some(Instruction::Assign {
            target: Location::Variable(variable),
            ..
        }) = instruction.as_statement()
        {
            live.0.remove(&variable.key());
        }
        instruction.collect_reads(&mut live.0);
        Ok(live)
    }
}

/// Removes every dead store from the graph.
///
/// An assignment to a variable that is dead immediately after the node is
/// spliced out of the graph. When the right-hand side is a call the oracle
/// reports as side-effecting, the node instead becomes a bare call
/// statement; a side-effecting call buried inside a compound right-hand
/// side keeps the whole assignment, since dropping the rest of the
/// expression could reorder its effects.
///
/// Cascades: removing one store can kill the stores feeding it, so the
/// analysis re-runs until a sweep removes nothing. Returns `true` if any
/// store was removed or demoted.
///
/// # Errors
///
/// Propagates solver and graph-edit errors.
pub fn eliminate_dead_stores<O: MutationOracle + ?Sized>(
    graph: &mut FlowGraph,
    oracle: &O,
) -> Result<bool> {
    let mut changed_any = false;
    loop {
        let results = solve(&LiveVariables, graph)?;
        let mut changed = false;
        let nodes: Vec<NodeId> = graph.node_ids().collect();
        for node in nodes {
            let Some(Instruction::Assign {
                target: Location::Variable(variable),
                value,
            }) = graph.instruction(node).as_statement()
            else {
                continue;
            };
            let Some(live_after) = results.output(node) else {
                continue;
            };
            if live_after.contains(variable.key()) {
                continue;
            }

            let mut calls = Vec::new();
            value.collect_calls(&mut calls);
            let side_effecting = calls
                .iter()
                .any(|call| oracle.effects(&call.method).is_side_effecting());
            if side_effecting {
                if let Value::Call(call) = value {
                    let call = call.clone();
                    graph.set_instruction(node, FlowInstruction::Statement(Instruction::Call(call)));
                    changed = true;
                }
                // A compound right-hand side stays: the embedded call must
                // run, and its operands evaluate in order around it.
            } else if graph.single_successor(node).is_some_and(|succ| succ != node) {
                graph.splice_node(node)?;
                changed = true;
            }
        }
        if !changed {
            break;
        }
        changed_any = true;
    }
    Ok(changed_any)
}
