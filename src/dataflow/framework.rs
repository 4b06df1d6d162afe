//! The analysis abstraction: direction, lattice, transfer function.
//!
//! A concrete analysis (value tracking, liveness, mutability) implements
//! [`Analysis`] and hands itself to [`crate::dataflow::solve`]. The
//! framework knows nothing about what the facts mean; it only requires a
//! meet operator to combine them where control flow merges and a transfer
//! function to push them through a node.

use std::collections::HashMap;
use std::fmt::Debug;

use crate::cfg::{FlowGraph, NodeId};
use crate::Result;

/// Direction of a dataflow analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Facts flow from the start node towards the exits. Where a node has
    /// several predecessors, their output facts are combined with meet.
    Forward,

    /// Facts flow from the exits towards the start node. Where a node has
    /// several successors, their input facts are combined with meet.
    Backward,
}

/// A meet semi-lattice of dataflow facts.
///
/// The meet must be idempotent, commutative, and associative. Termination of
/// the solver relies on the lattice having finite height in practice; that is
/// the lattice author's responsibility, not the framework's.
pub trait Lattice: Clone + Debug + PartialEq {
    /// Combines the facts of two control flow paths that merge.
    #[must_use]
    fn meet(&self, other: &Self) -> Self;
}

/// A dataflow analysis over the flow graph.
///
/// Implementations provide the boundary facts and the transfer function; the
/// solver handles iteration to a fixed point.
///
/// For forward analyses the transfer maps a node's input fact to its output
/// fact; for backward analyses it maps the output fact to the input fact. In
/// both cases the argument is the fact flowing *into* the node in the
/// direction of the analysis.
///
/// `transfer` returns a [`Result`] so an analysis can reject the procedure
/// outright; the mutability discipline aborts this way the moment it sees a
/// violation, instead of collecting findings for a final report.
pub trait Analysis {
    /// The fact type of this analysis.
    type Fact: Lattice;

    /// The direction of this analysis.
    const DIRECTION: Direction;

    /// Returns the initial fact for interior nodes, the lattice top.
    fn top(&self, graph: &FlowGraph) -> Self::Fact;

    /// Returns the boundary fact: the fact at the start node for forward
    /// analyses, at every exit node for backward analyses.
    fn entry(&self, graph: &FlowGraph) -> Self::Fact;

    /// Pushes a fact through a node.
    ///
    /// # Errors
    ///
    /// Propagated verbatim by the solver, aborting the analysis.
    fn transfer(&self, fact: &Self::Fact, node: NodeId, graph: &FlowGraph) -> Result<Self::Fact>;
}

/// Per-node input and output facts of a solved analysis.
///
/// Inputs and outputs are in execution order regardless of direction: the
/// input fact holds before the node runs, the output fact after. For a
/// backward liveness analysis the output fact is the live set immediately
/// after the node, which is what dead-store elimination queries.
#[derive(Debug, Clone)]
pub struct AnalysisResults<F> {
    inputs: HashMap<NodeId, F>,
    outputs: HashMap<NodeId, F>,
}

impl<F> AnalysisResults<F> {
    pub(crate) fn new(inputs: HashMap<NodeId, F>, outputs: HashMap<NodeId, F>) -> Self {
        Self { inputs, outputs }
    }

    /// Returns the fact holding immediately before `node` runs.
    #[must_use]
    pub fn input(&self, node: NodeId) -> Option<&F> {
        self.inputs.get(&node)
    }

    /// Returns the fact holding immediately after `node` runs.
    #[must_use]
    pub fn output(&self, node: NodeId) -> Option<&F> {
        self.outputs.get(&node)
    }

    /// Returns the number of nodes with facts.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inputs.len()
    }

    /// Returns `true` if no node has facts.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inputs.is_empty()
    }
}
