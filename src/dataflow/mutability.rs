//! Mutability-discipline checking.
//!
//! The source language has value semantics: at most one live mutable alias
//! of an object exists at a time. The forward analysis tracks each
//! variable's [`Mutability`] state through the graph and rejects the
//! procedure when it writes through a value the discipline considers
//! immutable, or passes such a value in an argument position the mutation
//! oracle reports as mutated. A violation is an input defect and surfaces
//! as [`Error::MutatingImmutableValue`] out of the solver.

use crate::cfg::{FlowGraph, NodeId, Procedure};
use crate::dataflow::{solve, Analysis, Direction, Lattice};
use crate::ir::{Instruction, Location, Mutability, MutabilitySnapshot, Value};
use crate::oracle::MutationOracle;
use crate::{Error, Result};

/// The mutability states of all variables at a program point.
#[derive(Debug, Clone, PartialEq)]
pub enum MutabilityFact {
    /// No path has reached this point yet.
    Unvisited,
    /// The merged states along every path seen so far.
    Known(MutabilitySnapshot),
}

impl MutabilityFact {
    /// Returns the snapshot, or `None` before any path has arrived.
    #[must_use]
    pub const fn known(&self) -> Option<&MutabilitySnapshot> {
        match self {
            Self::Unvisited => None,
            Self::Known(snapshot) => Some(snapshot),
        }
    }
}

impl Lattice for MutabilityFact {
    fn meet(&self, other: &Self) -> Self {
        match (self, other) {
            (Self::Unvisited, fact) | (fact, Self::Unvisited) => fact.clone(),
            (Self::Known(a), Self::Known(b)) => {
                // Keys absent from a snapshot are Immutable, and merging
                // anything with Immutable yields Immutable, so iterating
                // one side's keys covers every non-default entry.
                let mut merged = MutabilitySnapshot::new();
                for (key, state) in a.iter() {
                    merged.set(*key, state.merge(b.get(*key)));
                }
                Self::Known(merged)
            }
        }
    }
}

/// The forward mutability analysis.
pub struct MutabilityCheck<'a, O: ?Sized> {
    oracle: &'a O,
    entry: MutabilitySnapshot,
}

impl<'a, O: MutationOracle + ?Sized> MutabilityCheck<'a, O> {
    /// Creates an analysis in which every variable starts `Immutable`.
    #[must_use]
    pub fn new(oracle: &'a O) -> Self {
        Self {
            oracle,
            entry: MutabilitySnapshot::new(),
        }
    }

    /// Creates an analysis seeded from the procedure's own signature.
    ///
    /// Parameters the oracle reports as mutated by the procedure are
    /// out-parameters and start `Mutable`; everything else starts
    /// `Immutable`. Without a method reference no seeding happens.
    #[must_use]
    pub fn for_procedure(oracle: &'a O, procedure: &Procedure) -> Self {
        let mut entry = MutabilitySnapshot::new();
        if let Some(method) = &procedure.method {
            let effects = oracle.effects(method);
            for (position, parameter) in procedure.parameters.iter().enumerate() {
                if effects.mutates_arg(position) {
                    entry.set(parameter.key(), Mutability::Mutable);
                }
            }
        }
        Self { oracle, entry }
    }

    fn check_call_arguments(&self, snapshot: &MutabilitySnapshot, node: NodeId, graph: &FlowGraph) -> Result<()> {
        let mut calls = Vec::new();
        graph.instruction(node).collect_calls(&mut calls);
        for call in calls {
            let effects = self.oracle.effects(&call.method);
            for &position in &effects.mutated_args {
                let Some(argument) = call.arguments.get(position) else {
                    continue;
                };
                if argument.mutability(snapshot) == Mutability::Immutable {
                    return Err(Error::MutatingImmutableValue {
                        message: format!(
                            "immutable value {argument} passed in mutated argument position \
                             {position} of {} at {node}",
                            call.method.name
                        ),
                    });
                }
            }
        }
        Ok(())
    }
}

impl<O: MutationOracle + ?Sized> Analysis for MutabilityCheck<'_, O> {
    type Fact = MutabilityFact;
    const DIRECTION: Direction = Direction::Forward;

    fn top(&self, _graph: &FlowGraph) -> MutabilityFact {
        MutabilityFact::Unvisited
    }

    fn entry(&self, _graph: &FlowGraph) -> MutabilityFact {
        MutabilityFact::Known(self.entry.clone())
    }

    fn transfer(&self, fact: &MutabilityFact, node: NodeId, graph: &FlowGraph) -> Result<MutabilityFact> {
        let MutabilityFact::Known(snapshot) = fact else {
            return Ok(MutabilityFact::Unvisited);
        };
        let mut snapshot = snapshot.clone();
        self.check_call_arguments(&snapshot, node, graph)?;

        if let Some(Instruction::Assign { target, value }) =
            graph.instruction(node).as_statement()
        {
            if !target.may_mutate(&snapshot) {
                return Err(Error::MutatingImmutableValue {
                    message: format!("write through immutable location {target} at {node}"),
                });
            }
            if let Location::Variable(variable) = target {
                let state = match value {
                    Value::NewObject { .. } | Value::NewArray { .. } => Mutability::PassiveMutable,
                    Value::Call(call) if self.oracle.effects(&call.method).returns_fresh => {
                        Mutability::PassiveMutable
                    }
                    Value::Copy(inner) => {
                        // Copying a passive-mutable source transfers
                        // ownership: the source loses its mutable alias.
                        if inner.mutability(&snapshot) == Mutability::PassiveMutable {
                            if let Value::Variable(source) = inner.as_ref() {
                                snapshot.set(source.key(), Mutability::Immutable);
                            }
                        }
                        Mutability::Mutable
                    }
                    _ => Mutability::Immutable,
                };
                snapshot.set(variable.key(), state);
            }
        }
        Ok(MutabilityFact::Known(snapshot))
    }
}

/// Checks the procedure's graph against the mutability discipline.
///
/// Runs [`MutabilityCheck`] seeded from the procedure signature to a fixed
/// point, discarding the per-node facts. The analysis is a pure validator;
/// it never rewrites the graph.
///
/// # Errors
///
/// Returns [`Error::MutatingImmutableValue`] on the first discipline
/// violation reached by the solver, and propagates solver errors.
pub fn check_mutability<O: MutationOracle + ?Sized>(
    graph: &FlowGraph,
    procedure: &Procedure,
    oracle: &O,
) -> Result<()> {
    solve(&MutabilityCheck::for_procedure(oracle, procedure), graph)?;
    Ok(())
}
