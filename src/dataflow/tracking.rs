//! Value tracking and expression inlining.
//!
//! The forward analysis maps each variable to the value it is known to hold
//! on every path reaching a node. The rewrite then replaces variable reads
//! with their tracked values where that is safe, turning chains of stack
//! temporaries back into the compound expressions the source had.
//!
//! # Inlining Safety
//!
//! A read of `v` is replaced by its tracked value only when the value
//! reports [`ValueTraits::INLINEABLE`], and either `v` has a single read
//! site in the whole procedure or the value also reports
//! [`ValueTraits::DUPLICABLE`]. Use sites are counted per occurrence, not
//! per instruction: `v + v` is two sites.
//!
//! Analyze and rewrite alternate until a rewrite changes nothing. Each
//! successful inline either removes a read site or replaces it with a value
//! whose own reads were tracked earlier, so the alternation terminates.

use std::collections::{HashMap, HashSet};

use crate::cfg::{FlowGraph, FlowInstruction, NodeId};
use crate::dataflow::{solve, Analysis, Direction, Lattice};
use crate::ir::{Instruction, Location, Value, ValueTraits, VarKey};
use crate::oracle::MutationOracle;
use crate::Result;

/// The values known for each variable at a program point.
#[derive(Debug, Clone, PartialEq)]
pub enum TrackingFact {
    /// No path has reached this point yet.
    Unvisited,
    /// Per-variable values that hold on every reaching path. Variables
    /// absent from the map are unknown.
    Known(HashMap<VarKey, Value>),
}

impl TrackingFact {
    /// Returns the tracked map if any path has reached this point.
    #[must_use]
    pub const fn known(&self) -> Option<&HashMap<VarKey, Value>> {
        match self {
            Self::Unvisited => None,
            Self::Known(map) => Some(map),
        }
    }
}

impl Lattice for TrackingFact {
    fn meet(&self, other: &Self) -> Self {
        match (self, other) {
            (Self::Unvisited, x) | (x, Self::Unvisited) => x.clone(),
            (Self::Known(a), Self::Known(b)) => Self::Known(
                a.iter()
                    .filter(|(key, value)| b.get(key) == Some(value))
                    .map(|(key, value)| (*key, value.clone()))
                    .collect(),
            ),
        }
    }
}

/// The forward value-tracking analysis.
pub struct ValueTracking<'a, O: ?Sized> {
    oracle: &'a O,
}

impl<'a, O: MutationOracle + ?Sized> ValueTracking<'a, O> {
    /// Creates the analysis over the given mutation oracle.
    #[must_use]
    pub fn new(oracle: &'a O) -> Self {
        Self { oracle }
    }

    /// Drops every tracking a contained call may invalidate.
    fn apply_call_effects(&self, map: &mut HashMap<VarKey, Value>, node: &FlowInstruction) {
        let mut calls = Vec::new();
        node.collect_calls(&mut calls);
        for call in calls {
            let effects = self.oracle.effects(&call.method);
            if !effects.is_side_effecting() {
                continue;
            }
            // The callee may write array, field, or static state.
            map.retain(|_, value| !value.reads_memory());
            for &position in &effects.mutated_args {
                let Some(argument) = call.arguments.get(position) else {
                    continue;
                };
                let mutated = argument.reads();
                map.retain(|key, value| {
                    !mutated.contains(key) && mutated.is_disjoint(&value.reads())
                });
            }
        }
    }
}

impl<O: MutationOracle + ?Sized> Analysis for ValueTracking<'_, O> {
    type Fact = TrackingFact;
    const DIRECTION: Direction = Direction::Forward;

    fn top(&self, _graph: &FlowGraph) -> TrackingFact {
        TrackingFact::Unvisited
    }

    fn entry(&self, _graph: &FlowGraph) -> TrackingFact {
        TrackingFact::Known(HashMap::new())
    }

    fn transfer(
        &self,
        fact: &TrackingFact,
        node: NodeId,
        graph: &FlowGraph,
    ) -> Result<TrackingFact> {
        let Some(map) = fact.known() else {
            return Ok(TrackingFact::Unvisited);
        };
        let mut map = map.clone();
        let instruction = graph.instruction(node);
        self.apply_call_effects(&mut map, instruction);

        if let Some(Instruction::Assign { target, value }) = instruction.as_statement() {
            match target {
                Location::Variable(variable) => {
                    let key = variable.key();
                    map.remove(&key);
                    // Trackings that read the rebound variable are stale.
                    map.retain(|_, tracked| !tracked.reads().contains(&key));
                    if value.traits().contains(ValueTraits::INLINEABLE)
                        && !value.reads().contains(&key)
                    {
                        map.insert(key, value.clone());
                    }
                }
                location => {
                    map.retain(|_, tracked| !tracked.is_invalidated_by(location));
                }
            }
        }
        Ok(TrackingFact::Known(map))
    }
}

/// Counts read occurrences of every variable across the whole graph.
fn count_read_sites(graph: &FlowGraph) -> HashMap<VarKey, usize> {
    let mut counts = HashMap::new();
    for node in graph.node_ids() {
        graph.instruction(node).for_each_read(&mut |key| {
            *counts.entry(key).or_insert(0) += 1;
        });
    }
    counts
}

/// Runs the analyze-and-rewrite alternation to a fixed point.
///
/// Returns `true` if any read was inlined.
///
/// # Errors
///
/// Propagates solver errors.
pub fn inline_tracked_values<O: MutationOracle + ?Sized>(
    graph: &mut FlowGraph,
    oracle: &O,
) -> Result<bool> {
    let analysis = ValueTracking::new(oracle);
    let mut inlined_any = false;
    loop {
        let results = solve(&analysis, graph)?;
        let read_sites = count_read_sites(graph);
        let mut changed = false;
        let nodes: Vec<NodeId> = graph.node_ids().collect();
        for node in nodes {
            let Some(TrackingFact::Known(tracked)) = results.input(node) else {
                continue;
            };
            if tracked.is_empty() {
                continue;
            }
            let rewritten = graph.instruction(node).map_values(&mut |value| {
                let variable = value.as_variable()?;
                let replacement = tracked.get(&variable.key())?;
                let traits = replacement.traits();
                if !traits.contains(ValueTraits::INLINEABLE) {
                    return None;
                }
                let single_site = read_sites.get(&variable.key()).copied().unwrap_or(0) <= 1;
                if single_site || traits.contains(ValueTraits::DUPLICABLE) {
                    Some(replacement.clone())
                } else {
                    None
                }
            });
            if &rewritten != graph.instruction(node) {
                graph.set_instruction(node, rewritten);
                changed = true;
            }
        }
        if !changed {
            break;
        }
        inlined_any = true;
    }
    Ok(inlined_any)
}
