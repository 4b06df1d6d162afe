//! Structure recovery over the flow graph.
//!
//! The recovery passes rewrite the flat graph into a [`StructureTree`]: a
//! hierarchy of loops, conditionals, statement sequences, and labelled
//! blocks whose bodies partition the graph's nodes. [`recover_structure`]
//! runs them in their fixed order and finishes with break and continue
//! discovery, whose [`JumpTable`] tells AST lowering which residual edges
//! are jumps rather than fall-through.
//!
//! # Pass Order
//!
//! 1. Loops ([`recover_loops`]) - strongly connected components, with
//!    dispatch synthesis for multi-entry components
//! 2. Conditionals ([`recover_conditionals`]) - two-way branches via
//!    dominance and reachability tests
//! 3. Sequences ([`recover_sequences`]) - maximal straight-line chains
//! 4. Labelled blocks ([`recover_blocks`]) - irreducible sibling merges
//! 5. Breaks, then continues ([`discover_jumps`])

mod blocks;
mod breaks;
mod conditionals;
mod loops;
mod recover;
mod scc;
mod sequences;
mod set;

pub use blocks::recover_blocks;
pub use breaks::{discover_jumps, Jump, JumpKind, JumpTable};
pub use conditionals::recover_conditionals;
pub use loops::recover_loops;
pub use recover::recover_structure;
pub use scc::{is_loop, strongly_connected_components};
pub use sequences::recover_sequences;
pub use set::{SetId, SetKind, SetNode, StructureTree};

pub(crate) use blocks::{sibling_graph, Sibling, SiblingGraph};
