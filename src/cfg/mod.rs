//! Control flow graph construction and maintenance.
//!
//! The flow graph holds one node per instruction. Construction wires
//! intra-block sequential edges and inter-block edges from the front-end's
//! block graph, specializes control transfers into edge-bearing node kinds,
//! and short-circuits label and goto nodes out of the graph, so every
//! residual edge carries real control flow.
//!
//! # Maintained Sets
//!
//! Each node owns its predecessor and successor sets (mutual by invariant),
//! a dominator set, and a reachability set. The dominator and reachability
//! sets are maintained incrementally across edge edits: structural recovery
//! edits edges continuously, and recomputing either set from scratch per
//! query would dominate the pipeline's runtime.
//!
//! # Key Types
//!
//! - [`FlowGraph`] - The per-instruction flow graph
//! - [`NodeId`] - Stable handle for a graph node
//! - [`FlowInstruction`] - Node payload: statement, branch, or switch
//! - [`EdgeKind`] - Classification of control flow edges
//! - [`Procedure`] / [`BasicBlock`] - The front-end hand-off

mod block;
mod builder;
mod edge;
mod graph;
mod node;

pub use block::{BasicBlock, Procedure};
pub use edge::EdgeKind;
pub use graph::{FlowGraph, FlowInstruction};
pub use node::NodeId;
