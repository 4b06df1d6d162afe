// Copyright 2025 Johann Kempter
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//
// SPDX-License-Identifier: Apache-2.0

#![doc(html_no_source)]
#![deny(missing_docs)]
#![allow(dead_code)]

//! # shadelift
//!
//! A decompiler core that lifts stack-based bytecode procedures into structured
//! shading-language ASTs. Built in pure Rust, `shadelift` takes the basic blocks a
//! front-end produces, rebuilds structured control flow (loops, conditionals,
//! labelled blocks) from the flat graph, and hands back an AST a code emitter can
//! print, without ever executing the input program.
//!
//! ## Features
//!
//! - **🔀 Flow graph recovery** - Per-instruction control flow graph with
//!   incrementally maintained dominator and reachability sets
//! - **📉 Dataflow framework** - Generic forward/backward fixed-point solver with
//!   value tracking, liveness, and mutability analyses built on top
//! - **🔁 Structure recovery** - Loops (including multi-entry via dispatch
//!   synthesis), conditionals, sequences, and labelled blocks
//! - **🌳 AST construction** - Deterministic lowering plus iterative
//!   simplification of the recovered structure tree
//! - **🛡️ Memory safe** - Built in Rust with comprehensive error handling
//! - **⚡ Parallel batches** - Independent procedures decompile in parallel
//!
//! ## Quick Start
//!
//! Add `shadelift` to your `Cargo.toml`:
//!
//! ```toml
//! [dependencies]
//! shadelift = "0.1"
//! ```
//!
//! ### Using the Prelude
//!
//! For convenient access to the most commonly used types, import the prelude:
//!
//! ```rust,no_run
//! use shadelift::prelude::*;
//!
//! # let procedure: Procedure = unimplemented!();
//! let ast = decompile(&procedure, &NullOracle)?;
//! println!("{}", ast);
//! # Ok::<(), shadelift::Error>(())
//! ```
//!
//! ## Architecture
//!
//! `shadelift` is organized into several key modules:
//!
//! - [`prelude`] - Convenient re-exports of commonly used types and traits
//! - [`ir`] - The instruction and value model shared by every pass
//! - [`cfg`] - Flow graph construction and maintenance
//! - [`dataflow`] - The fixed-point framework and the analyses built on it
//! - [`structure`] - Structure recovery over the flow graph
//! - [`ast`] - AST construction and simplification
//! - [`oracle`] - The mutation oracle seam towards the embedding compiler
//! - [`Error`] and [`Result`] - Comprehensive error handling
//!
//! ### Pipeline
//!
//! [`decompile`] runs the full per-procedure pipeline: flow graph construction,
//! the outer analysis fixed point (value inlining and dead-store elimination),
//! the mutability check, structural recovery, and AST simplification. Each stage
//! owns its data exclusively; nothing is shared between procedures, which is what
//! makes [`decompile_batch`] embarrassingly parallel.
//!
//! ### Front-end Contract
//!
//! The front-end hands over a [`Procedure`]: basic blocks with resolved successor
//! indices and instructions already lifted out of the evaluation stack into the
//! [`ir`] model. Everything upstream of that (bytecode decoding, stack
//! simulation) and downstream (text emission) is out of scope for this crate.

#[macro_use]
pub(crate) mod error;

/// Convenient re-exports of the most commonly used types and traits.
///
/// This module provides a curated selection of the most frequently used types
/// from across the shadelift library, allowing for convenient glob imports.
///
/// # Example
///
/// ```rust,no_run
/// use shadelift::prelude::*;
///
/// # let procedure: Procedure = unimplemented!();
/// let ast = decompile(&procedure, &NullOracle)?;
/// # Ok::<(), shadelift::Error>(())
/// ```
pub mod prelude;

/// The intermediate representation shared by every pass.
///
/// Values, locations, instructions, operators, types, and variables are plain
/// tagged unions. Instructions are immutable once built; passes that rewrite
/// them construct new trees through the substitution-copy protocol
/// ([`ir::Value::map`] and [`ir::Instruction::map_values`]).
///
/// # Key Types
///
/// - [`ir::Instruction`] - A single statement or control transfer
/// - [`ir::Value`] - An expression tree
/// - [`ir::Location`] - The assignable subset of values
/// - [`ir::Variable`] - A typed variable slot, identified by namespace and index
/// - [`ir::TypeRef`] - Shading-language value types
pub mod ir;

/// Control flow graph construction and maintenance.
///
/// The graph holds one node per instruction. Label and goto nodes are
/// short-circuited away during construction, so every residual edge carries
/// real control flow. Dominator and reachability sets are maintained
/// incrementally across edge edits instead of being recomputed per query,
/// because structural recovery edits edges continuously.
///
/// # Key Types
///
/// - [`cfg::FlowGraph`] - The per-instruction flow graph
/// - [`cfg::NodeId`] - Stable handle for a graph node
/// - [`cfg::EdgeKind`] - Classification of control flow edges
/// - [`cfg::Procedure`] / [`cfg::BasicBlock`] - The front-end hand-off
pub mod cfg;

/// The dataflow framework and the analyses built on it.
///
/// A small fixed-point framework in the classic monotone style: a
/// [`dataflow::Lattice`] of facts with a meet operator, an
/// [`dataflow::Analysis`] with a direction and a transfer function, and a
/// solver that sweeps the graph until no fact changes. Three analyses ship
/// with the crate: value tracking (driving expression inlining), liveness
/// (driving dead-store elimination), and the mutability discipline check.
pub mod dataflow;

/// The mutation oracle seam towards the embedding compiler.
///
/// Method calls are opaque to this crate; the oracle answers which arguments a
/// callee mutates, whether it touches global state, and whether its return
/// value is freshly constructed. Answers are cached through an injected
/// read-through cache so repeated queries stay cheap under parallel batches.
pub mod oracle;

/// Structure recovery over the flow graph.
///
/// Rebuilds structured control flow from the flat graph in a fixed pass order:
/// loops, conditionals, sequences, labelled blocks, then break/continue
/// discovery. The result is a structure tree in which every flow graph node is
/// owned by exactly one structure node.
pub mod structure;

/// AST construction and simplification.
///
/// Lowers the recovered structure tree into an [`ast::AstNode`] tree and then
/// simplifies it iteratively until nothing changes: condition folding, break
/// guard absorption, trailing continue removal, and label pruning.
pub mod ast;

pub(crate) mod pipeline;

pub use crate::ast::AstNode;
pub use crate::cfg::{BasicBlock, Procedure};
pub use crate::error::Error;
pub use crate::oracle::{CachedOracle, MutationEffects, MutationOracle, NullOracle};
pub use crate::pipeline::{decompile, decompile_batch};

/// Represents results which may fail with a shadelift [`crate::Error`]
pub type Result<T> = std::result::Result<T, Error>;
