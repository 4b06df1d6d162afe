//! # shadelift Prelude
//!
//! This module provides a convenient prelude for the most commonly used types and traits
//! from the shadelift library. Import this module to get quick access to the essential
//! types for decompiling bytecode procedures.

// ================================================================================================
// Core Types and Error Handling
// ================================================================================================

/// The main error type for all shadelift operations
pub use crate::Error;

/// The result type used throughout shadelift
pub use crate::Result;

// ================================================================================================
// Main Entry Points
// ================================================================================================

/// Per-procedure and batch decompilation drivers
pub use crate::pipeline::{decompile, decompile_batch};

// ================================================================================================
// Front-end Hand-off
// ================================================================================================

/// The procedure container the front-end hands over
pub use crate::cfg::{BasicBlock, Procedure};

// ================================================================================================
// Intermediate Representation
// ================================================================================================

/// Instructions and the expression model
pub use crate::ir::{
    BinaryOp, FieldRef, Instruction, LabelId, Literal, Location, MethodCall, MethodRef, TypeRef,
    UnaryOp, Value, ValueTraits, VarKey, VarNamespace, Variable,
};

// ================================================================================================
// Flow Graph
// ================================================================================================

/// The per-instruction control flow graph and its handles
pub use crate::cfg::{EdgeKind, FlowGraph, FlowInstruction, NodeId};

// ================================================================================================
// Dataflow Framework
// ================================================================================================

/// The fixed-point framework for custom analyses
pub use crate::dataflow::{Analysis, AnalysisResults, Direction, Lattice};

// ================================================================================================
// Mutation Oracle
// ================================================================================================

/// The oracle seam and its stock implementations
pub use crate::oracle::{CachedOracle, MutationEffects, MutationOracle, NullOracle};

// ================================================================================================
// Output AST
// ================================================================================================

/// The structured AST produced by the pipeline
pub use crate::ast::AstNode;
