//! The intermediate representation shared by every pass.
//!
//! This module defines the instruction and value model the front-end hands over
//! and every later stage consumes: typed variables, expression trees, assignable
//! locations, and the statement-level instructions they appear in.
//!
//! # Design Goals
//!
//! - **Closed sums**: Instructions and values are tagged unions, so every pass
//!   matches exhaustively and new variants surface as compile errors
//! - **Immutable trees**: Instructions are value objects once built; rewrites
//!   produce new trees through the substitution-copy protocol instead of
//!   mutating shared instances
//! - **Cheap identity**: Variables are identified by namespace and index alone,
//!   so analyses key maps and sets on a two-word [`VarKey`]
//!
//! # Key Types
//!
//! - [`Instruction`] - A single statement or control transfer
//! - [`Value`] - An expression tree
//! - [`Location`] - The assignable subset of values
//! - [`Variable`] / [`VarKey`] - Typed variable slots and their identity
//! - [`BinaryOp`] / [`UnaryOp`] - The operator sets, with literal folding
//! - [`TypeRef`] - Shading-language value types

mod call;
mod instruction;
mod ops;
mod types;
mod value;
mod variable;

pub use call::{MethodCall, MethodRef};
pub use instruction::{Instruction, LabelId};
pub use ops::{BinaryOp, UnaryOp};
pub use types::{FieldRef, TypeRef};
pub use value::{Literal, Location, Mutability, MutabilitySnapshot, Value, ValueTraits};
pub use variable::{VarKey, VarNamespace, Variable};
