//! The front-end hand-off: procedures as basic blocks.
//!
//! The front-end parses the low-level instruction stream, partitions it into
//! basic blocks, and resolves block successors to indices. This module is the
//! sole input contract of the flow graph builder; no textual labels cross the
//! boundary except inside the instruction stream itself.

use crate::ir::{Instruction, MethodRef, TypeRef, Variable};

/// A basic block: a straight-line instruction run with explicit successors.
///
/// Successor indices refer to positions in the owning [`Procedure`]'s block
/// list. The builder validates them and reports out-of-range indices as
/// [`crate::Error::GraphError`].
#[derive(Debug, Clone, PartialEq)]
pub struct BasicBlock {
    /// The instructions of this block, in execution order.
    pub instructions: Vec<Instruction>,
    /// Indices of the blocks control may fall through to.
    pub successors: Vec<usize>,
}

impl BasicBlock {
    /// Creates a new basic block.
    #[must_use]
    pub const fn new(instructions: Vec<Instruction>, successors: Vec<usize>) -> Self {
        Self {
            instructions,
            successors,
        }
    }
}

/// A procedure as handed over by the front-end.
#[derive(Debug, Clone, PartialEq)]
pub struct Procedure {
    /// The procedure name, for diagnostics and emission.
    pub name: String,
    /// The declared parameters, in order.
    pub parameters: Vec<Variable>,
    /// The declared return type.
    pub return_type: TypeRef,
    /// The basic blocks, in front-end order; block 0 is the entry.
    pub blocks: Vec<BasicBlock>,
    /// The procedure's own method reference, when the front-end has one.
    ///
    /// The mutability analysis queries the mutation oracle with it to seed
    /// out-parameters; without it, every parameter starts `Immutable`.
    pub method: Option<MethodRef>,
}

impl Procedure {
    /// Creates a new procedure without a method reference.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        parameters: Vec<Variable>,
        return_type: TypeRef,
        blocks: Vec<BasicBlock>,
    ) -> Self {
        Self {
            name: name.into(),
            parameters,
            return_type,
            blocks,
            method: None,
        }
    }

    /// Attaches the procedure's own method reference.
    #[must_use]
    pub fn with_method(mut self, method: MethodRef) -> Self {
        self.method = Some(method);
        self
    }

    /// Returns the total instruction count across all blocks.
    #[must_use]
    pub fn instruction_count(&self) -> usize {
        self.blocks.iter().map(|b| b.instructions.len()).sum()
    }
}
