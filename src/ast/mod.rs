//! AST construction and simplification.
//!
//! [`build_ast`] lowers the recovered structure tree into an [`AstNode`]
//! tree, resolving the classified jump edges into `break` and `continue`
//! nodes. [`simplify`] then rewrites the tree to a fixed point (condition
//! folding, guard absorption, dead jump removal, label pruning) so the
//! emitter sees the code a person would have written, not the code the
//! recovery passes happened to produce.

mod build;
mod node;
mod simplify;

pub use build::build_ast;
pub use node::AstNode;
pub use simplify::simplify;
