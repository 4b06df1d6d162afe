//! The per-procedure decompilation driver.
//!
//! [`decompile`] runs the stages in their fixed order: flow graph
//! construction, the outer analysis fixed point (expression inlining and
//! dead-store elimination feed each other, so they alternate until neither
//! changes anything), the mutability check, structural recovery, AST
//! lowering, and simplification. Each stage owns its data exclusively and
//! nothing is shared between procedures, which is what makes
//! [`decompile_batch`] embarrassingly parallel: the only shared state is
//! the oracle, and [`crate::oracle::MutationOracle`] requires `Sync`.

use rayon::prelude::*;

use crate::ast::{build_ast, simplify, AstNode};
use crate::cfg::{FlowGraph, Procedure};
use crate::dataflow::{check_mutability, eliminate_dead_stores, inline_tracked_values};
use crate::oracle::MutationOracle;
use crate::structure::recover_structure;
use crate::Result;

/// Decompiles one procedure into a simplified AST.
///
/// # Errors
///
/// Returns [`crate::Error::GraphError`] for a malformed hand-off,
/// [`crate::Error::MutatingImmutableValue`] when the input violates the
/// mutability discipline, [`crate::Error::UnsupportedConstruct`] for
/// control flow outside the supported subset, and
/// [`crate::Error::StructuralInvariant`] for internal recovery bugs. An
/// error aborts only this procedure.
///
/// # Examples
///
/// ```rust
/// use shadelift::prelude::*;
///
/// let block = BasicBlock::new(vec![Instruction::Return(None)], vec![]);
/// let procedure = Procedure::new("noop", vec![], TypeRef::Void, vec![block]);
/// let ast = decompile(&procedure, &NullOracle)?;
/// assert_eq!(ast.to_string(), "return\n");
/// # Ok::<(), shadelift::Error>(())
/// ```
pub fn decompile<O: MutationOracle + ?Sized>(
    procedure: &Procedure,
    oracle: &O,
) -> Result<AstNode> {
    let mut graph = FlowGraph::from_procedure(procedure)?;
    loop {
        let inlined = inline_tracked_values(&mut graph, oracle)?;
        let removed = eliminate_dead_stores(&mut graph, oracle)?;
        if !inlined && !removed {
            break;
        }
    }
    check_mutability(&graph, procedure, oracle)?;
    let (tree, jumps) = recover_structure(&mut graph)?;
    let ast = build_ast(&graph, &tree, &jumps)?;
    Ok(simplify(ast))
}

/// Decompiles independent procedures in parallel.
///
/// Results come back in input order, one per procedure; a failing
/// procedure never affects the others.
pub fn decompile_batch<O: MutationOracle + ?Sized>(
    procedures: &[Procedure],
    oracle: &O,
) -> Vec<Result<AstNode>> {
    procedures
        .par_iter()
        .map(|procedure| decompile(procedure, oracle))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cfg::BasicBlock;
    use crate::ir::{Instruction, Location, TypeRef, Value, Variable};
    use crate::oracle::NullOracle;

    #[test]
    fn test_empty_procedure_is_rejected() {
        let procedure = Procedure::new("empty", vec![], TypeRef::Void, vec![]);
        assert!(matches!(
            decompile(&procedure, &NullOracle),
            Err(crate::Error::GraphError(_))
        ));
    }

    #[test]
    fn test_batch_keeps_input_order_and_isolates_failures() {
        let good = Procedure::new(
            "good",
            vec![],
            TypeRef::Void,
            vec![BasicBlock::new(vec![Instruction::Return(None)], vec![])],
        );
        let bad = Procedure::new("bad", vec![], TypeRef::Void, vec![]);
        let results = decompile_batch(&[good, bad], &NullOracle);
        assert_eq!(results.len(), 2);
        assert!(results[0].is_ok());
        assert!(results[1].is_err());
    }

    #[test]
    fn test_decompile_discards_stack_temporaries() {
        let tmp = Variable::stack(0, TypeRef::Int);
        let block = BasicBlock::new(
            vec![
                Instruction::Assign {
                    target: Location::Variable(tmp.clone()),
                    value: Value::int(7),
                },
                Instruction::Return(Some(Value::Variable(tmp))),
            ],
            vec![],
        );
        let procedure = Procedure::new("seven", vec![], TypeRef::Int, vec![block]);
        let ast = decompile(&procedure, &NullOracle).unwrap();
        assert_eq!(ast, AstNode::Sequence(vec![AstNode::Return(Some(Value::int(7)))]));
    }
}
