//! The structured AST.
//!
//! [`AstNode`] is what the pipeline hands to the emitter: statements and
//! control structures only, no labels in the instruction stream, no gotos.
//! Bodies are plain node lists. Loops and labelled blocks carry the jump
//! label they own plus a `needs_label` flag the label-necessity pass
//! computes; an unreferenced label is dropped at print time.
//!
//! The [`std::fmt::Display`] implementation prints an indented,
//! language-neutral rendition of the tree. It exists for debugging and
//! tests; the real shading-language emitter lives outside this crate.

use std::fmt;

use crate::ir::{Instruction, Value};

/// One node of the structured AST.
#[derive(Debug, Clone, PartialEq)]
pub enum AstNode {
    /// An ordered list of nodes, used for procedure bodies.
    Sequence(Vec<AstNode>),

    /// A single non-transferring instruction.
    Statement(Instruction),

    /// A one-sided conditional.
    If {
        /// The guard condition.
        condition: Value,
        /// The guarded body.
        body: Vec<AstNode>,
    },

    /// A two-sided conditional.
    IfElse {
        /// The guard condition.
        condition: Value,
        /// The body taken when the condition holds.
        then_body: Vec<AstNode>,
        /// The body taken otherwise.
        else_body: Vec<AstNode>,
    },

    /// A while loop.
    Loop {
        /// The jump label this loop owns.
        label: u32,
        /// `true` when some jump references the label by name.
        needs_label: bool,
        /// The loop condition, checked before every iteration.
        condition: Value,
        /// The loop body.
        body: Vec<AstNode>,
    },

    /// A breakable block.
    LabelledBlock {
        /// The jump label this block owns.
        label: u32,
        /// `true` when some jump references the label by name.
        needs_label: bool,
        /// The block body.
        body: Vec<AstNode>,
    },

    /// Leaves the labelled structure, the innermost one when unlabelled.
    Break(Option<u32>),

    /// Restarts the labelled loop, the innermost one when unlabelled.
    Continue(Option<u32>),

    /// Returns from the procedure.
    Return(Option<Value>),
}

impl AstNode {
    /// Returns the jump label this node owns, if it is a loop or block.
    #[must_use]
    pub const fn label(&self) -> Option<u32> {
        match self {
            Self::Loop { label, .. } | Self::LabelledBlock { label, .. } => Some(*label),
            _ => None,
        }
    }

    /// Returns the direct child list, for nodes that have exactly one.
    #[must_use]
    pub fn body(&self) -> Option<&[AstNode]> {
        match self {
            Self::Sequence(body)
            | Self::If { body, .. }
            | Self::Loop { body, .. }
            | Self::LabelledBlock { body, .. } => Some(body),
            _ => None,
        }
    }

    /// Visits this node and every descendant, depth first.
    pub fn for_each(&self, visit: &mut impl FnMut(&AstNode)) {
        visit(self);
        match self {
            Self::Sequence(body)
            | Self::If { body, .. }
            | Self::Loop { body, .. }
            | Self::LabelledBlock { body, .. } => {
                for child in body {
                    child.for_each(visit);
                }
            }
            Self::IfElse {
                then_body,
                else_body,
                ..
            } => {
                for child in then_body.iter().chain(else_body) {
                    child.for_each(visit);
                }
            }
            Self::Statement(_) | Self::Break(_) | Self::Continue(_) | Self::Return(_) => {}
        }
    }

    fn write(&self, f: &mut fmt::Formatter<'_>, indent: usize) -> fmt::Result {
        let pad = "    ".repeat(indent);
        match self {
            Self::Sequence(body) => write_body_lines(f, body, indent),
            Self::Statement(instruction) => writeln!(f, "{pad}{instruction}"),
            Self::If { condition, body } => {
                writeln!(f, "{pad}if {condition} {{")?;
                write_body_lines(f, body, indent + 1)?;
                writeln!(f, "{pad}}}")
            }
            Self::IfElse {
                condition,
                then_body,
                else_body,
            } => {
                writeln!(f, "{pad}if {condition} {{")?;
                write_body_lines(f, then_body, indent + 1)?;
                writeln!(f, "{pad}}} else {{")?;
                write_body_lines(f, else_body, indent + 1)?;
                writeln!(f, "{pad}}}")
            }
            Self::Loop {
                label,
                needs_label,
                condition,
                body,
            } => {
                if *needs_label {
                    writeln!(f, "{pad}L{label}: while {condition} {{")?;
                } else {
                    writeln!(f, "{pad}while {condition} {{")?;
                }
                write_body_lines(f, body, indent + 1)?;
                writeln!(f, "{pad}}}")
            }
            Self::LabelledBlock {
                label,
                needs_label,
                body,
            } => {
                if *needs_label {
                    writeln!(f, "{pad}L{label}: {{")?;
                } else {
                    writeln!(f, "{pad}{{")?;
                }
                write_body_lines(f, body, indent + 1)?;
                writeln!(f, "{pad}}}")
            }
            Self::Break(None) => writeln!(f, "{pad}break"),
            Self::Break(Some(label)) => writeln!(f, "{pad}break L{label}"),
            Self::Continue(None) => writeln!(f, "{pad}continue"),
            Self::Continue(Some(label)) => writeln!(f, "{pad}continue L{label}"),
            Self::Return(None) => writeln!(f, "{pad}return"),
            Self::Return(Some(value)) => writeln!(f, "{pad}return {value}"),
        }
    }
}

fn write_body_lines(f: &mut fmt::Formatter<'_>, body: &[AstNode], indent: usize) -> fmt::Result {
    for node in body {
        node.write(f, indent)?;
    }
    Ok(())
}

impl fmt::Display for AstNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write(f, 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{BinaryOp, Location, TypeRef, Variable};

    fn statement(index: u32, value: i64) -> AstNode {
        AstNode::Statement(Instruction::Assign {
            target: Location::Variable(Variable::local(index, TypeRef::Int)),
            value: Value::int(value),
        })
    }

    #[test]
    fn test_display_indents_nested_structures() {
        let ast = AstNode::Sequence(vec![
            statement(0, 1),
            AstNode::Loop {
                label: 0,
                needs_label: false,
                condition: Value::binary(
                    BinaryOp::Lt,
                    Value::Variable(Variable::local(0, TypeRef::Int)),
                    Value::int(10),
                ),
                body: vec![AstNode::If {
                    condition: Value::Variable(Variable::local(1, TypeRef::Bool)),
                    body: vec![AstNode::Break(None)],
                }],
            },
            AstNode::Return(None),
        ]);
        let printed = ast.to_string();
        let expected = "\
loc0 = 1
while (loc0 < 10) {
    if loc1 {
        break
    }
}
return
";
        assert_eq!(printed, expected);
    }

    #[test]
    fn test_display_prints_needed_labels() {
        let ast = AstNode::LabelledBlock {
            label: 3,
            needs_label: true,
            body: vec![AstNode::Break(Some(3))],
        };
        let printed = ast.to_string();
        assert!(printed.starts_with("L3: {"));
        assert!(printed.contains("break L3"));
    }

    #[test]
    fn test_for_each_visits_both_conditional_arms() {
        let ast = AstNode::IfElse {
            condition: Value::bool(true),
            then_body: vec![statement(0, 1)],
            else_body: vec![statement(1, 2)],
        };
        let mut count = 0;
        ast.for_each(&mut |_| count += 1);
        assert_eq!(count, 3);
    }

    #[test]
    fn test_label_accessor() {
        assert_eq!(
            AstNode::Loop {
                label: 7,
                needs_label: false,
                condition: Value::bool(true),
                body: vec![],
            }
            .label(),
            Some(7)
        );
        assert_eq!(AstNode::Break(None).label(), None);
    }
}
