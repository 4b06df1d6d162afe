//! Statement-level instructions.
//!
//! An [`Instruction`] is one statement or control transfer in a procedure.
//! Control transfers target [`LabelId`]s in the front-end's instruction
//! stream; the flow graph builder resolves labels into node edges and
//! removes the label and goto instructions from the graph entirely, so
//! passes downstream of construction never see them.
//!
//! Instructions are immutable value objects once built. Rewrite passes use
//! [`Instruction::map_values`] to produce a structurally copied instruction
//! with a substitution applied to the contained values.

use std::collections::HashSet;
use std::fmt;

use crate::ir::{Location, MethodCall, Value, VarKey};

/// A label identifier in the front-end's instruction stream.
///
/// Labels are only meaningful before flow graph construction; they never
/// survive into the residual graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LabelId(u32);

impl LabelId {
    /// Creates a new label identifier.
    #[must_use]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Returns the underlying id.
    #[must_use]
    pub const fn id(self) -> u32 {
        self.0
    }
}

impl fmt::Display for LabelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "L{}", self.0)
    }
}

/// A single statement or control transfer.
#[derive(Debug, Clone, PartialEq)]
pub enum Instruction {
    /// Assignment of a value to a location.
    Assign {
        /// The assignment target.
        target: Location,
        /// The assigned value.
        value: Value,
    },

    /// A method call whose result, if any, is discarded.
    Call(MethodCall),

    /// Unconditional jump to a label.
    Goto(LabelId),

    /// Conditional jump, taken when `condition` is true.
    JumpIf {
        /// The branch condition.
        condition: Value,
        /// The taken-branch target.
        target: LabelId,
    },

    /// Multi-way dispatch on an integer selector.
    Switch {
        /// The dispatch selector.
        selector: Value,
        /// Case value to target label, in front-end order.
        cases: Vec<(i64, LabelId)>,
        /// The default target.
        default: LabelId,
    },

    /// A jump target marker in the instruction stream.
    Label(LabelId),

    /// Return from the procedure, with an optional value.
    Return(Option<Value>),
}

impl Instruction {
    /// Returns the set of variables this instruction reads.
    ///
    /// For an assignment the target binding is a write, not a read, but the
    /// interior expressions of an element or field target are reads.
    #[must_use]
    pub fn reads(&self) -> HashSet<VarKey> {
        let mut reads = HashSet::new();
        self.collect_reads(&mut reads);
        reads
    }

    /// Adds every variable this instruction reads to `reads`.
    pub fn collect_reads(&self, reads: &mut HashSet<VarKey>) {
        match self {
            Self::Assign { target, value } => {
                target.collect_reads(reads);
                value.collect_reads(reads);
            }
            Self::Call(call) => call.collect_reads(reads),
            Self::Goto(_) | Self::Label(_) => {}
            Self::JumpIf { condition, .. } => condition.collect_reads(reads),
            Self::Switch { selector, .. } => selector.collect_reads(reads),
            Self::Return(value) => {
                if let Some(value) = value {
                    value.collect_reads(reads);
                }
            }
        }
    }

    /// Visits every variable read in this instruction, once per occurrence.
    pub fn for_each_read(&self, visit: &mut impl FnMut(VarKey)) {
        match self {
            Self::Assign { target, value } => {
                target.for_each_read(visit);
                value.for_each_read(visit);
            }
            Self::Call(call) => {
                for value in call.values() {
                    value.for_each_read(visit);
                }
            }
            Self::Goto(_) | Self::Label(_) => {}
            Self::JumpIf { condition, .. } => condition.for_each_read(visit),
            Self::Switch { selector, .. } => selector.for_each_read(visit),
            Self::Return(value) => {
                if let Some(value) = value {
                    value.for_each_read(visit);
                }
            }
        }
    }

    /// Adds every method call contained in this instruction to `calls`,
    /// outermost first.
    pub fn collect_calls<'a>(&'a self, calls: &mut Vec<&'a MethodCall>) {
        match self {
            Self::Assign { target, value } => {
                target.collect_calls(calls);
                value.collect_calls(calls);
            }
            Self::Call(call) => {
                calls.push(call);
                for value in call.values() {
                    value.collect_calls(calls);
                }
            }
            Self::Goto(_) | Self::Label(_) => {}
            Self::JumpIf { condition, .. } => condition.collect_calls(calls),
            Self::Switch { selector, .. } => selector.collect_calls(calls),
            Self::Return(value) => {
                if let Some(value) = value {
                    value.collect_calls(calls);
                }
            }
        }
    }

    /// Structural substitution copy.
    ///
    /// Applies `subst` to every contained value; assignment targets keep
    /// their binding but have their interior expressions rewritten.
    #[must_use]
    pub fn map_values<F>(&self, subst: &mut F) -> Instruction
    where
        F: FnMut(&Value) -> Option<Value>,
    {
        match self {
            Self::Assign { target, value } => Self::Assign {
                target: target.map_values(subst),
                value: value.map(subst),
            },
            Self::Call(call) => Self::Call(call.map(subst)),
            Self::Goto(label) => Self::Goto(*label),
            Self::JumpIf { condition, target } => Self::JumpIf {
                condition: condition.map(subst),
                target: *target,
            },
            Self::Switch {
                selector,
                cases,
                default,
            } => Self::Switch {
                selector: selector.map(subst),
                cases: cases.clone(),
                default: *default,
            },
            Self::Label(label) => Self::Label(*label),
            Self::Return(value) => Self::Return(value.as_ref().map(|v| v.map(subst))),
        }
    }

    /// Returns `true` if this instruction transfers control.
    #[must_use]
    pub const fn is_control_transfer(&self) -> bool {
        matches!(
            self,
            Self::Goto(_) | Self::JumpIf { .. } | Self::Switch { .. } | Self::Return(_)
        )
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Assign { target, value } => write!(f, "{target} = {value}"),
            Self::Call(call) => write!(f, "{call}"),
            Self::Goto(label) => write!(f, "goto {label}"),
            Self::JumpIf { condition, target } => write!(f, "if {condition} goto {target}"),
            Self::Switch {
                selector,
                cases,
                default,
            } => {
                write!(f, "switch {selector} [")?;
                for (i, (value, label)) in cases.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{value} => {label}")?;
                }
                write!(f, "] default {default}")
            }
            Self::Label(label) => write!(f, "{label}:"),
            Self::Return(Some(value)) => write!(f, "return {value}"),
            Self::Return(None) => write!(f, "return"),
        }
    }
}
