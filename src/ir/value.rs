//! Expression values, assignable locations, and value classification.
//!
//! This module defines [`Value`], the expression tree every instruction
//! carries, and [`Location`], the assignable subset. Both are closed tagged
//! unions; rewrite passes copy trees through [`Value::map`] rather than
//! mutating shared nodes.
//!
//! # Value Classification
//!
//! Every value answers four questions the analyses depend on:
//!
//! - its believed type ([`Value::ty`])
//! - whether a write through some location invalidates it
//!   ([`Value::is_invalidated_by`], conservative aliasing)
//! - whether it is safe to inline, and safe at more than one use site
//!   ([`Value::traits`])
//! - its mutability classification under an analysis snapshot
//!   ([`Value::mutability`])

use std::collections::HashMap;
use std::collections::HashSet;
use std::fmt;

use bitflags::bitflags;

use crate::ir::{BinaryOp, FieldRef, MethodCall, TypeRef, UnaryOp, VarKey, Variable};

/// A compile-time literal value.
///
/// Literals are always safe to inline and duplicate; the folding helpers on
/// [`BinaryOp`] and [`UnaryOp`] combine them during simplification.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    /// Boolean literal.
    Bool(bool),

    /// Signed integer literal.
    Int(i64),

    /// Unsigned integer literal.
    UInt(u64),

    /// Floating point literal.
    Float(f64),
}

impl Literal {
    /// Returns the literal's type.
    #[must_use]
    pub const fn ty(&self) -> TypeRef {
        match self {
            Self::Bool(_) => TypeRef::Bool,
            Self::Int(_) => TypeRef::Int,
            Self::UInt(_) => TypeRef::UInt,
            Self::Float(_) => TypeRef::Float,
        }
    }

    /// Returns the literal as a bool if applicable.
    ///
    /// Integers are truthy when non-zero, matching the branch semantics of
    /// the input instruction set.
    #[must_use]
    pub const fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(v) => Some(*v),
            Self::Int(v) => Some(*v != 0),
            Self::UInt(v) => Some(*v != 0),
            Self::Float(_) => None,
        }
    }

    /// Returns the literal as an i64 if applicable.
    #[must_use]
    pub const fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(v) => Some(*v),
            Self::Bool(true) => Some(1),
            Self::Bool(false) => Some(0),
            _ => None,
        }
    }

    /// Creates a boolean literal from a bool value.
    #[must_use]
    pub const fn from_bool(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(v) => write!(f, "{v}"),
            Self::Int(v) => write!(f, "{v}"),
            Self::UInt(v) => write!(f, "{v}u"),
            Self::Float(v) => write!(f, "{v:?}"),
        }
    }
}

/// Mutability classification of a value under the value-semantics discipline.
///
/// The target language has no general aliasing, so at most one live mutable
/// alias of an object may exist at a time. The mutability analysis tracks
/// which state each variable is in; see [`crate::dataflow`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mutability {
    /// May not be mutated. The safe default and the merge result of
    /// disagreeing branches.
    Immutable,

    /// Freshly constructed and not yet copied anywhere; may still be
    /// promoted to `Mutable` by an ownership-transferring copy.
    PassiveMutable,

    /// The single live mutable alias; writes through it are permitted.
    Mutable,
}

impl Mutability {
    /// Merges the classification from two control flow paths.
    ///
    /// Differing states degrade to `Immutable`. This is a merge narrowing:
    /// once paths disagree, neither alias may be considered mutable.
    #[must_use]
    pub const fn merge(self, other: Self) -> Self {
        if matches!(
            (self, other),
            (Self::Immutable, Self::Immutable)
                | (Self::PassiveMutable, Self::PassiveMutable)
                | (Self::Mutable, Self::Mutable)
        ) {
            self
        } else {
            Self::Immutable
        }
    }

    /// Returns `true` if writes through this value are permitted.
    #[must_use]
    pub const fn allows_mutation(self) -> bool {
        matches!(self, Self::PassiveMutable | Self::Mutable)
    }
}

impl fmt::Display for Mutability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Immutable => write!(f, "immutable"),
            Self::PassiveMutable => write!(f, "passive-mutable"),
            Self::Mutable => write!(f, "mutable"),
        }
    }
}

/// A point-in-time view of every variable's mutability state.
///
/// Produced by the mutability analysis and consumed by [`Value::mutability`]
/// and [`Location::may_mutate`]. Variables absent from the snapshot are
/// `Immutable`, the conservative default.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MutabilitySnapshot {
    states: HashMap<VarKey, Mutability>,
}

impl MutabilitySnapshot {
    /// Creates an empty snapshot in which every variable is `Immutable`.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the state of `key`, defaulting to `Immutable`.
    #[must_use]
    pub fn get(&self, key: VarKey) -> Mutability {
        self.states
            .get(&key)
            .copied()
            .unwrap_or(Mutability::Immutable)
    }

    /// Sets the state of `key`.
    ///
    /// `Immutable` is the default, so setting it clears the entry; two
    /// snapshots with the same effective states compare equal.
    pub fn set(&mut self, key: VarKey, state: Mutability) {
        if state == Mutability::Immutable {
            self.states.remove(&key);
        } else {
            self.states.insert(key, state);
        }
    }

    /// Iterates over all explicitly recorded states.
    pub fn iter(&self) -> impl Iterator<Item = (&VarKey, &Mutability)> {
        self.states.iter()
    }

    /// Returns the number of explicitly recorded states.
    #[must_use]
    pub fn len(&self) -> usize {
        self.states.len()
    }

    /// Returns `true` if no state has been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    /// Inlining-safety classification of a value.
    pub struct ValueTraits: u8 {
        /// Safe to move to a later use site: evaluating the value has no
        /// side effect and no identity significance.
        const INLINEABLE = 0x01;
        /// Safe to inline at more than one use site. Only values that are
        /// free to re-evaluate (variables, literals) qualify.
        const DUPLICABLE = 0x02;
    }
}

/// An expression tree.
///
/// Values are immutable once built; passes that rewrite expressions produce
/// new trees through [`Value::map`]. The enum is closed on purpose: every
/// analysis matches exhaustively, so a new variant cannot silently slip past
/// a pass.
///
/// # Examples
///
/// ```rust
/// use shadelift::ir::{BinaryOp, Literal, Value};
///
/// let sum = Value::binary(
///     BinaryOp::Add,
///     Value::Literal(Literal::Int(1)),
///     Value::Literal(Literal::Int(2)),
/// );
/// assert_eq!(sum.folded(), Value::Literal(Literal::Int(3)));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// A variable read.
    Variable(Variable),

    /// A compile-time literal.
    Literal(Literal),

    /// A binary operation.
    Binary {
        /// The operator.
        op: BinaryOp,
        /// Left operand.
        left: Box<Value>,
        /// Right operand.
        right: Box<Value>,
    },

    /// A unary operation.
    Unary {
        /// The operator.
        op: UnaryOp,
        /// The operand.
        operand: Box<Value>,
    },

    /// An array element read: `array[index]`.
    ArrayElement {
        /// The array value.
        array: Box<Value>,
        /// The element index.
        index: Box<Value>,
    },

    /// An object field read: `object.field`.
    ObjectField {
        /// The object value.
        object: Box<Value>,
        /// The field being read.
        field: FieldRef,
    },

    /// A static field read.
    StaticField {
        /// The field being read.
        field: FieldRef,
    },

    /// Construction of a fresh object.
    NewObject {
        /// The constructed type.
        ty: TypeRef,
    },

    /// Construction of a fresh array.
    NewArray {
        /// The element type.
        element: TypeRef,
        /// One extent per dimension.
        dims: Vec<Value>,
    },

    /// A method call used as a value.
    Call(MethodCall),

    /// An explicit value copy marking an ownership transfer.
    Copy(Box<Value>),
}

impl Value {
    /// Creates a binary operation value.
    #[must_use]
    pub fn binary(op: BinaryOp, left: Value, right: Value) -> Self {
        Self::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    /// Creates a unary operation value.
    #[must_use]
    pub fn unary(op: UnaryOp, operand: Value) -> Self {
        Self::Unary {
            op,
            operand: Box::new(operand),
        }
    }

    /// Creates an integer literal value.
    #[must_use]
    pub const fn int(value: i64) -> Self {
        Self::Literal(Literal::Int(value))
    }

    /// Creates a boolean literal value.
    #[must_use]
    pub const fn bool(value: bool) -> Self {
        Self::Literal(Literal::Bool(value))
    }

    /// Returns the variable if this value is a plain variable read.
    #[must_use]
    pub const fn as_variable(&self) -> Option<&Variable> {
        match self {
            Self::Variable(v) => Some(v),
            _ => None,
        }
    }

    /// Returns the literal if this value is a literal.
    #[must_use]
    pub const fn as_literal(&self) -> Option<&Literal> {
        match self {
            Self::Literal(l) => Some(l),
            _ => None,
        }
    }

    /// Returns the value's believed type.
    #[must_use]
    pub fn ty(&self) -> TypeRef {
        match self {
            Self::Variable(v) => v.ty.clone(),
            Self::Literal(l) => l.ty(),
            Self::Binary { op, left, .. } => {
                if op.is_comparison() || op.is_logical() {
                    TypeRef::Bool
                } else {
                    left.ty()
                }
            }
            Self::Unary { op, operand } => match op {
                UnaryOp::Not => TypeRef::Bool,
                _ => operand.ty(),
            },
            Self::ArrayElement { array, .. } => {
                array.ty().element().cloned().unwrap_or(TypeRef::Unknown)
            }
            Self::ObjectField { field, .. } | Self::StaticField { field } => field.ty.clone(),
            Self::NewObject { ty } => ty.clone(),
            Self::NewArray { element, dims } => {
                let length = match dims.as_slice() {
                    [Value::Literal(Literal::Int(n))] => u32::try_from(*n).ok(),
                    [Value::Literal(Literal::UInt(n))] => u32::try_from(*n).ok(),
                    _ => None,
                };
                TypeRef::array(element.clone(), length)
            }
            Self::Call(call) => call.method.return_type.clone(),
            Self::Copy(inner) => inner.ty(),
        }
    }

    /// Returns the inlining-safety classification of this value.
    ///
    /// Variables and literals are inlineable and duplicable. Operator and
    /// memory-read nodes are inlineable when all their operands are; the
    /// invalidation check covers the aliasing side. Constructions, calls,
    /// and copies are neither: constructions and copies have identity
    /// significance, calls may have side effects.
    #[must_use]
    pub fn traits(&self) -> ValueTraits {
        match self {
            Self::Variable(_) | Self::Literal(_) => {
                ValueTraits::INLINEABLE | ValueTraits::DUPLICABLE
            }
            Self::Binary { left, right, .. } => {
                if left.traits().contains(ValueTraits::INLINEABLE)
                    && right.traits().contains(ValueTraits::INLINEABLE)
                {
                    ValueTraits::INLINEABLE
                } else {
                    ValueTraits::empty()
                }
            }
            Self::Unary { operand, .. } => {
                if operand.traits().contains(ValueTraits::INLINEABLE) {
                    ValueTraits::INLINEABLE
                } else {
                    ValueTraits::empty()
                }
            }
            Self::ArrayElement { array, index } => {
                if array.traits().contains(ValueTraits::INLINEABLE)
                    && index.traits().contains(ValueTraits::INLINEABLE)
                {
                    ValueTraits::INLINEABLE
                } else {
                    ValueTraits::empty()
                }
            }
            Self::ObjectField { object, .. } => {
                if object.traits().contains(ValueTraits::INLINEABLE) {
                    ValueTraits::INLINEABLE
                } else {
                    ValueTraits::empty()
                }
            }
            Self::StaticField { .. } => ValueTraits::INLINEABLE,
            Self::NewObject { .. } | Self::NewArray { .. } | Self::Call(_) | Self::Copy(_) => {
                ValueTraits::empty()
            }
        }
    }

    /// Returns `true` if a write through `location` may change what this
    /// value evaluates to.
    ///
    /// Aliasing is resolved conservatively: any array element write
    /// invalidates every array element read, and field writes invalidate
    /// reads of the same owner/name pair regardless of the object identity.
    #[must_use]
    pub fn is_invalidated_by(&self, location: &Location) -> bool {
        match self {
            Self::Variable(v) => {
                matches!(location, Location::Variable(w) if w.key() == v.key())
            }
            Self::Literal(_) | Self::NewObject { .. } => false,
            Self::Binary { left, right, .. } => {
                left.is_invalidated_by(location) || right.is_invalidated_by(location)
            }
            Self::Unary { operand, .. } => operand.is_invalidated_by(location),
            Self::ArrayElement { array, index } => {
                matches!(location, Location::ArrayElement { .. })
                    || array.is_invalidated_by(location)
                    || index.is_invalidated_by(location)
            }
            Self::ObjectField { object, field } => {
                matches!(location, Location::ObjectField { field: written, .. }
                    if written.same_field(field))
                    || object.is_invalidated_by(location)
            }
            Self::StaticField { field } => {
                matches!(location, Location::StaticField { field: written }
                    if written.same_field(field))
            }
            Self::NewArray { dims, .. } => dims.iter().any(|d| d.is_invalidated_by(location)),
            // Calls may observe any state, so any write invalidates them.
            Self::Call(_) => true,
            Self::Copy(inner) => inner.is_invalidated_by(location),
        }
    }

    /// Returns `true` if this value reads through memory (fields, array
    /// elements) or calls a method anywhere in its tree.
    ///
    /// Used to invalidate trackings across calls that mutate global state.
    #[must_use]
    pub fn reads_memory(&self) -> bool {
        match self {
            Self::Variable(_) | Self::Literal(_) | Self::NewObject { .. } => false,
            Self::Binary { left, right, .. } => left.reads_memory() || right.reads_memory(),
            Self::Unary { operand, .. } => operand.reads_memory(),
            Self::ArrayElement { .. } | Self::ObjectField { .. } | Self::StaticField { .. } => true,
            Self::NewArray { dims, .. } => dims.iter().any(Value::reads_memory),
            Self::Call(_) => true,
            Self::Copy(inner) => inner.reads_memory(),
        }
    }

    /// Collects every method call in this value tree, outermost first.
    pub fn collect_calls<'a>(&'a self, calls: &mut Vec<&'a MethodCall>) {
        match self {
            Self::Variable(_)
            | Self::Literal(_)
            | Self::StaticField { .. }
            | Self::NewObject { .. } => {}
            Self::Binary { left, right, .. } => {
                left.collect_calls(calls);
                right.collect_calls(calls);
            }
            Self::Unary { operand, .. } => operand.collect_calls(calls),
            Self::ArrayElement { array, index } => {
                array.collect_calls(calls);
                index.collect_calls(calls);
            }
            Self::ObjectField { object, .. } => object.collect_calls(calls),
            Self::NewArray { dims, .. } => {
                for dim in dims {
                    dim.collect_calls(calls);
                }
            }
            Self::Call(call) => {
                calls.push(call);
                for value in call.values() {
                    value.collect_calls(calls);
                }
            }
            Self::Copy(inner) => inner.collect_calls(calls),
        }
    }

    /// Returns the mutability classification of this value under `snapshot`.
    #[must_use]
    pub fn mutability(&self, snapshot: &MutabilitySnapshot) -> Mutability {
        match self {
            Self::Variable(v) => snapshot.get(v.key()),
            Self::Literal(_)
            | Self::Binary { .. }
            | Self::Unary { .. }
            | Self::StaticField { .. }
            | Self::Call(_) => Mutability::Immutable,
            Self::ArrayElement { array, .. } => array.mutability(snapshot),
            Self::ObjectField { object, .. } => object.mutability(snapshot),
            Self::NewObject { .. } | Self::NewArray { .. } => Mutability::PassiveMutable,
            // A completed copy is a freshly owned value.
            Self::Copy(_) => Mutability::Mutable,
        }
    }

    /// Structural substitution copy.
    ///
    /// Applies `subst` to this node first; a `Some` result replaces the whole
    /// subtree without further recursion. Otherwise the node is rebuilt with
    /// `map` applied to every child.
    #[must_use]
    pub fn map<F>(&self, subst: &mut F) -> Value
    where
        F: FnMut(&Value) -> Option<Value>,
    {
        if let Some(replacement) = subst(self) {
            return replacement;
        }
        match self {
            Self::Variable(_) | Self::Literal(_) | Self::StaticField { .. }
            | Self::NewObject { .. } => self.clone(),
            Self::Binary { op, left, right } => Self::Binary {
                op: *op,
                left: Box::new(left.map(subst)),
                right: Box::new(right.map(subst)),
            },
            Self::Unary { op, operand } => Self::Unary {
                op: *op,
                operand: Box::new(operand.map(subst)),
            },
            Self::ArrayElement { array, index } => Self::ArrayElement {
                array: Box::new(array.map(subst)),
                index: Box::new(index.map(subst)),
            },
            Self::ObjectField { object, field } => Self::ObjectField {
                object: Box::new(object.map(subst)),
                field: field.clone(),
            },
            Self::NewArray { element, dims } => Self::NewArray {
                element: element.clone(),
                dims: dims.iter().map(|d| d.map(subst)).collect(),
            },
            Self::Call(call) => Self::Call(call.map(subst)),
            Self::Copy(inner) => Self::Copy(Box::new(inner.map(subst))),
        }
    }

    /// Returns the set of variables this value reads.
    #[must_use]
    pub fn reads(&self) -> HashSet<VarKey> {
        let mut reads = HashSet::new();
        self.collect_reads(&mut reads);
        reads
    }

    /// Adds every variable this value reads to `reads`.
    pub fn collect_reads(&self, reads: &mut HashSet<VarKey>) {
        match self {
            Self::Variable(v) => {
                reads.insert(v.key());
            }
            Self::Literal(_) | Self::StaticField { .. } | Self::NewObject { .. } => {}
            Self::Binary { left, right, .. } => {
                left.collect_reads(reads);
                right.collect_reads(reads);
            }
            Self::Unary { operand, .. } => operand.collect_reads(reads),
            Self::ArrayElement { array, index } => {
                array.collect_reads(reads);
                index.collect_reads(reads);
            }
            Self::ObjectField { object, .. } => object.collect_reads(reads),
            Self::NewArray { dims, .. } => {
                for dim in dims {
                    dim.collect_reads(reads);
                }
            }
            Self::Call(call) => call.collect_reads(reads),
            Self::Copy(inner) => inner.collect_reads(reads),
        }
    }

    /// Visits every variable read in this tree, once per occurrence.
    ///
    /// Unlike [`Value::collect_reads`], repeated reads of the same variable
    /// are visited repeatedly. The inlining pass counts use sites with it.
    pub fn for_each_read(&self, visit: &mut impl FnMut(VarKey)) {
        match self {
            Self::Variable(v) => visit(v.key()),
            Self::Literal(_) | Self::StaticField { .. } | Self::NewObject { .. } => {}
            Self::Binary { left, right, .. } => {
                left.for_each_read(visit);
                right.for_each_read(visit);
            }
            Self::Unary { operand, .. } => operand.for_each_read(visit),
            Self::ArrayElement { array, index } => {
                array.for_each_read(visit);
                index.for_each_read(visit);
            }
            Self::ObjectField { object, .. } => object.for_each_read(visit),
            Self::NewArray { dims, .. } => {
                for dim in dims {
                    dim.for_each_read(visit);
                }
            }
            Self::Call(call) => {
                for value in call.values() {
                    value.for_each_read(visit);
                }
            }
            Self::Copy(inner) => inner.for_each_read(visit),
        }
    }

    /// Recursively folds fully-literal operator nodes into literals.
    #[must_use]
    pub fn folded(&self) -> Value {
        match self {
            Self::Binary { op, left, right } => {
                let left = left.folded();
                let right = right.folded();
                if let (Self::Literal(a), Self::Literal(b)) = (&left, &right) {
                    if let Some(folded) = op.fold(a, b) {
                        return Self::Literal(folded);
                    }
                }
                Self::Binary {
                    op: *op,
                    left: Box::new(left),
                    right: Box::new(right),
                }
            }
            Self::Unary { op, operand } => {
                let operand = operand.folded();
                if let Self::Literal(a) = &operand {
                    if let Some(folded) = op.fold(a) {
                        return Self::Literal(folded);
                    }
                }
                Self::Unary {
                    op: *op,
                    operand: Box::new(operand),
                }
            }
            _ => self.clone(),
        }
    }

    /// Returns the logical negation of this value, folding where possible.
    ///
    /// Comparisons flip their operator, a double negation unwraps, and
    /// boolean literals invert; everything else is wrapped in a logical not.
    #[must_use]
    pub fn negated(&self) -> Value {
        match self {
            Self::Literal(Literal::Bool(v)) => Self::Literal(Literal::Bool(!v)),
            Self::Unary {
                op: UnaryOp::Not,
                operand,
            } => (**operand).clone(),
            Self::Binary { op, left, right } => match op.inverted() {
                Some(inv) => Self::Binary {
                    op: inv,
                    left: left.clone(),
                    right: right.clone(),
                },
                None => Self::unary(UnaryOp::Not, self.clone()),
            },
            _ => Self::unary(UnaryOp::Not, self.clone()),
        }
    }
}

impl From<Variable> for Value {
    fn from(variable: Variable) -> Self {
        Self::Variable(variable)
    }
}

impl From<Literal> for Value {
    fn from(literal: Literal) -> Self {
        Self::Literal(literal)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Variable(v) => write!(f, "{v}"),
            Self::Literal(l) => write!(f, "{l}"),
            Self::Binary { op, left, right } => write!(f, "({left} {op} {right})"),
            Self::Unary { op, operand } => write!(f, "{op}{operand}"),
            Self::ArrayElement { array, index } => write!(f, "{array}[{index}]"),
            Self::ObjectField { object, field } => write!(f, "{object}.{}", field.name),
            Self::StaticField { field } => write!(f, "{field}"),
            Self::NewObject { ty } => write!(f, "new {ty}()"),
            Self::NewArray { element, dims } => {
                write!(f, "new {element}[")?;
                for (i, dim) in dims.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{dim}")?;
                }
                write!(f, "]")
            }
            Self::Call(call) => write!(f, "{call}"),
            Self::Copy(inner) => write!(f, "copy({inner})"),
        }
    }
}

/// The assignable subset of values.
///
/// Locations appear as assignment targets. A location's interior expressions
/// (array, index, object) are ordinary values and participate in reads and
/// substitution; the binding itself does not.
#[derive(Debug, Clone, PartialEq)]
pub enum Location {
    /// A variable binding.
    Variable(Variable),

    /// An array element: `array[index] = ...`.
    ArrayElement {
        /// The array value.
        array: Box<Value>,
        /// The element index.
        index: Box<Value>,
    },

    /// An object field: `object.field = ...`.
    ObjectField {
        /// The object value.
        object: Box<Value>,
        /// The field being written.
        field: FieldRef,
    },

    /// A static field.
    StaticField {
        /// The field being written.
        field: FieldRef,
    },
}

impl Location {
    /// Returns the type of the value this location stores.
    #[must_use]
    pub fn ty(&self) -> TypeRef {
        match self {
            Self::Variable(v) => v.ty.clone(),
            Self::ArrayElement { array, .. } => {
                array.ty().element().cloned().unwrap_or(TypeRef::Unknown)
            }
            Self::ObjectField { field, .. } | Self::StaticField { field } => field.ty.clone(),
        }
    }

    /// Returns the written variable's key if this is a variable binding.
    #[must_use]
    pub const fn target_key(&self) -> Option<VarKey> {
        match self {
            Self::Variable(v) => Some(v.key()),
            _ => None,
        }
    }

    /// Returns `true` if assigning through this location is permitted under
    /// `snapshot`.
    ///
    /// Rebinding a variable is always allowed; it replaces the binding rather
    /// than mutating an object. Element and field writes mutate the container
    /// and require it to be in a mutable state. Static field writes are
    /// governed by the mutation oracle, not the local discipline.
    #[must_use]
    pub fn may_mutate(&self, snapshot: &MutabilitySnapshot) -> bool {
        match self {
            Self::Variable(_) | Self::StaticField { .. } => true,
            Self::ArrayElement { array, .. } => array.mutability(snapshot).allows_mutation(),
            Self::ObjectField { object, .. } => object.mutability(snapshot).allows_mutation(),
        }
    }

    /// Adds the variables read when evaluating this location as a target.
    ///
    /// The bound variable of a `Variable` location is written, not read, and
    /// is deliberately not collected.
    pub fn collect_reads(&self, reads: &mut HashSet<VarKey>) {
        match self {
            Self::Variable(_) | Self::StaticField { .. } => {}
            Self::ArrayElement { array, index } => {
                array.collect_reads(reads);
                index.collect_reads(reads);
            }
            Self::ObjectField { object, .. } => object.collect_reads(reads),
        }
    }

    /// Collects every method call in this location's interior expressions.
    pub fn collect_calls<'a>(&'a self, calls: &mut Vec<&'a MethodCall>) {
        match self {
            Self::Variable(_) | Self::StaticField { .. } => {}
            Self::ArrayElement { array, index } => {
                array.collect_calls(calls);
                index.collect_calls(calls);
            }
            Self::ObjectField { object, .. } => object.collect_calls(calls),
        }
    }

    /// Visits every variable read in the interior expressions, once per
    /// occurrence. The bound variable of a `Variable` location is a write,
    /// not a read.
    pub fn for_each_read(&self, visit: &mut impl FnMut(VarKey)) {
        match self {
            Self::Variable(_) | Self::StaticField { .. } => {}
            Self::ArrayElement { array, index } => {
                array.for_each_read(visit);
                index.for_each_read(visit);
            }
            Self::ObjectField { object, .. } => object.for_each_read(visit),
        }
    }

    /// Applies `subst` to the interior value expressions, keeping the
    /// location kind.
    ///
    /// A `Variable` location is returned unchanged: the binding is a write
    /// target, never a substitutable read.
    #[must_use]
    pub fn map_values<F>(&self, subst: &mut F) -> Location
    where
        F: FnMut(&Value) -> Option<Value>,
    {
        match self {
            Self::Variable(_) | Self::StaticField { .. } => self.clone(),
            Self::ArrayElement { array, index } => Self::ArrayElement {
                array: Box::new(array.map(subst)),
                index: Box::new(index.map(subst)),
            },
            Self::ObjectField { object, field } => Self::ObjectField {
                object: Box::new(object.map(subst)),
                field: field.clone(),
            },
        }
    }

    /// Converts this location into the equivalent readable value.
    #[must_use]
    pub fn as_value(&self) -> Value {
        match self {
            Self::Variable(v) => Value::Variable(v.clone()),
            Self::ArrayElement { array, index } => Value::ArrayElement {
                array: array.clone(),
                index: index.clone(),
            },
            Self::ObjectField { object, field } => Value::ObjectField {
                object: object.clone(),
                field: field.clone(),
            },
            Self::StaticField { field } => Value::StaticField {
                field: field.clone(),
            },
        }
    }

    /// Converts a value into a location if it is assignable.
    #[must_use]
    pub fn from_value(value: &Value) -> Option<Location> {
        match value {
            Value::Variable(v) => Some(Self::Variable(v.clone())),
            Value::ArrayElement { array, index } => Some(Self::ArrayElement {
                array: array.clone(),
                index: index.clone(),
            }),
            Value::ObjectField { object, field } => Some(Self::ObjectField {
                object: object.clone(),
                field: field.clone(),
            }),
            Value::StaticField { field } => Some(Self::StaticField {
                field: field.clone(),
            }),
            _ => None,
        }
    }
}

impl From<Variable> for Location {
    fn from(variable: Variable) -> Self {
        Self::Variable(variable)
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_value())
    }
}
