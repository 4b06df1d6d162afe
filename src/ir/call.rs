//! Method references and calls.
//!
//! Calls are opaque to this crate: the [`crate::oracle::MutationOracle`]
//! answers what a callee does to its arguments. A [`MethodCall`] appears both
//! as a value ([`crate::ir::Value::Call`]) and as a statement
//! ([`crate::ir::Instruction::Call`]) when the result is discarded.

use std::collections::HashSet;
use std::fmt;

use crate::ir::{TypeRef, Value, VarKey};

/// A reference to a callable method or procedure.
///
/// The numeric id is the front-end's stable handle for the callee and the key
/// the mutation oracle caches on; the name and return type ride along for
/// emission and typing.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MethodRef {
    /// The front-end's stable id for the callee.
    pub id: u32,
    /// The callee's name, for display and emission.
    pub name: String,
    /// The callee's return type.
    pub return_type: TypeRef,
}

impl MethodRef {
    /// Creates a new method reference.
    #[must_use]
    pub fn new(id: u32, name: impl Into<String>, return_type: TypeRef) -> Self {
        Self {
            id,
            name: name.into(),
            return_type,
        }
    }
}

impl fmt::Display for MethodRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// A call to a method, with an optional receiver and positional arguments.
///
/// Argument positions reported by the mutation oracle index into `arguments`;
/// the receiver is not an argument position.
#[derive(Debug, Clone, PartialEq)]
pub struct MethodCall {
    /// The callee.
    pub method: MethodRef,
    /// The receiver object, if this is an instance call.
    pub receiver: Option<Box<Value>>,
    /// The positional arguments.
    pub arguments: Vec<Value>,
}

impl MethodCall {
    /// Creates a new method call.
    #[must_use]
    pub fn new(method: MethodRef, receiver: Option<Value>, arguments: Vec<Value>) -> Self {
        Self {
            method,
            receiver: receiver.map(Box::new),
            arguments,
        }
    }

    /// Iterates over the receiver (if any) followed by the arguments.
    pub fn values(&self) -> impl Iterator<Item = &Value> {
        self.receiver
            .as_deref()
            .into_iter()
            .chain(self.arguments.iter())
    }

    /// Adds every variable this call reads to `reads`.
    pub fn collect_reads(&self, reads: &mut HashSet<VarKey>) {
        for value in self.values() {
            value.collect_reads(reads);
        }
    }

    /// Structural substitution copy over receiver and arguments.
    #[must_use]
    pub fn map<F>(&self, subst: &mut F) -> MethodCall
    where
        F: FnMut(&Value) -> Option<Value>,
    {
        Self {
            method: self.method.clone(),
            receiver: self.receiver.as_ref().map(|r| Box::new(r.map(subst))),
            arguments: self.arguments.iter().map(|a| a.map(subst)).collect(),
        }
    }
}

impl fmt::Display for MethodCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(receiver) = &self.receiver {
            write!(f, "{receiver}.")?;
        }
        write!(f, "{}(", self.method)?;
        for (i, arg) in self.arguments.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{arg}")?;
        }
        write!(f, ")")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{TypeRef, Variable};

    fn make_call() -> MethodCall {
        MethodCall::new(
            MethodRef::new(7, "normalize", TypeRef::vector(TypeRef::Float, 3)),
            Some(Value::Variable(Variable::local(0, TypeRef::Unknown))),
            vec![Value::Variable(Variable::stack(1, TypeRef::Unknown))],
        )
    }

    #[test]
    fn test_values_includes_receiver_first() {
        let call = make_call();
        let values: Vec<_> = call.values().collect();
        assert_eq!(values.len(), 2);
        assert_eq!(
            values[0],
            &Value::Variable(Variable::local(0, TypeRef::Unknown))
        );
    }

    #[test]
    fn test_collect_reads_covers_receiver_and_arguments() {
        let call = make_call();
        let mut reads = HashSet::new();
        call.collect_reads(&mut reads);
        assert_eq!(reads.len(), 2);
    }

    #[test]
    fn test_map_rewrites_arguments() {
        let call = make_call();
        let rewritten = call.map(&mut |v| match v {
            Value::Variable(var) if var.index == 1 => Some(Value::int(3)),
            _ => None,
        });
        assert_eq!(rewritten.arguments[0], Value::int(3));
        // Receiver untouched by this substitution.
        assert_eq!(
            rewritten.receiver.as_deref(),
            Some(&Value::Variable(Variable::local(0, TypeRef::Unknown)))
        );
    }

    #[test]
    fn test_display() {
        let call = make_call();
        assert_eq!(call.to_string(), "loc0.normalize(tmp1)");
    }
}
