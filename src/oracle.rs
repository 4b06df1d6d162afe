//! The mutation oracle: call-effect answers from the embedding compiler.
//!
//! Method calls are opaque to the decompiler. Whether an argument survives a
//! call unchanged, whether the call touches global state, and whether its
//! return value aliases an existing object all depend on the callee's body,
//! which lives on the embedding compiler's side of the seam. The
//! [`MutationOracle`] trait is that seam: the embedder implements it once and
//! every analysis that needs call effects asks through it.
//!
//! Oracle answers are immutable for a given callee, so they are safe to cache.
//! [`CachedOracle`] wraps any oracle with a concurrent read-through cache,
//! which keeps repeated queries cheap when procedures decompile in parallel.

use dashmap::DashMap;

use crate::ir::MethodRef;

/// The effects a callee has on its arguments and environment.
///
/// Argument positions index into [`crate::ir::MethodCall::arguments`]; the
/// receiver is not an argument position. A callee that mutates its receiver
/// reports [`MutationEffects::mutates_global_state`] only if it also touches
/// state beyond its arguments.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MutationEffects {
    /// Argument positions the callee may write through.
    pub mutated_args: Vec<usize>,
    /// `true` if the callee may read or write state beyond its arguments.
    pub mutates_global_state: bool,
    /// `true` if the return value is a freshly constructed object that no
    /// caller-visible reference aliases.
    pub returns_fresh: bool,
}

impl MutationEffects {
    /// The effects of a pure callee: no mutated arguments, no global state,
    /// no fresh return.
    #[must_use]
    pub const fn none() -> Self {
        Self {
            mutated_args: Vec::new(),
            mutates_global_state: false,
            returns_fresh: false,
        }
    }

    /// Returns `true` if the callee mutates any argument or global state.
    ///
    /// Side-effecting calls pin their evaluation site: they cannot be
    /// inlined past other statements and must survive dead-store
    /// elimination even when their result is unused.
    #[must_use]
    pub fn is_side_effecting(&self) -> bool {
        self.mutates_global_state || !self.mutated_args.is_empty()
    }

    /// Returns `true` if the callee may write through argument `position`.
    #[must_use]
    pub fn mutates_arg(&self, position: usize) -> bool {
        self.mutated_args.contains(&position)
    }
}

/// Answers what a callee does to its arguments and environment.
///
/// Implementations must be consistent: repeated queries for the same
/// [`MethodRef`] must return equal effects. When callee information is
/// incomplete, report the mutation rather than omit it. `Sync` is required
/// because batch decompilation shares one oracle across worker threads.
pub trait MutationOracle: Sync {
    /// Returns the effects of calling `method`.
    fn effects(&self, method: &MethodRef) -> MutationEffects;
}

/// An oracle that reports every callee as pure.
///
/// Suitable for tests and for inputs whose calls are known to be free of
/// side effects. Under this oracle, dead-store elimination discards unused
/// call results and nothing blocks inlining across calls.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullOracle;

impl MutationOracle for NullOracle {
    fn effects(&self, _method: &MethodRef) -> MutationEffects {
        MutationEffects::none()
    }
}

/// A read-through cache in front of another oracle.
///
/// The first query for a callee is forwarded to the inner oracle; every later
/// query is served from the cache. The cache is concurrent, so one
/// `CachedOracle` can back a whole parallel batch.
#[derive(Debug)]
pub struct CachedOracle<O> {
    inner: O,
    cache: DashMap<MethodRef, MutationEffects>,
}

impl<O: MutationOracle> CachedOracle<O> {
    /// Wraps `inner` with an empty cache.
    #[must_use]
    pub fn new(inner: O) -> Self {
        Self {
            inner,
            cache: DashMap::new(),
        }
    }

    /// Returns the number of cached callees.
    #[must_use]
    pub fn cached_len(&self) -> usize {
        self.cache.len()
    }
}

impl<O: MutationOracle> MutationOracle for CachedOracle<O> {
    fn effects(&self, method: &MethodRef) -> MutationEffects {
        if let Some(cached) = self.cache.get(method) {
            return cached.clone();
        }
        let effects = self.inner.effects(method);
        self.cache.insert(method.clone(), effects.clone());
        effects
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::ir::TypeRef;

    struct CountingOracle {
        queries: AtomicUsize,
    }

    impl MutationOracle for CountingOracle {
        fn effects(&self, method: &MethodRef) -> MutationEffects {
            self.queries.fetch_add(1, Ordering::SeqCst);
            MutationEffects {
                mutated_args: vec![method.id as usize],
                mutates_global_state: false,
                returns_fresh: false,
            }
        }
    }

    #[test]
    fn test_side_effect_classification() {
        assert!(!MutationEffects::none().is_side_effecting());
        let global = MutationEffects {
            mutates_global_state: true,
            ..MutationEffects::none()
        };
        assert!(global.is_side_effecting());
        let arg = MutationEffects {
            mutated_args: vec![1],
            ..MutationEffects::none()
        };
        assert!(arg.is_side_effecting());
        assert!(arg.mutates_arg(1));
        assert!(!arg.mutates_arg(0));
    }

    #[test]
    fn test_null_oracle_reports_pure() {
        let effects = NullOracle.effects(&MethodRef::new(0, "anything", TypeRef::Void));
        assert_eq!(effects, MutationEffects::none());
        assert!(!effects.is_side_effecting());
    }

    #[test]
    fn test_cached_oracle_queries_inner_once_per_callee() {
        let oracle = CachedOracle::new(CountingOracle {
            queries: AtomicUsize::new(0),
        });
        let first = MethodRef::new(1, "a", TypeRef::Void);
        let second = MethodRef::new(2, "b", TypeRef::Void);

        let a = oracle.effects(&first);
        let b = oracle.effects(&first);
        assert_eq!(a, b);
        assert_eq!(oracle.inner.queries.load(Ordering::SeqCst), 1);

        let c = oracle.effects(&second);
        assert_eq!(c.mutated_args, vec![2]);
        assert_eq!(oracle.inner.queries.load(Ordering::SeqCst), 2);
        assert_eq!(oracle.cached_len(), 2);
    }
}
