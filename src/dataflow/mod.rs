//! The dataflow fixed-point framework and the analyses built on it.
//!
//! [`solve`] runs an [`Analysis`] over a flow graph by sweeping all nodes
//! in a direction-appropriate order until no fact changes. Three analyses
//! use it: value tracking with inlining, live variables with dead-store
//! elimination, and the mutability-discipline check.

mod framework;
mod liveness;
mod mutability;
mod solver;
mod tracking;

pub use framework::{Analysis, AnalysisResults, Direction, Lattice};
pub use liveness::{eliminate_dead_stores, LiveSet, LiveVariables};
pub use mutability::{check_mutability, MutabilityCheck, MutabilityFact};
pub use solver::solve;
pub use tracking::{inline_tracked_values, TrackingFact, ValueTracking};
