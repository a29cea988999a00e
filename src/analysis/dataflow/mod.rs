//! Data flow analysis framework over statement locations.
//!
//! This module provides a generic framework for computing properties that propagate
//! forward along control flow edges, statement by statement, using a worklist-based
//! solver.
//!
//! # Architecture
//!
//! The framework is built around three core abstractions:
//!
//! - **Lattice**: Defines the domain of abstract values with a join operation
//! - **Analysis**: Specifies the bottom element and the per-location transfer function
//! - **Solver**: Iteratively computes fixpoints using a FIFO worklist
//!
//! # Analyses Provided
//!
//! - [`ReachingDefinitions`]: Tracks which (re)definitions may reach each statement
//!
//! # Thread Safety
//!
//! Results are immutable once solved and are `Send` and `Sync`.

mod framework;
mod lattice;
mod reaching;
mod solver;

pub use framework::{AnalysisResults, DataFlowAnalysis, LocationIndex};
pub use lattice::JoinSemiLattice;
pub use reaching::{GenKill, ReachingDefinitions};
pub use solver::WorklistSolver;
