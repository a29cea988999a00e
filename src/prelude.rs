//! # faultline Prelude
//!
//! This module provides a convenient prelude for the most commonly used types and traits
//! from the faultline library. Import this module to get quick access to the essential
//! types for static def/use analysis and runtime control-dependence profiling.

// ================================================================================================
// Core Types and Error Handling
// ================================================================================================

/// The main error type for all faultline operations
pub use crate::Error;

/// The result type used throughout faultline
pub use crate::Result;

// ================================================================================================
// Program Model
// ================================================================================================

/// Statements, identifiers and signatures
pub use crate::analysis::stmt::{Ident, Pos, Signature, Statement, StmtKind, Target};

/// Control flow graph input and statement locations
pub use crate::analysis::cfg::{BasicBlock, BlockLocation, ControlFlowGraph};

// ================================================================================================
// Static Analysis
// ================================================================================================

/// Definition sites and their references
pub use crate::analysis::defuse::{
    Definitions, Object, Reference, Resolution, ResolutionTable, Symbol, SymbolOracle,
};

/// Reaching definitions and the batch driver
pub use crate::analysis::{analyze_functions, FunctionAnalysis, ReachingDefinitions};

/// Solver configuration
pub use crate::analysis::config::AnalysisConfig;

/// Dataflow framework for custom analyses
pub use crate::analysis::dataflow::{
    AnalysisResults, DataFlowAnalysis, JoinSemiLattice, WorklistSolver,
};

// ================================================================================================
// Runtime Profiling
// ================================================================================================

/// Function identity and static layouts
pub use crate::runtime::{FunctionId, ProgramLayout, StaticFunction};

/// Recording API
pub use crate::runtime::{ContextId, Recorder, RecorderConfig, UnknownFunctionBehavior};

/// Aggregates and persisted profiles
pub use crate::runtime::{ExportFunction, Function, FunctionStore, Profile};

// ================================================================================================
// Utilities
// ================================================================================================

/// Dense bit set used by analyses and profiles
pub use crate::utils::BitSet;
