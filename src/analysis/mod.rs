//! Static analysis: where do definitions reach?
//!
//! This module provides the per-function static half of the toolkit. It never looks at
//! more than one function at a time; [`analyze_functions`] only parallelizes across
//! functions.
//!
//! # Architecture
//!
//! - [`stmt`] - Language-neutral statement model and function signatures
//! - [`cfg`] - Control flow graph input, locations and postdominators
//! - [`defuse`] - Object and reference tables built through a [`SymbolOracle`]
//! - [`dataflow`] - Generic worklist solver and the reaching-definitions analysis
//! - [`config`] - Solver and batch configuration
//!
//! # Usage
//!
//! ```rust
//! use faultline::analysis::{
//!     AnalysisConfig, BasicBlock, BlockLocation, ControlFlowGraph, Definitions, Ident, Pos,
//!     ReachingDefinitions, ResolutionTable, Signature, Statement,
//! };
//!
//! // f(n) { n++; return n }
//! let cfg = ControlFlowGraph::new(
//!     "main.inc",
//!     Signature::new().with_params(vec![Ident::new("n", Pos(7))]),
//!     vec![BasicBlock::new(
//!         vec![
//!             Statement::inc_dec(Ident::new("n", Pos(12))),
//!             Statement::other(vec![Ident::new("n", Pos(24))]),
//!         ],
//!         vec![],
//!         vec![],
//!     )],
//! )?;
//!
//! let mut oracle = ResolutionTable::new();
//! oracle
//!     .define(&Ident::new("n", Pos(7)))
//!     .use_of(Pos(12), Pos(7))
//!     .use_of(Pos(24), Pos(7));
//!
//! let rd = ReachingDefinitions::solve(
//!     &cfg,
//!     Definitions::find(&cfg, &oracle),
//!     &AnalysisConfig::default(),
//! )?;
//! let reaching: Vec<_> = rd.reaching_in(BlockLocation::at(0, 1)).iter().map(|r| r.id).collect();
//! assert_eq!(reaching, vec![Pos(12)]);
//! # Ok::<(), faultline::Error>(())
//! ```

mod batch;
pub mod cfg;
pub mod config;
pub mod dataflow;
pub mod defuse;
pub mod stmt;

pub use batch::{analyze_functions, FunctionAnalysis};
pub use cfg::{BasicBlock, BlockLocation, ControlFlowGraph};
pub use config::AnalysisConfig;
pub use dataflow::{GenKill, ReachingDefinitions};
pub use defuse::{
    Definitions, Object, Reference, Resolution, ResolutionTable, Symbol, SymbolOracle,
};
pub use stmt::{Ident, Pos, Signature, Statement, StmtKind, Target};
