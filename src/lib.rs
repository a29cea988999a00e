// Copyright 2025 Johann Kempter
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//
// SPDX-License-Identifier: Apache-2.0

#![doc(html_no_source)]
#![warn(missing_docs)]
#![allow(clippy::module_name_repetitions)]

//! # faultline
//!
//! Static def/use analysis and dynamic control-dependence profiling, the two halves of a
//! spectrum-based fault localization pipeline for compiled imperative programs.
//!
//! The crate works in two phases:
//!
//! 1. **Static**: each function's control flow graph is scanned for definition sites
//!    ([`analysis::Definitions`]) and a forward worklist solver computes which definitions
//!    reach every statement ([`analysis::ReachingDefinitions`]). Instrumentation uses the
//!    per-statement reaching sets to decide where probes go.
//! 2. **Dynamic**: the instrumented program reports function and block entries to a
//!    [`runtime::Recorder`]. Every call accumulates a dynamic control-dependence profile
//!    that is folded into a per-function aggregate on return. Aggregates are exported as a
//!    [`runtime::Profile`] and merged across many test executions downstream.
//!
//! ## Quick Start
//!
//! ```rust
//! use faultline::prelude::*;
//!
//! // f(a) { b := a + 1; return b }
//! let a = Ident::new("a", Pos(10));
//! let b = Ident::new("b", Pos(20));
//! let signature = Signature::new().with_params(vec![a.clone()]);
//! let cfg = ControlFlowGraph::new(
//!     "f",
//!     signature,
//!     vec![BasicBlock::new(
//!         vec![
//!             Statement::assign(vec![b.clone()], vec![Ident::new("a", Pos(24))]),
//!             Statement::other(vec![Ident::new("b", Pos(30))]),
//!         ],
//!         vec![],
//!         vec![],
//!     )],
//! )?;
//!
//! let mut oracle = ResolutionTable::new();
//! oracle.define(&a).define(&b).use_of(Pos(24), Pos(10)).use_of(Pos(30), Pos(20));
//!
//! let defs = Definitions::find(&cfg, &oracle);
//! let reaching = ReachingDefinitions::solve(&cfg, defs, &AnalysisConfig::default())?;
//! assert_eq!(reaching.reaching_in(BlockLocation::at(0, 1)).len(), 2);
//! # Ok::<(), faultline::Error>(())
//! ```
//!
//! ## Architecture
//!
//! - [`analysis`] - CFG model, def/use registry, dataflow framework and reaching definitions
//! - [`runtime`] - Call profiles, the aggregate store, the recording API and profile export
//! - [`utils`] - Bit sets and postdominator computation shared by both halves
//! - [`Error`] and [`Result`] - Error handling
//!
//! ## Error Handling
//!
//! Every fallible operation returns [`Result<T>`](Result). Errors for which
//! [`Error::is_fatal`] returns `true` indicate a bookkeeping defect upstream (for example two
//! profiles for different functions being merged) and must not be retried.

#[macro_use]
pub(crate) mod error;

/// Convenient re-exports of the most commonly used types and traits.
pub mod prelude;

pub mod analysis;
pub mod runtime;
pub mod utils;

/// `faultline` Result type.
///
/// A type alias for `std::result::Result<T, Error>` where the error type is always
/// [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// `faultline` Error type.
///
/// The main error type for all operations in this crate. See [`Error::is_fatal`] for the
/// distinction between defects and recoverable conditions.
pub use error::Error;
