//! Dynamic control-dependence profiling.
//!
//! The runtime half of the toolkit is linked into the instrumented program. Probes report
//! function and block entries to a [`Recorder`]; every call builds a [`FuncCall`] that is
//! folded into its function's [`Function`] aggregate in the shared [`FunctionStore`] on
//! return. At program termination the store is exported as a [`Profile`].
//!
//! # Architecture
//!
//! - [`StaticFunction`] / [`ProgramLayout`] - CFG adjacency and postdominators per function
//! - [`FuncCall`] - The control-dependence stack of one call in progress
//! - [`Function`] - Aggregate of all completed calls of one function
//! - [`FunctionStore`] - Concurrent name-keyed map of aggregates
//! - [`Recorder`] - Probe entry points, per-context call stacks and shutdown
//! - [`Profile`] - Persisted snapshot, mergeable across executions
//!
//! # Thread Safety
//!
//! Call stacks are owned by their execution context. The store is the only shared
//! structure, and each fold locks the entry of a single function.

mod call;
mod config;
mod function;
mod layout;
mod profile;
mod recorder;
mod store;

pub use call::{BlockEntrance, FuncCall};
pub use config::{RecorderConfig, UnknownFunctionBehavior};
pub use function::Function;
pub use layout::{FunctionId, ProgramLayout, StaticFunction};
pub use profile::{ExportFunction, Profile};
pub use recorder::{ContextId, Recorder};
pub use store::FunctionStore;
