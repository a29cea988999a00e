use thiserror::Error;

use crate::runtime::FunctionId;

macro_rules! malformed_error {
    // Single string version
    ($msg:expr) => {
        crate::Error::Malformed {
            message: $msg.to_string(),
            file: file!(),
            line: line!(),
        }
    };

    // Format string with arguments version
    ($fmt:expr, $($arg:tt)*) => {
        crate::Error::Malformed {
            message: format!($fmt, $($arg)*),
            file: file!(),
            line: line!(),
        }
    };
}

/// The generic Error type, which provides coverage for all errors this library can potentially
/// return.
///
/// # Error Categories
///
/// ## Input Errors
/// - [`Error::Malformed`] - The supplied control flow graph is inconsistent
/// - [`Error::BlockOutOfRange`] - A runtime event named a block the function does not have
/// - [`Error::UnknownFunction`] - A runtime event named a function without a static layout
///
/// ## Analysis Errors
/// - [`Error::FixpointNotReached`] - The worklist solver exceeded its iteration budget
///
/// ## Bookkeeping Defects (fatal)
/// - [`Error::IdentityMismatch`] - Two profiles of different functions were merged
/// - [`Error::ShapeMismatch`] - Two profiles of the same function disagree on its CFG size
/// - [`Error::UnbalancedExit`] - A function exit did not match the active call
/// - [`Error::NoActiveCall`] - A call-scoped event arrived with no call in progress
///
/// ## Lifecycle and I/O
/// - [`Error::ShutDown`] - An event arrived after the recorder was drained
/// - [`Error::FileError`] / [`Error::Serialization`] - Profile persistence failures
///
/// # Examples
///
/// ```rust
/// use faultline::{runtime::FunctionId, Error};
///
/// let err = Error::IdentityMismatch {
///     expected: FunctionId::new("main.f", 0x1000),
///     found: FunctionId::new("main.g", 0x2000),
/// };
/// assert!(err.is_fatal());
/// ```
#[derive(Error, Debug)]
pub enum Error {
    /// The input is damaged and could not be used.
    ///
    /// Raised while constructing a [`crate::analysis::ControlFlowGraph`] whose edges refer
    /// to blocks that do not exist, or whose predecessor and successor lists disagree.
    ///
    /// # Fields
    ///
    /// * `message` - Detailed description of what was malformed
    /// * `file` - Source file where the error was detected
    /// * `line` - Source line where the error was detected
    #[error("Malformed - {file}:{line}: {message}")]
    Malformed {
        /// The message to be printed for the Malformed error
        message: String,
        /// The source file in which this error occured
        file: &'static str,
        /// The source line in which this error occured
        line: u32,
    },

    /// The worklist solver did not converge within the configured iteration budget.
    ///
    /// A monotone transfer function over a finite lattice always converges, so this
    /// indicates a defect in the analysis of this function only.
    #[error("Fixpoint not reached for '{function}' after {iterations} iterations")]
    FixpointNotReached {
        /// Name of the function being analyzed
        function: String,
        /// Number of worklist iterations performed before giving up
        iterations: usize,
    },

    /// Two function aggregates (or a call and an aggregate) with different identities were
    /// merged.
    #[error("Can't merge profile of {found} into {expected}")]
    IdentityMismatch {
        /// Identity of the aggregate being merged into
        expected: FunctionId,
        /// Identity of the profile that was offered
        found: FunctionId,
    },

    /// Two profiles of the same function disagree on the number of CFG nodes.
    #[error("Profile of {function} has {found} nodes, expected {expected}")]
    ShapeMismatch {
        /// Identity of the function
        function: FunctionId,
        /// Node count of the aggregate
        expected: usize,
        /// Node count of the offered profile
        found: usize,
    },

    /// A function exit named a different function than the active call.
    #[error("Exit from '{found}' while '{expected}' is the active call")]
    UnbalancedExit {
        /// Name of the function on top of the call stack
        expected: String,
        /// Name passed to the exit event
        found: String,
    },

    /// A call-scoped event arrived while no call was in progress in its context.
    #[error("No active call in execution context {0}")]
    NoActiveCall(u64),

    /// A block event named a block outside the function's CFG.
    #[error("Block {block} is out of range for '{function}' ({count} blocks)")]
    BlockOutOfRange {
        /// Name of the active function
        function: String,
        /// The offending block id
        block: usize,
        /// Number of blocks in the function
        count: usize,
    },

    /// No static layout is registered for the named function.
    #[error("No static layout registered for '{0}'")]
    UnknownFunction(String),

    /// The recorder was already drained by a shutdown.
    #[error("The recorder has been shut down")]
    ShutDown,

    /// File I/O error.
    #[error("{0}")]
    FileError(#[from] std::io::Error),

    /// Profile (de)serialization error.
    #[error("{0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Returns `true` if this error signals a bookkeeping defect rather than a condition a
    /// caller could handle.
    ///
    /// Fatal errors must abort the affected operation; callers must not attempt partial
    /// recovery of the involved profile.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Error::IdentityMismatch { .. }
                | Error::ShapeMismatch { .. }
                | Error::UnbalancedExit { .. }
                | Error::NoActiveCall(_)
        )
    }
}
