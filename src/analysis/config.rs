//! Static analysis configuration.
//!
//! # Configuration Presets
//!
//! - [`AnalysisConfig::default()`] - Unbounded solver, parallel batch analysis
//! - [`AnalysisConfig::sequential()`] - Deterministic single-threaded batch analysis
//! - [`AnalysisConfig::bounded()`] - Iteration budget scaled for very large functions
//!
//! # Example
//!
//! ```rust
//! use faultline::analysis::AnalysisConfig;
//!
//! let config = AnalysisConfig::sequential().with_max_iterations(50_000);
//! assert!(!config.parallel);
//! assert_eq!(config.max_iterations, Some(50_000));
//! ```

/// Controls the worklist solver and the batch driver.
///
/// # Default Configuration
///
/// - No iteration bound (monotone analyses always terminate)
/// - Functions of a batch are analyzed in parallel
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AnalysisConfig {
    /// Upper bound on worklist iterations per function.
    ///
    /// Exceeding it aborts the analysis of that function with
    /// [`Error::FixpointNotReached`](crate::Error::FixpointNotReached). `None` runs
    /// until the fixpoint is reached.
    pub max_iterations: Option<usize>,

    /// Whether [`analyze_functions`](crate::analysis::analyze_functions) distributes
    /// functions over the rayon thread pool.
    pub parallel: bool,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            max_iterations: None,
            parallel: true,
        }
    }
}

impl AnalysisConfig {
    /// Creates the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Single-threaded batch analysis, functions processed in input order.
    #[must_use]
    pub fn sequential() -> Self {
        Self {
            parallel: false,
            ..Self::default()
        }
    }

    /// Parallel analysis with a one million iteration budget per function.
    #[must_use]
    pub fn bounded() -> Self {
        Self {
            max_iterations: Some(1_000_000),
            ..Self::default()
        }
    }

    /// Sets the iteration budget.
    #[must_use]
    pub fn with_max_iterations(mut self, max: usize) -> Self {
        self.max_iterations = Some(max);
        self
    }

    /// Removes the iteration budget.
    #[must_use]
    pub fn unbounded(mut self) -> Self {
        self.max_iterations = None;
        self
    }

    /// Enables or disables parallel batch analysis.
    #[must_use]
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }
}
