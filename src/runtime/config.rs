//! Recorder configuration.
//!
//! # Example
//!
//! ```rust
//! use faultline::runtime::{RecorderConfig, UnknownFunctionBehavior};
//!
//! let config = RecorderConfig::strict();
//! assert_eq!(config.unknown_function, UnknownFunctionBehavior::Fail);
//!
//! let config = RecorderConfig::default().with_unknown_function(UnknownFunctionBehavior::Ignore);
//! assert_eq!(config, RecorderConfig::default());
//! ```

/// How the recorder treats calls of functions without a static layout.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum UnknownFunctionBehavior {
    /// Track the call on the context stack but record nothing for it.
    ///
    /// Block events inside such a call are ignored and its exit is matched as usual.
    /// Useful when only part of a program was instrumented with layouts.
    #[default]
    Ignore,

    /// Fail with [`Error::UnknownFunction`](crate::Error::UnknownFunction).
    Fail,
}

/// Configuration for the [`Recorder`](crate::runtime::Recorder).
///
/// # Presets
///
/// - [`default()`](Self::default) - Ignore calls of unknown functions
/// - [`strict()`](Self::strict) - Every called function must have a layout
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RecorderConfig {
    /// Behavior when a function without a static layout is entered.
    pub unknown_function: UnknownFunctionBehavior,
}

impl RecorderConfig {
    /// Creates the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fails on every call of a function without a layout.
    #[must_use]
    pub fn strict() -> Self {
        Self {
            unknown_function: UnknownFunctionBehavior::Fail,
        }
    }

    /// Sets the unknown function behavior.
    #[must_use]
    pub fn with_unknown_function(mut self, behavior: UnknownFunctionBehavior) -> Self {
        self.unknown_function = behavior;
        self
    }
}
