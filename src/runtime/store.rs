//! Concurrent store of function aggregates.
//!
//! The [`FunctionStore`] is the only state shared between execution contexts. It is a
//! sharded [`DashMap`] keyed by function name, so calls of different functions fold
//! without contending, and calls of the same function serialize on that entry only.
//!
//! Keying by name (rather than by full identity) makes two different functions that share
//! a name collide on purpose: the collision surfaces as a fatal
//! [`Error::IdentityMismatch`](crate::Error::IdentityMismatch) instead of two silently
//! separate profiles.

use std::{collections::HashMap, sync::Arc};

use dashmap::{
    mapref::{entry::Entry, one::RefMut},
    DashMap,
};
use tracing::debug;

use crate::{
    runtime::{
        call::FuncCall,
        function::Function,
        layout::StaticFunction,
        profile::{ExportFunction, Profile},
    },
    Result,
};

/// Thread-safe map from function name to [`Function`] aggregate.
///
/// # Examples
///
/// ```rust
/// use std::sync::Arc;
/// use faultline::runtime::{FuncCall, FunctionId, FunctionStore, StaticFunction};
///
/// let layout = Arc::new(StaticFunction::from_successors(
///     FunctionId::new("main.f", 0x1000),
///     vec![vec![1, 2], vec![2], vec![]],
/// )?);
///
/// let store = FunctionStore::new();
/// let mut call = FuncCall::new(layout, "main.go:10");
/// call.enter_block(1, "main.go:11")?;
/// store.fold(&call)?;
///
/// let profile = store.export();
/// assert_eq!(profile.get("main.f").map(|f| f.calls), Some(1));
/// # Ok::<(), faultline::Error>(())
/// ```
#[derive(Debug, Default)]
pub struct FunctionStore {
    functions: DashMap<String, Function>,
}

impl FunctionStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the aggregate stored under `layout`'s name, creating an empty one if needed.
    ///
    /// The lookup is by name only. If the stored aggregate belongs to a different function
    /// of the same name (another entry address or block count), that aggregate is returned
    /// as is; the mismatch surfaces on the next [`Function::update`] or
    /// [`fold`](Self::fold), which fails with a fatal error.
    ///
    /// The returned guard locks the entry; drop it before touching the same function
    /// again from this thread.
    pub fn get_or_create(&self, layout: &Arc<StaticFunction>) -> RefMut<'_, String, Function> {
        self.functions
            .entry(layout.name().to_string())
            .or_insert_with(|| Function::new(layout.clone()))
    }

    /// Folds a finished call into its function's aggregate.
    ///
    /// # Errors
    ///
    /// Returns a fatal [`crate::Error::IdentityMismatch`] or
    /// [`crate::Error::ShapeMismatch`] if the stored aggregate of the same name belongs
    /// to a different function.
    pub fn fold(&self, call: &FuncCall) -> Result<()> {
        self.get_or_create(call.layout()).update(call)
    }

    /// Merges an aggregate into the store.
    ///
    /// # Errors
    ///
    /// Returns a fatal [`crate::Error::IdentityMismatch`] or
    /// [`crate::Error::ShapeMismatch`] if the stored aggregate of the same name belongs
    /// to a different function.
    pub fn merge(&self, function: Function) -> Result<()> {
        match self.functions.entry(function.id().name.clone()) {
            Entry::Occupied(mut entry) => entry.get_mut().merge(&function),
            Entry::Vacant(entry) => {
                entry.insert(function);
                Ok(())
            }
        }
    }

    /// Merges every function of a persisted profile into the store.
    ///
    /// All functions are validated before any is merged: each must be well formed, agree
    /// with the other entries of the profile sharing its name, and agree with the
    /// aggregate already stored under its name. A rejected profile leaves the store
    /// unchanged, unless a concurrent fold introduces a conflicting function between
    /// validation and merging.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Malformed`] if an entry is inconsistent, and a fatal
    /// [`crate::Error::IdentityMismatch`] or [`crate::Error::ShapeMismatch`] if two
    /// functions of the same name differ.
    pub fn import(&self, profile: &Profile) -> Result<()> {
        let functions = profile
            .functions
            .iter()
            .map(Function::from_export)
            .collect::<Result<Vec<_>>>()?;

        let mut seen: HashMap<&str, &Function> = HashMap::with_capacity(functions.len());
        for function in &functions {
            let name = function.id().name.as_str();
            if let Some(stored) = self.functions.get(name) {
                stored.value().check_mergeable(function)?;
            }
            if let Some(earlier) = seen.insert(name, function) {
                earlier.check_mergeable(function)?;
            }
        }

        debug!(functions = functions.len(), "importing profile");
        for function in functions {
            self.merge(function)?;
        }
        Ok(())
    }

    /// Snapshots every aggregate, sorted by function name.
    #[must_use]
    pub fn export(&self) -> Profile {
        let functions: Vec<ExportFunction> = self
            .functions
            .iter()
            .map(|entry| entry.value().export())
            .collect();
        Profile::new(functions)
    }

    /// Returns a copy of the aggregate of the named function.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<Function> {
        self.functions.get(name).map(|entry| entry.value().clone())
    }

    /// Returns the number of functions with an aggregate.
    #[must_use]
    pub fn len(&self) -> usize {
        self.functions.len()
    }

    /// Returns `true` if no call has been folded yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }
}
