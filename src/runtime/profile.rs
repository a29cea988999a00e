//! Persisted profile format.
//!
//! A [`Profile`] is the snapshot one instrumented execution leaves behind: for every
//! function that completed at least one call, its static layout, its call count and the
//! observed control-dependence predecessors of each node. Profiles of many executions are
//! merged downstream before mining.
//!
//! The on-disk representation is JSON:
//!
//! ```json
//! {
//!   "functions": [
//!     {
//!       "name": "main.f",
//!       "entry": 4096,
//!       "cfg": [[1, 2], [2], []],
//!       "ipdom": [2, 2, null],
//!       "calls": 3,
//!       "dyn_cdp": [[], [0], []]
//!     }
//!   ]
//! }
//! ```

use std::{
    fs,
    io::{BufReader, BufWriter, Read, Write},
    path::Path,
};

use serde::{Deserialize, Serialize};

use crate::{runtime::store::FunctionStore, Result};

/// Persisted form of one function aggregate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportFunction {
    /// Fully qualified function name
    pub name: String,
    /// Entry address of the compiled function
    pub entry: u64,
    /// Successor lists of the CFG
    pub cfg: Vec<Vec<usize>>,
    /// Immediate postdominator of each node, `null` for the function exit
    pub ipdom: Vec<Option<usize>>,
    /// Number of completed calls
    pub calls: u64,
    /// Sorted, deduplicated control-dependence predecessors of each node
    pub dyn_cdp: Vec<Vec<usize>>,
}

/// Snapshot of all function aggregates of one or more executions.
///
/// Functions are kept sorted by name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    /// Exported aggregates, sorted by name
    pub functions: Vec<ExportFunction>,
}

impl Profile {
    /// Creates a profile, sorting the functions by name.
    #[must_use]
    pub fn new(mut functions: Vec<ExportFunction>) -> Self {
        functions.sort_by(|a, b| a.name.cmp(&b.name));
        Self { functions }
    }

    /// Looks up a function by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&ExportFunction> {
        self.functions
            .binary_search_by(|f| f.name.as_str().cmp(name))
            .ok()
            .map(|i| &self.functions[i])
    }

    /// Returns the number of functions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.functions.len()
    }

    /// Returns `true` if the profile holds no function.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }

    /// Merges `other` into this profile.
    ///
    /// Aggregates of the same function are combined; functions only present in `other`
    /// are added. On error this profile is left unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::IdentityMismatch`] if both profiles contain a function of
    /// the same name at different entry addresses, [`crate::Error::ShapeMismatch`] if
    /// they disagree on its node count, and [`crate::Error::Malformed`] if either
    /// profile is inconsistent.
    pub fn merge(&mut self, other: &Profile) -> Result<()> {
        let store = FunctionStore::new();
        store.import(self)?;
        store.import(other)?;
        *self = store.export();
        Ok(())
    }

    /// Serializes the profile as JSON.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Serialization`] if writing fails.
    pub fn write_json<W: Write>(&self, writer: W) -> Result<()> {
        serde_json::to_writer(writer, self)?;
        Ok(())
    }

    /// Deserializes a profile from JSON.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Serialization`] if the input is not a valid profile.
    pub fn read_json<R: Read>(reader: R) -> Result<Self> {
        let profile: Profile = serde_json::from_reader(reader)?;
        Ok(Self::new(profile.functions))
    }

    /// Writes the profile to a file.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::FileError`] if the file cannot be created.
    pub fn to_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut writer = BufWriter::new(fs::File::create(path)?);
        self.write_json(&mut writer)?;
        writer.flush()?;
        Ok(())
    }

    /// Reads a profile from a file.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::FileError`] if the file cannot be opened and
    /// [`crate::Error::Serialization`] if it is not a valid profile.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        Self::read_json(BufReader::new(fs::File::open(path)?))
    }
}
