//! Static function layouts consulted by the recorder.
//!
//! A [`StaticFunction`] is the part of a function's control flow graph the runtime needs:
//! the successor lists and the immediate postdominator of every node. It is computed once
//! per function and shared through an [`Arc`] by every call of that function.

use std::{collections::HashMap, fmt, sync::Arc};

use serde::{Deserialize, Serialize};

use crate::{analysis::ControlFlowGraph, utils::compute_postdominators, Result};

/// Identity of a function at runtime: its name and entry address.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FunctionId {
    /// Fully qualified function name
    pub name: String,
    /// Entry address of the compiled function
    pub entry: u64,
}

impl FunctionId {
    /// Creates a function identity.
    pub fn new(name: impl Into<String>, entry: u64) -> Self {
        Self {
            name: name.into(),
            entry,
        }
    }
}

impl fmt::Display for FunctionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{:#x}", self.name, self.entry)
    }
}

/// CFG adjacency and immediate postdominators of one function.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaticFunction {
    id: FunctionId,
    cfg: Vec<Vec<usize>>,
    ipdom: Vec<Option<usize>>,
}

impl StaticFunction {
    /// Creates a layout from explicit adjacency lists and postdominators.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Malformed`] if the two arrays differ in length or refer to
    /// nodes that do not exist.
    pub fn new(id: FunctionId, cfg: Vec<Vec<usize>>, ipdom: Vec<Option<usize>>) -> Result<Self> {
        let count = cfg.len();
        if ipdom.len() != count {
            return Err(malformed_error!(
                "{}: {} nodes but {} postdominator entries",
                id,
                count,
                ipdom.len()
            ));
        }
        for (node, succs) in cfg.iter().enumerate() {
            if let Some(bad) = succs.iter().find(|&&s| s >= count) {
                return Err(malformed_error!(
                    "{}: node {} has successor {}, but only {} nodes exist",
                    id,
                    node,
                    bad,
                    count
                ));
            }
        }
        if let Some((node, bad)) = ipdom
            .iter()
            .enumerate()
            .find_map(|(node, p)| p.filter(|&p| p >= count).map(|p| (node, p)))
        {
            return Err(malformed_error!(
                "{}: node {} has postdominator {}, but only {} nodes exist",
                id,
                node,
                bad,
                count
            ));
        }
        Ok(Self { id, cfg, ipdom })
    }

    /// Creates a layout from adjacency lists, computing the postdominators.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Malformed`] if an edge refers to a node that does not exist.
    pub fn from_successors(id: FunctionId, cfg: Vec<Vec<usize>>) -> Result<Self> {
        let ipdom = compute_postdominators(&cfg);
        Self::new(id, cfg, ipdom)
    }

    /// Snapshots an analyzed control flow graph.
    #[must_use]
    pub fn from_cfg(entry: u64, cfg: &ControlFlowGraph) -> Self {
        Self {
            id: FunctionId::new(cfg.name(), entry),
            cfg: cfg.successor_lists(),
            ipdom: cfg.ipdom(),
        }
    }

    /// Returns the function identity.
    #[must_use]
    pub fn id(&self) -> &FunctionId {
        &self.id
    }

    /// Returns the function name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.id.name
    }

    /// Returns the number of CFG nodes.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.cfg.len()
    }

    /// Returns the successor lists.
    #[must_use]
    pub fn cfg(&self) -> &[Vec<usize>] {
        &self.cfg
    }

    /// Returns the immediate postdominators.
    #[must_use]
    pub fn ipdoms(&self) -> &[Option<usize>] {
        &self.ipdom
    }

    /// Returns the immediate postdominator of `node`.
    #[must_use]
    pub fn ipdom(&self, node: usize) -> Option<usize> {
        self.ipdom.get(node).copied().flatten()
    }

    /// Returns `true` if `node` has two or more successors.
    #[must_use]
    pub fn is_branch(&self, node: usize) -> bool {
        self.cfg.get(node).is_some_and(|succs| succs.len() > 1)
    }
}

/// The static layouts of every instrumented function, keyed by name.
///
/// Built once before the program starts and handed to the
/// [`Recorder`](crate::runtime::Recorder).
#[derive(Debug, Clone, Default)]
pub struct ProgramLayout {
    functions: HashMap<String, Arc<StaticFunction>>,
}

impl ProgramLayout {
    /// Creates an empty layout.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds layouts for every function with a body; `entry` supplies entry addresses.
    pub fn from_cfgs<'a>(
        cfgs: impl IntoIterator<Item = &'a ControlFlowGraph>,
        entry: impl Fn(&ControlFlowGraph) -> u64,
    ) -> Self {
        let mut layout = Self::new();
        for cfg in cfgs.into_iter().filter(|cfg| !cfg.is_declaration()) {
            layout.insert(StaticFunction::from_cfg(entry(cfg), cfg));
        }
        layout
    }

    /// Registers a function, replacing any previous layout of the same name.
    pub fn insert(&mut self, function: StaticFunction) -> &mut Self {
        self.functions
            .insert(function.name().to_string(), Arc::new(function));
        self
    }

    /// Looks up a function by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Arc<StaticFunction>> {
        self.functions.get(name)
    }

    /// Returns the number of registered functions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.functions.len()
    }

    /// Returns `true` if no function is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }
}
