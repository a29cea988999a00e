//! Persistent per-function aggregates.

use std::sync::Arc;

use crate::{
    runtime::{
        call::FuncCall,
        layout::{FunctionId, StaticFunction},
        profile::ExportFunction,
    },
    utils::BitSet,
    Error, Result,
};

/// Accumulated dynamic control-dependence profile of one function.
///
/// Created on the first completed call and grown by every later one. Predecessor sets only
/// ever grow, so folding calls and merging aggregates commute.
///
/// # Examples
///
/// ```rust
/// use std::sync::Arc;
/// use faultline::runtime::{Function, FunctionId, StaticFunction};
///
/// let layout = Arc::new(StaticFunction::from_successors(
///     FunctionId::new("main.f", 0x1000),
///     vec![vec![1, 2], vec![2], vec![]],
/// )?);
/// let mut a = Function::new(layout.clone());
/// let b = Function::new(layout);
/// a.merge(&b)?;
/// assert_eq!(a.calls(), 0);
/// # Ok::<(), faultline::Error>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Function {
    layout: Arc<StaticFunction>,
    calls: u64,
    dyn_cdp: Vec<BitSet>,
}

impl Function {
    /// Creates an aggregate with no calls.
    #[must_use]
    pub fn new(layout: Arc<StaticFunction>) -> Self {
        let nodes = layout.node_count();
        Self {
            layout,
            calls: 0,
            dyn_cdp: vec![BitSet::new(nodes); nodes],
        }
    }

    /// Folds a finished call into the aggregate.
    ///
    /// # Errors
    ///
    /// Returns [`Error::IdentityMismatch`] or [`Error::ShapeMismatch`] if the call belongs
    /// to a different function. Both are fatal; the aggregate is left unchanged.
    pub fn update(&mut self, call: &FuncCall) -> Result<()> {
        self.check(call.id(), call.dyn_cdp().len())?;
        self.calls += 1;
        self.union(call.dyn_cdp());
        Ok(())
    }

    /// Merges another aggregate of the same function into this one.
    ///
    /// # Errors
    ///
    /// Returns [`Error::IdentityMismatch`] or [`Error::ShapeMismatch`] if `other` belongs
    /// to a different function. Both are fatal; the aggregate is left unchanged.
    pub fn merge(&mut self, other: &Function) -> Result<()> {
        self.check(other.id(), other.dyn_cdp.len())?;
        self.calls += other.calls;
        self.union(&other.dyn_cdp);
        Ok(())
    }

    /// Fails exactly when [`merge`](Self::merge) with `other` would, without merging.
    pub(crate) fn check_mergeable(&self, other: &Function) -> Result<()> {
        self.check(other.id(), other.dyn_cdp.len())
    }

    fn check(&self, id: &FunctionId, nodes: usize) -> Result<()> {
        if id != self.id() {
            return Err(Error::IdentityMismatch {
                expected: self.id().clone(),
                found: id.clone(),
            });
        }
        if nodes != self.dyn_cdp.len() {
            return Err(Error::ShapeMismatch {
                function: self.id().clone(),
                expected: self.dyn_cdp.len(),
                found: nodes,
            });
        }
        Ok(())
    }

    fn union(&mut self, other: &[BitSet]) {
        for (ours, theirs) in self.dyn_cdp.iter_mut().zip(other) {
            ours.union_with(theirs);
        }
    }

    /// Rebuilds an aggregate from its persisted form.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Malformed`] if the layout is inconsistent or a predecessor index
    /// is out of range.
    pub fn from_export(export: &ExportFunction) -> Result<Self> {
        let layout = StaticFunction::new(
            FunctionId::new(export.name.clone(), export.entry),
            export.cfg.clone(),
            export.ipdom.clone(),
        )?;
        let nodes = layout.node_count();
        if export.dyn_cdp.len() != nodes {
            return Err(malformed_error!(
                "{}: {} nodes but {} predecessor sets",
                layout.id(),
                nodes,
                export.dyn_cdp.len()
            ));
        }

        let mut dyn_cdp = Vec::with_capacity(nodes);
        for (node, preds) in export.dyn_cdp.iter().enumerate() {
            if let Some(bad) = preds.iter().find(|&&p| p >= nodes) {
                return Err(malformed_error!(
                    "{}: node {} has predecessor {}, but only {} nodes exist",
                    layout.id(),
                    node,
                    bad,
                    nodes
                ));
            }
            dyn_cdp.push(BitSet::from_indices(nodes, preds.iter().copied()));
        }

        Ok(Self {
            layout: Arc::new(layout),
            calls: export.calls,
            dyn_cdp,
        })
    }

    /// Converts the aggregate into its persisted form.
    #[must_use]
    pub fn export(&self) -> ExportFunction {
        ExportFunction {
            name: self.layout.name().to_string(),
            entry: self.layout.id().entry,
            cfg: self.layout.cfg().to_vec(),
            ipdom: self.layout.ipdoms().to_vec(),
            calls: self.calls,
            dyn_cdp: self
                .dyn_cdp
                .iter()
                .map(|preds| preds.iter().collect())
                .collect(),
        }
    }

    /// Returns the function identity.
    #[must_use]
    pub fn id(&self) -> &FunctionId {
        self.layout.id()
    }

    /// Returns the static layout.
    #[must_use]
    pub fn layout(&self) -> &Arc<StaticFunction> {
        &self.layout
    }

    /// Returns the number of completed calls.
    #[must_use]
    pub fn calls(&self) -> u64 {
        self.calls
    }

    /// Returns the observed control-dependence predecessors of every node.
    #[must_use]
    pub fn dyn_cdp(&self) -> &[BitSet] {
        &self.dyn_cdp
    }
}
