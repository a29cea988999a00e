//! Reaching definitions analysis.
//!
//! Reaching definitions computes, for each statement, which (re)definitions of local
//! variables may reach it without being overwritten by an intervening definition of the
//! same variable.
//!
//! # Algorithm
//!
//! Facts are [`Reference`] indices. For each location L:
//!
//! - `GEN[L]` = references of the identifier targets of L's assignment or
//!   increment/decrement; at the entry location, the receiver, parameters and named
//!   results
//! - `KILL[L]` = for each object touched by `GEN[L]`, its whole `redefs` set minus the
//!   reference just generated
//! - `IN[L]` = joined outputs of the predecessors (see [`WorklistSolver`])
//! - `OUT[L]` = `GEN[L] ∪ (IN[L] - KILL[L])`
//!
//! Only targets bound to an object of the analyzed function generate facts. Index, field
//! and dereference targets never do.

use std::collections::HashMap;

use crate::{
    analysis::{
        cfg::{BlockLocation, ControlFlowGraph},
        config::AnalysisConfig,
        dataflow::{
            framework::{AnalysisResults, DataFlowAnalysis},
            solver::WorklistSolver,
        },
        defuse::{Definitions, Reference},
        stmt::Ident,
    },
    utils::BitSet,
    Result,
};

/// Generated and killed reference indices of one location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenKill {
    /// References defined at the location
    pub gens: BitSet,
    /// References overwritten at the location
    pub kills: BitSet,
}

impl GenKill {
    fn empty(width: usize) -> Self {
        Self {
            gens: BitSet::new(width),
            kills: BitSet::new(width),
        }
    }

    fn apply(&self, input: &BitSet) -> BitSet {
        let mut out = input.clone();
        out.difference_with(&self.kills);
        out.union_with(&self.gens);
        out
    }
}

/// The gen/kill transfer function, precomputed for every defining location.
struct ReachingFlow {
    width: usize,
    transfer: HashMap<BlockLocation, GenKill>,
}

impl ReachingFlow {
    fn new(cfg: &ControlFlowGraph, defs: &Definitions) -> Self {
        let width = defs.reference_count();
        let mut transfer = HashMap::new();

        let entry = gen_kill_of(defs, cfg.signature().bindings());
        if !entry.gens.is_empty() {
            transfer.insert(BlockLocation::Entry, entry);
        }
        for (block_id, block) in cfg.blocks().iter().enumerate() {
            for (stmt_id, stmt) in block.stmts.iter().enumerate() {
                let gk = gen_kill_of(defs, stmt.redefined());
                if !gk.gens.is_empty() {
                    transfer.insert(BlockLocation::at(block_id, stmt_id), gk);
                }
            }
        }

        Self { width, transfer }
    }
}

fn gen_kill_of<'a>(defs: &Definitions, targets: impl Iterator<Item = &'a Ident>) -> GenKill {
    let mut gk = GenKill::empty(defs.reference_count());
    for target in targets {
        let Some(reference) = defs.reference(target.pos) else {
            continue;
        };
        let Some(object) = defs.object_of(reference) else {
            continue;
        };
        gk.gens.insert(reference.index);
        for redef in object.redefs.iter().filter(|&&r| r != reference.id) {
            if let Some(other) = defs.reference(*redef) {
                gk.kills.insert(other.index);
            }
        }
    }
    gk
}

impl DataFlowAnalysis for ReachingFlow {
    type Lattice = BitSet;

    fn bottom(&self) -> BitSet {
        BitSet::new(self.width)
    }

    fn flow(&self, loc: BlockLocation, input: &BitSet) -> BitSet {
        match self.transfer.get(&loc) {
            Some(gk) => gk.apply(input),
            None => input.clone(),
        }
    }
}

/// Solved reaching definitions of one function.
///
/// The value only exists once the fixpoint has been reached, so every query answers
/// from converged sets.
///
/// # Example
///
/// ```rust
/// use faultline::prelude::*;
///
/// // x := 0; x = 1; print(x)
/// let cfg = ControlFlowGraph::new(
///     "main.f",
///     Signature::new(),
///     vec![BasicBlock::new(
///         vec![
///             Statement::assign(vec![Ident::new("x", Pos(1))], vec![]),
///             Statement::assign(vec![Ident::new("x", Pos(7))], vec![]),
///             Statement::other(vec![Ident::new("x", Pos(19))]),
///         ],
///         vec![],
///         vec![],
///     )],
/// )?;
/// let mut oracle = ResolutionTable::new();
/// oracle
///     .define(&Ident::new("x", Pos(1)))
///     .use_of(Pos(7), Pos(1))
///     .use_of(Pos(19), Pos(1));
///
/// let defs = Definitions::find(&cfg, &oracle);
/// let reaching = ReachingDefinitions::solve(&cfg, defs, &AnalysisConfig::default())?;
///
/// // Only the second assignment reaches the print
/// let ids: Vec<_> = reaching
///     .reaching_in(BlockLocation::at(0, 2))
///     .iter()
///     .map(|r| r.id)
///     .collect();
/// assert_eq!(ids, vec![Pos(7)]);
/// # Ok::<(), faultline::Error>(())
/// ```
#[derive(Debug)]
pub struct ReachingDefinitions {
    defs: Definitions,
    transfer: HashMap<BlockLocation, GenKill>,
    results: AnalysisResults<BitSet>,
}

impl ReachingDefinitions {
    /// Runs the analysis to a fixpoint.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::FixpointNotReached`] if `config.max_iterations` is
    /// exceeded.
    pub fn solve(
        cfg: &ControlFlowGraph,
        defs: Definitions,
        config: &AnalysisConfig,
    ) -> Result<Self> {
        let flow = ReachingFlow::new(cfg, &defs);
        let results = WorklistSolver::new(&flow, cfg)
            .with_max_iterations(config.max_iterations)
            .solve()?;

        Ok(Self {
            defs,
            transfer: flow.transfer,
            results,
        })
    }

    /// Returns the gen and kill sets of `loc` as reference indices.
    ///
    /// Locations that define nothing, and locations outside the function, have empty
    /// sets.
    #[must_use]
    pub fn gen_kill(&self, loc: BlockLocation) -> GenKill {
        self.transfer
            .get(&loc)
            .cloned()
            .unwrap_or_else(|| GenKill::empty(self.defs.reference_count()))
    }

    /// References reaching the start of `loc`, in reference-index order.
    ///
    /// Empty for locations outside the function.
    #[must_use]
    pub fn reaching_in(&self, loc: BlockLocation) -> Vec<&Reference> {
        self.decode(self.results.in_state(loc))
    }

    /// References reaching the end of `loc`, in reference-index order.
    ///
    /// Empty for locations outside the function.
    #[must_use]
    pub fn reaching_out(&self, loc: BlockLocation) -> Vec<&Reference> {
        self.decode(self.results.out_state(loc))
    }

    fn decode(&self, set: Option<&BitSet>) -> Vec<&Reference> {
        set.map(|set| {
            set.iter()
                .filter_map(|index| self.defs.reference_by_index(index))
                .collect()
        })
        .unwrap_or_default()
    }

    /// Returns the object and reference tables the analysis ran on.
    #[must_use]
    pub fn definitions(&self) -> &Definitions {
        &self.defs
    }

    /// Returns the raw bit-set results.
    #[must_use]
    pub fn results(&self) -> &AnalysisResults<BitSet> {
        &self.results
    }

    /// Returns the number of worklist iterations needed to converge.
    #[must_use]
    pub fn iterations(&self) -> usize {
        self.results.iterations()
    }
}
