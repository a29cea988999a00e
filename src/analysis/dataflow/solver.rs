//! Worklist-based data flow solver.
//!
//! This module provides the iterative solver that computes fixpoints for forward data
//! flow analyses over statement locations.
//!
//! # Algorithm
//!
//! The solver iterates until a fixpoint is reached:
//!
//! 1. Initialize every location with the bottom value
//! 2. Add all locations to the worklist, entry first, then blocks in id order
//! 3. While the worklist is non-empty:
//!    a. Remove a location from the front of the worklist
//!    b. Compute its input from the current outputs of its predecessors
//!    c. Apply the transfer function to get the output
//!    d. If the output changed, add the dependent locations to the worklist
//!
//! The input of a block's first location joins the outputs of the last locations of all
//! predecessor blocks. The entry block, and any block without predecessors, also joins
//! the output of [`BlockLocation::Entry`]. Every other location reads the output of the
//! statement before it.
//!
//! A location is never queued twice: a pending flag per slot filters duplicates.
//!
//! # Complexity
//!
//! Each location can change at most `h` times where `h` is the lattice height, so the
//! solver performs O(n * h) transfer function calls for `n` locations. The fixpoint does
//! not depend on visit order; only the iteration count does.

use std::collections::VecDeque;

use tracing::{debug, warn};

use crate::{
    analysis::{
        cfg::{BlockLocation, ControlFlowGraph},
        dataflow::{
            framework::{AnalysisResults, DataFlowAnalysis, LocationIndex},
            lattice::JoinSemiLattice,
        },
    },
    Error, Result,
};

/// Worklist-based data flow solver.
///
/// # Usage
///
/// ```rust,ignore
/// use faultline::analysis::dataflow::WorklistSolver;
///
/// let results = WorklistSolver::new(&analysis, &cfg)
///     .with_max_iterations(Some(10_000))
///     .solve()?;
///
/// let in_state = results.in_state(BlockLocation::at(0, 1));
/// ```
pub struct WorklistSolver<'a, A: DataFlowAnalysis> {
    /// The analysis being solved.
    analysis: &'a A,
    /// The graph being analyzed.
    cfg: &'a ControlFlowGraph,
    /// Location numbering.
    index: LocationIndex,
    /// Input state for each location.
    in_states: Vec<A::Lattice>,
    /// Output state for each location.
    out_states: Vec<A::Lattice>,
    /// Worklist of location slots to process.
    worklist: VecDeque<usize>,
    /// Whether each slot is currently in the worklist (for deduplication).
    in_worklist: Vec<bool>,
    /// Number of iterations performed.
    iterations: usize,
    /// Upper bound on iterations, unbounded if `None`.
    max_iterations: Option<usize>,
}

impl<'a, A: DataFlowAnalysis> WorklistSolver<'a, A> {
    /// Creates a new solver for the given analysis and graph.
    #[must_use]
    pub fn new(analysis: &'a A, cfg: &'a ControlFlowGraph) -> Self {
        Self {
            analysis,
            cfg,
            index: LocationIndex::new(cfg),
            in_states: Vec::new(),
            out_states: Vec::new(),
            worklist: VecDeque::new(),
            in_worklist: Vec::new(),
            iterations: 0,
            max_iterations: None,
        }
    }

    /// Bounds the number of worklist iterations.
    #[must_use]
    pub fn with_max_iterations(mut self, max: Option<usize>) -> Self {
        self.max_iterations = max;
        self
    }

    /// Solves the data flow analysis to a fixpoint.
    ///
    /// # Errors
    ///
    /// Returns [`Error::FixpointNotReached`] if the iteration bound is exceeded.
    pub fn solve(mut self) -> Result<AnalysisResults<A::Lattice>> {
        self.initialize();
        self.iterate()?;

        debug!(
            function = self.cfg.name(),
            locations = self.index.len(),
            iterations = self.iterations,
            "fixpoint reached"
        );
        Ok(AnalysisResults::new(
            self.index,
            self.in_states,
            self.out_states,
            self.iterations,
        ))
    }

    /// Initializes the solver state.
    fn initialize(&mut self) {
        let count = self.index.len();
        let bottom = self.analysis.bottom();

        self.in_states = vec![bottom.clone(); count];
        self.out_states = vec![bottom; count];
        self.in_worklist = vec![true; count];
        self.worklist = (0..count).collect();
    }

    /// Main iteration loop.
    fn iterate(&mut self) -> Result<()> {
        while let Some(slot) = self.worklist.pop_front() {
            self.in_worklist[slot] = false;
            self.iterations += 1;

            if self.max_iterations.is_some_and(|max| self.iterations > max) {
                warn!(
                    function = self.cfg.name(),
                    iterations = self.iterations,
                    "worklist solver exceeded its iteration budget"
                );
                return Err(Error::FixpointNotReached {
                    function: self.cfg.name().to_string(),
                    iterations: self.iterations,
                });
            }

            let Some(loc) = self.index.location(slot) else {
                continue;
            };
            if self.process(slot, loc) {
                self.add_dependents(loc);
            }
        }
        Ok(())
    }

    /// Recomputes one location. Returns `true` if its output state changed.
    fn process(&mut self, slot: usize, loc: BlockLocation) -> bool {
        let input = self.input_of(loc);
        let output = self.analysis.flow(loc, &input);
        self.in_states[slot] = input;

        if output == self.out_states[slot] {
            return false;
        }
        self.out_states[slot] = output;
        true
    }

    /// Joins the current output states that flow into `loc`.
    fn input_of(&self, loc: BlockLocation) -> A::Lattice {
        let mut input = self.analysis.bottom();
        let BlockLocation::At { block, stmt } = loc else {
            return input;
        };

        if stmt > 0 {
            if let Some(prev) = self.index.slot(BlockLocation::at(block, stmt - 1)) {
                input.join_with(&self.out_states[prev]);
            }
            return input;
        }

        let Some(blk) = self.cfg.block(block) else {
            return input;
        };
        if block == 0 || blk.prev.is_empty() {
            input.join_with(&self.out_states[0]);
        }
        for &pred in &blk.prev {
            let last = self
                .cfg
                .last_location(pred)
                .and_then(|l| self.index.slot(l));
            if let Some(last) = last {
                input.join_with(&self.out_states[last]);
            }
        }
        input
    }

    /// Queues the locations that read the output of `loc`.
    fn add_dependents(&mut self, loc: BlockLocation) {
        match loc {
            BlockLocation::Entry => {
                for (id, block) in self.cfg.blocks().iter().enumerate() {
                    if id == 0 || block.prev.is_empty() {
                        self.enqueue(BlockLocation::at(id, 0));
                    }
                }
            }
            BlockLocation::At { block, stmt } => {
                let Some(blk) = self.cfg.block(block) else {
                    return;
                };
                if stmt + 1 < blk.location_count() {
                    self.enqueue(BlockLocation::at(block, stmt + 1));
                } else {
                    for &succ in &blk.next {
                        self.enqueue(BlockLocation::at(succ, 0));
                    }
                }
            }
        }
    }

    fn enqueue(&mut self, loc: BlockLocation) {
        if let Some(slot) = self.index.slot(loc) {
            if !self.in_worklist[slot] {
                self.in_worklist[slot] = true;
                self.worklist.push_back(slot);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{cell::RefCell, collections::HashMap};

    use super::*;
    use crate::{
        analysis::{cfg::BasicBlock, stmt::Signature},
        utils::BitSet,
    };

    /// Adds the block id to the set at the first location of every block.
    struct BlockTrail {
        width: usize,
    }

    impl DataFlowAnalysis for BlockTrail {
        type Lattice = BitSet;

        fn bottom(&self) -> BitSet {
            BitSet::new(self.width)
        }

        fn flow(&self, loc: BlockLocation, input: &BitSet) -> BitSet {
            let mut out = input.clone();
            if let BlockLocation::At { block, stmt: 0 } = loc {
                out.insert(block);
            }
            out
        }
    }

    /// Wraps an analysis and remembers every output it produced per location.
    struct Recording<A: DataFlowAnalysis> {
        inner: A,
        outputs: RefCell<HashMap<BlockLocation, Vec<A::Lattice>>>,
    }

    impl<A: DataFlowAnalysis> DataFlowAnalysis for Recording<A> {
        type Lattice = A::Lattice;

        fn bottom(&self) -> A::Lattice {
            self.inner.bottom()
        }

        fn flow(&self, loc: BlockLocation, input: &A::Lattice) -> A::Lattice {
            let out = self.inner.flow(loc, input);
            self.outputs
                .borrow_mut()
                .entry(loc)
                .or_default()
                .push(out.clone());
            out
        }
    }

    /// Never converges: every location grows a fresh fact on each visit.
    struct Unbounded;

    impl DataFlowAnalysis for Unbounded {
        type Lattice = BitSet;

        fn bottom(&self) -> BitSet {
            BitSet::new(64)
        }

        fn flow(&self, _loc: BlockLocation, input: &BitSet) -> BitSet {
            let mut out = input.clone();
            if let Some(next) = (0..64).find(|&i| !out.contains(i)) {
                out.insert(next);
            }
            out
        }
    }

    /// 0 -> 1 (header) -> 2 (body) -> 1, 1 -> 3 (exit)
    fn looping() -> ControlFlowGraph {
        ControlFlowGraph::new(
            "main.loop",
            Signature::new(),
            vec![
                BasicBlock::new(vec![], vec![], vec![1]),
                BasicBlock::new(vec![], vec![0, 2], vec![2, 3]),
                BasicBlock::new(vec![], vec![1], vec![1]),
                BasicBlock::new(vec![], vec![1], vec![]),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_loop_back_edge_reaches_header() {
        let cfg = looping();
        let results = WorklistSolver::new(&BlockTrail { width: 4 }, &cfg)
            .solve()
            .unwrap();

        // Header sees its own loop body through the back edge
        assert_eq!(
            results.in_state(BlockLocation::at(1, 0)),
            Some(&BitSet::from_indices(4, [0, 1, 2]))
        );
        assert_eq!(
            results.out_state(BlockLocation::at(3, 0)),
            Some(&BitSet::from_indices(4, [0, 1, 2, 3]))
        );
        assert_eq!(results.in_state(BlockLocation::Entry), Some(&BitSet::new(4)));
        assert!(results.iterations() >= results.locations().len());
    }

    #[test]
    fn test_monotone_and_stable() {
        let cfg = looping();
        let analysis = Recording {
            inner: BlockTrail { width: 4 },
            outputs: RefCell::new(HashMap::new()),
        };
        let results = WorklistSolver::new(&analysis, &cfg).solve().unwrap();

        for (loc, outputs) in analysis.outputs.borrow().iter() {
            for pair in outputs.windows(2) {
                assert!(pair[0].is_below(&pair[1]), "{loc} shrank: {pair:?}");
            }
        }

        for loc in results.locations().iter() {
            let input = results.in_state(loc).unwrap();
            assert_eq!(
                &analysis.inner.flow(loc, input),
                results.out_state(loc).unwrap(),
                "{loc} is not stable"
            );
        }
    }

    #[test]
    fn test_unreachable_block_reads_entry() {
        // Block 1 has no predecessors and is not the entry block
        let cfg = ControlFlowGraph::new(
            "main.f",
            Signature::new(),
            vec![
                BasicBlock::new(vec![], vec![], vec![]),
                BasicBlock::new(vec![], vec![], vec![]),
            ],
        )
        .unwrap();

        struct EntryFact;
        impl DataFlowAnalysis for EntryFact {
            type Lattice = BitSet;
            fn bottom(&self) -> BitSet {
                BitSet::new(1)
            }
            fn flow(&self, loc: BlockLocation, input: &BitSet) -> BitSet {
                let mut out = input.clone();
                if loc == BlockLocation::Entry {
                    out.insert(0);
                }
                out
            }
        }

        let results = WorklistSolver::new(&EntryFact, &cfg).solve().unwrap();
        assert!(results.in_state(BlockLocation::at(0, 0)).unwrap().contains(0));
        assert!(results.in_state(BlockLocation::at(1, 0)).unwrap().contains(0));
    }

    #[test]
    fn test_iteration_budget() {
        let cfg = looping();
        let result = WorklistSolver::new(&Unbounded, &cfg)
            .with_max_iterations(Some(20))
            .solve();
        match result {
            Err(Error::FixpointNotReached {
                function,
                iterations,
            }) => {
                assert_eq!(function, "main.loop");
                assert_eq!(iterations, 21);
            }
            other => panic!("expected FixpointNotReached, got {other:?}"),
        }
    }
}
