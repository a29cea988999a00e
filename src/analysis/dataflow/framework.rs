//! Data flow analysis framework trait and location indexing.
//!
//! This module defines the core abstraction for data flow analyses. Any specific
//! analysis implements the [`DataFlowAnalysis`] trait to work with the
//! [`WorklistSolver`](super::WorklistSolver).
//!
//! Unlike block-level frameworks, facts are tracked per statement: every
//! [`BlockLocation`] of a function (the synthetic entry, each statement, and the
//! pass-through location of each empty block) owns one in-state and one out-state.

use crate::analysis::{
    cfg::{BlockLocation, ControlFlowGraph},
    dataflow::lattice::JoinSemiLattice,
};

/// A forward data flow analysis over statement locations.
///
/// Implementations provide the bottom element and the transfer function; the solver
/// handles joining predecessor states and iteration to a fixpoint.
///
/// # Transfer Functions
///
/// `out[loc] = flow(loc, in[loc])`. The function must be monotone: a larger input may
/// never produce a smaller output. It is called for every location, including
/// [`BlockLocation::Entry`] (whose input is always bottom) and the pass-through location
/// of empty blocks.
///
/// # Example
///
/// ```rust
/// use faultline::analysis::{
///     dataflow::{DataFlowAnalysis, WorklistSolver},
///     BasicBlock, BlockLocation, ControlFlowGraph, Signature,
/// };
/// use faultline::utils::BitSet;
///
/// /// Records which blocks may have executed.
/// struct Visited(usize);
///
/// impl DataFlowAnalysis for Visited {
///     type Lattice = BitSet;
///
///     fn bottom(&self) -> BitSet {
///         BitSet::new(self.0)
///     }
///
///     fn flow(&self, loc: BlockLocation, input: &BitSet) -> BitSet {
///         let mut out = input.clone();
///         if let Some(block) = loc.block() {
///             out.insert(block);
///         }
///         out
///     }
/// }
///
/// let cfg = ControlFlowGraph::new(
///     "main.f",
///     Signature::new(),
///     vec![
///         BasicBlock::new(vec![], vec![], vec![1]),
///         BasicBlock::new(vec![], vec![0], vec![]),
///     ],
/// )?;
/// let results = WorklistSolver::new(&Visited(2), &cfg).solve()?;
/// assert_eq!(
///     results.out_state(BlockLocation::at(1, 0)),
///     Some(&BitSet::from_indices(2, [0, 1]))
/// );
/// # Ok::<(), faultline::Error>(())
/// ```
pub trait DataFlowAnalysis {
    /// The lattice type for this analysis.
    type Lattice: JoinSemiLattice;

    /// Returns the bottom element: the initial value of every location and the input of
    /// the entry location.
    fn bottom(&self) -> Self::Lattice;

    /// Computes the transfer function for a single location.
    ///
    /// # Arguments
    ///
    /// * `loc` - The location being processed
    /// * `input` - The abstract state flowing into the location
    ///
    /// # Returns
    ///
    /// The abstract state after the location.
    fn flow(&self, loc: BlockLocation, input: &Self::Lattice) -> Self::Lattice;
}

/// Dense numbering of every location of a function.
///
/// Slot `0` is [`BlockLocation::Entry`]; the locations of block `b` follow in statement
/// order. Empty blocks own exactly one slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocationIndex {
    /// First slot of each block
    offsets: Vec<usize>,
    /// Location of each slot
    locations: Vec<BlockLocation>,
}

impl LocationIndex {
    /// Numbers the locations of `cfg`.
    #[must_use]
    pub fn new(cfg: &ControlFlowGraph) -> Self {
        let mut offsets = Vec::with_capacity(cfg.block_count());
        let mut locations = vec![BlockLocation::Entry];
        for (id, block) in cfg.blocks().iter().enumerate() {
            offsets.push(locations.len());
            locations.extend((0..block.location_count()).map(|stmt| BlockLocation::at(id, stmt)));
        }
        Self { offsets, locations }
    }

    /// Returns the slot of `loc`, or `None` if it is not a location of the function.
    #[must_use]
    pub fn slot(&self, loc: BlockLocation) -> Option<usize> {
        match loc {
            BlockLocation::Entry => Some(0),
            BlockLocation::At { block, stmt } => {
                let start = *self.offsets.get(block)?;
                let end = self
                    .offsets
                    .get(block + 1)
                    .copied()
                    .unwrap_or(self.locations.len());
                let slot = start + stmt;
                (slot < end).then_some(slot)
            }
        }
    }

    /// Returns the location stored in `slot`.
    #[must_use]
    pub fn location(&self, slot: usize) -> Option<BlockLocation> {
        self.locations.get(slot).copied()
    }

    /// Returns the number of locations, entry included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.locations.len()
    }

    /// Always `false`: the entry location exists even for declarations.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.locations.is_empty()
    }

    /// Iterates all locations in slot order.
    pub fn iter(&self) -> impl Iterator<Item = BlockLocation> + '_ {
        self.locations.iter().copied()
    }
}

/// Results of a data flow analysis.
///
/// This provides access to the computed abstract values at every location. The value
/// only exists once the solver converged, so every state it hands out is a fixpoint.
#[derive(Debug, Clone)]
pub struct AnalysisResults<L> {
    /// Location numbering shared by both state vectors
    index: LocationIndex,
    /// Input state for each slot (before the transfer function)
    in_states: Vec<L>,
    /// Output state for each slot (after the transfer function)
    out_states: Vec<L>,
    /// Worklist iterations the solver needed
    iterations: usize,
}

impl<L> AnalysisResults<L> {
    /// Creates new analysis results with the given states.
    #[must_use]
    pub fn new(
        index: LocationIndex,
        in_states: Vec<L>,
        out_states: Vec<L>,
        iterations: usize,
    ) -> Self {
        Self {
            index,
            in_states,
            out_states,
            iterations,
        }
    }

    /// Returns the input state for a location, or `None` if it is out of range.
    #[must_use]
    pub fn in_state(&self, loc: BlockLocation) -> Option<&L> {
        self.in_states.get(self.index.slot(loc)?)
    }

    /// Returns the output state for a location, or `None` if it is out of range.
    #[must_use]
    pub fn out_state(&self, loc: BlockLocation) -> Option<&L> {
        self.out_states.get(self.index.slot(loc)?)
    }

    /// Returns the number of worklist iterations needed to converge.
    #[must_use]
    pub const fn iterations(&self) -> usize {
        self.iterations
    }

    /// Returns the location numbering.
    #[must_use]
    pub fn locations(&self) -> &LocationIndex {
        &self.index
    }
}
