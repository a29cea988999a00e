//! Control flow graph of a single function.
//!
//! The graph is supplied by a front end and treated as read-only input. Blocks are
//! identified by their index; block `0` is the function entry. Edges are stored on
//! both ends (`prev` and `next`) and validated against each other on construction.
//!
//! Expensive derived facts are computed lazily and cached:
//!
//! - [`postdominators`](ControlFlowGraph::postdominators) - Immediate postdominator of
//!   every block, used to seed runtime control-dependence tracking

use std::{fmt, sync::OnceLock};

use crate::{
    analysis::stmt::{Signature, Statement},
    utils::compute_postdominators,
    Result,
};

/// A program point: either the synthetic function entry, or a statement of a block.
///
/// The entry location carries the bindings of receiver, parameters and named results.
/// Blocks without statements still own one location, `At { block, stmt: 0 }`, which
/// passes dataflow facts through unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum BlockLocation {
    /// The synthetic entry location, before block `0` starts
    Entry,
    /// Statement `stmt` of block `block`
    At {
        /// Block index
        block: usize,
        /// Statement index within the block
        stmt: usize,
    },
}

impl BlockLocation {
    /// Creates a statement location.
    #[must_use]
    pub const fn at(block: usize, stmt: usize) -> Self {
        BlockLocation::At { block, stmt }
    }

    /// Returns the block index, or `None` for the entry location.
    #[must_use]
    pub const fn block(&self) -> Option<usize> {
        match self {
            BlockLocation::Entry => None,
            BlockLocation::At { block, .. } => Some(*block),
        }
    }
}

impl fmt::Display for BlockLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BlockLocation::Entry => write!(f, "entry"),
            BlockLocation::At { block, stmt } => write!(f, "b{block}:{stmt}"),
        }
    }
}

/// A basic block: a straight-line statement sequence with its CFG edges.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BasicBlock {
    /// Statements in execution order
    pub stmts: Vec<Statement>,
    /// Predecessor block indices
    pub prev: Vec<usize>,
    /// Successor block indices
    pub next: Vec<usize>,
}

impl BasicBlock {
    /// Creates a block from its statements and edges.
    #[must_use]
    pub fn new(stmts: Vec<Statement>, prev: Vec<usize>, next: Vec<usize>) -> Self {
        Self { stmts, prev, next }
    }

    /// Number of dataflow locations this block owns (at least one).
    #[must_use]
    pub fn location_count(&self) -> usize {
        self.stmts.len().max(1)
    }

    /// Returns `true` if the block ends in a branch (two or more successors).
    #[must_use]
    pub fn is_branch(&self) -> bool {
        self.next.len() > 1
    }
}

/// The control flow graph of one function.
///
/// # Construction
///
/// ```rust
/// use faultline::analysis::{BasicBlock, ControlFlowGraph, Signature};
///
/// // 0 -> {1, 2} -> 3
/// let cfg = ControlFlowGraph::new(
///     "main.pick",
///     Signature::new(),
///     vec![
///         BasicBlock::new(vec![], vec![], vec![1, 2]),
///         BasicBlock::new(vec![], vec![0], vec![3]),
///         BasicBlock::new(vec![], vec![0], vec![3]),
///         BasicBlock::new(vec![], vec![1, 2], vec![]),
///     ],
/// )?;
/// assert_eq!(cfg.ipdom(), vec![Some(3), Some(3), Some(3), None]);
/// # Ok::<(), faultline::Error>(())
/// ```
///
/// # Declarations
///
/// A function declared without a body has no blocks. Such graphs can be built with
/// [`declaration`](Self::declaration) and are skipped by the batch driver.
///
/// # Thread Safety
///
/// `ControlFlowGraph` is [`Send`] and [`Sync`]. Lazily computed facts use [`OnceLock`].
#[derive(Debug)]
pub struct ControlFlowGraph {
    /// Fully qualified function name
    name: String,
    /// Receiver, parameters and named results
    signature: Signature,
    /// The blocks, indexed by block id
    blocks: Vec<BasicBlock>,
    /// Lazily computed immediate postdominators
    postdominators: OnceLock<Vec<Option<usize>>>,
}

impl ControlFlowGraph {
    /// Creates a control flow graph, validating its edges.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Malformed`] if an edge refers to a block that does not
    /// exist, or if a `next` edge has no matching `prev` edge (or vice versa).
    pub fn new(
        name: impl Into<String>,
        signature: Signature,
        blocks: Vec<BasicBlock>,
    ) -> Result<Self> {
        let name = name.into();
        let count = blocks.len();

        for (id, block) in blocks.iter().enumerate() {
            for &succ in &block.next {
                let Some(target) = blocks.get(succ) else {
                    return Err(malformed_error!(
                        "{}: block {} has successor {}, but only {} blocks exist",
                        name,
                        id,
                        succ,
                        count
                    ));
                };
                if !target.prev.contains(&id) {
                    return Err(malformed_error!(
                        "{}: edge {} -> {} is missing from the predecessors of {}",
                        name,
                        id,
                        succ,
                        succ
                    ));
                }
            }
            for &pred in &block.prev {
                let Some(source) = blocks.get(pred) else {
                    return Err(malformed_error!(
                        "{}: block {} has predecessor {}, but only {} blocks exist",
                        name,
                        id,
                        pred,
                        count
                    ));
                };
                if !source.next.contains(&id) {
                    return Err(malformed_error!(
                        "{}: edge {} -> {} is missing from the successors of {}",
                        name,
                        pred,
                        id,
                        pred
                    ));
                }
            }
        }

        Ok(Self {
            name,
            signature,
            blocks,
            postdominators: OnceLock::new(),
        })
    }

    /// Creates a body-less declaration.
    #[must_use]
    pub fn declaration(name: impl Into<String>, signature: Signature) -> Self {
        Self {
            name: name.into(),
            signature,
            blocks: Vec::new(),
            postdominators: OnceLock::new(),
        }
    }

    /// Returns the function name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the function signature.
    #[must_use]
    pub fn signature(&self) -> &Signature {
        &self.signature
    }

    /// Returns `true` if the function has no body.
    #[must_use]
    pub fn is_declaration(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Returns all blocks, indexed by id.
    #[must_use]
    pub fn blocks(&self) -> &[BasicBlock] {
        &self.blocks
    }

    /// Returns the number of blocks.
    #[must_use]
    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    /// Returns a block by id.
    #[must_use]
    pub fn block(&self, id: usize) -> Option<&BasicBlock> {
        self.blocks.get(id)
    }

    /// Returns the statement at `loc`, or `None` for the entry location, for the
    /// pass-through location of an empty block, and for out-of-range locations.
    #[must_use]
    pub fn statement(&self, loc: BlockLocation) -> Option<&Statement> {
        match loc {
            BlockLocation::Entry => None,
            BlockLocation::At { block, stmt } => self.blocks.get(block)?.stmts.get(stmt),
        }
    }

    /// Returns the last dataflow location of a block.
    #[must_use]
    pub fn last_location(&self, block: usize) -> Option<BlockLocation> {
        let blk = self.blocks.get(block)?;
        Some(BlockLocation::at(block, blk.location_count() - 1))
    }

    /// Returns `true` if `loc` is a location of this graph.
    #[must_use]
    pub fn contains(&self, loc: BlockLocation) -> bool {
        match loc {
            BlockLocation::Entry => true,
            BlockLocation::At { block, stmt } => self
                .blocks
                .get(block)
                .is_some_and(|b| stmt < b.location_count()),
        }
    }

    /// Returns the successor adjacency lists, the runtime snapshot of this graph.
    #[must_use]
    pub fn successor_lists(&self) -> Vec<Vec<usize>> {
        self.blocks.iter().map(|b| b.next.clone()).collect()
    }

    /// Returns the immediate postdominators of all blocks (computed once).
    ///
    /// `None` means the block is postdominated only by the function exit.
    #[must_use]
    pub fn postdominators(&self) -> &[Option<usize>] {
        self.postdominators
            .get_or_init(|| compute_postdominators(&self.successor_lists()))
    }

    /// Returns an owned copy of [`postdominators`](Self::postdominators).
    #[must_use]
    pub fn ipdom(&self) -> Vec<Option<usize>> {
        self.postdominators().to_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        analysis::stmt::{Ident, Pos},
        Error,
    };

    fn chain() -> ControlFlowGraph {
        ControlFlowGraph::new(
            "main.chain",
            Signature::new(),
            vec![
                BasicBlock::new(
                    vec![
                        Statement::other(vec![Ident::new("a", Pos(1))]),
                        Statement::other(vec![Ident::new("b", Pos(2))]),
                    ],
                    vec![],
                    vec![1],
                ),
                BasicBlock::new(vec![], vec![0], vec![]),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_locations() {
        let cfg = chain();
        assert_eq!(cfg.last_location(0), Some(BlockLocation::at(0, 1)));
        // Empty blocks own a single pass-through location
        assert_eq!(cfg.last_location(1), Some(BlockLocation::at(1, 0)));
        assert_eq!(cfg.last_location(2), None);

        assert!(cfg.contains(BlockLocation::Entry));
        assert!(cfg.contains(BlockLocation::at(1, 0)));
        assert!(!cfg.contains(BlockLocation::at(0, 2)));
        assert!(!cfg.contains(BlockLocation::at(7, 0)));

        assert!(cfg.statement(BlockLocation::at(0, 1)).is_some());
        assert!(cfg.statement(BlockLocation::at(1, 0)).is_none());
        assert!(cfg.statement(BlockLocation::Entry).is_none());
    }

    #[test]
    fn test_malformed_successor() {
        let result = ControlFlowGraph::new(
            "main.bad",
            Signature::new(),
            vec![BasicBlock::new(vec![], vec![], vec![4])],
        );
        assert!(matches!(result, Err(Error::Malformed { .. })));
    }

    #[test]
    fn test_malformed_asymmetric_edge() {
        let result = ControlFlowGraph::new(
            "main.bad",
            Signature::new(),
            vec![
                BasicBlock::new(vec![], vec![], vec![1]),
                BasicBlock::new(vec![], vec![], vec![]),
            ],
        );
        assert!(matches!(result, Err(Error::Malformed { .. })));
    }

    #[test]
    fn test_declaration() {
        let cfg = ControlFlowGraph::declaration("os.Exit", Signature::new());
        assert!(cfg.is_declaration());
        assert!(cfg.postdominators().is_empty());
    }

    #[test]
    fn test_location_display() {
        assert_eq!(BlockLocation::Entry.to_string(), "entry");
        assert_eq!(BlockLocation::at(3, 1).to_string(), "b3:1");
    }
}
