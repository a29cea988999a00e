//! Shared data structures and graph algorithms.
//!
//! - [`BitSet`] - Dense bit vector, the set lattice of the dataflow analyses and the
//!   predecessor-set representation of runtime profiles
//! - [`compute_dominators`] / [`compute_postdominators`] - Dominance over adjacency lists

mod bitset;
mod dominators;

pub use bitset::{BitSet, BitSetIter};
pub use dominators::{compute_dominators, compute_postdominators, DominatorTree};
