//! Lattice trait for data flow analysis.
//!
//! A lattice defines how abstract values combine where control flow merges. Forward
//! "may" analyses such as reaching definitions start every location at the bottom
//! element (no facts) and grow towards the top by joining the facts of all incoming
//! paths.
//!
//! # Lattice Theory Background
//!
//! - **Partial Order**: Elements can be compared (≤)
//! - **Join (∨)**: Least upper bound of two elements
//! - **Bottom (⊥)**: Least element (no information)
//!
//! On a finite lattice a monotone transfer function can only climb a bounded number of
//! times, which is what guarantees termination of the worklist solver.

use std::fmt::Debug;

use crate::utils::BitSet;

/// A join semi-lattice with a join (least upper bound) operation.
///
/// The join operation combines information from multiple control flow paths.
/// It must satisfy:
///
/// - **Idempotent**: `x.join(x) = x`
/// - **Commutative**: `x.join(y) = y.join(x)`
/// - **Associative**: `x.join(y.join(z)) = (x.join(y)).join(z)`
///
/// # Examples
///
/// ```rust
/// use faultline::analysis::dataflow::JoinSemiLattice;
/// use faultline::utils::BitSet;
///
/// let a = BitSet::from_indices(8, [1, 2]);
/// let b = BitSet::from_indices(8, [2, 5]);
/// assert_eq!(a.join(&b), BitSet::from_indices(8, [1, 2, 5]));
/// ```
pub trait JoinSemiLattice: Clone + Debug + PartialEq {
    /// Computes the join (least upper bound) of two lattice elements.
    #[must_use]
    fn join(&self, other: &Self) -> Self;

    /// Joins `other` into `self`. Returns `true` if `self` changed.
    fn join_with(&mut self, other: &Self) -> bool {
        let joined = self.join(other);
        if joined == *self {
            false
        } else {
            *self = joined;
            true
        }
    }

    /// Returns `true` if `self ≤ other` in the lattice order.
    fn is_below(&self, other: &Self) -> bool {
        self.join(other) == *other
    }
}

// Reaching sets: join is union, bottom is the empty set of the same width.
impl JoinSemiLattice for BitSet {
    fn join(&self, other: &Self) -> Self {
        let mut result = self.clone();
        result.union_with(other);
        result
    }

    fn join_with(&mut self, other: &Self) -> bool {
        self.union_with(other)
    }

    fn is_below(&self, other: &Self) -> bool {
        self.is_subset(other)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bitset_join_laws() {
        let x = BitSet::from_indices(70, [0, 65]);
        let y = BitSet::from_indices(70, [3]);
        let z = BitSet::from_indices(70, [65, 69]);

        assert_eq!(x.join(&x), x);
        assert_eq!(x.join(&y), y.join(&x));
        assert_eq!(x.join(&y.join(&z)), x.join(&y).join(&z));
    }

    #[test]
    fn test_join_with_reports_change() {
        let mut x = BitSet::from_indices(10, [1]);
        assert!(x.join_with(&BitSet::from_indices(10, [2])));
        assert!(!x.join_with(&BitSet::from_indices(10, [1, 2])));
        assert!(BitSet::from_indices(10, [2]).is_below(&x));
        assert!(!x.is_below(&BitSet::new(10)));
    }
}
