//! A dense bit vector used as the set lattice of the dataflow analyses and as the
//! per-node predecessor set of dynamic control-dependence profiles.
//!
//! Elements are small integers: dense reference indices in the static analysis, CFG
//! node indices at runtime. Every set in a given analysis shares one capacity, which
//! keeps union and difference a single pass over the words.
//!
//! # Example
//!
//! ```rust
//! use faultline::utils::BitSet;
//!
//! let mut set = BitSet::new(100);
//! assert!(set.insert(0));
//! assert!(set.insert(50));
//! assert!(!set.insert(50));
//!
//! assert!(set.contains(50));
//! assert_eq!(set.count(), 2);
//! assert_eq!(set.iter().collect::<Vec<_>>(), vec![0, 50]);
//! ```

/// A fixed-capacity bit vector with the set operations needed by gen/kill analyses.
#[derive(Clone, PartialEq, Eq, Hash, Default)]
pub struct BitSet {
    /// The bits, stored as a vector of words.
    words: Vec<u64>,
    /// The number of addressable bits.
    len: usize,
}

impl BitSet {
    /// Creates a new empty bit set with the given capacity.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            words: vec![0; capacity.div_ceil(64)],
            len: capacity,
        }
    }

    /// Creates a bit set of the given capacity containing `indices`.
    ///
    /// # Panics
    ///
    /// Panics if any index is `>= capacity`.
    #[must_use]
    pub fn from_indices(capacity: usize, indices: impl IntoIterator<Item = usize>) -> Self {
        let mut set = Self::new(capacity);
        for index in indices {
            set.insert(index);
        }
        set
    }

    /// Returns the capacity of this bit set.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` if no bit is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.words.iter().all(|&w| w == 0)
    }

    /// Sets the bit at `index`. Returns `true` if it was not set before.
    ///
    /// # Panics
    ///
    /// Panics if `index >= self.len()`.
    pub fn insert(&mut self, index: usize) -> bool {
        assert!(index < self.len, "index {index} out of bounds ({})", self.len);
        let word = &mut self.words[index / 64];
        let mask = 1u64 << (index % 64);
        let fresh = *word & mask == 0;
        *word |= mask;
        fresh
    }

    /// Clears the bit at `index`. Returns `true` if it was set before.
    ///
    /// # Panics
    ///
    /// Panics if `index >= self.len()`.
    pub fn remove(&mut self, index: usize) -> bool {
        assert!(index < self.len, "index {index} out of bounds ({})", self.len);
        let word = &mut self.words[index / 64];
        let mask = 1u64 << (index % 64);
        let present = *word & mask != 0;
        *word &= !mask;
        present
    }

    /// Returns `true` if the bit at `index` is set. Indices past the capacity are never
    /// members.
    #[must_use]
    pub fn contains(&self, index: usize) -> bool {
        index < self.len && (self.words[index / 64] & (1u64 << (index % 64))) != 0
    }

    /// Returns the number of bits set.
    #[must_use]
    pub fn count(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }

    /// Clears all bits.
    pub fn clear(&mut self) {
        self.words.fill(0);
    }

    /// Computes the union with another bit set (in place).
    ///
    /// Returns `true` if `self` changed.
    ///
    /// # Panics
    ///
    /// Panics if the capacities differ.
    pub fn union_with(&mut self, other: &Self) -> bool {
        assert_eq!(self.len, other.len, "bit sets must have same length");
        let mut changed = false;
        for (a, b) in self.words.iter_mut().zip(&other.words) {
            let old = *a;
            *a |= *b;
            changed |= old != *a;
        }
        changed
    }

    /// Removes every bit that is set in `other` (in place).
    ///
    /// Returns `true` if `self` changed.
    ///
    /// # Panics
    ///
    /// Panics if the capacities differ.
    pub fn difference_with(&mut self, other: &Self) -> bool {
        assert_eq!(self.len, other.len, "bit sets must have same length");
        let mut changed = false;
        for (a, b) in self.words.iter_mut().zip(&other.words) {
            let old = *a;
            *a &= !*b;
            changed |= old != *a;
        }
        changed
    }

    /// Returns `true` if every member of `self` is also a member of `other`.
    ///
    /// Sets of different capacity compare by membership.
    #[must_use]
    pub fn is_subset(&self, other: &Self) -> bool {
        self.words.iter().enumerate().all(|(i, &w)| {
            let o = other.words.get(i).copied().unwrap_or(0);
            w & !o == 0
        })
    }

    /// Returns an iterator over the indices of set bits, in ascending order.
    pub fn iter(&self) -> BitSetIter<'_> {
        BitSetIter {
            words: &self.words,
            word_idx: 0,
            current: self.words.first().copied().unwrap_or(0),
        }
    }
}

impl std::fmt::Debug for BitSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

/// Iterator over the set bits in a [`BitSet`].
pub struct BitSetIter<'a> {
    words: &'a [u64],
    word_idx: usize,
    current: u64,
}

impl Iterator for BitSetIter<'_> {
    type Item = usize;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.current != 0 {
                let bit = self.current.trailing_zeros() as usize;
                self.current &= self.current - 1;
                return Some(self.word_idx * 64 + bit);
            }
            self.word_idx += 1;
            self.current = *self.words.get(self.word_idx)?;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bitset_basic() {
        let mut bs = BitSet::new(100);
        assert!(bs.is_empty());
        assert_eq!(bs.count(), 0);

        assert!(bs.insert(0));
        assert!(bs.insert(63));
        assert!(bs.insert(64));
        assert!(bs.insert(99));
        assert!(!bs.insert(99));

        assert_eq!(bs.count(), 4);
        assert!(bs.contains(63));
        assert!(bs.contains(64));
        assert!(!bs.contains(1));
        assert!(!bs.contains(1000));
    }

    #[test]
    fn test_bitset_remove() {
        let mut bs = BitSet::from_indices(10, [3, 4]);
        assert!(bs.remove(3));
        assert!(!bs.remove(3));
        assert_eq!(bs.iter().collect::<Vec<_>>(), vec![4]);
    }

    #[test]
    fn test_bitset_union_reports_change() {
        let mut a = BitSet::from_indices(70, [0, 1]);
        let b = BitSet::from_indices(70, [1, 69]);

        assert!(a.union_with(&b));
        assert_eq!(a.iter().collect::<Vec<_>>(), vec![0, 1, 69]);
        assert!(!a.union_with(&b));
    }

    #[test]
    fn test_bitset_difference() {
        let mut a = BitSet::from_indices(10, [0, 1, 2]);
        let b = BitSet::from_indices(10, [1, 7]);

        assert!(a.difference_with(&b));
        assert_eq!(a.iter().collect::<Vec<_>>(), vec![0, 2]);
        assert!(!a.difference_with(&b));
    }

    #[test]
    fn test_bitset_subset() {
        let small = BitSet::from_indices(130, [5, 129]);
        let big = BitSet::from_indices(130, [5, 64, 129]);
        assert!(small.is_subset(&big));
        assert!(!big.is_subset(&small));
        assert!(BitSet::new(130).is_subset(&small));
    }

    #[test]
    fn test_bitset_iter_across_words() {
        let bs = BitSet::from_indices(200, [199, 5, 128, 64]);
        assert_eq!(bs.iter().collect::<Vec<_>>(), vec![5, 64, 128, 199]);
        assert_eq!(BitSet::new(0).iter().count(), 0);
    }

    #[test]
    fn test_bitset_clear() {
        let mut bs = BitSet::from_indices(10, [1, 2]);
        bs.clear();
        assert!(bs.is_empty());
        assert_eq!(bs.len(), 10);
    }
}
