/// Combinatorial indexing - bidirectional mapping between integers and
/// k-element combinations of a pool, without materializing the space
///
/// Combinations are enumerated in lexicographic order over the sorted pool,
/// so for pool [A, B, C, D] and size 2: AB=0, AC=1, AD=2, BC=3, BD=4, CD=5.
/// Both directions walk the pool once and compute one binomial coefficient
/// per position.

/// Error types for combination indexing
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CombinationsError {
    /// The pool contains two equal items at adjacent sorted positions
    DuplicateItem { position: usize },
    /// The combination has the wrong number of elements
    WrongLength { expected: usize, actual: usize },
    /// The combination is not a multiset subset of the pool
    NotInPool,
    /// Combination elements were left unmatched after walking the pool
    LeftoverItems,
    /// `as_canonical_index` only applies to duplicates-allowed pools
    CanonicalRequiresDuplicates,
}

impl std::fmt::Display for CombinationsError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CombinationsError::DuplicateItem { position } => {
                write!(f, "Duplicate pool item at sorted position {}", position)
            }
            CombinationsError::WrongLength { expected, actual } => {
                write!(
                    f,
                    "Combination has {} elements, expected {}",
                    actual, expected
                )
            }
            CombinationsError::NotInPool => {
                write!(f, "Combination is not drawn from the pool")
            }
            CombinationsError::LeftoverItems => {
                write!(f, "Combination elements left unmatched against the pool")
            }
            CombinationsError::CanonicalRequiresDuplicates => {
                write!(
                    f,
                    "Canonical index lookup only applies to duplicates-allowed pools"
                )
            }
        }
    }
}

impl std::error::Error for CombinationsError {}

/// Exact binomial coefficient C(n, k)
///
/// Computed by the stepwise multiplicative formula; every intermediate
/// division is exact.
pub fn binomial(n: usize, k: usize) -> u128 {
    if k > n {
        return 0;
    }
    let k = k.min(n - k);
    let mut result: u128 = 1;
    for i in 1..=k {
        result = result * (n - k + i) as u128 / i as u128;
    }
    result
}

/// Indexer over all size-k combinations of a pool
///
/// The pool is canonicalized (sorted) on construction. `new` rejects
/// duplicate items; `with_duplicates` keeps them, in which case several
/// indices may map to equal-looking combinations (see
/// [`Combinations::as_canonical_index`]).
#[derive(Debug, Clone)]
pub struct Combinations<T> {
    pool: Vec<T>,
    size: usize,
    duplicates: bool,
}

impl<T: Ord + Clone> Combinations<T> {
    /// Create an indexer over a pool of distinct items
    pub fn new(mut pool: Vec<T>, size: usize) -> Result<Self, CombinationsError> {
        pool.sort();
        for position in 1..pool.len() {
            if pool[position - 1] == pool[position] {
                return Err(CombinationsError::DuplicateItem { position });
            }
        }
        Ok(Combinations {
            pool,
            size,
            duplicates: false,
        })
    }

    /// Create an indexer over a pool that may repeat items
    pub fn with_duplicates(mut pool: Vec<T>, size: usize) -> Self {
        pool.sort();
        Combinations {
            pool,
            size,
            duplicates: true,
        }
    }

    /// The pool in canonical (sorted) order
    pub fn pool(&self) -> &[T] {
        &self.pool
    }

    /// The combination size k
    pub fn size(&self) -> usize {
        self.size
    }

    /// Whether the pool was constructed in duplicates-allowed mode
    pub fn allows_duplicates(&self) -> bool {
        self.duplicates
    }

    /// Number of combinations: C(|pool|, k)
    ///
    /// Size 0 yields 1 (the empty combination); size > |pool| yields 0.
    pub fn len(&self) -> u128 {
        binomial(self.pool.len(), self.size)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The combination at `index`, in pool order
    ///
    /// Negative indices count from the end. Out-of-range indices yield
    /// `None`.
    pub fn at(&self, index: i128) -> Option<Vec<T>> {
        let len = self.len();
        let index = if index < 0 {
            let back = index.unsigned_abs();
            if back > len {
                return None;
            }
            len - back
        } else {
            let forward = index as u128;
            if forward >= len {
                return None;
            }
            forward
        };

        // Mixed-radix walk: at each pool position the radix is the number of
        // combinations that would include the current element.
        let mut remaining = index;
        let mut need = self.size;
        let mut chosen = Vec::with_capacity(self.size);
        for (position, item) in self.pool.iter().enumerate() {
            if need == 0 {
                break;
            }
            let radix = binomial(self.pool.len() - position - 1, need - 1);
            if remaining >= radix {
                remaining -= radix;
            } else {
                chosen.push(item.clone());
                need -= 1;
            }
        }
        debug_assert_eq!(remaining, 0, "index walk must land on a zero remainder");
        debug_assert_eq!(need, 0, "index walk must choose exactly k elements");
        Some(chosen)
    }

    /// The index of `combination` under lexicographic enumeration
    ///
    /// The combination may be given in any order; membership is validated
    /// against the pool before the index is computed.
    pub fn index_of(&self, combination: &[T]) -> Result<u128, CombinationsError> {
        if combination.len() != self.size {
            return Err(CombinationsError::WrongLength {
                expected: self.size,
                actual: combination.len(),
            });
        }
        if !self.includes(combination) {
            return Err(CombinationsError::NotInPool);
        }

        let mut sorted: Vec<&T> = combination.iter().collect();
        sorted.sort();

        // For every pool element not in the combination, skip past the count
        // of combinations that would have included it.
        let mut index: u128 = 0;
        let mut matched = 0;
        for (position, item) in self.pool.iter().enumerate() {
            if matched == sorted.len() {
                break;
            }
            if *item == *sorted[matched] {
                matched += 1;
            } else {
                index += binomial(
                    self.pool.len() - position - 1,
                    sorted.len() - matched - 1,
                );
            }
        }
        if matched != sorted.len() {
            return Err(CombinationsError::LeftoverItems);
        }
        Ok(index)
    }

    /// Multiset containment check, independent of index computation
    pub fn includes(&self, combination: &[T]) -> bool {
        let mut sorted: Vec<&T> = combination.iter().collect();
        sorted.sort();
        let mut matched = 0;
        for item in &self.pool {
            if matched < sorted.len() && *item == *sorted[matched] {
                matched += 1;
            }
        }
        matched == sorted.len()
    }

    /// Normalize an index in a duplicates-allowed pool
    ///
    /// Several indices can address equal-looking combinations when the pool
    /// repeats items; this maps any of them to the smallest such index by
    /// round-tripping through `at` and `index_of`. Out-of-range indices
    /// yield `Ok(None)`.
    pub fn as_canonical_index(&self, index: i128) -> Result<Option<u128>, CombinationsError> {
        if !self.duplicates {
            return Err(CombinationsError::CanonicalRequiresDuplicates);
        }
        match self.at(index) {
            None => Ok(None),
            Some(combination) => self.index_of(&combination).map(Some),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pool() -> Vec<&'static str> {
        vec!["A", "B", "C", "D"]
    }

    #[test]
    fn test_binomial() {
        assert_eq!(binomial(4, 2), 6);
        assert_eq!(binomial(10, 0), 1);
        assert_eq!(binomial(10, 10), 1);
        assert_eq!(binomial(3, 5), 0);
        assert_eq!(binomial(52, 5), 2_598_960);
    }

    #[test]
    fn test_lexicographic_order() {
        let combos = Combinations::new(pool(), 2).unwrap();
        assert_eq!(combos.len(), 6);
        assert_eq!(combos.at(0), Some(vec!["A", "B"]));
        assert_eq!(combos.at(1), Some(vec!["A", "C"]));
        assert_eq!(combos.at(5), Some(vec!["C", "D"]));
        assert_eq!(combos.index_of(&["B", "D"]).unwrap(), 4);
    }

    #[test]
    fn test_negative_index() {
        let combos = Combinations::new(pool(), 2).unwrap();
        assert_eq!(combos.at(-1), Some(vec!["C", "D"]));
        assert_eq!(combos.at(-6), Some(vec!["A", "B"]));
        assert_eq!(combos.at(-7), None);
    }

    #[test]
    fn test_out_of_range() {
        let combos = Combinations::new(pool(), 2).unwrap();
        assert_eq!(combos.at(6), None);
    }

    #[test]
    fn test_empty_combination() {
        let combos = Combinations::new(pool(), 0).unwrap();
        assert_eq!(combos.len(), 1);
        assert_eq!(combos.at(0), Some(vec![]));
        assert_eq!(combos.index_of(&[]).unwrap(), 0);
    }

    #[test]
    fn test_oversized_combination() {
        let combos = Combinations::new(pool(), 5).unwrap();
        assert_eq!(combos.len(), 0);
        assert_eq!(combos.at(0), None);
    }

    #[test]
    fn test_duplicate_pool_rejected() {
        let result = Combinations::new(vec!["A", "B", "B"], 2);
        assert_eq!(
            result.unwrap_err(),
            CombinationsError::DuplicateItem { position: 2 }
        );
    }

    #[test]
    fn test_includes() {
        let combos = Combinations::new(pool(), 2).unwrap();
        assert!(combos.includes(&["B", "D"]));
        assert!(combos.includes(&["D", "B"]));
        assert!(!combos.includes(&["B", "E"]));
        assert!(!combos.includes(&["B", "B"]));
    }

    #[test]
    fn test_index_of_wrong_length() {
        let combos = Combinations::new(pool(), 2).unwrap();
        assert_eq!(
            combos.index_of(&["A"]).unwrap_err(),
            CombinationsError::WrongLength {
                expected: 2,
                actual: 1
            }
        );
    }

    #[test]
    fn test_canonical_requires_duplicates() {
        let combos = Combinations::new(pool(), 2).unwrap();
        assert_eq!(
            combos.as_canonical_index(0).unwrap_err(),
            CombinationsError::CanonicalRequiresDuplicates
        );
    }

    #[test]
    fn test_canonical_index() {
        let combos = Combinations::with_duplicates(vec!["X", "X", "Y"], 1);
        // Positions 0 and 1 both show [X]; the canonical index is the first.
        assert_eq!(combos.as_canonical_index(1).unwrap(), Some(0));
        assert_eq!(combos.as_canonical_index(2).unwrap(), Some(2));
        assert_eq!(combos.as_canonical_index(3).unwrap(), None);
    }
}
