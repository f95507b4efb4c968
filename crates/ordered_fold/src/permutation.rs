//! Learn permutation construction
//!
//! The permutation fixes the processing order of ordered boosting. Large
//! datasets can shuffle whole blocks instead of single documents so that
//! downstream passes keep contiguous memory access within a block.

use rand::seq::SliceRandom;

use crate::deterministic::RestorableRng;
use crate::errors::{FoldError, Result};

/// Identity permutation of `[0, n)`
pub fn identity_permutation(n: usize) -> Vec<usize> {
    (0..n).collect()
}

/// Build the learn permutation for `n` samples.
///
/// With `shuffle` unset the identity is returned. A `block_size` of 1
/// shuffles single documents; larger values shuffle the order of
/// `ceil(n / block_size)` contiguous blocks and keep each block intact.
pub fn build_permutation(
    n: usize,
    shuffle: bool,
    block_size: usize,
    rng: &mut RestorableRng,
) -> Result<Vec<usize>> {
    if block_size == 0 {
        return Err(FoldError::InvalidConfiguration(
            "permutation block size must be at least 1".to_string(),
        ));
    }

    let mut permutation = identity_permutation(n);
    if !shuffle {
        return Ok(permutation);
    }

    if block_size == 1 {
        permutation.shuffle(rng);
        return Ok(permutation);
    }

    let block_count = n.div_ceil(block_size);
    let mut block_order = identity_permutation(block_count);
    block_order.shuffle(rng);

    let mut current = 0;
    for block in block_order {
        let start = block * block_size;
        let end = (start + block_size).min(n);
        for (offset, idx) in (start..end).enumerate() {
            permutation[current + offset] = idx;
        }
        current += end - start;
    }

    tracing::debug!(
        samples = n,
        block_size,
        blocks = block_count,
        "built block-shuffled permutation"
    );
    Ok(permutation)
}

/// True if `permutation` is a bijection onto `[0, permutation.len())`
pub fn is_bijection(permutation: &[usize]) -> bool {
    let mut seen = vec![false; permutation.len()];
    for &idx in permutation {
        match seen.get_mut(idx) {
            Some(slot) if !*slot => *slot = true,
            _ => return false,
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_identity_without_shuffle() {
        let mut rng = RestorableRng::new(42);
        let perm = build_permutation(10, false, 3, &mut rng).unwrap();
        assert_eq!(perm, (0..10).collect::<Vec<_>>());
        assert_eq!(rng.calls(), 0);
    }

    #[test]
    fn test_zero_block_size_rejected() {
        let mut rng = RestorableRng::new(42);
        let err = build_permutation(10, true, 0, &mut rng).unwrap_err();
        assert!(matches!(err, FoldError::InvalidConfiguration(_)));
    }

    #[test]
    fn test_empty_permutation() {
        let mut rng = RestorableRng::new(1);
        assert!(build_permutation(0, true, 1, &mut rng).unwrap().is_empty());
        assert!(build_permutation(0, true, 4, &mut rng).unwrap().is_empty());
    }

    #[test]
    fn test_shuffle_is_seed_deterministic() {
        let a = build_permutation(200, true, 1, &mut RestorableRng::new(9)).unwrap();
        let b = build_permutation(200, true, 1, &mut RestorableRng::new(9)).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, identity_permutation(200));
    }

    #[test]
    fn test_block_shuffle_keeps_blocks_contiguous() {
        let mut rng = RestorableRng::new(3);
        let perm = build_permutation(10, true, 4, &mut rng).unwrap();
        assert!(is_bijection(&perm));

        // blocks are [0..4), [4..8), [8..10)
        let mut pos = 0;
        while pos < perm.len() {
            let start = perm[pos];
            assert_eq!(start % 4, 0, "block must start on a boundary");
            let len = (start + 4).min(10) - start;
            for k in 0..len {
                assert_eq!(perm[pos + k], start + k);
            }
            pos += len;
        }
    }

    #[test]
    fn test_is_bijection() {
        assert!(is_bijection(&[2, 0, 1]));
        assert!(!is_bijection(&[0, 0, 1]));
        assert!(!is_bijection(&[0, 3, 1]));
        assert!(is_bijection(&[]));
    }

    proptest! {
        #[test]
        fn prop_permutation_is_bijection(
            n in 0usize..2000,
            shuffle in any::<bool>(),
            block_size in 1usize..64,
            seed in any::<u64>(),
        ) {
            let mut rng = RestorableRng::new(seed);
            let perm = build_permutation(n, shuffle, block_size, &mut rng).unwrap();
            prop_assert_eq!(perm.len(), n);
            prop_assert!(is_bijection(&perm));
        }

        #[test]
        fn prop_block_shuffle_preserves_intra_block_order(
            n in 1usize..1000,
            block_size in 2usize..50,
            seed in any::<u64>(),
        ) {
            let mut rng = RestorableRng::new(seed);
            let perm = build_permutation(n, true, block_size, &mut rng).unwrap();
            let mut position = vec![0usize; n];
            for (z, &idx) in perm.iter().enumerate() {
                position[idx] = z;
            }
            for idx in 1..n {
                if idx / block_size == (idx - 1) / block_size {
                    prop_assert_eq!(position[idx], position[idx - 1] + 1);
                }
            }
        }
    }
}
