//! Random choice primitives used by the row-wise samplers
//!
//! Every primitive writes positions in `[0, len)` into `out`; the number of
//! draws is `out.len()`.

use crate::error::{Error, Result};
use rand::distr::Distribution;
use rand::distr::weighted::WeightedIndex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Mixing constant spreading row positions over the seed space
const SEED_STRIDE: u64 = 0x9E37_79B9_7F4A_7C15;

/// Independent generator of the row at `position` of a sampling call
pub(crate) fn row_rng(base_seed: u64, position: usize) -> StdRng {
    StdRng::seed_from_u64(base_seed ^ (position as u64).wrapping_add(1).wrapping_mul(SEED_STRIDE))
}

/// Seed shared by all rows of one call: the configured seed, else a fresh draw
pub(crate) fn call_seed(configured: Option<u64>) -> u64 {
    configured.unwrap_or_else(|| rand::rng().random())
}

/// Uniform draws with replacement
pub(crate) fn choice_with_replacement<R: Rng + ?Sized>(
    rng: &mut R,
    len: usize,
    out: &mut [usize],
) -> Result<()> {
    if len == 0 && !out.is_empty() {
        return Err(Error::invalid_argument(
            "num_samples",
            "cannot draw from an empty population",
        ));
    }
    for slot in out.iter_mut() {
        *slot = rng.random_range(0..len);
    }
    Ok(())
}

/// Uniform draws of distinct positions
pub(crate) fn choice_without_replacement<R: Rng + ?Sized>(
    rng: &mut R,
    len: usize,
    out: &mut [usize],
) -> Result<()> {
    if out.len() > len {
        return Err(Error::invalid_argument(
            "num_samples",
            format!(
                "cannot draw {} distinct items from a population of {}",
                out.len(),
                len
            ),
        ));
    }
    let picked = rand::seq::index::sample(rng, len, out.len());
    for (slot, idx) in out.iter_mut().zip(picked.iter()) {
        *slot = idx;
    }
    Ok(())
}

/// Draws with replacement, position `i` chosen with probability ∝ `weights[i]`
pub(crate) fn weighted_choice_with_replacement<R: Rng + ?Sized>(
    rng: &mut R,
    weights: &[f64],
    out: &mut [usize],
) -> Result<()> {
    if out.is_empty() {
        return Ok(());
    }
    let dist = WeightedIndex::<f64>::new(weights)
        .map_err(|e| Error::invalid_argument("prob", e.to_string()))?;
    for slot in out.iter_mut() {
        *slot = dist.sample(rng);
    }
    Ok(())
}

/// Draws of distinct positions, successively weighted by `weights`
///
/// Zero-weight positions are never chosen.
pub(crate) fn weighted_choice_without_replacement<R: Rng + ?Sized>(
    rng: &mut R,
    weights: &[f64],
    out: &mut [usize],
) -> Result<()> {
    let positive: Vec<usize> = (0..weights.len()).filter(|&i| weights[i] > 0.0).collect();
    if out.len() > positive.len() {
        return Err(Error::invalid_argument(
            "num_samples",
            format!(
                "cannot draw {} distinct items when only {} have positive weight",
                out.len(),
                positive.len()
            ),
        ));
    }
    if out.is_empty() {
        return Ok(());
    }
    let picked =
        rand::seq::index::sample_weighted(rng, positive.len(), |i| weights[positive[i]], out.len())
            .map_err(|e| Error::invalid_argument("prob", e.to_string()))?;
    for (slot, idx) in out.iter_mut().zip(picked.iter()) {
        *slot = positive[idx];
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_row_rng_is_reproducible() {
        let a: u64 = row_rng(7, 3).random();
        let b: u64 = row_rng(7, 3).random();
        let c: u64 = row_rng(7, 4).random();
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(call_seed(Some(11)), 11);
    }

    #[test]
    fn test_without_replacement_is_distinct() {
        let mut rng = row_rng(1, 0);
        let mut out = [0usize; 6];
        choice_without_replacement(&mut rng, 10, &mut out).unwrap();
        let set: HashSet<usize> = out.iter().copied().collect();
        assert_eq!(set.len(), 6);
        assert!(out.iter().all(|&i| i < 10));
    }

    #[test]
    fn test_oversubscription_is_an_error() {
        let mut rng = row_rng(1, 0);
        let mut out = [0usize; 4];
        assert!(choice_without_replacement(&mut rng, 3, &mut out).is_err());
        assert!(weighted_choice_without_replacement(&mut rng, &[1.0, 0.0, 2.0, 0.0], &mut out).is_err());
        assert!(choice_with_replacement(&mut rng, 0, &mut out).is_err());
    }

    #[test]
    fn test_weighted_skips_zero_weights() {
        let mut rng = row_rng(5, 0);
        let weights = [0.0, 3.0, 0.0, 1.0];
        for _ in 0..50 {
            let mut out = [0usize; 2];
            weighted_choice_without_replacement(&mut rng, &weights, &mut out).unwrap();
            let mut sorted = out;
            sorted.sort();
            assert_eq!(sorted, [1, 3]);

            let mut out = [0usize; 8];
            weighted_choice_with_replacement(&mut rng, &weights, &mut out).unwrap();
            assert!(out.iter().all(|&i| i == 1 || i == 3));
        }
    }
}
