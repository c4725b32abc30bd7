//! Probability-weighted neighbor sampling

use super::{PickPolicy, RowContext, check_num_samples, count_picks};
use crate::dtype::{FloatElement, IdElement};
use crate::error::{Error, Result};
use crate::runtime::cpu::random::{
    weighted_choice_with_replacement, weighted_choice_without_replacement,
};
use rand::rngs::StdRng;

/// Pick edges with probability proportional to `prob[edge id]`
///
/// Only edges of positive probability are candidates: the uniform
/// arithmetic of [`UniformPick`](super::UniformPick) applies to their count,
/// and a zero-probability edge is never picked.
#[derive(Clone, Copy, Debug)]
pub struct WeightedPick<'a, T> {
    num_samples: i64,
    replace: bool,
    prob: &'a [T],
}

impl<'a, T: FloatElement> WeightedPick<'a, T> {
    /// Create the policy over per-edge probabilities
    pub fn new(num_samples: i64, replace: bool, prob: &'a [T]) -> Result<Self> {
        check_num_samples(num_samples)?;
        Ok(Self {
            num_samples,
            replace,
            prob,
        })
    }

    fn weight(&self, eid: usize) -> Result<f64> {
        let p = *self.prob.get(eid).ok_or(Error::IndexOutOfBounds {
            index: eid,
            size: self.prob.len(),
        })?;
        if !p.is_finite() || p < T::zero() {
            return Err(Error::invalid_argument(
                "prob",
                format!(
                    "probability of edge {} must be finite and non-negative, got {}",
                    eid,
                    p.to_f64()
                ),
            ));
        }
        Ok(p.to_f64())
    }

    /// Row-relative positions and weights of the positive-probability edges
    fn candidates<I: IdElement>(&self, ctx: &RowContext<'_, I>) -> Result<(Vec<usize>, Vec<f64>)> {
        let mut positions = Vec::with_capacity(ctx.len());
        let mut weights = Vec::with_capacity(ctx.len());
        for j in 0..ctx.len() {
            let w = self.weight(ctx.eid(j))?;
            if w > 0.0 {
                positions.push(j);
                weights.push(w);
            }
        }
        Ok((positions, weights))
    }
}

impl<I: IdElement, T: FloatElement> PickPolicy<I> for WeightedPick<'_, T> {
    fn num_picks(&self, ctx: &RowContext<'_, I>) -> Result<usize> {
        let mut positive = 0;
        for j in 0..ctx.len() {
            if self.weight(ctx.eid(j))? > 0.0 {
                positive += 1;
            }
        }
        Ok(count_picks(self.num_samples, self.replace, positive))
    }

    fn pick(
        &self,
        ctx: &RowContext<'_, I>,
        num_picks: usize,
        rng: &mut StdRng,
        out: &mut [usize],
    ) -> Result<()> {
        let (positions, weights) = self.candidates(ctx)?;
        if self.num_samples == -1 || (!self.replace && num_picks == positions.len()) {
            ctx.write_positions(positions.iter().copied(), out);
            return Ok(());
        }
        if self.replace {
            weighted_choice_with_replacement(rng, &weights, out)?;
        } else {
            weighted_choice_without_replacement(rng, &weights, out)?;
        }
        for p in out.iter_mut() {
            *p = ctx.offset + positions[*p];
        }
        Ok(())
    }
}
