//! Exact top-k edge selection

use super::{PickPolicy, RowContext};
use crate::dtype::{FloatElement, IdElement};
use crate::error::{Error, Result};
use rand::rngs::StdRng;
use std::cmp::Ordering;

/// Keep the `k` edges of largest (or smallest) `weight[edge id]` per row
///
/// Ties keep their order of position within the row. Weights compare by
/// value, so `-0.0` ties with `0.0`; NaN ranks above infinity and ties with
/// any other NaN.
#[derive(Clone, Copy, Debug)]
pub struct TopkPick<'a, T> {
    k: usize,
    ascending: bool,
    weight: &'a [T],
}

impl<'a, T: FloatElement> TopkPick<'a, T> {
    /// Create the policy over per-edge weights
    pub fn new(k: usize, ascending: bool, weight: &'a [T]) -> Self {
        Self {
            k,
            ascending,
            weight,
        }
    }
}

impl<I: IdElement, T: FloatElement> PickPolicy<I> for TopkPick<'_, T> {
    fn num_picks(&self, ctx: &RowContext<'_, I>) -> Result<usize> {
        if self.k > ctx.len() {
            return Err(Error::invalid_argument(
                "k",
                format!("k = {} exceeds the {} edges of row {}", self.k, ctx.len(), ctx.row),
            ));
        }
        Ok(self.k)
    }

    fn pick(
        &self,
        ctx: &RowContext<'_, I>,
        num_picks: usize,
        _rng: &mut StdRng,
        out: &mut [usize],
    ) -> Result<()> {
        let keys = (0..ctx.len())
            .map(|j| {
                let eid = ctx.eid(j);
                self.weight
                    .get(eid)
                    .map(|w| w.to_f64())
                    .ok_or(Error::IndexOutOfBounds {
                        index: eid,
                        size: self.weight.len(),
                    })
            })
            .collect::<Result<Vec<f64>>>()?;

        let mut order: Vec<usize> = (0..ctx.len()).collect();
        let cmp = |a: &usize, b: &usize| weight_order(keys[*a], keys[*b]);
        if self.ascending {
            order.sort_by(cmp);
        } else {
            order.sort_by(|a, b| cmp(b, a));
        }
        ctx.write_positions(order.into_iter().take(num_picks), out);
        Ok(())
    }
}

fn weight_order(a: f64, b: f64) -> Ordering {
    a.partial_cmp(&b)
        .unwrap_or_else(|| a.is_nan().cmp(&b.is_nan()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::cpu::random::row_rng;

    fn pick_k(weights: &[f64], k: usize, ascending: bool) -> Vec<usize> {
        let cols: Vec<i64> = (0..weights.len() as i64).collect();
        let ctx = RowContext {
            row: 0,
            offset: 0,
            cols: &cols,
            data: None,
        };
        let policy = TopkPick::new(k, ascending, weights);
        let mut out = vec![0usize; k];
        policy.pick(&ctx, k, &mut row_rng(0, 0), &mut out).unwrap();
        out
    }

    #[test]
    fn test_signed_zeros_tie_in_position_order() {
        assert_eq!(pick_k(&[0.0, -0.0, 1.0], 2, true), vec![0, 1]);
        assert_eq!(pick_k(&[-0.0, 0.0, -1.0], 2, false), vec![0, 1]);
    }

    #[test]
    fn test_nan_ranks_above_infinity() {
        let nan = f64::NAN;
        assert_eq!(pick_k(&[f64::INFINITY, nan, 2.0, -nan], 3, false), vec![1, 3, 0]);
        assert_eq!(pick_k(&[nan, 1.0, f64::NEG_INFINITY], 2, true), vec![2, 1]);
    }

    #[test]
    fn test_weight_order() {
        assert_eq!(weight_order(-0.0, 0.0), Ordering::Equal);
        assert_eq!(weight_order(f64::NAN, f64::INFINITY), Ordering::Greater);
        assert_eq!(weight_order(1.0, f64::NAN), Ordering::Less);
        assert_eq!(weight_order(f64::NAN, -f64::NAN), Ordering::Equal);
    }
}
