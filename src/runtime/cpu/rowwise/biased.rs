//! Tag-biased neighbor sampling
//!
//! The entries of every row are partitioned into consecutive tag segments.
//! `tag_offset[row]` holds `num_tags + 1` offsets relative to the row start;
//! segment `t` is `[tag_offset[row][t], tag_offset[row][t + 1])`. A draw
//! first picks a tag with probability proportional to its bias times the
//! number of its edges still available, then an edge of that tag uniformly.

use super::{PickPolicy, RowContext, check_num_samples, count_picks};
use crate::dtype::{FloatElement, IdElement};
use crate::error::{Error, Result};
use rand::Rng;
use rand::rngs::StdRng;

/// Pick edges with per-tag bias
#[derive(Clone, Copy, Debug)]
pub struct BiasedPick<'a, I, T> {
    num_samples: i64,
    replace: bool,
    tag_offset: &'a [I],
    num_tags: usize,
    bias: &'a [T],
}

impl<'a, I: IdElement, T: FloatElement> BiasedPick<'a, I, T> {
    /// Create the policy
    ///
    /// `tag_offset` is the row-major `[num_rows, num_tags + 1]` offset table
    /// and `bias` holds one finite non-negative weight per tag.
    pub fn new(num_samples: i64, replace: bool, tag_offset: &'a [I], bias: &'a [T]) -> Result<Self> {
        check_num_samples(num_samples)?;
        if let Some(b) = bias.iter().find(|b| !b.is_finite() || **b < T::zero()) {
            return Err(Error::invalid_argument(
                "bias",
                format!("tag bias must be finite and non-negative, got {}", b.to_f64()),
            ));
        }
        Ok(Self {
            num_samples,
            replace,
            tag_offset,
            num_tags: bias.len(),
            bias,
        })
    }

    /// Row-relative tag boundaries of `ctx`'s row
    fn segments(&self, ctx: &RowContext<'_, I>) -> Result<Vec<usize>> {
        let width = self.num_tags + 1;
        let start = ctx.row * width;
        let Some(raw) = self.tag_offset.get(start..start + width) else {
            return Err(Error::IndexOutOfBounds {
                index: ctx.row,
                size: self.tag_offset.len() / width,
            });
        };
        let bounds: Vec<usize> = raw
            .iter()
            .map(|o| if o.is_valid_index() { o.to_usize() } else { usize::MAX })
            .collect();
        let ordered = bounds.windows(2).all(|w| w[0] <= w[1]);
        if bounds[0] != 0 || !ordered || bounds[self.num_tags] != ctx.len() {
            return Err(Error::invalid_argument(
                "tag_offset",
                format!(
                    "row {} offsets {:?} do not partition its {} edges",
                    ctx.row,
                    raw.iter().map(|o| o.to_i64()).collect::<Vec<_>>(),
                    ctx.len()
                ),
            ));
        }
        Ok(bounds)
    }

    /// Edges per tag, zero for tags without bias
    fn tag_counts(&self, bounds: &[usize]) -> Vec<usize> {
        (0..self.num_tags)
            .map(|t| {
                if self.bias[t].to_f64() > 0.0 {
                    bounds[t + 1] - bounds[t]
                } else {
                    0
                }
            })
            .collect()
    }
}

/// Index drawn with probability proportional to `weights`
fn draw_index<R: Rng + ?Sized>(rng: &mut R, weights: &[f64]) -> usize {
    let total: f64 = weights.iter().sum();
    let u = rng.random::<f64>() * total;
    let mut acc = 0.0;
    let mut last_positive = 0;
    for (t, &w) in weights.iter().enumerate() {
        if w > 0.0 {
            acc += w;
            last_positive = t;
            if u < acc {
                return t;
            }
        }
    }
    last_positive
}

impl<I: IdElement, T: FloatElement> PickPolicy<I> for BiasedPick<'_, I, T> {
    fn num_picks(&self, ctx: &RowContext<'_, I>) -> Result<usize> {
        let bounds = self.segments(ctx)?;
        let available = self.tag_counts(&bounds).iter().sum();
        Ok(count_picks(self.num_samples, self.replace, available))
    }

    fn pick(
        &self,
        ctx: &RowContext<'_, I>,
        num_picks: usize,
        rng: &mut StdRng,
        out: &mut [usize],
    ) -> Result<()> {
        let bounds = self.segments(ctx)?;
        let counts = self.tag_counts(&bounds);
        let available: usize = counts.iter().sum();

        if self.num_samples == -1 || (!self.replace && num_picks == available) {
            let positions = (0..self.num_tags)
                .filter(|&t| counts[t] > 0)
                .flat_map(|t| bounds[t]..bounds[t + 1]);
            ctx.write_positions(positions, out);
            return Ok(());
        }

        let bias: Vec<f64> = self.bias.iter().map(|b| b.to_f64()).collect();
        if self.replace {
            let weights: Vec<f64> = (0..self.num_tags).map(|t| bias[t] * counts[t] as f64).collect();
            for slot in out.iter_mut() {
                let t = draw_index(rng, &weights);
                *slot = ctx.offset + bounds[t] + rng.random_range(0..counts[t]);
            }
            return Ok(());
        }

        if num_picks > available {
            return Err(Error::invalid_argument(
                "num_samples",
                format!(
                    "cannot draw {} distinct edges from {} biased candidates",
                    num_picks, available
                ),
            ));
        }
        // Per-tag pools; the first `remaining[t]` entries of a tag are unpicked
        let mut pool: Vec<usize> = (0..ctx.len()).collect();
        let mut remaining = counts;
        let mut weights = vec![0.0; self.num_tags];
        for slot in out.iter_mut() {
            for t in 0..self.num_tags {
                weights[t] = bias[t] * remaining[t] as f64;
            }
            let t = draw_index(rng, &weights);
            let j = bounds[t] + rng.random_range(0..remaining[t]);
            let last = bounds[t] + remaining[t] - 1;
            *slot = ctx.offset + pool[j];
            pool.swap(j, last);
            remaining[t] -= 1;
        }
        Ok(())
    }
}
