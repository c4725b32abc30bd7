//! Uniform neighbor sampling

use super::{PickPolicy, RowContext, check_num_samples, count_picks};
use crate::dtype::IdElement;
use crate::error::Result;
use crate::runtime::cpu::random::{choice_with_replacement, choice_without_replacement};
use rand::rngs::StdRng;

/// Pick `num_samples` edges per row uniformly at random
///
/// `num_samples == -1` keeps the whole neighborhood. Without replacement a
/// row keeps `min(len, num_samples)` edges; with replacement it keeps
/// exactly `num_samples` (zero for an empty row).
#[derive(Clone, Copy, Debug)]
pub struct UniformPick {
    num_samples: i64,
    replace: bool,
}

impl UniformPick {
    /// Create the policy; `num_samples` must be `-1` or non-negative
    pub fn new(num_samples: i64, replace: bool) -> Result<Self> {
        check_num_samples(num_samples)?;
        Ok(Self {
            num_samples,
            replace,
        })
    }
}

impl<I: IdElement> PickPolicy<I> for UniformPick {
    fn num_picks(&self, ctx: &RowContext<'_, I>) -> Result<usize> {
        Ok(count_picks(self.num_samples, self.replace, ctx.len()))
    }

    fn pick(
        &self,
        ctx: &RowContext<'_, I>,
        num_picks: usize,
        rng: &mut StdRng,
        out: &mut [usize],
    ) -> Result<()> {
        let len = ctx.len();
        if self.num_samples == -1 || (!self.replace && num_picks == len) {
            ctx.write_positions(0..len, out);
            return Ok(());
        }
        if self.replace {
            choice_with_replacement(rng, len, out)?;
        } else {
            choice_without_replacement(rng, len, out)?;
        }
        out.iter_mut().for_each(|p| *p += ctx.offset);
        Ok(())
    }
}
