//! Conditional edge removal

use super::CooData;
use super::coo::CooParts;
use crate::dtype::{Element, IdElement};
use crate::error::{Error, Result};
use crate::tensor::Tensor;

impl CooData {
    /// Drop every edge `e` whose `values[e] == criteria`
    ///
    /// `values` is indexed by edge id. The surviving edges keep their order,
    /// and the result stores their original ids explicitly.
    pub fn remove_if<T: Element>(&self, values: &Tensor, criteria: T) -> Result<CooData> {
        let values = values.as_slice::<T>()?;
        crate::dispatch_id_dtype!(self.id_dtype(), I => {
            Ok(remove_if_typed::<I, T>(self, values, criteria)?.into_coo(self.shape))
        }, "coo_remove_if")
    }
}

fn remove_if_typed<I: IdElement, T: Element>(
    coo: &CooData,
    values: &[T],
    criteria: T,
) -> Result<CooParts<I>> {
    let view = coo.view::<I>()?;
    let mut out = CooParts::with_capacity(view.nnz());
    for pos in 0..view.nnz() {
        let eid = view.eid(pos);
        let v = *values.get(eid).ok_or(Error::IndexOutOfBounds {
            index: eid,
            size: values.len(),
        })?;
        if v != criteria {
            out.push(view.row[pos], view.col[pos], I::from_usize(eid));
        }
    }
    tracing::trace!(
        kept = out.row.len(),
        removed = view.nnz() - out.row.len(),
        "coo remove_if"
    );
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::Device;

    #[test]
    fn test_remove_if_uses_edge_ids() {
        let coo = CooData::from_slices(&[0i64, 1, 1], &[1, 0, 1], Some(&[2, 0, 1]), [2, 2]).unwrap();
        let mask = Tensor::from_slice(&[0u8, 1, 0], &[3], Device::Cpu);
        let kept = coo.remove_if(&mask, 1u8).unwrap();
        assert_eq!(kept.row().to_vec::<i64>(), vec![0, 1]);
        assert_eq!(kept.col().to_vec::<i64>(), vec![1, 0]);
        assert_eq!(kept.data().unwrap().to_vec::<i64>(), vec![2, 0]);
    }

    #[test]
    fn test_remove_if_checks_value_length() {
        let coo = CooData::from_slices(&[0i32], &[0], Some(&[4]), [1, 1]).unwrap();
        let values = Tensor::from_slice(&[1.0f32, 2.0], &[2], Device::Cpu);
        assert!(matches!(
            coo.remove_if(&values, 1.0f32),
            Err(Error::IndexOutOfBounds { index: 4, size: 2 })
        ));
    }
}
