//! CPU implementation of row-wise sampling

use super::CpuClient;
use super::rowwise::{
    BiasedPick, TopkPick, UniformPick, WeightedPick, coo_rowwise_pick, csr_rowwise_pick,
};
use crate::dtype::DType;
use crate::error::{Error, Result};
use crate::ops::SamplingOps;
use crate::runtime::Device;
use crate::sparse::{CooData, CsrData};
use crate::tensor::Tensor;

impl CpuClient {
    /// Validate the device, dtype and rank of `rows` against the graph
    fn check_rows(&self, graph_device: Device, id_dtype: DType, rows: &Tensor, op: &'static str) -> Result<()> {
        self.check_device(graph_device, op)?;
        if rows.device() != graph_device {
            return Err(Error::DeviceMismatch {
                expected: graph_device,
                got: rows.device(),
                tensor: "rows",
            });
        }
        if rows.dtype() != id_dtype {
            return Err(Error::DTypeMismatch {
                lhs: id_dtype,
                rhs: rows.dtype(),
            });
        }
        if rows.ndim() != 1 {
            return Err(Error::invalid_argument(
                "rows",
                format!("expected a 1-D id tensor, got shape {:?}", rows.shape()),
            ));
        }
        Ok(())
    }

    fn check_edge_array(&self, graph_device: Device, t: &Tensor, name: &'static str) -> Result<()> {
        self.check_vector(graph_device, t, name, "per-edge")
    }

    fn check_tag_array(&self, graph_device: Device, t: &Tensor, name: &'static str) -> Result<()> {
        self.check_vector(graph_device, t, name, "per-tag")
    }

    fn check_vector(
        &self,
        graph_device: Device,
        t: &Tensor,
        name: &'static str,
        indexed_by: &str,
    ) -> Result<()> {
        if t.device() != graph_device {
            return Err(Error::DeviceMismatch {
                expected: graph_device,
                got: t.device(),
                tensor: name,
            });
        }
        if t.ndim() != 1 {
            return Err(Error::invalid_argument(
                name,
                format!("expected a 1-D {} tensor, got shape {:?}", indexed_by, t.shape()),
            ));
        }
        Ok(())
    }
}

fn log_result(op: &'static str, out: &CooData) {
    tracing::trace!(op, picked = out.nnz(), "row-wise sampling done");
}

impl SamplingOps for CpuClient {
    fn csr_rowwise_sampling_uniform(
        &self,
        csr: &CsrData,
        rows: &Tensor,
        num_samples: i64,
        replace: bool,
    ) -> Result<CooData> {
        const OP: &str = "csr_rowwise_sampling_uniform";
        tracing::debug!(rows = rows.numel(), nnz = csr.nnz(), num_samples, replace, "{}", OP);
        self.check_rows(csr.device(), csr.id_dtype(), rows, OP)?;
        let policy = UniformPick::new(num_samples, replace)?;
        let out = crate::dispatch_id_dtype!(csr.id_dtype(), I => {
            csr_rowwise_pick::<I, _>(self, csr, rows, &policy)?
        }, OP);
        log_result(OP, &out);
        Ok(out)
    }

    fn csr_rowwise_sampling(
        &self,
        csr: &CsrData,
        rows: &Tensor,
        num_samples: i64,
        prob: &Tensor,
        replace: bool,
    ) -> Result<CooData> {
        const OP: &str = "csr_rowwise_sampling";
        tracing::debug!(rows = rows.numel(), nnz = csr.nnz(), num_samples, replace, "{}", OP);
        self.check_rows(csr.device(), csr.id_dtype(), rows, OP)?;
        self.check_edge_array(csr.device(), prob, "prob")?;
        let out = crate::dispatch_id_dtype!(csr.id_dtype(), I => {
            crate::dispatch_weight_dtype!(prob.dtype(), T => {
                let policy = WeightedPick::new(num_samples, replace, prob.as_slice::<T>()?)?;
                csr_rowwise_pick::<I, _>(self, csr, rows, &policy)?
            }, OP)
        }, OP);
        log_result(OP, &out);
        Ok(out)
    }

    fn csr_rowwise_sampling_biased(
        &self,
        csr: &CsrData,
        rows: &Tensor,
        num_samples: i64,
        tag_offset: &Tensor,
        bias: &Tensor,
        replace: bool,
    ) -> Result<CooData> {
        const OP: &str = "csr_rowwise_sampling_biased";
        tracing::debug!(
            rows = rows.numel(),
            nnz = csr.nnz(),
            num_tags = bias.numel(),
            num_samples,
            replace,
            "{}",
            OP
        );
        self.check_rows(csr.device(), csr.id_dtype(), rows, OP)?;
        self.check_tag_array(csr.device(), bias, "bias")?;
        if tag_offset.device() != csr.device() {
            return Err(Error::DeviceMismatch {
                expected: csr.device(),
                got: tag_offset.device(),
                tensor: "tag_offset",
            });
        }
        let expected = [csr.num_rows(), bias.numel() + 1];
        if tag_offset.shape() != expected.as_slice() {
            return Err(Error::shape_mismatch(&expected, tag_offset.shape()));
        }
        if tag_offset.dtype() != csr.id_dtype() {
            return Err(Error::DTypeMismatch {
                lhs: csr.id_dtype(),
                rhs: tag_offset.dtype(),
            });
        }
        let out = crate::dispatch_id_dtype!(csr.id_dtype(), I => {
            crate::dispatch_weight_dtype!(bias.dtype(), T => {
                let policy = BiasedPick::new(
                    num_samples,
                    replace,
                    tag_offset.as_slice::<I>()?,
                    bias.as_slice::<T>()?,
                )?;
                csr_rowwise_pick::<I, _>(self, csr, rows, &policy)?
            }, OP)
        }, OP);
        log_result(OP, &out);
        Ok(out)
    }

    fn csr_rowwise_topk(
        &self,
        csr: &CsrData,
        rows: &Tensor,
        k: usize,
        weight: &Tensor,
        ascending: bool,
    ) -> Result<CooData> {
        const OP: &str = "csr_rowwise_topk";
        tracing::debug!(rows = rows.numel(), nnz = csr.nnz(), k, ascending, "{}", OP);
        self.check_rows(csr.device(), csr.id_dtype(), rows, OP)?;
        self.check_edge_array(csr.device(), weight, "weight")?;
        let out = crate::dispatch_id_dtype!(csr.id_dtype(), I => {
            crate::dispatch_weight_dtype!(weight.dtype(), T => {
                let policy = TopkPick::new(k, ascending, weight.as_slice::<T>()?);
                csr_rowwise_pick::<I, _>(self, csr, rows, &policy)?
            }, OP)
        }, OP);
        log_result(OP, &out);
        Ok(out)
    }

    fn coo_rowwise_sampling_uniform(
        &self,
        coo: &CooData,
        rows: &Tensor,
        num_samples: i64,
        replace: bool,
    ) -> Result<CooData> {
        const OP: &str = "coo_rowwise_sampling_uniform";
        tracing::debug!(rows = rows.numel(), nnz = coo.nnz(), num_samples, replace, "{}", OP);
        self.check_rows(coo.device(), coo.id_dtype(), rows, OP)?;
        let policy = UniformPick::new(num_samples, replace)?;
        let out = crate::dispatch_id_dtype!(coo.id_dtype(), I => {
            coo_rowwise_pick::<I, _>(self, coo, rows, &policy)?
        }, OP);
        log_result(OP, &out);
        Ok(out)
    }

    fn coo_rowwise_sampling(
        &self,
        coo: &CooData,
        rows: &Tensor,
        num_samples: i64,
        prob: &Tensor,
        replace: bool,
    ) -> Result<CooData> {
        const OP: &str = "coo_rowwise_sampling";
        tracing::debug!(rows = rows.numel(), nnz = coo.nnz(), num_samples, replace, "{}", OP);
        self.check_rows(coo.device(), coo.id_dtype(), rows, OP)?;
        self.check_edge_array(coo.device(), prob, "prob")?;
        let out = crate::dispatch_id_dtype!(coo.id_dtype(), I => {
            crate::dispatch_weight_dtype!(prob.dtype(), T => {
                let policy = WeightedPick::new(num_samples, replace, prob.as_slice::<T>()?)?;
                coo_rowwise_pick::<I, _>(self, coo, rows, &policy)?
            }, OP)
        }, OP);
        log_result(OP, &out);
        Ok(out)
    }

    fn coo_rowwise_topk(
        &self,
        coo: &CooData,
        rows: &Tensor,
        k: usize,
        weight: &Tensor,
        ascending: bool,
    ) -> Result<CooData> {
        const OP: &str = "coo_rowwise_topk";
        tracing::debug!(rows = rows.numel(), nnz = coo.nnz(), k, ascending, "{}", OP);
        self.check_rows(coo.device(), coo.id_dtype(), rows, OP)?;
        self.check_edge_array(coo.device(), weight, "weight")?;
        let out = crate::dispatch_id_dtype!(coo.id_dtype(), I => {
            crate::dispatch_weight_dtype!(weight.dtype(), T => {
                let policy = TopkPick::new(k, ascending, weight.as_slice::<T>()?);
                coo_rowwise_pick::<I, _>(self, coo, rows, &policy)?
            }, OP)
        }, OP);
        log_result(OP, &out);
        Ok(out)
    }
}
