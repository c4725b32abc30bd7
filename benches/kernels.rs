//! Benchmarks for the sampling and SpMM hot paths

use criterion::{Criterion, black_box, criterion_group, criterion_main};
use graphr::prelude::*;

/// Ring-like random graph with `n` rows and `deg` in-edges per row
fn build_csr(n: usize, deg: usize) -> CsrData {
    let indptr: Vec<i64> = (0..=n).map(|r| (r * deg) as i64).collect();
    let indices: Vec<i64> = (0..n * deg)
        .map(|p| ((p / deg + (p % deg) * 7919) % n) as i64)
        .collect();
    CsrData::from_slices(&indptr, &indices, None, [n, n]).unwrap()
}

fn bench_sampling(c: &mut Criterion) {
    let client = CpuClient::with_config(ClientConfig::default().with_seed(0)).unwrap();
    let csr = build_csr(100_000, 32);
    let rows: Vec<i64> = (0..10_000).map(|i| (i * 7) as i64).collect();
    let rows = Tensor::from_slice(&rows, &[rows.len()], Device::Cpu);
    let prob: Vec<f32> = (0..csr.nnz()).map(|i| (i % 13) as f32).collect();
    let prob = Tensor::from_slice(&prob, &[prob.len()], Device::Cpu);

    let mut group = c.benchmark_group("sampling");
    group.bench_function("uniform_10", |b| {
        b.iter(|| black_box(client.csr_rowwise_sampling_uniform(&csr, &rows, 10, false).unwrap()))
    });
    group.bench_function("weighted_10", |b| {
        b.iter(|| black_box(client.csr_rowwise_sampling(&csr, &rows, 10, &prob, false).unwrap()))
    });
    group.bench_function("topk_10", |b| {
        b.iter(|| black_box(client.csr_rowwise_topk(&csr, &rows, 10, &prob, false).unwrap()))
    });
    group.finish();
}

fn bench_spmm(c: &mut Criterion) {
    let client = CpuClient::new();
    let csr = build_csr(50_000, 16);
    let feat: Vec<f32> = (0..50_000 * 64).map(|i| (i % 97) as f32 * 0.01).collect();
    let feat = Tensor::from_slice(&feat, &[50_000, 64], Device::Cpu);

    let mut group = c.benchmark_group("spmm");
    for reduce in [ReduceOp::Sum, ReduceOp::Max] {
        group.bench_function(format!("copy_u_{}", reduce), |b| {
            b.iter(|| {
                black_box(
                    client
                        .gspmm((&csr).into(), BinaryOp::CopyLhs, reduce, Some(&feat), None)
                        .unwrap(),
                )
            })
        });
    }
    group.finish();
}

criterion_group!(benches, bench_sampling, bench_spmm);
criterion_main!(benches);
