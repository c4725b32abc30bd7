//! Common test utilities
#![allow(dead_code)]

use graphr::runtime::cpu::{ClientConfig, CpuClient};
use graphr::sparse::CsrData;
use tracing_subscriber::EnvFilter;

/// Route kernel logs to the test output, filtered by `RUST_LOG`
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Create a CPU client for testing
pub fn create_cpu_client() -> CpuClient {
    CpuClient::new()
}

/// Create a CPU client whose sampling is reproducible
pub fn seeded_client(seed: u64) -> CpuClient {
    CpuClient::with_config(ClientConfig::default().with_seed(seed))
        .expect("seeded client config is valid")
}

/// Small directed graph used across the integration tests
///
/// ```text
/// row 0: cols [0, 1, 2, 3]   edges 0..4
/// row 1: cols [0]            edge  4
/// row 2: (empty)
/// row 3: cols [1, 3]         edges 5..7
/// ```
pub fn sample_csr() -> CsrData {
    CsrData::from_slices(&[0i64, 4, 5, 5, 7], &[0, 1, 2, 3, 0, 1, 3], None, [4, 4])
        .expect("valid csr")
}

/// Assert two f64 slices are close within tolerance
///
/// Uses the formula: |a - b| <= atol + rtol * |b|
pub fn assert_allclose_f64(a: &[f64], b: &[f64], rtol: f64, atol: f64, msg: &str) {
    assert_eq!(a.len(), b.len(), "{}: length mismatch", msg);
    for (i, (x, y)) in a.iter().zip(b.iter()).enumerate() {
        let diff = (x - y).abs();
        let tol = atol + rtol * y.abs();
        assert!(
            diff <= tol,
            "{}: element {} differs: {} vs {} (diff={}, tol={})",
            msg,
            i,
            x,
            y,
            diff,
            tol
        );
    }
}

/// Assert two f32 slices are close within tolerance
pub fn assert_allclose_f32(a: &[f32], b: &[f32], rtol: f32, atol: f32, msg: &str) {
    assert_eq!(a.len(), b.len(), "{}: length mismatch", msg);
    for (i, (x, y)) in a.iter().zip(b.iter()).enumerate() {
        let diff = (x - y).abs();
        let tol = atol + rtol * y.abs();
        assert!(
            diff <= tol,
            "{}: element {} differs: {} vs {} (diff={}, tol={})",
            msg,
            i,
            x,
            y,
            diff,
            tol
        );
    }
}
