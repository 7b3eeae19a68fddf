use lazy_static::lazy_static;
use nalgebra::DMatrix;
use std::{
    collections::HashMap,
    sync::{Arc, Mutex, PoisonError}
};

lazy_static! {
    static ref OMEGA_CACHE: Mutex<HashMap<usize, Arc<DMatrix<f64>>>> = Mutex::new(HashMap::new());
}

/// Skew-symmetric interaction matrix of shape `(2k, 2k)`.
///
/// Each pair of playstyle components `(2i, 2i + 1)` forms a rotation block
/// `[[0, 1], [-1, 0]]`; everything else is zero.
fn build_omega(k: usize) -> DMatrix<f64> {
    let dim = 2 * k;
    let mut omega = DMatrix::zeros(dim, dim);

    for i in 0..k {
        let idx1 = 2 * i;
        let idx2 = 2 * i + 1;
        omega[(idx1, idx2)] = 1.0;
        omega[(idx2, idx1)] = -1.0;
    }

    omega
}

/// Returns the cached omega matrix for `k`. The matrix only depends on `k`, so a single
/// instance per value is shared for the lifetime of the process.
pub fn compute_omega(k: usize) -> Arc<DMatrix<f64>> {
    let mut cache = OMEGA_CACHE.lock().unwrap_or_else(PoisonError::into_inner);

    cache
        .entry(k)
        .or_insert_with(|| Arc::new(build_omega(k)))
        .clone()
}
