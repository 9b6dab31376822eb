//! Discrete prolate spheroidal sequences (Slepian tapers).
//!
//! The tapers are the leading eigenvectors of the symmetric tridiagonal
//! matrix (Percival & Walden, eq. 378):
//!
//! ```text
//!   diag[i]   = ((N − 1 − 2i) / 2)² · cos(2πW)      i = 0 … N−1
//!   off[i]    = i · (N − i) / 2                     i = 1 … N−1
//!   W         = NW / N
//! ```
//!
//! Signs follow scipy: symmetric tapers sum to a positive value,
//! antisymmetric tapers start with a positive lobe.
use nalgebra::{DMatrix, SymmetricEigen};

use crate::error::AnalysisError;

/// `k` unit-energy DPSS tapers of length `n`, ordered by concentration.
pub fn dpss(n: usize, nw: f64, k: usize) -> Result<Vec<Vec<f64>>, AnalysisError> {
    if n < 2 {
        return Err(AnalysisError::InvalidConfig(format!("taper length {n} is too short")));
    }
    if !(nw > 0.0 && nw < n as f64 / 2.0) {
        return Err(AnalysisError::InvalidConfig(format!(
            "time-bandwidth product {nw} must lie in (0, {})",
            n as f64 / 2.0
        )));
    }
    if k == 0 || k > n {
        return Err(AnalysisError::InvalidConfig(format!("cannot take {k} tapers of length {n}")));
    }

    let w = nw / n as f64;
    let cos_w = (2.0 * std::f64::consts::PI * w).cos();
    let half = (n as f64 - 1.0) / 2.0;

    let mut m = DMatrix::<f64>::zeros(n, n);
    for i in 0..n {
        let d = half - i as f64;
        m[(i, i)] = d * d * cos_w;
        if i > 0 {
            let off = i as f64 * (n - i) as f64 / 2.0;
            m[(i, i - 1)] = off;
            m[(i - 1, i)] = off;
        }
    }

    let eig = SymmetricEigen::new(m);
    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| eig.eigenvalues[b].total_cmp(&eig.eigenvalues[a]));

    let thresh = (1.0 / n as f64).max(1e-7);
    let tapers = order
        .iter()
        .take(k)
        .enumerate()
        .map(|(rank, &col)| {
            let mut v: Vec<f64> = eig.eigenvectors.column(col).iter().copied().collect();
            let flip = if rank % 2 == 0 {
                v.iter().sum::<f64>() < 0.0
            } else {
                v.iter().find(|&&x| x * x > thresh).is_some_and(|&x| x < 0.0)
            };
            if flip {
                v.iter_mut().for_each(|x| *x = -*x);
            }
            v
        })
        .collect();
    Ok(tapers)
}
