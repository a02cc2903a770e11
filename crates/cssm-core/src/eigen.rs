//! Hermitian eigendecomposition (cyclic complex Jacobi).
//!
//! Covariance matrices in DOA work are small (M×M, M = number of sensors)
//! and Hermitian, so a cyclic Jacobi sweep is accurate, simple and keeps
//! degenerate eigenspaces (e.g. a multi-dimensional noise subspace) fully
//! orthonormal.
//!
//! Each rotation first removes the phase of the pivot element and then
//! applies the classical real Jacobi rotation, i.e. `G = D·P` with
//! `D = diag(1, e^{-jφ})` on the (p, q) plane.
//!
//! ## Example
//!
//! ```rust
//! use cssm_core::eigen::hermitian_eigen;
//! use cssm_core::matrix::CMatrix;
//! use num_complex::Complex64;
//!
//! let m = CMatrix::from_data(2, 2, vec![
//!     Complex64::new(2.0, 0.0), Complex64::new(0.0, 1.0),
//!     Complex64::new(0.0, -1.0), Complex64::new(2.0, 0.0),
//! ]);
//! let eig = hermitian_eigen(&m);
//! let mut vals = eig.eigenvalues.clone();
//! vals.sort_by(|a, b| a.total_cmp(b));
//! assert!((vals[0] - 1.0).abs() < 1e-10);
//! assert!((vals[1] - 3.0).abs() < 1e-10);
//! ```

use crate::matrix::CMatrix;
use num_complex::Complex64;

const MAX_SWEEPS: usize = 64;

/// Result of a Hermitian eigenvalue decomposition.
#[derive(Debug, Clone)]
pub struct HermitianEigen {
    /// Real eigenvalues (not sorted).
    pub eigenvalues: Vec<f64>,
    /// Orthonormal eigenvectors stored column-wise (column *j* belongs to
    /// `eigenvalues[j]`).
    pub eigenvectors: CMatrix,
}

impl HermitianEigen {
    /// Column indices ordered by eigenvalue magnitude, largest first.
    /// Ties keep their original column order.
    pub fn order_by_magnitude(&self) -> Vec<usize> {
        let mut idx: Vec<usize> = (0..self.eigenvalues.len()).collect();
        idx.sort_by(|&a, &b| {
            self.eigenvalues[b]
                .abs()
                .total_cmp(&self.eigenvalues[a].abs())
        });
        idx
    }
}

/// Eigendecomposition of a Hermitian matrix.
///
/// Only the Hermitian part of `mat` is used, so slightly asymmetric input
/// from finite-precision products is tolerated.
///
/// # Panics
/// Panics if `mat` is not square.
pub fn hermitian_eigen(mat: &CMatrix) -> HermitianEigen {
    let n = mat.rows();
    assert!(mat.is_square(), "hermitian_eigen requires a square matrix");

    let mut a = mat.hermitian_part();
    let mut v = CMatrix::identity(n);

    let total: f64 = a.frobenius_norm().powi(2);
    let tol = total * 1e-30;

    for _ in 0..MAX_SWEEPS {
        if off_diagonal_sq(&a) <= tol {
            break;
        }

        for p in 0..n {
            for q in (p + 1)..n {
                let apq = a.get(p, q);
                let r = apq.norm();
                if r <= f64::MIN_POSITIVE {
                    continue;
                }
                // e^{-jφ} for apq = r·e^{jφ}
                let phase = apq.conj() / r;

                let app = a.get(p, p).re;
                let aqq = a.get(q, q).re;
                let theta = (aqq - app) / (2.0 * r);
                let t = if theta >= 0.0 {
                    1.0 / (theta + (1.0 + theta * theta).sqrt())
                } else {
                    -1.0 / (-theta + (1.0 + theta * theta).sqrt())
                };
                let c = 1.0 / (1.0 + t * t).sqrt();
                let s = t * c;

                rotate_columns(&mut a, p, q, c, s, phase);
                rotate_rows(&mut a, p, q, c, s, phase.conj());
                rotate_columns(&mut v, p, q, c, s, phase);

                a.set(p, q, Complex64::new(0.0, 0.0));
                a.set(q, p, Complex64::new(0.0, 0.0));
                a.set(p, p, Complex64::new(a.get(p, p).re, 0.0));
                a.set(q, q, Complex64::new(a.get(q, q).re, 0.0));
            }
        }
    }

    HermitianEigen {
        eigenvalues: (0..n).map(|i| a.get(i, i).re).collect(),
        eigenvectors: v,
    }
}

// M ← M·G with G[p,p]=c, G[p,q]=s, G[q,p]=-s·e^{-jφ}, G[q,q]=c·e^{-jφ}
fn rotate_columns(m: &mut CMatrix, p: usize, q: usize, c: f64, s: f64, phase: Complex64) {
    for i in 0..m.rows() {
        let mp = m.get(i, p);
        let mq = m.get(i, q) * phase;
        m.set(i, p, mp * c - mq * s);
        m.set(i, q, mp * s + mq * c);
    }
}

// M ← G^H·M (`phase_conj` is e^{+jφ})
fn rotate_rows(m: &mut CMatrix, p: usize, q: usize, c: f64, s: f64, phase_conj: Complex64) {
    for j in 0..m.cols() {
        let mp = m.get(p, j);
        let mq = m.get(q, j) * phase_conj;
        m.set(p, j, mp * c - mq * s);
        m.set(q, j, mp * s + mq * c);
    }
}

fn off_diagonal_sq(a: &CMatrix) -> f64 {
    let n = a.rows();
    let mut sum = 0.0;
    for i in 0..n {
        for j in 0..n {
            if i != j {
                sum += a.get(i, j).norm_sqr();
            }
        }
    }
    sum
}
