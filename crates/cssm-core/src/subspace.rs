//! Narrowband subspace capability interface.
//!
//! The coherent wideband controller is written against this trait rather
//! than a concrete estimator, so any narrowband engine that can estimate
//! covariances, evaluate a spatial spectrum, pick peaks and split a matrix
//! into signal/noise subspaces can be focused coherently. [`MusicEngine`]
//! is the stock implementation.
//!
//! All results travel through return values; implementations hold no
//! per-call scan state.
//!
//! [`MusicEngine`]: crate::music::MusicEngine

use crate::eigen::HermitianEigen;
use crate::matrix::CMatrix;
use crate::snapshot::Snapshots;
use crate::types::{BinIndex, DirectionIndex, DoaResult};
use num_complex::Complex64;

/// Signal/noise split of a covariance matrix.
#[derive(Debug, Clone)]
pub struct Subspace {
    /// Signal subspace basis (M × num_sources), strongest first.
    pub signal: CMatrix,
    /// Noise subspace basis (M × (M - num_sources)).
    pub noise: CMatrix,
    pub signal_eigenvalues: Vec<f64>,
    pub noise_eigenvalues: Vec<f64>,
}

impl Subspace {
    /// Split an eigendecomposition: the `num_sources` eigenpairs with the
    /// largest magnitude form the signal subspace.
    pub fn from_eigen(eig: &HermitianEigen, num_sources: usize) -> Self {
        let order = eig.order_by_magnitude();
        let m = eig.eigenvectors.rows();
        let split = num_sources.min(order.len());
        let gather = |idx: &[usize]| {
            let cols: Vec<Vec<Complex64>> =
                idx.iter().map(|&k| eig.eigenvectors.column(k)).collect();
            let refs: Vec<&[Complex64]> = cols.iter().map(|c| c.as_slice()).collect();
            CMatrix::from_columns(m, &refs)
        };
        Self {
            signal: gather(&order[..split]),
            noise: gather(&order[split..]),
            signal_eigenvalues: order[..split].iter().map(|&k| eig.eigenvalues[k]).collect(),
            noise_eigenvalues: order[split..].iter().map(|&k| eig.eigenvalues[k]).collect(),
        }
    }

    /// Noise-subspace projector `En · En^H`.
    pub fn noise_projector(&self) -> CMatrix {
        self.noise.multiply(&self.noise.hermitian())
    }
}

/// Operations a narrowband estimator exposes to the coherent controller.
pub trait SubspaceBase: Sync {
    /// Number of sensors M.
    fn num_sensors(&self) -> usize;

    /// Number of sources to resolve.
    fn num_sources(&self) -> usize;

    /// Active frequency bins, in processing order.
    fn freq_bins(&self) -> &[BinIndex];

    /// Size of the candidate direction grid.
    fn num_directions(&self) -> usize;

    /// Steering vector (length M) at `bin` for candidate `direction`.
    fn mode_vector(&self, bin: BinIndex, direction: DirectionIndex) -> &[Complex64];

    /// One M×M covariance per active bin, in `freq_bins()` order.
    fn compute_correlation_matrices(&self, snapshots: &Snapshots) -> DoaResult<Vec<CMatrix>>;

    /// Spatial spectrum over the direction grid using `cross` at `bin`.
    fn compute_spatial_spectrum(&self, cross: &CMatrix, bin: BinIndex) -> Vec<f64>;

    /// Direction indices of the strongest peaks of `spectrum`, at most
    /// `num_sources()` of them. May return fewer.
    fn peaks_1d(&self, spectrum: &[f64]) -> Vec<DirectionIndex>;

    /// Split `matrix` into signal and noise subspaces.
    fn subspace_decomposition(&self, matrix: &CMatrix) -> DoaResult<Subspace>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eigen::hermitian_eigen;

    #[test]
    fn test_split_and_projector() {
        let a = [
            Complex64::new(1.0, 0.0),
            Complex64::new(0.0, 1.0),
            Complex64::new(-1.0, 0.0),
        ];
        let mut r = CMatrix::outer(&a);
        r.add_assign(&{
            let mut eye = CMatrix::identity(3);
            eye.scale(0.1);
            eye
        });
        let sub = Subspace::from_eigen(&hermitian_eigen(&r), 1);
        assert_eq!(sub.signal.cols(), 1);
        assert_eq!(sub.noise.cols(), 2);
        assert!((sub.signal_eigenvalues[0] - 3.1).abs() < 1e-10);
        assert!(sub.noise_eigenvalues.iter().all(|l| (l - 0.1).abs() < 1e-10));

        // projector annihilates the signal direction and is idempotent
        let p = sub.noise_projector();
        assert!(p.quadratic_form(&a).norm() < 1e-10);
        let p2 = p.multiply(&p);
        for i in 0..3 {
            for j in 0..3 {
                assert!((p2.get(i, j) - p.get(i, j)).norm() < 1e-10);
            }
        }
    }
}
