//! Focusing transforms and coherent covariance combination.
//!
//! For bin `j` with current direction set `β_j` (p = |β_j| < M):
//!
//! ```text
//!   A_j = [a_j(β_1) .. a_j(β_p)]          steering vectors at bin j
//!   A_0 = [a_0(β_1) .. a_0(β_p)]          same directions at the reference bin
//!   B^T = [e_p .. e_{M-1}]                fixed complement (last M-p unit vectors)
//!
//!   T_j = [A_0 | B^T] · [A_j | B^T]^{-1}
//!   R   = Σ_j T_j · Ĉ_j · T_j^H
//! ```
//!
//! `T_j` maps every steering vector in `β_j` at bin `j` exactly onto its
//! counterpart at the reference bin, so the per-bin covariances add
//! coherently. A singular `[A_j | B^T]` (duplicate or degenerate directions)
//! aborts the whole combination.

use crate::matrix::CMatrix;
use crate::subspace::SubspaceBase;
use crate::types::{BinIndex, DirectionIndex, DoaError, DoaResult};
use num_complex::Complex64;

/// Focusing transform `T_j` for `bin` relative to `reference_bin`.
///
/// Returns the exact identity when the steering vectors of `directions`
/// coincide at both bins (including `bin == reference_bin`), provided the
/// augmented basis `[A_j | B^T]` is invertible.
pub fn focusing_transform<B>(
    base: &B,
    bin: BinIndex,
    reference_bin: BinIndex,
    directions: &[DirectionIndex],
) -> DoaResult<CMatrix>
where
    B: SubspaceBase + ?Sized,
{
    let m = base.num_sensors();
    let p = directions.len();
    if p >= m {
        return Err(DoaError::ShapeMismatch(format!(
            "{} focusing directions leave no complement in a {}-sensor array",
            p, m
        )));
    }

    let a_j: Vec<&[Complex64]> = directions.iter().map(|&d| base.mode_vector(bin, d)).collect();
    let a_0: Vec<&[Complex64]> = directions
        .iter()
        .map(|&d| base.mode_vector(reference_bin, d))
        .collect();

    let complement: Vec<Vec<Complex64>> = (p..m)
        .map(|i| {
            let mut e = vec![Complex64::new(0.0, 0.0); m];
            e[i] = Complex64::new(1.0, 0.0);
            e
        })
        .collect();

    let augment = |steering: &[&[Complex64]]| {
        let cols: Vec<&[Complex64]> = steering
            .iter()
            .copied()
            .chain(complement.iter().map(|c| c.as_slice()))
            .collect();
        CMatrix::from_columns(m, &cols)
    };

    let singular = || DoaError::SingularTransform {
        bin,
        directions: directions.to_vec(),
    };

    let inverse = augment(&a_j).inverse().ok_or_else(singular)?;
    if a_j == a_0 {
        return Ok(CMatrix::identity(m));
    }
    let transform = augment(&a_0).multiply(&inverse);
    if !transform.is_finite() {
        return Err(singular());
    }
    Ok(transform)
}

/// Focusing transforms for every active bin, in `freq_bins()` order.
pub fn focusing_transforms<B>(
    base: &B,
    reference_bin: BinIndex,
    beta: &[Vec<DirectionIndex>],
) -> DoaResult<Vec<CMatrix>>
where
    B: SubspaceBase + ?Sized,
{
    let bins = base.freq_bins();
    if beta.len() != bins.len() {
        return Err(DoaError::ShapeMismatch(format!(
            "{} direction sets for {} bins",
            beta.len(),
            bins.len()
        )));
    }

    #[cfg(feature = "parallel")]
    {
        use rayon::prelude::*;
        bins.par_iter()
            .zip(beta.par_iter())
            .map(|(&bin, dirs)| focusing_transform(base, bin, reference_bin, dirs))
            .collect()
    }

    #[cfg(not(feature = "parallel"))]
    {
        bins.iter()
            .zip(beta)
            .map(|(&bin, dirs)| focusing_transform(base, bin, reference_bin, dirs))
            .collect()
    }
}

/// Coherent sum `R = Σ_j T_j · Ĉ_j · T_j^H` over all active bins.
///
/// `covariances` and `beta` are indexed like `base.freq_bins()`. The
/// summation order is fixed, so the result does not depend on how the
/// transforms were computed.
pub fn coherent_sum<B>(
    base: &B,
    covariances: &[CMatrix],
    reference_bin: BinIndex,
    beta: &[Vec<DirectionIndex>],
) -> DoaResult<CMatrix>
where
    B: SubspaceBase + ?Sized,
{
    let m = base.num_sensors();
    if covariances.len() != base.freq_bins().len() {
        return Err(DoaError::ShapeMismatch(format!(
            "{} covariances for {} bins",
            covariances.len(),
            base.freq_bins().len()
        )));
    }

    let transforms = focusing_transforms(base, reference_bin, beta)?;

    let mut r = CMatrix::zeros(m, m);
    for (t, cov) in transforms.iter().zip(covariances) {
        r.add_assign(&t.congruence(cov));
    }
    Ok(r)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifold::{ArrayGeometry, ArrayManifold, DirectionGrid, FieldMode};
    use crate::music::MusicEngine;

    fn ula_engine() -> MusicEngine {
        let grid = DirectionGrid::azimuth_deg(0.0, 175.0, 36);
        let freqs: Vec<f64> = (0..=128).map(|k| k as f64 * 62.5).collect();
        let manifold = ArrayManifold::build(
            &ArrayGeometry::linear(4, 0.05),
            &grid,
            &freqs,
            343.0,
            FieldMode::Far,
        );
        MusicEngine::new(manifold, vec![20, 30, 40], 2).unwrap()
    }

    fn assert_close(a: &[Complex64], b: &[Complex64], tol: f64) {
        for (x, y) in a.iter().zip(b) {
            assert!((x - y).norm() < tol, "{} vs {}", x, y);
        }
    }

    #[test]
    fn test_transform_maps_steering_vectors() {
        let engine = ula_engine();
        let dirs = [7, 26];
        let t = focusing_transform(&engine, 20, 30, &dirs).unwrap();
        for &d in &dirs {
            let a_j = CMatrix::from_columns(4, &[engine.mode_vector(20, d)]);
            let mapped = t.multiply(&a_j);
            assert_close(mapped.as_slice(), engine.mode_vector(30, d), 1e-10);
        }
    }

    #[test]
    fn test_transform_identity_at_reference() {
        let engine = ula_engine();
        let t = focusing_transform(&engine, 30, 30, &[3, 9]).unwrap();
        assert_eq!(t, CMatrix::identity(4));
        // empty direction set: both augmented bases are the identity
        let t = focusing_transform(&engine, 20, 30, &[]).unwrap();
        assert_eq!(t, CMatrix::identity(4));
    }

    #[test]
    fn test_duplicate_directions_are_singular() {
        let engine = ula_engine();
        let err = focusing_transform(&engine, 20, 30, &[7, 7]).unwrap_err();
        assert_eq!(
            err,
            DoaError::SingularTransform {
                bin: 20,
                directions: vec![7, 7]
            }
        );

        let beta = vec![vec![7], vec![7, 7], vec![7]];
        let covs = vec![CMatrix::identity(4); 3];
        assert!(matches!(
            coherent_sum(&engine, &covs, 40, &beta),
            Err(DoaError::SingularTransform { bin: 30, .. })
        ));
    }

    #[test]
    fn test_duplicate_directions_singular_at_reference() {
        let engine = ula_engine();
        assert_eq!(
            focusing_transform(&engine, 30, 30, &[7, 7]),
            Err(DoaError::SingularTransform {
                bin: 30,
                directions: vec![7, 7]
            })
        );

        // single active bin: it is also the reference
        let single = MusicEngine::new(engine.manifold().clone(), vec![30], 2).unwrap();
        let covs = vec![CMatrix::identity(4)];
        assert!(matches!(
            coherent_sum(&single, &covs, 30, &[vec![7, 7]]),
            Err(DoaError::SingularTransform { bin: 30, .. })
        ));
    }

    #[test]
    fn test_shared_steering_duplicates_singular() {
        let manifold = ArrayManifold::from_fn(4, 4, 12, |m, _, n| {
            Complex64::from_polar(1.0, 0.3 * (m * n) as f64)
        });
        let engine = MusicEngine::new(manifold, vec![1, 2, 3], 2).unwrap();
        let covs = vec![CMatrix::identity(4); 3];
        let beta = vec![vec![5, 5]; 3];
        assert!(matches!(
            coherent_sum(&engine, &covs, 2, &beta),
            Err(DoaError::SingularTransform { .. })
        ));
    }

    #[test]
    fn test_too_many_directions_rejected() {
        let engine = ula_engine();
        assert!(matches!(
            focusing_transform(&engine, 20, 30, &[1, 2, 3, 4]),
            Err(DoaError::ShapeMismatch(_))
        ));
    }

    #[test]
    fn test_shared_steering_sum_is_direct_sum() {
        // every bin shares the same steering vectors: T_j = I
        let manifold = ArrayManifold::from_fn(4, 4, 12, |m, _, n| {
            Complex64::from_polar(1.0, 0.3 * (m * n) as f64)
        });
        let engine = MusicEngine::new(manifold, vec![1, 2, 3], 1).unwrap();
        let covs: Vec<CMatrix> = (0..3)
            .map(|j| {
                let x: Vec<Complex64> = (0..4)
                    .map(|m| Complex64::new(1.0 + (j * m) as f64, 0.5 - m as f64))
                    .collect();
                CMatrix::outer(&x)
            })
            .collect();
        let beta = vec![vec![7]; 3];
        let r = coherent_sum(&engine, &covs, 2, &beta).unwrap();

        let mut direct = CMatrix::zeros(4, 4);
        for c in &covs {
            direct.add_assign(c);
        }
        assert_eq!(r, direct);
    }

    #[test]
    fn test_coherent_sum_aligns_single_source() {
        let engine = ula_engine();
        let bins = engine.freq_bins().to_vec();
        let covs: Vec<CMatrix> = bins
            .iter()
            .map(|&k| CMatrix::outer(engine.mode_vector(k, 7)))
            .collect();
        let beta = vec![vec![7]; 3];
        let r = coherent_sum(&engine, &covs, 30, &beta).unwrap();

        let mut expected = CMatrix::outer(engine.mode_vector(30, 7));
        expected.scale(3.0);
        assert_close(r.as_slice(), expected.as_slice(), 1e-9);
    }

    #[test]
    fn test_length_mismatch() {
        let engine = ula_engine();
        let covs = vec![CMatrix::identity(4); 2];
        assert!(matches!(
            coherent_sum(&engine, &covs, 30, &[vec![], vec![]]),
            Err(DoaError::ShapeMismatch(_))
        ));
        let covs = vec![CMatrix::identity(4); 3];
        assert!(matches!(
            coherent_sum(&engine, &covs, 30, &[vec![], vec![]]),
            Err(DoaError::ShapeMismatch(_))
        ));
    }
}
