//! MUSIC narrowband engine, the stock [`SubspaceBase`].
//!
//! Supplies everything the coherent controller consumes from a narrowband
//! estimator:
//!
//! - empirical covariance per active bin, `Ĉ_k = (1/S)·Σ_s x_k[s]·x_k[s]^H`
//! - spatial spectrum `P(n) = 1 / |a_k(n)^H · cross · a_k(n)|`
//! - circular 1-D peak search over the direction grid
//! - Hermitian eigen-split into signal and noise subspaces
//!
//! Passing a raw covariance as `cross` and inverting the resulting spectrum
//! gives the conventional (Bartlett) power `|a^H Ĉ a|`; passing the noise
//! projector `En·En^H` gives the MUSIC pseudospectrum.
//!
//! ## Example
//!
//! ```rust
//! use cssm_core::manifold::{ArrayGeometry, ArrayManifold, DirectionGrid, FieldMode};
//! use cssm_core::music::MusicEngine;
//! use cssm_core::subspace::SubspaceBase;
//!
//! let grid = DirectionGrid::azimuth_deg(0.0, 175.0, 36);
//! let freqs: Vec<f64> = (0..=128).map(|k| k as f64 * 62.5).collect();
//! let manifold = ArrayManifold::build(&ArrayGeometry::linear(4, 0.05), &grid, &freqs, 343.0, FieldMode::Far);
//! let engine = MusicEngine::new(manifold, vec![20, 30, 40], 1).unwrap().with_grid(grid);
//! assert_eq!(engine.num_sensors(), 4);
//! assert_eq!(engine.peaks_1d(&[0.1, 0.9, 0.3]), vec![1]);
//! ```

use crate::config::CssmConfig;
use crate::eigen::hermitian_eigen;
use crate::manifold::{ArrayManifold, DirectionGrid, Location};
use crate::matrix::CMatrix;
use crate::snapshot::Snapshots;
use crate::subspace::{Subspace, SubspaceBase};
use crate::types::{BinIndex, DirectionIndex, DoaError, DoaResult};
use num_complex::Complex64;

/// Smallest denominator used when evaluating the spatial spectrum.
pub const SPECTRUM_FLOOR: f64 = 1e-20;

/// MUSIC estimator over a fixed manifold and active bin set.
#[derive(Debug, Clone)]
pub struct MusicEngine {
    manifold: ArrayManifold,
    grid: Option<DirectionGrid>,
    freq_bins: Vec<BinIndex>,
    num_sources: usize,
}

impl MusicEngine {
    /// Create an engine over `manifold` processing `freq_bins`.
    ///
    /// `num_sources` must leave a non-empty noise subspace
    /// (`1 <= num_sources < M`).
    pub fn new(
        manifold: ArrayManifold,
        freq_bins: Vec<BinIndex>,
        num_sources: usize,
    ) -> DoaResult<Self> {
        let m = manifold.sensors();
        if num_sources == 0 || num_sources >= m {
            return Err(DoaError::InvalidConfig(format!(
                "num_sources must be in 1..{} for a {}-sensor array, got {}",
                m, m, num_sources
            )));
        }
        if manifold.directions() == 0 {
            return Err(DoaError::InvalidConfig("direction grid is empty".into()));
        }
        if let Some(&bin) = freq_bins.iter().find(|&&b| b >= manifold.bins()) {
            return Err(DoaError::BinOutOfRange {
                bin,
                max: manifold.bins().saturating_sub(1),
            });
        }
        Ok(Self {
            manifold,
            grid: None,
            freq_bins,
            num_sources,
        })
    }

    /// Build geometry, grid, manifold and bin set from a configuration.
    pub fn from_config(config: &CssmConfig) -> DoaResult<Self> {
        config
            .validate()
            .map_err(|e| DoaError::InvalidConfig(e.to_string()))?;
        let grid = config.grid.direction_grid();
        let manifold = ArrayManifold::build(
            &config.array.geometry(),
            &grid,
            &config.bin_frequencies(),
            config.speed_of_sound,
            config.mode,
        );
        let bins = config
            .frequencies
            .resolve(config.sample_rate, config.nfft)
            .map_err(|e| DoaError::InvalidConfig(e.to_string()))?;
        Ok(Self::new(manifold, bins, config.num_sources)?.with_grid(grid))
    }

    /// Attach the grid the manifold was built from, enabling
    /// [`MusicEngine::locations`].
    pub fn with_grid(mut self, grid: DirectionGrid) -> Self {
        self.grid = Some(grid);
        self
    }

    pub fn grid(&self) -> Option<&DirectionGrid> {
        self.grid.as_ref()
    }

    pub fn manifold(&self) -> &ArrayManifold {
        &self.manifold
    }

    /// Map direction indices to grid locations.
    pub fn locations(&self, indices: &[DirectionIndex]) -> Vec<Location> {
        match &self.grid {
            Some(grid) => indices
                .iter()
                .filter_map(|&i| grid.location(i).copied())
                .collect(),
            None => vec![],
        }
    }
}

impl SubspaceBase for MusicEngine {
    fn num_sensors(&self) -> usize {
        self.manifold.sensors()
    }

    fn num_sources(&self) -> usize {
        self.num_sources
    }

    fn freq_bins(&self) -> &[BinIndex] {
        &self.freq_bins
    }

    fn num_directions(&self) -> usize {
        self.manifold.directions()
    }

    fn mode_vector(&self, bin: BinIndex, direction: DirectionIndex) -> &[Complex64] {
        self.manifold.mode_vector(bin, direction)
    }

    fn compute_correlation_matrices(&self, snapshots: &Snapshots) -> DoaResult<Vec<CMatrix>> {
        let m = self.num_sensors();
        snapshots.check_shape(m, &self.freq_bins)?;
        let frames = snapshots.frames();

        Ok(self
            .freq_bins
            .iter()
            .map(|&k| {
                let mut cov = CMatrix::zeros(m, m);
                for s in 0..frames {
                    for i in 0..m {
                        let xi = snapshots.get(i, k, s);
                        for j in 0..m {
                            let v = cov.get(i, j) + xi * snapshots.get(j, k, s).conj();
                            cov.set(i, j, v);
                        }
                    }
                }
                cov.scale(1.0 / frames as f64);
                cov
            })
            .collect())
    }

    fn compute_spatial_spectrum(&self, cross: &CMatrix, bin: BinIndex) -> Vec<f64> {
        (0..self.num_directions())
            .map(|n| {
                let denom = cross.quadratic_form(self.mode_vector(bin, n)).norm();
                1.0 / denom.max(SPECTRUM_FLOOR)
            })
            .collect()
    }

    fn peaks_1d(&self, spectrum: &[f64]) -> Vec<DirectionIndex> {
        find_peaks(spectrum, self.num_sources)
    }

    fn subspace_decomposition(&self, matrix: &CMatrix) -> DoaResult<Subspace> {
        let m = self.num_sensors();
        if matrix.rows() != m || matrix.cols() != m {
            return Err(DoaError::ShapeMismatch(format!(
                "expected {}x{} matrix, got {}x{}",
                m,
                m,
                matrix.rows(),
                matrix.cols()
            )));
        }
        Ok(Subspace::from_eigen(&hermitian_eigen(matrix), self.num_sources))
    }
}

/// Strongest `num_peaks` local maxima of a circular spectrum, strongest
/// first.
///
/// With a single peak requested this is the global argmax (first
/// occurrence). Otherwise index `i` is a peak when
/// `P[i] >= P[i-1] && P[i] > P[i+1]` with wrapping indices, so a plateau
/// reports only its last sample. Fewer than `num_peaks` indices are
/// returned when the spectrum has fewer local maxima.
pub fn find_peaks(spectrum: &[f64], num_peaks: usize) -> Vec<DirectionIndex> {
    let n = spectrum.len();
    if n == 0 || num_peaks == 0 {
        return vec![];
    }

    if num_peaks == 1 {
        let mut best = 0;
        for (i, &v) in spectrum.iter().enumerate() {
            if v > spectrum[best] {
                best = i;
            }
        }
        return vec![best];
    }

    let mut peaks: Vec<DirectionIndex> = Vec::new();
    for i in 0..n {
        let prev = spectrum[(i + n - 1) % n];
        let next = spectrum[(i + 1) % n];
        if spectrum[i] >= prev && spectrum[i] > next {
            peaks.push(i);
        }
    }

    // stable: equal peaks keep grid order
    peaks.sort_by(|&a, &b| spectrum[b].total_cmp(&spectrum[a]));
    peaks.truncate(num_peaks);
    peaks
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifold::{ArrayGeometry, FieldMode};

    fn engine(num_sources: usize) -> MusicEngine {
        let grid = DirectionGrid::azimuth_deg(0.0, 175.0, 36);
        let freqs: Vec<f64> = (0..=128).map(|k| k as f64 * 62.5).collect();
        let manifold = ArrayManifold::build(
            &ArrayGeometry::linear(4, 0.05),
            &grid,
            &freqs,
            343.0,
            FieldMode::Far,
        );
        MusicEngine::new(manifold, vec![20, 30, 40], num_sources)
            .unwrap()
            .with_grid(grid)
    }

    fn source_snapshots(engine: &MusicEngine, direction: usize, frames: usize) -> Snapshots {
        Snapshots::from_fn(4, 129, frames, |m, k, s| {
            let amp = Complex64::from_polar(1.0, 0.7 * s as f64);
            engine.manifold().mode_vector(k, direction)[m] * amp
        })
    }

    #[test]
    fn test_find_peaks_argmax_first_occurrence() {
        assert_eq!(find_peaks(&[1.0, 3.0, 3.0, 2.0], 1), vec![1]);
        assert!(find_peaks(&[], 1).is_empty());
    }

    #[test]
    fn test_find_peaks_circular() {
        let p = [5.0, 1.0, 2.0, 4.0, 1.0, 3.0, 0.5];
        assert_eq!(find_peaks(&p, 2), vec![0, 3]);
        assert_eq!(find_peaks(&p, 3), vec![0, 3, 5]);
        // last sample compared against the first
        assert_eq!(find_peaks(&[1.0, 2.0, 1.5, 3.0], 2), vec![3, 1]);
        assert_eq!(find_peaks(&[3.0, 2.0, 1.5, 1.0], 2), vec![0]);
    }

    #[test]
    fn test_find_peaks_flat_and_unimodal() {
        assert!(find_peaks(&[2.0; 8], 2).is_empty());
        assert_eq!(find_peaks(&[1.0, 2.0, 3.0, 2.0, 1.0], 2), vec![2]);
    }

    #[test]
    fn test_find_peaks_plateau_counted_once() {
        let p = [0.0, 2.0, 2.0, 0.0, 1.0, 0.0];
        assert_eq!(find_peaks(&p, 3), vec![2, 4]);
    }

    #[test]
    fn test_rejects_too_many_sources() {
        let grid = DirectionGrid::azimuth_deg(0.0, 90.0, 4);
        let manifold = ArrayManifold::build(&ArrayGeometry::linear(3, 0.05), &grid, &[100.0], 343.0, FieldMode::Far);
        assert!(matches!(
            MusicEngine::new(manifold.clone(), vec![0], 3),
            Err(DoaError::InvalidConfig(_))
        ));
        assert!(matches!(
            MusicEngine::new(manifold, vec![1], 1),
            Err(DoaError::BinOutOfRange { bin: 1, max: 0 })
        ));
    }

    #[test]
    fn test_correlation_matrices_hermitian_psd() {
        let engine = engine(1);
        // pseudo-random but deterministic snapshots
        let mut state = 0x2545F4914F6CDD1Du64;
        let mut next = || {
            state ^= state << 13;
            state ^= state >> 7;
            state ^= state << 17;
            (state >> 11) as f64 / (1u64 << 53) as f64 - 0.5
        };
        let x = Snapshots::from_fn(4, 129, 16, |_, _, _| Complex64::new(next(), next()));
        let covs = engine.compute_correlation_matrices(&x).unwrap();
        assert_eq!(covs.len(), 3);
        for cov in &covs {
            assert!(cov.is_hermitian(1e-12));
            let eig = hermitian_eigen(cov);
            assert!(eig.eigenvalues.iter().all(|&l| l >= -1e-10));
        }
    }

    #[test]
    fn test_correlation_shape_errors() {
        let engine = engine(1);
        assert!(matches!(
            engine.compute_correlation_matrices(&Snapshots::zeros(3, 129, 2)),
            Err(DoaError::ShapeMismatch(_))
        ));
        assert!(matches!(
            engine.compute_correlation_matrices(&Snapshots::zeros(4, 30, 2)),
            Err(DoaError::BinOutOfRange { bin: 30, .. })
        ));
    }

    #[test]
    fn test_bartlett_seed_peaks_at_source() {
        let engine = engine(1);
        let covs = engine
            .compute_correlation_matrices(&source_snapshots(&engine, 7, 4))
            .unwrap();
        for (cov, &bin) in covs.iter().zip(engine.freq_bins()) {
            let power: Vec<f64> = engine
                .compute_spatial_spectrum(cov, bin)
                .iter()
                .map(|p| 1.0 / p)
                .collect();
            assert_eq!(engine.peaks_1d(&power), vec![7]);
        }
    }

    #[test]
    fn test_music_spectrum_nulls_at_source() {
        let engine = engine(1);
        let covs = engine
            .compute_correlation_matrices(&source_snapshots(&engine, 12, 4))
            .unwrap();
        let sub = engine.subspace_decomposition(&covs[1]).unwrap();
        assert_eq!(sub.noise.cols(), 3);
        let spectrum = engine.compute_spatial_spectrum(&sub.noise_projector(), 30);
        assert_eq!(engine.peaks_1d(&spectrum), vec![12]);
        assert_eq!(engine.locations(&[12])[0].azimuth_deg().round(), 60.0);
    }

    #[test]
    fn test_decomposition_shape_check() {
        let engine = engine(1);
        assert!(engine.subspace_decomposition(&CMatrix::identity(3)).is_err());
    }
}
