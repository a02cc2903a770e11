//! Coherent Signal Subspace Method (CSSM) for broadband DoA estimation.
//!
//! Each active bin is first scanned on its own (Bartlett power) to seed a
//! per-bin direction set `β_j`. The controller then picks the strongest bin
//! as reference, focuses every bin's covariance onto it with
//! [`coherent_sum`], and runs one narrowband subspace scan on the combined
//! matrix. The peaks found are broadcast back as the new `β` for every bin
//! and the loop repeats.
//!
//! The loop always runs `num_iter` passes. While fewer than `num_sources`
//! peaks have been found it keeps going, up to [`MAX_ITERATIONS`] passes in
//! total.
//!
//! ```rust
//! use cssm_core::config::CssmConfig;
//! use cssm_core::cssm::Cssm;
//!
//! let cssm = Cssm::from_config(&CssmConfig::default()).unwrap();
//! assert_eq!(cssm.num_iter(), 5);
//! ```

use crate::config::{CssmConfig, MAX_ITERATIONS};
use crate::focusing::coherent_sum;
use crate::matrix::CMatrix;
use crate::music::MusicEngine;
use crate::snapshot::Snapshots;
use crate::subspace::SubspaceBase;
use crate::types::{BinIndex, DirectionIndex, DoaError, DoaResult};
use serde::Serialize;
use tracing::{debug, info, warn};

/// Per-bin direction sets produced by the independent narrowband scans.
#[derive(Debug, Clone, PartialEq)]
pub struct Seed {
    /// `β_j` for each active bin, in `freq_bins()` order.
    pub beta: Vec<Vec<DirectionIndex>>,
    /// Bins whose scan found all `num_sources` peaks.
    pub desired_bins: Vec<BinIndex>,
    /// Bins whose scan found fewer peaks than `num_sources`.
    pub invalid_bins: Vec<BinIndex>,
}

/// Result of one [`Cssm::locate`] call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CssmEstimate {
    /// Final peak directions, strongest first. May be shorter than
    /// `num_sources` if the iteration ceiling was reached.
    pub src_idx: Vec<DirectionIndex>,
    /// Last spatial spectrum, evaluated at the reference bin.
    pub spectrum: Vec<f64>,
    /// Reference (focusing) bin.
    pub reference_bin: BinIndex,
    /// Number of focusing passes performed.
    pub iterations: usize,
    /// Peak set found by each pass.
    pub history: Vec<Vec<DirectionIndex>>,
    /// Bins whose seed scan found all `num_sources` peaks.
    pub desired_bins: Vec<BinIndex>,
    /// Bins whose seed scan found fewer peaks than `num_sources`.
    pub invalid_bins: Vec<BinIndex>,
    /// `src_idx` holds `num_sources` directions.
    pub resolved: bool,
}

impl CssmEstimate {
    /// Spectrum value at each reported direction.
    pub fn peak_values(&self) -> Vec<f64> {
        self.src_idx
            .iter()
            .filter_map(|&i| self.spectrum.get(i).copied())
            .collect()
    }
}

/// Broadband DoA estimator that focuses a narrowband [`SubspaceBase`].
#[derive(Debug, Clone)]
pub struct Cssm<B> {
    base: B,
    num_iter: usize,
}

impl Cssm<MusicEngine> {
    /// MUSIC-backed estimator built from a configuration.
    pub fn from_config(config: &CssmConfig) -> DoaResult<Self> {
        let engine = MusicEngine::from_config(config)?;
        Cssm::new(engine, config.num_iter)
    }
}

impl<B: SubspaceBase> Cssm<B> {
    /// `num_iter` must be in `1..=MAX_ITERATIONS`.
    pub fn new(base: B, num_iter: usize) -> DoaResult<Self> {
        if num_iter == 0 || num_iter > MAX_ITERATIONS {
            return Err(DoaError::InvalidConfig(format!(
                "num_iter must be in 1..={}, got {}",
                MAX_ITERATIONS, num_iter
            )));
        }
        let m = base.num_sensors();
        let p = base.num_sources();
        if p == 0 || p >= m {
            return Err(DoaError::InvalidConfig(format!(
                "num_sources must be in 1..{} for a {}-sensor array, got {}",
                m, m, p
            )));
        }
        Ok(Self { base, num_iter })
    }

    pub fn base(&self) -> &B {
        &self.base
    }

    pub fn num_iter(&self) -> usize {
        self.num_iter
    }

    /// Estimate source directions from a snapshot tensor.
    pub fn locate(&self, snapshots: &Snapshots) -> DoaResult<CssmEstimate> {
        let bins = self.base.freq_bins();
        if bins.is_empty() {
            return Err(DoaError::EmptyFrequencySet);
        }
        snapshots.check_shape(self.base.num_sensors(), bins)?;

        let covariances = self.base.compute_correlation_matrices(snapshots)?;
        if covariances.len() != bins.len() {
            return Err(DoaError::ShapeMismatch(format!(
                "{} covariances for {} bins",
                covariances.len(),
                bins.len()
            )));
        }

        let seed = self.seed(&covariances);
        let reference_bin = reference_bin(snapshots, bins).ok_or(DoaError::EmptyFrequencySet)?;
        debug!(
            reference_bin,
            desired = seed.desired_bins.len(),
            invalid = seed.invalid_bins.len(),
            "Seeded CSSM"
        );

        self.refine(&covariances, reference_bin, seed)
    }

    /// Independent Bartlett scan of every bin.
    pub fn seed(&self, covariances: &[CMatrix]) -> Seed {
        let num_src = self.base.num_sources();
        let mut seed = Seed {
            beta: Vec::with_capacity(covariances.len()),
            desired_bins: Vec::new(),
            invalid_bins: Vec::new(),
        };

        for (&bin, cov) in self.base.freq_bins().iter().zip(covariances) {
            let power: Vec<f64> = self
                .base
                .compute_spatial_spectrum(cov, bin)
                .into_iter()
                .map(|p| 1.0 / p)
                .collect();
            let mut peaks = self.base.peaks_1d(&power);
            peaks.truncate(num_src);

            if peaks.len() < num_src {
                warn!(bin, found = peaks.len(), expected = num_src, "Bin seed incomplete");
                seed.invalid_bins.push(bin);
            } else {
                seed.desired_bins.push(bin);
            }
            seed.beta.push(peaks);
        }
        seed
    }

    fn refine(
        &self,
        covariances: &[CMatrix],
        reference_bin: BinIndex,
        seed: Seed,
    ) -> DoaResult<CssmEstimate> {
        let num_src = self.base.num_sources();
        let num_bins = covariances.len();
        let mut beta = seed.beta;
        let mut src_idx: Vec<DirectionIndex> = Vec::new();
        let mut spectrum = Vec::new();
        let mut history = Vec::new();
        let mut i = 0;

        while i < self.num_iter || (src_idx.len() < num_src && i < MAX_ITERATIONS) {
            let r = coherent_sum(&self.base, covariances, reference_bin, &beta)?;
            let subspace = self.base.subspace_decomposition(&r.hermitian_part())?;
            spectrum = self
                .base
                .compute_spatial_spectrum(&subspace.noise_projector(), reference_bin);

            src_idx = self.base.peaks_1d(&spectrum);
            src_idx.truncate(num_src);
            beta = vec![src_idx.clone(); num_bins];
            history.push(src_idx.clone());
            i += 1;

            debug!(iteration = i, peaks = ?src_idx, "CSSM pass");
        }

        let resolved = src_idx.len() >= num_src;
        if resolved {
            info!(iterations = i, sources = ?src_idx, reference_bin, "CSSM converged");
        } else {
            warn!(
                iterations = i,
                found = src_idx.len(),
                expected = num_src,
                "CSSM stopped at iteration ceiling"
            );
        }

        Ok(CssmEstimate {
            src_idx,
            spectrum,
            reference_bin,
            iterations: i,
            history,
            desired_bins: seed.desired_bins,
            invalid_bins: seed.invalid_bins,
            resolved,
        })
    }
}

/// Active bin with the largest total magnitude over sensors and frames.
/// Ties go to the first bin in `bins`.
pub fn reference_bin(snapshots: &Snapshots, bins: &[BinIndex]) -> Option<BinIndex> {
    let mut best: Option<(BinIndex, f64)> = None;
    for &bin in bins {
        let energy = snapshots.bin_magnitude(bin);
        if best.map_or(true, |(_, e)| energy > e) {
            best = Some((bin, energy));
        }
    }
    best.map(|(bin, _)| bin)
}
