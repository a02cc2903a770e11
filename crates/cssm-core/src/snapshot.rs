//! Frequency-domain array snapshots.
//!
//! A `Snapshots` tensor holds one STFT frame per sensor, per bin, per time
//! frame (`X[sensor, bin, frame]`). Bins are absolute STFT indices
//! (0..=nfft/2) so the same tensor can be reused with different active
//! frequency sets.

use crate::types::{BinIndex, DoaError, DoaResult};
use num_complex::Complex64;

/// Sensor × bin × frame tensor of complex spectral samples.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshots {
    sensors: usize,
    bins: usize,
    frames: usize,
    data: Vec<Complex64>,
}

impl Snapshots {
    /// Zero-filled tensor.
    pub fn zeros(sensors: usize, bins: usize, frames: usize) -> Self {
        Self {
            sensors,
            bins,
            frames,
            data: vec![Complex64::new(0.0, 0.0); sensors * bins * frames],
        }
    }

    /// Build from existing data laid out as `[sensor][bin][frame]`.
    pub fn from_data(
        sensors: usize,
        bins: usize,
        frames: usize,
        data: Vec<Complex64>,
    ) -> DoaResult<Self> {
        if data.len() != sensors * bins * frames {
            return Err(DoaError::ShapeMismatch(format!(
                "snapshot data length {} != {}x{}x{}",
                data.len(),
                sensors,
                bins,
                frames
            )));
        }
        Ok(Self {
            sensors,
            bins,
            frames,
            data,
        })
    }

    /// Build by evaluating `f(sensor, bin, frame)` for every element.
    pub fn from_fn<F>(sensors: usize, bins: usize, frames: usize, mut f: F) -> Self
    where
        F: FnMut(usize, BinIndex, usize) -> Complex64,
    {
        let mut data = Vec::with_capacity(sensors * bins * frames);
        for m in 0..sensors {
            for k in 0..bins {
                for s in 0..frames {
                    data.push(f(m, k, s));
                }
            }
        }
        Self {
            sensors,
            bins,
            frames,
            data,
        }
    }

    #[inline]
    pub fn sensors(&self) -> usize {
        self.sensors
    }

    #[inline]
    pub fn bins(&self) -> usize {
        self.bins
    }

    #[inline]
    pub fn frames(&self) -> usize {
        self.frames
    }

    #[inline]
    pub fn get(&self, sensor: usize, bin: BinIndex, frame: usize) -> Complex64 {
        self.data[(sensor * self.bins + bin) * self.frames + frame]
    }

    #[inline]
    pub fn set(&mut self, sensor: usize, bin: BinIndex, frame: usize, val: Complex64) {
        self.data[(sensor * self.bins + bin) * self.frames + frame] = val;
    }

    /// Array snapshot (one value per sensor) for `bin` at `frame`.
    pub fn snapshot(&self, bin: BinIndex, frame: usize) -> Vec<Complex64> {
        (0..self.sensors).map(|m| self.get(m, bin, frame)).collect()
    }

    /// Sum of magnitudes over all sensors and frames of one bin.
    pub fn bin_magnitude(&self, bin: BinIndex) -> f64 {
        let mut total = 0.0;
        for m in 0..self.sensors {
            for s in 0..self.frames {
                total += self.get(m, bin, s).norm();
            }
        }
        total
    }

    /// Check that the tensor matches an `sensors`-element array and covers
    /// every bin in `bins`.
    pub fn check_shape(&self, sensors: usize, bins: &[BinIndex]) -> DoaResult<()> {
        if self.sensors != sensors {
            return Err(DoaError::ShapeMismatch(format!(
                "snapshots have {} sensors, array has {}",
                self.sensors, sensors
            )));
        }
        if self.frames == 0 {
            return Err(DoaError::ShapeMismatch("snapshots contain no frames".into()));
        }
        if let Some(&bin) = bins.iter().find(|&&b| b >= self.bins) {
            return Err(DoaError::BinOutOfRange {
                bin,
                max: self.bins.saturating_sub(1),
            });
        }
        Ok(())
    }
}
