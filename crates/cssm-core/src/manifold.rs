//! Array geometry, candidate direction grid and steering dictionary.
//!
//! The array manifold holds one steering (mode) vector per
//! (frequency bin, candidate direction) pair:
//!
//! ```text
//!   far field:   a_m(f, u) = exp(+j·2π·f/c · <p_m, u>)
//!   near field:  a_m(f, x) = exp(-j·2π·f/c · |x - p_m|)
//! ```
//!
//! where `p_m` is the position of sensor `m`, `u` the unit look direction
//! and `x = r·u` the candidate source position. Both conventions agree up to
//! a common phase in the far-field limit.
//!
//! ## Example
//!
//! ```rust
//! use cssm_core::manifold::{ArrayGeometry, ArrayManifold, DirectionGrid, FieldMode};
//!
//! let geometry = ArrayGeometry::linear(4, 0.05);
//! let grid = DirectionGrid::azimuth_deg(0.0, 175.0, 36);
//! let freqs: Vec<f64> = (0..=128).map(|k| k as f64 * 16_000.0 / 256.0).collect();
//! let manifold = ArrayManifold::build(&geometry, &grid, &freqs, 343.0, FieldMode::Far);
//! assert_eq!(manifold.sensors(), 4);
//! assert_eq!(manifold.mode_vector(20, 7).len(), 4);
//! ```

use crate::types::{BinIndex, DirectionIndex};
use num_complex::Complex64;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Far-field (plane wave) or near-field (spherical wave) propagation model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldMode {
    #[default]
    Far,
    Near,
}

/// Sensor positions in metres.
#[derive(Debug, Clone, PartialEq)]
pub struct ArrayGeometry {
    positions: Vec<[f64; 3]>,
}

impl ArrayGeometry {
    pub fn new(positions: Vec<[f64; 3]>) -> Self {
        Self { positions }
    }

    /// Uniform linear array along the x-axis, first sensor at the origin.
    pub fn linear(num_sensors: usize, spacing_m: f64) -> Self {
        Self {
            positions: (0..num_sensors)
                .map(|i| [i as f64 * spacing_m, 0.0, 0.0])
                .collect(),
        }
    }

    /// Uniform circular array in the x-y plane centred at the origin.
    pub fn circular(num_sensors: usize, radius_m: f64) -> Self {
        Self {
            positions: (0..num_sensors)
                .map(|i| {
                    let a = 2.0 * PI * i as f64 / num_sensors as f64;
                    [radius_m * a.cos(), radius_m * a.sin(), 0.0]
                })
                .collect(),
        }
    }

    pub fn num_sensors(&self) -> usize {
        self.positions.len()
    }

    pub fn positions(&self) -> &[[f64; 3]] {
        &self.positions
    }
}

/// One candidate source location.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Location {
    /// Azimuth in radians, measured from the x-axis.
    pub azimuth: f64,
    /// Colatitude in radians, measured from the z-axis (π/2 = x-y plane).
    pub colatitude: f64,
    /// Distance from the origin in metres (near field only).
    pub range: f64,
}

impl Location {
    pub fn azimuth_deg(&self) -> f64 {
        self.azimuth.to_degrees()
    }

    pub fn colatitude_deg(&self) -> f64 {
        self.colatitude.to_degrees()
    }

    /// Unit look direction.
    pub fn unit_vector(&self) -> [f64; 3] {
        let (sp, cp) = self.colatitude.sin_cos();
        let (st, ct) = self.azimuth.sin_cos();
        [sp * ct, sp * st, cp]
    }
}

/// Candidate direction grid searched by the spectrum engine.
#[derive(Debug, Clone, PartialEq)]
pub struct DirectionGrid {
    locations: Vec<Location>,
}

impl DirectionGrid {
    /// Cartesian product of ranges × colatitudes × azimuths (radians);
    /// azimuth varies fastest.
    pub fn new(azimuths: &[f64], colatitudes: &[f64], ranges: &[f64]) -> Self {
        let mut locations = Vec::with_capacity(azimuths.len() * colatitudes.len() * ranges.len());
        for &range in ranges {
            for &colatitude in colatitudes {
                for &azimuth in azimuths {
                    locations.push(Location {
                        azimuth,
                        colatitude,
                        range,
                    });
                }
            }
        }
        Self { locations }
    }

    /// Azimuth-only grid in the x-y plane, `num` points from `start` to
    /// `stop` degrees inclusive.
    pub fn azimuth_deg(start: f64, stop: f64, num: usize) -> Self {
        let az: Vec<f64> = linspace(start, stop, num)
            .into_iter()
            .map(f64::to_radians)
            .collect();
        Self::new(&az, &[PI / 2.0], &[1.0])
    }

    pub fn len(&self) -> usize {
        self.locations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locations.is_empty()
    }

    pub fn location(&self, idx: DirectionIndex) -> Option<&Location> {
        self.locations.get(idx)
    }

    pub fn locations(&self) -> &[Location] {
        &self.locations
    }
}

/// `num` evenly spaced values from `start` to `stop` inclusive.
pub fn linspace(start: f64, stop: f64, num: usize) -> Vec<f64> {
    match num {
        0 => vec![],
        1 => vec![start],
        _ => {
            let step = (stop - start) / (num - 1) as f64;
            (0..num).map(|i| start + step * i as f64).collect()
        }
    }
}

/// Steering-vector dictionary indexed by (bin, direction).
#[derive(Debug, Clone, PartialEq)]
pub struct ArrayManifold {
    sensors: usize,
    bins: usize,
    directions: usize,
    // [bin][direction][sensor]
    data: Vec<Complex64>,
}

impl ArrayManifold {
    /// Build steering vectors for every bin frequency in `freqs_hz`.
    pub fn build(
        geometry: &ArrayGeometry,
        grid: &DirectionGrid,
        freqs_hz: &[f64],
        speed_of_sound: f64,
        mode: FieldMode,
    ) -> Self {
        let positions = geometry.positions();
        Self::from_fn(
            geometry.num_sensors(),
            freqs_hz.len(),
            grid.len(),
            |m, k, n| {
                let wavenumber = 2.0 * PI * freqs_hz[k] / speed_of_sound;
                let loc = &grid.locations[n];
                let u = loc.unit_vector();
                let p = positions[m];
                let phase = match mode {
                    FieldMode::Far => wavenumber * (p[0] * u[0] + p[1] * u[1] + p[2] * u[2]),
                    FieldMode::Near => {
                        let d = (0..3)
                            .map(|i| (loc.range * u[i] - p[i]).powi(2))
                            .sum::<f64>()
                            .sqrt();
                        -wavenumber * d
                    }
                };
                Complex64::from_polar(1.0, phase)
            },
        )
    }

    /// Build a dictionary from `f(sensor, bin, direction)`.
    pub fn from_fn<F>(sensors: usize, bins: usize, directions: usize, mut f: F) -> Self
    where
        F: FnMut(usize, BinIndex, DirectionIndex) -> Complex64,
    {
        let mut data = Vec::with_capacity(sensors * bins * directions);
        for k in 0..bins {
            for n in 0..directions {
                for m in 0..sensors {
                    data.push(f(m, k, n));
                }
            }
        }
        Self {
            sensors,
            bins,
            directions,
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
    pub fn directions(&self) -> usize {
        self.directions
    }

    /// Steering vector at `bin` for candidate `direction`.
    ///
    /// # Panics
    /// Panics if `bin` or `direction` is out of range.
    #[inline]
    pub fn mode_vector(&self, bin: BinIndex, direction: DirectionIndex) -> &[Complex64] {
        assert!(bin < self.bins && direction < self.directions);
        let start = (bin * self.directions + direction) * self.sensors;
        &self.data[start..start + self.sensors]
    }
}
