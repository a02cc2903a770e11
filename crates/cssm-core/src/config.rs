//! # Configuration System
//!
//! YAML configuration for the CSSM estimator:
//!
//! - Array geometry (sensor positions in metres)
//! - STFT framing (sample rate, FFT length) and speed of sound
//! - Direction search grid and propagation model
//! - Active frequency selection
//! - Number of sources and refinement iterations
//! - Logging
//!
//! ## Configuration Search Path
//!
//! Configuration is loaded from the first file found:
//! 1. Path specified via `CSSM_CONFIG` environment variable
//! 2. `./cssm.yaml` (current directory)
//! 3. `~/.config/cssm/config.yaml` (user config)
//! 4. `/etc/cssm/config.yaml` (system config)
//!
//! ## Example Configuration
//!
//! ```yaml
//! array:
//!   positions: [[0.0, 0.0, 0.0], [0.05, 0.0, 0.0], [0.1, 0.0, 0.0], [0.15, 0.0, 0.0]]
//! sample_rate: 16000.0
//! nfft: 256
//! num_sources: 2
//! num_iter: 5
//! grid:
//!   azimuth: { start_deg: 0.0, stop_deg: 175.0, num: 36 }
//! frequencies:
//!   kind: range
//!   low_hz: 500.0
//!   high_hz: 4000.0
//! ```

use crate::logging::LogConfig;
use crate::manifold::{linspace, ArrayGeometry, DirectionGrid, FieldMode};
use crate::types::BinIndex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default number of CSSM refinement iterations.
pub const DEFAULT_ITERATIONS: usize = 5;

/// Hard ceiling on CSSM refinement iterations.
pub const MAX_ITERATIONS: usize = 20;

/// Error type for configuration operations.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("config not found: {0}")]
    NotFound(String),
    #[error("failed to read config: {0}")]
    ReadError(String),
    #[error("failed to parse config: {0}")]
    ParseError(String),
    #[error("invalid config: {0}")]
    ValidationError(String),
}

/// Sensor layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArrayConfig {
    /// Sensor positions `[x, y, z]` in metres
    pub positions: Vec<[f64; 3]>,
}

impl Default for ArrayConfig {
    fn default() -> Self {
        // 4-element linear array, 5 cm pitch
        Self {
            positions: (0..4).map(|i| [0.05 * i as f64, 0.0, 0.0]).collect(),
        }
    }
}

impl ArrayConfig {
    pub fn geometry(&self) -> ArrayGeometry {
        ArrayGeometry::new(self.positions.clone())
    }
}

/// Evenly spaced angular axis, endpoints inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AxisConfig {
    pub start_deg: f64,
    pub stop_deg: f64,
    pub num: usize,
}

impl AxisConfig {
    pub fn radians(&self) -> Vec<f64> {
        linspace(self.start_deg, self.stop_deg, self.num)
            .into_iter()
            .map(f64::to_radians)
            .collect()
    }
}

/// Candidate direction grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridConfig {
    pub azimuth: AxisConfig,
    pub colatitude: AxisConfig,
    /// Candidate ranges in metres (near field only)
    pub ranges: Vec<f64>,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            azimuth: AxisConfig {
                start_deg: 0.0,
                stop_deg: 359.0,
                num: 360,
            },
            colatitude: AxisConfig {
                start_deg: 90.0,
                stop_deg: 90.0,
                num: 1,
            },
            ranges: vec![1.0],
        }
    }
}

impl GridConfig {
    pub fn direction_grid(&self) -> DirectionGrid {
        DirectionGrid::new(
            &self.azimuth.radians(),
            &self.colatitude.radians(),
            &self.ranges,
        )
    }

    pub fn len(&self) -> usize {
        self.azimuth.num * self.colatitude.num * self.ranges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Which STFT bins take part in the estimate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FrequencySelection {
    /// Every bin in `[low_hz, high_hz)`
    Range { low_hz: f64, high_hz: f64 },
    /// Explicit bin indices
    Bins { bins: Vec<BinIndex> },
    /// Explicit frequencies, each rounded to the nearest bin
    Hz { hz: Vec<f64> },
}

impl Default for FrequencySelection {
    fn default() -> Self {
        FrequencySelection::Range {
            low_hz: 500.0,
            high_hz: 4000.0,
        }
    }
}

impl FrequencySelection {
    /// Resolve to absolute bin indices for the given STFT framing.
    pub fn resolve(&self, sample_rate: f64, nfft: usize) -> Result<Vec<BinIndex>, ConfigError> {
        let max_bin = nfft / 2;
        let to_bin = |hz: f64| -> Result<BinIndex, ConfigError> {
            let bin = (hz / sample_rate * nfft as f64).round();
            if !(0.0..=max_bin as f64).contains(&bin) {
                return Err(ConfigError::ValidationError(format!(
                    "{} Hz maps outside bins 0..={}",
                    hz, max_bin
                )));
            }
            Ok(bin as BinIndex)
        };

        let bins = match self {
            FrequencySelection::Range { low_hz, high_hz } => {
                let lo = to_bin(*low_hz)?;
                let hi = to_bin(*high_hz)?;
                (lo..hi).collect()
            }
            FrequencySelection::Bins { bins } => {
                if let Some(&b) = bins.iter().find(|&&b| b > max_bin) {
                    return Err(ConfigError::ValidationError(format!(
                        "bin {} outside 0..={}",
                        b, max_bin
                    )));
                }
                bins.clone()
            }
            FrequencySelection::Hz { hz } => hz.iter().map(|&f| to_bin(f)).collect::<Result<_, _>>()?,
        };
        Ok(bins)
    }
}

/// Top-level CSSM configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CssmConfig {
    pub array: ArrayConfig,
    /// Sample rate in Hz
    pub sample_rate: f64,
    /// STFT length
    pub nfft: usize,
    /// Propagation speed in m/s
    pub speed_of_sound: f64,
    pub num_sources: usize,
    pub mode: FieldMode,
    pub grid: GridConfig,
    pub frequencies: FrequencySelection,
    /// Minimum number of focusing iterations
    pub num_iter: usize,
    pub logging: LogConfig,
}

impl Default for CssmConfig {
    fn default() -> Self {
        Self {
            array: ArrayConfig::default(),
            sample_rate: 16_000.0,
            nfft: 256,
            speed_of_sound: 343.0,
            num_sources: 1,
            mode: FieldMode::Far,
            grid: GridConfig::default(),
            frequencies: FrequencySelection::default(),
            num_iter: DEFAULT_ITERATIONS,
            logging: LogConfig::default(),
        }
    }
}

impl CssmConfig {
    /// Load configuration from the default search path.
    ///
    /// Returns default config if no file is found.
    pub fn load() -> Result<Self, ConfigError> {
        if let Ok(path) = std::env::var("CSSM_CONFIG") {
            let path = PathBuf::from(path);
            if path.exists() {
                return Self::load_from(&path);
            }
            return Err(ConfigError::NotFound(path.display().to_string()));
        }

        for path in Self::config_search_paths() {
            if path.exists() {
                return Self::load_from(&path);
            }
        }

        Ok(Self::default())
    }

    /// Load configuration from a specific file.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::ReadError(format!("{}: {}", path.display(), e)))?;

        Self::parse(&content)
    }

    /// Parse configuration from a YAML string.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        serde_yaml::from_str(yaml).map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    /// Save configuration to a file.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let content =
            serde_yaml::to_string(self).map_err(|e| ConfigError::ParseError(e.to_string()))?;

        std::fs::write(path, content)
            .map_err(|e| ConfigError::ReadError(format!("{}: {}", path.display(), e)))
    }

    /// Get configuration search paths.
    pub fn config_search_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from("./cssm.yaml")];

        if let Some(dirs) = directories::ProjectDirs::from("", "", "cssm") {
            paths.push(dirs.config_dir().join("config.yaml"));
        }

        paths.push(PathBuf::from("/etc/cssm/config.yaml"));
        paths
    }

    /// Centre frequency of every STFT bin, 0..=nfft/2.
    pub fn bin_frequencies(&self) -> Vec<f64> {
        (0..=self.nfft / 2)
            .map(|k| k as f64 * self.sample_rate / self.nfft as f64)
            .collect()
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let m = self.array.positions.len();
        if m < 2 {
            return Err(ConfigError::ValidationError(
                "array needs at least 2 sensors".to_string(),
            ));
        }
        if self.num_sources == 0 || self.num_sources >= m {
            return Err(ConfigError::ValidationError(format!(
                "num_sources must be in 1..{}",
                m
            )));
        }
        if !(1..=MAX_ITERATIONS).contains(&self.num_iter) {
            return Err(ConfigError::ValidationError(format!(
                "num_iter must be in 1..={}",
                MAX_ITERATIONS
            )));
        }
        if !(self.sample_rate > 0.0) || !(self.speed_of_sound > 0.0) {
            return Err(ConfigError::ValidationError(
                "sample_rate and speed_of_sound must be positive".to_string(),
            ));
        }
        if self.nfft < 2 {
            return Err(ConfigError::ValidationError("nfft must be >= 2".to_string()));
        }
        if self.grid.is_empty() {
            return Err(ConfigError::ValidationError(
                "direction grid is empty".to_string(),
            ));
        }
        self.frequencies.resolve(self.sample_rate, self.nfft)?;
        Ok(())
    }
}
