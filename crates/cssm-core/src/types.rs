//! Core types for direction-of-arrival processing
//!
//! Complex spectral samples, direction/bin index aliases and the error type
//! shared by every stage of the CSSM pipeline.
//!
//! ## Indexing conventions
//!
//! ```text
//!   bin        absolute STFT bin index, 0..=nfft/2
//!   direction  index into the candidate direction grid
//!   sensor     index into the array geometry, 0..M
//! ```

use num_complex::Complex64;

/// Absolute frequency-bin index.
pub type BinIndex = usize;

/// Index into the candidate direction grid.
pub type DirectionIndex = usize;

/// Result type for DOA operations
pub type DoaResult<T> = Result<T, DoaError>;

/// Errors that can occur while estimating directions of arrival
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DoaError {
    #[error("No active frequency bins supplied")]
    EmptyFrequencySet,

    #[error("Focusing transform for bin {bin} is singular (directions {directions:?})")]
    SingularTransform {
        bin: BinIndex,
        directions: Vec<DirectionIndex>,
    },

    #[error("Shape mismatch: {0}")]
    ShapeMismatch(String),

    #[error("Frequency bin {bin} out of range (max {max})")]
    BinOutOfRange { bin: BinIndex, max: BinIndex },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = DoaError::SingularTransform {
            bin: 12,
            directions: vec![7, 7],
        };
        assert_eq!(
            err.to_string(),
            "Focusing transform for bin 12 is singular (directions [7, 7])"
        );
        assert_eq!(
            DoaError::BinOutOfRange { bin: 300, max: 128 }.to_string(),
            "Frequency bin 300 out of range (max 128)"
        );
    }
}
