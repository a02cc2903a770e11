//! # CSSM Broadband DoA Library
//!
//! Direction-of-arrival estimation for broadband sources using the Coherent
//! Signal-Subspace Method. Per-bin covariances from an STFT snapshot tensor
//! are focused onto a single reference frequency and combined, so one
//! narrowband subspace scan resolves the sources across the whole band.
//!
//! ## Overview
//!
//! - **Manifold**: far/near-field steering vectors over a direction grid
//! - **MUSIC engine**: covariance estimation, spatial spectrum, peak search,
//!   Hermitian signal/noise split (the [`SubspaceBase`] implementation)
//! - **Focusing**: per-bin transforms `T_j` and the coherent sum `R`
//! - **CSSM controller**: seeding, reference-bin choice, iterative refinement
//! - **Config / logging**: YAML configuration and `tracing` setup
//!
//! ## Processing Flow
//!
//! ```text
//! X[m,k,s] → Ĉ_k per bin → Bartlett seed β_k → reference bin f0
//!          → R = Σ T_k Ĉ_k T_k^H → En·En^H → P(θ) at f0 → peaks → β (repeat)
//! ```
//!
//! ## Example
//!
//! ```rust
//! use cssm_core::{Cssm, CssmConfig, Snapshots, SubspaceBase};
//!
//! let config = CssmConfig::default();
//! let cssm = Cssm::from_config(&config).unwrap();
//!
//! // Snapshot tensor covering every STFT bin (nfft/2 + 1)
//! let snapshots = Snapshots::from_fn(4, config.nfft / 2 + 1, 8, |m, k, s| {
//!     let a = cssm.base().mode_vector(k, 45)[m];
//!     a * num_complex::Complex64::from_polar(1.0, 0.3 * s as f64)
//! });
//!
//! let estimate = cssm.locate(&snapshots).unwrap();
//! assert!(estimate.iterations >= config.num_iter);
//! ```

pub mod config;
pub mod cssm;
pub mod eigen;
pub mod focusing;
pub mod logging;
pub mod manifold;
pub mod matrix;
pub mod music;
pub mod snapshot;
pub mod subspace;
pub mod types;

pub use config::{ConfigError, CssmConfig, FrequencySelection, DEFAULT_ITERATIONS, MAX_ITERATIONS};
pub use cssm::{Cssm, CssmEstimate};
pub use manifold::{ArrayGeometry, ArrayManifold, DirectionGrid, FieldMode, Location};
pub use matrix::CMatrix;
pub use music::MusicEngine;
pub use snapshot::Snapshots;
pub use subspace::{Subspace, SubspaceBase};
pub use types::{BinIndex, DirectionIndex, DoaError, DoaResult};
