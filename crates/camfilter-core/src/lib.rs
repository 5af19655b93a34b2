#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]

/// Distance to true neighbors and anomaly classification.
pub mod classifier;

/// Ordered pose collections of reconstructions and passages.
pub mod collection;

/// Neighbor distances and their statistics.
pub mod distance;

/// Error types for the camera filter.
pub mod error;

/// Synthetic perturbation and scoring of the filter.
pub mod evaluate;

/// End-to-end filter pipeline.
pub mod filter;

/// Image identifiers and identifier-keyed maps.
pub mod id;

/// Normal confidence intervals.
pub mod interval;

/// Nearest-neighbor search over pose collections.
pub mod neighbors;

/// Conversions between COLMAP poses and world coordinates.
pub mod transforms;

pub use error::FilterError;
pub use filter::{run_filter, FilterConfig, FilterOutcome};
