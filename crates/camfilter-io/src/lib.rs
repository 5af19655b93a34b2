#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]

/// COLMAP text model reader and writer.
pub mod colmap;

/// Error types for the io module.
pub mod error;

/// Passage description reader.
pub mod passage;

/// Writing filter results back to disk.
pub mod sink;

pub use error::IoError;
