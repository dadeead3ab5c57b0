//! Error Types
//!
//! This module defines the recoverable error surface of the crate. Invariant
//! violations (cycles, nil children, disposed-node misuse — §7) are NOT
//! represented here; they panic via [`crate::invariant::fatal`].

use thiserror::Error;

/// The error type for fallible, non-fatal operations.
#[derive(Error, Debug)]
pub enum Retained2dError {
    /// A named atlas lookup found no matching region.
    #[error("atlas region not found: {0}")]
    RegionNotFound(String),
}

/// Alias for `Result<T, Retained2dError>`.
pub type Result<T> = std::result::Result<T, Retained2dError>;
