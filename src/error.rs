//! Error types for cache operations.

use thiserror::Error;

/// Errors that can occur during cache operations.
///
/// The taxonomy is deliberately minimal: only [`Cache::set`] surfaces a
/// typed error, because it is the one operation whose failure must be
/// distinguishable from "the key is simply not there". Every other
/// operation signals failure through its return shape.
///
/// [`Cache::set`]: crate::Cache::set
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum CacheError {
    /// The ambient context was cancelled before the operation mutated the
    /// cache. The cache is unchanged.
    #[error("operation cancelled before completion")]
    Cancelled,
}

/// A specialized `Result` type for cache operations.
pub type Result<T> = std::result::Result<T, CacheError>;
