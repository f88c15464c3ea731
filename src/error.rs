//! Error types for the strip cutter.

use thiserror::Error;

/// Result type alias for kit construction and solving.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while building a kit or solving it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// No details were given.
    #[error("detail kit is empty")]
    EmptyKit,

    /// A detail has a zero side.
    #[error("invalid detail {width}x{height}: dimensions must be non-zero")]
    InvalidDimensions { width: u32, height: u32 },

    /// The kit has too many distinct sub-multisets to enumerate.
    #[error("detail kit too large: {rows} sub-multisets exceed the limit of {limit}")]
    KitTooLarge { rows: u64, limit: u64 },

    /// The strip width is zero.
    #[error("strip width must be non-zero")]
    InvalidWidth,

    /// The configured time limit elapsed before the search finished.
    #[error("search exceeded time limit of {0}ms")]
    Timeout(u64),
}
