//! Error types for the adaptive codec.

use thiserror::Error;

/// Error variants for encode and decode operations.
#[derive(Debug, Error)]
pub enum Error {
    /// The bit source ran out of input in the middle of a code word.
    #[error("bit stream exhausted")]
    Exhausted,

    /// The literal sub-coder could not recover a symbol after an escape.
    ///
    /// The tree is left as it was before the escape; no insertion has
    /// taken place.
    #[error("malformed literal: {0}")]
    Literal(&'static str),

    /// A decoded symbol belongs to the other coding domain than the one
    /// the caller asked for. Streams are homogeneous per call site, so
    /// seeing this means encoder and decoder disagree on the variant.
    #[error("decoded symbol does not match the requested domain")]
    DomainMismatch,

    /// An internal consistency check failed. The engine refuses all
    /// further operations once this has been reported.
    #[error("code tree invariant violated: {0}")]
    Invariant(String),

    /// An I/O error occurred in the underlying byte stream.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// A specialized Result type for codec operations.
pub type Result<T> = std::result::Result<T, Error>;
