//! Error types for image buffers and resampling operations.

use thiserror::Error;

/// Errors reported by buffer preparation and the resampling operations.
///
/// Every failing operation also records a human-readable copy of the message
/// on the destination buffer (see `ImageBuf::geterror`), so callers holding
/// only the buffer still see what went wrong.
#[derive(Debug, Error)]
pub enum Error {
    /// The requested filter name is not in the catalog.
    #[error("filter \"{0}\" not recognized")]
    UnknownFilter(String),

    /// The operation does not support this image geometry (volumes, deep
    /// images where they are not allowed).
    #[error("unsupported geometry: {0}")]
    UnsupportedGeometry(String),

    /// Destination and source do not satisfy the operation's contract after
    /// preparation.
    #[error("incompatible images: {0}")]
    IncompatibleSpec(String),

    /// An error propagated from a source or destination buffer.
    #[error("{0}")]
    Buffer(String),
}

/// Result alias for image operations.
pub type Result<T> = std::result::Result<T, Error>;
