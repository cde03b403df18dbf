//! Errors surfaced across the VP8 core decoding boundary.

use thiserror::Error;

/// The only error type this crate returns to callers.
///
/// Anything not representable here (an allocator refusing an unrelated
/// allocation, a caller bug) is not this crate's concern; the boolean
/// decoder itself never errors (reads past the end of a partition yield
/// zero bits, per RFC 6386).
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("unsupported VP8 profile/version: {0}")]
    UnsupportedProfile(u8),

    #[error("invalid frame header: {0}")]
    InvalidHeader(&'static str),

    #[error("control partition truncated: need {needed} bytes, have {available}")]
    TruncatedBitstream { needed: usize, available: usize },

    #[error("out of memory allocating {0}")]
    OutOfMemory(&'static str),

    #[error("internal invariant violated: {0}")]
    InternalInvariantViolated(&'static str),
}

pub type Result<T> = std::result::Result<T, DecodeError>;
