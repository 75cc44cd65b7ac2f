//! Error kinds reported by structural mutation.
//!
//! Read operations never error: probing an absent id yields a sentinel
//! (`-1`, `None`, `false`) instead, so callers can test membership without
//! error control flow.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, CordError>;

/// Mutation errors. All are detected before any mutation begins, so the
/// structure is unchanged when one is returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CordError {
    /// The anchor id does not name a live entry.
    #[error("anchor id not found")]
    BadAnchor,
    /// The id chosen for a new entry is already present (the root id always
    /// is, so the root can never be re-inserted).
    #[error("id already exists")]
    IdExists,
    /// The payload reported a negative length.
    #[error("length must not be negative")]
    NegativeLength,
}
