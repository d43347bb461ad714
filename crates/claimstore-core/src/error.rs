//! # Error Types
//!
//! Precondition violations raised by the claim model. Every variant is
//! returned by the call that introduces the bad value (construction or
//! mutation). Nothing is deferred to a later read.

use thiserror::Error;

/// A rejected argument to a claim or resource constructor or mutator.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClaimError {
    /// Claim offsets are byte positions and cannot be negative.
    #[error("claim offset must be non-negative, got {0}")]
    NegativeOffset(i64),

    /// Lengths are either the `-1` sentinel or a non-negative byte count.
    #[error("claim length must be -1 (unknown) or non-negative, got {0}")]
    InvalidLength(i64),

    /// A resource-less claim is only valid as the empty placeholder.
    #[error("claim without a backing resource must be the empty placeholder (offset {offset}, length {length})")]
    MissingResource {
        /// Offset carried by the rejected claim.
        offset: i64,
        /// Length carried by the rejected claim.
        length: i64,
    },

    /// A resource identity component was empty.
    #[error("resource claim {field} must not be empty")]
    EmptyResourceField {
        /// Name of the empty identity component.
        field: &'static str,
    },
}
