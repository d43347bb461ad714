//! # Repository Error Types
//!
//! Errors raised by the repository collaborators. Claim precondition
//! violations from `claimstore-core` are wrapped rather than re-described.

use claimstore_core::{ClaimError, ResourceClaim};
use thiserror::Error;

/// Top-level error type for repository operations.
#[derive(Error, Debug)]
pub enum RepoError {
    /// A claim or resource argument was rejected.
    #[error("claim error: {0}")]
    Claim(#[from] ClaimError),

    /// The resource is still referenced or being written.
    #[error("{resource} is still in use ({claimants} claimants, writable: {writable})")]
    ResourceInUse {
        /// The resource that was asked to be destroyed.
        resource: ResourceClaim,
        /// Claimant count at the time of the request.
        claimants: u64,
        /// Whether a writer still holds the resource open.
        writable: bool,
    },

    /// The claim is not awaiting completion by this allocator.
    #[error("claim {0} is not open for writing")]
    NotWriting(String),

    /// The claim has no backing resource to operate on.
    #[error("operation requires a claim with a backing resource")]
    Placeholder,

    /// Repository configuration is invalid.
    #[error("configuration error: {0}")]
    Config(String),

    /// Configuration could not be parsed.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_yaml::Error),

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
