//! # claimstore-core — Content Claim Model
//!
//! This crate defines the claim model of the claimstore content repository.
//! Many logical records ("flow files") share a small number of large backing
//! resources; each record points at its bytes through a [`ContentClaim`], a
//! byte range `(offset, length)` inside one [`ResourceClaim`].
//!
//! ## Key Design Principles
//!
//! 1. **Resources are identity handles.** A [`ResourceClaim`] carries its
//!    `(container, section, id)` identity behind an `Arc`. Cloning it never
//!    takes ownership of the physical resource or its claimant count; the
//!    repository's resource claim manager is the sole owner of that state.
//!
//! 2. **Claims are shared, fields are atomic.** A [`ContentClaim`] is shared
//!    between records through `Arc<ContentClaim>`. Offset and length are
//!    independently atomic. There is no lock across the pair, so a reader may
//!    observe a new offset together with an old length.
//!
//! 3. **Ordering is by location, equality is by value.** Claims order by
//!    resource, then offset. Length takes part in equality but not in
//!    ordering. Since `Ord` must agree with `Eq`, location ordering lives in
//!    [`ContentClaim::compare_location`] and the [`ByLocation`] wrapper.
//!
//! 4. **Hashes track the current value.** `Hash` is recomputed from the
//!    current fields on every call. Index structures that outlive mutation key
//!    on immutable [`ClaimSnapshot`] values instead of the live claim.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `claimstore-*` crates.
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.
//! - No I/O. Byte access is the I/O layer's job, using
//!   `resource()` + `offset()` + `length()` as coordinates.

pub mod claim;
pub mod error;
pub mod resource;
pub mod snapshot;

// Re-export primary types for ergonomic imports.
pub use claim::{ByLocation, ContentClaim, UNKNOWN_LENGTH};
pub use error::ClaimError;
pub use resource::{BackingResource, ResourceClaim, ResourceIdentity};
pub use snapshot::ClaimSnapshot;
