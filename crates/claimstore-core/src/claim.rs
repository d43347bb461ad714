//! # Content Claims — Byte Ranges in Shared Resources
//!
//! A [`ContentClaim`] is one record's view of its content: an offset and a
//! length inside a single backing resource. Records that carry the same bytes
//! share one claim through `Arc<ContentClaim>`.
//!
//! ## Lifecycle
//!
//! The repository creates a claim at the resource's current append offset
//! with [`UNKNOWN_LENGTH`]. The writer sets the length once the content is
//! complete. Compaction may later move the offset.
//!
//! ## Concurrency
//!
//! `offset` and `length` are separate `AtomicI64`s accessed with
//! sequentially consistent ordering. Each field read observes the latest
//! write to that field. The pair is not updated atomically: a reader may see
//! a new offset with an old length. Callers needing a consistent pair take a
//! [`snapshot()`](ContentClaim::snapshot) and accept that it may straddle a
//! concurrent update.
//!
//! ## Equality, Hashing and Ordering
//!
//! - `Eq` compares resource identity, offset and length.
//! - `Hash` is recomputed from the current fields on each call. A claim must
//!   not be mutated while it is a key in a hash-based container; key such
//!   containers on [`ClaimSnapshot`] instead.
//! - Location ordering ([`compare_location`](ContentClaim::compare_location),
//!   [`ByLocation`]) compares resource, then offset. **Length is not part of
//!   the ordering**, so two claims at the same location with different
//!   lengths are ordered-equal but not `==`. Compaction relies on exactly this
//!   ordering; do not add length to it.
//! - A claim without a resource (the empty placeholder) orders before every
//!   claim with a resource.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::ops::Deref;
use std::sync::atomic::{AtomicI64, Ordering as AtomicOrdering};
use std::sync::Arc;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::ClaimError;
use crate::resource::{BackingResource, ResourceClaim};
use crate::snapshot::ClaimSnapshot;

/// Length sentinel for a claim whose content is not yet complete.
pub const UNKNOWN_LENGTH: i64 = -1;

/// A mutable, shareable byte range inside one backing resource.
pub struct ContentClaim<R: BackingResource = ResourceClaim> {
    resource: Option<R>,
    offset: AtomicI64,
    length: AtomicI64,
}

impl<R: BackingResource> ContentClaim<R> {
    /// Create a claim at `offset` in `resource` with unknown length.
    ///
    /// # Errors
    ///
    /// Returns [`ClaimError::NegativeOffset`] if `offset < 0`.
    pub fn new(resource: R, offset: i64) -> Result<Self, ClaimError> {
        check_offset(offset)?;
        Ok(Self {
            resource: Some(resource),
            offset: AtomicI64::new(offset),
            length: AtomicI64::new(UNKNOWN_LENGTH),
        })
    }

    /// The empty-content placeholder: no resource, offset 0, length 0.
    pub fn placeholder() -> Self {
        Self {
            resource: None,
            offset: AtomicI64::new(0),
            length: AtomicI64::new(0),
        }
    }

    /// Whether this claim is the resource-less placeholder.
    pub fn is_placeholder(&self) -> bool {
        self.resource.is_none()
    }

    /// Backing resource this claim points into. Borrowed, never transferred.
    pub fn resource(&self) -> Option<&R> {
        self.resource.as_ref()
    }

    pub fn offset(&self) -> i64 {
        self.offset.load(AtomicOrdering::SeqCst)
    }

    /// Move the claim to a new offset within its resource.
    ///
    /// # Errors
    ///
    /// Returns [`ClaimError::NegativeOffset`] if `offset < 0`; the stored
    /// offset is left unchanged.
    pub fn set_offset(&self, offset: i64) -> Result<(), ClaimError> {
        check_offset(offset)?;
        self.offset.store(offset, AtomicOrdering::SeqCst);
        Ok(())
    }

    /// Byte length, or [`UNKNOWN_LENGTH`].
    pub fn length(&self) -> i64 {
        self.length.load(AtomicOrdering::SeqCst)
    }

    /// Set the byte length, or reset it to [`UNKNOWN_LENGTH`].
    ///
    /// # Errors
    ///
    /// Returns [`ClaimError::InvalidLength`] if `length < -1`; the stored
    /// length is left unchanged.
    pub fn set_length(&self, length: i64) -> Result<(), ClaimError> {
        check_length(length)?;
        self.length.store(length, AtomicOrdering::SeqCst);
        Ok(())
    }

    /// Length as an unsigned count, if known.
    pub fn known_length(&self) -> Option<u64> {
        u64::try_from(self.length()).ok()
    }

    pub fn is_length_known(&self) -> bool {
        self.length() >= 0
    }

    /// Exclusive end offset, if the length is known.
    pub fn end_offset(&self) -> Option<i64> {
        self.snapshot().end_offset()
    }

    /// Freeze the current fields into an immutable value.
    pub fn snapshot(&self) -> ClaimSnapshot<R> {
        ClaimSnapshot::from_parts(self.resource.clone(), self.offset(), self.length())
    }

    /// Location ordering: resource order first, then offset ascending.
    ///
    /// Length is excluded, so this returns `Equal` for claims
    /// that are not `==` when they differ only in length.
    pub fn compare_location(&self, other: &Self) -> Ordering {
        self.resource
            .cmp(&other.resource)
            .then_with(|| self.offset().cmp(&other.offset()))
    }

    /// Whether `a` and `b` are the same claim object, not merely equal.
    pub fn same_instance(a: &Self, b: &Self) -> bool {
        std::ptr::eq(a, b)
    }
}

fn check_offset(offset: i64) -> Result<(), ClaimError> {
    if offset < 0 {
        return Err(ClaimError::NegativeOffset(offset));
    }
    Ok(())
}

fn check_length(length: i64) -> Result<(), ClaimError> {
    if length < UNKNOWN_LENGTH {
        return Err(ClaimError::InvalidLength(length));
    }
    Ok(())
}

/// Full field check for a claim value: valid offset and length, and no
/// resource only for the empty placeholder.
pub(crate) fn check_fields(has_resource: bool, offset: i64, length: i64) -> Result<(), ClaimError> {
    check_offset(offset)?;
    check_length(length)?;
    if !has_resource && (offset != 0 || length != 0) {
        return Err(ClaimError::MissingResource { offset, length });
    }
    Ok(())
}

impl<R: BackingResource> Clone for ContentClaim<R> {
    /// Produces an independent claim holding the current field values.
    fn clone(&self) -> Self {
        Self {
            resource: self.resource.clone(),
            offset: AtomicI64::new(self.offset()),
            length: AtomicI64::new(self.length()),
        }
    }
}

impl<R: BackingResource> PartialEq for ContentClaim<R> {
    fn eq(&self, other: &Self) -> bool {
        if Self::same_instance(self, other) {
            return true;
        }
        self.length() == other.length()
            && self.offset() == other.offset()
            && self.resource == other.resource
    }
}

impl<R: BackingResource> Eq for ContentClaim<R> {}

impl<R: BackingResource> PartialEq<ClaimSnapshot<R>> for ContentClaim<R> {
    fn eq(&self, other: &ClaimSnapshot<R>) -> bool {
        self.length() == other.length()
            && self.offset() == other.offset()
            && self.resource.as_ref() == other.resource()
    }
}

impl<R: BackingResource> Hash for ContentClaim<R> {
    /// Field order matches [`ClaimSnapshot`]'s derived hash.
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.resource.hash(state);
        self.offset().hash(state);
        self.length().hash(state);
    }
}

impl<R: BackingResource> fmt::Debug for ContentClaim<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContentClaim")
            .field("resource", &self.resource)
            .field("offset", &self.offset())
            .field("length", &self.length())
            .finish()
    }
}

impl<R: BackingResource + fmt::Display> fmt::Display for ContentClaim<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.resource {
            Some(resource) => write!(f, "{}@{}+{}", resource, self.offset(), self.length()),
            None => f.write_str("placeholder"),
        }
    }
}

impl<R: BackingResource> TryFrom<ClaimSnapshot<R>> for ContentClaim<R> {
    type Error = ClaimError;

    fn try_from(snapshot: ClaimSnapshot<R>) -> Result<Self, Self::Error> {
        let offset = snapshot.offset();
        let length = snapshot.length();
        let resource = snapshot.resource().cloned();
        check_fields(resource.is_some(), offset, length)?;
        Ok(Self {
            resource,
            offset: AtomicI64::new(offset),
            length: AtomicI64::new(length),
        })
    }
}

impl<R: BackingResource> From<&ContentClaim<R>> for ClaimSnapshot<R> {
    fn from(claim: &ContentClaim<R>) -> Self {
        claim.snapshot()
    }
}

impl<R: BackingResource + Serialize> Serialize for ContentClaim<R> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.snapshot().serialize(serializer)
    }
}

impl<'de, R: BackingResource + Deserialize<'de>> Deserialize<'de> for ContentClaim<R> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let snapshot = ClaimSnapshot::<R>::deserialize(deserializer)?;
        Self::try_from(snapshot).map_err(serde::de::Error::custom)
    }
}

/// Orders shared claims by location for sorted structures.
///
/// `Eq` and `Ord` on this wrapper both use
/// [`ContentClaim::compare_location`], so a `BTreeSet<ByLocation>` keeps one
/// entry per `(resource, offset)` regardless of length. Claims must not move
/// while inside a sorted container.
#[derive(Debug, Clone)]
pub struct ByLocation<R: BackingResource = ResourceClaim>(pub Arc<ContentClaim<R>>);

impl<R: BackingResource> ByLocation<R> {
    pub fn into_inner(self) -> Arc<ContentClaim<R>> {
        self.0
    }
}

impl<R: BackingResource> Deref for ByLocation<R> {
    type Target = ContentClaim<R>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<R: BackingResource> From<Arc<ContentClaim<R>>> for ByLocation<R> {
    fn from(claim: Arc<ContentClaim<R>>) -> Self {
        Self(claim)
    }
}

impl<R: BackingResource> PartialEq for ByLocation<R> {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl<R: BackingResource> Eq for ByLocation<R> {}

impl<R: BackingResource> PartialOrd for ByLocation<R> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<R: BackingResource> Ord for ByLocation<R> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.compare_location(&other.0)
    }
}
