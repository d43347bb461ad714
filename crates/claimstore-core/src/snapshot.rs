//! # Claim Snapshots — Immutable Claim Values
//!
//! A [`ClaimSnapshot`] is the `(resource, offset, length)` of a content claim
//! frozen at one instant. Unlike a live [`ContentClaim`](crate::ContentClaim),
//! a snapshot cannot change after construction, so its `Eq`/`Hash` are safe
//! to use as keys in long-lived hash maps and sets. Updating a claim's
//! location in an index means replacing its snapshot entry with a new one.
//!
//! Hashing a snapshot feeds the same fields in the same order as hashing the
//! live claim it was taken from.
//!
//! A snapshot holds the same invariants as a claim: `offset >= 0`,
//! `length >= -1`, and no resource only for the `(0, 0)` placeholder.
//! Deserialization enforces them.

use std::cmp::Ordering;

use serde::{Deserialize, Deserializer, Serialize};

use crate::claim::{check_fields, UNKNOWN_LENGTH};
use crate::error::ClaimError;
use crate::resource::{BackingResource, ResourceClaim};

/// Immutable value copy of a content claim.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ClaimSnapshot<R = ResourceClaim> {
    resource: Option<R>,
    offset: i64,
    length: i64,
}

/// Unvalidated wire shape of a snapshot.
#[derive(Deserialize)]
struct ClaimSnapshotRepr<R> {
    resource: Option<R>,
    offset: i64,
    #[serde(default = "unknown_length")]
    length: i64,
}

fn unknown_length() -> i64 {
    UNKNOWN_LENGTH
}

impl<R: BackingResource> ClaimSnapshot<R> {
    /// Build a snapshot from explicit field values.
    ///
    /// # Errors
    ///
    /// - [`ClaimError::NegativeOffset`] if `offset < 0`.
    /// - [`ClaimError::InvalidLength`] if `length < -1`.
    /// - [`ClaimError::MissingResource`] if `resource` is `None` and the span
    ///   is not the `(0, 0)` placeholder.
    pub fn new(resource: Option<R>, offset: i64, length: i64) -> Result<Self, ClaimError> {
        check_fields(resource.is_some(), offset, length)?;
        Ok(Self::from_parts(resource, offset, length))
    }

    pub(crate) fn from_parts(resource: Option<R>, offset: i64, length: i64) -> Self {
        Self {
            resource,
            offset,
            length,
        }
    }

    /// Backing resource, or `None` for the empty placeholder.
    pub fn resource(&self) -> Option<&R> {
        self.resource.as_ref()
    }

    /// Byte offset within the resource.
    pub fn offset(&self) -> i64 {
        self.offset
    }

    /// Byte length, or `-1` if the length was unknown when taken.
    pub fn length(&self) -> i64 {
        self.length
    }

    /// Length as an unsigned count, if known.
    pub fn known_length(&self) -> Option<u64> {
        u64::try_from(self.length).ok()
    }

    /// Exclusive end offset of the span, if the length is known.
    pub fn end_offset(&self) -> Option<i64> {
        self.known_length()
            .and_then(|_| self.offset.checked_add(self.length))
    }

    /// Location ordering: resource first (placeholder first), then offset.
    /// Length is ignored.
    pub fn compare_location(&self, other: &Self) -> Ordering {
        self.resource
            .cmp(&other.resource)
            .then_with(|| self.offset.cmp(&other.offset))
    }

    /// Whether two known spans in the same resource share at least one byte.
    ///
    /// Unknown or zero lengths and placeholders never overlap anything.
    pub fn overlaps(&self, other: &Self) -> bool {
        let (Some(a), Some(b)) = (self.resource.as_ref(), other.resource.as_ref()) else {
            return false;
        };
        if a != b || self.length == 0 || other.length == 0 {
            return false;
        }
        match (self.end_offset(), other.end_offset()) {
            (Some(self_end), Some(other_end)) => {
                self.offset < other_end && other.offset < self_end
            }
            _ => false,
        }
    }
}

impl<'de, R: BackingResource + Deserialize<'de>> Deserialize<'de> for ClaimSnapshot<R> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let repr = ClaimSnapshotRepr::<R>::deserialize(deserializer)?;
        Self::new(repr.resource, repr.offset, repr.length).map_err(serde::de::Error::custom)
    }
}
