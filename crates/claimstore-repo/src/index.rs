//! # Claim Indices — Record Counts, Dedup Sets, Compaction Order
//!
//! Structures the repository keeps over content claims. Hash-based
//! structures key on [`ClaimSnapshot`] values, never on live claims, so a
//! later `set_offset`/`set_length` on the claim cannot strand an entry under
//! a stale hash. When a claim moves, its entry is replaced with
//! [`ClaimIndex::relocate`].
//!
//! Compaction order is location order: resource, then offset. Length does not
//! participate.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use claimstore_core::{ByLocation, ClaimSnapshot, ContentClaim, ResourceClaim};

/// Map from claim value to the number of records referencing it.
#[derive(Debug, Default, Clone)]
pub struct ClaimIndex {
    counts: HashMap<ClaimSnapshot, u64>,
}

impl ClaimIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one more reference to `claim`'s current value. Returns the new
    /// count for that value.
    pub fn add_reference(&mut self, claim: &ContentClaim) -> u64 {
        let count = self.counts.entry(claim.snapshot()).or_insert(0);
        *count += 1;
        *count
    }

    /// Drop one reference. Entries are removed when they reach zero.
    /// Returns the remaining count, or `None` if the value was not indexed.
    pub fn remove_reference(&mut self, claim: &ContentClaim) -> Option<u64> {
        let key = claim.snapshot();
        let count = self.counts.get_mut(&key)?;
        *count -= 1;
        let remaining = *count;
        if remaining == 0 {
            self.counts.remove(&key);
        }
        Some(remaining)
    }

    /// Move every reference recorded under `from` to `claim`'s current value.
    ///
    /// Call after mutating a claim that was indexed under `from`. Returns the
    /// number of references moved.
    pub fn relocate(&mut self, from: &ClaimSnapshot, claim: &ContentClaim) -> u64 {
        let Some(moved) = self.counts.remove(from) else {
            return 0;
        };
        *self.counts.entry(claim.snapshot()).or_insert(0) += moved;
        tracing::trace!(moved, claim = ?claim, "relocated claim index entry");
        moved
    }

    /// References recorded for `claim`'s current value.
    pub fn count(&self, claim: &ContentClaim) -> u64 {
        self.counts.get(&claim.snapshot()).copied().unwrap_or(0)
    }

    /// Number of distinct claim values indexed.
    pub fn distinct_claims(&self) -> usize {
        self.counts.len()
    }

    /// Sum of all reference counts.
    pub fn total_references(&self) -> u64 {
        self.counts.values().sum()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Indexed values in `resource`, in location order, with their counts.
    pub fn by_resource(&self, resource: &ResourceClaim) -> Vec<(ClaimSnapshot, u64)> {
        let mut entries: Vec<(ClaimSnapshot, u64)> = self
            .counts
            .iter()
            .filter(|(snapshot, _)| snapshot.resource() == Some(resource))
            .map(|(snapshot, count)| (snapshot.clone(), *count))
            .collect();
        entries.sort_by(|(a, _), (b, _)| {
            a.compare_location(b).then_with(|| a.length().cmp(&b.length()))
        });
        entries
    }

    /// Total references per resource, in resource order.
    pub fn resource_totals(&self) -> Vec<(ResourceClaim, u64)> {
        let mut totals: HashMap<&ResourceClaim, u64> = HashMap::new();
        for (snapshot, count) in &self.counts {
            if let Some(resource) = snapshot.resource() {
                *totals.entry(resource).or_insert(0) += count;
            }
        }
        let mut totals: Vec<(ResourceClaim, u64)> = totals
            .into_iter()
            .map(|(resource, count)| (resource.clone(), count))
            .collect();
        totals.sort_by(|(a, _), (b, _)| a.cmp(b));
        totals
    }
}

/// Set of claim values used to detect records sharing an identical span.
#[derive(Debug, Default, Clone)]
pub struct DedupSet {
    seen: HashSet<ClaimSnapshot>,
}

impl DedupSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `claim`'s current value. Returns `true` if it was not present.
    pub fn insert(&mut self, claim: &ContentClaim) -> bool {
        self.seen.insert(claim.snapshot())
    }

    pub fn contains(&self, claim: &ContentClaim) -> bool {
        self.seen.contains(&claim.snapshot())
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}

/// Sort claims into compaction order.
///
/// Stable: claims at the same location keep their input order, whatever
/// their lengths.
pub fn compaction_order(claims: &[Arc<ContentClaim>]) -> Vec<Arc<ContentClaim>> {
    let mut ordered: Vec<ByLocation> = claims.iter().cloned().map(ByLocation::from).collect();
    ordered.sort();
    ordered.into_iter().map(ByLocation::into_inner).collect()
}

/// Pairs of claims whose known spans overlap within one resource.
///
/// Input order is irrelevant; each pair is reported once, in compaction
/// order.
pub fn overlapping_pairs(claims: &[Arc<ContentClaim>]) -> Vec<(Arc<ContentClaim>, Arc<ContentClaim>)> {
    let ordered = compaction_order(claims);
    let snapshots: Vec<ClaimSnapshot> = ordered.iter().map(|c| c.snapshot()).collect();
    let mut pairs = Vec::new();
    for i in 0..ordered.len() {
        for j in (i + 1)..ordered.len() {
            if snapshots[j].resource() != snapshots[i].resource() {
                break;
            }
            if snapshots[i].overlaps(&snapshots[j]) {
                pairs.push((Arc::clone(&ordered[i]), Arc::clone(&ordered[j])));
            }
        }
    }
    pairs
}
