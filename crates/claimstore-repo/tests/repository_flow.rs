//! # Repository Flow Tests
//!
//! End-to-end use of the repository collaborators: records share claims,
//! the index counts them, compaction moves them, and resources become
//! destructable once the last claimant is gone.

use std::sync::Arc;
use std::thread;

use claimstore_core::{ContentClaim, ResourceClaim};
use claimstore_repo::{
    compaction_order, ClaimAllocator, ClaimIndex, DedupSet, RepositoryConfig,
    ResourceClaimManager, StandardResourceClaimManager,
};
use proptest::prelude::*;

fn allocator(max: u64) -> ClaimAllocator {
    let config = RepositoryConfig {
        containers: vec!["default".into()],
        sections_per_container: 4,
        max_appendable_claim_length: max,
        loss_tolerant: false,
    };
    ClaimAllocator::new(config, Arc::new(StandardResourceClaimManager::new())).unwrap()
}

#[test]
fn test_records_share_one_claim() {
    let alloc = allocator(1 << 20);
    let claim = alloc.allocate().unwrap();
    alloc.finish(&claim, 512).unwrap();

    // Three records point at the same bytes.
    let records: Vec<Arc<ContentClaim>> = (0..3).map(|_| Arc::clone(&claim)).collect();
    let mut index = ClaimIndex::new();
    for record in &records {
        index.add_reference(record);
    }
    assert_eq!(index.count(&claim), 3);
    assert_eq!(index.distinct_claims(), 1);
    assert!(records
        .iter()
        .all(|r| ContentClaim::same_instance(r.as_ref(), claim.as_ref())));
}

#[test]
fn test_dedup_spots_independent_claims_on_same_span() {
    let resource = ResourceClaim::new("default", "0", "shared", false).unwrap();
    let a = ContentClaim::new(resource.clone(), 0).unwrap();
    a.set_length(64).unwrap();
    let b = ContentClaim::new(resource, 0).unwrap();
    b.set_length(64).unwrap();

    let mut dedup = DedupSet::new();
    assert!(dedup.insert(&a));
    assert!(!dedup.insert(&b), "second identical span must be flagged");
}

#[test]
fn test_compaction_moves_claim_and_index_follows() {
    let alloc = allocator(1 << 20);
    let first = alloc.allocate().unwrap();
    alloc.finish(&first, 100).unwrap();
    let second = alloc.allocate().unwrap();
    alloc.finish(&second, 50).unwrap();

    let mut index = ClaimIndex::new();
    index.add_reference(&first);
    index.add_reference(&second);

    // The first record goes away; compaction slides the second claim down.
    index.remove_reference(&first);
    let before = second.snapshot();
    second.set_offset(0).unwrap();
    assert_eq!(index.relocate(&before, &second), 1);
    assert_eq!(index.count(&second), 1);

    let ordered = compaction_order(&[Arc::clone(&first), Arc::clone(&second)]);
    // Same location now, so input order is kept.
    assert!(Arc::ptr_eq(&ordered[0], &first));
}

#[test]
fn test_resource_destructable_after_last_release() {
    let alloc = allocator(128);
    let a = alloc.allocate().unwrap();
    alloc.finish(&a, 64).unwrap();
    let b = alloc.allocate().unwrap();
    alloc.finish(&b, 64).unwrap();
    let resource = a.resource().unwrap().clone();
    assert_eq!(b.resource(), Some(&resource));

    assert_eq!(alloc.release(&a).unwrap(), 1);
    assert_eq!(alloc.manager().destructable_len(), 0);
    assert_eq!(alloc.release(&b).unwrap(), 0);

    let drained = alloc.manager().drain_destructable(8);
    assert_eq!(drained, vec![resource]);
}

#[test]
fn test_parallel_writers_never_overlap() {
    let alloc = Arc::new(allocator(4096));
    let handles: Vec<_> = (0..4)
        .map(|worker| {
            let alloc = Arc::clone(&alloc);
            thread::spawn(move || {
                let mut written = Vec::new();
                for i in 0..25 {
                    let claim = alloc.allocate().unwrap();
                    alloc.finish(&claim, 10 + worker + i).unwrap();
                    written.push(claim);
                }
                written
            })
        })
        .collect();

    let claims: Vec<Arc<ContentClaim>> = handles
        .into_iter()
        .flat_map(|h| h.join().unwrap())
        .collect();
    assert_eq!(claims.len(), 100);
    assert!(claimstore_repo::overlapping_pairs(&claims).is_empty());

    let mut index = ClaimIndex::new();
    for claim in &claims {
        index.add_reference(claim);
    }
    assert_eq!(index.distinct_claims(), 100);
    let manager_total: u64 = index
        .resource_totals()
        .iter()
        .map(|(resource, _)| alloc.manager().claimant_count(resource))
        .sum();
    assert_eq!(manager_total, 100);
}

proptest! {
    /// Claims allocated into one resource tile it without gaps or overlap.
    #[test]
    fn sequential_allocation_tiles_resource(lengths in prop::collection::vec(0i64..500, 1..30)) {
        let alloc = allocator(u64::MAX);
        let mut expected_offset = 0;
        for length in lengths {
            let claim = alloc.allocate().unwrap();
            prop_assert_eq!(claim.offset(), expected_offset);
            alloc.finish(&claim, length).unwrap();
            expected_offset += length;
        }
        prop_assert_eq!(alloc.pooled_resources(), 1);
    }
}
