//! # Resource Claim Manager — Claimant Counting
//!
//! Tracks, for every backing resource, how many content claims reference it
//! and whether a writer still has it open for appending. A resource with no
//! claimants and no writer can be marked destructable; the reclaimer drains
//! destructable resources and deletes their physical storage.
//!
//! The manager is the only owner of this bookkeeping. Content claims hold
//! [`ResourceClaim`] identity handles and never touch the counts directly.
//!
//! ## Lifecycle
//!
//! ```text
//! new_resource_claim ─► mark_writable ─► increment/decrement ...
//!                       release_writable ─► (count == 0) ─► destructable queue
//!                                                          ─► drain_destructable
//! ```
//!
//! A resource whose count drops to zero stays tracked, with a zero count,
//! until it is drained from the destructable queue or the manager is purged.

use std::collections::{HashMap, HashSet, VecDeque};

use claimstore_core::ResourceClaim;
use parking_lot::Mutex;

use crate::error::RepoError;

/// Claimant bookkeeping for backing resources.
pub trait ResourceClaimManager: Send + Sync {
    /// Create, or look up, the resource claim with the given identity.
    ///
    /// Asking twice for the same identity returns handles to the same
    /// tracked resource.
    fn new_resource_claim(
        &self,
        container: &str,
        section: &str,
        id: &str,
        loss_tolerant: bool,
    ) -> Result<ResourceClaim, RepoError>;

    /// Number of content claims currently referencing `resource`.
    fn claimant_count(&self, resource: &ResourceClaim) -> u64;

    /// Record one more claimant. Returns the new count.
    fn increment_claimant_count(&self, resource: &ResourceClaim) -> u64;

    /// Record one claimant fewer. Returns the new count, never below zero.
    ///
    /// Reaching zero does not forget the resource; its entry is removed
    /// when [`drain_destructable`](Self::drain_destructable) returns it.
    fn decrement_claimant_count(&self, resource: &ResourceClaim) -> u64;

    /// Note that a writer is appending to `resource`.
    fn mark_writable(&self, resource: &ResourceClaim);

    /// Note that no writer is appending to `resource` any more.
    ///
    /// A resource left with no claimants is queued for destruction in the
    /// same step. Returns `true` if it was queued.
    fn release_writable(&self, resource: &ResourceClaim) -> bool;

    /// Whether a writer is appending to `resource`.
    fn is_writable(&self, resource: &ResourceClaim) -> bool;

    /// Whether `resource` has claimants or an open writer.
    fn is_in_use(&self, resource: &ResourceClaim) -> bool {
        self.claimant_count(resource) > 0 || self.is_writable(resource)
    }

    /// Queue `resource` for destruction.
    ///
    /// # Errors
    ///
    /// Returns [`RepoError::ResourceInUse`] if the resource has claimants or
    /// an open writer.
    fn mark_destructable(&self, resource: &ResourceClaim) -> Result<(), RepoError>;

    /// Remove and return up to `max` destructable resources, oldest first.
    fn drain_destructable(&self, max: usize) -> Vec<ResourceClaim>;

    /// Forget all tracked resources.
    fn purge(&self);
}

#[derive(Debug, Default)]
struct State {
    claimants: HashMap<ResourceClaim, u64>,
    writable: HashSet<ResourceClaim>,
    destructable: VecDeque<ResourceClaim>,
}

/// In-memory [`ResourceClaimManager`] guarded by a single mutex.
#[derive(Debug, Default)]
pub struct StandardResourceClaimManager {
    state: Mutex<State>,
}

impl StandardResourceClaimManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of resources currently tracked.
    pub fn tracked_resources(&self) -> usize {
        self.state.lock().claimants.len()
    }

    /// Number of resources waiting in the destructable queue.
    pub fn destructable_len(&self) -> usize {
        self.state.lock().destructable.len()
    }
}

impl ResourceClaimManager for StandardResourceClaimManager {
    fn new_resource_claim(
        &self,
        container: &str,
        section: &str,
        id: &str,
        loss_tolerant: bool,
    ) -> Result<ResourceClaim, RepoError> {
        let candidate = ResourceClaim::new(container, section, id, loss_tolerant)?;
        let mut state = self.state.lock();
        if let Some((existing, _)) = state.claimants.get_key_value(&candidate) {
            return Ok(existing.clone());
        }
        state.claimants.insert(candidate.clone(), 0);
        tracing::debug!(resource = %candidate, "tracking new resource claim");
        Ok(candidate)
    }

    fn claimant_count(&self, resource: &ResourceClaim) -> u64 {
        self.state
            .lock()
            .claimants
            .get(resource)
            .copied()
            .unwrap_or(0)
    }

    fn increment_claimant_count(&self, resource: &ResourceClaim) -> u64 {
        let mut state = self.state.lock();
        let count = state.claimants.entry(resource.clone()).or_insert(0);
        *count += 1;
        let count = *count;
        if let Some(pos) = state.destructable.iter().position(|r| r == resource) {
            state.destructable.remove(pos);
            tracing::warn!(resource = %resource, "claimant added to destructable resource; withdrawn from destruction queue");
        }
        tracing::debug!(resource = %resource, claimants = count, "incremented claimant count");
        count
    }

    fn decrement_claimant_count(&self, resource: &ResourceClaim) -> u64 {
        let mut state = self.state.lock();
        match state.claimants.get_mut(resource) {
            Some(count) if *count > 0 => {
                *count -= 1;
                tracing::debug!(resource = %resource, claimants = *count, "decremented claimant count");
                *count
            }
            Some(_) => {
                tracing::warn!(resource = %resource, "decrement of resource with no claimants");
                0
            }
            None => {
                tracing::warn!(resource = %resource, "decrement of untracked resource");
                0
            }
        }
    }

    fn mark_writable(&self, resource: &ResourceClaim) {
        let mut state = self.state.lock();
        state.claimants.entry(resource.clone()).or_insert(0);
        state.writable.insert(resource.clone());
        if let Some(pos) = state.destructable.iter().position(|r| r == resource) {
            state.destructable.remove(pos);
            tracing::warn!(resource = %resource, "writer opened destructable resource; withdrawn from destruction queue");
        }
    }

    fn release_writable(&self, resource: &ResourceClaim) -> bool {
        let mut state = self.state.lock();
        if !state.writable.remove(resource) {
            return false;
        }
        let claimants = state.claimants.get(resource).copied().unwrap_or(0);
        if claimants > 0 || state.destructable.contains(resource) {
            return false;
        }
        state.destructable.push_back(resource.clone());
        tracing::debug!(resource = %resource, "released idle writable resource; marked destructable");
        true
    }

    fn is_writable(&self, resource: &ResourceClaim) -> bool {
        self.state.lock().writable.contains(resource)
    }

    fn mark_destructable(&self, resource: &ResourceClaim) -> Result<(), RepoError> {
        let mut state = self.state.lock();
        let claimants = state.claimants.get(resource).copied().unwrap_or(0);
        let writable = state.writable.contains(resource);
        if claimants > 0 || writable {
            tracing::warn!(resource = %resource, claimants, writable, "refusing to mark in-use resource destructable");
            return Err(RepoError::ResourceInUse {
                resource: resource.clone(),
                claimants,
                writable,
            });
        }
        if !state.destructable.contains(resource) {
            state.destructable.push_back(resource.clone());
            tracing::debug!(resource = %resource, "marked resource destructable");
        }
        Ok(())
    }

    fn drain_destructable(&self, max: usize) -> Vec<ResourceClaim> {
        let mut state = self.state.lock();
        let take = max.min(state.destructable.len());
        let drained: Vec<ResourceClaim> = state.destructable.drain(..take).collect();
        for resource in &drained {
            state.claimants.remove(resource);
        }
        if !drained.is_empty() {
            tracing::debug!(count = drained.len(), "drained destructable resources");
        }
        drained
    }

    fn purge(&self) {
        let mut state = self.state.lock();
        *state = State::default();
        tracing::info!("purged all resource claim state");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager_with_resource() -> (StandardResourceClaimManager, ResourceClaim) {
        let manager = StandardResourceClaimManager::new();
        let resource = manager
            .new_resource_claim("default", "1", "r1", false)
            .unwrap();
        (manager, resource)
    }

    #[test]
    fn test_new_resource_claim_is_deduplicated() {
        let manager = StandardResourceClaimManager::new();
        let a = manager.new_resource_claim("default", "1", "r1", false).unwrap();
        let b = manager.new_resource_claim("default", "1", "r1", true).unwrap();
        assert_eq!(a, b);
        assert!(!b.is_loss_tolerant(), "existing handle must be returned");
        assert_eq!(manager.tracked_resources(), 1);
    }

    #[test]
    fn test_new_resource_claim_rejects_empty_id() {
        let manager = StandardResourceClaimManager::new();
        assert!(matches!(
            manager.new_resource_claim("default", "1", "", false),
            Err(RepoError::Claim(_))
        ));
    }

    // ---- counting ----

    #[test]
    fn test_increment_and_decrement() {
        let (manager, r) = manager_with_resource();
        assert_eq!(manager.claimant_count(&r), 0);
        assert_eq!(manager.increment_claimant_count(&r), 1);
        assert_eq!(manager.increment_claimant_count(&r), 2);
        assert_eq!(manager.decrement_claimant_count(&r), 1);
        assert_eq!(manager.decrement_claimant_count(&r), 0);
        assert_eq!(manager.decrement_claimant_count(&r), 0);
    }

    #[test]
    fn test_decrement_untracked_is_zero() {
        let manager = StandardResourceClaimManager::new();
        let stranger = ResourceClaim::new("default", "1", "ghost", false).unwrap();
        assert_eq!(manager.decrement_claimant_count(&stranger), 0);
        assert_eq!(manager.tracked_resources(), 0);
    }

    // ---- destruction ----

    #[test]
    fn test_in_use_resource_not_destructable() {
        let (manager, r) = manager_with_resource();
        manager.increment_claimant_count(&r);
        let err = manager.mark_destructable(&r).unwrap_err();
        assert!(matches!(
            err,
            RepoError::ResourceInUse { claimants: 1, writable: false, .. }
        ));
    }

    #[test]
    fn test_writable_resource_not_destructable() {
        let (manager, r) = manager_with_resource();
        manager.mark_writable(&r);
        assert!(manager.is_in_use(&r));
        assert!(manager.mark_destructable(&r).is_err());
        assert!(manager.release_writable(&r));
        assert!(!manager.is_in_use(&r));
        assert!(manager.mark_destructable(&r).is_ok());
        assert_eq!(manager.destructable_len(), 1);
    }

    #[test]
    fn test_release_writable_with_claimants_not_queued() {
        let (manager, r) = manager_with_resource();
        manager.mark_writable(&r);
        manager.increment_claimant_count(&r);
        assert!(!manager.release_writable(&r));
        assert_eq!(manager.destructable_len(), 0);
    }

    #[test]
    fn test_release_writable_of_unwritable_resource_is_noop() {
        let (manager, r) = manager_with_resource();
        assert!(!manager.release_writable(&r));
        assert_eq!(manager.destructable_len(), 0);
    }

    #[test]
    fn test_zero_count_stays_tracked_until_drained() {
        let (manager, r) = manager_with_resource();
        manager.increment_claimant_count(&r);
        manager.decrement_claimant_count(&r);
        assert_eq!(manager.tracked_resources(), 1);
        manager.mark_destructable(&r).unwrap();
        manager.drain_destructable(1);
        assert_eq!(manager.tracked_resources(), 0);
    }

    #[test]
    fn test_mark_writable_withdraws_from_destruction() {
        let (manager, r) = manager_with_resource();
        manager.mark_destructable(&r).unwrap();
        manager.mark_writable(&r);
        assert_eq!(manager.destructable_len(), 0);
    }

    #[test]
    fn test_mark_destructable_is_idempotent() {
        let (manager, r) = manager_with_resource();
        manager.mark_destructable(&r).unwrap();
        manager.mark_destructable(&r).unwrap();
        assert_eq!(manager.destructable_len(), 1);
    }

    #[test]
    fn test_drain_respects_max_and_order() {
        let manager = StandardResourceClaimManager::new();
        let ids = ["a", "b", "c"];
        for id in ids {
            let r = manager.new_resource_claim("default", "1", id, false).unwrap();
            manager.mark_destructable(&r).unwrap();
        }
        let first = manager.drain_destructable(2);
        assert_eq!(first.iter().map(|r| r.id()).collect::<Vec<_>>(), vec!["a", "b"]);
        let rest = manager.drain_destructable(10);
        assert_eq!(rest.len(), 1);
        assert_eq!(rest[0].id(), "c");
        assert_eq!(manager.tracked_resources(), 0);
    }

    #[test]
    fn test_increment_withdraws_from_destruction() {
        let (manager, r) = manager_with_resource();
        manager.mark_destructable(&r).unwrap();
        manager.increment_claimant_count(&r);
        assert_eq!(manager.destructable_len(), 0);
        assert!(manager.drain_destructable(10).is_empty());
    }

    #[test]
    fn test_purge_clears_state() {
        let (manager, r) = manager_with_resource();
        manager.increment_claimant_count(&r);
        manager.mark_writable(&r);
        manager.purge();
        assert_eq!(manager.claimant_count(&r), 0);
        assert!(!manager.is_writable(&r));
        assert_eq!(manager.tracked_resources(), 0);
    }
}
