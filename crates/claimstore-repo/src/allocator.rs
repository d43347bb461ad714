//! # Claim Allocator — Appending Claims into Shared Resources
//!
//! Carves new content claims out of writable resources. Each writable
//! resource is handed to one writer at a time: [`ClaimAllocator::allocate`]
//! checks a resource out of the pool and returns a claim at its append
//! offset with unknown length, and [`ClaimAllocator::finish`] records the
//! final length and returns the resource to the pool. Once a resource has
//! grown to `max_appendable_claim_length` bytes it leaves the pool for good
//! and the next allocation opens a fresh resource.
//!
//! Releasing a claim whose write was never finished retires its resource:
//! the bytes after the claim's offset are in an unknown state, so nothing
//! more is appended there.
//!
//! New resources are spread round-robin over every `(container, section)`
//! pair of the [`RepositoryConfig`].

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use claimstore_core::{ClaimError, ContentClaim, ResourceClaim};
use parking_lot::Mutex;
use uuid::Uuid;

use crate::config::RepositoryConfig;
use crate::error::RepoError;
use crate::manager::{ResourceClaimManager, StandardResourceClaimManager};

/// A writable resource and the offset the next claim will start at.
#[derive(Debug, Clone)]
struct Appendable {
    resource: ResourceClaim,
    append_offset: i64,
}

#[derive(Debug, Default)]
struct AllocatorState {
    next_slot: u64,
    pool: VecDeque<Appendable>,
    checked_out: HashMap<ResourceClaim, i64>,
}

/// Append-style allocator of content claims.
#[derive(Debug)]
pub struct ClaimAllocator<M: ResourceClaimManager = StandardResourceClaimManager> {
    config: RepositoryConfig,
    manager: Arc<M>,
    state: Mutex<AllocatorState>,
}

impl<M: ResourceClaimManager> ClaimAllocator<M> {
    /// Create an allocator over `manager`.
    ///
    /// # Errors
    ///
    /// Returns [`RepoError::Config`] if `config` fails validation.
    pub fn new(config: RepositoryConfig, manager: Arc<M>) -> Result<Self, RepoError> {
        config.validate()?;
        Ok(Self {
            config,
            manager,
            state: Mutex::new(AllocatorState::default()),
        })
    }

    pub fn config(&self) -> &RepositoryConfig {
        &self.config
    }

    pub fn manager(&self) -> &Arc<M> {
        &self.manager
    }

    /// Start a new claim at the append offset of a writable resource.
    ///
    /// The returned claim has unknown length and counts as one claimant of
    /// its resource.
    pub fn allocate(&self) -> Result<Arc<ContentClaim>, RepoError> {
        let mut state = self.state.lock();
        let appendable = match state.pool.pop_front() {
            Some(appendable) => appendable,
            None => self.open_resource(&mut state)?,
        };
        let claim = ContentClaim::new(appendable.resource.clone(), appendable.append_offset)?;
        state
            .checked_out
            .insert(appendable.resource.clone(), appendable.append_offset);
        drop(state);

        let claimants = self.manager.increment_claimant_count(&appendable.resource);
        tracing::debug!(
            resource = %appendable.resource,
            offset = appendable.append_offset,
            claimants,
            "allocated content claim"
        );
        Ok(Arc::new(claim))
    }

    /// Finish writing `claim` with `length` bytes.
    ///
    /// # Errors
    ///
    /// - [`RepoError::Claim`] if `length` is negative.
    /// - [`RepoError::Placeholder`] for a claim without a resource.
    /// - [`RepoError::NotWriting`] if the claim is not the one currently
    ///   being written into its resource.
    pub fn finish(&self, claim: &ContentClaim, length: i64) -> Result<(), RepoError> {
        if length < 0 {
            return Err(ClaimError::InvalidLength(length).into());
        }
        let resource = claim.resource().ok_or(RepoError::Placeholder)?;
        let mut state = self.state.lock();
        match state.checked_out.get(resource) {
            Some(start) if *start == claim.offset() => {}
            _ => return Err(RepoError::NotWriting(claim.to_string())),
        }
        let append_offset = claim
            .offset()
            .checked_add(length)
            .ok_or(ClaimError::InvalidLength(length))?;
        claim.set_length(length)?;
        state.checked_out.remove(resource);

        let full = u64::try_from(append_offset)
            .map_or(true, |offset| offset >= self.config.max_appendable_claim_length);
        if full {
            let queued = self.manager.release_writable(resource);
            tracing::debug!(resource = %resource, size = append_offset, queued, "resource full; no longer appendable");
        } else {
            state.pool.push_back(Appendable {
                resource: resource.clone(),
                append_offset,
            });
        }
        Ok(())
    }

    /// Drop one claimant reference to `claim`'s resource.
    ///
    /// If `claim` is still being written, the write is abandoned and its
    /// resource stops being appendable. When the last claimant goes and no
    /// writer holds the resource, it is marked destructable. Returns the
    /// remaining claimant count.
    pub fn release(&self, claim: &ContentClaim) -> Result<u64, RepoError> {
        let resource = claim.resource().ok_or(RepoError::Placeholder)?;
        {
            let mut state = self.state.lock();
            let abandoned = !claim.is_length_known()
                && state.checked_out.get(resource) == Some(&claim.offset());
            if abandoned {
                state.checked_out.remove(resource);
                self.manager.release_writable(resource);
                tracing::warn!(resource = %resource, offset = claim.offset(), "released unfinished claim; resource retired");
            }
        }
        let remaining = self.manager.decrement_claimant_count(resource);
        if remaining == 0 && !self.manager.is_writable(resource) {
            self.manager.mark_destructable(resource)?;
        }
        Ok(remaining)
    }

    /// Stop appending to every pooled resource.
    ///
    /// Pooled resources without claimants are marked destructable. Resources
    /// currently checked out by a writer are left alone.
    pub fn close_pool(&self) {
        let mut state = self.state.lock();
        let pooled: Vec<Appendable> = state.pool.drain(..).collect();
        let queued = pooled
            .iter()
            .filter(|appendable| self.manager.release_writable(&appendable.resource))
            .count();
        drop(state);
        tracing::info!(released = pooled.len(), queued, "closed writable resource pool");
    }

    /// Number of resources waiting in the pool for the next writer.
    pub fn pooled_resources(&self) -> usize {
        self.state.lock().pool.len()
    }

    fn open_resource(&self, state: &mut AllocatorState) -> Result<Appendable, RepoError> {
        let containers = &self.config.containers;
        let container_count = containers.len() as u64;
        let slot = state.next_slot;
        state.next_slot = state.next_slot.wrapping_add(1);

        let container = &containers[(slot % container_count) as usize];
        let section = (slot / container_count) % u64::from(self.config.sections_per_container);
        let id = Uuid::new_v4().to_string();
        let resource = self.manager.new_resource_claim(
            container,
            &section.to_string(),
            &id,
            self.config.loss_tolerant,
        )?;
        self.manager.mark_writable(&resource);
        tracing::debug!(resource = %resource, "opened writable resource");
        Ok(Appendable {
            resource,
            append_offset: 0,
        })
    }
}
