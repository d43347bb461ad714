//! # claimstore-repo — Repository Collaborators
//!
//! The pieces of the content repository that surround the claim model in
//! `claimstore-core`:
//!
//! - **Configuration** (`config.rs`): containers, sections and the append
//!   budget per resource, loaded from YAML.
//! - **Resource claim manager** (`manager.rs`): claimant counts, open
//!   writers and the destructable queue for backing resources.
//! - **Indices** (`index.rs`): claim → record count map, dedup set,
//!   compaction ordering and overlap detection.
//! - **Allocator** (`allocator.rs`): carves new claims out of writable
//!   resources and retires resources once they are full.
//!
//! ## Crate Policy
//!
//! - Hash-based structures key on `ClaimSnapshot`, never on a live claim.
//! - Physical I/O stays out of this crate; it only tracks coordinates and
//!   counts.

pub mod allocator;
pub mod config;
pub mod error;
pub mod index;
pub mod manager;

pub use allocator::ClaimAllocator;
pub use config::RepositoryConfig;
pub use error::RepoError;
pub use index::{compaction_order, overlapping_pairs, ClaimIndex, DedupSet};
pub use manager::{ResourceClaimManager, StandardResourceClaimManager};
