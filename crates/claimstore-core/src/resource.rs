//! # Resource Claims — Shared Backing Resources
//!
//! A resource claim names one physical storage unit (typically one file in a
//! container's section directory) that many content claims point into.
//!
//! ## Identity
//!
//! Identity is the `(container, section, id)` triple, fixed at construction.
//! Equality, hashing and ordering all derive from it. `loss_tolerant` is
//! carried along for the repository but is not part of identity.
//!
//! ## Ordering
//!
//! Resource claims order by `id`, then `container`, then `section`. Content
//! claims use this as the primary key of their location ordering.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ClaimError;

/// Borrowed view of a backing resource's identity.
///
/// Field order is the comparison order: `id`, then `container`, then
/// `section`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ResourceIdentity<'a> {
    /// Resource identifier, unique within its section.
    pub id: &'a str,
    /// Container (storage root) holding the resource.
    pub container: &'a str,
    /// Section (subdirectory) of the container.
    pub section: &'a str,
}

/// Capability a storage tier provides for the resources claims point into.
///
/// Implementations must keep `Eq`, `Hash` and `Ord` consistent with
/// [`identity()`](BackingResource::identity), and the identity must never
/// change after construction.
pub trait BackingResource: Clone + Ord + Hash + fmt::Debug + Send + Sync {
    /// Stable identity of this resource.
    fn identity(&self) -> ResourceIdentity<'_>;
}

#[derive(Debug)]
struct Inner {
    container: String,
    section: String,
    id: String,
    loss_tolerant: bool,
}

/// Identity handle for a shared backing resource.
///
/// Cheap to clone: clones share one allocation. Holding a handle does not
/// keep the physical resource alive. Claimant counts are tracked by the
/// repository's resource claim manager, keyed by this handle.
#[derive(Clone, Serialize, Deserialize)]
#[serde(try_from = "ResourceClaimRepr", into = "ResourceClaimRepr")]
pub struct ResourceClaim {
    inner: Arc<Inner>,
}

impl ResourceClaim {
    /// Create a resource claim from its identity components.
    ///
    /// # Errors
    ///
    /// Returns [`ClaimError::EmptyResourceField`] if any identity component
    /// is empty.
    pub fn new(
        container: impl Into<String>,
        section: impl Into<String>,
        id: impl Into<String>,
        loss_tolerant: bool,
    ) -> Result<Self, ClaimError> {
        let container = container.into();
        let section = section.into();
        let id = id.into();
        for (field, value) in [("container", &container), ("section", &section), ("id", &id)] {
            if value.is_empty() {
                return Err(ClaimError::EmptyResourceField { field });
            }
        }
        Ok(Self {
            inner: Arc::new(Inner {
                container,
                section,
                id,
                loss_tolerant,
            }),
        })
    }

    /// Create a resource claim with a freshly generated random id.
    pub fn generate(
        container: impl Into<String>,
        section: impl Into<String>,
        loss_tolerant: bool,
    ) -> Result<Self, ClaimError> {
        Self::new(container, section, Uuid::new_v4().to_string(), loss_tolerant)
    }

    /// Container holding the resource.
    pub fn container(&self) -> &str {
        &self.inner.container
    }

    /// Section of the container holding the resource.
    pub fn section(&self) -> &str {
        &self.inner.section
    }

    /// Resource identifier.
    pub fn id(&self) -> &str {
        &self.inner.id
    }

    /// Whether content in this resource may be lost on failure.
    pub fn is_loss_tolerant(&self) -> bool {
        self.inner.loss_tolerant
    }
}

impl BackingResource for ResourceClaim {
    fn identity(&self) -> ResourceIdentity<'_> {
        ResourceIdentity {
            id: &self.inner.id,
            container: &self.inner.container,
            section: &self.inner.section,
        }
    }
}

impl PartialEq for ResourceClaim {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner) || self.identity() == other.identity()
    }
}

impl Eq for ResourceClaim {}

impl Hash for ResourceClaim {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.identity().hash(state);
    }
}

impl PartialOrd for ResourceClaim {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ResourceClaim {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.identity().cmp(&other.identity())
    }
}

impl fmt::Debug for ResourceClaim {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceClaim")
            .field("container", &self.inner.container)
            .field("section", &self.inner.section)
            .field("id", &self.inner.id)
            .field("loss_tolerant", &self.inner.loss_tolerant)
            .finish()
    }
}

impl fmt::Display for ResourceClaim {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "resource:{}/{}/{}",
            self.inner.container, self.inner.section, self.inner.id
        )
    }
}

/// Wire shape of a resource claim.
#[derive(Serialize, Deserialize)]
struct ResourceClaimRepr {
    container: String,
    section: String,
    id: String,
    #[serde(default)]
    loss_tolerant: bool,
}

impl TryFrom<ResourceClaimRepr> for ResourceClaim {
    type Error = ClaimError;

    fn try_from(repr: ResourceClaimRepr) -> Result<Self, Self::Error> {
        Self::new(repr.container, repr.section, repr.id, repr.loss_tolerant)
    }
}

impl From<ResourceClaim> for ResourceClaimRepr {
    fn from(claim: ResourceClaim) -> Self {
        Self {
            container: claim.inner.container.clone(),
            section: claim.inner.section.clone(),
            id: claim.inner.id.clone(),
            loss_tolerant: claim.inner.loss_tolerant,
        }
    }
}
