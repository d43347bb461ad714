//! # Repository Configuration
//!
//! Loaded from YAML. Describes where content lives (containers, and how many
//! section directories each container fans out into) and how large a single
//! resource may grow before the allocator stops appending to it.
//!
//! ```yaml
//! containers: [default, archive]
//! sections_per_container: 1024
//! max_appendable_claim_length: 1048576
//! loss_tolerant: false
//! ```

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::RepoError;

/// Default number of section directories per container.
pub const DEFAULT_SECTIONS_PER_CONTAINER: u32 = 1024;

/// Default append budget for one resource, in bytes (1 MiB).
pub const DEFAULT_MAX_APPENDABLE_CLAIM_LENGTH: u64 = 1024 * 1024;

/// Configuration of the content repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RepositoryConfig {
    /// Container names. Must be non-empty and unique.
    pub containers: Vec<String>,
    /// Number of sections each container is split into.
    #[serde(default = "default_sections")]
    pub sections_per_container: u32,
    /// Once a resource holds at least this many bytes, no further claims are
    /// appended to it.
    #[serde(default = "default_max_appendable")]
    pub max_appendable_claim_length: u64,
    /// Whether new resources are created loss tolerant.
    #[serde(default)]
    pub loss_tolerant: bool,
}

fn default_sections() -> u32 {
    DEFAULT_SECTIONS_PER_CONTAINER
}

fn default_max_appendable() -> u64 {
    DEFAULT_MAX_APPENDABLE_CLAIM_LENGTH
}

impl Default for RepositoryConfig {
    fn default() -> Self {
        Self {
            containers: vec!["default".to_string()],
            sections_per_container: DEFAULT_SECTIONS_PER_CONTAINER,
            max_appendable_claim_length: DEFAULT_MAX_APPENDABLE_CLAIM_LENGTH,
            loss_tolerant: false,
        }
    }
}

impl RepositoryConfig {
    /// Parse and validate a configuration from YAML text.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, RepoError> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a configuration file.
    pub fn from_path(path: &Path) -> Result<Self, RepoError> {
        let yaml = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&yaml)
    }

    /// Check structural constraints serde cannot express.
    ///
    /// # Errors
    ///
    /// Returns [`RepoError::Config`] if there are no containers, a container
    /// name is empty or repeated, or a numeric bound is zero.
    pub fn validate(&self) -> Result<(), RepoError> {
        if self.containers.is_empty() {
            return Err(RepoError::Config("at least one container is required".into()));
        }
        let mut seen = HashSet::new();
        for name in &self.containers {
            if name.trim().is_empty() {
                return Err(RepoError::Config("container names must not be empty".into()));
            }
            if !seen.insert(name.as_str()) {
                return Err(RepoError::Config(format!("duplicate container name {name:?}")));
            }
        }
        if self.sections_per_container == 0 {
            return Err(RepoError::Config("sections_per_container must be positive".into()));
        }
        if self.max_appendable_claim_length == 0 {
            return Err(RepoError::Config(
                "max_appendable_claim_length must be positive".into(),
            ));
        }
        Ok(())
    }
}
