//! # Config Subcommand
//!
//! Validates a repository configuration file and prints what the allocator
//! would do with it.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Subcommand};

use claimstore_repo::RepositoryConfig;

/// Arguments for the config subcommand.
#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

/// Available config operations.
#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Validate a repository configuration file.
    Check {
        /// Path to the YAML configuration. Falls back to the global `--config`.
        path: Option<PathBuf>,
    },
}

/// Execute the config subcommand.
pub fn run_config(args: &ConfigArgs, global_config: Option<&Path>) -> Result<u8> {
    match &args.command {
        ConfigCommand::Check { path } => {
            let path = path
                .as_deref()
                .or(global_config)
                .context("no configuration file given; pass a path or --config")?;
            let config = load_config(path)?;
            println!("OK: {}", path.display());
            print!("{}", summarize(&config));
            Ok(0)
        }
    }
}

/// Load and validate a repository configuration.
pub fn load_config(path: &Path) -> Result<RepositoryConfig> {
    tracing::debug!(path = %path.display(), "loading repository configuration");
    RepositoryConfig::from_path(path)
        .with_context(|| format!("loading repository config: {}", path.display()))
}

fn summarize(config: &RepositoryConfig) -> String {
    let total_sections =
        config.containers.len() as u64 * u64::from(config.sections_per_container);
    format!(
        "  containers: {}\n  sections per container: {}\n  total sections: {}\n  max appendable claim length: {} bytes\n  loss tolerant: {}\n",
        config.containers.join(", "),
        config.sections_per_container,
        total_sections,
        config.max_appendable_claim_length,
        config.loss_tolerant,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_check_valid_config() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "containers: [a, b]\nsections_per_container: 8").unwrap();
        let args = ConfigArgs {
            command: ConfigCommand::Check {
                path: Some(file.path().to_path_buf()),
            },
        };
        assert_eq!(run_config(&args, None).unwrap(), 0);
    }

    #[test]
    fn test_check_falls_back_to_global_config() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "containers: [a]").unwrap();
        let args = ConfigArgs {
            command: ConfigCommand::Check { path: None },
        };
        assert_eq!(run_config(&args, Some(file.path())).unwrap(), 0);
    }

    #[test]
    fn test_check_without_any_path_fails() {
        let args = ConfigArgs {
            command: ConfigCommand::Check { path: None },
        };
        assert!(run_config(&args, None).is_err());
    }

    #[test]
    fn test_check_invalid_config_fails() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "containers: []").unwrap();
        let err = load_config(file.path()).unwrap_err();
        assert!(format!("{err:#}").contains("at least one container"));
    }

    #[test]
    fn test_summary_counts_sections() {
        let config = RepositoryConfig {
            containers: vec!["a".into(), "b".into()],
            sections_per_container: 8,
            ..RepositoryConfig::default()
        };
        assert!(summarize(&config).contains("total sections: 16"));
    }
}
