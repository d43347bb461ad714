//! # claimstore-cli — Claim Repository Command-Line Interface
//!
//! ## Subcommands
//!
//! - `inspect` — Read a claim manifest and report compaction order,
//!   duplicate spans, overlapping spans and per-resource usage
//! - `config` — Validate and summarize a repository configuration file
//!
//! ## Crate Policy
//!
//! - Argument parsing is separated from business logic.
//! - Handlers delegate to `claimstore-core` and `claimstore-repo`.

pub mod config;
pub mod inspect;
