//! # Inspect Subcommand
//!
//! Reads a manifest of records and the claims they reference, then reports:
//!
//! - every claim in compaction order (resource, then offset)
//! - spans referenced by more than one record
//! - pairs of distinct known spans that overlap inside one resource
//! - per-resource record counts
//!
//! ## Manifest format
//!
//! ```yaml
//! claims:
//!   - record: ff-1
//!     claim:
//!       resource: { container: default, section: "3", id: "1700000000-1" }
//!       offset: 0
//!       length: 512
//!   - record: ff-2
//!     claim: { offset: 0, length: 0 }   # empty content placeholder
//! ```
//!
//! A missing `length` means the claim is still being written.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, ValueEnum};
use serde::{Deserialize, Serialize};

use claimstore_core::{ClaimSnapshot, ContentClaim};
use claimstore_repo::{compaction_order, overlapping_pairs, ClaimIndex, DedupSet};

/// Arguments for the inspect subcommand.
#[derive(Args, Debug)]
pub struct InspectArgs {
    /// Path to the claim manifest (YAML or JSON).
    #[arg(long)]
    pub manifest: PathBuf,

    /// Output format.
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,

    /// Exit with status 2 if any overlapping spans are found.
    #[arg(long)]
    pub strict: bool,
}

/// Report rendering.
#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

/// Parsed manifest.
#[derive(Debug, Deserialize)]
pub struct Manifest {
    pub claims: Vec<ManifestEntry>,
}

/// One record and the claim it references.
#[derive(Debug, Deserialize)]
pub struct ManifestEntry {
    pub record: String,
    pub claim: ContentClaim,
}

/// A record's claim in compaction order.
#[derive(Debug, Serialize)]
pub struct OrderedClaim {
    pub record: String,
    pub claim: ClaimSnapshot,
}

/// A span shared by more than one record.
#[derive(Debug, Serialize)]
pub struct SharedSpan {
    pub claim: ClaimSnapshot,
    pub records: Vec<String>,
}

/// Two records whose spans overlap.
#[derive(Debug, Serialize)]
pub struct Overlap {
    pub first: String,
    pub second: String,
}

/// Record count for one resource.
#[derive(Debug, Serialize)]
pub struct ResourceUsage {
    pub resource: String,
    pub records: u64,
    pub spans: usize,
}

/// Everything `inspect` reports.
#[derive(Debug, Serialize)]
pub struct InspectReport {
    pub order: Vec<OrderedClaim>,
    pub unique_spans: usize,
    pub shared: Vec<SharedSpan>,
    pub overlaps: Vec<Overlap>,
    pub resources: Vec<ResourceUsage>,
}

/// Execute the inspect subcommand.
pub fn run_inspect(args: &InspectArgs) -> Result<u8> {
    let manifest = load_manifest(&args.manifest)?;
    tracing::info!(
        manifest = %args.manifest.display(),
        entries = manifest.claims.len(),
        "inspecting claim manifest"
    );
    let report = build_report(manifest);

    match args.format {
        OutputFormat::Text => print!("{}", render_text(&report)),
        OutputFormat::Json => println!(
            "{}",
            serde_json::to_string_pretty(&report).context("serializing inspect report")?
        ),
    }

    if args.strict && !report.overlaps.is_empty() {
        tracing::warn!(overlaps = report.overlaps.len(), "overlapping spans found");
        return Ok(2);
    }
    Ok(0)
}

/// Read a manifest file. YAML is a superset of JSON, so both parse.
pub fn load_manifest(path: &Path) -> Result<Manifest> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("reading claim manifest: {}", path.display()))?;
    serde_yaml::from_str(&content)
        .with_context(|| format!("parsing claim manifest: {}", path.display()))
}

/// Compute the report for a manifest.
pub fn build_report(manifest: Manifest) -> InspectReport {
    let entries: Vec<(String, Arc<ContentClaim>)> = manifest
        .claims
        .into_iter()
        .map(|entry| (entry.record, Arc::new(entry.claim)))
        .collect();

    let mut index = ClaimIndex::new();
    let mut dedup = DedupSet::new();
    let mut records_by_span: HashMap<ClaimSnapshot, Vec<String>> = HashMap::new();
    for (record, claim) in &entries {
        index.add_reference(claim);
        if !dedup.insert(claim) {
            tracing::debug!(record = %record, claim = %claim, "span already referenced");
        }
        records_by_span
            .entry(claim.snapshot())
            .or_default()
            .push(record.clone());
    }

    let record_of = |claim: &Arc<ContentClaim>| -> String {
        entries
            .iter()
            .find(|(_, c)| Arc::ptr_eq(c, claim))
            .map(|(record, _)| record.clone())
            .unwrap_or_default()
    };

    let claims: Vec<Arc<ContentClaim>> = entries.iter().map(|(_, c)| Arc::clone(c)).collect();
    let order = compaction_order(&claims)
        .iter()
        .map(|claim| OrderedClaim {
            record: record_of(claim),
            claim: claim.snapshot(),
        })
        .collect();

    let mut shared: Vec<SharedSpan> = records_by_span
        .into_iter()
        .filter(|(_, records)| records.len() > 1)
        .map(|(claim, records)| SharedSpan { claim, records })
        .collect();
    shared.sort_by(|a, b| {
        a.claim
            .compare_location(&b.claim)
            .then_with(|| a.claim.length().cmp(&b.claim.length()))
    });

    // Identical spans are already listed as shared.
    let overlaps = overlapping_pairs(&claims)
        .iter()
        .filter(|(a, b)| a != b)
        .map(|(a, b)| Overlap {
            first: record_of(a),
            second: record_of(b),
        })
        .collect();

    let resources = index
        .resource_totals()
        .into_iter()
        .map(|(resource, records)| ResourceUsage {
            spans: index.by_resource(&resource).len(),
            resource: resource.to_string(),
            records,
        })
        .collect();

    InspectReport {
        order,
        unique_spans: dedup.len(),
        shared,
        overlaps,
        resources,
    }
}

fn describe(claim: &ClaimSnapshot) -> String {
    match claim.resource() {
        Some(resource) if claim.known_length().is_some() => {
            format!("{}@{}+{}", resource, claim.offset(), claim.length())
        }
        Some(resource) => format!("{}@{}+?", resource, claim.offset()),
        None => "placeholder".to_string(),
    }
}

/// Render the report as human-readable text.
pub fn render_text(report: &InspectReport) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "Compaction order ({} claims, {} unique spans):\n",
        report.order.len(),
        report.unique_spans
    ));
    for entry in &report.order {
        out.push_str(&format!("  {:<16} {}\n", entry.record, describe(&entry.claim)));
    }

    out.push_str(&format!("Shared spans: {}\n", report.shared.len()));
    for span in &report.shared {
        out.push_str(&format!(
            "  {} <- {}\n",
            describe(&span.claim),
            span.records.join(", ")
        ));
    }

    out.push_str(&format!("Overlapping spans: {}\n", report.overlaps.len()));
    for overlap in &report.overlaps {
        out.push_str(&format!("  {} overlaps {}\n", overlap.first, overlap.second));
    }

    out.push_str("Resources:\n");
    for usage in &report.resources {
        out.push_str(&format!(
            "  {} records={} spans={}\n",
            usage.resource, usage.records, usage.spans
        ));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const MANIFEST: &str = r#"
claims:
  - record: ff-3
    claim:
      resource: { container: default, section: "1", id: r2 }
      offset: 0
      length: 10
  - record: ff-1
    claim:
      resource: { container: default, section: "1", id: r1 }
      offset: 100
      length: 50
  - record: ff-2
    claim:
      resource: { container: default, section: "1", id: r1 }
      offset: 100
      length: 50
  - record: ff-4
    claim:
      resource: { container: default, section: "1", id: r1 }
      offset: 120
  - record: ff-5
    claim:
      resource: { container: default, section: "1", id: r1 }
      offset: 140
      length: 20
  - record: ff-6
    claim: { offset: 0, length: 0 }
"#;

    fn report() -> InspectReport {
        let manifest: Manifest = serde_yaml::from_str(MANIFEST).unwrap();
        build_report(manifest)
    }

    #[test]
    fn test_order_is_compaction_order() {
        let report = report();
        let records: Vec<&str> = report.order.iter().map(|e| e.record.as_str()).collect();
        assert_eq!(records, vec!["ff-6", "ff-1", "ff-2", "ff-4", "ff-5", "ff-3"]);
    }

    #[test]
    fn test_shared_spans() {
        let report = report();
        assert_eq!(report.unique_spans, 5);
        assert_eq!(report.shared.len(), 1);
        assert_eq!(report.shared[0].records, vec!["ff-1", "ff-2"]);
    }

    #[test]
    fn test_overlaps_skip_unknown_length() {
        let report = report();
        let pairs: Vec<(&str, &str)> = report
            .overlaps
            .iter()
            .map(|o| (o.first.as_str(), o.second.as_str()))
            .collect();
        assert_eq!(pairs, vec![("ff-1", "ff-5"), ("ff-2", "ff-5")]);
    }

    #[test]
    fn test_resource_usage() {
        let report = report();
        assert_eq!(report.resources.len(), 2);
        assert_eq!(report.resources[0].resource, "resource:default/1/r1");
        assert_eq!(report.resources[0].records, 4);
        assert_eq!(report.resources[0].spans, 3);
        assert_eq!(report.resources[1].records, 1);
    }

    #[test]
    fn test_render_text_mentions_placeholder() {
        let text = render_text(&report());
        assert!(text.contains("placeholder"));
        assert!(text.contains("resource:default/1/r1@120+?"));
        assert!(text.contains("Overlapping spans: 2"));
    }

    #[test]
    fn test_manifest_with_negative_offset_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "claims:\n  - record: bad\n    claim: {{ resource: {{ container: a, section: '1', id: x }}, offset: -4 }}"
        )
        .unwrap();
        assert!(load_manifest(file.path()).is_err());
    }

    #[test]
    fn test_strict_exit_code_on_overlap() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(MANIFEST.as_bytes()).unwrap();
        let args = InspectArgs {
            manifest: file.path().to_path_buf(),
            format: OutputFormat::Json,
            strict: true,
        };
        assert_eq!(run_inspect(&args).unwrap(), 2);
    }
}
