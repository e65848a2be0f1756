//! Output formatting for scan and documentation results.
//!
//! Supports two output formats:
//! - Pretty: colored terminal output for human readability
//! - JSON: structured output for programmatic consumption

use colored::*;
use serde::Serialize;
use std::fmt::Write as _;

use crate::cache::CacheStats;
use crate::walker::{FileFailure, ScanReport};
use crate::workflow::{WorkflowOutcome, WorkflowStatus};

// =============================================================================
// JSON Format
// =============================================================================

#[derive(Serialize)]
pub struct JsonScanReport<'a> {
    pub version: &'static str,
    pub repository: &'a str,
    pub files_scanned: usize,
    pub needs_docs: bool,
    pub undocumented: usize,
    pub unsupported: usize,
    pub oversized: usize,
    pub cache: CacheStats,
    pub files: Vec<&'a crate::analysis::FileAnalysis>,
    pub failures: &'a [FileFailure],
}

#[derive(Serialize)]
pub struct JsonOutcome<'a> {
    pub version: &'static str,
    #[serde(flatten)]
    pub status: WorkflowStatus,
    #[serde(flatten)]
    pub outcome: &'a WorkflowOutcome,
}

pub fn render_scan_json(report: &ScanReport, cache: CacheStats) -> anyhow::Result<String> {
    let json = JsonScanReport {
        version: env!("CARGO_PKG_VERSION"),
        repository: &report.repository,
        files_scanned: report.analyses.len(),
        needs_docs: report.needs_docs(),
        undocumented: report.undocumented_count(),
        unsupported: report.unsupported,
        oversized: report.oversized,
        cache,
        files: report.analyses.values().collect(),
        failures: &report.failures,
    };
    Ok(serde_json::to_string_pretty(&json)?)
}

pub fn render_outcome_json(outcome: &WorkflowOutcome) -> anyhow::Result<String> {
    let json = JsonOutcome {
        version: env!("CARGO_PKG_VERSION"),
        status: outcome.status(),
        outcome,
    };
    Ok(serde_json::to_string_pretty(&json)?)
}

/// Write scan results in JSON format.
pub fn write_scan_json(report: &ScanReport, cache: CacheStats) -> anyhow::Result<()> {
    println!("{}", render_scan_json(report, cache)?);
    Ok(())
}

/// Write workflow results in JSON format.
pub fn write_outcome_json(outcome: &WorkflowOutcome) -> anyhow::Result<()> {
    println!("{}", render_outcome_json(outcome)?);
    Ok(())
}

// =============================================================================
// Pretty Format
// =============================================================================

fn header(out: &mut String, label: &str, value: &str) {
    let _ = writeln!(out);
    let _ = writeln!(
        out,
        "  {} v{}",
        "docsmith".cyan().bold(),
        env!("CARGO_PKG_VERSION")
    );
    let _ = writeln!(out);
    let _ = writeln!(out, "  {}{}", label.dimmed(), value);
    let _ = writeln!(out);
}

fn failures(out: &mut String, failures: &[FileFailure]) {
    if failures.is_empty() {
        return;
    }
    let _ = writeln!(out, "  {}", "Failures".bold());
    for f in failures {
        let _ = writeln!(
            out,
            "    {} {} {}",
            format!("[{}]", f.stage).red(),
            f.path,
            f.message.dimmed()
        );
    }
    let _ = writeln!(out);
}

pub fn render_scan_pretty(report: &ScanReport, cache: CacheStats) -> String {
    let mut out = String::new();
    header(&mut out, "Scanning:   ", &report.repository);

    if report.needs_docs() {
        let _ = writeln!(
            out,
            "  {} {} undocumented item(s) in {} file(s)",
            "✗".red(),
            report.undocumented_count(),
            report.files_needing_docs().count()
        );
    } else {
        let _ = writeln!(out, "  {} all functions and classes documented", "✓".green());
    }
    let _ = writeln!(out);

    for analysis in report.files_needing_docs() {
        let _ = writeln!(
            out,
            "  {} {}",
            analysis.path.bold(),
            format!("({})", analysis.language).dimmed()
        );
        for item in &analysis.undocumented_items {
            let _ = writeln!(
                out,
                "    {:>5}  {:<8} {}",
                item.line.to_string().dimmed(),
                item.kind.to_string().yellow(),
                item.name
            );
        }
        let _ = writeln!(out);
    }

    failures(&mut out, &report.failures);

    let _ = writeln!(
        out,
        "  {}",
        format!(
            "{} file(s) analyzed, {} unsupported, {} oversized, cache {} hit(s) / {} miss(es)",
            report.analyses.len(),
            report.unsupported,
            report.oversized,
            cache.hits,
            cache.misses
        )
        .dimmed()
    );
    let _ = writeln!(out);
    out
}

pub fn render_outcome_pretty(outcome: &WorkflowOutcome) -> String {
    let mut out = String::new();
    header(&mut out, "Documenting: ", &outcome.repository);

    let status = match outcome.status() {
        WorkflowStatus::NoDocumentationNeeded => {
            format!("{} no documentation needed", "✓".green())
        }
        WorkflowStatus::Documented => format!("{} documented", "✓".green()),
        WorkflowStatus::DocumentedWithErrors(n) => {
            format!("{} documented with {} error(s)", "!".yellow(), n)
        }
        WorkflowStatus::Failed(n) => format!("{} failed with {} error(s)", "✗".red(), n),
    };
    let _ = writeln!(out, "  {}", status);
    let _ = writeln!(out);

    if let Some(change) = &outcome.change {
        let _ = writeln!(out, "  {}{}", "Branch: ".dimmed(), change.branch);
        let _ = writeln!(out, "  {}{}", "Change: ".dimmed(), change.url);
        for file in &change.files {
            let _ = writeln!(out, "    {} {}", "+".green(), file);
        }
        let _ = writeln!(out);
    }

    failures(&mut out, &outcome.failures);

    let _ = writeln!(
        out,
        "  {}",
        format!(
            "{} file(s) scanned, {} item(s) documented",
            outcome.scanned_files, outcome.documented_items
        )
        .dimmed()
    );
    let _ = writeln!(out);
    out
}

/// Write scan results with colors.
pub fn write_scan_pretty(report: &ScanReport, cache: CacheStats) {
    print!("{}", render_scan_pretty(report, cache));
}

/// Write workflow results with colors.
pub fn write_outcome_pretty(outcome: &WorkflowOutcome) {
    print!("{}", render_outcome_pretty(outcome));
}
