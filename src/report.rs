//! Output formatting for analysis results.
//!
//! Two formats:
//! - Pretty: colored terminal output for human readability
//! - JSON: structured output for programmatic consumption

use colored::*;
use serde::{Deserialize, Serialize};

use crate::detect::{AnalysisReport, BatchReport, Finding, Severity};

/// JSON report for a single tree.
#[derive(Serialize, Deserialize)]
pub struct JsonReport {
    pub version: String,
    pub tree: String,
    pub findings: Vec<JsonFinding>,
    pub finding_count: usize,
    pub visited: usize,
    pub complete: bool,
}

/// One finding in JSON form.
#[derive(Serialize, Deserialize)]
pub struct JsonFinding {
    pub kind: String,
    pub severity: String,
    pub line: usize,
    pub start: usize,
    pub end: usize,
    pub message: String,
}

/// JSON report for a batch run.
#[derive(Serialize, Deserialize)]
pub struct JsonBatchReport {
    pub version: String,
    pub analyzed: usize,
    pub total_findings: usize,
    pub reports: Vec<JsonReport>,
    pub failures: Vec<JsonBatchFailure>,
}

#[derive(Serialize, Deserialize)]
pub struct JsonBatchFailure {
    pub tree: String,
    pub error: String,
}

fn finding_to_json(f: &Finding) -> JsonFinding {
    JsonFinding {
        kind: f.kind.as_str().to_string(),
        severity: f.severity.to_string(),
        line: f.span.line,
        start: f.span.start,
        end: f.span.end,
        message: f.message.clone(),
    }
}

fn report_to_json(name: &str, report: &AnalysisReport) -> JsonReport {
    JsonReport {
        version: env!("CARGO_PKG_VERSION").to_string(),
        tree: name.to_string(),
        findings: report.findings.iter().map(finding_to_json).collect(),
        finding_count: report.findings.len(),
        visited: report.visited,
        complete: report.complete,
    }
}

/// Render a single-tree report as pretty-printed JSON.
pub fn render_json(name: &str, report: &AnalysisReport) -> anyhow::Result<String> {
    Ok(serde_json::to_string_pretty(&report_to_json(name, report))?)
}

/// Render a batch report as pretty-printed JSON.
pub fn render_batch_json(batch: &BatchReport) -> anyhow::Result<String> {
    let json = JsonBatchReport {
        version: env!("CARGO_PKG_VERSION").to_string(),
        analyzed: batch.analyzed(),
        total_findings: batch.total_findings(),
        reports: batch
            .reports
            .iter()
            .map(|(name, r)| report_to_json(name, r))
            .collect(),
        failures: batch
            .failures
            .iter()
            .map(|f| JsonBatchFailure {
                tree: f.name.clone(),
                error: f.error.clone(),
            })
            .collect(),
    };
    Ok(serde_json::to_string_pretty(&json)?)
}

fn severity_tag(severity: Severity) -> ColoredString {
    match severity {
        Severity::Error => "error".red().bold(),
        Severity::Warning => "warning".yellow().bold(),
        Severity::Info => "info".cyan(),
    }
}

/// Render a single-tree report for terminal output.
pub fn render_pretty(name: &str, report: &AnalysisReport) -> String {
    let mut out = String::new();

    let warnings = report.count_at_least(Severity::Warning);
    let infos = report.findings.len() - warnings;
    let summary = if report.findings.is_empty() {
        format!("{}: no findings", name.bold())
    } else {
        format!(
            "{}: {} finding(s) ({} warning+, {} info)",
            name.bold(),
            report.findings.len(),
            warnings,
            infos
        )
    };
    out.push_str(&summary);
    out.push('\n');

    for f in &report.findings {
        out.push_str(&format!(
            "  {} [{}] {}: {}\n",
            severity_tag(f.severity),
            f.kind.as_str(),
            f.span,
            f.message
        ));
    }

    if !report.complete {
        out.push_str(&format!(
            "  {} analysis stopped after {} node visits; findings are partial\n",
            "note:".bold(),
            report.visited
        ));
    }

    out
}

/// Render a batch report for terminal output.
pub fn render_batch_pretty(batch: &BatchReport) -> String {
    let mut out = String::new();
    for (name, report) in &batch.reports {
        out.push_str(&render_pretty(name, report));
    }
    for failure in &batch.failures {
        out.push_str(&format!(
            "{} {}: {}\n",
            "failed".red().bold(),
            failure.name,
            failure.error
        ));
    }
    out.push_str(&format!(
        "{} tree(s) analyzed, {} finding(s), {} failure(s)\n",
        batch.analyzed(),
        batch.total_findings(),
        batch.failures.len()
    ));
    out
}
