//! Core types for analysis results.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::scope::ScopeError;
use crate::tree::{Span, TreeError};

/// Severity levels for findings. Ordered so that `Error` compares greatest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Error,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Info => write!(f, "info"),
            Severity::Warning => write!(f, "warning"),
            Severity::Error => write!(f, "error"),
        }
    }
}

impl std::str::FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "info" => Ok(Severity::Info),
            "warning" => Ok(Severity::Warning),
            "error" => Ok(Severity::Error),
            _ => Err(format!("unknown severity: {}", s)),
        }
    }
}

/// Kinds of issues the detectors report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum FindingKind {
    /// A loop-invariant lookup executed on every iteration.
    #[serde(rename = "repeated_invariant_lookup")]
    RepeatedInvariantLookup,
    /// A guarded default assignment whose value is never read again.
    #[serde(rename = "unused_default_assignment")]
    UnusedDefaultAssignment,
    /// A variable read before anything binds it.
    #[serde(rename = "undefined_variable_use")]
    UndefinedVariableUse,
}

impl FindingKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FindingKind::RepeatedInvariantLookup => "repeated_invariant_lookup",
            FindingKind::UnusedDefaultAssignment => "unused_default_assignment",
            FindingKind::UndefinedVariableUse => "undefined_variable_use",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "repeated_invariant_lookup" => Some(FindingKind::RepeatedInvariantLookup),
            "unused_default_assignment" => Some(FindingKind::UnusedDefaultAssignment),
            "undefined_variable_use" => Some(FindingKind::UndefinedVariableUse),
            _ => None,
        }
    }
}

impl std::fmt::Display for FindingKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single detected issue. Immutable once aggregated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Finding {
    pub kind: FindingKind,
    pub span: Span,
    pub message: String,
    pub severity: Severity,
}

impl Finding {
    /// Deduplication key: two findings of the same kind at the same span
    /// report one issue.
    pub fn key(&self) -> (FindingKind, Span) {
        (self.kind, self.span)
    }
}

/// Why a single analysis call aborted. Both variants are fatal for the
/// call and carry zero findings; a batch catches per tree and continues.
#[derive(Error, Debug)]
pub enum AnalyzeError {
    #[error("malformed syntax tree: {0}")]
    Tree(#[from] TreeError),
    #[error("traversal invariant violated: {0}")]
    Scope(#[from] ScopeError),
}

/// Result of analyzing one tree.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub findings: Vec<Finding>,
    /// Number of nodes visited across all detector passes.
    pub visited: usize,
    /// False when a node-visit budget stopped the analysis early; the
    /// findings then cover only part of the tree.
    pub complete: bool,
}

impl AnalysisReport {
    pub fn has_findings(&self) -> bool {
        !self.findings.is_empty()
    }

    /// Highest severity present, if any.
    pub fn max_severity(&self) -> Option<Severity> {
        self.findings.iter().map(|f| f.severity).max()
    }

    /// Count findings at or above a severity.
    pub fn count_at_least(&self, severity: Severity) -> usize {
        self.findings.iter().filter(|f| f.severity >= severity).count()
    }
}

/// One failed tree in a batch, identified by name.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchFailure {
    pub name: String,
    pub error: String,
}

/// Results of analyzing a set of trees. Reports are ordered by name.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchReport {
    pub reports: Vec<(String, AnalysisReport)>,
    pub failures: Vec<BatchFailure>,
}

impl BatchReport {
    pub fn analyzed(&self) -> usize {
        self.reports.len()
    }

    pub fn total_findings(&self) -> usize {
        self.reports.iter().map(|(_, r)| r.findings.len()).sum()
    }

    pub fn max_severity(&self) -> Option<Severity> {
        self.reports.iter().filter_map(|(_, r)| r.max_severity()).max()
    }
}
