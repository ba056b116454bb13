//! Detection of loop-related issues in a syntax tree.

mod aggregate;
mod defaults;
mod invariant;
mod runner;
mod types;
mod undefined;

pub use aggregate::aggregate;
pub use defaults::detect_unused_defaults;
pub use invariant::detect_invariant_calls;
pub use runner::{analyze, Analyzer, VisitBudget};
pub use types::{
    AnalysisReport, AnalyzeError, BatchFailure, BatchReport, Finding, FindingKind, Severity,
};
pub use undefined::detect_undefined_uses;
