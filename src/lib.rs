//! Loopcheck - static analysis of loops over externally supplied syntax trees.
//!
//! Loopcheck reports loops whose bodies repeat work that cannot change
//! between iterations: a data-store lookup with loop-invariant arguments
//! executed on every pass, a guarded default assignment nothing ever reads,
//! or a variable used before anything binds it.
//!
//! # Architecture
//!
//! Loopcheck does not parse source text. An external front-end produces a
//! syntax tree (JSON or the arena API) and the analyzer runs one
//! deterministic depth-first pass over it:
//!
//! - `tree`: arena-backed syntax tree, JSON loading, validating walker
//! - `scope`: stack of active loop contexts with bound-variable queries
//! - `catalog`: YAML call-side-effect catalog (pure/impure classification)
//! - `detect`: the detectors, finding aggregation, and the analysis driver
//! - `report`: output formatting (pretty, JSON)
//!
//! # Adding a New Detector
//!
//! See `src/detect/` for examples. Write a pass over the validated tree
//! returning `Vec<Finding>` and wire it into `detect::Analyzer::run`.

pub mod catalog;
pub mod cli;
pub mod detect;
pub mod report;
pub mod scope;
pub mod tree;

pub use catalog::{CallCatalog, Purity};
pub use detect::{
    analyze, AnalysisReport, AnalyzeError, Analyzer, BatchReport, Finding, FindingKind, Severity,
};
pub use scope::{LoopContext, ScopeError, ScopeTracker};
pub use tree::{Node, NodeId, NodeKind, Span, SyntaxTree, TreeBuilder, TreeError, Walker};
