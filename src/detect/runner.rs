//! Analysis driver that wires the traversal, detectors, and aggregator.

use rayon::prelude::*;

use crate::catalog::CallCatalog;
use crate::tree::SyntaxTree;

use super::aggregate::aggregate;
use super::defaults::detect_unused_defaults;
use super::invariant::detect_invariant_calls;
use super::types::{AnalysisReport, AnalyzeError, BatchFailure, BatchReport};
use super::undefined::detect_undefined_uses;

/// Node-visit accounting shared by the detector passes.
///
/// A limited budget lets callers bound analysis time; once spent, the
/// passes stop descending and the report is marked incomplete.
#[derive(Debug)]
pub struct VisitBudget {
    remaining: Option<usize>,
    used: usize,
    exhausted: bool,
}

impl VisitBudget {
    pub fn unlimited() -> Self {
        Self {
            remaining: None,
            used: 0,
            exhausted: false,
        }
    }

    pub fn limited(visits: usize) -> Self {
        Self {
            remaining: Some(visits),
            used: 0,
            exhausted: false,
        }
    }

    /// Account for one node visit. Returns false once the budget is spent.
    pub fn spend(&mut self) -> bool {
        if self.exhausted {
            return false;
        }
        if let Some(remaining) = self.remaining {
            if remaining == 0 {
                self.exhausted = true;
                return false;
            }
            self.remaining = Some(remaining - 1);
        }
        self.used += 1;
        true
    }

    pub fn used(&self) -> usize {
        self.used
    }

    pub fn exhausted(&self) -> bool {
        self.exhausted
    }
}

/// Executes the full analysis against one or more trees.
///
/// One analyzer may be shared across threads; every `run` call constructs
/// its own traversal state.
pub struct Analyzer {
    catalog: CallCatalog,
    node_budget: Option<usize>,
}

impl Default for Analyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl Analyzer {
    /// An analyzer with an empty catalog: no call is classified pure, so
    /// no invariant-lookup findings are produced until a catalog is set.
    pub fn new() -> Self {
        Self {
            catalog: CallCatalog::empty(),
            node_budget: None,
        }
    }

    pub fn with_catalog(mut self, catalog: CallCatalog) -> Self {
        self.catalog = catalog;
        self
    }

    /// Bound the number of node visits per `run` call.
    pub fn with_node_budget(mut self, visits: usize) -> Self {
        self.node_budget = Some(visits);
        self
    }

    /// Analyze a single tree.
    ///
    /// Deterministic for a given tree and catalog. On a malformed tree or a
    /// traversal bug the call aborts with an error and zero findings; it
    /// never returns a truncated list silently (an exhausted budget is the
    /// one sanctioned early stop, and the report says so).
    pub fn run(&self, tree: &SyntaxTree) -> Result<AnalysisReport, AnalyzeError> {
        tree.validate()?;

        let mut budget = match self.node_budget {
            Some(visits) => VisitBudget::limited(visits),
            None => VisitBudget::unlimited(),
        };

        let mut findings = detect_invariant_calls(tree, &self.catalog, &mut budget)?;
        findings.extend(detect_unused_defaults(tree, &mut budget));
        findings.extend(detect_undefined_uses(tree, &mut budget));

        Ok(AnalysisReport {
            findings: aggregate(findings),
            visited: budget.used(),
            complete: !budget.exhausted(),
        })
    }

    /// Analyze a set of named trees sequentially.
    ///
    /// A failed tree is recorded by name and the batch continues; reports
    /// and failures come back sorted by name.
    pub fn run_batch(&self, trees: &[(String, SyntaxTree)]) -> BatchReport {
        let results: Vec<_> = trees
            .iter()
            .map(|(name, tree)| (name.clone(), self.run(tree)))
            .collect();
        collect_batch(results)
    }

    /// Analyze a set of named trees with rayon.
    ///
    /// Each tree gets its own traversal state; output ordering matches the
    /// sequential variant.
    pub fn run_batch_parallel(&self, trees: &[(String, SyntaxTree)]) -> BatchReport {
        let results: Vec<_> = trees
            .par_iter()
            .map(|(name, tree)| (name.clone(), self.run(tree)))
            .collect();
        collect_batch(results)
    }
}

fn collect_batch(results: Vec<(String, Result<AnalysisReport, AnalyzeError>)>) -> BatchReport {
    let mut batch = BatchReport::default();
    for (name, result) in results {
        match result {
            Ok(report) => batch.reports.push((name, report)),
            Err(e) => batch.failures.push(BatchFailure {
                name,
                error: e.to_string(),
            }),
        }
    }
    batch.reports.sort_by(|a, b| a.0.cmp(&b.0));
    batch.failures.sort_by(|a, b| a.name.cmp(&b.name));
    batch
}

/// Single entry point for the common case: analyze one tree with a catalog.
pub fn analyze(tree: &SyntaxTree, catalog: CallCatalog) -> Result<AnalysisReport, AnalyzeError> {
    Analyzer::new().with_catalog(catalog).run(tree)
}
