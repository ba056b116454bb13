//! Detection of dead "default value" assignments inside loops.
//!
//! The target pattern is a fallback written under a guard, e.g.
//! `if (!format) { format = "dictionary"; }`, where nothing later in the
//! loop body ever reads the assigned variable. The default then has no
//! observable effect within the loop.
//!
//! Reads that would only happen on the next iteration (earlier in the body
//! text) are not modeled; the finding is reported at `Info` to reflect that
//! lower confidence.

use crate::tree::{NodeId, NodeKind, Span, SyntaxTree};

use super::runner::VisitBudget;
use super::types::{Finding, FindingKind, Severity};

/// Scan the whole tree for guarded default assignments that are never read
/// again in their loop body.
pub fn detect_unused_defaults(tree: &SyntaxTree, budget: &mut VisitBudget) -> Vec<Finding> {
    let mut findings = Vec::new();
    find_loops(tree, tree.root(), &mut findings, budget);
    findings
}

fn find_loops(tree: &SyntaxTree, id: NodeId, findings: &mut Vec<Finding>, budget: &mut VisitBudget) {
    if !budget.spend() {
        return;
    }
    let node = tree.node(id);
    if node.kind == NodeKind::Loop {
        scan_loop(tree, id, findings, budget);
        for &child in tree.loop_body(id) {
            find_loops(tree, child, findings, budget);
        }
    } else {
        for &child in &node.children {
            find_loops(tree, child, findings, budget);
        }
    }
}

#[derive(Default)]
struct BodyScan {
    /// Assignments under at least one conditional, with target name.
    guarded_assigns: Vec<(String, Span)>,
    /// Start offsets of reads, per name.
    reads: Vec<(String, usize)>,
}

fn scan_loop(tree: &SyntaxTree, loop_id: NodeId, findings: &mut Vec<Finding>, budget: &mut VisitBudget) {
    let mut scan = BodyScan::default();
    for &child in tree.loop_body(loop_id) {
        scan_node(tree, child, 0, true, &mut scan, budget);
    }

    for (name, span) in &scan.guarded_assigns {
        let read_later = scan
            .reads
            .iter()
            .any(|(n, start)| n == name && *start >= span.end);
        if !read_later {
            findings.push(Finding {
                kind: FindingKind::UnusedDefaultAssignment,
                span: *span,
                message: format!(
                    "default value assigned to '{}' is never read again in the \
                     loop body; the fallback has no effect",
                    name
                ),
                severity: Severity::Info,
            });
        }
    }
}

/// Walk a loop body collecting guarded assignments and reads.
///
/// Nested loops still contribute reads (a use is a use), but their own
/// guarded assignments are analyzed against the nested loop, so
/// `collect_assigns` turns off below a nested loop.
fn scan_node(
    tree: &SyntaxTree,
    id: NodeId,
    guards: usize,
    collect_assigns: bool,
    scan: &mut BodyScan,
    budget: &mut VisitBudget,
) {
    if !budget.spend() {
        return;
    }
    let node = tree.node(id);
    match node.kind {
        NodeKind::Loop => {
            for &child in &node.children {
                scan_node(tree, child, guards, false, scan, budget);
            }
        }
        NodeKind::Conditional => {
            let children = &node.children;
            if let Some(&condition) = children.first() {
                scan_node(tree, condition, guards, collect_assigns, scan, budget);
            }
            for &branch in children.iter().skip(1) {
                scan_node(tree, branch, guards + 1, collect_assigns, scan, budget);
            }
        }
        NodeKind::Assignment => {
            let children = &node.children;
            if let Some(&target) = children.first() {
                let target_node = tree.node(target);
                if target_node.kind == NodeKind::VariableRef {
                    if let Some(name) = target_node.label() {
                        if collect_assigns && guards > 0 {
                            scan.guarded_assigns.push((name.to_string(), node.span));
                        }
                    }
                } else {
                    // Property targets and other shapes still count as
                    // expression trees with reads inside.
                    scan_node(tree, target, guards, collect_assigns, scan, budget);
                }
            }
            for &value in children.iter().skip(1) {
                scan_node(tree, value, guards, collect_assigns, scan, budget);
            }
        }
        NodeKind::VariableRef => {
            if let Some(name) = node.label() {
                scan.reads.push((name.to_string(), node.span.start));
            }
        }
        _ => {
            for &child in &node.children {
                scan_node(tree, child, guards, collect_assigns, scan, budget);
            }
        }
    }
}
