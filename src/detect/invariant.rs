//! Detection of loop-invariant calls executed on every iteration.
//!
//! A call inside a loop body is flagged when two things hold: the catalog
//! positively classifies the callee as pure, and none of the variables its
//! arguments transitively reference are bound by any active loop. Such a
//! call computes the same value on every pass and belongs before the loop.
//!
//! Calls are attributed to their innermost enclosing loop only; a call
//! inside a nested loop is analyzed against that loop, never double-counted
//! against the outer one. A call guarded by a conditional branch may be
//! skipped on some iterations, so it is reported at `Info` instead of
//! `Warning`. A call in the condition expression itself still runs on every
//! iteration and keeps the full severity.

use std::collections::BTreeSet;

use crate::catalog::CallCatalog;
use crate::scope::ScopeTracker;
use crate::tree::{NodeId, NodeKind, SyntaxTree};

use super::runner::VisitBudget;
use super::types::{AnalyzeError, Finding, FindingKind, Severity};

/// Scan the whole tree for loop-invariant calls.
pub fn detect_invariant_calls(
    tree: &SyntaxTree,
    catalog: &CallCatalog,
    budget: &mut VisitBudget,
) -> Result<Vec<Finding>, AnalyzeError> {
    let mut scopes = ScopeTracker::new();
    let mut findings = Vec::new();
    walk(
        tree,
        tree.root(),
        &mut scopes,
        catalog,
        0,
        &mut findings,
        budget,
    )?;
    Ok(findings)
}

fn walk(
    tree: &SyntaxTree,
    id: NodeId,
    scopes: &mut ScopeTracker,
    catalog: &CallCatalog,
    guards: usize,
    findings: &mut Vec<Finding>,
    budget: &mut VisitBudget,
) -> Result<(), AnalyzeError> {
    if !budget.spend() {
        return Ok(());
    }

    let node = tree.node(id);
    match node.kind {
        NodeKind::Loop => {
            scopes.enter_loop(tree, id)?;
            // A fresh loop starts unguarded: the guard count measures
            // conditionals between the innermost loop and the call.
            for &child in tree.loop_body(id) {
                walk(tree, child, scopes, catalog, 0, findings, budget)?;
            }
            scopes.exit_loop()?;
        }
        NodeKind::Conditional => {
            let children = tree.children(id);
            // The condition expression runs on every iteration; only the
            // branches are conditionally reachable.
            if let Some(&condition) = children.first() {
                walk(tree, condition, scopes, catalog, guards, findings, budget)?;
            }
            for &branch in children.iter().skip(1) {
                walk(tree, branch, scopes, catalog, guards + 1, findings, budget)?;
            }
        }
        NodeKind::Call => {
            if let Some(finding) = check_call(tree, id, scopes, catalog, guards) {
                findings.push(finding);
            }
            for &child in &node.children {
                walk(tree, child, scopes, catalog, guards, findings, budget)?;
            }
        }
        _ => {
            for &child in &node.children {
                walk(tree, child, scopes, catalog, guards, findings, budget)?;
            }
        }
    }
    Ok(())
}

/// Classify one call against the active loop stack.
fn check_call(
    tree: &SyntaxTree,
    call: NodeId,
    scopes: &ScopeTracker,
    catalog: &CallCatalog,
    guards: usize,
) -> Option<Finding> {
    if scopes.depth() == 0 {
        return None;
    }

    let node = tree.node(call);
    // A call without a resolvable callee cannot be classified; assume it
    // has side effects.
    let callee = node.label()?;
    if !catalog.is_pure(callee) {
        return None;
    }

    let mut refs = BTreeSet::new();
    for &arg in &node.children {
        collect_refs(tree, arg, &mut refs);
    }
    if refs.iter().any(|name| scopes.is_bound_by_any_active_loop(name)) {
        return None;
    }

    let (severity, message) = if guards > 0 {
        (
            Severity::Info,
            format!(
                "call to '{}' does not depend on any loop variable; on iterations \
                 that reach this branch it repeats the same lookup - consider \
                 hoisting or caching the result",
                callee
            ),
        )
    } else {
        (
            Severity::Warning,
            format!(
                "call to '{}' does not depend on any loop variable and runs on \
                 every iteration; hoist it out of the loop",
                callee
            ),
        )
    };

    Some(Finding {
        kind: FindingKind::RepeatedInvariantLookup,
        span: node.span,
        message,
        severity,
    })
}

/// Variable references transitively contained in an argument expression.
///
/// Property chains stay opaque: `entry->id` contributes a reference to
/// `entry` only when the front-end supplied the base expression as a child
/// of the `PropertyAccess` node.
fn collect_refs(tree: &SyntaxTree, id: NodeId, out: &mut BTreeSet<String>) {
    let node = tree.node(id);
    if node.kind == NodeKind::VariableRef {
        if let Some(name) = node.label() {
            out.insert(name.to_string());
        }
    }
    for &child in &node.children {
        collect_refs(tree, child, out);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::{Span, TreeBuilder};

    fn catalog() -> CallCatalog {
        CallCatalog::empty().mark_pure("lookup")
    }

    /// foreach (entries as entry) { <body> }
    fn loop_with_body(b: &mut TreeBuilder, body: Vec<NodeId>) -> NodeId {
        let iterable = b.leaf(NodeKind::VariableRef, Span::new(9, 16), "entries");
        let value = b.leaf(NodeKind::VariableRef, Span::new(20, 25), "entry");
        let header = b.push(
            NodeKind::LoopBinding,
            Span::new(9, 25),
            None,
            vec![iterable, value],
        );
        let mut children = vec![header];
        children.extend(body);
        b.push(NodeKind::Loop, Span::new(0, 100), None, children)
    }

    #[test]
    fn test_constant_arg_call_is_flagged() {
        let mut b = TreeBuilder::new();
        let arg = b.push(NodeKind::Other, Span::new(37, 45), Some("\"format\""), vec![]);
        let call = b.push(NodeKind::Call, Span::new(30, 46), Some("lookup"), vec![arg]);
        let lp = loop_with_body(&mut b, vec![call]);
        let tree = b.build(lp);

        let findings =
            detect_invariant_calls(&tree, &catalog(), &mut VisitBudget::unlimited()).unwrap();
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].kind, FindingKind::RepeatedInvariantLookup);
        assert_eq!(findings[0].severity, Severity::Warning);
        assert_eq!(findings[0].span, Span::new(30, 46));
    }

    #[test]
    fn test_loop_variant_call_is_not_flagged() {
        let mut b = TreeBuilder::new();
        let arg = b.leaf(NodeKind::VariableRef, Span::new(37, 42), "entry");
        let call = b.push(NodeKind::Call, Span::new(30, 43), Some("lookup"), vec![arg]);
        let lp = loop_with_body(&mut b, vec![call]);
        let tree = b.build(lp);

        let findings =
            detect_invariant_calls(&tree, &catalog(), &mut VisitBudget::unlimited()).unwrap();
        assert!(findings.is_empty());
    }

    #[test]
    fn test_unknown_callee_is_not_flagged() {
        let mut b = TreeBuilder::new();
        let call = b.push(NodeKind::Call, Span::new(30, 46), Some("mystery"), vec![]);
        let lp = loop_with_body(&mut b, vec![call]);
        let tree = b.build(lp);

        let findings =
            detect_invariant_calls(&tree, &catalog(), &mut VisitBudget::unlimited()).unwrap();
        assert!(findings.is_empty());
    }

    #[test]
    fn test_guarded_call_downgraded_to_info() {
        let mut b = TreeBuilder::new();
        let condition = b.leaf(NodeKind::VariableRef, Span::new(34, 39), "entry");
        let call = b.push(NodeKind::Call, Span::new(45, 60), Some("lookup"), vec![]);
        let cond = b.push(
            NodeKind::Conditional,
            Span::new(30, 65),
            None,
            vec![condition, call],
        );
        let lp = loop_with_body(&mut b, vec![cond]);
        let tree = b.build(lp);

        let findings =
            detect_invariant_calls(&tree, &catalog(), &mut VisitBudget::unlimited()).unwrap();
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].severity, Severity::Info);
    }

    #[test]
    fn test_call_in_condition_keeps_warning() {
        let mut b = TreeBuilder::new();
        let call = b.push(NodeKind::Call, Span::new(34, 44), Some("lookup"), vec![]);
        let branch = b.push(NodeKind::Other, Span::new(50, 55), None, vec![]);
        let cond = b.push(
            NodeKind::Conditional,
            Span::new(30, 60),
            None,
            vec![call, branch],
        );
        let lp = loop_with_body(&mut b, vec![cond]);
        let tree = b.build(lp);

        let findings =
            detect_invariant_calls(&tree, &catalog(), &mut VisitBudget::unlimited()).unwrap();
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].severity, Severity::Warning);
    }

    #[test]
    fn test_call_outside_any_loop_is_ignored() {
        let mut b = TreeBuilder::new();
        let call = b.push(NodeKind::Call, Span::new(0, 10), Some("lookup"), vec![]);
        let root = b.push(NodeKind::Other, Span::new(0, 20), None, vec![call]);
        let tree = b.build(root);

        let findings =
            detect_invariant_calls(&tree, &catalog(), &mut VisitBudget::unlimited()).unwrap();
        assert!(findings.is_empty());
    }

    #[test]
    fn test_nested_loop_call_attributed_to_inner_only() {
        // outer binds "entry"; inner binds "item"; the call references
        // "entry" - variant for the outer frame, but the existential bound
        // check still sees it, so nothing is flagged anywhere.
        let mut b = TreeBuilder::new();
        let arg = b.leaf(NodeKind::VariableRef, Span::new(70, 75), "entry");
        let call = b.push(NodeKind::Call, Span::new(60, 76), Some("lookup"), vec![arg]);

        let inner_iter = b.leaf(NodeKind::VariableRef, Span::new(40, 45), "parts");
        let inner_val = b.leaf(NodeKind::VariableRef, Span::new(48, 52), "item");
        let inner_header = b.push(
            NodeKind::LoopBinding,
            Span::new(40, 52),
            None,
            vec![inner_iter, inner_val],
        );
        let inner = b.push(
            NodeKind::Loop,
            Span::new(35, 80),
            None,
            vec![inner_header, call],
        );

        let lp = loop_with_body(&mut b, vec![inner]);
        let tree = b.build(lp);

        let findings =
            detect_invariant_calls(&tree, &catalog(), &mut VisitBudget::unlimited()).unwrap();
        assert!(findings.is_empty());
    }

    #[test]
    fn test_nested_loop_invariant_call_flagged_once() {
        let mut b = TreeBuilder::new();
        let call = b.push(NodeKind::Call, Span::new(60, 76), Some("lookup"), vec![]);

        let inner_iter = b.leaf(NodeKind::VariableRef, Span::new(40, 45), "parts");
        let inner_val = b.leaf(NodeKind::VariableRef, Span::new(48, 52), "item");
        let inner_header = b.push(
            NodeKind::LoopBinding,
            Span::new(40, 52),
            None,
            vec![inner_iter, inner_val],
        );
        let inner = b.push(
            NodeKind::Loop,
            Span::new(35, 80),
            None,
            vec![inner_header, call],
        );

        let lp = loop_with_body(&mut b, vec![inner]);
        let tree = b.build(lp);

        let findings =
            detect_invariant_calls(&tree, &catalog(), &mut VisitBudget::unlimited()).unwrap();
        assert_eq!(findings.len(), 1, "one finding, against the inner loop only");
    }

    #[test]
    fn test_opaque_property_chain_does_not_reference_base() {
        // lookup(entry->id) with an opaque chain: flagged, documented
        // simplification.
        let mut b = TreeBuilder::new();
        let chain = b.leaf(NodeKind::PropertyAccess, Span::new(37, 46), "entry->id");
        let call = b.push(NodeKind::Call, Span::new(30, 47), Some("lookup"), vec![chain]);
        let lp = loop_with_body(&mut b, vec![call]);
        let tree = b.build(lp);

        let findings =
            detect_invariant_calls(&tree, &catalog(), &mut VisitBudget::unlimited()).unwrap();
        assert_eq!(findings.len(), 1);
    }

    #[test]
    fn test_property_chain_with_base_child_is_variant() {
        let mut b = TreeBuilder::new();
        let base = b.leaf(NodeKind::VariableRef, Span::new(37, 42), "entry");
        let chain = b.push(
            NodeKind::PropertyAccess,
            Span::new(37, 46),
            Some("entry->id"),
            vec![base],
        );
        let call = b.push(NodeKind::Call, Span::new(30, 47), Some("lookup"), vec![chain]);
        let lp = loop_with_body(&mut b, vec![call]);
        let tree = b.build(lp);

        let findings =
            detect_invariant_calls(&tree, &catalog(), &mut VisitBudget::unlimited()).unwrap();
        assert!(findings.is_empty());
    }

    #[test]
    fn test_unparseable_header_over_flags() {
        // Loop with no binding clause: every pure call trivially passes the
        // variance test.
        let mut b = TreeBuilder::new();
        let arg = b.leaf(NodeKind::VariableRef, Span::new(37, 42), "entry");
        let call = b.push(NodeKind::Call, Span::new(30, 43), Some("lookup"), vec![arg]);
        let lp = b.push(NodeKind::Loop, Span::new(0, 50), None, vec![call]);
        let tree = b.build(lp);

        let findings =
            detect_invariant_calls(&tree, &catalog(), &mut VisitBudget::unlimited()).unwrap();
        assert_eq!(findings.len(), 1);
    }
}
