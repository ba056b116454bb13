//! Loop scope tracking during traversal.
//!
//! The tracker maintains the chain of enclosing loops as the detectors walk
//! the tree. Each frame records the names bound fresh on every iteration of
//! one loop; queries answer whether an identifier is bound by any active
//! loop, which is what decides loop-variance of a call argument.

use std::collections::BTreeSet;

use thiserror::Error;

use crate::tree::{NodeId, NodeKind, SyntaxTree};

/// Internal invariant violation: more loop exits than entries. Signals a
/// traversal bug, not bad input; callers must propagate, never swallow.
#[derive(Error, Debug)]
pub enum ScopeError {
    #[error("loop scope stack underflow: exit without a matching enter")]
    Underflow,
    #[error("node {0} entered as a loop but has kind {1}")]
    NotALoop(NodeId, NodeKind),
}

/// One active loop's bound variables and nesting depth.
#[derive(Debug, Clone)]
pub struct LoopContext {
    /// The loop node this frame was created for.
    pub node: NodeId,
    /// Names bound by the loop header, e.g. the per-iteration value and
    /// optional key. Empty when the header was unparseable, in which case
    /// every call inside trivially passes the variance test (documented
    /// over-flagging).
    pub bindings: BTreeSet<String>,
    /// Number of enclosing loops above this one (outermost is 0).
    pub depth: usize,
}

/// Stack of the loops enclosing the traversal's current position.
#[derive(Debug, Default)]
pub struct ScopeTracker {
    stack: Vec<LoopContext>,
}

impl ScopeTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Push a frame for a loop node, binding the names found in its header.
    pub fn enter_loop(&mut self, tree: &SyntaxTree, loop_id: NodeId) -> Result<&LoopContext, ScopeError> {
        let kind = tree.kind(loop_id);
        if kind != NodeKind::Loop {
            return Err(ScopeError::NotALoop(loop_id, kind));
        }

        let ctx = LoopContext {
            node: loop_id,
            bindings: header_bindings(tree, loop_id),
            depth: self.stack.len(),
        };
        self.stack.push(ctx);
        // Just pushed, so the stack is non-empty.
        Ok(self.stack.last().ok_or(ScopeError::Underflow)?)
    }

    /// Pop the innermost frame.
    pub fn exit_loop(&mut self) -> Result<LoopContext, ScopeError> {
        self.stack.pop().ok_or(ScopeError::Underflow)
    }

    /// Number of active loop frames.
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    pub fn innermost(&self) -> Option<&LoopContext> {
        self.stack.last()
    }

    /// True when the identifier is bound by any frame, innermost to
    /// outermost. The query is existential: a name shadowed by a nested
    /// loop still answers true for either frame.
    pub fn is_bound_by_any_active_loop(&self, name: &str) -> bool {
        self.stack.iter().rev().any(|ctx| ctx.bindings.contains(name))
    }
}

/// Collect the names bound by a loop's header clause.
///
/// The header's first child is the iterated expression; bindings are the
/// `VariableRef` nodes under the remaining header children. A loop without
/// a parsed header binds nothing.
fn header_bindings(tree: &SyntaxTree, loop_id: NodeId) -> BTreeSet<String> {
    let mut names = BTreeSet::new();
    let Some(header) = tree.loop_header(loop_id) else {
        return names;
    };
    for &child in tree.children(header).iter().skip(1) {
        collect_variable_refs(tree, child, &mut names);
    }
    names
}

fn collect_variable_refs(tree: &SyntaxTree, id: NodeId, out: &mut BTreeSet<String>) {
    let node = tree.node(id);
    if node.kind == NodeKind::VariableRef {
        if let Some(name) = node.label() {
            out.insert(name.to_string());
        }
    }
    for &child in &node.children {
        collect_variable_refs(tree, child, out);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::{Span, TreeBuilder};

    /// foreach (entries as key => entry) { }
    fn foreach_tree() -> (SyntaxTree, NodeId) {
        let mut b = TreeBuilder::new();
        let iterable = b.leaf(NodeKind::VariableRef, Span::new(9, 16), "entries");
        let key = b.leaf(NodeKind::VariableRef, Span::new(20, 23), "key");
        let value = b.leaf(NodeKind::VariableRef, Span::new(27, 32), "entry");
        let header = b.push(
            NodeKind::LoopBinding,
            Span::new(9, 32),
            None,
            vec![iterable, key, value],
        );
        let lp = b.push(NodeKind::Loop, Span::new(0, 40), None, vec![header]);
        (b.build(lp), lp)
    }

    #[test]
    fn test_enter_binds_header_names() {
        let (tree, lp) = foreach_tree();
        let mut scopes = ScopeTracker::new();
        let ctx = scopes.enter_loop(&tree, lp).unwrap();

        assert_eq!(ctx.depth, 0);
        assert!(ctx.bindings.contains("entry"));
        assert!(ctx.bindings.contains("key"));
        // The iterated expression is not a binding.
        assert!(!ctx.bindings.contains("entries"));
    }

    #[test]
    fn test_existential_binding_query() {
        let (tree, lp) = foreach_tree();
        let mut scopes = ScopeTracker::new();
        scopes.enter_loop(&tree, lp).unwrap();

        assert!(scopes.is_bound_by_any_active_loop("entry"));
        assert!(!scopes.is_bound_by_any_active_loop("entries"));
        assert!(!scopes.is_bound_by_any_active_loop("glossary"));

        scopes.exit_loop().unwrap();
        assert!(!scopes.is_bound_by_any_active_loop("entry"));
        assert_eq!(scopes.depth(), 0);
    }

    #[test]
    fn test_exit_without_enter_underflows() {
        let mut scopes = ScopeTracker::new();
        assert!(matches!(scopes.exit_loop(), Err(ScopeError::Underflow)));
    }

    #[test]
    fn test_enter_rejects_non_loop() {
        let mut b = TreeBuilder::new();
        let call = b.leaf(NodeKind::Call, Span::new(0, 5), "lookup");
        let tree = b.build(call);
        let mut scopes = ScopeTracker::new();
        assert!(matches!(
            scopes.enter_loop(&tree, call),
            Err(ScopeError::NotALoop(..))
        ));
    }

    #[test]
    fn test_unparseable_header_binds_nothing() {
        let mut b = TreeBuilder::new();
        let stmt = b.push(NodeKind::Other, Span::new(1, 2), None, vec![]);
        let lp = b.push(NodeKind::Loop, Span::new(0, 10), None, vec![stmt]);
        let tree = b.build(lp);

        let mut scopes = ScopeTracker::new();
        let ctx = scopes.enter_loop(&tree, lp).unwrap();
        assert!(ctx.bindings.is_empty());
    }

    #[test]
    fn test_nested_depth() {
        let (outer_tree, outer) = foreach_tree();
        let mut scopes = ScopeTracker::new();
        scopes.enter_loop(&outer_tree, outer).unwrap();

        // Re-enter the same loop shape to model a nested loop.
        let ctx = scopes.enter_loop(&outer_tree, outer).unwrap();
        assert_eq!(ctx.depth, 1);
        assert_eq!(scopes.depth(), 2);
    }
}
