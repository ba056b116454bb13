//! Detection of variables read before anything binds them.
//!
//! A definition register accumulates names as the walk encounters
//! assignment targets and loop bindings, in source order. A `VariableRef`
//! read whose name is not registered yet is reported once per name, at its
//! first occurrence.
//!
//! The tree contract carries no function-parameter or import declarations;
//! front-ends are expected to model those as assignments at the start of
//! the tree (the same way they model `global` declarations), otherwise
//! parameters will be over-reported.

use std::collections::BTreeSet;

use crate::tree::{NodeId, NodeKind, SyntaxTree};

use super::runner::VisitBudget;
use super::types::{Finding, FindingKind, Severity};

/// A name reads as defined once an assignment target or loop binding
/// introduced it.
#[derive(Default)]
struct DefinitionRegister {
    defined: BTreeSet<String>,
    reported: BTreeSet<String>,
}

/// Scan the whole tree for reads of never-bound variables.
pub fn detect_undefined_uses(tree: &SyntaxTree, budget: &mut VisitBudget) -> Vec<Finding> {
    let mut register = DefinitionRegister::default();
    let mut findings = Vec::new();
    walk(tree, tree.root(), &mut register, &mut findings, budget);
    findings
}

fn walk(
    tree: &SyntaxTree,
    id: NodeId,
    register: &mut DefinitionRegister,
    findings: &mut Vec<Finding>,
    budget: &mut VisitBudget,
) {
    if !budget.spend() {
        return;
    }
    let node = tree.node(id);
    match node.kind {
        NodeKind::Loop => {
            // The iterated expression is read before the bindings exist.
            if let Some(header) = tree.loop_header(id) {
                if let Some(&iterable) = tree.children(header).first() {
                    walk(tree, iterable, register, findings, budget);
                }
                for &binding in tree.children(header).iter().skip(1) {
                    register_bindings(tree, binding, register);
                }
            }
            for &child in tree.loop_body(id) {
                walk(tree, child, register, findings, budget);
            }
        }
        NodeKind::Assignment => {
            let children = &node.children;
            // The value is evaluated before the target is bound.
            for &value in children.iter().skip(1) {
                walk(tree, value, register, findings, budget);
            }
            if let Some(&target) = children.first() {
                let target_node = tree.node(target);
                if target_node.kind == NodeKind::VariableRef {
                    if let Some(name) = target_node.label() {
                        register.defined.insert(name.to_string());
                    }
                } else {
                    // Writing through a property chain reads its base.
                    walk(tree, target, register, findings, budget);
                }
            }
        }
        NodeKind::VariableRef => {
            if let Some(name) = node.label() {
                if !register.defined.contains(name) && register.reported.insert(name.to_string())
                {
                    findings.push(Finding {
                        kind: FindingKind::UndefinedVariableUse,
                        span: node.span,
                        message: format!(
                            "variable '{}' is read here but never assigned or \
                             bound by an enclosing loop",
                            name
                        ),
                        severity: Severity::Warning,
                    });
                }
            }
        }
        _ => {
            for &child in &node.children {
                walk(tree, child, register, findings, budget);
            }
        }
    }
}

fn register_bindings(tree: &SyntaxTree, id: NodeId, register: &mut DefinitionRegister) {
    let node = tree.node(id);
    if node.kind == NodeKind::VariableRef {
        if let Some(name) = node.label() {
            register.defined.insert(name.to_string());
        }
    }
    for &child in &node.children {
        register_bindings(tree, child, register);
    }
}
