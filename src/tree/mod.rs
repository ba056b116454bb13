//! Arena-backed syntax tree supplied by an external front-end.
//!
//! The analyzer does not parse source text. A front-end produces a tree of
//! nodes (kind, span, children, optional label) and hands it over either as
//! a JSON document or by constructing the arena directly. Nodes are
//! addressed by `NodeId` handles into the arena; the analyzer never mutates
//! the tree.
//!
//! # Structural conventions
//!
//! - `Loop`: an optional first child of kind `LoopBinding` is the loop
//!   header. The header's first child is the iterated (or condition)
//!   expression; every `VariableRef` under the remaining header children is
//!   a name bound fresh on each iteration. All children after the header
//!   are body statements. A loop without a `LoopBinding` first child has an
//!   unparseable header: no bound names, every child is body.
//! - `Call`: `label` is the callee name, children are the arguments.
//! - `Assignment`: children[0] is the target, children[1] the value.
//! - `Conditional`: children[0] is the condition, the rest are branches.
//! - `PropertyAccess`: `label` is the opaque chain text (e.g. "entry->id");
//!   a front-end may additionally supply the base expression as a child,
//!   in which case variable references inside it participate in
//!   invariance checks.

mod walk;

pub use walk::{Visit, Walker};

use std::fmt;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Kind of syntax node, as reported by the front-end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    Loop,
    LoopBinding,
    Call,
    Conditional,
    Assignment,
    VariableRef,
    PropertyAccess,
    Other,
}

impl NodeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeKind::Loop => "loop",
            NodeKind::LoopBinding => "loop_binding",
            NodeKind::Call => "call",
            NodeKind::Conditional => "conditional",
            NodeKind::Assignment => "assignment",
            NodeKind::VariableRef => "variable_ref",
            NodeKind::PropertyAccess => "property_access",
            NodeKind::Other => "other",
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Source location span with byte offsets and an optional line number.
///
/// Offsets index into the original source text; `line` is 1-indexed and may
/// be 0 when the front-end did not supply line information.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
pub struct Span {
    /// Start byte offset (0-indexed).
    pub start: usize,
    /// End byte offset (0-indexed, exclusive).
    pub end: usize,
    /// Start line (1-indexed, 0 when unknown).
    #[serde(default)]
    pub line: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self {
            start,
            end,
            line: 0,
        }
    }

    pub fn with_line(start: usize, end: usize, line: usize) -> Self {
        Self { start, end, line }
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.line > 0 {
            write!(f, "line {} ({}..{})", self.line, self.start, self.end)
        } else {
            write!(f, "{}..{}", self.start, self.end)
        }
    }
}

/// Handle to a node in a [`SyntaxTree`] arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(u32);

impl NodeId {
    pub fn new(index: u32) -> Self {
        NodeId(index)
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// One node of the external syntax tree.
#[derive(Debug, Clone)]
pub struct Node {
    pub kind: NodeKind,
    pub span: Span,
    /// Identifier payload: variable name for `VariableRef`, callee name for
    /// `Call`, chain text for `PropertyAccess`. `None` for structural nodes.
    pub label: Option<String>,
    pub children: Vec<NodeId>,
}

impl Node {
    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }
}

/// Structural defect in the input tree. Fatal for the current analysis.
#[derive(Error, Debug)]
pub enum TreeError {
    #[error("tree has no nodes")]
    Empty,
    #[error("root node {0} is not present in the arena")]
    MissingRoot(NodeId),
    #[error("node {node} appears on its own ancestor path (cycle in input tree)")]
    Cycle { node: NodeId },
    #[error("child {index} of node {parent} references missing node {child}")]
    DanglingChild {
        parent: NodeId,
        index: usize,
        child: NodeId,
    },
    #[error("node {node} is reachable through more than one parent")]
    SharedNode { node: NodeId },
}

/// An immutable syntax tree owned as a flat arena.
#[derive(Debug, Clone)]
pub struct SyntaxTree {
    nodes: Vec<Node>,
    root: NodeId,
}

impl SyntaxTree {
    /// Assemble a tree from raw parts.
    ///
    /// No validation happens here; a tree with cycles or dangling child ids
    /// is reported by [`SyntaxTree::validate`] or the walker, not by
    /// construction.
    pub fn from_parts(nodes: Vec<Node>, root: NodeId) -> Self {
        Self { nodes, root }
    }

    /// Parse a tree from its JSON wire format (a nested node object).
    pub fn parse_json(content: &str) -> anyhow::Result<Self> {
        let json: JsonNode = serde_json::from_str(content)?;
        Ok(json.into_tree())
    }

    /// Parse a tree from a JSON file produced by a front-end.
    pub fn parse_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path.as_ref())?;
        Self::parse_json(&content)
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Look up a node, returning `None` for ids outside the arena.
    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.index())
    }

    /// Look up a node by an id obtained from this tree.
    ///
    /// Panics on a foreign id; run [`SyntaxTree::validate`] first when the
    /// tree comes from an untrusted front-end.
    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }

    pub fn kind(&self, id: NodeId) -> NodeKind {
        self.node(id).kind
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.node(id).children
    }

    /// Start a pre-order walk from the root.
    pub fn walk(&self) -> Walker<'_> {
        Walker::new(self)
    }

    /// Check structural integrity: every node reachable exactly once, no
    /// cycles, no dangling child references. Returns the number of
    /// reachable nodes.
    pub fn validate(&self) -> Result<usize, TreeError> {
        let mut count = 0;
        for visit in self.walk() {
            visit?;
            count += 1;
        }
        Ok(count)
    }

    /// The loop header node, when the loop carries a parsed binding clause.
    pub fn loop_header(&self, loop_id: NodeId) -> Option<NodeId> {
        let node = self.node(loop_id);
        match node.children.first() {
            Some(&first) if self.get(first).map(|n| n.kind) == Some(NodeKind::LoopBinding) => {
                Some(first)
            }
            _ => None,
        }
    }

    /// The direct body statements of a loop (children after the header).
    pub fn loop_body(&self, loop_id: NodeId) -> &[NodeId] {
        let children = self.children(loop_id);
        if self.loop_header(loop_id).is_some() {
            &children[1..]
        } else {
            children
        }
    }
}

/// Builder for assembling trees bottom-up in code (used by front-ends and
/// heavily by tests).
#[derive(Debug, Default)]
pub struct TreeBuilder {
    nodes: Vec<Node>,
}

impl TreeBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a node whose children were pushed earlier. Returns its id.
    pub fn push(
        &mut self,
        kind: NodeKind,
        span: Span,
        label: Option<&str>,
        children: Vec<NodeId>,
    ) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(Node {
            kind,
            span,
            label: label.map(str::to_string),
            children,
        });
        id
    }

    /// Shorthand for a labeled leaf.
    pub fn leaf(&mut self, kind: NodeKind, span: Span, label: &str) -> NodeId {
        self.push(kind, span, Some(label), Vec::new())
    }

    pub fn build(self, root: NodeId) -> SyntaxTree {
        SyntaxTree::from_parts(self.nodes, root)
    }
}

/// JSON wire format: nested node objects, flattened into the arena on load.
#[derive(Debug, Deserialize)]
struct JsonNode {
    kind: NodeKind,
    #[serde(default)]
    span: Span,
    #[serde(default)]
    label: Option<String>,
    #[serde(default)]
    children: Vec<JsonNode>,
}

impl JsonNode {
    fn into_tree(self) -> SyntaxTree {
        let mut builder = TreeBuilder::new();
        let root = self.flatten(&mut builder);
        builder.build(root)
    }

    fn flatten(self, builder: &mut TreeBuilder) -> NodeId {
        let children = self
            .children
            .into_iter()
            .map(|c| c.flatten(builder))
            .collect();
        builder.push(self.kind, self.span, self.label.as_deref(), children)
    }
}
