//! Depth-first pre-order traversal over a [`SyntaxTree`].
//!
//! The walker yields each node together with its ancestor path and is the
//! single place structural defects are caught: a child id outside the
//! arena, a node appearing on its own ancestor path, or a node reachable
//! through two parents all surface as a [`TreeError`]. After an error the
//! walker is exhausted; restart from the root with a fresh walker.

use super::{NodeId, SyntaxTree, TreeError};

/// One visited node with the path of its ancestors, root first.
#[derive(Debug, Clone)]
pub struct Visit {
    pub id: NodeId,
    pub ancestors: Vec<NodeId>,
}

impl Visit {
    /// Depth of the node below the root (root itself is 0).
    pub fn depth(&self) -> usize {
        self.ancestors.len()
    }
}

struct Frame {
    id: NodeId,
    next_child: usize,
}

/// Lazy pre-order iterator. Restartable from the root via
/// [`SyntaxTree::walk`], not mid-traversal.
pub struct Walker<'t> {
    tree: &'t SyntaxTree,
    stack: Vec<Frame>,
    visited: Vec<bool>,
    started: bool,
    done: bool,
}

impl<'t> Walker<'t> {
    pub(super) fn new(tree: &'t SyntaxTree) -> Self {
        Self {
            tree,
            stack: Vec::new(),
            visited: vec![false; tree.len()],
            started: false,
            done: false,
        }
    }

    fn ancestors(&self) -> Vec<NodeId> {
        self.stack.iter().map(|f| f.id).collect()
    }

    fn on_stack(&self, id: NodeId) -> bool {
        self.stack.iter().any(|f| f.id == id)
    }

    fn start(&mut self) -> Result<Visit, TreeError> {
        if self.tree.is_empty() {
            return Err(TreeError::Empty);
        }
        let root = self.tree.root();
        if self.tree.get(root).is_none() {
            return Err(TreeError::MissingRoot(root));
        }
        self.visited[root.index()] = true;
        self.stack.push(Frame {
            id: root,
            next_child: 0,
        });
        Ok(Visit {
            id: root,
            ancestors: Vec::new(),
        })
    }

    fn advance(&mut self) -> Result<Option<Visit>, TreeError> {
        while let Some(top) = self.stack.last() {
            let parent = top.id;
            let index = top.next_child;
            let children = self.tree.children(parent);

            if index >= children.len() {
                self.stack.pop();
                continue;
            }

            let child = children[index];
            if let Some(top) = self.stack.last_mut() {
                top.next_child += 1;
            }

            if self.tree.get(child).is_none() {
                return Err(TreeError::DanglingChild {
                    parent,
                    index,
                    child,
                });
            }
            if self.on_stack(child) {
                return Err(TreeError::Cycle { node: child });
            }
            if self.visited[child.index()] {
                return Err(TreeError::SharedNode { node: child });
            }

            self.visited[child.index()] = true;
            let ancestors = self.ancestors();
            self.stack.push(Frame {
                id: child,
                next_child: 0,
            });
            return Ok(Some(Visit {
                id: child,
                ancestors,
            }));
        }
        Ok(None)
    }
}

impl Iterator for Walker<'_> {
    type Item = Result<Visit, TreeError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        if !self.started {
            self.started = true;
            return match self.start() {
                Ok(visit) => Some(Ok(visit)),
                Err(e) => {
                    self.done = true;
                    Some(Err(e))
                }
            };
        }
        match self.advance() {
            Ok(Some(visit)) => Some(Ok(visit)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}
