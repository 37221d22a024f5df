use bandgap_core::{Float, TensorError, TensorResult};
use serde::{Deserialize, Serialize};

/// A node of a fitted tree. Children are indices into [`Tree::nodes`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound(
    serialize = "T: Float, L: Serialize",
    deserialize = "T: Float, L: Deserialize<'de>"
))]
pub(crate) enum Node<T: Float, L> {
    Split {
        feature: usize,
        threshold: T,
        left: usize,
        right: usize,
    },
    Leaf {
        value: L,
    },
}

/// Flat arena of nodes; node 0 is the root.
///
/// Kept flat rather than boxed so serialized forests never nest deeper than
/// one level, whatever the tree depth.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound(
    serialize = "T: Float, L: Serialize",
    deserialize = "T: Float, L: Deserialize<'de>"
))]
pub(crate) struct Tree<T: Float, L> {
    pub(crate) nodes: Vec<Node<T, L>>,
}

impl<T: Float, L> Tree<T, L> {
    pub(crate) fn new() -> Self {
        Tree { nodes: Vec::new() }
    }

    /// Reserve a slot and return its index; filled in later with [`Tree::set`].
    pub(crate) fn push(&mut self, node: Node<T, L>) -> usize {
        self.nodes.push(node);
        self.nodes.len() - 1
    }

    pub(crate) fn set(&mut self, id: usize, node: Node<T, L>) {
        self.nodes[id] = node;
    }

    /// Index of the leaf reached by `row`.
    pub(crate) fn leaf_id(&self, row: &[T]) -> TensorResult<usize> {
        let mut id = 0;
        loop {
            match self.nodes.get(id) {
                Some(Node::Leaf { .. }) => return Ok(id),
                Some(Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                }) => {
                    let v = row.get(*feature).copied().ok_or_else(|| {
                        TensorError::IndexOutOfBounds {
                            index: *feature,
                            axis: 1,
                            size: row.len(),
                        }
                    })?;
                    id = if v <= *threshold { *left } else { *right };
                }
                None => {
                    return Err(TensorError::InvalidOperation(
                        "Model not fitted".into(),
                    ))
                }
            }
        }
    }

    pub(crate) fn leaf_value(&self, row: &[T]) -> TensorResult<&L> {
        let id = self.leaf_id(row)?;
        match &self.nodes[id] {
            Node::Leaf { value } => Ok(value),
            Node::Split { .. } => unreachable!("leaf_id always stops on a leaf"),
        }
    }

    pub(crate) fn leaf_mut(&mut self, id: usize) -> Option<&mut L> {
        match self.nodes.get_mut(id) {
            Some(Node::Leaf { value }) => Some(value),
            _ => None,
        }
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub(crate) fn n_leaves(&self) -> usize {
        self.nodes
            .iter()
            .filter(|n| matches!(n, Node::Leaf { .. }))
            .count()
    }

    /// Depth of the deepest leaf (a lone root leaf has depth 0).
    pub(crate) fn depth(&self) -> usize {
        if self.nodes.is_empty() {
            return 0;
        }
        let mut best = 0;
        let mut stack = vec![(0usize, 0usize)];
        while let Some((id, d)) = stack.pop() {
            match &self.nodes[id] {
                Node::Leaf { .. } => best = best.max(d),
                Node::Split { left, right, .. } => {
                    stack.push((*left, d + 1));
                    stack.push((*right, d + 1));
                }
            }
        }
        best
    }
}
