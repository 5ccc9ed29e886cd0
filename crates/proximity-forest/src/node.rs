use std::fmt;

use crate::split::Splitter;

/// Index into a `Vec<Node>` arena, identifying a specific node in a proximity tree.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash,
    serde::Serialize, serde::Deserialize,
)]
pub struct NodeIndex(usize);

impl NodeIndex {
    /// The root of every tree.
    pub const ROOT: Self = Self(0);

    pub(crate) fn new(index: usize) -> Self {
        Self(index)
    }

    /// Return the zero-based arena index.
    #[must_use]
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Gini impurity of a set of rows, or the size-weighted Gini of a split.
#[derive(
    Debug, Clone, Copy, PartialEq, PartialOrd,
    serde::Serialize, serde::Deserialize,
)]
pub struct Impurity(f64);

impl Impurity {
    /// A pure node.
    pub const ZERO: Self = Self(0.0);

    pub(crate) fn new(value: f64) -> Self {
        Self(value)
    }

    /// Gini impurity `1 - Σ p²` from per-class counts.
    pub(crate) fn gini(class_counts: &[usize], total: usize) -> Self {
        if total == 0 {
            return Self::ZERO;
        }
        let n = total as f64;
        let sum_sq: f64 = class_counts
            .iter()
            .map(|&c| {
                let p = c as f64 / n;
                p * p
            })
            .sum();
        Self(1.0 - sum_sq)
    }

    /// Return the raw impurity value.
    #[must_use]
    pub fn value(self) -> f64 {
        self.0
    }

    /// `true` when every row shares one class.
    #[must_use]
    pub fn is_pure(self) -> bool {
        self.0 <= 0.0
    }
}

impl fmt::Display for Impurity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.6}", self.0)
    }
}

/// What a node does with a query.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub enum NodeKind {
    /// Terminal node: every training row that reached it had this label.
    Leaf {
        /// The predicted class.
        label: usize,
    },
    /// Routes a query to the child whose exemplar is nearest.
    Internal {
        /// Measure and exemplars chosen for this node.
        splitter: Splitter,
        /// One child per exemplar, in exemplar order.
        children: Vec<NodeIndex>,
    },
}

/// A node in a proximity tree arena.
///
/// Trees are stored as `Vec<Node>`; parents and children refer to each other
/// by [`NodeIndex`], so the structure has no owning cycles and serializes
/// directly.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Node {
    /// Parent node, `None` for the root.
    pub parent: Option<NodeIndex>,
    /// Distance from the root; the root has depth 0.
    pub depth: usize,
    /// Number of training rows that reached this node.
    pub n_samples: usize,
    /// Gini impurity of those rows.
    pub impurity: Impurity,
    /// Leaf label or splitter with children.
    pub kind: NodeKind,
}

impl Node {
    /// Return `true` if this node is a leaf.
    #[must_use]
    pub fn is_leaf(&self) -> bool {
        matches!(self.kind, NodeKind::Leaf { .. })
    }

    /// Return the child indices, empty for a leaf.
    #[must_use]
    pub fn children(&self) -> &[NodeIndex] {
        match &self.kind {
            NodeKind::Leaf { .. } => &[],
            NodeKind::Internal { children, .. } => children,
        }
    }

    /// Return the splitter of an internal node.
    #[must_use]
    pub fn splitter(&self) -> Option<&Splitter> {
        match &self.kind {
            NodeKind::Leaf { .. } => None,
            NodeKind::Internal { splitter, .. } => Some(splitter),
        }
    }
}
