use std::collections::BTreeMap;

use proximity_distance::{MeasureKind, TieBreak, TimeSeriesView};
use rand::Rng;
use tracing::{debug, instrument};

use crate::config::{ForestConfig, MeasureSelection};
use crate::dataset::DatasetView;
use crate::error::ForestError;
use crate::node::{Node, NodeIndex, NodeKind};
use crate::split::Splitter;

/// Structural statistics of one trained tree.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct TreeStats {
    /// Total nodes in the arena.
    pub n_nodes: usize,
    /// Leaf nodes.
    pub n_leaves: usize,
    /// Depth of the deepest leaf.
    pub height: usize,
    /// How many internal nodes chose each measure family.
    pub measure_usage: BTreeMap<MeasureKind, usize>,
}

/// A trained proximity tree.
///
/// Stored as an arena-based `Vec<Node>`; the root is always at
/// [`NodeIndex::ROOT`]. Holds topology and exemplars only, never the
/// training rows themselves.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ProximityTree {
    nodes: Vec<Node>,
    tree_family: Option<MeasureKind>,
}

impl ProximityTree {
    /// Grow a tree on `view`.
    ///
    /// A subset with zero Gini becomes a leaf without searching for a split;
    /// every other subset is split by [`Splitter::find_best_split`] and its
    /// branches are grown recursively.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`ForestError::EmptyPartition`] | `view` or any branch is empty |
    /// | [`ForestError::PartitionSizeMismatch`] | a split loses or duplicates rows |
    /// | [`ForestError::Distance`] | a distance computation failed |
    #[instrument(skip_all, fields(n_samples = view.len()))]
    pub fn fit<R: Rng + ?Sized>(
        view: &DatasetView<'_>,
        config: &ForestConfig,
        rng: &mut R,
    ) -> Result<Self, ForestError> {
        let tree_family = match config.measure_selection {
            MeasureSelection::PerNode => None,
            MeasureSelection::PerTree => {
                Some(config.measures[rng.gen_range(0..config.measures.len())])
            }
        };

        let mut arena: Vec<Node> = Vec::new();
        grow(view.clone(), None, 0, tree_family, config, rng, &mut arena)?;

        let tree = Self {
            nodes: arena,
            tree_family,
        };
        debug!(
            n_nodes = tree.n_nodes(),
            n_leaves = tree.n_leaves(),
            height = tree.height(),
            "proximity tree built"
        );
        Ok(tree)
    }

    /// Predict the label of `query` by walking from the root to a leaf.
    ///
    /// # Errors
    ///
    /// Returns [`ForestError::Distance`] if `query` length differs from the training series.
    pub fn predict<R: Rng + ?Sized>(
        &self,
        query: TimeSeriesView<'_>,
        tie_break: TieBreak,
        rng: &mut R,
    ) -> Result<usize, ForestError> {
        let mut current = NodeIndex::ROOT;
        loop {
            match &self.nodes[current.index()].kind {
                NodeKind::Leaf { label } => return Ok(*label),
                NodeKind::Internal { splitter, children } => {
                    let branch = splitter.route(query, tie_break, rng)?;
                    current = children[branch];
                }
            }
        }
    }

    /// All nodes; index 0 is the root.
    #[must_use]
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    #[must_use]
    pub fn root(&self) -> &Node {
        &self.nodes[NodeIndex::ROOT.index()]
    }

    /// The family fixed for the whole tree, if trained with per-tree selection.
    #[must_use]
    pub fn tree_family(&self) -> Option<MeasureKind> {
        self.tree_family
    }

    #[must_use]
    pub fn n_nodes(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn n_leaves(&self) -> usize {
        self.nodes.iter().filter(|n| n.is_leaf()).count()
    }

    /// Depth of the deepest node; a single-leaf tree has height 0.
    #[must_use]
    pub fn height(&self) -> usize {
        self.nodes.iter().map(|n| n.depth).max().unwrap_or(0)
    }

    #[must_use]
    pub fn stats(&self) -> TreeStats {
        let mut measure_usage = BTreeMap::new();
        for splitter in self.nodes.iter().filter_map(Node::splitter) {
            *measure_usage.entry(splitter.measure().kind()).or_insert(0) += 1;
        }
        TreeStats {
            n_nodes: self.n_nodes(),
            n_leaves: self.n_leaves(),
            height: self.height(),
            measure_usage,
        }
    }
}

/// Recursively grow the subtree for `view`.
///
/// Returns the [`NodeIndex`] of the node just created in `arena`.
fn grow<R: Rng + ?Sized>(
    view: DatasetView<'_>,
    parent: Option<NodeIndex>,
    depth: usize,
    tree_family: Option<MeasureKind>,
    config: &ForestConfig,
    rng: &mut R,
    arena: &mut Vec<Node>,
) -> Result<NodeIndex, ForestError> {
    if view.is_empty() {
        return Err(ForestError::EmptyPartition { depth });
    }

    let n_samples = view.len();
    let impurity = view.gini_impurity();
    let node_idx = NodeIndex::new(arena.len());

    if impurity.is_pure() {
        arena.push(Node {
            parent,
            depth,
            n_samples,
            impurity,
            kind: NodeKind::Leaf {
                label: view.class_of(0),
            },
        });
        return Ok(node_idx);
    }

    let (splitter, branches) = Splitter::find_best_split(&view, tree_family, config, rng)?;
    // The subset is no longer needed once its branches exist.
    drop(view);

    // Arena pattern: reserve index, recurse, then overwrite with the split.
    arena.push(Node {
        parent,
        depth,
        n_samples,
        impurity,
        kind: NodeKind::Leaf { label: 0 },
    });

    let mut children = Vec::with_capacity(branches.len());
    for branch in branches {
        let child = grow(branch, Some(node_idx), depth + 1, tree_family, config, rng, arena)?;
        children.push(child);
    }

    arena[node_idx.index()].kind = NodeKind::Internal { splitter, children };
    Ok(node_idx)
}
