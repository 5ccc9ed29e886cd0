//! Proximity Forest classification: train, predict, evaluate, persist.
//!
//! An ensemble of proximity trees. Each internal node routes a series to the
//! branch of its nearest exemplar under a randomly chosen elastic distance
//! measure; the forest predicts by majority vote with random tie breaking.

mod config;
mod confusion;
mod dataset;
mod error;
mod forest;
mod node;
mod predict;
mod result;
mod serialize;
mod split;
mod tree;

pub use config::{FailurePolicy, ForestConfig, MeasureSelection, OobMode, TrainingMode};
pub use confusion::{ClassMetrics, ConfusionMatrix};
pub use dataset::{Dataset, DatasetView};
pub use error::ForestError;
pub use forest::ProximityForest;
pub use node::{Impurity, Node, NodeIndex, NodeKind};
pub use predict::{BatchPrediction, ClassDistribution, Evaluation, Vote};
pub use result::{ForestResult, OobEstimate, TrainingMetadata};
pub use split::{Exemplar, Splitter};
pub use tree::{ProximityTree, TreeStats};
