//! Authoritative in-memory stores: nodes, edges, observations.

pub mod nodes;
pub mod graph;
pub mod ledger;

use std::collections::BTreeSet;

use crate::types::{EdgeKey, EdgeUpsert, NodeId};

/// Container operations shared by every edge set.
///
/// Implementations must iterate in canonical (ascending) order. Per-set
/// physical rules are not part of this trait; they are checked by
/// [`MultiGraphStore`] before a container is touched.
pub trait EdgeSetOps {
    /// Insert the pair or replace its weight.
    fn upsert(&mut self, key: EdgeKey, weight: f64) -> EdgeUpsert;

    /// Remove the pair, returning its weight.
    fn remove(&mut self, key: EdgeKey) -> Option<f64>;

    /// Neighbors of a node (ascending).
    fn neighbors(&self, node: NodeId) -> BTreeSet<NodeId>;

    /// Number of neighbors of a node.
    fn degree(&self, node: NodeId) -> usize;

    /// Weight of a pair, if present.
    fn weight(&self, key: EdgeKey) -> Option<f64>;

    /// Number of edges.
    fn len(&self) -> usize;

    /// Whether the set holds no edges.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

pub use nodes::{ActiveNodes, NodeStore};
pub use graph::{EdgeList, MultiGraphStore, SurfaceDecay, MAX_STRIP_DEGREE};
pub use ledger::ObservationLedger;
