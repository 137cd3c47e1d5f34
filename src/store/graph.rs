//! Multi-graph store: three independent edge sets over one node space.
//!
//! Each set is an [`EdgeList`]; the shared container operations come from
//! [`EdgeSetOps`]. Set-specific rules (strip degree, weight range) are
//! checked in [`MultiGraphStore::upsert_edge`] before anything is written.

use std::collections::{BTreeMap, BTreeSet};

use crate::types::{AtlasError, EdgeKey, EdgeSet, EdgeUpsert, NodeId, Result};
use super::{EdgeSetOps, NodeStore};

/// Maximum number of wiring neighbors a node may have.
pub const MAX_STRIP_DEGREE: usize = 2;

/// One edge set: weighted unordered pairs plus an adjacency index.
///
/// BTree containers keep every iteration in canonical order.
#[derive(Debug, Clone, Default)]
pub struct EdgeList {
    edges: BTreeMap<EdgeKey, f64>,
    adjacency: BTreeMap<NodeId, BTreeSet<NodeId>>,
}

impl EdgeList {
    /// Create an empty edge list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Lazy iterator over `(low, high, weight)` in canonical order.
    pub fn iter(&self) -> impl Iterator<Item = (NodeId, NodeId, f64)> + '_ {
        self.edges.iter().map(|(k, &w)| (k.low(), k.high(), w))
    }

    /// Neighbor set without copying.
    pub fn neighbors_ref(&self, node: NodeId) -> Option<&BTreeSet<NodeId>> {
        self.adjacency.get(&node)
    }

    fn unlink(&mut self, key: EdgeKey) {
        for (from, to) in [(key.low(), key.high()), (key.high(), key.low())] {
            if let Some(set) = self.adjacency.get_mut(&from) {
                set.remove(&to);
                if set.is_empty() {
                    self.adjacency.remove(&from);
                }
            }
        }
    }
}

impl EdgeSetOps for EdgeList {
    fn upsert(&mut self, key: EdgeKey, weight: f64) -> EdgeUpsert {
        match self.edges.insert(key, weight) {
            Some(previous) => EdgeUpsert::Updated { previous },
            None => {
                self.adjacency.entry(key.low()).or_default().insert(key.high());
                self.adjacency.entry(key.high()).or_default().insert(key.low());
                EdgeUpsert::Inserted
            }
        }
    }

    fn remove(&mut self, key: EdgeKey) -> Option<f64> {
        let weight = self.edges.remove(&key)?;
        self.unlink(key);
        Some(weight)
    }

    fn neighbors(&self, node: NodeId) -> BTreeSet<NodeId> {
        self.adjacency.get(&node).cloned().unwrap_or_default()
    }

    fn degree(&self, node: NodeId) -> usize {
        self.adjacency.get(&node).map_or(0, BTreeSet::len)
    }

    fn weight(&self, key: EdgeKey) -> Option<f64> {
        self.edges.get(&key).copied()
    }

    fn len(&self) -> usize {
        self.edges.len()
    }
}

/// The three edge sets of the atlas.
#[derive(Debug, Clone, Default)]
pub struct MultiGraphStore {
    strip: EdgeList,
    surface: EdgeList,
    region: EdgeList,
}

impl MultiGraphStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Read access to one edge set.
    pub fn edge_set(&self, set: EdgeSet) -> &EdgeList {
        match set {
            EdgeSet::Strip => &self.strip,
            EdgeSet::Surface => &self.surface,
            EdgeSet::Region => &self.region,
        }
    }

    fn edge_set_mut(&mut self, set: EdgeSet) -> &mut EdgeList {
        match set {
            EdgeSet::Strip => &mut self.strip,
            EdgeSet::Surface => &mut self.surface,
            EdgeSet::Region => &mut self.region,
        }
    }

    /// Validate an upsert without applying it.
    ///
    /// Returns the canonical key on success.
    pub fn check_upsert(
        &self,
        nodes: &NodeStore,
        set: EdgeSet,
        a: NodeId,
        b: NodeId,
        weight: f64,
    ) -> Result<EdgeKey> {
        nodes.require(a)?;
        nodes.require(b)?;
        let key = EdgeKey::new(a, b).ok_or(AtlasError::SelfLoop(a))?;
        if !(0.0..=1.0).contains(&weight) {
            return Err(AtlasError::InvalidWeight(weight));
        }

        if set == EdgeSet::Strip && self.strip.weight(key).is_none() {
            for endpoint in [a, b] {
                if self.strip.degree(endpoint) >= MAX_STRIP_DEGREE {
                    return Err(AtlasError::DegreeExceeded { node: endpoint });
                }
            }
        }

        Ok(key)
    }

    /// Insert an edge or update its weight.
    ///
    /// Fails with `UnknownNode`, `SelfLoop`, `InvalidWeight`, or (strip
    /// only) `DegreeExceeded`. Nothing is written on failure.
    pub fn upsert_edge(
        &mut self,
        nodes: &NodeStore,
        set: EdgeSet,
        a: NodeId,
        b: NodeId,
        weight: f64,
    ) -> Result<EdgeUpsert> {
        let key = match self.check_upsert(nodes, set, a, b, weight) {
            Ok(key) => key,
            Err(e) => {
                tracing::warn!(edge_set = %set, a = %a, b = %b, error = %e, "edge rejected");
                return Err(e);
            }
        };
        let outcome = self.edge_set_mut(set).upsert(key, weight);
        tracing::debug!(edge_set = %set, a = %a, b = %b, weight, ?outcome, "edge upserted");
        Ok(outcome)
    }

    /// Remove an edge, returning its weight if it existed.
    pub fn remove_edge(&mut self, set: EdgeSet, a: NodeId, b: NodeId) -> Option<f64> {
        let key = EdgeKey::new(a, b)?;
        self.edge_set_mut(set).remove(key)
    }

    /// Neighbors of `node` within one set.
    pub fn neighbors(&self, set: EdgeSet, node: NodeId) -> BTreeSet<NodeId> {
        self.edge_set(set).neighbors(node)
    }

    /// Weight of the edge between `a` and `b`, if present.
    pub fn weight(&self, set: EdgeSet, a: NodeId, b: NodeId) -> Option<f64> {
        EdgeKey::new(a, b).and_then(|key| self.edge_set(set).weight(key))
    }

    /// Lazy iterator over every edge of a set, canonical order.
    pub fn all_edges(&self, set: EdgeSet) -> impl Iterator<Item = (NodeId, NodeId, f64)> + '_ {
        self.edge_set(set).iter()
    }

    /// Number of edges in a set.
    pub fn edge_count(&self, set: EdgeSet) -> usize {
        self.edge_set(set).len()
    }

    /// Age every surface edge by `factor`, dropping those below `prune_below`.
    ///
    /// Both arguments must lie in [0, 1]; otherwise `InvalidWeight` and
    /// nothing is written.
    pub fn decay_surface(&mut self, factor: f64, prune_below: f64) -> Result<SurfaceDecay> {
        for value in [factor, prune_below] {
            if !(0.0..=1.0).contains(&value) {
                tracing::warn!(factor, prune_below, "surface decay rejected");
                return Err(AtlasError::InvalidWeight(value));
            }
        }

        let mut decay = SurfaceDecay::default();
        let mut pruned = Vec::new();
        for (key, weight) in self.surface.edges.iter_mut() {
            let decayed = *weight * factor;
            if decayed != *weight {
                *weight = decayed;
                decay.rescaled += 1;
            }
            if decayed < prune_below {
                pruned.push(*key);
            }
        }
        for key in &pruned {
            self.surface.remove(*key);
        }
        decay.pruned = pruned.len();
        tracing::debug!(
            factor,
            prune_below,
            rescaled = decay.rescaled,
            pruned = decay.pruned,
            "surface weights decayed"
        );
        Ok(decay)
    }
}

/// Effect of one [`MultiGraphStore::decay_surface`] call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SurfaceDecay {
    /// Surface edges whose weight changed.
    pub rescaled: usize,
    /// Surface edges removed for falling below the threshold.
    pub pruned: usize,
}

impl SurfaceDecay {
    /// Whether the call changed the surface set at all.
    pub fn is_noop(&self) -> bool {
        self.rescaled == 0 && self.pruned == 0
    }
}
