//! Derived, read-only projections of atlas coordinates for visualization.
//!
//! An [`Embedding`] is never authoritative: it is regenerated on demand from
//! the node store, the `surface` edge set and the current coordinates, and
//! the same state always yields a bit-identical embedding.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::canonical::canonical_hash_hex;
use crate::store::{MultiGraphStore, NodeStore};
use crate::traversal::connected_components;
use crate::types::{EdgeSet, NodeId, Vec2};
use super::relaxation::AtlasCoordinates;

/// Number of output dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Dimensions {
    /// x, y.
    Two,
    /// x, y and a layering z.
    Three,
}

impl TryFrom<u8> for Dimensions {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            2 => Ok(Self::Two),
            3 => Ok(Self::Three),
            other => Err(format!("unsupported embedding dimensions: {other}")),
        }
    }
}

impl From<Dimensions> for u8 {
    fn from(d: Dimensions) -> u8 {
        match d {
            Dimensions::Two => 2,
            Dimensions::Three => 3,
        }
    }
}

/// Render-space position of one node.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EmbeddedPoint {
    /// Atlas x.
    pub x: f64,
    /// Atlas y.
    pub y: f64,
    /// Layer offset; present only in 3D exports. Not a physical height.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub z: Option<f64>,
}

impl EmbeddedPoint {
    /// Planar part.
    pub fn xy(&self) -> Vec2 {
        Vec2::new(self.x, self.y)
    }
}

/// Snapshot mapping node identities to render-space positions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Embedding {
    /// Output dimensionality.
    pub dimensions: Dimensions,
    /// Atlas snapshot the embedding was derived from.
    pub snapshot_id: String,
    /// Positions of every exported node (placed and active).
    pub positions: BTreeMap<NodeId, EmbeddedPoint>,
}

impl Embedding {
    /// Position of a node, if exported.
    pub fn get(&self, node: NodeId) -> Option<&EmbeddedPoint> {
        self.positions.get(&node)
    }

    /// Number of exported nodes.
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    /// Whether nothing was exported.
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Planar barycenter of the given nodes, ignoring unexported ones.
    pub fn barycenter(&self, nodes: &[NodeId]) -> Option<Vec2> {
        Vec2::mean(nodes.iter().filter_map(|id| self.get(*id)).map(EmbeddedPoint::xy))
    }

    /// Polyline through a node path, skipping unexported nodes.
    pub fn path_to_polyline(&self, path: &[NodeId]) -> Vec<EmbeddedPoint> {
        path.iter().filter_map(|id| self.get(*id)).copied().collect()
    }

    /// Content hash of the embedding.
    pub fn fingerprint(&self) -> String {
        canonical_hash_hex(self)
    }
}

/// Builds embeddings from the current state. Owns nothing.
pub struct EmbeddingExporter<'a> {
    nodes: &'a NodeStore,
    graph: &'a MultiGraphStore,
    coordinates: &'a AtlasCoordinates,
    layer_offset: f64,
}

impl<'a> EmbeddingExporter<'a> {
    /// Create an exporter over the current state.
    pub fn new(
        nodes: &'a NodeStore,
        graph: &'a MultiGraphStore,
        coordinates: &'a AtlasCoordinates,
        layer_offset: f64,
    ) -> Self {
        Self {
            nodes,
            graph,
            coordinates,
            layer_offset,
        }
    }

    /// Export placed, active nodes.
    ///
    /// In 3D the largest `surface` component is the base layer (z = 0);
    /// every other multi-node component is pushed out by one
    /// `layer_offset` per rank (size descending, then smallest id). Nodes
    /// without `surface` edges stay at z = 0.
    pub fn export(&self, dimensions: Dimensions, snapshot_id: impl Into<String>) -> Embedding {
        let mut positions: BTreeMap<NodeId, EmbeddedPoint> = self
            .coordinates
            .iter()
            .filter(|(id, _)| self.nodes.is_active(*id))
            .map(|(id, p)| {
                (
                    id,
                    EmbeddedPoint {
                        x: p.position.x,
                        y: p.position.y,
                        z: None,
                    },
                )
            })
            .collect();

        if dimensions == Dimensions::Three {
            let layers = self.surface_layers(&positions.keys().copied().collect());
            for (id, point) in positions.iter_mut() {
                point.z = Some(layers.get(id).copied().unwrap_or(0.0));
            }
        }

        Embedding {
            dimensions,
            snapshot_id: snapshot_id.into(),
            positions,
        }
    }

    fn surface_layers(&self, members: &BTreeSet<NodeId>) -> BTreeMap<NodeId, f64> {
        let mut components: Vec<Vec<NodeId>> = connected_components(self.graph, EdgeSet::Surface, members)
            .into_iter()
            .filter(|c| c.len() > 1)
            .collect();
        // Components come ordered by smallest member; a stable sort on size
        // keeps that as the tie-break.
        components.sort_by(|a, b| b.len().cmp(&a.len()));

        let mut layers = BTreeMap::new();
        for (rank, component) in components.iter().enumerate() {
            let z = rank as f64 * self.layer_offset;
            for &id in component {
                layers.insert(id, z);
            }
        }
        layers
    }
}
