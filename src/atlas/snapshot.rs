//! Atlas snapshot identity for deterministic provenance.
//!
//! An `AtlasSnapshot` fingerprints the full atlas state (nodes, all three
//! edge sets, the observation ledger and the coordinates). Every exported
//! [`Embedding`](super::Embedding) carries the `snapshot_id` it was derived
//! from.

use serde::{Deserialize, Serialize};

use crate::canonical::{canonical_hash_hex, quantize, to_canonical_bytes};
use crate::store::{MultiGraphStore, NodeStore, ObservationLedger};
use crate::types::EdgeSet;
use crate::LUMEN_ATLAS_SCHEMA_VERSION;
use super::relaxation::{AtlasCoordinates, PlacementSource};
use super::state::Atlas;

/// A deterministic fingerprint of the atlas state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AtlasSnapshot {
    /// Unique identifier for this snapshot (xxh64 of all components).
    pub snapshot_id: String,
    /// Total number of nodes, active or not.
    pub node_count: u64,
    /// Active nodes.
    pub active_count: u64,
    /// Nodes with an atlas coordinate.
    pub placed_count: u64,
    /// Edges in the `strip` set.
    pub strip_count: u64,
    /// Edges in the `surface` set.
    pub surface_count: u64,
    /// Edges in the `region` set.
    pub region_count: u64,
    /// Observations in the ledger.
    pub observation_count: u64,
    /// Highest observation sequence (0 when empty).
    pub max_sequence: u64,
    /// Schema version used for types.
    pub schema_version: String,
    /// Hash of sorted `(id, active)` pairs.
    pub node_hash: String,
    /// Hash of all edge triples, per set, in canonical order.
    pub edge_hash: String,
    /// Hash of quantized placements in node order.
    pub placement_hash: String,
}

impl AtlasSnapshot {
    /// Compute the snapshot of an atlas.
    pub fn compute(atlas: &Atlas) -> Self {
        Self::from_parts(
            atlas.nodes(),
            atlas.graph(),
            atlas.ledger(),
            atlas.coordinates(),
        )
    }

    /// Compute a snapshot from the individual stores.
    pub fn from_parts(
        nodes: &NodeStore,
        graph: &MultiGraphStore,
        ledger: &ObservationLedger,
        coordinates: &AtlasCoordinates,
    ) -> Self {
        let mut node_pairs: Vec<(u64, bool)> = nodes.iter().map(|n| (n.id.as_u64(), n.active)).collect();
        node_pairs.sort_unstable();
        let node_hash = canonical_hash_hex(&node_pairs);

        let edge_triples: Vec<Vec<(u64, u64, i64)>> = EdgeSet::ALL
            .iter()
            .map(|&set| {
                graph
                    .all_edges(set)
                    .map(|(a, b, w)| (a.as_u64(), b.as_u64(), quantize(w)))
                    .collect()
            })
            .collect();
        let edge_hash = canonical_hash_hex(&edge_triples);

        let placements: Vec<(u64, [i64; 4], bool)> = coordinates
            .iter()
            .map(|(id, p)| {
                (
                    id.as_u64(),
                    [
                        quantize(p.position.x),
                        quantize(p.position.y),
                        quantize(p.seed.x),
                        quantize(p.seed.y),
                    ],
                    p.source == PlacementSource::Manual,
                )
            })
            .collect();
        let placement_hash = canonical_hash_hex(&placements);

        let id_input = SnapshotIdInput {
            node_count: nodes.len() as u64,
            placed_count: coordinates.len() as u64,
            strip_count: graph.edge_count(EdgeSet::Strip) as u64,
            surface_count: graph.edge_count(EdgeSet::Surface) as u64,
            region_count: graph.edge_count(EdgeSet::Region) as u64,
            observation_count: ledger.len() as u64,
            max_sequence: ledger.last_sequence(),
            schema_version: LUMEN_ATLAS_SCHEMA_VERSION,
            node_hash: &node_hash,
            edge_hash: &edge_hash,
            placement_hash: &placement_hash,
        };
        let snapshot_id = canonical_hash_hex(&id_input);

        Self {
            snapshot_id,
            node_count: id_input.node_count,
            active_count: nodes.list_active().count() as u64,
            placed_count: id_input.placed_count,
            strip_count: id_input.strip_count,
            surface_count: id_input.surface_count,
            region_count: id_input.region_count,
            observation_count: id_input.observation_count,
            max_sequence: id_input.max_sequence,
            schema_version: LUMEN_ATLAS_SCHEMA_VERSION.to_string(),
            node_hash,
            edge_hash,
            placement_hash,
        }
    }

    /// Serialize to canonical JSON bytes.
    pub fn to_canonical_bytes(&self) -> Vec<u8> {
        to_canonical_bytes(self)
    }

    /// Verify that this snapshot matches the given atlas.
    pub fn verify(&self, atlas: &Atlas) -> bool {
        self.snapshot_id == Self::compute(atlas).snapshot_id
    }
}

#[derive(Serialize)]
struct SnapshotIdInput<'a> {
    node_count: u64,
    placed_count: u64,
    strip_count: u64,
    surface_count: u64,
    region_count: u64,
    observation_count: u64,
    max_sequence: u64,
    schema_version: &'a str,
    node_hash: &'a str,
    edge_hash: &'a str,
    placement_hash: &'a str,
}
