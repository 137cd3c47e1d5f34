//! JSON persistence of a complete atlas.
//!
//! Nodes, the three edge sets and the observation ledger are authoritative.
//! Atlas coordinates are an optional cache: a document without them is
//! re-seeded from its observations on load.
//!
//! Documents are written in canonical form (nodes in insertion order, edges
//! by `(low, high)`, observations by sequence, coordinates by node), so a
//! canonical document survives load then save unchanged.

use std::io::{Read, Write};

use serde::{Deserialize, Serialize};

use crate::atlas::{Atlas, Placement, PlacementSource, RelaxationEngine};
use crate::policy::RelaxationPolicy;
use crate::store::{MultiGraphStore, NodeStore, ObservationLedger};
use crate::types::{AtlasError, EdgeRecord, EdgeSet, Node, NodeId, Observation, Result, Vec2};
use crate::LUMEN_ATLAS_SCHEMA_VERSION;

/// Persisted atlas coordinate of one node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoordinateRecord {
    /// Placed node.
    pub node: NodeId,
    /// Atlas position.
    pub position: Vec2,
    /// Anchor target.
    pub seed: Vec2,
    /// Origin of the seed.
    pub source: PlacementSource,
}

/// Serialized form of an [`Atlas`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AtlasDocument {
    /// Document schema, `lumen_atlas_v1`.
    pub schema_version: String,
    /// Nodes in insertion order.
    #[serde(default)]
    pub nodes: Vec<Node>,
    /// Wiring edges `[a, b, weight]`.
    #[serde(default)]
    pub strip: Vec<EdgeRecord>,
    /// Physical adjacency edges.
    #[serde(default)]
    pub surface: Vec<EdgeRecord>,
    /// Semantic grouping edges.
    #[serde(default)]
    pub region: Vec<EdgeRecord>,
    /// Observation ledger in sequence order.
    #[serde(default)]
    pub observations: Vec<Observation>,
    /// Cached atlas coordinates.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub atlas_coordinates: Option<Vec<CoordinateRecord>>,
}

impl AtlasDocument {
    /// Parse a document.
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Pretty-printed JSON.
    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Read a document from any reader.
    pub fn read_from<R: Read>(reader: R) -> Result<Self> {
        Ok(serde_json::from_reader(std::io::BufReader::new(reader))?)
    }

    /// Write a document to any writer.
    pub fn write_to<W: Write>(&self, mut writer: W) -> Result<()> {
        serde_json::to_writer_pretty(&mut writer, self)?;
        writer.write_all(b"\n")?;
        writer.flush()?;
        Ok(())
    }

    fn edges(&self, set: EdgeSet) -> &[EdgeRecord] {
        match set {
            EdgeSet::Strip => &self.strip,
            EdgeSet::Surface => &self.surface,
            EdgeSet::Region => &self.region,
        }
    }
}

impl Atlas {
    /// Rebuild an atlas, validating through the normal store operations.
    pub fn from_document(document: AtlasDocument, policy: RelaxationPolicy) -> Result<Self> {
        if document.schema_version != LUMEN_ATLAS_SCHEMA_VERSION {
            return Err(AtlasError::UnsupportedSchema(document.schema_version));
        }

        let mut nodes = NodeStore::new();
        for node in document.nodes.iter().cloned() {
            nodes.restore(node)?;
        }

        let mut graph = MultiGraphStore::new();
        for set in EdgeSet::ALL {
            for &EdgeRecord(a, b, weight) in document.edges(set) {
                graph.upsert_edge(&nodes, set, a, b, weight)?;
            }
        }

        // Producers may group observations by node; the ledger needs them in
        // sequence order. Duplicate sequences still fail as regressions.
        let mut observations = document.observations;
        observations.sort_by_key(|o| o.sequence);
        let mut ledger = ObservationLedger::new();
        for observation in observations {
            ledger.restore(&nodes, observation)?;
        }

        let mut relaxation = RelaxationEngine::new(policy);
        let cached = document.atlas_coordinates.is_some();
        for record in document.atlas_coordinates.unwrap_or_default() {
            nodes.require(record.node)?;
            relaxation.restore(
                record.node,
                Placement {
                    position: record.position,
                    seed: record.seed,
                    source: record.source,
                    revision: 0,
                },
            )?;
        }

        let mut atlas = Atlas::from_parts(nodes, graph, ledger, relaxation);
        if !cached {
            let placed = atlas.place_observed();
            tracing::debug!(placed, "coordinates re-seeded from observations");
        }
        tracing::info!(
            nodes = atlas.nodes().len(),
            observations = atlas.ledger().len(),
            placed = atlas.coordinates().len(),
            "atlas document loaded"
        );
        Ok(atlas)
    }

    /// Serialize the atlas in canonical order.
    pub fn to_document(&self, include_coordinates: bool) -> AtlasDocument {
        let edges = |set: EdgeSet| -> Vec<EdgeRecord> {
            self.graph()
                .all_edges(set)
                .map(|(a, b, w)| EdgeRecord(a, b, w))
                .collect()
        };
        let atlas_coordinates = include_coordinates.then(|| {
            self.coordinates()
                .iter()
                .map(|(node, p)| CoordinateRecord {
                    node,
                    position: p.position,
                    seed: p.seed,
                    source: p.source,
                })
                .collect()
        });

        AtlasDocument {
            schema_version: LUMEN_ATLAS_SCHEMA_VERSION.to_string(),
            nodes: self.nodes().iter().cloned().collect(),
            strip: edges(EdgeSet::Strip),
            surface: edges(EdgeSet::Surface),
            region: edges(EdgeSet::Region),
            observations: self.ledger().iter().cloned().collect(),
            atlas_coordinates,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::NodeMetadata;

    const MINIMAL: &str = r#"{
        "schema_version": "lumen_atlas_v1",
        "nodes": [
            {"id": 3, "metadata": {"region": "collar"}, "created_at": "2026-01-01T00:00:00Z"},
            {"id": 7, "created_at": "2026-01-01T00:00:00Z", "active": false}
        ],
        "strip": [[3, 7, 1.0]],
        "observations": [{"sequence": 4, "node": 3, "camera_position": {"x": 1.5, "y": -2.0}}]
    }"#;

    #[test]
    fn test_load_minimal_document() {
        let doc = AtlasDocument::from_json_str(MINIMAL).unwrap();
        let atlas = Atlas::from_document(doc, RelaxationPolicy::default()).unwrap();

        assert_eq!(atlas.nodes().len(), 2);
        assert!(atlas.nodes().is_active(NodeId::new(3)));
        assert!(!atlas.nodes().is_active(NodeId::new(7)));
        assert_eq!(atlas.graph().weight(EdgeSet::Strip, NodeId::new(7), NodeId::new(3)), Some(1.0));
        assert_eq!(atlas.ledger().last_sequence(), 4);
        // No cached coordinates: observed nodes are re-seeded.
        assert_eq!(atlas.coordinates().position(NodeId::new(3)), Some(Vec2::new(1.5, -2.0)));
        assert!(!atlas.coordinates().is_placed(NodeId::new(7)));
    }

    #[test]
    fn test_invalid_documents_rejected() {
        let wrong_schema = MINIMAL.replace("lumen_atlas_v1", "lumen_atlas_v0");
        let doc = AtlasDocument::from_json_str(&wrong_schema).unwrap();
        assert!(matches!(
            Atlas::from_document(doc, RelaxationPolicy::default()),
            Err(AtlasError::UnsupportedSchema(_))
        ));

        let dangling = MINIMAL.replace("[[3, 7, 1.0]]", "[[3, 9, 1.0]]");
        let doc = AtlasDocument::from_json_str(&dangling).unwrap();
        assert!(matches!(
            Atlas::from_document(doc, RelaxationPolicy::default()),
            Err(AtlasError::UnknownNode(_))
        ));

        assert!(matches!(
            AtlasDocument::from_json_str("{not json"),
            Err(AtlasError::Serialization(_))
        ));
    }

    const GROUPED_BY_NODE: &str = r#"{
        "schema_version": "lumen_atlas_v1",
        "nodes": [
            {"id": 0, "created_at": "2026-01-01T00:00:00Z"},
            {"id": 1, "created_at": "2026-01-01T00:00:00Z"}
        ],
        "observations": [
            {"sequence": 1, "node": 0, "camera_position": {"x": 0.0, "y": 0.0}},
            {"sequence": 3, "node": 0, "camera_position": {"x": 2.0, "y": 0.0}},
            {"sequence": 2, "node": 1, "camera_position": {"x": 10.0, "y": 0.0}}
        ]
    }"#;

    #[test]
    fn test_observations_in_any_order_load() {
        let doc = AtlasDocument::from_json_str(GROUPED_BY_NODE).unwrap();
        let atlas = Atlas::from_document(doc, RelaxationPolicy::default()).unwrap();

        assert_eq!(atlas.ledger().len(), 3);
        assert_eq!(atlas.ledger().last_sequence(), 3);
        let first: Vec<u64> = atlas
            .ledger()
            .observations_for(NodeId::new(0))
            .map(|o| o.sequence)
            .collect();
        assert_eq!(first, vec![1, 3]);

        // Saving emits sequence order.
        let saved: Vec<u64> = atlas
            .to_document(false)
            .observations
            .iter()
            .map(|o| o.sequence)
            .collect();
        assert_eq!(saved, vec![1, 2, 3]);
    }

    #[test]
    fn test_duplicate_observation_sequence_rejected() {
        let duplicated = GROUPED_BY_NODE.replace(r#""sequence": 2"#, r#""sequence": 3"#);
        let doc = AtlasDocument::from_json_str(&duplicated).unwrap();
        assert!(matches!(
            Atlas::from_document(doc, RelaxationPolicy::default()),
            Err(AtlasError::SequenceRegression { sequence: 3, last: 3 })
        ));
    }

    #[test]
    fn test_coordinates_are_optional_cache() {
        let mut atlas = Atlas::default();
        let a = atlas.create_node(NodeMetadata::new());
        atlas.place_manually(a, Vec2::new(2.0, 2.0)).unwrap();

        let without = atlas.to_document(false);
        assert!(without.atlas_coordinates.is_none());
        assert!(!without.to_json_string().unwrap().contains("atlas_coordinates"));

        let with = atlas.to_document(true);
        let restored = Atlas::from_document(with, RelaxationPolicy::default()).unwrap();
        let placement = restored.coordinates().placement(a).unwrap();
        assert_eq!(placement.position, Vec2::new(2.0, 2.0));
        assert_eq!(placement.source, PlacementSource::Manual);
    }

    #[test]
    fn test_write_then_read() {
        let doc = AtlasDocument::from_json_str(MINIMAL).unwrap();
        let mut buf = Vec::new();
        doc.write_to(&mut buf).unwrap();
        let back = AtlasDocument::read_from(buf.as_slice()).unwrap();
        assert_eq!(back, doc);
    }
}
