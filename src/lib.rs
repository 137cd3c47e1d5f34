//! # lumen-atlas
//!
//! Logical atlas construction for addressable light-emitting nodes embedded
//! in a deformable surface.
//!
//! The atlas answers one question:
//!
//! > Given sparse, noisy sightings of which node lit up where, where does
//! > each node sit in a stable 2D layout useful for authoring effects?
//!
//! ## Core Contract
//!
//! 1. Nodes are related by three independent edge sets: `strip` (electrical
//!    wiring, degree ≤ 2), `surface` (observed adjacency) and `region`
//!    (human-defined grouping)
//! 2. Observations seed atlas coordinates; force-directed relaxation refines
//!    them, interruptibly and incrementally
//! 3. Exports are derived views, bit-identical for identical state
//!
//! ## Architecture
//!
//! ```text
//! Scan → ObservationLedger → CoordinateAssigner → RelaxationEngine → Embedding
//!              ↓                                        ↑
//!          NodeStore ─────────── MultiGraphStore ───────┘
//! ```
//!
//! ## Determinism Guarantees
//!
//! - Same state + same policy → identical relaxation and export
//! - Edge ordering is canonical (low, high)
//! - Iteration over nodes and neighbors is by ascending `NodeId`

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod types;
pub mod policy;
pub mod store;
pub mod atlas;
pub mod traversal;
pub mod document;
pub mod canonical;

// Re-exports
pub use types::{
    AtlasError, EdgeKey, EdgeRecord, EdgeSet, EdgeUpsert, MetadataPatch, Node, NodeId,
    NodeMetadata, Observation, ObservationId, Result, SessionId, Vec2,
};
pub use policy::{ForceWeights, RelaxationPolicy};
pub use store::{
    EdgeSetOps, MultiGraphStore, NodeStore, ObservationLedger, SurfaceDecay,
    MAX_STRIP_DEGREE,
};
pub use canonical::{canonical_hash, canonical_hash_hex, to_canonical_bytes};
pub use document::{AtlasDocument, CoordinateRecord};
pub use traversal::{breadth_first, connected_components, region_boundary, shortest_hop_path};

// Atlas re-exports
pub use atlas::{
    Atlas, AtlasSnapshot, CancellationToken, Dimensions, EmbeddedPoint, Embedding,
    PlacementSource, ProximityParams, RelaxationReport, ScanStep, SharedAtlas,
};

/// Schema version of persisted atlas documents and snapshots.
/// Increment on breaking changes to any serialized type.
pub const LUMEN_ATLAS_SCHEMA_VERSION: &str = "lumen_atlas_v1";

/// Default policy version identifier.
pub const DEFAULT_POLICY_VERSION: &str = "relaxation_policy_v1";
