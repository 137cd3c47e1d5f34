//! Atlas: incremental construction and relaxation of atlas coordinates.
//!
//! The atlas turns sparse, noisy camera observations of lit nodes into a
//! stable 2D coordinate per node, refined as more evidence arrives:
//!
//! 1. **Assign**: seed a newly observed node from its camera position,
//!    re-projected through placed neighbors
//! 2. **Relax**: force-directed refinement over all three edge sets
//! 3. **Export**: derived 2D/3D embeddings for visualization
//! 4. **Snapshot**: fingerprint of the state an export was derived from
//!
//! ## Architecture
//!
//! ```text
//! observation → ObservationLedger → CoordinateAssigner → RelaxationEngine → EmbeddingExporter
//!                                        ↑                     ↑
//!                                  MultiGraphStore (strip / surface / region)
//! ```
//!
//! ## Core Contract
//!
//! Atlas coordinates are a navigation aid, never geometric ground truth.
//! Given the same state, export produces a bit-identical embedding.

pub mod assigner;
pub mod embedding;
pub mod proximity;
pub mod relaxation;
pub mod shared;
pub mod snapshot;
pub mod state;

// Re-exports
pub use assigner::{AnchorKind, CoordinateAssigner, SeedAssignment};
pub use embedding::{Dimensions, EmbeddedPoint, Embedding, EmbeddingExporter};
pub use proximity::{estimate_surface_edges, ProximityEstimate, ProximityParams};
pub use relaxation::{
    relax_input, AtlasCoordinates, CancellationToken, Placement, PlacementSource,
    RelaxationEngine, RelaxationInput, RelaxationOutcome, RelaxationReport,
};
pub use shared::{CacheConfig, CacheStats, SharedAtlas};
pub use snapshot::AtlasSnapshot;
pub use state::{Atlas, ScanStep};
