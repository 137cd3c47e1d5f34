//! Single-threaded atlas state.
//!
//! `Atlas` composes the node store, the three edge sets, the observation
//! ledger and the relaxation engine, and is the entry point for the
//! incremental "scan, place, relax" workflow. Every mutating method
//! validates before it writes, so a failed call leaves the state untouched.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::policy::RelaxationPolicy;
use crate::store::{MultiGraphStore, NodeStore, ObservationLedger};
use crate::types::{
    EdgeSet, EdgeUpsert, MetadataPatch, Node, NodeId, NodeMetadata, ObservationId, Result,
    SessionId, Vec2,
};
use super::assigner::{CoordinateAssigner, SeedAssignment};
use super::embedding::{Dimensions, Embedding, EmbeddingExporter};
use super::proximity::{estimate_surface_edges, ProximityParams};
use super::relaxation::{
    AtlasCoordinates, CancellationToken, PlacementSource, RelaxationEngine, RelaxationInput,
    RelaxationOutcome, RelaxationReport,
};
use super::snapshot::AtlasSnapshot;

/// Result of one scan step: an observation plus the placement it produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanStep {
    /// Recorded observation.
    pub observation: ObservationId,
    /// Atlas position after placement, `None` if placement was not possible.
    pub position: Option<Vec2>,
}

/// Nodes, edges, observations and coordinates of one surface.
#[derive(Debug, Clone)]
pub struct Atlas {
    nodes: NodeStore,
    graph: MultiGraphStore,
    ledger: ObservationLedger,
    relaxation: RelaxationEngine,
    revision: u64,
}

impl Default for Atlas {
    fn default() -> Self {
        Self::new(RelaxationPolicy::default())
    }
}

impl Atlas {
    /// Create an empty atlas.
    pub fn new(policy: RelaxationPolicy) -> Self {
        Self::from_parts(
            NodeStore::new(),
            MultiGraphStore::new(),
            ObservationLedger::new(),
            RelaxationEngine::new(policy),
        )
    }

    pub(crate) fn from_parts(
        nodes: NodeStore,
        graph: MultiGraphStore,
        ledger: ObservationLedger,
        relaxation: RelaxationEngine,
    ) -> Self {
        Self {
            nodes,
            graph,
            ledger,
            relaxation,
            revision: 0,
        }
    }

    // ─────────────────────────────────────────────────────────────────────
    // Read access
    // ─────────────────────────────────────────────────────────────────────

    /// Node store.
    pub fn nodes(&self) -> &NodeStore {
        &self.nodes
    }

    /// Edge sets.
    pub fn graph(&self) -> &MultiGraphStore {
        &self.graph
    }

    /// Observation ledger.
    pub fn ledger(&self) -> &ObservationLedger {
        &self.ledger
    }

    /// Atlas coordinates.
    pub fn coordinates(&self) -> &AtlasCoordinates {
        self.relaxation.coordinates()
    }

    /// Active relaxation policy.
    pub fn policy(&self) -> &RelaxationPolicy {
        self.relaxation.policy()
    }

    /// Counter bumped by every successful mutation.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Look up a node.
    pub fn node(&self, id: NodeId) -> Result<&Node> {
        self.nodes.get(id)
    }

    /// Neighbors of a node within one edge set.
    pub fn neighbors(&self, set: EdgeSet, node: NodeId) -> Result<BTreeSet<NodeId>> {
        self.nodes.require(node)?;
        Ok(self.graph.neighbors(set, node))
    }

    fn touch(&mut self) {
        self.revision += 1;
    }

    // ─────────────────────────────────────────────────────────────────────
    // Nodes
    // ─────────────────────────────────────────────────────────────────────

    /// Insert a node with a store-assigned identity.
    pub fn create_node(&mut self, metadata: NodeMetadata) -> NodeId {
        let id = self.nodes.create_node(metadata);
        self.touch();
        id
    }

    /// Insert a node under an externally supplied identity.
    pub fn declare_node(&mut self, id: NodeId, metadata: NodeMetadata) -> Result<NodeId> {
        let id = self.nodes.declare_node(id, metadata)?;
        self.touch();
        Ok(id)
    }

    /// Patch a node's metadata.
    pub fn update_metadata(&mut self, id: NodeId, patch: &MetadataPatch) -> Result<()> {
        self.nodes.update_metadata(id, patch)?;
        self.touch();
        Ok(())
    }

    /// Exclude a node from relaxation and export. Edges, observations and
    /// its placement are kept.
    pub fn deactivate(&mut self, id: NodeId) -> Result<()> {
        self.nodes.set_active(id, false)?;
        self.touch();
        Ok(())
    }

    /// Undo [`Atlas::deactivate`].
    pub fn reactivate(&mut self, id: NodeId) -> Result<()> {
        self.nodes.set_active(id, true)?;
        self.touch();
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────
    // Edges
    // ─────────────────────────────────────────────────────────────────────

    /// Insert or reweight an edge in one set.
    pub fn upsert_edge(&mut self, set: EdgeSet, a: NodeId, b: NodeId, weight: f64) -> Result<EdgeUpsert> {
        let outcome = self.graph.upsert_edge(&self.nodes, set, a, b, weight)?;
        self.touch();
        Ok(outcome)
    }

    /// Remove an edge, returning its weight if it existed.
    pub fn remove_edge(&mut self, set: EdgeSet, a: NodeId, b: NodeId) -> Option<f64> {
        let removed = self.graph.remove_edge(set, a, b);
        if removed.is_some() {
            self.touch();
        }
        removed
    }

    /// Upsert proximity-estimated `surface` edges, never lowering an
    /// existing weight. Returns the number of edges inserted or raised.
    pub fn reinforce_surface(&mut self, params: &ProximityParams) -> Result<usize> {
        let estimates = estimate_surface_edges(&self.nodes, &self.ledger, params);
        let mut changed = 0;
        for estimate in estimates {
            let current = self.graph.weight(EdgeSet::Surface, estimate.a, estimate.b);
            if current.is_some_and(|w| w >= estimate.weight) {
                continue;
            }
            self.graph
                .upsert_edge(&self.nodes, EdgeSet::Surface, estimate.a, estimate.b, estimate.weight)?;
            changed += 1;
        }
        if changed > 0 {
            self.touch();
        }
        tracing::debug!(changed, "surface reinforced");
        Ok(changed)
    }

    /// Age `surface` evidence. Returns the number of edges pruned.
    ///
    /// `factor` and `prune_below` must lie in [0, 1]. The revision only
    /// moves when a weight changed or an edge was dropped.
    pub fn decay_surface(&mut self, factor: f64, prune_below: f64) -> Result<usize> {
        let decay = self.graph.decay_surface(factor, prune_below)?;
        if !decay.is_noop() {
            self.touch();
        }
        Ok(decay.pruned)
    }

    // ─────────────────────────────────────────────────────────────────────
    // Observations and placement
    // ─────────────────────────────────────────────────────────────────────

    /// Append a camera observation.
    pub fn record_observation(
        &mut self,
        node: NodeId,
        camera_position: Vec2,
        session: Option<SessionId>,
    ) -> Result<ObservationId> {
        let id = self.ledger.append(&self.nodes, node, camera_position, session)?;
        self.touch();
        Ok(id)
    }

    /// Seed a node from its observations and placed neighbors.
    ///
    /// A manually placed node is left where it is. Already placed observed
    /// nodes only retarget their anchor.
    pub fn place(&mut self, node: NodeId) -> Result<Vec2> {
        self.nodes.require(node)?;
        if let Some(placement) = self.coordinates().placement(node) {
            if placement.source == PlacementSource::Manual {
                return Ok(placement.position);
            }
        }
        let assignment = self.assigner().assign(node, None)?;
        Ok(self.apply_seed(node, &assignment))
    }

    /// Pin a node to an explicit atlas position.
    pub fn place_manually(&mut self, node: NodeId, position: Vec2) -> Result<Vec2> {
        self.nodes.require(node)?;
        let assignment = self.assigner().assign(node, Some(position))?;
        Ok(self.apply_seed(node, &assignment))
    }

    /// Record an observation and place the node in one step.
    ///
    /// The observation is kept even when placement fails.
    pub fn observe_and_place(
        &mut self,
        node: NodeId,
        camera_position: Vec2,
        session: Option<SessionId>,
    ) -> Result<ScanStep> {
        let observation = self.record_observation(node, camera_position, session)?;
        let position = match self.place(node) {
            Ok(position) => Some(position),
            Err(err) => {
                tracing::warn!(node = %node, error = %err, "observation recorded but node not placed");
                None
            }
        };
        Ok(ScanStep {
            observation,
            position,
        })
    }

    /// Place every unplaced node that has observations, in ascending id
    /// order. Returns the number of nodes placed.
    pub fn place_observed(&mut self) -> usize {
        let mut pending: Vec<NodeId> = self
            .nodes
            .iter()
            .map(|n| n.id)
            .filter(|&id| !self.coordinates().is_placed(id) && self.ledger.has_observations(id))
            .collect();
        pending.sort_unstable();

        let mut placed = 0;
        for id in pending {
            if self.place(id).is_ok() {
                placed += 1;
            }
        }
        placed
    }

    fn assigner(&self) -> CoordinateAssigner<'_> {
        CoordinateAssigner::new(
            &self.graph,
            &self.ledger,
            self.relaxation.coordinates(),
            self.relaxation.policy(),
        )
    }

    fn apply_seed(&mut self, node: NodeId, assignment: &SeedAssignment) -> Vec2 {
        let position = self.relaxation.seed(node, assignment);
        self.touch();
        position
    }

    // ─────────────────────────────────────────────────────────────────────
    // Relaxation and export
    // ─────────────────────────────────────────────────────────────────────

    /// Snapshot the inputs of a relaxation run.
    pub fn prepare_relaxation(&self) -> RelaxationInput {
        self.relaxation.prepare(&self.nodes, &self.graph)
    }

    /// Write relaxed positions back; fills in `report.committed`.
    pub fn commit_relaxation(&mut self, outcome: &mut RelaxationOutcome) -> usize {
        let committed = self.relaxation.commit(outcome);
        outcome.report.committed = committed;
        if committed > 0 {
            self.touch();
        }
        committed
    }

    /// Run relaxation to convergence, budget exhaustion or cancellation.
    pub fn relax(&mut self, cancel: &CancellationToken) -> Result<RelaxationReport> {
        let report = self.relaxation.relax(&self.nodes, &self.graph, cancel)?;
        if report.committed > 0 {
            self.touch();
        }
        Ok(report)
    }

    /// Fingerprint of the current state.
    pub fn snapshot(&self) -> AtlasSnapshot {
        AtlasSnapshot::compute(self)
    }

    /// Export placed, active nodes.
    pub fn export(&self, dimensions: Dimensions) -> Embedding {
        EmbeddingExporter::new(
            &self.nodes,
            &self.graph,
            self.relaxation.coordinates(),
            self.policy().layer_offset,
        )
        .export(dimensions, self.snapshot().snapshot_id)
    }
}
