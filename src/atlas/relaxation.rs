//! Force-directed relaxation of atlas coordinates.
//!
//! The engine owns every atlas coordinate and is the only code that writes
//! them. A run is split in three steps so callers can keep locks short:
//!
//! ```text
//! prepare (read state) → relax_input (pure, lock-free) → commit (write state)
//! ```
//!
//! ## Algorithm
//!
//! 1. Snapshot placed, active nodes with their seeds and revisions
//! 2. Each iteration computes all forces from the previous positions:
//!    strip springs, surface attraction, region-centroid pull,
//!    capped pairwise repulsion, anchor pull toward the seed
//! 3. Clamp each displacement to `max_step`, apply all at once
//! 4. Stop when the largest displacement drops below `epsilon`,
//!    on budget exhaustion, or on cancellation (checked between iterations)

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};

use crate::policy::forces::{linear_pull, repulsion, spring, surface_pull};
use crate::policy::RelaxationPolicy;
use crate::store::{MultiGraphStore, NodeStore};
use crate::types::{AtlasError, EdgeSet, NodeId, Result, Vec2};
use super::assigner::SeedAssignment;

/// Where a node's seed came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlacementSource {
    /// Derived from camera observations.
    Observed,
    /// Set explicitly by a human.
    Manual,
}

/// Atlas coordinate of a placed node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Placement {
    /// Current atlas-space position.
    pub position: Vec2,
    /// Anchor target derived from evidence or manual placement.
    pub seed: Vec2,
    /// Origin of the seed.
    pub source: PlacementSource,
    /// Bumped whenever the seed is rewritten; relaxation commits skip
    /// nodes whose revision moved during the run.
    #[serde(skip)]
    pub revision: u64,
}

/// All atlas coordinates, keyed by node.
///
/// Read-only outside this module.
#[derive(Debug, Clone, Default)]
pub struct AtlasCoordinates {
    placements: BTreeMap<NodeId, Placement>,
    next_revision: u64,
}

impl AtlasCoordinates {
    /// Placement of a node, `None` while unplaced.
    pub fn placement(&self, node: NodeId) -> Option<&Placement> {
        self.placements.get(&node)
    }

    /// Position of a node, `None` while unplaced.
    pub fn position(&self, node: NodeId) -> Option<Vec2> {
        self.placements.get(&node).map(|p| p.position)
    }

    /// Whether a node has a coordinate.
    pub fn is_placed(&self, node: NodeId) -> bool {
        self.placements.contains_key(&node)
    }

    /// Placements in ascending node order.
    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &Placement)> + '_ {
        self.placements.iter().map(|(&id, p)| (id, p))
    }

    /// Number of placed nodes.
    pub fn len(&self) -> usize {
        self.placements.len()
    }

    /// Whether no node is placed.
    pub fn is_empty(&self) -> bool {
        self.placements.is_empty()
    }

    fn bump(&mut self) -> u64 {
        self.next_revision += 1;
        self.next_revision
    }
}

/// Cooperative cancellation flag for relaxation runs.
///
/// Cloning shares the flag; cancel from any thread.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    /// Create a new, un-cancelled token.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Whether cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Point-in-time, owned copy of everything a relaxation run reads.
///
/// Nodes are addressed by index into `ids` (ascending `NodeId`).
#[derive(Debug, Clone)]
pub struct RelaxationInput {
    ids: Vec<NodeId>,
    positions: Vec<Vec2>,
    seeds: Vec<Vec2>,
    revisions: Vec<u64>,
    strip: Vec<(usize, usize, f64)>,
    surface: Vec<(usize, usize, f64)>,
    clusters: Vec<Vec<usize>>,
}

impl RelaxationInput {
    /// Number of nodes taking part.
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Whether no node takes part.
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Participating nodes (ascending).
    pub fn ids(&self) -> &[NodeId] {
        &self.ids
    }

    /// Region clusters with at least two members, as node ids.
    pub fn region_clusters(&self) -> Vec<Vec<NodeId>> {
        self.clusters
            .iter()
            .map(|c| c.iter().map(|&i| self.ids[i]).collect())
            .collect()
    }
}

/// Summary of a relaxation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelaxationReport {
    /// Nodes that took part.
    pub nodes: usize,
    /// Iterations fully applied.
    pub iterations: usize,
    /// Largest per-node displacement of the last applied iteration.
    pub max_displacement: f64,
    /// Stopped because `max_displacement < epsilon`.
    pub converged: bool,
    /// Stopped by a cancellation request.
    pub cancelled: bool,
    /// Nodes whose position was written back.
    pub committed: usize,
    /// Wall-clock duration of the iterations.
    pub elapsed_ms: u64,
}

/// Positions produced by [`relax_input`], not yet committed.
#[derive(Debug, Clone)]
pub struct RelaxationOutcome {
    ids: Vec<NodeId>,
    positions: Vec<Vec2>,
    revisions: Vec<u64>,
    /// Run summary (`committed` is filled in by commit).
    pub report: RelaxationReport,
}

impl RelaxationOutcome {
    /// Relaxed position of a node, if it took part.
    pub fn position(&self, node: NodeId) -> Option<Vec2> {
        self.ids
            .binary_search(&node)
            .ok()
            .map(|i| self.positions[i])
    }
}

/// Owns atlas coordinates and refines them.
#[derive(Debug, Clone)]
pub struct RelaxationEngine {
    policy: RelaxationPolicy,
    coordinates: AtlasCoordinates,
}

impl RelaxationEngine {
    /// Create an engine with no placed nodes.
    pub fn new(policy: RelaxationPolicy) -> Self {
        Self {
            policy,
            coordinates: AtlasCoordinates::default(),
        }
    }

    /// Active policy.
    pub fn policy(&self) -> &RelaxationPolicy {
        &self.policy
    }

    /// Read access to all coordinates.
    pub fn coordinates(&self) -> &AtlasCoordinates {
        &self.coordinates
    }

    /// Placement of a node, if placed.
    pub fn placement(&self, node: NodeId) -> Option<&Placement> {
        self.coordinates.placement(node)
    }

    /// Current position of a node, if placed.
    pub fn position(&self, node: NodeId) -> Option<Vec2> {
        self.coordinates.position(node)
    }

    /// Number of placed nodes, active or not.
    pub fn placed_count(&self) -> usize {
        self.coordinates.len()
    }

    /// Write a seed produced by the coordinate assigner.
    ///
    /// An unplaced node starts at its seed. A placed node keeps its position
    /// and only retargets its anchor, except for manual placements, which
    /// move the node.
    pub fn seed(&mut self, node: NodeId, assignment: &SeedAssignment) -> Vec2 {
        let revision = self.coordinates.bump();
        let seed = assignment.seed;
        let source = assignment.source;
        let placement = self
            .coordinates
            .placements
            .entry(node)
            .or_insert(Placement {
                position: seed,
                seed,
                source,
                revision,
            });
        placement.seed = seed;
        placement.source = source;
        placement.revision = revision;
        if source == PlacementSource::Manual {
            placement.position = seed;
        }
        placement.position
    }

    /// Reinstate a persisted placement (document loading).
    pub fn restore(&mut self, node: NodeId, mut placement: Placement) -> Result<()> {
        if !placement.position.is_finite() || !placement.seed.is_finite() {
            return Err(AtlasError::NonFinitePosition(node));
        }
        placement.revision = self.coordinates.bump();
        self.coordinates.placements.insert(node, placement);
        Ok(())
    }

    /// Snapshot the inputs of a run: placed, active nodes and the edges
    /// between them.
    pub fn prepare(&self, nodes: &NodeStore, graph: &MultiGraphStore) -> RelaxationInput {
        let mut ids = Vec::new();
        let mut positions = Vec::new();
        let mut seeds = Vec::new();
        let mut revisions = Vec::new();
        for (id, placement) in self.coordinates.iter() {
            if !nodes.is_active(id) {
                continue;
            }
            ids.push(id);
            positions.push(placement.position);
            seeds.push(placement.seed);
            revisions.push(placement.revision);
        }
        let index: HashMap<NodeId, usize> = ids.iter().enumerate().map(|(i, &id)| (id, i)).collect();

        let indexed_edges = |set: EdgeSet| -> Vec<(usize, usize, f64)> {
            graph
                .all_edges(set)
                .filter_map(|(a, b, w)| Some((*index.get(&a)?, *index.get(&b)?, w)))
                .collect()
        };
        let strip = indexed_edges(EdgeSet::Strip);
        let surface = indexed_edges(EdgeSet::Surface);

        // Region clusters: region edges merged with shared region tags.
        let mut clusters = DisjointSet::new(ids.len());
        for (a, b, _) in indexed_edges(EdgeSet::Region) {
            clusters.union(a, b);
        }
        let mut first_with_tag: BTreeMap<&str, usize> = BTreeMap::new();
        for (i, &id) in ids.iter().enumerate() {
            let tag = nodes.get(id).ok().and_then(|n| n.metadata.region.as_deref());
            if let Some(tag) = tag {
                let root = *first_with_tag.entry(tag).or_insert(i);
                clusters.union(root, i);
            }
        }

        RelaxationInput {
            ids,
            positions,
            seeds,
            revisions,
            strip,
            surface,
            clusters: clusters.groups(),
        }
    }

    /// Write relaxed positions back.
    ///
    /// Nodes re-seeded since `prepare` (revision changed) or no longer placed
    /// are skipped. Returns the number of positions written.
    pub fn commit(&mut self, outcome: &RelaxationOutcome) -> usize {
        let mut committed = 0;
        for (i, id) in outcome.ids.iter().enumerate() {
            if let Some(placement) = self.coordinates.placements.get_mut(id) {
                if placement.revision == outcome.revisions[i] {
                    placement.position = outcome.positions[i];
                    committed += 1;
                }
            }
        }
        committed
    }

    /// Prepare, run and commit in one call.
    pub fn relax(
        &mut self,
        nodes: &NodeStore,
        graph: &MultiGraphStore,
        cancel: &CancellationToken,
    ) -> Result<RelaxationReport> {
        let input = self.prepare(nodes, graph);
        let mut outcome = relax_input(&input, &self.policy, cancel)?;
        outcome.report.committed = self.commit(&outcome);
        Ok(outcome.report)
    }
}

/// Run relaxation iterations over a prepared snapshot.
///
/// Pure function of its arguments. Fails with `EmptyGraph` when the snapshot
/// holds no node. On cancellation the positions of the last fully applied
/// iteration are returned.
pub fn relax_input(
    input: &RelaxationInput,
    policy: &RelaxationPolicy,
    cancel: &CancellationToken,
) -> Result<RelaxationOutcome> {
    if input.is_empty() {
        return Err(AtlasError::EmptyGraph);
    }

    let span = tracing::info_span!(
        "relaxation",
        nodes = input.len(),
        policy = %policy.policy_id(),
    );
    let _guard = span.enter();

    let start = Instant::now();
    let mut positions = input.positions.clone();
    let mut forces = vec![Vec2::ZERO; positions.len()];
    let mut iterations = 0;
    let mut max_displacement = 0.0;
    let mut converged = false;
    let mut cancelled = false;

    while iterations < policy.max_iterations {
        if cancel.is_cancelled() {
            cancelled = true;
            break;
        }

        accumulate_forces(input, policy, &positions, &mut forces);

        max_displacement = 0.0;
        for (position, force) in positions.iter_mut().zip(&forces) {
            let mut step = force.clamp_length(policy.max_step);
            if !step.is_finite() {
                step = Vec2::ZERO;
            }
            *position += step;
            max_displacement = f64::max(max_displacement, step.length());
        }
        iterations += 1;

        if max_displacement < policy.epsilon {
            converged = true;
            break;
        }
    }

    let elapsed_ms = start.elapsed().as_millis() as u64;
    tracing::info!(
        iterations,
        max_displacement,
        converged,
        cancelled,
        elapsed_ms,
        "relaxation finished"
    );

    Ok(RelaxationOutcome {
        ids: input.ids.clone(),
        positions,
        revisions: input.revisions.clone(),
        report: RelaxationReport {
            nodes: input.len(),
            iterations,
            max_displacement,
            converged,
            cancelled,
            committed: 0,
            elapsed_ms,
        },
    })
}

/// Sum every force acting on each node, reading only `positions`.
fn accumulate_forces(
    input: &RelaxationInput,
    policy: &RelaxationPolicy,
    positions: &[Vec2],
    forces: &mut [Vec2],
) {
    let weights = &policy.forces;
    let guard = policy.min_distance;
    forces.fill(Vec2::ZERO);

    for &(a, b, w) in &input.strip {
        let f = spring(
            positions[a],
            positions[b],
            policy.strip_distance,
            weights.strip_stiffness,
            w,
            guard,
        );
        forces[a] += f;
        forces[b] += f * -1.0;
    }

    for &(a, b, w) in &input.surface {
        let f = surface_pull(
            positions[a],
            positions[b],
            policy.surface_min_distance,
            weights.surface_attraction,
            w,
            guard,
        );
        forces[a] += f;
        forces[b] += f * -1.0;
    }

    for cluster in &input.clusters {
        let Some(centroid) = Vec2::mean(cluster.iter().map(|&i| positions[i])) else {
            continue;
        };
        for &i in cluster {
            forces[i] += linear_pull(positions[i], centroid, weights.region_attraction);
        }
    }

    for a in 0..positions.len() {
        for b in (a + 1)..positions.len() {
            let f = repulsion(
                positions[a],
                positions[b],
                weights.repulsion_strength,
                policy.repulsion_cap,
                guard,
            );
            forces[a] += f;
            forces[b] += f * -1.0;
        }
    }

    for (i, force) in forces.iter_mut().enumerate() {
        *force += linear_pull(positions[i], input.seeds[i], weights.anchor_strength);
    }
}

/// Union-find over snapshot indices.
struct DisjointSet {
    parent: Vec<usize>,
}

impl DisjointSet {
    fn new(n: usize) -> Self {
        Self {
            parent: (0..n).collect(),
        }
    }

    fn find(&mut self, mut x: usize) -> usize {
        while self.parent[x] != x {
            self.parent[x] = self.parent[self.parent[x]];
            x = self.parent[x];
        }
        x
    }

    fn union(&mut self, a: usize, b: usize) {
        let (ra, rb) = (self.find(a), self.find(b));
        if ra != rb {
            // Smaller index wins so roots are deterministic.
            let (lo, hi) = if ra < rb { (ra, rb) } else { (rb, ra) };
            self.parent[hi] = lo;
        }
    }

    /// Groups with two or more members, ordered by smallest member.
    fn groups(mut self) -> Vec<Vec<usize>> {
        let mut by_root: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
        for i in 0..self.parent.len() {
            let root = self.find(i);
            by_root.entry(root).or_default().push(i);
        }
        by_root.into_values().filter(|g| g.len() > 1).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::atlas::assigner::AnchorKind;
    use crate::types::NodeMetadata;

    fn observed(seed: Vec2) -> SeedAssignment {
        SeedAssignment {
            seed,
            source: PlacementSource::Observed,
            anchor: AnchorKind::Raw,
        }
    }

    fn manual(seed: Vec2) -> SeedAssignment {
        SeedAssignment {
            seed,
            source: PlacementSource::Manual,
            anchor: AnchorKind::Manual,
        }
    }

    #[test]
    fn test_empty_graph_fails() {
        let nodes = NodeStore::new();
        let graph = MultiGraphStore::new();
        let mut engine = RelaxationEngine::new(RelaxationPolicy::default());
        let err = engine.relax(&nodes, &graph, &CancellationToken::new()).unwrap_err();
        assert!(matches!(err, AtlasError::EmptyGraph));
    }

    #[test]
    fn test_inactive_nodes_are_excluded() {
        let mut nodes = NodeStore::new();
        let a = nodes.create_node(NodeMetadata::new());
        let b = nodes.create_node(NodeMetadata::new());
        nodes.set_active(b, false).unwrap();
        let graph = MultiGraphStore::new();
        let mut engine = RelaxationEngine::new(RelaxationPolicy::default());
        engine.seed(a, &observed(Vec2::new(0.0, 0.0)));
        engine.seed(b, &observed(Vec2::new(0.1, 0.0)));

        let input = engine.prepare(&nodes, &graph);
        assert_eq!(input.ids(), &[a]);
        assert_eq!(engine.placed_count(), 2);
        assert_eq!(engine.position(b), Some(Vec2::new(0.1, 0.0)));
    }

    #[test]
    fn test_seed_keeps_position_of_placed_node() {
        let mut engine = RelaxationEngine::new(RelaxationPolicy::default());
        let id = NodeId::new(1);
        assert_eq!(engine.seed(id, &observed(Vec2::new(1.0, 1.0))), Vec2::new(1.0, 1.0));
        assert_eq!(engine.seed(id, &observed(Vec2::new(5.0, 5.0))), Vec2::new(1.0, 1.0));
        assert_eq!(engine.placement(id).unwrap().seed, Vec2::new(5.0, 5.0));
        assert_eq!(engine.seed(id, &manual(Vec2::new(2.0, 0.0))), Vec2::new(2.0, 0.0));
    }

    #[test]
    fn test_single_node_stays_at_seed() {
        let mut nodes = NodeStore::new();
        let a = nodes.create_node(NodeMetadata::new());
        let graph = MultiGraphStore::new();
        let mut engine = RelaxationEngine::new(RelaxationPolicy::default());
        engine.seed(a, &observed(Vec2::new(3.0, -1.0)));

        let report = engine.relax(&nodes, &graph, &CancellationToken::new()).unwrap();
        assert!(report.converged);
        assert_eq!(report.iterations, 1);
        assert_eq!(engine.coordinates().position(a), Some(Vec2::new(3.0, -1.0)));
    }

    #[test]
    fn test_strip_spring_pulls_toward_pitch() {
        let mut nodes = NodeStore::new();
        let a = nodes.create_node(NodeMetadata::new());
        let b = nodes.create_node(NodeMetadata::new());
        let mut graph = MultiGraphStore::new();
        graph.upsert_edge(&nodes, EdgeSet::Strip, a, b, 1.0).unwrap();

        let mut policy = RelaxationPolicy::default();
        policy.forces.anchor_strength = 0.0;
        policy.forces.repulsion_strength = 0.0;
        let mut engine = RelaxationEngine::new(policy);
        engine.seed(a, &observed(Vec2::new(0.0, 0.0)));
        engine.seed(b, &observed(Vec2::new(4.0, 0.0)));

        let report = engine.relax(&nodes, &graph, &CancellationToken::new()).unwrap();
        assert!(report.converged);
        let pa = engine.coordinates().position(a).unwrap();
        let pb = engine.coordinates().position(b).unwrap();
        assert!((pa.distance(pb) - 1.0).abs() < 1e-2);
    }

    #[test]
    fn test_step_is_clamped() {
        let mut nodes = NodeStore::new();
        let a = nodes.create_node(NodeMetadata::new());
        let graph = MultiGraphStore::new();
        let policy = RelaxationPolicy::default().with_max_iterations(1);
        let mut engine = RelaxationEngine::new(policy.clone());
        engine.seed(a, &observed(Vec2::new(0.0, 0.0)));
        // Move the anchor far away without moving the node.
        engine.seed(a, &observed(Vec2::new(1000.0, 0.0)));

        let report = engine.relax(&nodes, &graph, &CancellationToken::new()).unwrap();
        assert_eq!(report.iterations, 1);
        assert!((report.max_displacement - policy.max_step).abs() < 1e-12);
    }

    #[test]
    fn test_cancelled_before_start_leaves_positions() {
        let mut nodes = NodeStore::new();
        let a = nodes.create_node(NodeMetadata::new());
        let b = nodes.create_node(NodeMetadata::new());
        let graph = MultiGraphStore::new();
        let mut engine = RelaxationEngine::new(RelaxationPolicy::default());
        engine.seed(a, &observed(Vec2::new(0.0, 0.0)));
        engine.seed(b, &observed(Vec2::new(0.01, 0.0)));

        let cancel = CancellationToken::new();
        cancel.cancel();
        let report = engine.relax(&nodes, &graph, &cancel).unwrap();

        assert!(report.cancelled);
        assert_eq!(report.iterations, 0);
        assert_eq!(engine.coordinates().position(b), Some(Vec2::new(0.01, 0.0)));
    }

    #[test]
    fn test_commit_skips_reseeded_nodes() {
        let mut nodes = NodeStore::new();
        let a = nodes.create_node(NodeMetadata::new());
        let b = nodes.create_node(NodeMetadata::new());
        let graph = MultiGraphStore::new();
        let mut engine = RelaxationEngine::new(RelaxationPolicy::default());
        engine.seed(a, &observed(Vec2::new(0.0, 0.0)));
        engine.seed(b, &observed(Vec2::new(0.2, 0.0)));

        let input = engine.prepare(&nodes, &graph);
        let outcome = relax_input(&input, engine.policy(), &CancellationToken::new()).unwrap();
        engine.seed(b, &manual(Vec2::new(9.0, 9.0)));

        assert_eq!(engine.commit(&outcome), 1);
        assert_eq!(engine.coordinates().position(b), Some(Vec2::new(9.0, 9.0)));
        assert_eq!(engine.coordinates().position(a), outcome.position(a));
    }

    #[test]
    fn test_region_clusters_merge_edges_and_tags() {
        let mut nodes = NodeStore::new();
        let a = nodes.create_node(NodeMetadata::new().with_region("hood"));
        let b = nodes.create_node(NodeMetadata::new());
        let c = nodes.create_node(NodeMetadata::new().with_region("hood"));
        let d = nodes.create_node(NodeMetadata::new());
        let mut graph = MultiGraphStore::new();
        graph.upsert_edge(&nodes, EdgeSet::Region, b, c, 1.0).unwrap();

        let mut engine = RelaxationEngine::new(RelaxationPolicy::default());
        for (i, id) in [a, b, c, d].into_iter().enumerate() {
            engine.seed(id, &observed(Vec2::new(i as f64, 0.0)));
        }

        let input = engine.prepare(&nodes, &graph);
        assert_eq!(input.region_clusters(), vec![vec![a, b, c]]);
    }

    #[test]
    fn test_relax_input_is_deterministic() {
        let mut nodes = NodeStore::new();
        let ids: Vec<NodeId> = (0..6).map(|_| nodes.create_node(NodeMetadata::new())).collect();
        let mut graph = MultiGraphStore::new();
        for w in ids.windows(2) {
            graph.upsert_edge(&nodes, EdgeSet::Strip, w[0], w[1], 1.0).unwrap();
        }
        graph.upsert_edge(&nodes, EdgeSet::Surface, ids[0], ids[5], 0.7).unwrap();

        let mut engine = RelaxationEngine::new(RelaxationPolicy::default());
        for (i, &id) in ids.iter().enumerate() {
            engine.seed(id, &observed(Vec2::new(i as f64 * 0.7, (i % 2) as f64)));
        }
        let input = engine.prepare(&nodes, &graph);
        let cancel = CancellationToken::new();
        let first = relax_input(&input, engine.policy(), &cancel).unwrap();
        let second = relax_input(&input, engine.policy(), &cancel).unwrap();

        for &id in &ids {
            let (p1, p2) = (first.position(id).unwrap(), second.position(id).unwrap());
            assert_eq!(p1.x.to_bits(), p2.x.to_bits());
            assert_eq!(p1.y.to_bits(), p2.y.to_bits());
        }
    }
}
