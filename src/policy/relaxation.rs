//! RelaxationPolicy v1: force constants, step control and termination.
//!
//! ## Float Normalization for Deterministic Hashing
//!
//! Floats are quantized to integers before hashing (×1e6, rounded to i64)
//! so the `params_hash` of a policy is stable across platforms and
//! serde_json versions.

use serde::{Deserialize, Serialize};

use crate::canonical::{canonical_hash_hex, quantize};
use crate::DEFAULT_POLICY_VERSION;

/// Force multipliers for each constraint family.
///
/// Higher multiplier = stronger influence on layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForceWeights {
    /// Spring stiffness of `strip` edges.
    pub strip_stiffness: f64,
    /// Attraction multiplier of `surface` edges.
    pub surface_attraction: f64,
    /// Pull toward the region-cluster centroid. Kept small so semantic
    /// grouping never dominates wiring and surface forces.
    pub region_attraction: f64,
    /// Global pairwise repulsion strength.
    pub repulsion_strength: f64,
    /// Pull toward each node's observation-derived seed.
    pub anchor_strength: f64,
}

impl Default for ForceWeights {
    fn default() -> Self {
        Self {
            strip_stiffness: 0.1,
            surface_attraction: 0.05,
            region_attraction: 0.01,
            repulsion_strength: 0.01,
            anchor_strength: 0.05,
        }
    }
}

impl ForceWeights {
    fn to_quantized(&self) -> QuantizedForceWeights {
        QuantizedForceWeights {
            strip_stiffness: quantize(self.strip_stiffness),
            surface_attraction: quantize(self.surface_attraction),
            region_attraction: quantize(self.region_attraction),
            repulsion_strength: quantize(self.repulsion_strength),
            anchor_strength: quantize(self.anchor_strength),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
struct QuantizedForceWeights {
    strip_stiffness: i64,
    surface_attraction: i64,
    region_attraction: i64,
    repulsion_strength: i64,
    anchor_strength: i64,
}

#[derive(Debug, Clone, Serialize)]
struct QuantizedPolicyParams {
    version: String,
    forces: QuantizedForceWeights,
    strip_distance: i64,
    surface_min_distance: i64,
    repulsion_cap: i64,
    max_step: i64,
    max_iterations: usize,
    epsilon: i64,
    min_distance: i64,
    seed_window: usize,
    min_anchor_scale: i64,
    max_anchor_scale: i64,
    layer_offset: i64,
}

/// Tunable parameters for seeding, relaxation and export.
///
/// ## Parameters
///
/// - `strip_distance`: expected wiring pitch in atlas units (`d_strip`)
/// - `surface_min_distance`: floor below which surface attraction turns into repulsion
/// - `repulsion_cap`: maximum magnitude of the pairwise repulsion
/// - `max_step`: per-node displacement clamp per iteration
/// - `max_iterations`: iteration budget
/// - `epsilon`: convergence threshold on the largest displacement
/// - `min_distance`: distances below this contribute no force
/// - `seed_window`: observations averaged when seeding a node
/// - `min_anchor_scale` / `max_anchor_scale`: clamp for the seeding similarity scale
/// - `layer_offset`: z spacing between surface layers in 3D export
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RelaxationPolicy {
    /// Policy version identifier.
    pub version: String,
    /// Force multipliers.
    pub forces: ForceWeights,
    /// Target separation of strip neighbors.
    pub strip_distance: f64,
    /// Surface attraction floor.
    pub surface_min_distance: f64,
    /// Cap on repulsion magnitude.
    pub repulsion_cap: f64,
    /// Maximum displacement per node per iteration.
    pub max_step: f64,
    /// Iteration budget.
    pub max_iterations: usize,
    /// Convergence threshold.
    pub epsilon: f64,
    /// Degenerate-distance guard.
    pub min_distance: f64,
    /// Observation window used for seeding.
    pub seed_window: usize,
    /// Lower clamp of the seeding scale.
    pub min_anchor_scale: f64,
    /// Upper clamp of the seeding scale.
    pub max_anchor_scale: f64,
    /// Spacing between embedding layers.
    pub layer_offset: f64,
}

impl Default for RelaxationPolicy {
    fn default() -> Self {
        Self {
            version: DEFAULT_POLICY_VERSION.to_string(),
            forces: ForceWeights::default(),
            strip_distance: 1.0,
            surface_min_distance: 0.5,
            repulsion_cap: 0.1,
            max_step: 0.25,
            max_iterations: 500,
            epsilon: 1e-4,
            min_distance: 1e-9,
            seed_window: 5,
            min_anchor_scale: 0.01,
            max_anchor_scale: 100.0,
            layer_offset: 1.0,
        }
    }
}

impl RelaxationPolicy {
    /// Get the policy ID.
    pub fn policy_id(&self) -> &str {
        &self.version
    }

    /// Override the iteration budget.
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// Override the convergence threshold.
    pub fn with_epsilon(mut self, epsilon: f64) -> Self {
        self.epsilon = epsilon;
        self
    }

    /// Compute a hash of the policy parameters over quantized floats.
    pub fn params_hash(&self) -> String {
        canonical_hash_hex(&self.to_quantized())
    }

    fn to_quantized(&self) -> QuantizedPolicyParams {
        QuantizedPolicyParams {
            version: self.version.clone(),
            forces: self.forces.to_quantized(),
            strip_distance: quantize(self.strip_distance),
            surface_min_distance: quantize(self.surface_min_distance),
            repulsion_cap: quantize(self.repulsion_cap),
            max_step: quantize(self.max_step),
            max_iterations: self.max_iterations,
            epsilon: quantize(self.epsilon),
            min_distance: quantize(self.min_distance),
            seed_window: self.seed_window,
            min_anchor_scale: quantize(self.min_anchor_scale),
            max_anchor_scale: quantize(self.max_anchor_scale),
            layer_offset: quantize(self.layer_offset),
        }
    }

    /// Parse a policy from JSON; missing fields take their defaults.
    pub fn from_json_str(json: &str) -> crate::Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}
