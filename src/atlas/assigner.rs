//! Initial atlas placement for newly observed nodes.
//!
//! The seed is the mean camera position of the node's recent observations,
//! re-projected into atlas space by a similarity transform fitted to placed
//! neighbors. Neighbors are searched `strip` first, then `surface`, then
//! `region`. This is only an initialization heuristic; the relaxation
//! engine owns final placement.

use serde::{Deserialize, Serialize};

use crate::policy::RelaxationPolicy;
use crate::store::{MultiGraphStore, ObservationLedger};
use crate::types::{AtlasError, EdgeSet, NodeId, Result, Vec2};
use super::relaxation::{AtlasCoordinates, PlacementSource};

/// How a seed was anchored to the existing atlas.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum AnchorKind {
    /// Manual placement, used verbatim.
    Manual,
    /// No placed neighbor: raw camera mean, unscaled.
    Raw,
    /// One placed neighbor: camera offset applied from its atlas position.
    Translation {
        /// Neighbor used as anchor.
        anchor: NodeId,
    },
    /// Two placed neighbors: rotation, uniform scale and translation.
    Similarity {
        /// Neighbors used as anchors.
        anchors: [NodeId; 2],
        /// Fitted (clamped) scale.
        scale: f64,
    },
}

/// Seed computed for one node.
#[derive(Debug, Clone, PartialEq)]
pub struct SeedAssignment {
    /// Atlas-space seed.
    pub seed: Vec2,
    /// Origin of the seed.
    pub source: PlacementSource,
    /// Anchoring used.
    pub anchor: AnchorKind,
}

#[derive(Debug, Clone, Copy)]
struct Anchor {
    node: NodeId,
    camera: Vec2,
    atlas: Vec2,
}

/// Computes seeds from observations and placed neighbors.
pub struct CoordinateAssigner<'a> {
    graph: &'a MultiGraphStore,
    ledger: &'a ObservationLedger,
    coordinates: &'a AtlasCoordinates,
    policy: &'a RelaxationPolicy,
}

impl<'a> CoordinateAssigner<'a> {
    /// Create an assigner over the current state.
    pub fn new(
        graph: &'a MultiGraphStore,
        ledger: &'a ObservationLedger,
        coordinates: &'a AtlasCoordinates,
        policy: &'a RelaxationPolicy,
    ) -> Self {
        Self {
            graph,
            ledger,
            coordinates,
            policy,
        }
    }

    /// Compute a seed for `node`.
    ///
    /// A manual placement wins over observations. Fails with
    /// `NoObservationAndNoManualPlacement` when neither exists and with
    /// `NonFinitePosition` for a NaN/infinite manual placement.
    pub fn assign(&self, node: NodeId, manual: Option<Vec2>) -> Result<SeedAssignment> {
        if let Some(position) = manual {
            if !position.is_finite() {
                return Err(AtlasError::NonFinitePosition(node));
            }
            return Ok(SeedAssignment {
                seed: position,
                source: PlacementSource::Manual,
                anchor: AnchorKind::Manual,
            });
        }

        let camera = self
            .ledger
            .mean_position(node, self.policy.seed_window)
            .ok_or(AtlasError::NoObservationAndNoManualPlacement(node))?;

        let (seed, anchor) = match self.anchors(node) {
            (Some(first), Some(second)) => self.similarity(camera, first, second),
            (Some(first), None) => (
                first.atlas + (camera - first.camera),
                AnchorKind::Translation { anchor: first.node },
            ),
            _ => (camera, AnchorKind::Raw),
        };

        tracing::debug!(node = %node, x = seed.x, y = seed.y, ?anchor, "seed assigned");
        Ok(SeedAssignment {
            seed,
            source: PlacementSource::Observed,
            anchor,
        })
    }

    /// First usable anchor plus the first later one at a distinct camera
    /// position.
    fn anchors(&self, node: NodeId) -> (Option<Anchor>, Option<Anchor>) {
        let mut first: Option<Anchor> = None;
        for set in EdgeSet::ALL {
            let Some(neighbors) = self.graph.edge_set(set).neighbors_ref(node) else {
                continue;
            };
            for &neighbor in neighbors {
                let Some(anchor) = self.anchor(neighbor) else {
                    continue;
                };
                match first {
                    None => first = Some(anchor),
                    Some(f) if f.node == anchor.node => {}
                    Some(f) => {
                        if f.camera.distance(anchor.camera) > self.policy.min_distance {
                            return (Some(f), Some(anchor));
                        }
                    }
                }
            }
        }
        (first, None)
    }

    fn anchor(&self, neighbor: NodeId) -> Option<Anchor> {
        let atlas = self.coordinates.position(neighbor)?;
        let camera = self.ledger.mean_position(neighbor, self.policy.seed_window)?;
        Some(Anchor {
            node: neighbor,
            camera,
            atlas,
        })
    }

    /// Map `camera` through the similarity `w = a·(z − z1) + w1` fitted on
    /// two correspondences, with |a| clamped to the configured range.
    fn similarity(&self, camera: Vec2, first: Anchor, second: Anchor) -> (Vec2, AnchorKind) {
        let translation = || {
            (
                first.atlas + (camera - first.camera),
                AnchorKind::Translation { anchor: first.node },
            )
        };
        let Some(mut a) = (second.atlas - first.atlas).complex_div(second.camera - first.camera) else {
            return translation();
        };
        let scale = a.length();
        if !scale.is_finite() || scale <= 0.0 {
            return translation();
        }
        let clamped = scale.clamp(self.policy.min_anchor_scale, self.policy.max_anchor_scale);
        a = a * (clamped / scale);

        let seed = first.atlas + a.complex_mul(camera - first.camera);
        (
            seed,
            AnchorKind::Similarity {
                anchors: [first.node, second.node],
                scale: clamped,
            },
        )
    }
}
