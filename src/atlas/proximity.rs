//! Surface proximity estimation from camera observations.
//!
//! Proposes `surface` edges between active nodes whose averaged camera
//! positions are close. Only ever feeds the `surface` set; wiring and
//! semantic regions stay human- or hardware-defined.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::store::{NodeStore, ObservationLedger};
use crate::types::{NodeId, SessionId, Vec2};

/// Parameters for proximity estimation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProximityParams {
    /// Camera-space radius within which two nodes count as adjacent.
    pub radius: f64,
    /// Observations averaged per node.
    pub window: usize,
    /// Only pair nodes seen in at least one common session.
    ///
    /// Observations recorded without a session belong to no session, so a
    /// node observed only that way is never paired while this is set (the
    /// default). Clear it to estimate from session-less scans.
    pub same_session_only: bool,
}

impl Default for ProximityParams {
    fn default() -> Self {
        Self {
            radius: 20.0,
            window: 5,
            same_session_only: true,
        }
    }
}

/// A proposed surface edge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProximityEstimate {
    /// Smaller endpoint.
    pub a: NodeId,
    /// Larger endpoint.
    pub b: NodeId,
    /// Camera-space distance between the averaged positions.
    pub distance: f64,
    /// Confidence `1 - distance / radius`, in (0, 1].
    pub weight: f64,
}

/// Propose surface edges for every close pair of observed, active nodes.
///
/// Pairs are returned in ascending `(a, b)` order.
pub fn estimate_surface_edges(
    nodes: &NodeStore,
    ledger: &ObservationLedger,
    params: &ProximityParams,
) -> Vec<ProximityEstimate> {
    if params.radius.is_nan() || params.radius <= 0.0 {
        return Vec::new();
    }

    let mut observed: Vec<(NodeId, Vec2, BTreeSet<&SessionId>)> = nodes
        .list_active()
        .filter_map(|node| {
            let mean = ledger.mean_position(node.id, params.window)?;
            let sessions: BTreeSet<&SessionId> = ledger
                .observations_for(node.id)
                .filter_map(|o| o.session.as_ref())
                .collect();
            Some((node.id, mean, sessions))
        })
        .collect();
    observed.sort_by_key(|(id, _, _)| *id);

    let mut estimates = Vec::new();
    for (i, (a, pa, sa)) in observed.iter().enumerate() {
        for (b, pb, sb) in &observed[i + 1..] {
            if params.same_session_only && sa.is_disjoint(sb) {
                continue;
            }
            let distance = pa.distance(*pb);
            if distance < params.radius {
                estimates.push(ProximityEstimate {
                    a: *a,
                    b: *b,
                    distance,
                    weight: 1.0 - distance / params.radius,
                });
            }
        }
    }
    tracing::debug!(candidates = observed.len(), proposed = estimates.len(), "surface proximity estimated");
    estimates
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::NodeMetadata;

    #[test]
    fn test_close_pairs_only() {
        let mut nodes = NodeStore::new();
        let a = nodes.create_node(NodeMetadata::new());
        let b = nodes.create_node(NodeMetadata::new());
        let c = nodes.create_node(NodeMetadata::new());
        let mut ledger = ObservationLedger::new();
        let s = Some(SessionId::new("s1"));
        ledger.append(&nodes, a, Vec2::new(0.0, 0.0), s.clone()).unwrap();
        ledger.append(&nodes, b, Vec2::new(5.0, 0.0), s.clone()).unwrap();
        ledger.append(&nodes, c, Vec2::new(100.0, 0.0), s).unwrap();

        let params = ProximityParams { radius: 10.0, ..ProximityParams::default() };
        let estimates = estimate_surface_edges(&nodes, &ledger, &params);

        assert_eq!(estimates.len(), 1);
        assert_eq!((estimates[0].a, estimates[0].b), (a, b));
        assert!((estimates[0].weight - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_session_filter() {
        let mut nodes = NodeStore::new();
        let a = nodes.create_node(NodeMetadata::new());
        let b = nodes.create_node(NodeMetadata::new());
        let mut ledger = ObservationLedger::new();
        ledger.append(&nodes, a, Vec2::new(0.0, 0.0), Some(SessionId::new("s1"))).unwrap();
        ledger.append(&nodes, b, Vec2::new(1.0, 0.0), Some(SessionId::new("s2"))).unwrap();

        let strict = ProximityParams::default();
        assert!(estimate_surface_edges(&nodes, &ledger, &strict).is_empty());

        let loose = ProximityParams { same_session_only: false, ..ProximityParams::default() };
        assert_eq!(estimate_surface_edges(&nodes, &ledger, &loose).len(), 1);
    }

    #[test]
    fn test_sessionless_observations_need_loose_params() {
        let mut nodes = NodeStore::new();
        let a = nodes.create_node(NodeMetadata::new());
        let b = nodes.create_node(NodeMetadata::new());
        let mut ledger = ObservationLedger::new();
        ledger.append(&nodes, a, Vec2::new(0.0, 0.0), None).unwrap();
        ledger.append(&nodes, b, Vec2::new(1.0, 0.0), None).unwrap();

        assert!(estimate_surface_edges(&nodes, &ledger, &ProximityParams::default()).is_empty());

        let loose = ProximityParams { same_session_only: false, ..ProximityParams::default() };
        let estimates = estimate_surface_edges(&nodes, &ledger, &loose);
        assert_eq!(estimates.len(), 1);
        assert_eq!((estimates[0].a, estimates[0].b), (a, b));
    }
}
