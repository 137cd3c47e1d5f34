//! Append-only ledger of camera observations.

use std::collections::HashMap;

use crate::types::{AtlasError, NodeId, Observation, ObservationId, Result, SessionId, Vec2};
use super::NodeStore;

/// Append-only record of camera observations.
///
/// Observations are stored in sequence order; `by_node` holds per-node
/// slot lists, which are therefore also sequence ordered.
#[derive(Debug, Clone, Default)]
pub struct ObservationLedger {
    observations: Vec<Observation>,
    by_node: HashMap<NodeId, Vec<usize>>,
    last_sequence: u64,
}

impl ObservationLedger {
    /// Create a new empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a sighting of `node` at `camera_position`.
    ///
    /// The sequence number is assigned here and strictly increases.
    pub fn append(
        &mut self,
        nodes: &NodeStore,
        node: NodeId,
        camera_position: Vec2,
        session: Option<SessionId>,
    ) -> Result<ObservationId> {
        nodes.require(node)?;
        let sequence = self.last_sequence + 1;
        self.push(Observation {
            sequence,
            node,
            camera_position,
            session,
        });
        tracing::debug!(node = %node, sequence, "observation appended");
        Ok(ObservationId::new(sequence))
    }

    /// Re-insert a persisted observation, keeping its sequence number.
    pub fn restore(&mut self, nodes: &NodeStore, observation: Observation) -> Result<ObservationId> {
        nodes.require(observation.node)?;
        if observation.sequence <= self.last_sequence {
            return Err(AtlasError::SequenceRegression {
                sequence: observation.sequence,
                last: self.last_sequence,
            });
        }
        let id = observation.id();
        self.push(observation);
        Ok(id)
    }

    fn push(&mut self, observation: Observation) {
        self.last_sequence = observation.sequence;
        self.by_node
            .entry(observation.node)
            .or_default()
            .push(self.observations.len());
        self.observations.push(observation);
    }

    /// Observations of `node`, ordered by sequence number.
    pub fn observations_for(&self, node: NodeId) -> impl DoubleEndedIterator<Item = &Observation> + ExactSizeIterator + '_ {
        self.slots(node).iter().map(move |&slot| &self.observations[slot])
    }

    /// The last `k` observations of `node`, oldest first.
    pub fn recent_window(&self, node: NodeId, k: usize) -> impl Iterator<Item = &Observation> + '_ {
        let slots = self.slots(node);
        let start = slots.len().saturating_sub(k);
        slots[start..].iter().map(move |&slot| &self.observations[slot])
    }

    /// Mean camera position over the last `window` observations of `node`.
    ///
    /// Non-finite readings are skipped; `None` when nothing usable remains.
    pub fn mean_position(&self, node: NodeId, window: usize) -> Option<Vec2> {
        Vec2::mean(
            self.recent_window(node, window)
                .map(|o| o.camera_position)
                .filter(Vec2::is_finite),
        )
    }

    /// Number of observations recorded for `node`.
    pub fn count_for(&self, node: NodeId) -> usize {
        self.slots(node).len()
    }

    /// Whether `node` has been observed at least once.
    pub fn has_observations(&self, node: NodeId) -> bool {
        self.count_for(node) > 0
    }

    fn slots(&self, node: NodeId) -> &[usize] {
        self.by_node.get(&node).map(Vec::as_slice).unwrap_or(&[])
    }

    /// All observations in sequence order.
    pub fn iter(&self) -> impl Iterator<Item = &Observation> + '_ {
        self.observations.iter()
    }

    /// Highest sequence number recorded (0 when empty).
    pub fn last_sequence(&self) -> u64 {
        self.last_sequence
    }

    /// Total observations.
    pub fn len(&self) -> usize {
        self.observations.len()
    }

    /// Whether the ledger is empty.
    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }
}
