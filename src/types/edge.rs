//! Edge types for the atlas graph.

use serde::{Deserialize, Serialize};
use super::node::NodeId;

/// One of the three independent relational views over the node set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EdgeSet {
    /// Electrical wiring order. Degree ≤ 2 per node.
    Strip,
    /// Perceptual proximity on the surface.
    Surface,
    /// Human-curated semantic grouping.
    Region,
}

impl EdgeSet {
    /// All edge sets, in force-preference order.
    pub const ALL: [EdgeSet; 3] = [EdgeSet::Strip, EdgeSet::Surface, EdgeSet::Region];

    /// Parse edge set from string.
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "strip" => Some(Self::Strip),
            "surface" => Some(Self::Surface),
            "region" => Some(Self::Region),
            _ => None,
        }
    }
}

impl std::fmt::Display for EdgeSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Strip => write!(f, "strip"),
            Self::Surface => write!(f, "surface"),
            Self::Region => write!(f, "region"),
        }
    }
}

/// Unordered node pair, stored as (low, high).
///
/// Edge identity within a set is this key, so inserting (b, a) after (a, b)
/// addresses the same edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EdgeKey {
    low: NodeId,
    high: NodeId,
}

impl EdgeKey {
    /// Build the canonical key for a pair. Returns `None` for a self loop.
    pub fn new(a: NodeId, b: NodeId) -> Option<Self> {
        match a.cmp(&b) {
            std::cmp::Ordering::Less => Some(Self { low: a, high: b }),
            std::cmp::Ordering::Greater => Some(Self { low: b, high: a }),
            std::cmp::Ordering::Equal => None,
        }
    }

    /// Smaller endpoint.
    pub fn low(&self) -> NodeId {
        self.low
    }

    /// Larger endpoint.
    pub fn high(&self) -> NodeId {
        self.high
    }

    /// The endpoint opposite to `node`, if `node` is an endpoint.
    pub fn other(&self, node: NodeId) -> Option<NodeId> {
        if node == self.low {
            Some(self.high)
        } else if node == self.high {
            Some(self.low)
        } else {
            None
        }
    }
}

/// Wire form of an edge: `[a, b, weight]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EdgeRecord(pub NodeId, pub NodeId, pub f64);

impl EdgeRecord {
    /// Build from a canonical key and weight.
    pub fn from_key(key: EdgeKey, weight: f64) -> Self {
        Self(key.low(), key.high(), weight)
    }
}

/// Result of an upsert into an edge set.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EdgeUpsert {
    /// A new edge was recorded.
    Inserted,
    /// The pair already existed; its weight was replaced.
    Updated {
        /// Weight before the update.
        previous: f64,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_edge_key_is_unordered() {
        let a = NodeId::new(4);
        let b = NodeId::new(2);
        assert_eq!(EdgeKey::new(a, b), EdgeKey::new(b, a));
        let key = EdgeKey::new(a, b).unwrap();
        assert_eq!(key.low(), b);
        assert_eq!(key.other(b), Some(a));
        assert_eq!(key.other(NodeId::new(9)), None);
    }

    #[test]
    fn test_edge_key_rejects_self_loop() {
        assert!(EdgeKey::new(NodeId::new(1), NodeId::new(1)).is_none());
    }

    #[test]
    fn test_edge_record_wire_shape() {
        let record = EdgeRecord(NodeId::new(1), NodeId::new(2), 0.5);
        assert_eq!(serde_json::to_string(&record).unwrap(), "[1,2,0.5]");
        assert_eq!(EdgeSet::from_str("Surface"), Some(EdgeSet::Surface));
        assert_eq!(serde_json::to_string(&EdgeSet::Region).unwrap(), "\"region\"");
    }
}
