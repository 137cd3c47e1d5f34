//! Camera observation records.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use super::node::NodeId;
use super::point::Vec2;

/// Identifier of an observation; equal to its ledger sequence number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObservationId(u64);

impl ObservationId {
    /// Wrap a sequence number.
    pub const fn new(sequence: u64) -> Self {
        Self(sequence)
    }

    /// The sequence number.
    pub const fn sequence(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ObservationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "obs#{}", self.0)
    }
}

/// Camera or scan session identifier.
///
/// Passed explicitly into every ledger call; the crate keeps no notion of a
/// "current" session.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    /// Wrap an existing session name.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Mint a fresh random session id.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Session name.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One camera sighting of an activated node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    /// Monotonic activation sequence number.
    pub sequence: u64,
    /// Node that was lit.
    pub node: NodeId,
    /// Estimated position in camera space.
    pub camera_position: Vec2,
    /// Camera or scan session, if known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session: Option<SessionId>,
}

impl Observation {
    /// Identifier of this observation.
    pub fn id(&self) -> ObservationId {
        ObservationId(self.sequence)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_sessions_differ() {
        assert_ne!(SessionId::generate(), SessionId::generate());
    }

    #[test]
    fn test_observation_wire_shape() {
        let obs = Observation {
            sequence: 3,
            node: NodeId::new(7),
            camera_position: Vec2::new(1.5, -2.0),
            session: Some(SessionId::new("cam0")),
        };
        let json = serde_json::to_value(&obs).unwrap();
        assert_eq!(json["sequence"], 3);
        assert_eq!(json["node"], 7);
        assert_eq!(json["session"], "cam0");
        assert_eq!(obs.id(), ObservationId::new(3));
    }
}
