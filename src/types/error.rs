//! Error taxonomy shared by every atlas operation.
//!
//! Every variant is scoped to the call that produced it: a failing mutation
//! leaves the stores exactly as they were.

use super::node::NodeId;

/// Error type for atlas operations.
#[derive(Debug, thiserror::Error)]
pub enum AtlasError {
    /// Node identity not present in the node store.
    #[error("Unknown node: {0}")]
    UnknownNode(NodeId),

    /// Externally supplied identity already exists.
    #[error("Node already declared: {0}")]
    DuplicateDeclaration(NodeId),

    /// Edge endpoints are the same node.
    #[error("Self loop on node {0}")]
    SelfLoop(NodeId),

    /// Strip insertion would give `node` a third wiring neighbor.
    #[error("Strip degree exceeded at node {node} (max 2)")]
    DegreeExceeded {
        /// Endpoint already at full strip degree.
        node: NodeId,
    },

    /// Node cannot be seeded: no observation and no manual placement.
    #[error("Node {0} has no observation and no manual placement")]
    NoObservationAndNoManualPlacement(NodeId),

    /// Relaxation invoked with zero placed nodes.
    #[error("Relaxation requires at least one placed node")]
    EmptyGraph,

    /// Edge weight outside [0, 1] or NaN.
    #[error("Edge weight {0} outside [0, 1]")]
    InvalidWeight(f64),

    /// Manual placement with a NaN or infinite component.
    #[error("Non-finite position for node {0}")]
    NonFinitePosition(NodeId),

    /// Restored observation does not advance the ledger sequence.
    #[error("Observation sequence {sequence} does not follow {last}")]
    SequenceRegression {
        /// Sequence of the rejected observation.
        sequence: u64,
        /// Last sequence already in the ledger.
        last: u64,
    },

    /// Document written under an unknown schema version.
    #[error("Unsupported document schema: {0}")]
    UnsupportedSchema(String),

    /// Malformed atlas document.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Reading or writing an atlas document failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result alias for atlas operations.
pub type Result<T> = std::result::Result<T, AtlasError>;
