//! Core types for the atlas.

pub mod node;
pub mod edge;
pub mod point;
pub mod observation;
pub mod error;

pub use node::{MetadataPatch, Node, NodeId, NodeMetadata};
pub use edge::{EdgeKey, EdgeRecord, EdgeSet, EdgeUpsert};
pub use point::Vec2;
pub use observation::{Observation, ObservationId, SessionId};
pub use error::{AtlasError, Result};
