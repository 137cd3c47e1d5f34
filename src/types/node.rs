//! Node types for the atlas.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Unique identifier for an addressable LED node.
///
/// Wraps the physical address as a `u64` and implements `Ord` for
/// deterministic ordering. Identities are never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(u64);

impl NodeId {
    /// Create a new NodeId from a raw address.
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Get the raw address.
    pub const fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for NodeId {
    fn from(raw: u64) -> Self {
        Self(raw)
    }
}

/// Human-curated metadata attached to a node.
///
/// Unknown keys found while loading a document land in `extra` and are
/// written back unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeMetadata {
    /// Wiring chunk (controller segment) this node belongs to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chunk_id: Option<String>,
    /// Position of the node along its chunk.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index_in_chunk: Option<u32>,
    /// Semantic region tag.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    /// Free-form semantic tags.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    /// Textual description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Annotator confidence in this node's metadata.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    /// Keys not modelled above.
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl NodeMetadata {
    /// Empty metadata.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the wiring chunk and index.
    pub fn with_chunk(mut self, chunk_id: impl Into<String>, index_in_chunk: u32) -> Self {
        self.chunk_id = Some(chunk_id.into());
        self.index_in_chunk = Some(index_in_chunk);
        self
    }

    /// Set the region tag.
    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    /// Add a tag.
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        let tag = tag.into();
        if !self.tags.contains(&tag) {
            self.tags.push(tag);
        }
        self
    }

    /// Set the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Check whether the node carries a tag.
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }
}

/// Field-wise edit of [`NodeMetadata`].
///
/// `None` leaves a field untouched; `Some(None)` clears an optional field.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetadataPatch {
    /// Replacement chunk id.
    pub chunk_id: Option<Option<String>>,
    /// Replacement chunk index.
    pub index_in_chunk: Option<Option<u32>>,
    /// Replacement region tag.
    pub region: Option<Option<String>>,
    /// Replacement description.
    pub description: Option<Option<String>>,
    /// Replacement confidence.
    pub confidence: Option<Option<f64>>,
    /// Tags to add (duplicates ignored).
    pub add_tags: Vec<String>,
    /// Tags to remove.
    pub remove_tags: Vec<String>,
    /// Extra keys to merge; `Value::Null` removes the key.
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl MetadataPatch {
    /// Empty patch.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the region tag.
    pub fn region(mut self, region: Option<String>) -> Self {
        self.region = Some(region);
        self
    }

    /// Replace the description.
    pub fn description(mut self, description: Option<String>) -> Self {
        self.description = Some(description);
        self
    }

    /// Replace the confidence.
    pub fn confidence(mut self, confidence: Option<f64>) -> Self {
        self.confidence = Some(confidence);
        self
    }

    /// Add a tag.
    pub fn add_tag(mut self, tag: impl Into<String>) -> Self {
        self.add_tags.push(tag.into());
        self
    }

    /// Remove a tag.
    pub fn remove_tag(mut self, tag: impl Into<String>) -> Self {
        self.remove_tags.push(tag.into());
        self
    }

    /// Apply the patch in place.
    pub fn apply(&self, metadata: &mut NodeMetadata) {
        if let Some(chunk_id) = &self.chunk_id {
            metadata.chunk_id = chunk_id.clone();
        }
        if let Some(index) = self.index_in_chunk {
            metadata.index_in_chunk = index;
        }
        if let Some(region) = &self.region {
            metadata.region = region.clone();
        }
        if let Some(description) = &self.description {
            metadata.description = description.clone();
        }
        if let Some(confidence) = self.confidence {
            metadata.confidence = confidence;
        }
        metadata.tags.retain(|t| !self.remove_tags.contains(t));
        for tag in &self.add_tags {
            if !metadata.tags.contains(tag) {
                metadata.tags.push(tag.clone());
            }
        }
        for (key, value) in &self.extra {
            if value.is_null() {
                metadata.extra.remove(key);
            } else {
                metadata.extra.insert(key.clone(), value.clone());
            }
        }
    }
}

/// A single addressable LED node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    /// Stable identity.
    pub id: NodeId,
    /// Human-curated metadata.
    #[serde(default)]
    pub metadata: NodeMetadata,
    /// When the node was first observed or declared.
    pub created_at: DateTime<Utc>,
    /// Inactive nodes are kept but skipped by relaxation and export.
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

impl Node {
    /// Create a new active node.
    pub fn new(id: NodeId, metadata: NodeMetadata, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            metadata,
            created_at,
            active: true,
        }
    }
}
