//! Node store: arena of nodes plus an identity index.

use std::collections::HashMap;

use chrono::Utc;

use crate::types::{AtlasError, MetadataPatch, Node, NodeId, NodeMetadata, Result};

/// Owns every addressable node.
///
/// Nodes live in an insertion-ordered arena; `index` maps identities to
/// arena slots. Nodes are never removed, only deactivated, so slots are
/// stable for the lifetime of the store.
#[derive(Debug, Clone, Default)]
pub struct NodeStore {
    nodes: Vec<Node>,
    index: HashMap<NodeId, usize>,
    next_id: u64,
    /// Set once an identity of `u64::MAX` is taken; fresh ids then come from
    /// the lowest gap instead of the counter.
    counter_exhausted: bool,
}

impl NodeStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a node with the next free identity.
    ///
    /// Identities are handed out in ascending order until the counter passes
    /// `u64::MAX`; after that the lowest never-used identity is taken.
    pub fn create_node(&mut self, metadata: NodeMetadata) -> NodeId {
        let id = if self.counter_exhausted {
            self.lowest_free_id()
        } else {
            NodeId::new(self.next_id)
        };
        self.insert(Node::new(id, metadata, Utc::now()));
        id
    }

    /// Create a node under an externally supplied identity (e.g. an LED address).
    pub fn declare_node(&mut self, id: NodeId, metadata: NodeMetadata) -> Result<NodeId> {
        if self.index.contains_key(&id) {
            return Err(AtlasError::DuplicateDeclaration(id));
        }
        self.insert(Node::new(id, metadata, Utc::now()));
        Ok(id)
    }

    /// Insert a fully formed node (document loading).
    pub fn restore(&mut self, node: Node) -> Result<NodeId> {
        if self.index.contains_key(&node.id) {
            return Err(AtlasError::DuplicateDeclaration(node.id));
        }
        let id = node.id;
        self.insert(node);
        Ok(id)
    }

    fn insert(&mut self, node: Node) {
        // Keep the counter ahead of every identity ever seen.
        let raw = node.id.as_u64();
        if !self.counter_exhausted && raw >= self.next_id {
            match raw.checked_add(1) {
                Some(next) => self.next_id = next,
                None => self.counter_exhausted = true,
            }
        }
        self.index.insert(node.id, self.nodes.len());
        self.nodes.push(node);
    }

    /// Smallest identity not present. Nodes are never removed, so an absent
    /// identity was never used. Terminates within `len() + 1` candidates.
    fn lowest_free_id(&self) -> NodeId {
        let mut candidate = 0u64;
        while self.index.contains_key(&NodeId::new(candidate)) {
            candidate += 1;
        }
        NodeId::new(candidate)
    }

    /// Apply a metadata patch.
    pub fn update_metadata(&mut self, id: NodeId, patch: &MetadataPatch) -> Result<()> {
        let node = self.get_mut(id)?;
        patch.apply(&mut node.metadata);
        Ok(())
    }

    /// Mark a node active or inactive.
    pub fn set_active(&mut self, id: NodeId, active: bool) -> Result<()> {
        self.get_mut(id)?.active = active;
        Ok(())
    }

    /// Fetch a node.
    pub fn get(&self, id: NodeId) -> Result<&Node> {
        self.index
            .get(&id)
            .map(|&slot| &self.nodes[slot])
            .ok_or(AtlasError::UnknownNode(id))
    }

    fn get_mut(&mut self, id: NodeId) -> Result<&mut Node> {
        match self.index.get(&id) {
            Some(&slot) => Ok(&mut self.nodes[slot]),
            None => Err(AtlasError::UnknownNode(id)),
        }
    }

    /// Fail with `UnknownNode` unless `id` exists.
    pub fn require(&self, id: NodeId) -> Result<()> {
        self.get(id).map(|_| ())
    }

    /// Check whether a node exists.
    pub fn contains(&self, id: NodeId) -> bool {
        self.index.contains_key(&id)
    }

    /// Check whether a node exists and is active.
    pub fn is_active(&self, id: NodeId) -> bool {
        self.get(id).map(|n| n.active).unwrap_or(false)
    }

    /// Active nodes in insertion order.
    ///
    /// The iterator is lazy and `Clone`; cloning it (or calling again)
    /// restarts the sequence.
    pub fn list_active(&self) -> ActiveNodes<'_> {
        ActiveNodes {
            inner: self.nodes.iter(),
        }
    }

    /// All nodes, active or not, in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Node> + Clone {
        self.nodes.iter()
    }

    /// Active nodes carrying `tag`.
    pub fn nodes_with_tag<'a>(&'a self, tag: &'a str) -> impl Iterator<Item = &'a Node> + 'a {
        self.list_active().filter(move |n| n.metadata.has_tag(tag))
    }

    /// Active nodes whose region tag equals `region`.
    pub fn nodes_in_region<'a>(&'a self, region: &'a str) -> impl Iterator<Item = &'a Node> + 'a {
        self.list_active()
            .filter(move |n| n.metadata.region.as_deref() == Some(region))
    }

    /// Number of nodes (including inactive).
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

/// Lazy, restartable iterator over active nodes.
#[derive(Debug, Clone)]
pub struct ActiveNodes<'a> {
    inner: std::slice::Iter<'a, Node>,
}

impl<'a> Iterator for ActiveNodes<'a> {
    type Item = &'a Node;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.by_ref().find(|n| n.active)
    }
}
