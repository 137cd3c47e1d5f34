//! Thread-safe atlas handle.
//!
//! Scans keep inserting nodes and observations while a relaxation runs. The
//! run holds the read lock only while it snapshots its inputs and the write
//! lock only while it commits, so writers are never blocked for the length of
//! the iterations. Commits are revision-checked: a node placed or re-seeded
//! during the run keeps its new placement.

use std::num::NonZeroUsize;
use std::sync::Arc;

use lru::LruCache;
use parking_lot::{RwLock, RwLockReadGuard};

use crate::types::{EdgeSet, EdgeUpsert, NodeId, NodeMetadata, Result, SessionId, Vec2};
use super::embedding::{Dimensions, Embedding};
use super::relaxation::{relax_input, CancellationToken, RelaxationReport};
use super::snapshot::AtlasSnapshot;
use super::state::{Atlas, ScanStep};

/// Configuration for the export cache.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Maximum number of cached embeddings.
    pub max_entries: usize,
    /// Whether to cache exports at all.
    pub enabled: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: 16,
            enabled: true,
        }
    }
}

/// Cache statistics.
#[derive(Debug, Clone, Copy)]
pub struct CacheStats {
    /// Current number of entries in the cache.
    pub len: usize,
    /// Maximum capacity of the cache.
    pub cap: usize,
}

type ExportKey = (u64, Dimensions);

/// `Atlas` behind a reader-writer lock, with cached exports.
pub struct SharedAtlas {
    atlas: RwLock<Atlas>,
    cache: Option<RwLock<LruCache<ExportKey, Arc<Embedding>>>>,
}

impl SharedAtlas {
    /// Wrap an atlas.
    pub fn new(atlas: Atlas, config: CacheConfig) -> Self {
        let cache = config.enabled.then(|| {
            let size = NonZeroUsize::new(config.max_entries).unwrap_or(NonZeroUsize::MIN);
            RwLock::new(LruCache::new(size))
        });
        Self {
            atlas: RwLock::new(atlas),
            cache,
        }
    }

    /// Read access to a consistent view of the atlas.
    pub fn read(&self) -> RwLockReadGuard<'_, Atlas> {
        self.atlas.read()
    }

    /// Run a closure with exclusive access.
    pub fn mutate<R>(&self, f: impl FnOnce(&mut Atlas) -> R) -> R {
        f(&mut *self.atlas.write())
    }

    /// Unwrap the atlas.
    pub fn into_inner(self) -> Atlas {
        self.atlas.into_inner()
    }

    /// See [`Atlas::create_node`].
    pub fn create_node(&self, metadata: NodeMetadata) -> NodeId {
        self.atlas.write().create_node(metadata)
    }

    /// See [`Atlas::upsert_edge`].
    pub fn upsert_edge(&self, set: EdgeSet, a: NodeId, b: NodeId, weight: f64) -> Result<EdgeUpsert> {
        self.atlas.write().upsert_edge(set, a, b, weight)
    }

    /// See [`Atlas::observe_and_place`].
    pub fn observe_and_place(
        &self,
        node: NodeId,
        camera_position: Vec2,
        session: Option<SessionId>,
    ) -> Result<ScanStep> {
        self.atlas.write().observe_and_place(node, camera_position, session)
    }

    /// See [`Atlas::place_manually`].
    pub fn place_manually(&self, node: NodeId, position: Vec2) -> Result<Vec2> {
        self.atlas.write().place_manually(node, position)
    }

    /// Fingerprint of the current state.
    pub fn snapshot(&self) -> AtlasSnapshot {
        self.atlas.read().snapshot()
    }

    /// Relax without holding any lock during the iterations.
    pub fn relax(&self, cancel: &CancellationToken) -> Result<RelaxationReport> {
        let (input, policy) = {
            let atlas = self.atlas.read();
            (atlas.prepare_relaxation(), atlas.policy().clone())
        };

        let mut outcome = relax_input(&input, &policy, cancel)?;

        self.atlas.write().commit_relaxation(&mut outcome);
        if outcome.report.committed < outcome.report.nodes {
            tracing::debug!(
                skipped = outcome.report.nodes - outcome.report.committed,
                "relaxed positions dropped for nodes re-seeded during the run"
            );
        }
        Ok(outcome.report)
    }

    /// Export the current state, reusing a cached embedding when the atlas
    /// has not changed since it was computed.
    pub fn export(&self, dimensions: Dimensions) -> Arc<Embedding> {
        let atlas = self.atlas.read();
        let key = (atlas.revision(), dimensions);

        if let Some(cache) = &self.cache {
            if let Some(hit) = cache.read().peek(&key) {
                return Arc::clone(hit);
            }
        }

        let embedding = Arc::new(atlas.export(dimensions));
        if let Some(cache) = &self.cache {
            cache.write().put(key, Arc::clone(&embedding));
        }
        embedding
    }

    /// Get cache statistics. `None` if caching is disabled.
    pub fn cache_stats(&self) -> Option<CacheStats> {
        self.cache.as_ref().map(|cache| {
            let cache = cache.read();
            CacheStats {
                len: cache.len(),
                cap: cache.cap().get(),
            }
        })
    }
}

impl From<Atlas> for SharedAtlas {
    fn from(atlas: Atlas) -> Self {
        Self::new(atlas, CacheConfig::default())
    }
}
