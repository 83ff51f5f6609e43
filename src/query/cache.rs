//! Bounded cache of compiled statements keyed by AST digest.

use std::fmt;
use std::num::NonZeroUsize;

use lru::LruCache;

use crate::query::compile::CompiledQuery;

/// LRU cache mapping a query fingerprint to its compiled form.
///
/// Because the fingerprint is computed over the canonical AST, every query
/// in an equivalence class shares one cache slot regardless of how the
/// caller happened to assemble the tree.
pub struct PlanCache {
    inner: LruCache<String, CompiledQuery>,
}

impl fmt::Debug for PlanCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlanCache")
            .field("len", &self.inner.len())
            .field("capacity", &self.inner.cap())
            .finish()
    }
}

impl PlanCache {
    /// Creates a cache bounded to `capacity` entries (minimum one).
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity.max(1)).unwrap();
        Self {
            inner: LruCache::new(capacity),
        }
    }

    /// Looks up a compiled statement, refreshing its recency.
    pub fn get(&mut self, digest: &str) -> Option<CompiledQuery> {
        self.inner.get(digest).cloned()
    }

    /// Stores a compiled statement, evicting the least recently used entry
    /// when full.
    pub fn insert(&mut self, digest: String, compiled: CompiledQuery) {
        self.inner.put(digest, compiled);
    }

    /// Number of cached statements.
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Whether the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}
