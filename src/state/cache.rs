//! Render-State Cache
//!
//! Content-addressed table of built [`RenderState`]s. Passes whose composed
//! states are structurally identical share one `Arc`, so at most one live
//! state exists per content hash.
//!
//! Entries are never evicted implicitly. [`RenderStateCache::trim`] drops
//! only entries nobody outside the cache still holds.

use std::sync::Arc;

use rustc_hash::FxHashMap;

use super::RenderState;

/// Cache counters, for diagnostics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    /// Hash hits whose contents differed.
    pub collisions: u64,
}

pub struct RenderStateCache {
    entries: FxHashMap<u128, Arc<RenderState>>,
    stats: CacheStats,
    verify_hits: bool,
}

impl RenderStateCache {
    #[must_use]
    pub fn new(verify_hits: bool) -> Self {
        Self {
            entries: FxHashMap::default(),
            stats: CacheStats::default(),
            verify_hits,
        }
    }

    /// Returns the shared instance for `state`'s contents, inserting it on a miss.
    ///
    /// On a verified collision `state` is returned uncached and the existing
    /// entry is left in place.
    pub fn get_or_insert(&mut self, state: RenderState) -> Arc<RenderState> {
        let hash = state.content_hash();

        if let Some(cached) = self.entries.get(&hash) {
            if !self.verify_hits || cached.content_eq(&state) {
                self.stats.hits += 1;
                log::trace!("Render state cache hit {hash:032x}");
                return Arc::clone(cached);
            }
            self.stats.collisions += 1;
            log::warn!("Render state hash collision on {hash:032x}, binding uncached state");
            return Arc::new(state);
        }

        self.stats.misses += 1;
        log::trace!("Render state cache miss {hash:032x}");
        let shared = Arc::new(state);
        self.entries.insert(hash, Arc::clone(&shared));
        shared
    }

    #[must_use]
    pub fn contains(&self, state: &Arc<RenderState>) -> bool {
        self.entries
            .get(&state.content_hash())
            .is_some_and(|cached| Arc::ptr_eq(cached, state))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn stats(&self) -> CacheStats {
        self.stats
    }

    /// Drops entries referenced only by the cache. Returns how many were dropped.
    pub fn trim(&mut self) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, state| Arc::strong_count(state) > 1);
        before - self.entries.len()
    }
}

impl Default for RenderStateCache {
    fn default() -> Self {
        Self::new(true)
    }
}
