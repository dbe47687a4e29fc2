//! Compiled-script caches.
//!
//! Keys are the identity of the originating source plus the fragment
//! ranges. The text itself is not hashed: a new [`ScriptSource`] with the
//! same text is a different key and always misses.
//!
//! [`ScriptSource`]: crate::ScriptSource

use std::collections::HashMap;

use parking_lot::RwLock;

use crate::{
    artifact::CompiledScript,
    source::{ScriptSourceFragments, SourceId},
    span::Range,
};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    source: SourceId,
    fragments: Vec<Range>,
}

impl CacheKey {
    pub fn of(fragments: &ScriptSourceFragments) -> Self {
        Self {
            source: fragments.source.id(),
            fragments: fragments
                .fragments
                .iter()
                .flatten()
                .map(|fragment| fragment.range)
                .collect(),
        }
    }
}

pub trait ScriptCache: Send + Sync {
    fn get(&self, key: &CacheKey) -> Option<CompiledScript>;

    fn store(&self, key: CacheKey, script: CompiledScript);
}

/// Never hits, discards everything stored.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopCache;

impl ScriptCache for NoopCache {
    fn get(&self, _key: &CacheKey) -> Option<CompiledScript> {
        None
    }

    fn store(&self, _key: CacheKey, _script: CompiledScript) {}
}

/// In-memory cache shared between concurrent compilations. The last
/// store for a key wins.
#[derive(Debug, Default)]
pub struct MemoryCache {
    scripts: RwLock<HashMap<CacheKey, CompiledScript>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.scripts.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.scripts.read().is_empty()
    }

    pub fn clear(&self) {
        self.scripts.write().clear();
    }
}

impl ScriptCache for MemoryCache {
    fn get(&self, key: &CacheKey) -> Option<CompiledScript> {
        self.scripts.read().get(key).cloned()
    }

    fn store(&self, key: CacheKey, script: CompiledScript) {
        self.scripts.write().insert(key, script);
    }
}
