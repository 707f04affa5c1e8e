//! Bounded, approximate-LRU memory tier.

use std::num::NonZeroUsize;

use lru::LruCache;
use parking_lot::Mutex;

/// Thread-safe wrapper over an `lru::LruCache`. "Approximate" because callers
/// must simply tolerate eviction happening between a `set` and a later
/// `get` — the `lru` crate's strict recency tracking already satisfies that,
/// it just means we never promise a key survives once capacity is exceeded.
pub(crate) struct MemoryTier<Img> {
    inner: Mutex<LruCache<String, Img>>,
}

impl<Img: Clone> MemoryTier<Img> {
    pub(crate) fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::new(1).unwrap());
        Self {
            inner: Mutex::new(LruCache::new(capacity)),
        }
    }

    pub(crate) fn get(&self, key: &str) -> Option<Img> {
        self.inner.lock().get(key).cloned()
    }

    pub(crate) fn put(&self, key: String, image: Img) {
        self.inner.lock().put(key, image);
    }

    pub(crate) fn remove(&self, key: &str) {
        self.inner.lock().pop(key);
    }

    pub(crate) fn clear(&self) {
        self.inner.lock().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn put_then_get_round_trips() {
        let tier: MemoryTier<&'static str> = MemoryTier::new(2);
        tier.put("a".into(), "image-a");
        assert_eq!(tier.get("a"), Some("image-a"));
    }

    #[test]
    fn miss_returns_none() {
        let tier: MemoryTier<&'static str> = MemoryTier::new(2);
        assert_eq!(tier.get("missing"), None);
    }

    #[test]
    fn capacity_evicts_least_recently_used() {
        let tier: MemoryTier<&'static str> = MemoryTier::new(1);
        tier.put("a".into(), "image-a");
        tier.put("b".into(), "image-b");
        assert_eq!(tier.get("a"), None);
        assert_eq!(tier.get("b"), Some("image-b"));
    }

    #[test]
    fn remove_deletes_entry() {
        let tier: MemoryTier<&'static str> = MemoryTier::new(2);
        tier.put("a".into(), "image-a");
        tier.remove("a");
        assert_eq!(tier.get("a"), None);
    }

    #[test]
    fn clear_empties_tier() {
        let tier: MemoryTier<&'static str> = MemoryTier::new(2);
        tier.put("a".into(), "image-a");
        tier.put("b".into(), "image-b");
        tier.clear();
        assert_eq!(tier.get("a"), None);
        assert_eq!(tier.get("b"), None);
    }
}
