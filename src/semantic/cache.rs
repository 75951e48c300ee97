//! Bounded embedding cache.
//!
//! Memoizes `(report id, canonical text) -> vector`. A report whose text
//! changed since it was cached is recomputed and overwritten; once the
//! capacity is reached the least recently used entry is evicted. The inner
//! lock is never held across a provider call, so concurrent fills of the
//! same entry race benignly — entries are idempotent for identical text and
//! last writer wins.

use std::collections::HashMap;
use std::sync::Mutex;

use super::embeddings::EmbeddingError;

#[derive(Debug)]
struct CacheEntry {
    text: String,
    vector: Vec<f32>,
    last_used: u64,
}

#[derive(Debug, Default)]
struct CacheInner {
    entries: HashMap<String, CacheEntry>,
    /// Monotonic use counter; recency, not wall time.
    tick: u64,
}

#[derive(Debug)]
pub struct EmbeddingCache {
    inner: Mutex<CacheInner>,
    capacity: usize,
}

impl EmbeddingCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(CacheInner::default()),
            capacity: capacity.max(1),
        }
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Cache hit only when the stored text matches exactly; a stale text is
    /// a miss and will be overwritten by the next `store`.
    pub fn lookup(&self, id: &str, text: &str) -> Option<Vec<f32>> {
        let mut inner = self.lock();
        inner.tick += 1;
        let tick = inner.tick;

        match inner.entries.get_mut(id) {
            Some(entry) if entry.text == text => {
                entry.last_used = tick;
                Some(entry.vector.clone())
            }
            _ => None,
        }
    }

    /// Insert or overwrite the entry for `id`, evicting the least recently
    /// used entry first if a new id would exceed capacity.
    pub fn store(&self, id: &str, text: String, vector: Vec<f32>) {
        let mut inner = self.lock();
        inner.tick += 1;
        let tick = inner.tick;

        if !inner.entries.contains_key(id) && inner.entries.len() >= self.capacity {
            evict_lru(&mut inner);
        }

        inner.entries.insert(
            id.to_string(),
            CacheEntry {
                text,
                vector,
                last_used: tick,
            },
        );
    }

    /// Resolve the vector for `(id, text)`, calling `compute` only on a
    /// miss. A failed compute surfaces the error and leaves the cache
    /// untouched — no negative caching.
    pub fn get_or_compute<F>(
        &self,
        id: &str,
        text: &str,
        compute: F,
    ) -> Result<Vec<f32>, EmbeddingError>
    where
        F: FnOnce(&str) -> Result<Vec<f32>, EmbeddingError>,
    {
        if let Some(hit) = self.lookup(id, text) {
            return Ok(hit);
        }

        // Lock released during the provider call.
        let vector = compute(text)?;
        self.store(id, text.to_string(), vector.clone());
        Ok(vector)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, CacheInner> {
        // Critical sections never panic, so poisoning would be a bug here.
        self.inner.lock().expect("embedding cache lock poisoned")
    }
}

fn evict_lru(inner: &mut CacheInner) {
    let oldest = inner
        .entries
        .iter()
        .min_by_key(|(_, entry)| entry.last_used)
        .map(|(id, _)| id.clone());

    if let Some(id) = oldest {
        inner.entries.remove(&id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vec_of(value: f32) -> Vec<f32> {
        vec![value; 3]
    }

    #[test]
    fn test_miss_computes_and_stores() {
        let cache = EmbeddingCache::new(8);

        let vector = cache
            .get_or_compute("r1", "pothole", |_| Ok(vec_of(1.0)))
            .unwrap();
        assert_eq!(vector, vec_of(1.0));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_hit_skips_compute() {
        let cache = EmbeddingCache::new(8);
        cache.store("r1", "pothole".to_string(), vec_of(1.0));

        let vector = cache
            .get_or_compute("r1", "pothole", |_| {
                panic!("compute must not run on a cache hit")
            })
            .unwrap();
        assert_eq!(vector, vec_of(1.0));
    }

    #[test]
    fn test_stale_text_forces_recompute() {
        let cache = EmbeddingCache::new(8);
        cache.store("r1", "old text".to_string(), vec_of(1.0));

        let vector = cache
            .get_or_compute("r1", "new text", |_| Ok(vec_of(2.0)))
            .unwrap();
        assert_eq!(vector, vec_of(2.0));

        // Old entry overwritten, not duplicated.
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.lookup("r1", "new text"), Some(vec_of(2.0)));
        assert!(cache.lookup("r1", "old text").is_none());
    }

    #[test]
    fn test_compute_failure_leaves_cache_unchanged() {
        let cache = EmbeddingCache::new(8);

        let result = cache.get_or_compute("r1", "pothole", |_| {
            Err(EmbeddingError::Unavailable("down".to_string()))
        });
        assert!(result.is_err());
        assert!(cache.is_empty());

        // No negative caching: the next attempt computes again.
        let vector = cache
            .get_or_compute("r1", "pothole", |_| Ok(vec_of(1.0)))
            .unwrap();
        assert_eq!(vector, vec_of(1.0));
    }

    #[test]
    fn test_lru_eviction_order() {
        let cache = EmbeddingCache::new(2);
        cache.store("a", "ta".to_string(), vec_of(1.0));
        cache.store("b", "tb".to_string(), vec_of(2.0));

        // Touch "a" so "b" becomes the least recently used.
        assert!(cache.lookup("a", "ta").is_some());

        cache.store("c", "tc".to_string(), vec_of(3.0));
        assert_eq!(cache.len(), 2);
        assert!(cache.lookup("a", "ta").is_some());
        assert!(cache.lookup("b", "tb").is_none());
        assert!(cache.lookup("c", "tc").is_some());
    }

    #[test]
    fn test_overwrite_does_not_evict_others() {
        let cache = EmbeddingCache::new(2);
        cache.store("a", "ta".to_string(), vec_of(1.0));
        cache.store("b", "tb".to_string(), vec_of(2.0));

        // Same id: replace in place even at capacity.
        cache.store("a", "ta2".to_string(), vec_of(3.0));
        assert_eq!(cache.len(), 2);
        assert!(cache.lookup("b", "tb").is_some());
    }

    #[test]
    fn test_zero_capacity_clamped_to_one() {
        let cache = EmbeddingCache::new(0);
        cache.store("a", "ta".to_string(), vec_of(1.0));
        assert_eq!(cache.len(), 1);

        cache.store("b", "tb".to_string(), vec_of(2.0));
        assert_eq!(cache.len(), 1);
        assert!(cache.lookup("b", "tb").is_some());
    }
}
