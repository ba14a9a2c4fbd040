use std::collections::HashMap;

use parking_lot::Mutex;

use super::CacheKey;

/// Decides which blobs leave the disk cache.
///
/// The cache reports every insert, hit and removal; after each insert it asks
/// for victims and deletes them. Victims are dropped from the policy's own
/// bookkeeping when they are returned.
pub trait EvictionPolicy: Send + Sync {
    fn name(&self) -> &'static str;

    fn record_insert(&self, key: &CacheKey, size: u64);

    fn record_access(&self, key: &CacheKey);

    fn record_remove(&self, key: &CacheKey);

    /// Keys to delete now. `keep` is never returned.
    fn victims(&self, keep: &CacheKey) -> Vec<CacheKey>;
}

/// Keeps everything forever.
#[derive(Debug, Default)]
pub struct Unbounded;

impl EvictionPolicy for Unbounded {
    fn name(&self) -> &'static str {
        "unbounded"
    }

    fn record_insert(&self, _key: &CacheKey, _size: u64) {}

    fn record_access(&self, _key: &CacheKey) {}

    fn record_remove(&self, _key: &CacheKey) {}

    fn victims(&self, _keep: &CacheKey) -> Vec<CacheKey> {
        Vec::new()
    }
}

#[derive(Debug, Default)]
struct LruIndex {
    entries: HashMap<CacheKey, LruEntry>,
    total_bytes: u64,
    clock: u64,
}

#[derive(Debug, Clone, Copy)]
struct LruEntry {
    size: u64,
    last_used: u64,
}

impl LruIndex {
    fn tick(&mut self) -> u64 {
        self.clock += 1;
        self.clock
    }
}

/// Least-recently-used eviction under a total size cap.
#[derive(Debug)]
pub struct LruSizeCap {
    max_bytes: u64,
    index: Mutex<LruIndex>,
}

impl LruSizeCap {
    pub fn new(max_bytes: u64) -> Self {
        Self {
            max_bytes,
            index: Mutex::new(LruIndex::default()),
        }
    }

    pub fn total_bytes(&self) -> u64 {
        self.index.lock().total_bytes
    }
}

impl EvictionPolicy for LruSizeCap {
    fn name(&self) -> &'static str {
        "lru"
    }

    fn record_insert(&self, key: &CacheKey, size: u64) {
        let mut index = self.index.lock();
        let last_used = index.tick();
        if let Some(old) = index.entries.insert(key.clone(), LruEntry { size, last_used }) {
            index.total_bytes -= old.size;
        }
        index.total_bytes += size;
    }

    fn record_access(&self, key: &CacheKey) {
        let mut index = self.index.lock();
        let now = index.tick();
        if let Some(entry) = index.entries.get_mut(key) {
            entry.last_used = now;
        }
    }

    fn record_remove(&self, key: &CacheKey) {
        let mut index = self.index.lock();
        if let Some(old) = index.entries.remove(key) {
            index.total_bytes -= old.size;
        }
    }

    fn victims(&self, keep: &CacheKey) -> Vec<CacheKey> {
        let mut index = self.index.lock();
        let mut victims = Vec::new();

        while index.total_bytes > self.max_bytes {
            let oldest = index
                .entries
                .iter()
                .filter(|(k, _)| *k != keep)
                .min_by_key(|(_, e)| e.last_used)
                .map(|(k, _)| k.clone());

            let Some(key) = oldest else {
                break;
            };
            if let Some(entry) = index.entries.remove(&key) {
                index.total_bytes -= entry.size;
            }
            victims.push(key);
        }

        victims
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(name: &str) -> CacheKey {
        CacheKey::from_file_name(&format!("{}.mp3", name)).expect("valid key")
    }

    #[test]
    fn unbounded_never_evicts() {
        let policy = Unbounded;
        policy.record_insert(&key("a"), u64::MAX / 2);
        policy.record_insert(&key("b"), u64::MAX / 2);
        assert!(policy.victims(&key("b")).is_empty());
    }

    #[test]
    fn lru_evicts_least_recently_used_first() {
        let policy = LruSizeCap::new(100);
        policy.record_insert(&key("a"), 40);
        policy.record_insert(&key("b"), 40);
        policy.record_access(&key("a"));
        policy.record_insert(&key("c"), 40);

        assert_eq!(policy.victims(&key("c")), vec![key("b")]);
        assert_eq!(policy.total_bytes(), 80);
    }

    #[test]
    fn lru_never_selects_the_kept_key() {
        let policy = LruSizeCap::new(10);
        policy.record_insert(&key("big"), 50);
        assert!(policy.victims(&key("big")).is_empty());
        assert_eq!(policy.total_bytes(), 50);
    }

    #[test]
    fn reinsert_replaces_size() {
        let policy = LruSizeCap::new(100);
        policy.record_insert(&key("a"), 60);
        policy.record_insert(&key("a"), 30);
        assert_eq!(policy.total_bytes(), 30);
        policy.record_remove(&key("a"));
        assert_eq!(policy.total_bytes(), 0);
    }
}
