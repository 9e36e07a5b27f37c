//! Negative cache (C3): short-lived suppression of repeated upstream
//! failures, guarded by an explicit reader-writer lock (spec §4.2, §5).

use std::collections::HashMap;

use parking_lot::RwLock;

use super::now_secs;

#[derive(Default)]
pub struct NegativeCache {
    inner: RwLock<HashMap<String, u64>>,
}

impl NegativeCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the suppression deadline for `key` if one is still active
    /// (invariant: a stale entry reads as absent, matching `get`'s contract
    /// in spec §4.2).
    pub fn get(&self, key: &str) -> Option<u64> {
        let guard = self.inner.read();
        match guard.get(key) {
            Some(&until) if until > now_secs() => Some(until),
            _ => None,
        }
    }

    pub fn set(&self, key: &str, until: u64) {
        self.inner.write().insert(key.to_string(), until);
    }

    pub fn delete(&self, key: &str) {
        self.inner.write().remove(key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn suppresses_until_ttl_passes() {
        let cache = NegativeCache::new();
        cache.set("k", now_secs() + 100);
        assert!(cache.get("k").is_some());
    }

    #[test]
    fn expired_entry_reads_as_absent() {
        let cache = NegativeCache::new();
        cache.set("k", now_secs().saturating_sub(1));
        assert!(cache.get("k").is_none());
    }

    #[test]
    fn delete_clears_entry() {
        let cache = NegativeCache::new();
        cache.set("k", now_secs() + 100);
        cache.delete("k");
        assert!(cache.get("k").is_none());
    }
}
