use dashmap::DashMap;

use super::KvStore;
use crate::error::HostwardenError;

/// In-memory concurrent map backend. No durability; the default storage
/// kind per spec §6.
#[derive(Default)]
pub struct MemoryStore {
    map: DashMap<String, Vec<u8>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KvStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, HostwardenError> {
        Ok(self.map.get(key).map(|v| v.clone()))
    }

    fn put(&self, key: &str, value: Vec<u8>) -> Result<(), HostwardenError> {
        self.map.insert(key.to_string(), value);
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<(), HostwardenError> {
        self.map.remove(key);
        Ok(())
    }

    fn batch_put(&self, items: Vec<(String, Vec<u8>)>) -> Result<(), HostwardenError> {
        for (key, value) in items {
            self.map.insert(key, value);
        }
        Ok(())
    }

    fn batch_delete(&self, keys: &[String]) -> Result<(), HostwardenError> {
        for key in keys {
            self.map.remove(key);
        }
        Ok(())
    }

    fn clear(&self) -> Result<(), HostwardenError> {
        self.map.clear();
        Ok(())
    }

    fn close(&self) -> Result<(), HostwardenError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn put_then_get() {
        let store = MemoryStore::new();
        store.put("k", b"v".to_vec()).unwrap();
        assert_eq!(store.get("k").unwrap(), Some(b"v".to_vec()));
    }

    #[test]
    fn batch_delete_removes_exact_set() {
        let store = MemoryStore::new();
        store
            .batch_put(vec![("a".into(), vec![1]), ("b".into(), vec![2])])
            .unwrap();
        store.batch_delete(&["a".to_string()]).unwrap();
        assert_eq!(store.get("a").unwrap(), None);
        assert_eq!(store.get("b").unwrap(), Some(vec![2]));
    }
}
