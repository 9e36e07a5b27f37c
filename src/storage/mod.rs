//! Abstract KV storage interface (spec §4.2), with two interchangeable
//! backends: an in-memory concurrent map (default) and an embedded
//! transactional on-disk store.

pub mod memory;
pub mod redb_store;

pub use memory::MemoryStore;
pub use redb_store::RedbStore;

use crate::error::HostwardenError;

/// Storage backend capability set: `get/put/delete/batch_put/batch_delete/
/// clear/close`. Implementations are synchronous — both backends
/// (`DashMap`, `redb`) complete operations without suspending, so callers
/// invoke them directly rather than through `.await`.
pub trait KvStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, HostwardenError>;
    fn put(&self, key: &str, value: Vec<u8>) -> Result<(), HostwardenError>;
    fn delete(&self, key: &str) -> Result<(), HostwardenError>;
    fn batch_put(&self, items: Vec<(String, Vec<u8>)>) -> Result<(), HostwardenError>;
    fn batch_delete(&self, keys: &[String]) -> Result<(), HostwardenError>;
    fn clear(&self) -> Result<(), HostwardenError>;
    fn close(&self) -> Result<(), HostwardenError>;
}
