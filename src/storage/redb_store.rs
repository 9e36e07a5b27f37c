use std::path::Path;

use redb::{Database, ReadableTable, TableDefinition};

use super::KvStore;
use crate::error::HostwardenError;

/// Single "records" partition holding all cache entries, per spec §6's
/// persisted-state description.
const RECORDS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("records");

/// Embedded on-disk KV store. Opened once at startup; reads replay whatever
/// was persisted across restarts, writes are transactional. Unlike the Go
/// source's `BoltDBCache` (`examples/original_source/dnsutils/dbutils.go`),
/// whose `BatchDelete` was a dead no-op stub, `batch_delete` here performs
/// real deletes inside one write transaction — spec invariant I3 requires an
/// exact overlay swap.
pub struct RedbStore {
    db: Database,
}

impl RedbStore {
    pub fn open(path: &Path) -> Result<Self, HostwardenError> {
        let db = Database::create(path)
            .map_err(|e| HostwardenError::Storage(format!("failed to open {path:?}: {e}")))?;

        // Ensure the table exists before any reader tries to open it.
        let txn = db
            .begin_write()
            .map_err(|e| HostwardenError::Storage(e.to_string()))?;
        {
            txn.open_table(RECORDS_TABLE)
                .map_err(|e| HostwardenError::Storage(e.to_string()))?;
        }
        txn.commit()
            .map_err(|e| HostwardenError::Storage(e.to_string()))?;

        Ok(Self { db })
    }
}

impl KvStore for RedbStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, HostwardenError> {
        let txn = self
            .db
            .begin_read()
            .map_err(|e| HostwardenError::Storage(e.to_string()))?;
        let table = txn
            .open_table(RECORDS_TABLE)
            .map_err(|e| HostwardenError::Storage(e.to_string()))?;
        let value = table
            .get(key)
            .map_err(|e| HostwardenError::Storage(e.to_string()))?;
        Ok(value.map(|v| v.value().to_vec()))
    }

    fn put(&self, key: &str, value: Vec<u8>) -> Result<(), HostwardenError> {
        let txn = self
            .db
            .begin_write()
            .map_err(|e| HostwardenError::Storage(e.to_string()))?;
        {
            let mut table = txn
                .open_table(RECORDS_TABLE)
                .map_err(|e| HostwardenError::Storage(e.to_string()))?;
            table
                .insert(key, value.as_slice())
                .map_err(|e| HostwardenError::Storage(e.to_string()))?;
        }
        txn.commit()
            .map_err(|e| HostwardenError::Storage(e.to_string()))
    }

    fn delete(&self, key: &str) -> Result<(), HostwardenError> {
        let txn = self
            .db
            .begin_write()
            .map_err(|e| HostwardenError::Storage(e.to_string()))?;
        {
            let mut table = txn
                .open_table(RECORDS_TABLE)
                .map_err(|e| HostwardenError::Storage(e.to_string()))?;
            table
                .remove(key)
                .map_err(|e| HostwardenError::Storage(e.to_string()))?;
        }
        txn.commit()
            .map_err(|e| HostwardenError::Storage(e.to_string()))
    }

    fn batch_put(&self, items: Vec<(String, Vec<u8>)>) -> Result<(), HostwardenError> {
        let txn = self
            .db
            .begin_write()
            .map_err(|e| HostwardenError::Storage(e.to_string()))?;
        {
            let mut table = txn
                .open_table(RECORDS_TABLE)
                .map_err(|e| HostwardenError::Storage(e.to_string()))?;
            for (key, value) in &items {
                table
                    .insert(key.as_str(), value.as_slice())
                    .map_err(|e| HostwardenError::Storage(e.to_string()))?;
            }
        }
        txn.commit()
            .map_err(|e| HostwardenError::Storage(e.to_string()))
    }

    fn batch_delete(&self, keys: &[String]) -> Result<(), HostwardenError> {
        let txn = self
            .db
            .begin_write()
            .map_err(|e| HostwardenError::Storage(e.to_string()))?;
        {
            let mut table = txn
                .open_table(RECORDS_TABLE)
                .map_err(|e| HostwardenError::Storage(e.to_string()))?;
            for key in keys {
                table
                    .remove(key.as_str())
                    .map_err(|e| HostwardenError::Storage(e.to_string()))?;
            }
        }
        txn.commit()
            .map_err(|e| HostwardenError::Storage(e.to_string()))
    }

    fn clear(&self) -> Result<(), HostwardenError> {
        let txn = self
            .db
            .begin_write()
            .map_err(|e| HostwardenError::Storage(e.to_string()))?;
        {
            let mut table = txn
                .open_table(RECORDS_TABLE)
                .map_err(|e| HostwardenError::Storage(e.to_string()))?;
            let keys: Vec<String> = table
                .iter()
                .map_err(|e| HostwardenError::Storage(e.to_string()))?
                .filter_map(|entry| entry.ok().map(|(k, _)| k.value().to_string()))
                .collect();
            for key in keys {
                table
                    .remove(key.as_str())
                    .map_err(|e| HostwardenError::Storage(e.to_string()))?;
            }
        }
        txn.commit()
            .map_err(|e| HostwardenError::Storage(e.to_string()))
    }

    fn close(&self) -> Result<(), HostwardenError> {
        // `redb::Database` flushes and closes on drop; nothing additional
        // to do here beyond giving callers an explicit lifecycle hook.
        Ok(())
    }
}
