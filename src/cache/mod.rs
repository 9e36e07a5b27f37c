//! Record cache (C2) and negative cache (C3).
//!
//! Grounded on `src/cache/mod.rs`'s `CacheEntry`/`DnsCache` shape, trimmed:
//! no LRU, no domain trie, no RFC 2308 SOA-TTL mining — this cache uses the
//! fixed TTLs spec.md §6 defines. Exact semantics (ANY_TYPE fallback,
//! overlay key-set swap ordering) cross-checked against
//! `examples/original_source/dnsutils/dnsserver.go`'s `getRecord`/
//! `getResult`/`updateRecord`/`UpdateHostRecord`.

pub mod key;
pub mod negative;

use std::collections::HashMap;
use std::net::Ipv4Addr;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use tracing::warn;

use crate::constants::{ANY_TYPE, DEFAULT_POSITIVE_TTL, NEVER, OVERLAY_KEYS_NAME};
use crate::dns::enums::{DNSResourceClass, DNSResourceType};
use crate::dns::resource_record::{DNSResourceRecord, RData};
use crate::error::HostwardenError;
use crate::storage::KvStore;

pub use negative::NegativeCache;

/// A per-type record set: either `NEVER` (overlay entries) or an absolute
/// wall-clock expiry second (spec §3).
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq, Eq)]
pub struct CachedRecordSet {
    pub expiry: u64,
    /// Master-file text encoding of each RR (spec §3: "a non-empty ordered
    /// sequence of textual resource-record encodings").
    pub rrs: Vec<String>,
}

impl CachedRecordSet {
    fn is_expired(&self, now: u64) -> bool {
        self.expiry != NEVER && self.expiry <= now
    }
}

pub(crate) type TypedMap = HashMap<u16, CachedRecordSet>;

pub fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

/// Keyed store mapping a canonicalized domain key to a per-query-type
/// record set (spec §3/§4.2).
pub struct RecordCache {
    store: Arc<dyn KvStore>,
}

impl RecordCache {
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        Self { store }
    }

    /// Fetch the typed map for `key`, trimming expired type entries and
    /// persisting the trimmed set back before returning (spec §4.2,
    /// invariant I2). Entries whose RR text fails to re-parse are treated
    /// as corruption: the type is dropped and the sanitized set persisted.
    pub fn get(&self, key: &str) -> Result<Option<TypedMap>, HostwardenError> {
        let raw = match self.store.get(key)? {
            Some(bytes) => bytes,
            None => return Ok(None),
        };

        let mut typed_map: TypedMap = serde_json::from_slice(&raw)
            .map_err(|e| HostwardenError::Storage(format!("cache corruption at {key}: {e}")))?;

        let now = now_secs();
        let before = typed_map.len();
        typed_map.retain(|rtype, set| {
            if set.is_expired(now) {
                return false;
            }
            let all_parse = set
                .rrs
                .iter()
                .all(|text| DNSResourceRecord::from_master_text(text).is_ok());
            if !all_parse {
                warn!(key, rtype, "dropping corrupt cache entry on read");
            }
            all_parse
        });

        if typed_map.len() != before {
            if typed_map.is_empty() {
                self.store.delete(key)?;
            } else {
                self.persist(key, &typed_map)?;
            }
        }

        if typed_map.is_empty() {
            Ok(None)
        } else {
            Ok(Some(typed_map))
        }
    }

    /// Probe for `(key, qtype)`, falling back to `(key, ANY_TYPE)` per spec
    /// §4.1 point 2 when the queried type is A or ANY (the only types a
    /// hosts-file-sourced ANY_TYPE entry answers).
    pub fn get_with_any_fallback(
        &self,
        key: &str,
        qtype: DNSResourceType,
    ) -> Result<Option<Vec<DNSResourceRecord>>, HostwardenError> {
        let typed_map = match self.get(key)? {
            Some(m) => m,
            None => return Ok(None),
        };

        let qtype_code: u16 = qtype.into();
        if let Some(set) = typed_map.get(&qtype_code) {
            return Ok(Some(parse_rrs(&set.rrs)));
        }

        if matches!(qtype, DNSResourceType::A | DNSResourceType::ANY) {
            if let Some(set) = typed_map.get(&ANY_TYPE) {
                return Ok(Some(parse_rrs(&set.rrs)));
            }
        }

        Ok(None)
    }

    pub fn put(&self, key: &str, typed_map: &TypedMap) -> Result<(), HostwardenError> {
        self.persist(key, typed_map)
    }

    pub fn delete(&self, key: &str) -> Result<(), HostwardenError> {
        self.store.delete(key)
    }

    pub fn batch_put(&self, items: HashMap<String, TypedMap>) -> Result<(), HostwardenError> {
        let encoded: Result<Vec<(String, Vec<u8>)>, HostwardenError> = items
            .into_iter()
            .map(|(k, v)| Ok((k, encode(&v)?)))
            .collect();
        self.store.batch_put(encoded?)
    }

    pub fn batch_delete(&self, keys: &[String]) -> Result<(), HostwardenError> {
        self.store.batch_delete(keys)
    }

    pub fn clear(&self) -> Result<(), HostwardenError> {
        self.store.clear()
    }

    pub fn close(&self) -> Result<(), HostwardenError> {
        self.store.close()
    }

    /// `updateRecord(Q, rrs)`: empty `rrs` removes the type; otherwise sets
    /// it with `TTL = now + DEFAULT_POSITIVE_TTL`. Used both for upstream
    /// writeback (§4.1) and the unauthenticated UPDATE opcode path (§4.1,
    /// DESIGN.md Q4).
    pub fn update_record(
        &self,
        key: &str,
        rtype: DNSResourceType,
        rrs: &[DNSResourceRecord],
    ) -> Result<(), HostwardenError> {
        let mut typed_map = self.get(key)?.unwrap_or_default();
        let rtype_code: u16 = rtype.into();

        if rrs.is_empty() {
            typed_map.remove(&rtype_code);
        } else {
            typed_map.insert(
                rtype_code,
                CachedRecordSet {
                    expiry: now_secs() + DEFAULT_POSITIVE_TTL,
                    rrs: rrs.iter().map(|rr| rr.to_master_text()).collect(),
                },
            );
        }

        if typed_map.is_empty() {
            self.store.delete(key)
        } else {
            self.persist(key, &typed_map)
        }
    }

    /// `installOverlay(record)`: for each (domain, ip), install a `T=A`
    /// entry and a `T=ANY_TYPE` entry with `expiry = NEVER`, then
    /// atomically (from the caller's perspective; not atomic w.r.t.
    /// concurrent readers, spec §5) swap the overlay key set: delete the
    /// previous overlay keys, install the new entries, then overwrite
    /// `__overlay_keys__` last (so a crash mid-swap still converges).
    pub fn install_overlay(&self, record: &HashMap<String, Ipv4Addr>) -> Result<(), HostwardenError> {
        let mut new_keys = Vec::with_capacity(record.len());
        let mut batch: HashMap<String, TypedMap> = HashMap::with_capacity(record.len());

        for (domain, ip) in record {
            let k = key::reverse_label_key(domain);
            let rr = DNSResourceRecord {
                name: key::canonicalize(domain),
                rtype: DNSResourceType::A,
                rclass: DNSResourceClass::IN,
                ttl: 0,
                rdata: RData::A(*ip),
            };
            let text = rr.to_master_text();

            let mut typed_map = TypedMap::new();
            let set = CachedRecordSet {
                expiry: NEVER,
                rrs: vec![text],
            };
            let a_code: u16 = DNSResourceType::A.into();
            typed_map.insert(a_code, set.clone());
            typed_map.insert(ANY_TYPE, set);

            new_keys.push(k.clone());
            batch.insert(k, typed_map);
        }

        let previous_keys = self.read_overlay_key_set()?;

        self.store.batch_delete(&previous_keys)?;
        self.batch_put(batch)?;
        self.write_overlay_key_set(&new_keys)?;

        Ok(())
    }

    fn read_overlay_key_set(&self) -> Result<Vec<String>, HostwardenError> {
        match self.store.get(OVERLAY_KEYS_NAME)? {
            Some(bytes) => Ok(String::from_utf8_lossy(&bytes)
                .split('\n')
                .filter(|s| !s.is_empty())
                .map(|s| s.to_string())
                .collect()),
            None => Ok(Vec::new()),
        }
    }

    fn write_overlay_key_set(&self, keys: &[String]) -> Result<(), HostwardenError> {
        self.store.put(OVERLAY_KEYS_NAME, keys.join("\n").into_bytes())
    }

    fn persist(&self, key: &str, typed_map: &TypedMap) -> Result<(), HostwardenError> {
        self.store.put(key, encode(typed_map)?)
    }
}

fn encode(typed_map: &TypedMap) -> Result<Vec<u8>, HostwardenError> {
    serde_json::to_vec(typed_map).map_err(|e| HostwardenError::Storage(e.to_string()))
}

fn parse_rrs(rrs: &[String]) -> Vec<DNSResourceRecord> {
    rrs.iter()
        .filter_map(|text| DNSResourceRecord::from_master_text(text).ok())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    fn cache() -> RecordCache {
        RecordCache::new(Arc::new(MemoryStore::new()))
    }

    #[test]
    fn update_record_then_get() {
        let cache = cache();
        let key = key::reverse_label_key("x.test.");
        let rr = DNSResourceRecord {
            name: "x.test.".to_string(),
            rtype: DNSResourceType::A,
            rclass: DNSResourceClass::IN,
            ttl: 60,
            rdata: RData::A(Ipv4Addr::new(10, 0, 0, 1)),
        };
        cache.update_record(&key, DNSResourceType::A, &[rr]).unwrap();

        let got = cache
            .get_with_any_fallback(&key, DNSResourceType::A)
            .unwrap()
            .unwrap();
        assert_eq!(got.len(), 1);
    }

    #[test]
    fn empty_rrs_deletes() {
        let cache = cache();
        let key = key::reverse_label_key("x.test.");
        let rr = DNSResourceRecord {
            name: "x.test.".to_string(),
            rtype: DNSResourceType::A,
            rclass: DNSResourceClass::IN,
            ttl: 60,
            rdata: RData::A(Ipv4Addr::new(10, 0, 0, 1)),
        };
        cache.update_record(&key, DNSResourceType::A, &[rr]).unwrap();
        cache.update_record(&key, DNSResourceType::A, &[]).unwrap();
        assert!(cache.get(&key).unwrap().is_none());
    }

    #[test]
    fn install_overlay_then_rebuild_removes_stale_keys() {
        let cache = cache();

        let mut m1 = HashMap::new();
        m1.insert("a.test".to_string(), Ipv4Addr::new(1, 2, 3, 4));
        cache.install_overlay(&m1).unwrap();

        let key_a = key::reverse_label_key("a.test.");
        assert!(cache
            .get_with_any_fallback(&key_a, DNSResourceType::A)
            .unwrap()
            .is_some());

        let mut m2 = HashMap::new();
        m2.insert("b.test".to_string(), Ipv4Addr::new(9, 9, 9, 9));
        cache.install_overlay(&m2).unwrap();

        assert!(cache
            .get_with_any_fallback(&key_a, DNSResourceType::A)
            .unwrap()
            .is_none());

        let key_b = key::reverse_label_key("b.test.");
        let rrs = cache
            .get_with_any_fallback(&key_b, DNSResourceType::A)
            .unwrap()
            .unwrap();
        assert_eq!(rrs.len(), 1);

        let overlay_keys = cache.read_overlay_key_set().unwrap();
        assert_eq!(overlay_keys, vec![key_b]);
    }
}
