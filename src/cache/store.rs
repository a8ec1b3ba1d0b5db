// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! The generic tier store
//!
//! Each tier is a keyed mapping with LRU + TTL eviction, per-entry
//! cacheability metadata, an optional caller tag, and JSON export/import.
//! [`MemoryStore`] is the bundled implementation; embedders can supply
//! their own [`Store`].

use std::collections::HashMap;

use chrono::Utc;
use log::debug;
use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use super::cacheability::Cacheability;
use super::CacheError;

/// Metadata carried by every tier entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntryMetadata {
    pub cacheability: Cacheability,
    /// Caller-supplied grouping key; filtered export selects by it.
    pub tag: Option<JsonValue>,
}

/// One stored entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreEntry<V> {
    pub value: V,
    pub metadata: EntryMetadata,
}

/// One exported entry: the value as JSON, the cacheability dehydrated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotEntry {
    pub key: String,
    pub value: JsonValue,
    pub metadata: SnapshotEntryMetadata,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotEntryMetadata {
    pub cache_control: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub etag: Option<String>,
    pub stored_at: chrono::DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag: Option<JsonValue>,
}

/// A full three-tier snapshot, the stable `export`/`import` format.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CacheSnapshot {
    pub responses: Vec<SnapshotEntry>,
    pub query_paths: Vec<SnapshotEntry>,
    pub data_entities: Vec<SnapshotEntry>,
}

/// Hit/miss accounting per store.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreStats {
    pub hits: u64,
    pub misses: u64,
    pub insertions: u64,
    pub evictions: u64,
}

impl StoreStats {
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

/// The tier store contract.
pub trait Store<V>: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<StoreEntry<V>>, CacheError>;
    fn set(&self, key: String, entry: StoreEntry<V>) -> Result<(), CacheError>;
    fn has(&self, key: &str) -> Result<bool, CacheError>;
    fn delete(&self, key: &str) -> Result<bool, CacheError>;
    fn size(&self) -> usize;
    fn clear(&self);
    fn export(&self, tag: Option<&JsonValue>) -> Result<Vec<SnapshotEntry>, CacheError>;
    fn import(&self, entries: Vec<SnapshotEntry>) -> Result<(), CacheError>;
    fn stats(&self) -> StoreStats;
}

/// Recency tracking via monotonic access stamps; eviction scans for the
/// minimum, which only happens once the store is full.
#[derive(Debug, Default)]
struct LruTracker {
    stamps: HashMap<String, u64>,
    counter: u64,
}

impl LruTracker {
    fn touch(&mut self, key: &str) {
        self.counter += 1;
        self.stamps.insert(key.to_string(), self.counter);
    }

    fn remove(&mut self, key: &str) {
        self.stamps.remove(key);
    }

    fn least_recent(&self) -> Option<String> {
        self.stamps
            .iter()
            .min_by_key(|(_, stamp)| **stamp)
            .map(|(key, _)| key.clone())
    }

    fn clear(&mut self) {
        self.stamps.clear();
        self.counter = 0;
    }
}

#[derive(Debug)]
struct MemoryStoreInner<V> {
    entries: HashMap<String, StoreEntry<V>>,
    lru: LruTracker,
}

/// The bundled in-memory store.
#[derive(Debug)]
pub struct MemoryStore<V> {
    name: &'static str,
    max_entries: usize,
    inner: RwLock<MemoryStoreInner<V>>,
    stats: RwLock<StoreStats>,
}

impl<V: Clone + Serialize + DeserializeOwned + Send + Sync> MemoryStore<V> {
    pub fn new(name: &'static str, max_entries: usize) -> Self {
        Self {
            name,
            max_entries: max_entries.max(1),
            inner: RwLock::new(MemoryStoreInner {
                entries: HashMap::new(),
                lru: LruTracker::default(),
            }),
            stats: RwLock::new(StoreStats::default()),
        }
    }
}

impl<V: Clone + Serialize + DeserializeOwned + Send + Sync> Store<V> for MemoryStore<V> {
    fn get(&self, key: &str) -> Result<Option<StoreEntry<V>>, CacheError> {
        let now = Utc::now();
        let mut inner = self.inner.write();
        let found = inner.entries.get(key).cloned();
        match found {
            Some(entry) if entry.metadata.cacheability.is_expired(now) => {
                inner.entries.remove(key);
                inner.lru.remove(key);
                let mut stats = self.stats.write();
                stats.evictions += 1;
                stats.misses += 1;
                debug!("{} store dropped expired entry '{}'", self.name, key);
                Ok(None)
            }
            Some(entry) => {
                inner.lru.touch(key);
                self.stats.write().hits += 1;
                Ok(Some(entry))
            }
            None => {
                self.stats.write().misses += 1;
                Ok(None)
            }
        }
    }

    fn set(&self, key: String, entry: StoreEntry<V>) -> Result<(), CacheError> {
        let mut inner = self.inner.write();
        while inner.entries.len() >= self.max_entries && !inner.entries.contains_key(&key) {
            let Some(victim) = inner.lru.least_recent() else {
                break;
            };
            inner.entries.remove(&victim);
            inner.lru.remove(&victim);
            self.stats.write().evictions += 1;
            debug!("{} store evicted '{}'", self.name, victim);
        }
        inner.lru.touch(&key);
        inner.entries.insert(key, entry);
        self.stats.write().insertions += 1;
        Ok(())
    }

    fn has(&self, key: &str) -> Result<bool, CacheError> {
        let now = Utc::now();
        let inner = self.inner.read();
        Ok(inner
            .entries
            .get(key)
            .map(|entry| !entry.metadata.cacheability.is_expired(now))
            .unwrap_or(false))
    }

    fn delete(&self, key: &str) -> Result<bool, CacheError> {
        let mut inner = self.inner.write();
        inner.lru.remove(key);
        Ok(inner.entries.remove(key).is_some())
    }

    fn size(&self) -> usize {
        self.inner.read().entries.len()
    }

    fn clear(&self) {
        let mut inner = self.inner.write();
        inner.entries.clear();
        inner.lru.clear();
    }

    fn export(&self, tag: Option<&JsonValue>) -> Result<Vec<SnapshotEntry>, CacheError> {
        let inner = self.inner.read();
        let mut exported = Vec::new();
        for (key, entry) in &inner.entries {
            if let Some(wanted) = tag {
                if entry.metadata.tag.as_ref() != Some(wanted) {
                    continue;
                }
            }
            let value = serde_json::to_value(&entry.value)
                .map_err(|e| CacheError::Serialization(e.to_string()))?;
            let dehydrated = entry.metadata.cacheability.dehydrate();
            exported.push(SnapshotEntry {
                key: key.clone(),
                value,
                metadata: SnapshotEntryMetadata {
                    cache_control: dehydrated.cache_control,
                    etag: dehydrated.etag,
                    stored_at: dehydrated.stored_at,
                    tag: entry.metadata.tag.clone(),
                },
            });
        }
        // Deterministic snapshots regardless of map order.
        exported.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(exported)
    }

    fn import(&self, entries: Vec<SnapshotEntry>) -> Result<(), CacheError> {
        for snapshot in entries {
            let value: V = serde_json::from_value(snapshot.value)
                .map_err(|e| CacheError::Snapshot(e.to_string()))?;
            let mut cacheability =
                Cacheability::parse_cache_control(&snapshot.metadata.cache_control);
            cacheability.etag = snapshot.metadata.etag.clone();
            cacheability.stored_at = snapshot.metadata.stored_at;
            self.set(
                snapshot.key,
                StoreEntry {
                    value,
                    metadata: EntryMetadata {
                        cacheability,
                        tag: snapshot.metadata.tag,
                    },
                },
            )?;
        }
        Ok(())
    }

    fn stats(&self) -> StoreStats {
        self.stats.read().clone()
    }
}
