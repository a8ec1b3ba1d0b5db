// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Response tier: whole shaped responses keyed by request fingerprint

use chrono::{DateTime, Utc};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use super::cacheability::Cacheability;
use super::metadata::DehydratedCacheMetadata;
use super::store::{EntryMetadata, MemoryStore, SnapshotEntry, Store, StoreEntry, StoreStats};
use super::CacheError;

/// A cached response: exactly the shaped data delivered to the caller,
/// plus its per-path cacheability in dehydrated form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseRecord {
    pub data: JsonValue,
    pub cache_metadata: DehydratedCacheMetadata,
}

pub struct ResponseCache {
    store: Box<dyn Store<ResponseRecord>>,
}

impl ResponseCache {
    pub fn new(max_entries: usize) -> Self {
        Self {
            store: Box::new(MemoryStore::new("responses", max_entries)),
        }
    }

    /// The record under `hash`, if present and valid at `now`. Store read
    /// errors degrade to a miss.
    pub fn get_valid(&self, hash: &str, now: DateTime<Utc>) -> Option<(ResponseRecord, Cacheability)> {
        let entry = match self.store.get(hash) {
            Ok(entry) => entry?,
            Err(e) => {
                warn!("response store read failed, treating as miss: {}", e);
                return None;
            }
        };
        if entry.metadata.cacheability.is_valid(now) {
            Some((entry.value, entry.metadata.cacheability))
        } else {
            debug!("response record '{}' present but no longer valid", hash);
            None
        }
    }

    pub fn set(
        &self,
        hash: &str,
        record: ResponseRecord,
        cacheability: Cacheability,
        tag: Option<JsonValue>,
    ) -> Result<(), CacheError> {
        self.store.set(
            hash.to_string(),
            StoreEntry {
                value: record,
                metadata: EntryMetadata { cacheability, tag },
            },
        )
    }

    pub fn entry(&self, key: &str) -> Option<JsonValue> {
        let entry = self.store.get(key).ok().flatten()?;
        serde_json::to_value(&entry.value).ok()
    }

    pub fn size(&self) -> usize {
        self.store.size()
    }

    pub fn clear(&self) {
        self.store.clear()
    }

    pub fn export(&self, tag: Option<&JsonValue>) -> Result<Vec<SnapshotEntry>, CacheError> {
        self.store.export(tag)
    }

    pub fn import(&self, entries: Vec<SnapshotEntry>) -> Result<(), CacheError> {
        self.store.import(entries)
    }

    pub fn stats(&self) -> StoreStats {
        self.store.stats()
    }
}
