// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Query-path tier: the value observed at each canonical query path
//!
//! Keys are hashes of the full argument-qualified, alias-free path string,
//! so the same traversal reached from two different queries shares one
//! record. This tier is the index that lets the analyser answer "have we
//! seen a value here before" without scanning entities.

use chrono::{DateTime, Utc};
use log::warn;
use serde_json::Value as JsonValue;

use crate::request::hash_request;

use super::cacheability::Cacheability;
use super::store::{EntryMetadata, MemoryStore, SnapshotEntry, Store, StoreEntry, StoreStats};
use super::{CacheError, FieldValue};

pub struct PathCache {
    store: Box<dyn Store<FieldValue>>,
}

impl PathCache {
    pub fn new(max_entries: usize) -> Self {
        Self {
            store: Box::new(MemoryStore::new("query-paths", max_entries)),
        }
    }

    /// Derive the store key for a cache-path string.
    pub fn path_key(cache_path: &str) -> String {
        hash_request(cache_path)
    }

    /// The value recorded at `cache_path`, if present and valid at `now`.
    pub fn get_valid(
        &self,
        cache_path: &str,
        now: DateTime<Utc>,
    ) -> Option<(FieldValue, Cacheability)> {
        let entry = match self.store.get(&Self::path_key(cache_path)) {
            Ok(entry) => entry?,
            Err(e) => {
                warn!("path store read failed, treating as miss: {}", e);
                return None;
            }
        };
        if entry.metadata.cacheability.is_valid(now) {
            Some((entry.value, entry.metadata.cacheability))
        } else {
            None
        }
    }

    pub fn set(
        &self,
        cache_path: &str,
        value: FieldValue,
        cacheability: Cacheability,
        tag: Option<JsonValue>,
    ) -> Result<(), CacheError> {
        self.store.set(
            Self::path_key(cache_path),
            StoreEntry {
                value,
                metadata: EntryMetadata { cacheability, tag },
            },
        )
    }

    /// Direct lookup by store key (for the cache-entry surface; keys out of
    /// snapshots are already hashed).
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
