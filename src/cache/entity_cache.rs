// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Data-entity tier: normalised objects keyed by `Type:id`
//!
//! Writes merge at field granularity: scalar fields replace, list fields
//! replace wholesale. Upserts are serialised so two overlapping writes
//! apply in arrival order rather than losing fields.

use chrono::{DateTime, Utc};
use log::warn;
use parking_lot::Mutex;
use serde_json::Value as JsonValue;

use super::cacheability::Cacheability;
use super::store::{EntryMetadata, MemoryStore, SnapshotEntry, Store, StoreEntry, StoreStats};
use super::{CacheError, DataEntity};

pub struct EntityCache {
    store: Box<dyn Store<DataEntity>>,
    write_lock: Mutex<()>,
}

impl EntityCache {
    pub fn new(max_entries: usize) -> Self {
        Self {
            store: Box::new(MemoryStore::new("data-entities", max_entries)),
            write_lock: Mutex::new(()),
        }
    }

    /// The entity under `key`, if present and valid at `now`.
    pub fn get_valid(&self, key: &str, now: DateTime<Utc>) -> Option<(DataEntity, Cacheability)> {
        let entry = match self.store.get(key) {
            Ok(entry) => entry?,
            Err(e) => {
                warn!("entity store read failed, treating as miss: {}", e);
                return None;
            }
        };
        if entry.metadata.cacheability.is_valid(now) {
            Some((entry.value, entry.metadata.cacheability))
        } else {
            None
        }
    }

    /// Merge `entity` into the tier: existing fields not mentioned by this
    /// write survive; mentioned fields are replaced (lists wholesale). The
    /// new write's cacheability wins.
    pub fn upsert(
        &self,
        entity: DataEntity,
        cacheability: Cacheability,
        tag: Option<JsonValue>,
    ) -> Result<(), CacheError> {
        let _guard = self.write_lock.lock();
        let key = entity.key();
        let merged = match self.store.get(&key)? {
            Some(existing) => {
                let mut fields = existing.value.fields;
                for (name, value) in entity.fields {
                    fields.insert(name, value);
                }
                DataEntity {
                    type_name: entity.type_name,
                    id: entity.id,
                    fields,
                }
            }
            None => entity,
        };
        self.store.set(
            key,
            StoreEntry {
                value: merged,
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
