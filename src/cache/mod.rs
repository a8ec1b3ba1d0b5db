// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! The three-tier cache
//!
//! - **responses**: whole shaped responses keyed by request fingerprint
//! - **query paths**: the value observed at each canonical query path
//! - **data entities**: normalised objects keyed by `Type:id`
//!
//! `analysis` reads the tiers to serve queries fully or partially from
//! cache; `resolve` plans the writes that put fresh data back; `manager`
//! owns the stores, the in-flight request registries and the statistics.

pub mod analysis;
pub mod cacheability;
pub mod config;
pub mod entity_cache;
pub mod manager;
pub mod metadata;
pub mod path_cache;
pub mod registry;
pub mod resolve;
pub mod response_cache;
pub mod store;

pub use analysis::AnalysisResult;
pub use cacheability::{Cacheability, CacheabilityMetadata, DehydratedCacheability};
pub use config::{CacheConfig, DefaultCacheControls, TierConfig};
pub use manager::{CacheManager, CacheManagerStats, ResolvedPayload};
pub use metadata::{CacheMetadata, DehydratedCacheMetadata, QUERY_PATH};
pub use response_cache::ResponseRecord;
pub use store::{CacheSnapshot, MemoryStore, SnapshotEntry, Store, StoreStats};

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use thiserror::Error;

/// Cache-layer errors
#[derive(Debug, Clone, Error)]
pub enum CacheError {
    #[error("Store error: {0}")]
    Store(String),
    #[error("Serialization error: {0}")]
    Serialization(String),
    #[error("Snapshot error: {0}")]
    Snapshot(String),
}

/// A normalised field value as held in the path and entity tiers.
///
/// Nested entities appear only as [`FieldValue::Ref`]s, never inline; this
/// keeps cyclic data finite and makes the normalisation property (one
/// entity, many paths) hold by construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum FieldValue {
    /// A scalar (or scalar list) stored by value.
    Scalar(JsonValue),
    /// The key of a data entity in the entity tier.
    Ref(String),
    /// A list field: one element per index, refs for entities.
    List(Vec<FieldValue>),
    /// A non-entity object is present at this path; its fields live in
    /// their own path records underneath.
    Composite,
}

/// A normalised object keyed by `{type_name}:{id}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataEntity {
    pub type_name: String,
    pub id: String,
    /// Field values keyed by the argument-qualified field name
    /// (`query_key`), alias independent.
    pub fields: BTreeMap<String, FieldValue>,
}

impl DataEntity {
    pub fn key(&self) -> String {
        entity_key(&self.type_name, &self.id)
    }
}

/// Canonical entity key.
pub fn entity_key(type_name: &str, id: &str) -> String {
    format!("{}:{}", type_name, id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entity_keys_are_type_qualified() {
        assert_eq!(entity_key("User", "1"), "User:1");
        let entity = DataEntity {
            type_name: "User".to_string(),
            id: "1".to_string(),
            fields: BTreeMap::new(),
        };
        assert_eq!(entity.key(), "User:1");
    }

    #[test]
    fn field_values_round_trip_through_json() {
        let value = FieldValue::List(vec![
            FieldValue::Ref("User:1".to_string()),
            FieldValue::Scalar(serde_json::json!(null)),
            FieldValue::Composite,
        ]);
        let encoded = serde_json::to_value(&value).unwrap();
        let decoded: FieldValue = serde_json::from_value(encoded).unwrap();
        assert_eq!(decoded, value);
    }
}
