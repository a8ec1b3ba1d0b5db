// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Response normalisation: planning the tier writes for fetched data
//!
//! The walk is pure: it produces a [`WritePlan`] (path records, entity
//! records, per-path cacheability) without touching the stores, so the
//! caller can return shaped data immediately and apply the writes in a
//! background task whose completion is the cache promise.
//!
//! Field-level cacheability precedence: server-provided per-path
//! directives, then the per-type directive from configuration, then
//! inheritance; the effective value is always merged with the parent's
//! (ancestor-minimum TTL).

use std::collections::{BTreeMap, HashMap};

use log::debug;
use serde_json::Value as JsonValue;

use crate::ast::{Document, Selection, SelectionSet};
use crate::request::{FieldKeys, PathCursors, RequestContext};
use crate::schema::Schema;

use super::cacheability::Cacheability;
use super::metadata::{CacheMetadata, QUERY_PATH};
use super::{entity_key, DataEntity, FieldValue};

/// One planned path-tier write.
#[derive(Debug, Clone, PartialEq)]
pub struct PathWrite {
    pub cache_path: String,
    pub value: FieldValue,
    pub cacheability: Cacheability,
}

/// One planned entity-tier write.
#[derive(Debug, Clone, PartialEq)]
pub struct EntityWrite {
    pub key: String,
    pub entity: DataEntity,
    pub cacheability: Cacheability,
}

/// Everything resolve will write, plus the metadata of the fetched part.
#[derive(Debug, Clone, Default)]
pub struct WritePlan {
    pub paths: Vec<PathWrite>,
    pub entities: Vec<EntityWrite>,
    pub metadata: CacheMetadata,
}

pub(crate) struct ResponseNormalizer<'a> {
    pub schema: &'a Schema,
    pub ctx: &'a RequestContext,
    pub resource_key: &'a str,
    pub type_cache_controls: &'a HashMap<String, String>,
    /// Per-path directives the executor payload carried, keyed by cache
    /// path.
    pub server_metadata: Option<&'a BTreeMap<String, String>>,
}

impl<'a> ResponseNormalizer<'a> {
    /// Plan the writes for `data` fetched by `document`, under the
    /// top-level directive `top`.
    pub fn plan(&self, document: &Document, data: &JsonValue, top: &Cacheability) -> WritePlan {
        let mut plan = WritePlan::default();
        plan.metadata.set(QUERY_PATH, top.clone());

        let operations = document.operation_definitions();
        let (Some(operation), Some(object)) = (operations.first(), data.as_object()) else {
            return plan;
        };
        let Some(root) = self.schema.operation_root(operation.kind) else {
            return plan;
        };

        self.walk_set(
            &operation.selection_set,
            root,
            &PathCursors::root(),
            object,
            top,
            &mut plan,
        );
        debug!(
            "planned {} path writes, {} entity writes",
            plan.paths.len(),
            plan.entities.len()
        );
        plan
    }

    /// Walk one selection set against one response object, returning the
    /// normalised field map (used by the caller when the object turns out
    /// to be an entity).
    fn walk_set(
        &self,
        selection_set: &SelectionSet,
        parent_type: &str,
        cursors: &PathCursors,
        data: &serde_json::Map<String, JsonValue>,
        inherited: &Cacheability,
        plan: &mut WritePlan,
    ) -> BTreeMap<String, FieldValue> {
        let mut fields = BTreeMap::new();
        for selection in &selection_set.items {
            match selection {
                Selection::Field(field) => {
                    let keys = FieldKeys::build(field, cursors);
                    // Executor may legitimately omit fields (partial data
                    // with errors); omitted fields are simply not written.
                    let Some(value) = data.get(&keys.data_key) else {
                        continue;
                    };
                    let effective = self.effective_cacheability(&keys, inherited);
                    let stored =
                        self.normalize_field(field, &keys, cursors, value, &effective, plan);
                    plan.metadata.set(keys.cache_key.clone(), effective.clone());
                    plan.paths.push(PathWrite {
                        cache_path: keys.cache_key.clone(),
                        value: stored.clone(),
                        cacheability: effective,
                    });
                    fields.insert(keys.query_key, stored);
                }
                Selection::InlineFragment(inline) => {
                    let applies = match &inline.type_condition {
                        Some(condition) => {
                            let runtime = data
                                .get("__typename")
                                .and_then(JsonValue::as_str)
                                .unwrap_or(parent_type);
                            self.schema.type_condition_matches(runtime, condition)
                                || self.schema.type_condition_matches(parent_type, condition)
                        }
                        None => true,
                    };
                    if !applies {
                        continue;
                    }
                    let effective_type = inline.type_condition.as_deref().unwrap_or(parent_type);
                    let nested = self.walk_set(
                        &inline.selection_set,
                        effective_type,
                        cursors,
                        data,
                        inherited,
                        plan,
                    );
                    fields.extend(nested);
                }
                Selection::FragmentSpread(_) => {}
            }
        }
        fields
    }

    fn normalize_field(
        &self,
        field: &crate::ast::Field,
        keys: &FieldKeys,
        cursors: &PathCursors,
        value: &JsonValue,
        effective: &Cacheability,
        plan: &mut WritePlan,
    ) -> FieldValue {
        let Some(children) = &field.selection_set else {
            // Leaf: scalars (including scalar lists) stored by value.
            return FieldValue::Scalar(value.clone());
        };
        let child_cursors = keys.child_cursors(cursors);

        match value {
            JsonValue::Null => FieldValue::Scalar(JsonValue::Null),
            JsonValue::Array(elements) => {
                let element_type = self.element_type(keys);
                let mut stored = Vec::with_capacity(elements.len());
                for (index, element) in elements.iter().enumerate() {
                    let element_cursors = child_cursors.index(index);
                    stored.push(self.normalize_object(
                        children,
                        &element_type,
                        &element_cursors,
                        element,
                        effective,
                        plan,
                    ));
                }
                FieldValue::List(stored)
            }
            JsonValue::Object(_) => {
                let element_type = self.element_type(keys);
                self.normalize_object(
                    children,
                    &element_type,
                    &child_cursors,
                    value,
                    effective,
                    plan,
                )
            }
            // Shape mismatch between selection and data: store by value.
            other => FieldValue::Scalar(other.clone()),
        }
    }

    /// Normalise one composite value (an object or a list element).
    fn normalize_object(
        &self,
        children: &SelectionSet,
        static_type: &str,
        cursors: &PathCursors,
        value: &JsonValue,
        inherited: &Cacheability,
        plan: &mut WritePlan,
    ) -> FieldValue {
        let JsonValue::Object(object) = value else {
            return FieldValue::Scalar(value.clone());
        };

        // The runtime type wins over the static field type when the server
        // sent `__typename` (abstract fields resolve to concrete types).
        let type_name = object
            .get("__typename")
            .and_then(JsonValue::as_str)
            .unwrap_or(static_type)
            .to_string();

        let child_fields = self.walk_set(children, &type_name, cursors, object, inherited, plan);

        let id = object
            .get(self.resource_key)
            .and_then(stringify_resource_id);
        match id {
            Some(id) if self.schema.has_resource_key(&type_name, self.resource_key) => {
                let key = entity_key(&type_name, &id);
                plan.entities.push(EntityWrite {
                    key: key.clone(),
                    entity: DataEntity {
                        type_name,
                        id,
                        fields: child_fields,
                    },
                    cacheability: inherited.clone(),
                });
                FieldValue::Ref(key)
            }
            _ => FieldValue::Composite,
        }
    }

    /// The named type of a composite field, runtime-independent.
    fn element_type(&self, keys: &FieldKeys) -> String {
        self.ctx
            .field_type(&keys.hash_key)
            .map(|info| info.type_name.clone())
            .unwrap_or_else(|| "Unknown".to_string())
    }

    fn effective_cacheability(&self, keys: &FieldKeys, inherited: &Cacheability) -> Cacheability {
        if let Some(server) = self.server_metadata {
            if let Some(directive) = server.get(&keys.cache_key) {
                return Cacheability::parse_cache_control(directive).merge(inherited);
            }
        }
        if let Some(info) = self.ctx.field_type(&keys.hash_key) {
            if let Some(directive) = self.type_cache_controls.get(&info.type_name) {
                return Cacheability::parse_cache_control(directive).merge(inherited);
            }
        }
        inherited.clone()
    }
}

fn stringify_resource_id(value: &JsonValue) -> Option<String> {
    match value {
        JsonValue::String(s) => Some(s.clone()),
        JsonValue::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Merge partially-cached data with freshly fetched data: fetched values
/// win, objects merge per key, arrays merge element-wise.
pub fn merge_response_data(cached: &JsonValue, fetched: &JsonValue) -> JsonValue {
    match (cached, fetched) {
        (JsonValue::Object(old), JsonValue::Object(new)) => {
            let mut merged = old.clone();
            for (key, value) in new {
                let combined = match merged.get(key) {
                    Some(existing) => merge_response_data(existing, value),
                    None => value.clone(),
                };
                merged.insert(key.clone(), combined);
            }
            JsonValue::Object(merged)
        }
        (JsonValue::Array(old), JsonValue::Array(new)) if old.len() == new.len() => {
            JsonValue::Array(
                old.iter()
                    .zip(new)
                    .map(|(a, b)| merge_response_data(a, b))
                    .collect(),
            )
        }
        (_, fresh) => fresh.clone(),
    }
}
