// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Query analysis: cache hit, miss or partial synthesis
//!
//! Walks a normalised document depth-first against the path and entity
//! tiers, assembling whatever data is already cached and pruning satisfied
//! selections from a rewritten query. Invalid (expired, no-cache,
//! no-store) records read as absent. Entities reached by ref serve their
//! children from the entity record, which is what makes data written via
//! one query path visible to every other path that reaches the same
//! entity.

use chrono::{DateTime, Utc};
use log::debug;
use serde_json::Value as JsonValue;

use crate::ast::{
    print_document, Definition, Document, Field, InlineFragment, Selection, SelectionSet,
};
use crate::request::{FieldKeys, PathCursors, RequestContext};
use crate::schema::Schema;

use super::cacheability::Cacheability;
use super::entity_cache::EntityCache;
use super::metadata::{CacheMetadata, QUERY_PATH};
use super::path_cache::PathCache;
use super::{DataEntity, FieldValue};

/// The outcome of analysing one request against the cache.
#[derive(Debug, Clone, Default)]
pub struct AnalysisResult {
    /// Data assembled from cache; present on full hits and partial hits.
    pub cached_data: Option<JsonValue>,
    /// Cacheability of the assembled data, by cache path.
    pub cache_metadata: Option<CacheMetadata>,
    /// True iff at least one field was served from cache AND at least one
    /// is missing: the rewritten query is a strict subset.
    pub filtered: bool,
    /// The rewritten document requesting only missing fields; `None` on a
    /// full hit.
    pub updated_document: Option<Document>,
    /// Canonical string of `updated_document`.
    pub updated_query: Option<String>,
}

impl AnalysisResult {
    pub fn is_full_hit(&self) -> bool {
        self.updated_document.is_none() && self.cached_data.is_some()
    }

    /// A result that serves nothing and forwards the document untouched.
    pub fn full_miss(document: &Document, query: &str) -> Self {
        Self {
            cached_data: None,
            cache_metadata: None,
            filtered: false,
            updated_document: Some(document.clone()),
            updated_query: Some(query.to_string()),
        }
    }
}

pub(crate) struct QueryAnalyzer<'a> {
    pub schema: &'a Schema,
    pub ctx: &'a RequestContext,
    pub paths: &'a PathCache,
    pub entities: &'a EntityCache,
    pub resource_key: &'a str,
    pub now: DateTime<Utc>,
}

/// Where a selection set's values come from during the walk.
#[derive(Clone, Copy)]
enum ValueSource<'v> {
    /// Top-level and non-entity objects: the path tier.
    Paths,
    /// Children of a resolved entity: the entity record.
    Entity {
        entity: &'v DataEntity,
        cacheability: &'v Cacheability,
    },
}

#[derive(Default)]
struct SetOutcome {
    data: serde_json::Map<String, JsonValue>,
    pruned: Vec<Selection>,
    cached_fields: usize,
    missing_fields: usize,
}

enum CompositeResult {
    Hit(JsonValue),
    Partial { data: JsonValue, pruned: Vec<Selection> },
    Miss,
}

impl<'a> QueryAnalyzer<'a> {
    pub fn analyse(&self, document: &Document, query: &str) -> AnalysisResult {
        let operations = document.operation_definitions();
        let Some(operation) = operations.first() else {
            return AnalysisResult::full_miss(document, query);
        };
        let Some(root) = self.schema.operation_root(operation.kind) else {
            return AnalysisResult::full_miss(document, query);
        };

        let mut metadata = CacheMetadata::new();
        let outcome = self.walk_set(
            &operation.selection_set,
            root,
            &PathCursors::root(),
            ValueSource::Paths,
            &mut metadata,
        );

        if let Some(combined) = metadata.combined() {
            metadata.set(QUERY_PATH, combined);
        }

        debug!(
            "analysis: {} cached, {} missing",
            outcome.cached_fields, outcome.missing_fields
        );

        if outcome.missing_fields == 0 && outcome.cached_fields > 0 {
            return AnalysisResult {
                cached_data: Some(JsonValue::Object(outcome.data)),
                cache_metadata: Some(metadata),
                filtered: false,
                updated_document: None,
                updated_query: None,
            };
        }

        let filtered = outcome.cached_fields > 0;
        let mut pruned_operation = (*operation).clone();
        pruned_operation.selection_set = SelectionSet {
            items: outcome.pruned,
        };
        let updated_document = Document {
            definitions: vec![Definition::Operation(pruned_operation)],
        };
        let updated_query = print_document(&updated_document);

        AnalysisResult {
            cached_data: filtered.then(|| JsonValue::Object(outcome.data)),
            cache_metadata: filtered.then_some(metadata),
            filtered,
            updated_document: Some(updated_document),
            updated_query: Some(updated_query),
        }
    }

    fn walk_set(
        &self,
        selection_set: &SelectionSet,
        parent_type: &str,
        cursors: &PathCursors,
        source: ValueSource<'_>,
        metadata: &mut CacheMetadata,
    ) -> SetOutcome {
        let mut outcome = SetOutcome::default();
        for selection in &selection_set.items {
            match selection {
                Selection::Field(field) => {
                    let keys = FieldKeys::build(field, cursors);
                    if field.selection_set.is_none() {
                        match self.read_leaf(&keys, &source) {
                            Some((value, cacheability)) => {
                                metadata.set(keys.cache_key.clone(), cacheability);
                                outcome.data.insert(keys.data_key, value);
                                outcome.cached_fields += 1;
                            }
                            None => {
                                outcome.missing_fields += 1;
                                outcome.pruned.push(Selection::Field(field.clone()));
                            }
                        }
                    } else {
                        match self.resolve_composite(field, &keys, cursors, &source, metadata) {
                            CompositeResult::Hit(value) => {
                                outcome.data.insert(keys.data_key, value);
                                outcome.cached_fields += 1;
                            }
                            CompositeResult::Partial { data, pruned } => {
                                outcome.data.insert(keys.data_key, data);
                                outcome.cached_fields += 1;
                                outcome.missing_fields += 1;
                                let mut rewritten = field.clone();
                                rewritten.selection_set = Some(SelectionSet { items: pruned });
                                outcome.pruned.push(Selection::Field(rewritten));
                            }
                            CompositeResult::Miss => {
                                outcome.missing_fields += 1;
                                outcome.pruned.push(Selection::Field(field.clone()));
                            }
                        }
                    }
                }
                Selection::InlineFragment(inline) => {
                    // Against a concrete entity, a non-matching condition
                    // selects nothing and is satisfied vacuously.
                    if let ValueSource::Entity { entity, .. } = source {
                        if let Some(condition) = &inline.type_condition {
                            if !self
                                .schema
                                .type_condition_matches(&entity.type_name, condition)
                            {
                                continue;
                            }
                        }
                    }
                    let effective = inline.type_condition.as_deref().unwrap_or(parent_type);
                    let inner =
                        self.walk_set(&inline.selection_set, effective, cursors, source, metadata);
                    outcome.cached_fields += inner.cached_fields;
                    outcome.missing_fields += inner.missing_fields;
                    for (key, value) in inner.data {
                        outcome.data.insert(key, value);
                    }
                    if !inner.pruned.is_empty() {
                        outcome.pruned.push(Selection::InlineFragment(InlineFragment {
                            type_condition: inline.type_condition.clone(),
                            directives: inline.directives.clone(),
                            selection_set: SelectionSet {
                                items: inner.pruned,
                            },
                        }));
                    }
                }
                Selection::FragmentSpread(_) => {
                    // Normalised documents contain no spreads; a stray one
                    // is conservatively refetched.
                    outcome.missing_fields += 1;
                    outcome.pruned.push(selection.clone());
                }
            }
        }
        outcome
    }

    fn read_leaf(
        &self,
        keys: &FieldKeys,
        source: &ValueSource<'_>,
    ) -> Option<(JsonValue, Cacheability)> {
        match source {
            ValueSource::Paths => match self.paths.get_valid(&keys.cache_key, self.now)? {
                (FieldValue::Scalar(value), cacheability) => Some((value, cacheability)),
                _ => None,
            },
            ValueSource::Entity {
                entity,
                cacheability,
            } => {
                if keys.name == "__typename" && !entity.fields.contains_key(&keys.query_key) {
                    return Some((
                        JsonValue::String(entity.type_name.clone()),
                        (*cacheability).clone(),
                    ));
                }
                let FieldValue::Scalar(value) = entity.fields.get(&keys.query_key)? else {
                    return None;
                };
                // A record at this exact path carries finer-grained
                // cacheability than the entity as a whole.
                let effective = self
                    .paths
                    .get_valid(&keys.cache_key, self.now)
                    .map(|(_, cc)| cc)
                    .unwrap_or_else(|| (*cacheability).clone());
                Some((value.clone(), effective))
            }
        }
    }

    fn resolve_composite(
        &self,
        field: &Field,
        keys: &FieldKeys,
        cursors: &PathCursors,
        source: &ValueSource<'_>,
        metadata: &mut CacheMetadata,
    ) -> CompositeResult {
        let located = match source {
            ValueSource::Paths => self.paths.get_valid(&keys.cache_key, self.now),
            ValueSource::Entity {
                entity,
                cacheability,
            } => entity.fields.get(&keys.query_key).map(|value| {
                let effective = self
                    .paths
                    .get_valid(&keys.cache_key, self.now)
                    .map(|(_, cc)| cc)
                    .unwrap_or_else(|| (*cacheability).clone());
                (value.clone(), effective)
            }),
        };
        let Some((stored, cacheability)) = located else {
            return CompositeResult::Miss;
        };

        let children = match &field.selection_set {
            Some(children) => children,
            None => return CompositeResult::Miss,
        };
        let child_cursors = keys.child_cursors(cursors);

        match stored {
            FieldValue::Scalar(JsonValue::Null) => {
                metadata.set(keys.cache_key.clone(), cacheability);
                CompositeResult::Hit(JsonValue::Null)
            }
            FieldValue::Scalar(_) => CompositeResult::Miss,
            FieldValue::Ref(entity_key) => {
                metadata.set(keys.cache_key.clone(), cacheability);
                self.walk_entity(children, &entity_key, &child_cursors, metadata)
            }
            FieldValue::Composite => {
                let Some(info) = self.ctx.field_type(&keys.hash_key) else {
                    return CompositeResult::Miss;
                };
                metadata.set(keys.cache_key.clone(), cacheability);
                let inner = self.walk_set(
                    children,
                    &info.type_name,
                    &child_cursors,
                    ValueSource::Paths,
                    metadata,
                );
                assemble(inner)
            }
            FieldValue::List(elements) => {
                metadata.set(keys.cache_key.clone(), cacheability);
                self.walk_list(children, &elements, &child_cursors, metadata)
            }
        }
    }

    fn walk_entity(
        &self,
        children: &SelectionSet,
        entity_key: &str,
        cursors: &PathCursors,
        metadata: &mut CacheMetadata,
    ) -> CompositeResult {
        let Some((entity, cacheability)) = self.entities.get_valid(entity_key, self.now) else {
            return CompositeResult::Miss;
        };
        let inner = self.walk_set(
            children,
            &entity.type_name,
            cursors,
            ValueSource::Entity {
                entity: &entity,
                cacheability: &cacheability,
            },
            metadata,
        );
        match assemble(inner) {
            CompositeResult::Partial { data, mut pruned } => {
                // The resolver must be able to re-identify the entity when
                // the partial subtree comes back.
                if !prunes_field(&pruned, self.resource_key) {
                    pruned.push(Selection::Field(Field::named(self.resource_key)));
                }
                CompositeResult::Partial { data, pruned }
            }
            other => other,
        }
    }

    /// Lists recurse per known index. The pruned selection is shared by
    /// every element, so the kept children are the union, by response key,
    /// of what any element still needs.
    fn walk_list(
        &self,
        children: &SelectionSet,
        elements: &[FieldValue],
        cursors: &PathCursors,
        metadata: &mut CacheMetadata,
    ) -> CompositeResult {
        let mut array = Vec::with_capacity(elements.len());
        let mut keep_keys: Vec<String> = Vec::new();
        let mut fully_hit = true;

        for (index, element) in elements.iter().enumerate() {
            let element_cursors = cursors.index(index);
            let result = match element {
                FieldValue::Ref(entity_key) => {
                    self.walk_entity(children, entity_key, &element_cursors, metadata)
                }
                FieldValue::Composite => {
                    let Some(info) = self.ctx.field_type(&cursors.hash_path) else {
                        return CompositeResult::Miss;
                    };
                    let inner = self.walk_set(
                        children,
                        &info.type_name,
                        &element_cursors,
                        ValueSource::Paths,
                        metadata,
                    );
                    assemble(inner)
                }
                FieldValue::Scalar(JsonValue::Null) => CompositeResult::Hit(JsonValue::Null),
                FieldValue::Scalar(_) | FieldValue::List(_) => CompositeResult::Miss,
            };

            match result {
                CompositeResult::Hit(value) => array.push(value),
                CompositeResult::Partial { data, pruned } => {
                    fully_hit = false;
                    array.push(data);
                    for key in pruned_response_keys(&pruned) {
                        if !keep_keys.contains(&key) {
                            keep_keys.push(key);
                        }
                    }
                }
                // One unreconstructible element refetches the whole list.
                CompositeResult::Miss => return CompositeResult::Miss,
            }
        }

        if fully_hit {
            return CompositeResult::Hit(JsonValue::Array(array));
        }

        let element_is_entity = self
            .ctx
            .field_type(&cursors.hash_path)
            .map(|info| info.is_entity)
            .unwrap_or(false);
        let mut kept: Vec<Selection> = children
            .items
            .iter()
            .filter(|selection| selection_matches_keys(selection, &keep_keys))
            .cloned()
            .collect();
        if element_is_entity && !prunes_field(&kept, self.resource_key) {
            kept.push(Selection::Field(Field::named(self.resource_key)));
        }
        CompositeResult::Partial {
            data: JsonValue::Array(array),
            pruned: kept,
        }
    }
}

fn assemble(inner: SetOutcome) -> CompositeResult {
    if inner.missing_fields == 0 {
        CompositeResult::Hit(JsonValue::Object(inner.data))
    } else if inner.cached_fields > 0 {
        CompositeResult::Partial {
            data: JsonValue::Object(inner.data),
            pruned: inner.pruned,
        }
    } else {
        CompositeResult::Miss
    }
}

fn prunes_field(selections: &[Selection], name: &str) -> bool {
    selections.iter().any(|selection| match selection {
        Selection::Field(field) => field.name == name,
        Selection::InlineFragment(inline) => prunes_field(&inline.selection_set.items, name),
        Selection::FragmentSpread(_) => false,
    })
}

/// Response keys needing refetch at the top level of a pruned set; inline
/// fragments contribute their nested keys.
fn pruned_response_keys(pruned: &[Selection]) -> Vec<String> {
    let mut keys = Vec::new();
    for selection in pruned {
        match selection {
            Selection::Field(field) => keys.push(field.response_key().to_string()),
            Selection::InlineFragment(inline) => {
                keys.extend(pruned_response_keys(&inline.selection_set.items))
            }
            Selection::FragmentSpread(spread) => keys.push(spread.name.clone()),
        }
    }
    keys
}

fn selection_matches_keys(selection: &Selection, keys: &[String]) -> bool {
    match selection {
        Selection::Field(field) => keys.iter().any(|k| k == field.response_key()),
        Selection::InlineFragment(inline) => inline
            .selection_set
            .items
            .iter()
            .any(|nested| selection_matches_keys(nested, keys)),
        Selection::FragmentSpread(spread) => keys.iter().any(|k| k == &spread.name),
    }
}
