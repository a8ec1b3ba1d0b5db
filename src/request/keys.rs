// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Field key and path-cursor computation
//!
//! Every field visited by the analyser or resolver is addressed by six
//! coordinates derived from the field node and its position:
//!
//! - `name`      — the plain field name
//! - `data_key`  — alias else name; the key in shaped response data
//! - `query_key` — name plus serialised arguments; alias independent
//! - `cache_key` — the full dotted path of `query_key` segments from the
//!                 root; keys the path tier and CacheMetadata. Argument
//!                 serialisation is what keeps `user(id:1)` and
//!                 `user(id:2)` apart; identified entities are qualified
//!                 further by the entity refs the path tier stores.
//! - `hash_key`  — the alias- and argument-free name path; keys the
//!                 field type map
//!
//! Inside list contexts the element index is the sixth coordinate; it is
//! carried on the cursors ([`PathCursors::index`]) and rendered `[i]` in
//! the data and cache paths.

use serde_json::Value as JsonValue;

use crate::ast::{Argument, Field};

/// The three path cursors carried down a document walk.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PathCursors {
    /// Response-shaped path: data keys joined by `.`, list indices `[i]`.
    pub data_path: String,
    /// Canonical cache path: query keys joined by `.`, list indices `[i]`.
    pub cache_path: String,
    /// Name-only path, no aliases, no arguments, no indices.
    pub hash_path: String,
}

impl PathCursors {
    pub fn root() -> Self {
        Self::default()
    }

    /// Cursors for a list element at `index` under these cursors.
    pub fn index(&self, index: usize) -> Self {
        Self {
            data_path: format!("{}[{}]", self.data_path, index),
            cache_path: format!("{}[{}]", self.cache_path, index),
            hash_path: self.hash_path.clone(),
        }
    }
}

/// The key coordinates of one visited field.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldKeys {
    pub name: String,
    pub data_key: String,
    pub query_key: String,
    pub cache_key: String,
    pub hash_key: String,
}

impl FieldKeys {
    /// Compute the keys of `field` as seen under `parent` cursors.
    pub fn build(field: &Field, parent: &PathCursors) -> Self {
        let query_key = query_key_of(field);
        Self {
            name: field.name.clone(),
            data_key: field.response_key().to_string(),
            cache_key: join(&parent.cache_path, &query_key),
            hash_key: join(&parent.hash_path, &field.name),
            query_key,
        }
    }

    /// Child cursors for recursing beneath this field.
    pub fn child_cursors(&self, parent: &PathCursors) -> PathCursors {
        PathCursors {
            data_path: join(&parent.data_path, &self.data_key),
            cache_path: self.cache_key.clone(),
            hash_path: self.hash_key.clone(),
        }
    }
}

fn join(parent: &str, segment: &str) -> String {
    if parent.is_empty() {
        segment.to_string()
    } else {
        format!("{}.{}", parent, segment)
    }
}

fn query_key_of(field: &Field) -> String {
    if field.arguments.is_empty() {
        field.name.clone()
    } else {
        format!("{}({})", field.name, serialize_arguments(&field.arguments))
    }
}

/// Serialise arguments to a compact JSON object with name-sorted keys, so
/// the segment is independent of the order the caller wrote them in.
pub fn serialize_arguments(arguments: &[Argument]) -> String {
    let mut sorted: Vec<&Argument> = arguments.iter().collect();
    sorted.sort_by(|a, b| a.name.cmp(&b.name));
    let mut map = serde_json::Map::new();
    for argument in sorted {
        map.insert(argument.name.clone(), argument.value.to_json());
    }
    serde_json::to_string(&JsonValue::Object(map)).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{parse_document, Selection};

    fn first_field(source: &str) -> Field {
        let doc = parse_document(source).unwrap();
        match &doc.operation_definitions()[0].selection_set.items[0] {
            Selection::Field(field) => field.clone(),
            other => panic!("expected field, got {:?}", other),
        }
    }

    #[test]
    fn keys_for_a_plain_field() {
        let field = first_field("{ name }");
        let keys = FieldKeys::build(&field, &PathCursors::root());
        assert_eq!(keys.query_key, "name");
        assert_eq!(keys.data_key, "name");
        assert_eq!(keys.cache_key, "name");
        assert_eq!(keys.hash_key, "name");
    }

    #[test]
    fn arguments_qualify_cache_paths() {
        let one = FieldKeys::build(&first_field("{ user(id: \"1\") { id } }"), &PathCursors::root());
        let two = FieldKeys::build(&first_field("{ user(id: \"2\") { id } }"), &PathCursors::root());
        assert_eq!(one.cache_key, "user({\"id\":\"1\"})");
        assert_ne!(one.cache_key, two.cache_key);
        // The name-only key is shared.
        assert_eq!(one.hash_key, two.hash_key);
    }

    #[test]
    fn argument_order_does_not_matter() {
        let a = FieldKeys::build(
            &first_field("{ search(term: \"x\", limit: 5) { id } }"),
            &PathCursors::root(),
        );
        let b = FieldKeys::build(
            &first_field("{ search(limit: 5, term: \"x\") { id } }"),
            &PathCursors::root(),
        );
        assert_eq!(a.cache_key, b.cache_key);
    }

    #[test]
    fn aliases_change_only_the_data_key() {
        let field = first_field("{ me: user(id: \"1\") { id } }");
        let keys = FieldKeys::build(&field, &PathCursors::root());
        assert_eq!(keys.data_key, "me");
        assert_eq!(keys.query_key, "user({\"id\":\"1\"})");
        assert_eq!(keys.hash_key, "user");
    }

    #[test]
    fn cursors_nest_and_index() {
        let field = first_field("{ user(id: \"1\") { id } }");
        let keys = FieldKeys::build(&field, &PathCursors::root());
        let child = keys.child_cursors(&PathCursors::root());
        assert_eq!(child.cache_path, "user({\"id\":\"1\"})");

        let element = child.index(2);
        assert_eq!(element.cache_path, "user({\"id\":\"1\"})[2]");
        assert_eq!(element.data_path, "user[2]");
        assert_eq!(element.hash_path, "user");
    }
}
