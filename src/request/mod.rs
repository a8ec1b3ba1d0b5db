// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Request normalisation pipeline
//!
//! Turns a raw query string plus caller options into the canonical form the
//! cache operates on: variables inlined, fragments inlined, resource keys
//! inserted, field types recorded, canonical string printed and validated.

pub mod context;
pub mod hash;
pub mod keys;
pub mod parser;

pub use context::{FieldTypeInfo, RequestContext};
pub use hash::hash_request;
pub use keys::{serialize_arguments, FieldKeys, PathCursors};
pub use parser::{ParsedRequest, RequestError, RequestParser};

use serde_json::Value as JsonValue;

/// Per-request caller options.
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    /// Values for the operation's variables, by name.
    pub variables: Option<serde_json::Map<String, JsonValue>>,
    /// Additional fragment documents prepended to the query text.
    pub fragments: Vec<String>,
    /// Operation name, recorded on the context for observability.
    pub operation_name: Option<String>,
    /// When set, `request` awaits the cache write phase before returning.
    pub await_data_cached: bool,
    /// Opaque grouping key stored alongside every cache write; filtered
    /// export selects by it.
    pub tag: Option<JsonValue>,
}
