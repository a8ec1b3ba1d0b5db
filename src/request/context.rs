// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Per-request context

use std::collections::HashMap;

use uuid::Uuid;

use crate::ast::OperationKind;

/// Resolved type information for one field position, keyed by the field's
/// `hash_key` in [`RequestContext::field_type_map`].
#[derive(Debug, Clone, PartialEq)]
pub struct FieldTypeInfo {
    /// Named GraphQL type of the field (list/non-null wrappers stripped).
    pub type_name: String,
    /// Whether values of this field are identifiable cache entities.
    pub is_entity: bool,
    /// Whether the field's type is list-shaped at any wrapper level.
    pub is_list: bool,
    pub has_arguments: bool,
}

/// Context threaded through one request from parse to resolve.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub request_id: Uuid,
    pub operation: OperationKind,
    pub operation_name: Option<String>,
    pub field_type_map: HashMap<String, FieldTypeInfo>,
}

impl RequestContext {
    pub fn new(operation: OperationKind, operation_name: Option<String>) -> Self {
        Self {
            request_id: Uuid::new_v4(),
            operation,
            operation_name,
            field_type_map: HashMap::new(),
        }
    }

    pub fn field_type(&self, hash_key: &str) -> Option<&FieldTypeInfo> {
        self.field_type_map.get(hash_key)
    }
}
