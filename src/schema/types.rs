// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Schema type registry

use std::collections::HashMap;

use thiserror::Error;

use crate::ast::TypeRef;

/// Schema loading errors
#[derive(Debug, Clone, Error)]
pub enum SchemaError {
    #[error("SDL parse error: {0}")]
    Sdl(String),
    #[error("Introspection payload error: {0}")]
    Introspection(String),
    #[error("Unknown type referenced by schema: {0}")]
    UnknownType(String),
    #[error("Schema has no query root type")]
    MissingQueryRoot,
}

/// A field definition on an object, interface or input type.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDefinition {
    pub name: String,
    pub argument_names: Vec<String>,
    pub field_type: TypeRef,
}

/// Shared shape of object and interface types.
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectLikeType {
    pub name: String,
    pub interfaces: Vec<String>,
    pub fields: Vec<FieldDefinition>,
}

impl ObjectLikeType {
    pub fn field(&self, name: &str) -> Option<&FieldDefinition> {
        self.fields.iter().find(|f| f.name == name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TypeDefinition {
    Object(ObjectLikeType),
    Interface(ObjectLikeType),
    Union { name: String, members: Vec<String> },
    Enum { name: String, values: Vec<String> },
    Scalar { name: String },
    InputObject { name: String },
}

impl TypeDefinition {
    pub fn name(&self) -> &str {
        match self {
            TypeDefinition::Object(t) | TypeDefinition::Interface(t) => &t.name,
            TypeDefinition::Union { name, .. }
            | TypeDefinition::Enum { name, .. }
            | TypeDefinition::Scalar { name }
            | TypeDefinition::InputObject { name } => name,
        }
    }

    /// Composite types carry selection sets; leaves do not.
    pub fn is_composite(&self) -> bool {
        matches!(
            self,
            TypeDefinition::Object(_) | TypeDefinition::Interface(_) | TypeDefinition::Union { .. }
        )
    }
}

/// The resolved schema registry.
#[derive(Debug, Clone)]
pub struct Schema {
    types: HashMap<String, TypeDefinition>,
    query_type: String,
    mutation_type: Option<String>,
    subscription_type: Option<String>,
}

impl Schema {
    pub(crate) fn new(
        types: HashMap<String, TypeDefinition>,
        query_type: String,
        mutation_type: Option<String>,
        subscription_type: Option<String>,
    ) -> Result<Self, SchemaError> {
        if !types.contains_key(&query_type) {
            return Err(SchemaError::MissingQueryRoot);
        }
        Ok(Self {
            types,
            query_type,
            mutation_type,
            subscription_type,
        })
    }

    pub fn type_definition(&self, name: &str) -> Option<&TypeDefinition> {
        self.types.get(name)
    }

    pub fn query_type(&self) -> &str {
        &self.query_type
    }

    pub fn mutation_type(&self) -> Option<&str> {
        self.mutation_type.as_deref()
    }

    pub fn subscription_type(&self) -> Option<&str> {
        self.subscription_type.as_deref()
    }

    /// Root type name for an operation kind, if the schema defines one.
    pub fn operation_root(&self, kind: crate::ast::OperationKind) -> Option<&str> {
        match kind {
            crate::ast::OperationKind::Query => Some(&self.query_type),
            crate::ast::OperationKind::Mutation => self.mutation_type(),
            crate::ast::OperationKind::Subscription => self.subscription_type(),
        }
    }

    /// The field definition of `field` on composite type `parent`.
    /// Interfaces resolve their own fields; unions expose no fields.
    pub fn field_definition(&self, parent: &str, field: &str) -> Option<&FieldDefinition> {
        match self.types.get(parent)? {
            TypeDefinition::Object(t) | TypeDefinition::Interface(t) => t.field(field),
            _ => None,
        }
    }

    /// Whether `name` names a composite (selectable) type.
    pub fn is_composite(&self, name: &str) -> bool {
        self.types
            .get(name)
            .map(TypeDefinition::is_composite)
            .unwrap_or(false)
    }

    /// Whether the type exposes a field named `resource_key` — the marker
    /// that instances of the type are identifiable cache entities.
    pub fn has_resource_key(&self, type_name: &str, resource_key: &str) -> bool {
        self.field_definition(type_name, resource_key).is_some()
    }

    /// Whether a selection conditioned on `condition` can apply to a value
    /// whose static type is `parent`: the same type, a condition the parent
    /// implements, a union the parent belongs to, or a member/implementor
    /// of an abstract parent.
    pub fn type_condition_matches(&self, parent: &str, condition: &str) -> bool {
        if parent == condition {
            return true;
        }
        match (self.types.get(parent), self.types.get(condition)) {
            (Some(TypeDefinition::Object(obj)), Some(TypeDefinition::Interface(_))) => {
                obj.interfaces.iter().any(|i| i == condition)
            }
            (Some(TypeDefinition::Object(_)), Some(TypeDefinition::Union { members, .. })) => {
                members.iter().any(|m| m == parent)
            }
            (Some(TypeDefinition::Interface(_)), Some(TypeDefinition::Object(obj))) => {
                obj.interfaces.iter().any(|i| i == parent)
            }
            (Some(TypeDefinition::Union { members, .. }), Some(TypeDefinition::Object(_))) => {
                members.iter().any(|m| m == condition)
            }
            _ => false,
        }
    }

}
