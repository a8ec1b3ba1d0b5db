// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Introspection JSON loader
//!
//! Accepts the standard introspection result shape, with or without the
//! surrounding `{"data": ...}` envelope, and converts it into the same
//! registry the SDL loader produces.

use std::collections::HashMap;

use serde::Deserialize;

use crate::ast::TypeRef;

use super::types::{FieldDefinition, ObjectLikeType, Schema, SchemaError, TypeDefinition};

#[derive(Debug, Deserialize)]
struct Envelope {
    data: Option<Payload>,
    #[serde(rename = "__schema")]
    schema: Option<IntrospectionSchema>,
}

#[derive(Debug, Deserialize)]
struct Payload {
    #[serde(rename = "__schema")]
    schema: IntrospectionSchema,
}

#[derive(Debug, Deserialize)]
struct IntrospectionSchema {
    #[serde(rename = "queryType")]
    query_type: NamedTypeRef,
    #[serde(rename = "mutationType")]
    mutation_type: Option<NamedTypeRef>,
    #[serde(rename = "subscriptionType")]
    subscription_type: Option<NamedTypeRef>,
    types: Vec<IntrospectionType>,
}

#[derive(Debug, Deserialize)]
struct NamedTypeRef {
    name: String,
}

#[derive(Debug, Deserialize)]
struct IntrospectionType {
    kind: String,
    name: Option<String>,
    #[serde(default)]
    fields: Option<Vec<IntrospectionField>>,
    #[serde(default)]
    interfaces: Option<Vec<NamedTypeRef>>,
    #[serde(default, rename = "possibleTypes")]
    possible_types: Option<Vec<NamedTypeRef>>,
    #[serde(default, rename = "enumValues")]
    enum_values: Option<Vec<IntrospectionEnumValue>>,
}

#[derive(Debug, Deserialize)]
struct IntrospectionField {
    name: String,
    #[serde(default)]
    args: Vec<IntrospectionInputValue>,
    #[serde(rename = "type")]
    field_type: IntrospectionTypeRef,
}

#[derive(Debug, Deserialize)]
struct IntrospectionInputValue {
    name: String,
}

#[derive(Debug, Deserialize)]
struct IntrospectionEnumValue {
    name: String,
}

#[derive(Debug, Deserialize)]
struct IntrospectionTypeRef {
    kind: String,
    name: Option<String>,
    #[serde(rename = "ofType")]
    of_type: Option<Box<IntrospectionTypeRef>>,
}

impl IntrospectionTypeRef {
    fn to_type_ref(&self) -> Result<TypeRef, SchemaError> {
        match self.kind.as_str() {
            "NON_NULL" => {
                let inner = self
                    .of_type
                    .as_ref()
                    .ok_or_else(|| missing("NON_NULL wrapper without ofType"))?;
                Ok(TypeRef::NonNull(Box::new(inner.to_type_ref()?)))
            }
            "LIST" => {
                let inner = self
                    .of_type
                    .as_ref()
                    .ok_or_else(|| missing("LIST wrapper without ofType"))?;
                Ok(TypeRef::List(Box::new(inner.to_type_ref()?)))
            }
            _ => {
                let name = self
                    .name
                    .as_ref()
                    .ok_or_else(|| missing("named type without a name"))?;
                Ok(TypeRef::Named(name.clone()))
            }
        }
    }
}

fn missing(detail: &str) -> SchemaError {
    SchemaError::Introspection(detail.to_string())
}

/// Build a schema registry from an introspection result.
pub fn from_introspection(payload: &serde_json::Value) -> Result<Schema, SchemaError> {
    let envelope: Envelope = serde_json::from_value(payload.clone())
        .map_err(|e| SchemaError::Introspection(e.to_string()))?;
    let schema = match (envelope.data, envelope.schema) {
        (Some(data), _) => data.schema,
        (None, Some(schema)) => schema,
        (None, None) => return Err(missing("payload has no __schema")),
    };

    let mut types = HashMap::new();
    for ty in &schema.types {
        let Some(name) = ty.name.clone() else {
            continue;
        };
        // The meta types (`__Schema`, `__Type`, ...) are not part of the
        // cacheable surface.
        if name.starts_with("__") {
            continue;
        }
        let definition = match ty.kind.as_str() {
            "OBJECT" | "INTERFACE" => {
                let fields = ty
                    .fields
                    .as_deref()
                    .unwrap_or(&[])
                    .iter()
                    .map(|f| {
                        Ok(FieldDefinition {
                            name: f.name.clone(),
                            argument_names: f.args.iter().map(|a| a.name.clone()).collect(),
                            field_type: f.field_type.to_type_ref()?,
                        })
                    })
                    .collect::<Result<Vec<_>, SchemaError>>()?;
                let interfaces = ty
                    .interfaces
                    .as_deref()
                    .unwrap_or(&[])
                    .iter()
                    .map(|i| i.name.clone())
                    .collect();
                let def = ObjectLikeType {
                    name: name.clone(),
                    interfaces,
                    fields,
                };
                if ty.kind == "OBJECT" {
                    TypeDefinition::Object(def)
                } else {
                    TypeDefinition::Interface(def)
                }
            }
            "UNION" => TypeDefinition::Union {
                name: name.clone(),
                members: ty
                    .possible_types
                    .as_deref()
                    .unwrap_or(&[])
                    .iter()
                    .map(|t| t.name.clone())
                    .collect(),
            },
            "ENUM" => TypeDefinition::Enum {
                name: name.clone(),
                values: ty
                    .enum_values
                    .as_deref()
                    .unwrap_or(&[])
                    .iter()
                    .map(|v| v.name.clone())
                    .collect(),
            },
            "SCALAR" => TypeDefinition::Scalar { name: name.clone() },
            "INPUT_OBJECT" => TypeDefinition::InputObject { name: name.clone() },
            other => {
                return Err(SchemaError::Introspection(format!(
                    "unknown type kind '{}'",
                    other
                )))
            }
        };
        types.insert(name, definition);
    }

    Schema::new(
        types,
        schema.query_type.name,
        schema.mutation_type.map(|t| t.name),
        schema.subscription_type.map(|t| t.name),
    )
}
