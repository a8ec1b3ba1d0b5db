// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! The request parser: raw query text in, canonical request out
//!
//! Normalisation order is observable and fixed: fragments are prepended
//! before parsing, variables are inlined before spreads (so fragment
//! arguments-by-variable resolve), spreads before resource-key insertion
//! (so inserted keys land in every branch), and the type map is built on
//! the final shape that gets printed and validated.

use std::collections::HashMap;
use std::sync::Arc;

use log::debug;
use serde_json::Value as JsonValue;
use thiserror::Error;

use crate::ast::{
    parse_document, print_document, Argument, Definition, Directive, Document, Field,
    FragmentDefinition, InlineFragment, OperationDefinition, ParserError, Selection, SelectionSet,
    Value,
};
use crate::schema::{Schema, ValidationError};

use super::context::{FieldTypeInfo, RequestContext};
use super::RequestOptions;

/// Request normalisation errors
#[derive(Debug, Clone, Error)]
pub enum RequestError {
    #[error(transparent)]
    Parser(#[from] ParserError),
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("Document contains no executable operation")]
    MissingOperation,
    #[error("Document contains {0} operations; requests are single-operation")]
    TooManyOperations(usize),
    #[error("Variable '${0}' has no value and no default")]
    UndefinedVariable(String),
    #[error("Unknown fragment '{0}'")]
    UnknownFragment(String),
    #[error("Fragment cycle through '{0}'")]
    FragmentCycle(String),
}

/// A normalised, validated request.
#[derive(Debug, Clone)]
pub struct ParsedRequest {
    /// The canonical query string; input to the fingerprint.
    pub query: String,
    /// The normalised document: one operation, fields and inline fragments
    /// only, resource keys present.
    pub document: Document,
}

/// Stateless request parser bound to a schema and resource key.
#[derive(Debug, Clone)]
pub struct RequestParser {
    schema: Arc<Schema>,
    resource_key: String,
}

impl RequestParser {
    pub fn new(schema: Arc<Schema>, resource_key: impl Into<String>) -> Self {
        Self {
            schema,
            resource_key: resource_key.into(),
        }
    }

    /// Run the full normalisation pipeline.
    pub fn parse(
        &self,
        query: &str,
        options: &RequestOptions,
    ) -> Result<(ParsedRequest, RequestContext), RequestError> {
        let source = assemble_source(&options.fragments, query);
        let document = parse_document(&source)?;

        let operations = document.operation_definitions();
        let mut operation = match operations.len() {
            0 => return Err(RequestError::MissingOperation),
            1 => operations[0].clone(),
            n => return Err(RequestError::TooManyOperations(n)),
        };

        let mut ctx = RequestContext::new(
            operation.kind,
            operation
                .name
                .clone()
                .or_else(|| options.operation_name.clone()),
        );

        self.inline_variables(&mut operation, options)?;
        let fragments = document.fragments();
        inline_spreads(&mut operation.selection_set, &fragments, &mut Vec::new())?;

        if let Some(root) = self.schema.operation_root(operation.kind) {
            let root = root.to_string();
            self.insert_resource_keys(&mut operation.selection_set, &root);
            self.map_field_types(&operation.selection_set, &root, "", &mut ctx);
        }

        let normalized = Document {
            definitions: vec![Definition::Operation(operation)],
        };
        let query = print_document(&normalized);
        crate::schema::validate_document(&self.schema, &normalized)?;

        debug!(
            "normalised {} request '{}' ({} typed fields)",
            ctx.operation,
            ctx.operation_name.as_deref().unwrap_or("<anonymous>"),
            ctx.field_type_map.len()
        );

        Ok((
            ParsedRequest {
                query,
                document: normalized,
            },
            ctx,
        ))
    }

    /// Replace every variable reference with its literal value, then drop
    /// the variable definitions so the canonical form is caller-invariant.
    fn inline_variables(
        &self,
        operation: &mut OperationDefinition,
        options: &RequestOptions,
    ) -> Result<(), RequestError> {
        let mut values: HashMap<String, Value> = HashMap::new();
        if let Some(variables) = &options.variables {
            for (name, value) in variables {
                values.insert(name.clone(), json_to_literal(value));
            }
        }
        for definition in &operation.variable_definitions {
            if !values.contains_key(&definition.name) {
                if let Some(default) = &definition.default_value {
                    values.insert(definition.name.clone(), default.clone());
                }
            }
        }

        inline_in_directives(&mut operation.directives, &values)?;
        inline_in_selection_set(&mut operation.selection_set, &values)?;
        operation.variable_definitions.clear();
        Ok(())
    }

    /// Insert the resource-key field into every selection set whose parent
    /// type exposes it, so the resolver can always identify entities.
    fn insert_resource_keys(&self, selection_set: &mut SelectionSet, parent_type: &str) {
        for selection in &mut selection_set.items {
            match selection {
                Selection::Field(field) => {
                    if field.name == "__typename" {
                        continue;
                    }
                    let Some(definition) = self.schema.field_definition(parent_type, &field.name)
                    else {
                        continue;
                    };
                    let child_type = definition.field_type.named_type().to_string();
                    if let Some(children) = field.selection_set.as_mut() {
                        if self.schema.has_resource_key(&child_type, &self.resource_key)
                            && !selects_field(children, &child_type, &self.resource_key)
                        {
                            children
                                .items
                                .push(Selection::Field(Field::named(&self.resource_key)));
                        }
                        self.insert_resource_keys(children, &child_type);
                    }
                }
                Selection::InlineFragment(inline) => {
                    let effective = inline
                        .type_condition
                        .clone()
                        .unwrap_or_else(|| parent_type.to_string());
                    self.insert_resource_keys(&mut inline.selection_set, &effective);
                }
                Selection::FragmentSpread(_) => {}
            }
        }
    }

    /// Record the resolved type of every field position, keyed by the
    /// alias- and argument-free name path.
    fn map_field_types(
        &self,
        selection_set: &SelectionSet,
        parent_type: &str,
        hash_path: &str,
        ctx: &mut RequestContext,
    ) {
        for selection in &selection_set.items {
            match selection {
                Selection::Field(field) => {
                    let hash_key = if hash_path.is_empty() {
                        field.name.clone()
                    } else {
                        format!("{}.{}", hash_path, field.name)
                    };
                    if field.name == "__typename" {
                        ctx.field_type_map.insert(
                            hash_key,
                            FieldTypeInfo {
                                type_name: "String".to_string(),
                                is_entity: false,
                                is_list: false,
                                has_arguments: false,
                            },
                        );
                        continue;
                    }
                    let Some(definition) = self.schema.field_definition(parent_type, &field.name)
                    else {
                        continue;
                    };
                    let type_name = definition.field_type.named_type().to_string();
                    ctx.field_type_map.insert(
                        hash_key.clone(),
                        FieldTypeInfo {
                            is_entity: self.schema.is_composite(&type_name)
                                && self.schema.has_resource_key(&type_name, &self.resource_key),
                            is_list: definition.field_type.is_list(),
                            has_arguments: !field.arguments.is_empty(),
                            type_name: type_name.clone(),
                        },
                    );
                    if let Some(children) = &field.selection_set {
                        self.map_field_types(children, &type_name, &hash_key, ctx);
                    }
                }
                Selection::InlineFragment(inline) => {
                    let effective = inline.type_condition.as_deref().unwrap_or(parent_type);
                    self.map_field_types(&inline.selection_set, effective, hash_path, ctx);
                }
                Selection::FragmentSpread(_) => {}
            }
        }
    }
}

fn assemble_source(fragments: &[String], query: &str) -> String {
    if fragments.is_empty() {
        query.to_string()
    } else {
        let mut source = fragments.join("\n");
        source.push('\n');
        source.push_str(query);
        source
    }
}

fn json_to_literal(value: &JsonValue) -> Value {
    match value {
        JsonValue::Null => Value::Null,
        JsonValue::Bool(b) => Value::Boolean(*b),
        JsonValue::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::Int(i)
            } else {
                Value::Float(n.as_f64().unwrap_or(0.0))
            }
        }
        JsonValue::String(s) => Value::String(s.clone()),
        JsonValue::Array(items) => Value::List(items.iter().map(json_to_literal).collect()),
        JsonValue::Object(fields) => Value::Object(
            fields
                .iter()
                .map(|(name, value)| (name.clone(), json_to_literal(value)))
                .collect(),
        ),
    }
}

fn inline_in_selection_set(
    selection_set: &mut SelectionSet,
    values: &HashMap<String, Value>,
) -> Result<(), RequestError> {
    for selection in &mut selection_set.items {
        match selection {
            Selection::Field(field) => {
                inline_in_arguments(&mut field.arguments, values)?;
                inline_in_directives(&mut field.directives, values)?;
                if let Some(children) = field.selection_set.as_mut() {
                    inline_in_selection_set(children, values)?;
                }
            }
            Selection::InlineFragment(inline) => {
                inline_in_directives(&mut inline.directives, values)?;
                inline_in_selection_set(&mut inline.selection_set, values)?;
            }
            Selection::FragmentSpread(spread) => {
                inline_in_directives(&mut spread.directives, values)?;
            }
        }
    }
    Ok(())
}

fn inline_in_directives(
    directives: &mut [Directive],
    values: &HashMap<String, Value>,
) -> Result<(), RequestError> {
    for directive in directives {
        inline_in_arguments(&mut directive.arguments, values)?;
    }
    Ok(())
}

fn inline_in_arguments(
    arguments: &mut [Argument],
    values: &HashMap<String, Value>,
) -> Result<(), RequestError> {
    for argument in arguments {
        argument.value = resolve_value(&argument.value, values)?;
    }
    Ok(())
}

fn resolve_value(value: &Value, values: &HashMap<String, Value>) -> Result<Value, RequestError> {
    match value {
        Value::Variable(name) => values
            .get(name)
            .cloned()
            .ok_or_else(|| RequestError::UndefinedVariable(name.clone())),
        Value::List(items) => Ok(Value::List(
            items
                .iter()
                .map(|item| resolve_value(item, values))
                .collect::<Result<_, _>>()?,
        )),
        Value::Object(fields) => Ok(Value::Object(
            fields
                .iter()
                .map(|(name, value)| Ok((name.clone(), resolve_value(value, values)?)))
                .collect::<Result<_, RequestError>>()?,
        )),
        other => Ok(other.clone()),
    }
}

/// Replace fragment spreads with inline fragments carrying the fragment's
/// type condition, recursively, cycle-checked.
fn inline_spreads(
    selection_set: &mut SelectionSet,
    fragments: &HashMap<&str, &FragmentDefinition>,
    stack: &mut Vec<String>,
) -> Result<(), RequestError> {
    for selection in &mut selection_set.items {
        match selection {
            Selection::Field(field) => {
                if let Some(children) = field.selection_set.as_mut() {
                    inline_spreads(children, fragments, stack)?;
                }
            }
            Selection::InlineFragment(inline) => {
                inline_spreads(&mut inline.selection_set, fragments, stack)?;
            }
            Selection::FragmentSpread(spread) => {
                let fragment = fragments
                    .get(spread.name.as_str())
                    .ok_or_else(|| RequestError::UnknownFragment(spread.name.clone()))?;
                if stack.contains(&spread.name) {
                    return Err(RequestError::FragmentCycle(spread.name.clone()));
                }
                stack.push(spread.name.clone());
                let mut inlined = fragment.selection_set.clone();
                inline_spreads(&mut inlined, fragments, stack)?;
                stack.pop();
                *selection = Selection::InlineFragment(InlineFragment {
                    type_condition: Some(fragment.type_condition.clone()),
                    directives: spread.directives.clone(),
                    selection_set: inlined,
                });
            }
        }
    }
    Ok(())
}

/// Whether the selection set already selects `name` for values of
/// `parent_type`: directly, or inside an inline fragment that applies
/// unconditionally.
fn selects_field(selection_set: &SelectionSet, parent_type: &str, name: &str) -> bool {
    selection_set.items.iter().any(|selection| match selection {
        Selection::Field(field) => field.name == name,
        Selection::InlineFragment(inline) => match &inline.type_condition {
            None => selects_field(&inline.selection_set, parent_type, name),
            Some(condition) if condition == parent_type => {
                selects_field(&inline.selection_set, parent_type, name)
            }
            Some(_) => false,
        },
        Selection::FragmentSpread(_) => false,
    })
}
