// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Document validation against the schema registry
//!
//! Runs on normalised documents (fields and inline fragments only), after
//! variable and spread inlining, which keeps the rule set small: every
//! field must exist, leaves must not have selections, composites must, and
//! argument names must be declared.

use thiserror::Error;

use crate::ast::{Document, OperationDefinition, Selection, SelectionSet};

use super::types::Schema;

/// Validation errors
#[derive(Debug, Clone, Error)]
pub enum ValidationError {
    #[error("Schema defines no {0} root operation type")]
    UnsupportedOperation(String),
    #[error("Unknown type '{0}'")]
    UnknownType(String),
    #[error("Unknown field '{field}' on type '{parent}'")]
    UnknownField { parent: String, field: String },
    #[error("Unknown argument '{argument}' on field '{parent}.{field}'")]
    UnknownArgument {
        parent: String,
        field: String,
        argument: String,
    },
    #[error("Field '{parent}.{field}' is a leaf and cannot have a selection set")]
    SelectionOnLeaf { parent: String, field: String },
    #[error("Field '{parent}.{field}' of composite type '{type_name}' requires a selection set")]
    MissingSelection {
        parent: String,
        field: String,
        type_name: String,
    },
    #[error("Type condition '{condition}' cannot apply to type '{parent}'")]
    IncompatibleTypeCondition { parent: String, condition: String },
}

/// Validate every operation of a normalised document.
pub fn validate_document(schema: &Schema, document: &Document) -> Result<(), ValidationError> {
    for operation in document.operation_definitions() {
        validate_operation(schema, operation)?;
    }
    Ok(())
}

fn validate_operation(
    schema: &Schema,
    operation: &OperationDefinition,
) -> Result<(), ValidationError> {
    let root = schema
        .operation_root(operation.kind)
        .ok_or_else(|| ValidationError::UnsupportedOperation(operation.kind.to_string()))?;
    validate_selection_set(schema, &operation.selection_set, root)
}

fn validate_selection_set(
    schema: &Schema,
    selection_set: &SelectionSet,
    parent: &str,
) -> Result<(), ValidationError> {
    for selection in &selection_set.items {
        match selection {
            Selection::Field(field) => {
                // Introspection meta fields are valid on any composite type.
                if field.name == "__typename" {
                    continue;
                }
                let definition = schema.field_definition(parent, &field.name).ok_or_else(|| {
                    ValidationError::UnknownField {
                        parent: parent.to_string(),
                        field: field.name.clone(),
                    }
                })?;

                for argument in &field.arguments {
                    if !definition.argument_names.iter().any(|a| a == &argument.name) {
                        return Err(ValidationError::UnknownArgument {
                            parent: parent.to_string(),
                            field: field.name.clone(),
                            argument: argument.name.clone(),
                        });
                    }
                }

                let type_name = definition.field_type.named_type().to_string();
                if schema.type_definition(&type_name).is_none() {
                    return Err(ValidationError::UnknownType(type_name));
                }

                match (&field.selection_set, schema.is_composite(&type_name)) {
                    (Some(children), true) => {
                        validate_selection_set(schema, children, &type_name)?
                    }
                    (Some(_), false) => {
                        return Err(ValidationError::SelectionOnLeaf {
                            parent: parent.to_string(),
                            field: field.name.clone(),
                        })
                    }
                    (None, true) => {
                        return Err(ValidationError::MissingSelection {
                            parent: parent.to_string(),
                            field: field.name.clone(),
                            type_name,
                        })
                    }
                    (None, false) => {}
                }
            }
            Selection::InlineFragment(inline) => {
                let effective = match &inline.type_condition {
                    Some(condition) => {
                        if schema.type_definition(condition).is_none() {
                            return Err(ValidationError::UnknownType(condition.clone()));
                        }
                        if !schema.type_condition_matches(parent, condition) {
                            return Err(ValidationError::IncompatibleTypeCondition {
                                parent: parent.to_string(),
                                condition: condition.clone(),
                            });
                        }
                        condition.as_str()
                    }
                    None => parent,
                };
                validate_selection_set(schema, &inline.selection_set, effective)?;
            }
            Selection::FragmentSpread(spread) => {
                // Normalisation converts spreads to inline fragments; a
                // surviving spread means the fragment was never defined.
                return Err(ValidationError::UnknownType(spread.name.clone()));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::parse_document;
    use crate::schema::sdl::parse_sdl;

    fn schema() -> Schema {
        parse_sdl(
            "type Query { user(id: ID!): User } \
             type User { id: ID! name: String friends: [User] }",
        )
        .unwrap()
    }

    #[test]
    fn accepts_a_well_formed_query() {
        let doc =
            parse_document("{ user(id: \"1\") { id name friends { id } __typename } }").unwrap();
        assert!(validate_document(&schema(), &doc).is_ok());
    }

    #[test]
    fn rejects_unknown_fields_and_arguments() {
        let doc = parse_document("{ user(id: \"1\") { age } }").unwrap();
        assert!(matches!(
            validate_document(&schema(), &doc),
            Err(ValidationError::UnknownField { .. })
        ));

        let doc = parse_document("{ user(handle: \"x\") { id } }").unwrap();
        assert!(matches!(
            validate_document(&schema(), &doc),
            Err(ValidationError::UnknownArgument { .. })
        ));
    }

    #[test]
    fn rejects_bad_selection_shapes() {
        let doc = parse_document("{ user(id: \"1\") { name { length } } }").unwrap();
        assert!(matches!(
            validate_document(&schema(), &doc),
            Err(ValidationError::SelectionOnLeaf { .. })
        ));

        let doc = parse_document("{ user(id: \"1\") }").unwrap();
        assert!(matches!(
            validate_document(&schema(), &doc),
            Err(ValidationError::MissingSelection { .. })
        ));
    }

    #[test]
    fn rejects_mutations_when_schema_has_none() {
        let doc = parse_document("mutation { touch }").unwrap();
        assert!(matches!(
            validate_document(&schema(), &doc),
            Err(ValidationError::UnsupportedOperation(_))
        ));
    }
}
