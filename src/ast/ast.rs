// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! AST node types for executable GraphQL documents
//!
//! The model deliberately covers executable documents only; type-system
//! definitions are handled by the schema loader, which works from the same
//! token stream but builds registry types directly.

use std::collections::HashMap;
use std::fmt;

/// A parsed GraphQL document: operations plus the fragment table.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub definitions: Vec<Definition>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Definition {
    Operation(OperationDefinition),
    Fragment(FragmentDefinition),
}

/// The kind of an operation definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationKind {
    Query,
    Mutation,
    Subscription,
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OperationKind::Query => write!(f, "query"),
            OperationKind::Mutation => write!(f, "mutation"),
            OperationKind::Subscription => write!(f, "subscription"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OperationDefinition {
    pub kind: OperationKind,
    pub name: Option<String>,
    pub variable_definitions: Vec<VariableDefinition>,
    pub directives: Vec<Directive>,
    pub selection_set: SelectionSet,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VariableDefinition {
    pub name: String,
    pub var_type: TypeRef,
    pub default_value: Option<Value>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FragmentDefinition {
    pub name: String,
    pub type_condition: String,
    pub directives: Vec<Directive>,
    pub selection_set: SelectionSet,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct SelectionSet {
    pub items: Vec<Selection>,
}

impl SelectionSet {
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Selection {
    Field(Field),
    FragmentSpread(FragmentSpread),
    InlineFragment(InlineFragment),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub alias: Option<String>,
    pub name: String,
    pub arguments: Vec<Argument>,
    pub directives: Vec<Directive>,
    /// `None` for leaf fields; composite fields carry a selection set.
    pub selection_set: Option<SelectionSet>,
}

impl Field {
    /// Bare field with no alias, arguments or children. The normaliser uses
    /// this when inserting resource-key selections.
    pub fn named(name: &str) -> Self {
        Self {
            alias: None,
            name: name.to_string(),
            arguments: Vec::new(),
            directives: Vec::new(),
            selection_set: None,
        }
    }

    /// The key this field occupies in response data: alias when present,
    /// field name otherwise.
    pub fn response_key(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FragmentSpread {
    pub name: String,
    pub directives: Vec<Directive>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct InlineFragment {
    pub type_condition: Option<String>,
    pub directives: Vec<Directive>,
    pub selection_set: SelectionSet,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Argument {
    pub name: String,
    pub value: Value,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Directive {
    pub name: String,
    pub arguments: Vec<Argument>,
}

/// A GraphQL input value literal.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Variable(String),
    Int(i64),
    Float(f64),
    String(String),
    Boolean(bool),
    Null,
    Enum(String),
    List(Vec<Value>),
    Object(Vec<(String, Value)>),
}

impl Value {
    /// Convert a literal to its JSON shape. Enum values become strings;
    /// variables must have been inlined before this is called and map to
    /// `null` defensively rather than panicking.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Variable(_) | Value::Null => serde_json::Value::Null,
            Value::Int(i) => serde_json::Value::from(*i),
            Value::Float(f) => serde_json::Number::from_f64(*f)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Value::String(s) | Value::Enum(s) => serde_json::Value::String(s.clone()),
            Value::Boolean(b) => serde_json::Value::Bool(*b),
            Value::List(items) => {
                serde_json::Value::Array(items.iter().map(Value::to_json).collect())
            }
            Value::Object(fields) => {
                let mut map = serde_json::Map::new();
                for (name, value) in fields {
                    map.insert(name.clone(), value.to_json());
                }
                serde_json::Value::Object(map)
            }
        }
    }
}

/// A type reference as written in a variable definition.
#[derive(Debug, Clone, PartialEq)]
pub enum TypeRef {
    Named(String),
    List(Box<TypeRef>),
    NonNull(Box<TypeRef>),
}

impl TypeRef {
    /// Unwrap list and non-null wrappers down to the named type.
    pub fn named_type(&self) -> &str {
        match self {
            TypeRef::Named(name) => name,
            TypeRef::List(inner) | TypeRef::NonNull(inner) => inner.named_type(),
        }
    }

    /// Whether any level of this reference is a list.
    pub fn is_list(&self) -> bool {
        match self {
            TypeRef::Named(_) => false,
            TypeRef::List(_) => true,
            TypeRef::NonNull(inner) => inner.is_list(),
        }
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeRef::Named(name) => write!(f, "{}", name),
            TypeRef::List(inner) => write!(f, "[{}]", inner),
            TypeRef::NonNull(inner) => write!(f, "{}!", inner),
        }
    }
}

impl Document {
    /// Operation definitions in document order.
    pub fn operation_definitions(&self) -> Vec<&OperationDefinition> {
        self.definitions
            .iter()
            .filter_map(|def| match def {
                Definition::Operation(op) => Some(op),
                Definition::Fragment(_) => None,
            })
            .collect()
    }

    /// Fragment table keyed by fragment name.
    pub fn fragments(&self) -> HashMap<&str, &FragmentDefinition> {
        self.definitions
            .iter()
            .filter_map(|def| match def {
                Definition::Fragment(frag) => Some((frag.name.as_str(), frag)),
                Definition::Operation(_) => None,
            })
            .collect()
    }

    pub fn fragment(&self, name: &str) -> Option<&FragmentDefinition> {
        self.definitions.iter().find_map(|def| match def {
            Definition::Fragment(frag) if frag.name == name => Some(frag),
            _ => None,
        })
    }
}

/// A field yielded by [`iterate_child_fields`] together with the type its
/// selection was conditioned on (the enclosing inline-fragment condition,
/// or the parent type when unconditioned).
#[derive(Debug, Clone, Copy)]
pub struct ChildField<'a> {
    pub field: &'a Field,
    pub parent_type: &'a str,
}

/// Iterate the field nodes of a selection set, descending transparently
/// through inline fragments. Fragment spreads are resolved through the
/// document's fragment table; the normaliser converts spreads to inline
/// fragments, so on normalised documents the table is never consulted.
pub fn iterate_child_fields<'a>(
    selection_set: &'a SelectionSet,
    parent_type: &'a str,
    fragments: &HashMap<&'a str, &'a FragmentDefinition>,
    out: &mut Vec<ChildField<'a>>,
) {
    for selection in &selection_set.items {
        match selection {
            Selection::Field(field) => out.push(ChildField { field, parent_type }),
            Selection::InlineFragment(inline) => {
                let effective = inline.type_condition.as_deref().unwrap_or(parent_type);
                iterate_child_fields(&inline.selection_set, effective, fragments, out);
            }
            Selection::FragmentSpread(spread) => {
                if let Some(frag) = fragments.get(spread.name.as_str()) {
                    iterate_child_fields(
                        &frag.selection_set,
                        frag.type_condition.as_str(),
                        fragments,
                        out,
                    );
                }
            }
        }
    }
}
