// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! SDL (type system definition language) loader
//!
//! Reuses the document lexer and walks the token stream directly, building
//! registry types rather than AST nodes. Descriptions, directives and
//! default argument values are consumed and discarded; the client only
//! needs the type topology.

use std::collections::HashMap;

use crate::ast::lexer::{tokenize, Token};
use crate::ast::TypeRef;

use super::types::{FieldDefinition, ObjectLikeType, Schema, SchemaError, TypeDefinition};

/// Parse an SDL string into a schema registry.
pub fn parse_sdl(input: &str) -> Result<Schema, SchemaError> {
    let tokens = tokenize(input).map_err(SchemaError::Sdl)?;
    let mut parser = SdlParser { tokens, pos: 0 };
    parser.schema()
}

struct SdlParser {
    tokens: Vec<Token>,
    pos: usize,
}

impl SdlParser {
    fn peek(&self) -> &Token {
        self.tokens.get(self.pos).unwrap_or(&Token::EOF)
    }

    fn advance(&mut self) -> Token {
        let token = self.tokens.get(self.pos).cloned().unwrap_or(Token::EOF);
        self.pos += 1;
        token
    }

    fn expect(&mut self, expected: Token) -> Result<(), SchemaError> {
        let found = self.advance();
        if found == expected {
            Ok(())
        } else {
            Err(SchemaError::Sdl(format!(
                "expected {:?}, found {:?}",
                expected, found
            )))
        }
    }

    fn expect_name(&mut self) -> Result<String, SchemaError> {
        match self.advance() {
            Token::Name(name) => Ok(name),
            found => Err(SchemaError::Sdl(format!("expected a name, found {:?}", found))),
        }
    }

    fn eat_keyword(&mut self, keyword: &str) -> bool {
        if matches!(self.peek(), Token::Name(name) if name == keyword) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    /// Descriptions are string literals preceding a definition.
    fn skip_description(&mut self) {
        if matches!(self.peek(), Token::Str(_)) {
            self.pos += 1;
        }
    }

    fn skip_directives(&mut self) -> Result<(), SchemaError> {
        while *self.peek() == Token::At {
            self.advance();
            self.expect_name()?;
            if *self.peek() == Token::ParenL {
                self.skip_balanced(Token::ParenL, Token::ParenR)?;
            }
        }
        Ok(())
    }

    fn skip_balanced(&mut self, open: Token, close: Token) -> Result<(), SchemaError> {
        self.expect(open.clone())?;
        let mut depth = 1usize;
        loop {
            let token = self.advance();
            if token == open {
                depth += 1;
            } else if token == close {
                depth -= 1;
                if depth == 0 {
                    return Ok(());
                }
            } else if token == Token::EOF {
                return Err(SchemaError::Sdl("unbalanced delimiters".to_string()));
            }
        }
    }

    fn schema(&mut self) -> Result<Schema, SchemaError> {
        let mut types = HashMap::new();
        let mut query_type = None;
        let mut mutation_type = None;
        let mut subscription_type = None;

        loop {
            self.skip_description();
            match self.peek().clone() {
                Token::EOF => break,
                Token::Name(keyword) => match keyword.as_str() {
                    "schema" => {
                        self.advance();
                        self.skip_directives()?;
                        self.expect(Token::BraceL)?;
                        while *self.peek() != Token::BraceR {
                            let role = self.expect_name()?;
                            self.expect(Token::Colon)?;
                            let target = self.expect_name()?;
                            match role.as_str() {
                                "query" => query_type = Some(target),
                                "mutation" => mutation_type = Some(target),
                                "subscription" => subscription_type = Some(target),
                                other => {
                                    return Err(SchemaError::Sdl(format!(
                                        "unknown operation type '{}'",
                                        other
                                    )))
                                }
                            }
                        }
                        self.expect(Token::BraceR)?;
                    }
                    "type" => {
                        let def = self.object_like(false)?;
                        types.insert(def.name().to_string(), def);
                    }
                    "interface" => {
                        let def = self.object_like(true)?;
                        types.insert(def.name().to_string(), def);
                    }
                    "union" => {
                        self.advance();
                        let name = self.expect_name()?;
                        self.skip_directives()?;
                        self.expect(Token::Equals)?;
                        let mut members = Vec::new();
                        // Optional leading pipe.
                        if *self.peek() == Token::Pipe {
                            self.advance();
                        }
                        members.push(self.expect_name()?);
                        while *self.peek() == Token::Pipe {
                            self.advance();
                            members.push(self.expect_name()?);
                        }
                        types.insert(name.clone(), TypeDefinition::Union { name, members });
                    }
                    "enum" => {
                        self.advance();
                        let name = self.expect_name()?;
                        self.skip_directives()?;
                        self.expect(Token::BraceL)?;
                        let mut values = Vec::new();
                        while *self.peek() != Token::BraceR {
                            self.skip_description();
                            values.push(self.expect_name()?);
                            self.skip_directives()?;
                        }
                        self.expect(Token::BraceR)?;
                        types.insert(name.clone(), TypeDefinition::Enum { name, values });
                    }
                    "scalar" => {
                        self.advance();
                        let name = self.expect_name()?;
                        self.skip_directives()?;
                        types.insert(name.clone(), TypeDefinition::Scalar { name });
                    }
                    "input" => {
                        self.advance();
                        let name = self.expect_name()?;
                        self.skip_directives()?;
                        if *self.peek() == Token::BraceL {
                            self.skip_balanced(Token::BraceL, Token::BraceR)?;
                        }
                        types.insert(name.clone(), TypeDefinition::InputObject { name });
                    }
                    "directive" => {
                        // `directive @name(args) on LOCATION | ...`
                        self.advance();
                        self.expect(Token::At)?;
                        self.expect_name()?;
                        if *self.peek() == Token::ParenL {
                            self.skip_balanced(Token::ParenL, Token::ParenR)?;
                        }
                        if !self.eat_keyword("on") {
                            return Err(SchemaError::Sdl(
                                "directive definition missing locations".to_string(),
                            ));
                        }
                        if *self.peek() == Token::Pipe {
                            self.advance();
                        }
                        self.expect_name()?;
                        while *self.peek() == Token::Pipe {
                            self.advance();
                            self.expect_name()?;
                        }
                    }
                    other => {
                        return Err(SchemaError::Sdl(format!(
                            "unexpected definition keyword '{}'",
                            other
                        )))
                    }
                },
                found => {
                    return Err(SchemaError::Sdl(format!(
                        "unexpected token {:?} at top level",
                        found
                    )))
                }
            }
        }

        // Built-in scalars are always available.
        for scalar in ["ID", "String", "Int", "Float", "Boolean"] {
            types
                .entry(scalar.to_string())
                .or_insert_with(|| TypeDefinition::Scalar {
                    name: scalar.to_string(),
                });
        }

        // Default root names apply when no schema block was given.
        let query_type = query_type.unwrap_or_else(|| "Query".to_string());
        let mutation_type =
            mutation_type.or_else(|| types.contains_key("Mutation").then(|| "Mutation".to_string()));
        let subscription_type = subscription_type
            .or_else(|| types.contains_key("Subscription").then(|| "Subscription".to_string()));

        Schema::new(types, query_type, mutation_type, subscription_type)
    }

    fn object_like(&mut self, interface: bool) -> Result<TypeDefinition, SchemaError> {
        // Consume `type` / `interface`.
        self.advance();
        let name = self.expect_name()?;

        let mut interfaces = Vec::new();
        if self.eat_keyword("implements") {
            if *self.peek() == Token::Amp {
                self.advance();
            }
            interfaces.push(self.expect_name()?);
            while *self.peek() == Token::Amp {
                self.advance();
                interfaces.push(self.expect_name()?);
            }
        }
        self.skip_directives()?;

        self.expect(Token::BraceL)?;
        let mut fields = Vec::new();
        while *self.peek() != Token::BraceR {
            self.skip_description();
            fields.push(self.field_definition()?);
        }
        self.expect(Token::BraceR)?;

        let def = ObjectLikeType {
            name,
            interfaces,
            fields,
        };
        Ok(if interface {
            TypeDefinition::Interface(def)
        } else {
            TypeDefinition::Object(def)
        })
    }

    fn field_definition(&mut self) -> Result<FieldDefinition, SchemaError> {
        let name = self.expect_name()?;

        let mut argument_names = Vec::new();
        if *self.peek() == Token::ParenL {
            self.advance();
            while *self.peek() != Token::ParenR {
                self.skip_description();
                argument_names.push(self.expect_name()?);
                self.expect(Token::Colon)?;
                self.type_ref()?;
                if *self.peek() == Token::Equals {
                    self.advance();
                    self.skip_value()?;
                }
                self.skip_directives()?;
            }
            self.expect(Token::ParenR)?;
        }

        self.expect(Token::Colon)?;
        let field_type = self.type_ref()?;
        self.skip_directives()?;

        Ok(FieldDefinition {
            name,
            argument_names,
            field_type,
        })
    }

    fn type_ref(&mut self) -> Result<TypeRef, SchemaError> {
        let base = if *self.peek() == Token::BracketL {
            self.advance();
            let inner = self.type_ref()?;
            self.expect(Token::BracketR)?;
            TypeRef::List(Box::new(inner))
        } else {
            TypeRef::Named(self.expect_name()?)
        };
        if *self.peek() == Token::Bang {
            self.advance();
            Ok(TypeRef::NonNull(Box::new(base)))
        } else {
            Ok(base)
        }
    }

    /// Skip a default value literal without interpreting it.
    fn skip_value(&mut self) -> Result<(), SchemaError> {
        match self.advance() {
            Token::BracketL => {
                while *self.peek() != Token::BracketR {
                    self.skip_value()?;
                }
                self.expect(Token::BracketR)
            }
            Token::BraceL => {
                while *self.peek() != Token::BraceR {
                    self.expect_name()?;
                    self.expect(Token::Colon)?;
                    self.skip_value()?;
                }
                self.expect(Token::BraceR)
            }
            Token::Dollar => self.expect_name().map(|_| ()),
            Token::Int(_) | Token::Float(_) | Token::Str(_) | Token::Name(_) => Ok(()),
            found => Err(SchemaError::Sdl(format!(
                "unexpected token {:?} in default value",
                found
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_defaults_without_schema_block() {
        let schema = parse_sdl(
            "type Query { user(id: ID!): User } \
             type Mutation { touch: Boolean } \
             type User { id: ID! name: String }",
        )
        .unwrap();
        assert_eq!(schema.query_type(), "Query");
        assert_eq!(schema.mutation_type(), Some("Mutation"));
        assert!(schema.subscription_type().is_none());
    }

    #[test]
    fn records_argument_names() {
        let schema =
            parse_sdl("type Query { search(term: String!, limit: Int = 10): [String] }").unwrap();
        let field = schema.field_definition("Query", "search").unwrap();
        assert_eq!(field.argument_names, vec!["term", "limit"]);
        assert!(field.field_type.is_list());
    }

    #[test]
    fn tolerates_descriptions_and_directives() {
        let schema = parse_sdl(
            "\"\"\"The root\"\"\" type Query @tag(name: \"root\") { \
               \"a field\" ping: String @deprecated(reason: \"old\") }",
        )
        .unwrap();
        assert!(schema.field_definition("Query", "ping").is_some());
    }

    #[test]
    fn missing_query_root_is_an_error() {
        assert!(matches!(
            parse_sdl("type User { id: ID! }"),
            Err(SchemaError::MissingQueryRoot)
        ));
    }
}
