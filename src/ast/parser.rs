// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Recursive-descent parser for GraphQL executable documents
//!
//! Operates on the token stream produced by the lexer. GraphQL keywords are
//! contextual, so dispatch happens on the content of name tokens.

use log::trace;
use thiserror::Error;

use super::ast::*;
use super::lexer::{tokenize, Token};

/// Parser error type
#[derive(Debug, Clone, Error)]
pub enum ParserError {
    #[error("Lexer error: {0}")]
    Lexer(String),
    #[error("Unexpected token: {0:?}")]
    UnexpectedToken(Token),
    #[error("Expected {expected}, found {found:?}")]
    Expected { expected: String, found: Token },
    #[error("Unexpected end of document")]
    UnexpectedEof,
    #[error("Fragment '{0}' is missing a type condition. Syntax: fragment Name on Type {{ ... }}")]
    MissingTypeCondition(String),
    #[error("Document contains no definitions")]
    EmptyDocument,
}

/// Parse a GraphQL executable document (operations and fragments).
pub fn parse_document(input: &str) -> Result<Document, ParserError> {
    let tokens = tokenize(input).map_err(ParserError::Lexer)?;
    trace!("parsed {} tokens from document", tokens.len());

    let mut parser = Parser { tokens, pos: 0 };
    let document = parser.document()?;
    if document.definitions.is_empty() {
        return Err(ParserError::EmptyDocument);
    }
    Ok(document)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> &Token {
        self.tokens.get(self.pos).unwrap_or(&Token::EOF)
    }

    fn advance(&mut self) -> Token {
        let token = self.tokens.get(self.pos).cloned().unwrap_or(Token::EOF);
        self.pos += 1;
        token
    }

    fn expect(&mut self, expected: Token) -> Result<(), ParserError> {
        let found = self.advance();
        if found == expected {
            Ok(())
        } else {
            Err(ParserError::Expected {
                expected: format!("{:?}", expected),
                found,
            })
        }
    }

    fn expect_name(&mut self) -> Result<String, ParserError> {
        match self.advance() {
            Token::Name(name) => Ok(name),
            Token::EOF => Err(ParserError::UnexpectedEof),
            found => Err(ParserError::Expected {
                expected: "a name".to_string(),
                found,
            }),
        }
    }

    /// Consume a name token with the given content, if present.
    fn eat_keyword(&mut self, keyword: &str) -> bool {
        if matches!(self.peek(), Token::Name(name) if name == keyword) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn document(&mut self) -> Result<Document, ParserError> {
        let mut definitions = Vec::new();
        loop {
            match self.peek() {
                Token::EOF => break,
                Token::BraceL => {
                    // Shorthand query: `{ ... }`
                    let selection_set = self.selection_set()?;
                    definitions.push(Definition::Operation(OperationDefinition {
                        kind: OperationKind::Query,
                        name: None,
                        variable_definitions: Vec::new(),
                        directives: Vec::new(),
                        selection_set,
                    }));
                }
                Token::Name(name) => match name.as_str() {
                    "query" => definitions.push(self.operation(OperationKind::Query)?),
                    "mutation" => definitions.push(self.operation(OperationKind::Mutation)?),
                    "subscription" => {
                        definitions.push(self.operation(OperationKind::Subscription)?)
                    }
                    "fragment" => definitions.push(self.fragment_definition()?),
                    _ => return Err(ParserError::UnexpectedToken(self.advance())),
                },
                _ => return Err(ParserError::UnexpectedToken(self.advance())),
            }
        }
        Ok(Document { definitions })
    }

    fn operation(&mut self, kind: OperationKind) -> Result<Definition, ParserError> {
        // Consume the operation keyword.
        self.advance();

        let name = match self.peek() {
            Token::Name(_) => Some(self.expect_name()?),
            _ => None,
        };

        let variable_definitions = if *self.peek() == Token::ParenL {
            self.variable_definitions()?
        } else {
            Vec::new()
        };

        let directives = self.directives()?;
        let selection_set = self.selection_set()?;

        Ok(Definition::Operation(OperationDefinition {
            kind,
            name,
            variable_definitions,
            directives,
            selection_set,
        }))
    }

    fn fragment_definition(&mut self) -> Result<Definition, ParserError> {
        // Consume `fragment`.
        self.advance();
        let name = self.expect_name()?;
        if !self.eat_keyword("on") {
            return Err(ParserError::MissingTypeCondition(name));
        }
        let type_condition = self.expect_name()?;
        let directives = self.directives()?;
        let selection_set = self.selection_set()?;
        Ok(Definition::Fragment(FragmentDefinition {
            name,
            type_condition,
            directives,
            selection_set,
        }))
    }

    fn variable_definitions(&mut self) -> Result<Vec<VariableDefinition>, ParserError> {
        self.expect(Token::ParenL)?;
        let mut defs = Vec::new();
        while *self.peek() != Token::ParenR {
            self.expect(Token::Dollar)?;
            let name = self.expect_name()?;
            self.expect(Token::Colon)?;
            let var_type = self.type_ref()?;
            let default_value = if *self.peek() == Token::Equals {
                self.advance();
                Some(self.value()?)
            } else {
                None
            };
            defs.push(VariableDefinition {
                name,
                var_type,
                default_value,
            });
        }
        self.expect(Token::ParenR)?;
        Ok(defs)
    }

    fn type_ref(&mut self) -> Result<TypeRef, ParserError> {
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

    fn selection_set(&mut self) -> Result<SelectionSet, ParserError> {
        self.expect(Token::BraceL)?;
        let mut items = Vec::new();
        while *self.peek() != Token::BraceR {
            items.push(self.selection()?);
        }
        self.expect(Token::BraceR)?;
        Ok(SelectionSet { items })
    }

    fn selection(&mut self) -> Result<Selection, ParserError> {
        if *self.peek() == Token::Spread {
            self.advance();
            // `... on Type { ... }` or `...fragmentName`
            if self.eat_keyword("on") {
                let type_condition = Some(self.expect_name()?);
                let directives = self.directives()?;
                let selection_set = self.selection_set()?;
                return Ok(Selection::InlineFragment(InlineFragment {
                    type_condition,
                    directives,
                    selection_set,
                }));
            }
            if *self.peek() == Token::At || *self.peek() == Token::BraceL {
                // `... @include(...) { ... }` — inline fragment without a
                // type condition.
                let directives = self.directives()?;
                let selection_set = self.selection_set()?;
                return Ok(Selection::InlineFragment(InlineFragment {
                    type_condition: None,
                    directives,
                    selection_set,
                }));
            }
            let name = self.expect_name()?;
            let directives = self.directives()?;
            return Ok(Selection::FragmentSpread(FragmentSpread { name, directives }));
        }

        self.field().map(Selection::Field)
    }

    fn field(&mut self) -> Result<Field, ParserError> {
        let first = self.expect_name()?;
        let (alias, name) = if *self.peek() == Token::Colon {
            self.advance();
            (Some(first), self.expect_name()?)
        } else {
            (None, first)
        };

        let arguments = if *self.peek() == Token::ParenL {
            self.arguments()?
        } else {
            Vec::new()
        };

        let directives = self.directives()?;

        let selection_set = if *self.peek() == Token::BraceL {
            Some(self.selection_set()?)
        } else {
            None
        };

        Ok(Field {
            alias,
            name,
            arguments,
            directives,
            selection_set,
        })
    }

    fn arguments(&mut self) -> Result<Vec<Argument>, ParserError> {
        self.expect(Token::ParenL)?;
        let mut args = Vec::new();
        while *self.peek() != Token::ParenR {
            let name = self.expect_name()?;
            self.expect(Token::Colon)?;
            let value = self.value()?;
            args.push(Argument { name, value });
        }
        self.expect(Token::ParenR)?;
        Ok(args)
    }

    fn directives(&mut self) -> Result<Vec<Directive>, ParserError> {
        let mut directives = Vec::new();
        while *self.peek() == Token::At {
            self.advance();
            let name = self.expect_name()?;
            let arguments = if *self.peek() == Token::ParenL {
                self.arguments()?
            } else {
                Vec::new()
            };
            directives.push(Directive { name, arguments });
        }
        Ok(directives)
    }

    fn value(&mut self) -> Result<Value, ParserError> {
        match self.advance() {
            Token::Dollar => Ok(Value::Variable(self.expect_name()?)),
            Token::Int(i) => Ok(Value::Int(i)),
            Token::Float(f) => Ok(Value::Float(f)),
            Token::Str(s) => Ok(Value::String(s)),
            Token::Name(name) => match name.as_str() {
                "true" => Ok(Value::Boolean(true)),
                "false" => Ok(Value::Boolean(false)),
                "null" => Ok(Value::Null),
                _ => Ok(Value::Enum(name)),
            },
            Token::BracketL => {
                let mut items = Vec::new();
                while *self.peek() != Token::BracketR {
                    items.push(self.value()?);
                }
                self.expect(Token::BracketR)?;
                Ok(Value::List(items))
            }
            Token::BraceL => {
                let mut fields = Vec::new();
                while *self.peek() != Token::BraceR {
                    let name = self.expect_name()?;
                    self.expect(Token::Colon)?;
                    fields.push((name, self.value()?));
                }
                self.expect(Token::BraceR)?;
                Ok(Value::Object(fields))
            }
            Token::EOF => Err(ParserError::UnexpectedEof),
            found => Err(ParserError::UnexpectedToken(found)),
        }
    }
}
