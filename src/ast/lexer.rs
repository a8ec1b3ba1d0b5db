// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Lexer for GraphQL documents using nom parsers
//!
//! Token order in the `token()` alternation matters: the spread `...` must
//! be tried before a float's leading dot could misfire, floats before
//! integers, and block strings before plain strings. Every branch either
//! consumes input or fails, and the main loop verifies progress so a
//! misbehaving branch surfaces as an error instead of a hang.

use nom::{
    branch::alt,
    bytes::complete::{is_not, tag, take_while, take_while1},
    character::complete::{char, one_of},
    combinator::{map, opt, recognize},
    sequence::{pair, tuple},
    IResult,
};

/// Token types for GraphQL documents.
///
/// GraphQL keywords (`query`, `mutation`, `fragment`, `on`, ...) are
/// contextual, so they surface as [`Token::Name`] and the parser matches on
/// content.
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    // Literals and names
    Name(String),
    Int(i64),
    Float(f64),
    Str(String),

    // Punctuators
    Bang,     // !
    Dollar,   // $
    ParenL,   // (
    ParenR,   // )
    Spread,   // ...
    Colon,    // :
    Equals,   // =
    At,       // @
    BracketL, // [
    BracketR, // ]
    BraceL,   // {
    BraceR,   // }
    Pipe,     // |
    Amp,      // &

    // Ignored tokens, filtered before the parser sees the stream
    Ignored,

    // End of input
    EOF,
}

/// Tokenize a GraphQL document into a token stream.
///
/// Commas and comments are insignificant in GraphQL and are dropped here,
/// before the parser sees the stream.
pub fn tokenize(input: &str) -> Result<Vec<Token>, String> {
    let mut remaining = input;
    let mut tokens = Vec::new();

    while !remaining.is_empty() {
        match token(remaining) {
            Ok((next_remaining, tok)) => {
                // A branch that returns without consuming input would loop
                // forever; fail loudly instead.
                if next_remaining.len() == remaining.len() {
                    return Err(format!(
                        "lexer made no progress at: '{}'",
                        truncate(remaining)
                    ));
                }
                if tok != Token::Ignored {
                    tokens.push(tok);
                }
                remaining = next_remaining;
            }
            Err(_) => {
                return Err(format!("unexpected character at: '{}'", truncate(remaining)));
            }
        }
    }

    tokens.push(Token::EOF);
    Ok(tokens)
}

fn truncate(s: &str) -> String {
    s.chars().take(24).collect()
}

fn token(input: &str) -> IResult<&str, Token> {
    alt((
        ignored,
        map(block_string, Token::Str),
        map(string_literal, Token::Str),
        // The spread must win over a float's leading dot.
        map(tag("..."), |_| Token::Spread),
        map(float_literal, Token::Float),
        map(int_literal, Token::Int),
        map(name, |s: &str| Token::Name(s.to_string())),
        punctuator,
    ))(input)
}

/// Whitespace, commas, comments and the BOM are all insignificant.
fn ignored(input: &str) -> IResult<&str, Token> {
    alt((
        map(take_while1(|c: char| c.is_whitespace() || c == ','), |_| {
            Token::Ignored
        }),
        map(pair(char('#'), opt(is_not("\n\r"))), |_| Token::Ignored),
        map(tag("\u{feff}"), |_| Token::Ignored),
    ))(input)
}

fn punctuator(input: &str) -> IResult<&str, Token> {
    let (rest, c) = one_of("!$():=@[]{}|&")(input)?;
    let tok = match c {
        '!' => Token::Bang,
        '$' => Token::Dollar,
        '(' => Token::ParenL,
        ')' => Token::ParenR,
        ':' => Token::Colon,
        '=' => Token::Equals,
        '@' => Token::At,
        '[' => Token::BracketL,
        ']' => Token::BracketR,
        '{' => Token::BraceL,
        '}' => Token::BraceR,
        '|' => Token::Pipe,
        '&' => Token::Amp,
        _ => unreachable!(),
    };
    Ok((rest, tok))
}

fn name(input: &str) -> IResult<&str, &str> {
    recognize(pair(
        take_while1(|c: char| c.is_ascii_alphabetic() || c == '_'),
        take_while(|c: char| c.is_ascii_alphanumeric() || c == '_'),
    ))(input)
}

fn int_part(input: &str) -> IResult<&str, &str> {
    recognize(pair(opt(char('-')), take_while1(|c: char| c.is_ascii_digit())))(input)
}

fn int_literal(input: &str) -> IResult<&str, i64> {
    let (rest, digits) = int_part(input)?;
    // A trailing `.`, digit-run or exponent means this is really a float and
    // the int branch must not claim it.
    if rest.starts_with('.') || rest.starts_with('e') || rest.starts_with('E') {
        return Err(nom::Err::Error(nom::error::Error::new(
            input,
            nom::error::ErrorKind::Digit,
        )));
    }
    match digits.parse::<i64>() {
        Ok(value) => Ok((rest, value)),
        Err(_) => Err(nom::Err::Error(nom::error::Error::new(
            input,
            nom::error::ErrorKind::Digit,
        ))),
    }
}

fn float_literal(input: &str) -> IResult<&str, f64> {
    let fraction = recognize(pair(char('.'), take_while1(|c: char| c.is_ascii_digit())));
    let exponent = recognize(tuple((
        one_of("eE"),
        opt(one_of("+-")),
        take_while1(|c: char| c.is_ascii_digit()),
    )));

    let (rest, text) = alt((
        recognize(tuple((
            int_part,
            fraction,
            opt(recognize(tuple((
                one_of("eE"),
                opt(one_of("+-")),
                take_while1(|c: char| c.is_ascii_digit()),
            )))),
        ))),
        recognize(pair(int_part, exponent)),
    ))(input)?;

    match text.parse::<f64>() {
        Ok(value) => Ok((rest, value)),
        Err(_) => Err(nom::Err::Error(nom::error::Error::new(
            input,
            nom::error::ErrorKind::Float,
        ))),
    }
}

/// A `"""block string"""`. Escapes are not processed beyond `\"""`; block
/// strings only appear in descriptions, which this client ignores.
fn block_string(input: &str) -> IResult<&str, String> {
    let (mut rest, _) = tag(r#"""""#)(input)?;
    let mut out = String::new();
    loop {
        if let Ok((after, _)) = tag::<_, _, nom::error::Error<&str>>(r#"""""#)(rest) {
            return Ok((after, out));
        }
        if let Ok((after, _)) = tag::<_, _, nom::error::Error<&str>>(r#"\""""#)(rest) {
            out.push_str(r#"""""#);
            rest = after;
            continue;
        }
        let mut chars = rest.chars();
        match chars.next() {
            Some(c) => {
                out.push(c);
                rest = chars.as_str();
            }
            None => {
                return Err(nom::Err::Error(nom::error::Error::new(
                    input,
                    nom::error::ErrorKind::Tag,
                )))
            }
        }
    }
}

fn string_literal(input: &str) -> IResult<&str, String> {
    let (mut rest, _) = char('"')(input)?;
    let mut out = String::new();
    loop {
        let mut chars = rest.chars();
        match chars.next() {
            Some('"') => return Ok((chars.as_str(), out)),
            Some('\\') => {
                let after_escape = chars.as_str();
                let mut escaped = after_escape.chars();
                match escaped.next() {
                    Some('"') => out.push('"'),
                    Some('\\') => out.push('\\'),
                    Some('/') => out.push('/'),
                    Some('b') => out.push('\u{0008}'),
                    Some('f') => out.push('\u{000C}'),
                    Some('n') => out.push('\n'),
                    Some('r') => out.push('\r'),
                    Some('t') => out.push('\t'),
                    Some('u') => {
                        let hex: String = escaped.clone().take(4).collect();
                        if hex.len() != 4 {
                            return Err(nom::Err::Error(nom::error::Error::new(
                                input,
                                nom::error::ErrorKind::Escaped,
                            )));
                        }
                        match u32::from_str_radix(&hex, 16).ok().and_then(char::from_u32) {
                            Some(c) => out.push(c),
                            None => {
                                return Err(nom::Err::Error(nom::error::Error::new(
                                    input,
                                    nom::error::ErrorKind::Escaped,
                                )))
                            }
                        }
                        for _ in 0..4 {
                            escaped.next();
                        }
                    }
                    _ => {
                        return Err(nom::Err::Error(nom::error::Error::new(
                            input,
                            nom::error::ErrorKind::Escaped,
                        )))
                    }
                }
                rest = escaped.as_str();
            }
            Some('\n') | Some('\r') | None => {
                return Err(nom::Err::Error(nom::error::Error::new(
                    input,
                    nom::error::ErrorKind::Char,
                )))
            }
            Some(c) => {
                out.push(c);
                rest = chars.as_str();
            }
        }
    }
}
