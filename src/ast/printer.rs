// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Canonical printer for GraphQL documents
//!
//! The printed form is the canonicalisation target: two documents that
//! print identically are the same request as far as fingerprinting and the
//! response cache are concerned. Two-space indentation, one selection per
//! line, arguments inline in written order.

use std::fmt::Write;

use super::ast::*;

/// Print a document in canonical form.
pub fn print_document(document: &Document) -> String {
    let mut out = String::new();
    for (i, definition) in document.definitions.iter().enumerate() {
        if i > 0 {
            out.push_str("\n\n");
        }
        match definition {
            Definition::Operation(op) => print_operation(&mut out, op),
            Definition::Fragment(frag) => print_fragment(&mut out, frag),
        }
    }
    out.push('\n');
    out
}

fn print_operation(out: &mut String, op: &OperationDefinition) {
    let shorthand = op.kind == OperationKind::Query
        && op.name.is_none()
        && op.variable_definitions.is_empty()
        && op.directives.is_empty();

    if !shorthand {
        let _ = write!(out, "{}", op.kind);
        if let Some(name) = &op.name {
            let _ = write!(out, " {}", name);
        }
        if !op.variable_definitions.is_empty() {
            out.push('(');
            for (i, def) in op.variable_definitions.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                let _ = write!(out, "${}: {}", def.name, def.var_type);
                if let Some(default) = &def.default_value {
                    let _ = write!(out, " = {}", print_value(default));
                }
            }
            out.push(')');
        }
        print_directives(out, &op.directives);
        out.push(' ');
    }
    print_selection_set(out, &op.selection_set, 0);
}

fn print_fragment(out: &mut String, frag: &FragmentDefinition) {
    let _ = write!(out, "fragment {} on {}", frag.name, frag.type_condition);
    print_directives(out, &frag.directives);
    out.push(' ');
    print_selection_set(out, &frag.selection_set, 0);
}

fn print_selection_set(out: &mut String, selection_set: &SelectionSet, depth: usize) {
    out.push_str("{\n");
    for selection in &selection_set.items {
        indent(out, depth + 1);
        match selection {
            Selection::Field(field) => print_field(out, field, depth + 1),
            Selection::FragmentSpread(spread) => {
                let _ = write!(out, "...{}", spread.name);
                print_directives(out, &spread.directives);
            }
            Selection::InlineFragment(inline) => {
                out.push_str("...");
                if let Some(cond) = &inline.type_condition {
                    let _ = write!(out, " on {}", cond);
                }
                print_directives(out, &inline.directives);
                out.push(' ');
                print_selection_set(out, &inline.selection_set, depth + 1);
            }
        }
        out.push('\n');
    }
    indent(out, depth);
    out.push('}');
}

fn print_field(out: &mut String, field: &Field, depth: usize) {
    if let Some(alias) = &field.alias {
        let _ = write!(out, "{}: ", alias);
    }
    out.push_str(&field.name);
    if !field.arguments.is_empty() {
        out.push('(');
        for (i, arg) in field.arguments.iter().enumerate() {
            if i > 0 {
                out.push_str(", ");
            }
            let _ = write!(out, "{}: {}", arg.name, print_value(&arg.value));
        }
        out.push(')');
    }
    print_directives(out, &field.directives);
    if let Some(children) = &field.selection_set {
        out.push(' ');
        print_selection_set(out, children, depth);
    }
}

fn print_directives(out: &mut String, directives: &[Directive]) {
    for directive in directives {
        let _ = write!(out, " @{}", directive.name);
        if !directive.arguments.is_empty() {
            out.push('(');
            for (i, arg) in directive.arguments.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                let _ = write!(out, "{}: {}", arg.name, print_value(&arg.value));
            }
            out.push(')');
        }
    }
}

/// Print a value literal in canonical form.
pub fn print_value(value: &Value) -> String {
    match value {
        Value::Variable(name) => format!("${}", name),
        Value::Int(i) => i.to_string(),
        Value::Float(f) => {
            // Keep a decimal point so the literal stays a Float on re-parse.
            if f.fract() == 0.0 && f.is_finite() {
                format!("{:.1}", f)
            } else {
                f.to_string()
            }
        }
        Value::String(s) => format!("\"{}\"", escape_string(s)),
        Value::Boolean(b) => b.to_string(),
        Value::Null => "null".to_string(),
        Value::Enum(name) => name.clone(),
        Value::List(items) => {
            let inner: Vec<String> = items.iter().map(print_value).collect();
            format!("[{}]", inner.join(", "))
        }
        Value::Object(fields) => {
            let inner: Vec<String> = fields
                .iter()
                .map(|(name, value)| format!("{}: {}", name, print_value(value)))
                .collect();
            format!("{{{}}}", inner.join(", "))
        }
    }
}

fn escape_string(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if (c as u32) < 0x20 => {
                let _ = write!(out, "\\u{:04X}", c as u32);
            }
            c => out.push(c),
        }
    }
    out
}

fn indent(out: &mut String, depth: usize) {
    for _ in 0..depth {
        out.push_str("  ");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::parse_document;

    #[test]
    fn printing_is_a_fixpoint() {
        let source = "{ user(id: \"1\") { id name friends { id } } }";
        let printed = print_document(&parse_document(source).unwrap());
        let reprinted = print_document(&parse_document(&printed).unwrap());
        assert_eq!(printed, reprinted);
    }

    #[test]
    fn whitespace_variants_print_identically() {
        let a = print_document(&parse_document("{ user(id:\"1\"){id name} }").unwrap());
        let b = print_document(
            &parse_document("{\n  user(id: \"1\") {\n    id\n    name\n  }\n}").unwrap(),
        );
        assert_eq!(a, b);
    }

    #[test]
    fn field_order_is_preserved() {
        let printed = print_document(&parse_document("{ b a c }").unwrap());
        let b_at = printed.find("b").unwrap();
        let a_at = printed.find("a").unwrap();
        let c_at = printed.find("c").unwrap();
        assert!(b_at < a_at && a_at < c_at);
    }

    #[test]
    fn prints_operations_and_values() {
        let source = "mutation Update($name: String) { updateUser(id: \"1\", name: $name, opts: {force: true, tags: [\"x\"]}) { id } }";
        let printed = print_document(&parse_document(source).unwrap());
        assert!(printed.starts_with("mutation Update($name: String) {"));
        assert!(printed.contains("opts: {force: true, tags: [\"x\"]}"));
    }

    #[test]
    fn escapes_strings() {
        assert_eq!(
            print_value(&Value::String("a\"b\n".to_string())),
            "\"a\\\"b\\n\""
        );
    }
}
