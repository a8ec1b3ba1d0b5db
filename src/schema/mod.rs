// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Client-side schema registry
//!
//! Built either from an SDL string or from a standard introspection JSON
//! payload. The registry answers the questions the normaliser, analyser and
//! resolver ask: field types, composite-ness, resource-key presence and
//! type-condition compatibility.

pub mod introspection;
pub mod sdl;
pub mod types;
pub mod validator;

pub use types::{FieldDefinition, ObjectLikeType, Schema, SchemaError, TypeDefinition};
pub use validator::{validate_document, ValidationError};
