// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Request-level errors
//!
//! `ClientError` is `Clone` because one failure fans out to every caller
//! coalesced onto the same in-flight request.

use serde_json::Value as JsonValue;
use thiserror::Error;

use crate::cache::CacheError;
use crate::request::RequestError;
use crate::schema::SchemaError;

/// Errors surfaced by `Client::request` and `Client::new`.
#[derive(Debug, Clone, Error)]
pub enum ClientError {
    #[error("Configuration error: {0}")]
    Config(String),
    #[error(transparent)]
    Schema(#[from] SchemaError),
    #[error(transparent)]
    Request(#[from] RequestError),
    #[error("Executor error: {message}")]
    Executor {
        message: String,
        /// The GraphQL errors array (or transport detail) as returned.
        errors: Option<JsonValue>,
    },
    #[error("Subscriber error: {0}")]
    Subscriber(String),
    #[error(transparent)]
    Cache(#[from] CacheError),
    #[error("Request cancelled")]
    Cancelled,
}

impl ClientError {
    pub fn executor(message: impl Into<String>, errors: Option<JsonValue>) -> Self {
        Self::Executor {
            message: message.into(),
            errors,
        }
    }
}
