// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Executor and subscriber contracts

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::stream::BoxStream;
use serde_json::Value as JsonValue;

use crate::ast::Document;
use crate::request::RequestContext;

use super::error::ClientError;

/// Hook resolving a single field locally; handed through to server-mode
/// executors. Receives `(field_name, source_object)`.
pub type FieldResolverFn = Arc<dyn Fn(&str, &JsonValue) -> Option<JsonValue> + Send + Sync>;

/// Options handed to the executor/subscriber on every call, assembled from
/// client configuration plus per-request state.
#[derive(Clone, Default)]
pub struct ExecuteOptions {
    pub url: Option<String>,
    pub batch: bool,
    pub fetch_timeout: Option<Duration>,
    pub headers: HashMap<String, String>,
    pub root_value: Option<JsonValue>,
    pub field_resolver: Option<FieldResolverFn>,
    pub subscribe_field_resolver: Option<FieldResolverFn>,
    pub tag: Option<JsonValue>,
}

impl fmt::Debug for ExecuteOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecuteOptions")
            .field("url", &self.url)
            .field("batch", &self.batch)
            .field("fetch_timeout", &self.fetch_timeout)
            .field("headers", &self.headers)
            .field("root_value", &self.root_value)
            .field("field_resolver", &self.field_resolver.is_some())
            .field(
                "subscribe_field_resolver",
                &self.subscribe_field_resolver.is_some(),
            )
            .field("tag", &self.tag)
            .finish()
    }
}

/// What an executor (or one subscription message) delivers.
#[derive(Debug, Clone, Default)]
pub struct ExecutorPayload {
    pub data: JsonValue,
    /// Response headers; `cache-control` feeds the top-level directive.
    pub headers: HashMap<String, String>,
    /// Optional per-path directives, keyed by cache path.
    pub cache_metadata: Option<BTreeMap<String, String>>,
    /// The GraphQL errors array, delivered as-is alongside partial data.
    pub errors: Option<JsonValue>,
}

impl ExecutorPayload {
    /// The `cache-control` response header, however cased.
    pub fn cache_control_header(&self) -> Option<&str> {
        self.headers
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case("cache-control"))
            .map(|(_, value)| value.as_str())
    }
}

/// Executes queries and mutations against the data source.
#[async_trait]
pub trait Executor: Send + Sync {
    async fn resolve(
        &self,
        query: &str,
        document: &Document,
        options: &ExecuteOptions,
        ctx: &RequestContext,
    ) -> Result<ExecutorPayload, ClientError>;
}

/// Opens subscriptions; each stream item is resolved like a mutation.
#[async_trait]
pub trait Subscriber: Send + Sync {
    async fn resolve(
        &self,
        query: &str,
        hash: &str,
        document: &Document,
        options: &ExecuteOptions,
        ctx: &RequestContext,
    ) -> Result<BoxStream<'static, ExecutorPayload>, ClientError>;
}
