// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Shared fixtures: a canned schema, a mock executor with invocation
//! counting, and a scripted subscriber.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::stream::BoxStream;
use futures::StreamExt;
use parking_lot::Mutex;
use serde_json::Value as JsonValue;

use cacheql::ast::Document;
use cacheql::{
    Client, ClientConfig, ClientError, ExecuteOptions, Executor, ExecutorPayload, RequestContext,
    RequestOptions, Subscriber,
};

pub const SCHEMA: &str = "\
    type Query { user(id: ID!): User } \
    type Mutation { updateUser(id: ID!, name: String): User } \
    type Subscription { userUpdated: User } \
    type User { id: ID! name: String email: String friends: [User] }";

pub type Responder = dyn Fn(&str) -> Result<ExecutorPayload, ClientError> + Send + Sync;

/// Executor double: counts invocations, records queries, optionally delays
/// (to hold a fetch in flight for coalescing tests).
pub struct MockExecutor {
    responder: Box<Responder>,
    delay: Option<Duration>,
    calls: AtomicUsize,
    seen: Mutex<Vec<String>>,
}

impl MockExecutor {
    pub fn new(responder: impl Fn(&str) -> Result<ExecutorPayload, ClientError> + Send + Sync + 'static) -> Arc<Self> {
        Arc::new(Self {
            responder: Box::new(responder),
            delay: None,
            calls: AtomicUsize::new(0),
            seen: Mutex::new(Vec::new()),
        })
    }

    pub fn with_delay(
        delay: Duration,
        responder: impl Fn(&str) -> Result<ExecutorPayload, ClientError> + Send + Sync + 'static,
    ) -> Arc<Self> {
        Arc::new(Self {
            responder: Box::new(responder),
            delay: Some(delay),
            calls: AtomicUsize::new(0),
            seen: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn seen_queries(&self) -> Vec<String> {
        self.seen.lock().clone()
    }
}

#[async_trait]
impl Executor for MockExecutor {
    async fn resolve(
        &self,
        query: &str,
        _document: &Document,
        _options: &ExecuteOptions,
        _ctx: &RequestContext,
    ) -> Result<ExecutorPayload, ClientError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen.lock().push(query.to_string());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        (self.responder)(query)
    }
}

/// Subscriber double yielding a scripted message sequence.
pub struct MockSubscriber {
    messages: Mutex<Vec<ExecutorPayload>>,
}

impl MockSubscriber {
    pub fn new(messages: Vec<ExecutorPayload>) -> Arc<Self> {
        Arc::new(Self {
            messages: Mutex::new(messages),
        })
    }
}

#[async_trait]
impl Subscriber for MockSubscriber {
    async fn resolve(
        &self,
        _query: &str,
        _hash: &str,
        _document: &Document,
        _options: &ExecuteOptions,
        _ctx: &RequestContext,
    ) -> Result<BoxStream<'static, ExecutorPayload>, ClientError> {
        let messages = std::mem::take(&mut *self.messages.lock());
        Ok(futures::stream::iter(messages).boxed())
    }
}

/// Build a payload with a `cache-control` response header.
pub fn payload(data: JsonValue, cache_control: &str) -> ExecutorPayload {
    let mut headers = HashMap::new();
    headers.insert("cache-control".to_string(), cache_control.to_string());
    ExecutorPayload {
        data,
        headers,
        cache_metadata: None,
        errors: None,
    }
}

/// A client over the canned schema and the given collaborators.
pub fn client(
    executor: Arc<MockExecutor>,
    subscriber: Option<Arc<MockSubscriber>>,
) -> Client {
    Client::new(
        ClientConfig::with_schema(SCHEMA),
        executor,
        subscriber.map(|s| s as Arc<dyn Subscriber>),
    )
    .expect("client construction")
}

/// Options that wait for the cache write phase, keeping tests
/// deterministic about tier visibility.
pub fn awaited() -> RequestOptions {
    RequestOptions {
        await_data_cached: true,
        ..Default::default()
    }
}
