// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! The public client
//!
//! One entry point, `request`, dispatching on the operation kind:
//!
//! - queries: response-cache check, join-or-own the in-flight slot,
//!   analyse, fetch only what is missing, resolve, drain waiters;
//! - mutations: execute, then normalise into the entity and path tiers;
//! - subscriptions: open the stream and resolve each message like a
//!   mutation, yielding shaped results lazily.
//!
//! The in-flight registries are drained on every exit path, error
//! included: a caller never leaves a dangling active entry behind.

use std::collections::HashMap;
use std::sync::Arc;

use futures::StreamExt;
use log::debug;
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use serde_json::{json, Value as JsonValue};

use crate::ast::OperationKind;
use crate::cache::registry::{BeginOutcome, SharedPayload};
use crate::cache::{CacheManager, CacheManagerStats, CacheMetadata, CacheSnapshot};
use crate::exec::{
    ClientError, ExecuteOptions, Executor, ExecutorPayload, RequestOutcome, RequestResult,
    Subscriber,
};
use crate::request::{
    hash_request, ParsedRequest, RequestContext, RequestOptions, RequestParser,
};

use super::config::{clone_resolver, ClientConfig};
use super::events::{EventEmitter, EventKind, EventPayload, Listener, ListenerId};

/// Process-wide instances, reused when `new_instance` is false.
static INSTANCES: Lazy<Mutex<HashMap<u64, Client>>> = Lazy::new(|| Mutex::new(HashMap::new()));

struct ClientInner {
    parser: RequestParser,
    cache: CacheManager,
    executor: Arc<dyn Executor>,
    subscriber: Option<Arc<dyn Subscriber>>,
    events: EventEmitter,
    execute_options: ExecuteOptions,
}

/// The caching GraphQL client core.
#[derive(Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
}

impl Client {
    /// Build a client from configuration plus the transport collaborators.
    ///
    /// With `new_instance` unset in the config, a process-wide instance
    /// with the same identity is reused instead.
    pub fn new(
        config: ClientConfig,
        executor: Arc<dyn Executor>,
        subscriber: Option<Arc<dyn Subscriber>>,
    ) -> Result<Self, ClientError> {
        config.validate()?;

        if !config.new_instance {
            let key = config.instance_key();
            let mut instances = INSTANCES.lock();
            if let Some(existing) = instances.get(&key) {
                debug!("reusing registered client instance");
                return Ok(existing.clone());
            }
            let client = Self::build(config, executor, subscriber)?;
            instances.insert(key, client.clone());
            return Ok(client);
        }

        Self::build(config, executor, subscriber)
    }

    fn build(
        config: ClientConfig,
        executor: Arc<dyn Executor>,
        subscriber: Option<Arc<dyn Subscriber>>,
    ) -> Result<Self, ClientError> {
        let schema = Arc::new(config.build_schema()?);
        let cache = CacheManager::new(
            config.cache_config.clone(),
            Arc::clone(&schema),
            config.resource_key.clone(),
            config.type_cache_controls.clone(),
            config.default_cache_controls.clone(),
        )
        .map_err(ClientError::Config)?;

        let execute_options = ExecuteOptions {
            url: config.url.clone(),
            batch: config.batch,
            fetch_timeout: config.fetch_timeout,
            headers: config.headers.clone(),
            root_value: config.root_value.clone(),
            field_resolver: clone_resolver(&config.field_resolver),
            subscribe_field_resolver: clone_resolver(&config.subscribe_field_resolver),
            tag: None,
        };

        Ok(Self {
            inner: Arc::new(ClientInner {
                parser: RequestParser::new(schema, config.resource_key),
                cache,
                executor,
                subscriber,
                events: EventEmitter::new(),
                execute_options,
            }),
        })
    }

    /// Run one request. Queries and mutations return
    /// [`RequestOutcome::Single`]; subscriptions return a stream.
    pub async fn request(
        &self,
        query: &str,
        options: RequestOptions,
    ) -> Result<RequestOutcome, ClientError> {
        let parsed = self.inner.parser.parse(query, &options);
        let (parsed, ctx) = match parsed {
            Ok(ok) => ok,
            Err(error) => {
                let client_error = ClientError::from(error);
                self.emit_error(&client_error);
                return Err(client_error);
            }
        };
        self.emit(EventKind::Request, &ctx, None, json!({ "query": parsed.query }));

        let outcome = match ctx.operation {
            OperationKind::Query => self
                .request_query(&parsed, &ctx, &options)
                .await
                .map(RequestOutcome::Single),
            OperationKind::Mutation => self
                .request_mutation(&parsed, &ctx, &options)
                .await
                .map(RequestOutcome::Single),
            OperationKind::Subscription => self.request_subscription(parsed, ctx, options).await,
        };
        if let Err(error) = &outcome {
            self.emit_error(error);
        }
        outcome
    }

    async fn request_query(
        &self,
        parsed: &ParsedRequest,
        ctx: &RequestContext,
        options: &RequestOptions,
    ) -> Result<RequestResult, ClientError> {
        let hash = hash_request(&parsed.query);

        if let Some(record) = self.inner.cache.response(&hash) {
            self.emit(EventKind::CacheHit, ctx, Some(&hash), json!({"tier": "responses"}));
            return Ok(RequestResult {
                data: record.data,
                cache_metadata: CacheMetadata::rehydrate(&record.cache_metadata)
                    .to_metadata_map(),
                query_hash: Some(hash),
                cache_promise: None,
            });
        }

        match self.inner.cache.registry().begin(&hash, &parsed.query) {
            BeginOutcome::Pending(receiver) => {
                let shared = receiver.await.map_err(|_| ClientError::Cancelled)??;
                return Ok(RequestResult {
                    data: shared.data,
                    cache_metadata: shared.cache_metadata,
                    query_hash: Some(shared.query_hash),
                    cache_promise: None,
                });
            }
            BeginOutcome::Active => {}
        }

        let outcome = self.fetch_and_resolve(parsed, ctx, options, &hash).await;

        // The registries drain on success and failure alike.
        let shared_outcome = match &outcome {
            Ok(result) => Ok(SharedPayload {
                data: result.data.clone(),
                cache_metadata: result.cache_metadata.clone(),
                query_hash: hash.clone(),
            }),
            Err(error) => Err(error.clone()),
        };
        self.inner.cache.registry().complete(&hash, &shared_outcome);

        let mut result = outcome?;
        if options.await_data_cached {
            if let Some(promise) = result.cache_promise.take() {
                promise.await_written().await?;
            }
        }
        Ok(result)
    }

    async fn fetch_and_resolve(
        &self,
        parsed: &ParsedRequest,
        ctx: &RequestContext,
        options: &RequestOptions,
        hash: &str,
    ) -> Result<RequestResult, ClientError> {
        let analysis = self
            .inner
            .cache
            .analyse(hash, &parsed.document, &parsed.query, ctx);

        if analysis.is_full_hit() {
            self.emit(EventKind::CacheHit, ctx, Some(hash), json!({"tier": "synthesis"}));
            let data = analysis.cached_data.unwrap_or_default();
            let metadata = analysis.cache_metadata.unwrap_or_default();
            let promise = self.inner.cache.cache_reconstructed_response(
                hash,
                &data,
                &metadata,
                options.tag.clone(),
            );
            return Ok(RequestResult {
                data,
                cache_metadata: metadata.to_metadata_map(),
                query_hash: Some(hash.to_string()),
                cache_promise: Some(promise),
            });
        }

        self.emit(
            EventKind::CacheMiss,
            ctx,
            Some(hash),
            json!({ "filtered": analysis.filtered }),
        );

        let fetch_document = analysis.updated_document.as_ref().unwrap_or(&parsed.document);
        let fetch_query = analysis.updated_query.as_deref().unwrap_or(&parsed.query);
        self.emit(EventKind::Fetch, ctx, Some(hash), json!({ "query": fetch_query }));

        let payload = self
            .inner
            .executor
            .resolve(fetch_query, fetch_document, &self.execute_options(options), ctx)
            .await?;
        check_payload(&payload)?;

        let resolved = self.inner.cache.resolve_query(
            fetch_document,
            &payload,
            analysis.cached_data.zip(analysis.cache_metadata),
            hash,
            options,
            ctx,
        );

        Ok(RequestResult {
            data: resolved.data,
            cache_metadata: resolved.cache_metadata.to_metadata_map(),
            query_hash: Some(hash.to_string()),
            cache_promise: Some(resolved.cache_promise),
        })
    }

    async fn request_mutation(
        &self,
        parsed: &ParsedRequest,
        ctx: &RequestContext,
        options: &RequestOptions,
    ) -> Result<RequestResult, ClientError> {
        self.emit(EventKind::Fetch, ctx, None, json!({ "query": parsed.query }));
        let payload = self
            .inner
            .executor
            .resolve(
                &parsed.query,
                &parsed.document,
                &self.execute_options(options),
                ctx,
            )
            .await?;
        check_payload(&payload)?;

        let resolved = self
            .inner
            .cache
            .resolve_mutation(&parsed.document, &payload, options, ctx);

        let mut result = RequestResult {
            data: resolved.data,
            cache_metadata: resolved.cache_metadata.to_metadata_map(),
            query_hash: None,
            cache_promise: Some(resolved.cache_promise),
        };
        if options.await_data_cached {
            if let Some(promise) = result.cache_promise.take() {
                promise.await_written().await?;
            }
        }
        Ok(result)
    }

    async fn request_subscription(
        &self,
        parsed: ParsedRequest,
        ctx: RequestContext,
        options: RequestOptions,
    ) -> Result<RequestOutcome, ClientError> {
        let subscriber = self
            .inner
            .subscriber
            .clone()
            .ok_or_else(|| ClientError::Config("no subscriber configured".to_string()))?;

        let hash = hash_request(&parsed.query);
        let stream = subscriber
            .resolve(
                &parsed.query,
                &hash,
                &parsed.document,
                &self.execute_options(&options),
                &ctx,
            )
            .await?;

        let inner = Arc::clone(&self.inner);
        let mapped = stream
            .map(move |payload| {
                inner.events.emit(EventPayload {
                    kind: EventKind::Subscription,
                    request_id: ctx.request_id,
                    operation: Some(ctx.operation),
                    query_hash: Some(hash.clone()),
                    detail: JsonValue::Null,
                });
                let resolved =
                    inner
                        .cache
                        .resolve_subscription(&parsed.document, &payload, &options, &ctx);
                Ok(RequestResult {
                    data: resolved.data,
                    cache_metadata: resolved.cache_metadata.to_metadata_map(),
                    query_hash: None,
                    cache_promise: Some(resolved.cache_promise),
                })
            })
            .boxed();

        Ok(RequestOutcome::Stream(mapped))
    }

    fn execute_options(&self, options: &RequestOptions) -> ExecuteOptions {
        let mut execute_options = self.inner.execute_options.clone();
        execute_options.tag = options.tag.clone();
        execute_options
    }

    // ---- observability ----------------------------------------------------

    pub fn on(&self, kind: EventKind, listener: Listener) -> ListenerId {
        self.inner.events.on(kind, listener)
    }

    pub fn off(&self, id: ListenerId) -> bool {
        self.inner.events.off(id)
    }

    fn emit(
        &self,
        kind: EventKind,
        ctx: &RequestContext,
        query_hash: Option<&str>,
        detail: JsonValue,
    ) {
        self.inner.events.emit(EventPayload {
            kind,
            request_id: ctx.request_id,
            operation: Some(ctx.operation),
            query_hash: query_hash.map(str::to_string),
            detail,
        });
    }

    fn emit_error(&self, error: &ClientError) {
        self.inner.events.emit(EventPayload {
            kind: EventKind::Error,
            request_id: uuid::Uuid::nil(),
            operation: None,
            query_hash: None,
            detail: json!({ "message": error.to_string() }),
        });
    }

    // ---- cache surface ----------------------------------------------------

    pub fn clear_cache(&self) {
        self.inner.cache.clear();
    }

    pub fn export_caches(&self, tag: Option<&JsonValue>) -> Result<CacheSnapshot, ClientError> {
        Ok(self.inner.cache.export(tag)?)
    }

    pub fn import_caches(&self, snapshot: CacheSnapshot) -> Result<(), ClientError> {
        Ok(self.inner.cache.import(snapshot)?)
    }

    pub fn response_cache_size(&self) -> usize {
        self.inner.cache.response_cache_size()
    }

    pub fn path_cache_size(&self) -> usize {
        self.inner.cache.path_cache_size()
    }

    pub fn entity_cache_size(&self) -> usize {
        self.inner.cache.entity_cache_size()
    }

    pub fn response_cache_entry(&self, key: &str) -> Option<JsonValue> {
        self.inner.cache.response_cache_entry(key)
    }

    pub fn path_cache_entry(&self, key: &str) -> Option<JsonValue> {
        self.inner.cache.path_cache_entry(key)
    }

    pub fn entity_cache_entry(&self, key: &str) -> Option<JsonValue> {
        self.inner.cache.entity_cache_entry(key)
    }

    pub fn cache_stats(&self) -> CacheManagerStats {
        self.inner.cache.stats()
    }
}

/// A payload with errors and no data is a failed fetch; errors alongside
/// partial data are delivered with the data.
fn check_payload(payload: &ExecutorPayload) -> Result<(), ClientError> {
    if payload.data.is_null() {
        if let Some(errors) = &payload.errors {
            return Err(ClientError::executor(
                "executor returned errors and no data",
                Some(errors.clone()),
            ));
        }
    }
    Ok(())
}
