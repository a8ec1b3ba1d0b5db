// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Central cache manager
//!
//! Owns the three tiers, the in-flight request registries and the
//! statistics. `analyse` decides hit/miss/partial; the `resolve_*` family
//! plans tier writes, applies them in a background task and hands the
//! caller a cache promise. The response-tier write is ordered after every
//! path and entity write of the same request.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use log::{debug, warn};
use serde_json::Value as JsonValue;
use tokio::sync::oneshot;

use crate::ast::{Document, OperationKind};
use crate::exec::{CachePromise, ExecutorPayload};
use crate::request::{RequestContext, RequestOptions};
use crate::schema::Schema;

use super::analysis::{AnalysisResult, QueryAnalyzer};
use super::cacheability::Cacheability;
use super::config::{CacheConfig, DefaultCacheControls};
use super::entity_cache::EntityCache;
use super::metadata::CacheMetadata;
use super::path_cache::PathCache;
use super::registry::RequestRegistry;
use super::resolve::{merge_response_data, ResponseNormalizer, WritePlan};
use super::response_cache::{ResponseCache, ResponseRecord};
use super::store::{CacheSnapshot, StoreStats};
use super::CacheError;

/// What resolve hands back: shaped data now, a promise for the writes.
#[derive(Debug)]
pub struct ResolvedPayload {
    pub data: JsonValue,
    pub cache_metadata: CacheMetadata,
    pub cache_promise: CachePromise,
}

/// Aggregate statistics over the three tiers.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CacheManagerStats {
    pub responses: StoreStats,
    pub query_paths: StoreStats,
    pub entities: StoreStats,
}

impl CacheManagerStats {
    pub fn overall_hit_rate(&self) -> f64 {
        let hits = self.responses.hits + self.query_paths.hits + self.entities.hits;
        let misses = self.responses.misses + self.query_paths.misses + self.entities.misses;
        let total = hits + misses;
        if total == 0 {
            0.0
        } else {
            hits as f64 / total as f64
        }
    }
}

/// The three-tier cache manager.
pub struct CacheManager {
    config: CacheConfig,
    schema: Arc<Schema>,
    resource_key: String,
    type_cache_controls: HashMap<String, String>,
    default_cache_controls: DefaultCacheControls,

    responses: Arc<ResponseCache>,
    paths: Arc<PathCache>,
    entities: Arc<EntityCache>,

    registry: RequestRegistry,
}

impl CacheManager {
    pub fn new(
        config: CacheConfig,
        schema: Arc<Schema>,
        resource_key: impl Into<String>,
        type_cache_controls: HashMap<String, String>,
        default_cache_controls: DefaultCacheControls,
    ) -> Result<Self, String> {
        config.validate()?;
        Ok(Self {
            responses: Arc::new(ResponseCache::new(config.responses.max_entries)),
            paths: Arc::new(PathCache::new(config.query_paths.max_entries)),
            entities: Arc::new(EntityCache::new(config.entities.max_entries)),
            config,
            schema,
            resource_key: resource_key.into(),
            type_cache_controls,
            default_cache_controls,
            registry: RequestRegistry::new(),
        })
    }

    pub fn registry(&self) -> &RequestRegistry {
        &self.registry
    }

    pub fn is_valid(&self, cacheability: &Cacheability) -> bool {
        cacheability.is_valid(Utc::now())
    }

    /// The valid response record under `hash`, if any.
    pub fn response(&self, hash: &str) -> Option<ResponseRecord> {
        if !self.config.enabled {
            return None;
        }
        self.responses
            .get_valid(hash, Utc::now())
            .map(|(record, _)| record)
    }

    /// Decide hit / miss / partial for a normalised document.
    pub fn analyse(
        &self,
        hash: &str,
        document: &Document,
        query: &str,
        ctx: &RequestContext,
    ) -> AnalysisResult {
        if !self.config.enabled {
            return AnalysisResult::full_miss(document, query);
        }
        // A resolve may have landed between the orchestrator's response
        // check and this call; re-check before walking.
        if let Some((record, _)) = self.responses.get_valid(hash, Utc::now()) {
            debug!("analysis short-circuit: response record for '{}'", hash);
            return AnalysisResult {
                cached_data: Some(record.data),
                cache_metadata: Some(CacheMetadata::rehydrate(&record.cache_metadata)),
                filtered: false,
                updated_document: None,
                updated_query: None,
            };
        }
        let analyzer = QueryAnalyzer {
            schema: &self.schema,
            ctx,
            paths: &self.paths,
            entities: &self.entities,
            resource_key: &self.resource_key,
            now: Utc::now(),
        };
        analyzer.analyse(document, query)
    }

    /// Resolve a query response: normalise the fetched part into the path
    /// and entity tiers, compose the full response with whatever analysis
    /// served from cache, and write the composite to the response tier.
    #[allow(clippy::too_many_arguments)]
    pub fn resolve_query(
        &self,
        document: &Document,
        payload: &ExecutorPayload,
        analysis: Option<(JsonValue, CacheMetadata)>,
        hash: &str,
        options: &RequestOptions,
        ctx: &RequestContext,
    ) -> ResolvedPayload {
        let top = self.top_cacheability(payload, OperationKind::Query);
        let plan = self.plan_writes(document, payload, &top, ctx);

        let (cached_data, prior_metadata) = match analysis {
            Some((data, metadata)) => (Some(data), Some(metadata)),
            None => (None, None),
        };
        let composed = match &cached_data {
            Some(cached) => merge_response_data(cached, &payload.data),
            None => payload.data.clone(),
        };
        let mut metadata = plan.metadata.clone();
        if let Some(prior) = &prior_metadata {
            metadata.merge(prior);
        }

        let record = ResponseRecord {
            data: composed.clone(),
            cache_metadata: metadata.dehydrate(),
        };
        // The response entry is valid only as long as its weakest field.
        let record_cacheability = metadata.combined().unwrap_or_else(|| top.clone());
        let promise = self.apply_writes(
            plan,
            Some((hash.to_string(), record, record_cacheability)),
            options.tag.clone(),
        );

        ResolvedPayload {
            data: composed,
            cache_metadata: metadata,
            cache_promise: promise,
        }
    }

    /// Resolve a mutation response: entity and path tiers only; the
    /// response tier is never consulted nor written.
    pub fn resolve_mutation(
        &self,
        document: &Document,
        payload: &ExecutorPayload,
        options: &RequestOptions,
        ctx: &RequestContext,
    ) -> ResolvedPayload {
        let top = self.top_cacheability(payload, OperationKind::Mutation);
        let plan = self.plan_writes(document, payload, &top, ctx);
        let metadata = plan.metadata.clone();
        let promise = self.apply_writes(plan, None, options.tag.clone());
        ResolvedPayload {
            data: payload.data.clone(),
            cache_metadata: metadata,
            cache_promise: promise,
        }
    }

    /// Resolve one subscription message; cache effects are mutation-like.
    pub fn resolve_subscription(
        &self,
        document: &Document,
        payload: &ExecutorPayload,
        options: &RequestOptions,
        ctx: &RequestContext,
    ) -> ResolvedPayload {
        let top = self.top_cacheability(payload, OperationKind::Subscription);
        let plan = self.plan_writes(document, payload, &top, ctx);
        let metadata = plan.metadata.clone();
        let promise = self.apply_writes(plan, None, options.tag.clone());
        ResolvedPayload {
            data: payload.data.clone(),
            cache_metadata: metadata,
            cache_promise: promise,
        }
    }

    /// Store a response the analyser fully reconstructed from the path and
    /// entity tiers, so the next identical request is a response-tier hit.
    pub fn cache_reconstructed_response(
        &self,
        hash: &str,
        data: &JsonValue,
        metadata: &CacheMetadata,
        tag: Option<JsonValue>,
    ) -> CachePromise {
        let record = ResponseRecord {
            data: data.clone(),
            cache_metadata: metadata.dehydrate(),
        };
        let cacheability = metadata
            .combined()
            .unwrap_or_else(|| self.top_cacheability(&ExecutorPayload::default(), OperationKind::Query));
        self.apply_writes(
            WritePlan::default(),
            Some((hash.to_string(), record, cacheability)),
            tag,
        )
    }

    fn plan_writes(
        &self,
        document: &Document,
        payload: &ExecutorPayload,
        top: &Cacheability,
        ctx: &RequestContext,
    ) -> WritePlan {
        let normalizer = ResponseNormalizer {
            schema: &self.schema,
            ctx,
            resource_key: &self.resource_key,
            type_cache_controls: &self.type_cache_controls,
            server_metadata: payload.cache_metadata.as_ref(),
        };
        normalizer.plan(document, &payload.data, top)
    }

    /// Apply a write plan in a background task: paths and entities first,
    /// the response record (when given) strictly after. The returned
    /// promise resolves when every tier has acknowledged; failures reject
    /// the promise and are logged, never surfaced on the result.
    fn apply_writes(
        &self,
        plan: WritePlan,
        response: Option<(String, ResponseRecord, Cacheability)>,
        tag: Option<JsonValue>,
    ) -> CachePromise {
        let (tx, rx) = oneshot::channel();
        if !self.config.enabled {
            let _ = tx.send(Ok(()));
            return CachePromise::new(rx);
        }

        let paths = Arc::clone(&self.paths);
        let entities = Arc::clone(&self.entities);
        let responses = Arc::clone(&self.responses);
        tokio::spawn(async move {
            let outcome = (|| -> Result<(), CacheError> {
                for write in plan.paths {
                    paths.set(&write.cache_path, write.value, write.cacheability, tag.clone())?;
                }
                for write in plan.entities {
                    entities.upsert(write.entity, write.cacheability, tag.clone())?;
                }
                if let Some((hash, record, cacheability)) = response {
                    responses.set(&hash, record, cacheability, tag)?;
                }
                Ok(())
            })();
            if let Err(error) = &outcome {
                warn!("cache write phase failed: {}", error);
            }
            let _ = tx.send(outcome);
        });
        CachePromise::new(rx)
    }

    fn top_cacheability(&self, payload: &ExecutorPayload, kind: OperationKind) -> Cacheability {
        if let Some(header) = payload.cache_control_header() {
            return Cacheability::parse_cache_control(header);
        }
        let default = match kind {
            OperationKind::Query => &self.default_cache_controls.query,
            OperationKind::Mutation => &self.default_cache_controls.mutation,
            OperationKind::Subscription => &self.default_cache_controls.subscription,
        };
        Cacheability::parse_cache_control(default)
    }

    pub fn export(&self, tag: Option<&JsonValue>) -> Result<CacheSnapshot, CacheError> {
        Ok(CacheSnapshot {
            responses: self.responses.export(tag)?,
            query_paths: self.paths.export(tag)?,
            data_entities: self.entities.export(tag)?,
        })
    }

    pub fn import(&self, snapshot: CacheSnapshot) -> Result<(), CacheError> {
        self.responses.import(snapshot.responses)?;
        self.paths.import(snapshot.query_paths)?;
        self.entities.import(snapshot.data_entities)?;
        Ok(())
    }

    pub fn clear(&self) {
        self.responses.clear();
        self.paths.clear();
        self.entities.clear();
    }

    pub fn response_cache_size(&self) -> usize {
        self.responses.size()
    }

    pub fn path_cache_size(&self) -> usize {
        self.paths.size()
    }

    pub fn entity_cache_size(&self) -> usize {
        self.entities.size()
    }

    pub fn response_cache_entry(&self, key: &str) -> Option<JsonValue> {
        self.responses.entry(key)
    }

    pub fn path_cache_entry(&self, key: &str) -> Option<JsonValue> {
        self.paths.entry(key)
    }

    pub fn entity_cache_entry(&self, key: &str) -> Option<JsonValue> {
        self.entities.entry(key)
    }

    pub fn stats(&self) -> CacheManagerStats {
        CacheManagerStats {
            responses: self.responses.stats(),
            query_paths: self.paths.stats(),
            entities: self.entities.stats(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::RequestParser;
    use crate::schema::sdl::parse_sdl;
    use serde_json::json;

    fn schema() -> Arc<Schema> {
        Arc::new(
            parse_sdl(
                "type Query { user(id: ID!): User } \
                 type Mutation { updateUser(id: ID!, name: String): User } \
                 type User { id: ID! name: String email: String }",
            )
            .unwrap(),
        )
    }

    fn manager() -> CacheManager {
        CacheManager::new(
            CacheConfig::default(),
            schema(),
            "id",
            HashMap::new(),
            DefaultCacheControls::default(),
        )
        .unwrap()
    }

    fn parse(query: &str) -> (crate::request::ParsedRequest, RequestContext) {
        RequestParser::new(schema(), "id")
            .parse(query, &RequestOptions::default())
            .unwrap()
    }

    fn payload(data: JsonValue, cache_control: &str) -> ExecutorPayload {
        let mut headers = HashMap::new();
        headers.insert("cache-control".to_string(), cache_control.to_string());
        ExecutorPayload {
            data,
            headers,
            cache_metadata: None,
            errors: None,
        }
    }

    #[tokio::test]
    async fn resolve_then_analyse_round_trips() {
        let manager = manager();
        let (parsed, ctx) = parse("{ user(id: \"1\") { id name } }");
        let hash = crate::request::hash_request(&parsed.query);

        let resolved = manager.resolve_query(
            &parsed.document,
            &payload(json!({"user": {"id": "1", "name": "Ada"}}), "max-age=60"),
            None,
            &hash,
            &RequestOptions::default(),
            &ctx,
        );
        resolved.cache_promise.await_written().await.unwrap();

        // Invariant: the response record equals the delivered data.
        let record = manager.response(&hash).unwrap();
        assert_eq!(record.data, resolved.data);

        let analysis = manager.analyse(&hash, &parsed.document, &parsed.query, &ctx);
        assert!(analysis.is_full_hit());
        assert_eq!(analysis.cached_data.unwrap(), resolved.data);
    }

    #[tokio::test]
    async fn partial_synthesis_composes_cached_and_fetched() {
        let manager = manager();
        let (first, ctx1) = parse("{ user(id: \"1\") { id name } }");
        let h1 = crate::request::hash_request(&first.query);
        manager
            .resolve_query(
                &first.document,
                &payload(json!({"user": {"id": "1", "name": "Ada"}}), "max-age=60"),
                None,
                &h1,
                &RequestOptions::default(),
                &ctx1,
            )
            .cache_promise
            .await_written()
            .await
            .unwrap();

        let (second, ctx2) = parse("{ user(id: \"1\") { id name email } }");
        let h2 = crate::request::hash_request(&second.query);
        let analysis = manager.analyse(&h2, &second.document, &second.query, &ctx2);
        assert!(analysis.filtered);
        let updated_document = analysis.updated_document.clone().unwrap();
        let updated_query = analysis.updated_query.clone().unwrap();
        assert!(updated_query.contains("email"));
        assert!(!updated_query.contains("name"));

        let resolved = manager.resolve_query(
            &updated_document,
            &payload(json!({"user": {"id": "1", "email": "a@b"}}), "max-age=60"),
            analysis
                .cached_data
                .clone()
                .zip(analysis.cache_metadata.clone()),
            &h2,
            &RequestOptions::default(),
            &ctx2,
        );
        assert_eq!(
            resolved.data,
            json!({"user": {"id": "1", "name": "Ada", "email": "a@b"}})
        );
        resolved.cache_promise.await_written().await.unwrap();

        // The composite is now a full response-tier hit.
        assert_eq!(manager.response(&h2).unwrap().data, resolved.data);
    }

    #[tokio::test]
    async fn mutations_never_touch_the_response_tier() {
        let manager = manager();
        let (parsed, ctx) = parse("mutation { updateUser(id: \"1\", name: \"Grace\") { id name } }");

        let resolved = manager.resolve_mutation(
            &parsed.document,
            &payload(
                json!({"updateUser": {"id": "1", "name": "Grace"}}),
                "max-age=60",
            ),
            &RequestOptions::default(),
            &ctx,
        );
        resolved.cache_promise.await_written().await.unwrap();

        assert_eq!(manager.response_cache_size(), 0);
        assert!(manager.entity_cache_size() > 0);
        // The entity write is visible to subsequent query analysis.
        let entity = manager.entity_cache_entry("User:1").unwrap();
        assert_eq!(entity["fields"]["name"]["value"], json!("Grace"));
    }

    #[tokio::test]
    async fn export_clear_import_restores_observables() {
        let manager = manager();
        let (parsed, ctx) = parse("{ user(id: \"1\") { id name } }");
        let hash = crate::request::hash_request(&parsed.query);
        manager
            .resolve_query(
                &parsed.document,
                &payload(json!({"user": {"id": "1", "name": "Ada"}}), "max-age=60"),
                None,
                &hash,
                &RequestOptions::default(),
                &ctx,
            )
            .cache_promise
            .await_written()
            .await
            .unwrap();

        let sizes = (
            manager.response_cache_size(),
            manager.path_cache_size(),
            manager.entity_cache_size(),
        );
        let snapshot = manager.export(None).unwrap();
        manager.clear();
        assert_eq!(manager.response_cache_size(), 0);

        manager.import(snapshot).unwrap();
        assert_eq!(
            (
                manager.response_cache_size(),
                manager.path_cache_size(),
                manager.entity_cache_size(),
            ),
            sizes
        );
        assert!(manager.response(&hash).is_some());
    }

    #[tokio::test]
    async fn disabled_cache_never_stores() {
        let mut config = CacheConfig::default();
        config.enabled = false;
        let manager = CacheManager::new(
            config,
            schema(),
            "id",
            HashMap::new(),
            DefaultCacheControls::default(),
        )
        .unwrap();

        let (parsed, ctx) = parse("{ user(id: \"1\") { id name } }");
        let hash = crate::request::hash_request(&parsed.query);
        let resolved = manager.resolve_query(
            &parsed.document,
            &payload(json!({"user": {"id": "1", "name": "Ada"}}), "max-age=60"),
            None,
            &hash,
            &RequestOptions::default(),
            &ctx,
        );
        resolved.cache_promise.await_written().await.unwrap();
        assert_eq!(manager.response_cache_size(), 0);
        assert!(!manager
            .analyse(&hash, &parsed.document, &parsed.query, &ctx)
            .is_full_hit());
    }
}
