// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! cacheql - A caching GraphQL client core
//!
//! An isomorphic GraphQL client that transparently caches query responses,
//! the data entities reachable inside them, and the query-path metadata
//! that lets partial responses be composed from cached fragments.
//!
//! # Features
//!
//! - **Three-tier cache**: responses, query paths and normalised data
//!   entities, each with LRU + TTL eviction
//! - **Partial synthesis**: queries are rewritten to fetch only the fields
//!   the cache cannot serve
//! - **Request coalescing**: concurrent identical queries share one fetch
//! - **Cache-Control semantics**: per-field TTL inheritance with
//!   ancestor-minimum merging, stale-while-revalidate aware
//! - **Snapshots**: JSON export/import of all three tiers, filterable by
//!   caller tag
//!
//! # Usage
//!
//! ```no_run
//! use std::sync::Arc;
//! use cacheql::{Client, ClientConfig, RequestOptions};
//! # use cacheql::{Executor, ExecutorPayload, ExecuteOptions, ClientError, RequestContext};
//! # use cacheql::ast::Document;
//! # struct HttpExecutor;
//! # #[async_trait::async_trait]
//! # impl Executor for HttpExecutor {
//! #     async fn resolve(&self, _: &str, _: &Document, _: &ExecuteOptions, _: &RequestContext)
//! #         -> Result<ExecutorPayload, ClientError> { unimplemented!() }
//! # }
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ClientConfig::with_schema(
//!     "type Query { user(id: ID!): User } type User { id: ID! name: String }",
//! );
//! let client = Client::new(config, Arc::new(HttpExecutor), None)?;
//!
//! let result = client
//!     .request("{ user(id: \"1\") { id name } }", RequestOptions::default())
//!     .await?
//!     .into_single()
//!     .expect("queries return a single result");
//! println!("{}", result.data);
//! # Ok(())
//! # }
//! ```

pub mod ast;
pub mod cache;
pub mod client;
pub mod exec;
pub mod request;
pub mod schema;

pub use cache::{
    CacheConfig, CacheError, CacheManagerStats, CacheMetadata, CacheSnapshot, Cacheability,
    CacheabilityMetadata, DefaultCacheControls, TierConfig,
};
pub use client::{Client, ClientConfig, EventKind, EventPayload, Listener, ListenerId, Mode,
    SubscriptionsConfig};
pub use exec::{
    CachePromise, ClientError, ExecuteOptions, Executor, ExecutorPayload, RequestOutcome,
    RequestResult, ResultStream, Subscriber,
};
pub use request::{hash_request, RequestContext, RequestOptions};
pub use schema::{Schema, SchemaError, ValidationError};

/// cacheql version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// cacheql crate name
pub const CRATE_NAME: &str = env!("CARGO_PKG_NAME");
