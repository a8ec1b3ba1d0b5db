// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Caller-facing result shapes

use std::collections::BTreeMap;

use futures::stream::BoxStream;
use serde_json::Value as JsonValue;
use tokio::sync::oneshot;

use crate::cache::{CacheError, CacheabilityMetadata};

use super::error::ClientError;

/// Handle on the background cache-write phase. The user-visible result
/// resolves before any tier write; awaiting this resolves once all three
/// tiers have acknowledged.
#[derive(Debug)]
pub struct CachePromise(oneshot::Receiver<Result<(), CacheError>>);

impl CachePromise {
    pub fn new(receiver: oneshot::Receiver<Result<(), CacheError>>) -> Self {
        Self(receiver)
    }

    /// Wait for the write phase. A dropped write task reads as a store
    /// error.
    pub async fn await_written(self) -> Result<(), CacheError> {
        match self.0.await {
            Ok(outcome) => outcome,
            Err(_) => Err(CacheError::Store("cache write task dropped".to_string())),
        }
    }
}

/// The result of one query or mutation (and of each subscription message).
#[derive(Debug)]
pub struct RequestResult {
    pub data: JsonValue,
    /// Per-path cacheability of the returned data.
    pub cache_metadata: BTreeMap<String, CacheabilityMetadata>,
    /// The request fingerprint; `None` for mutations and subscriptions.
    pub query_hash: Option<String>,
    /// Present until awaited via `await_data_cached` (which strips it).
    pub cache_promise: Option<CachePromise>,
}

/// Lazy sequence of per-message results for a subscription.
pub type ResultStream = BoxStream<'static, Result<RequestResult, ClientError>>;

/// What `Client::request` returns: one result, or a stream of them.
pub enum RequestOutcome {
    Single(RequestResult),
    Stream(ResultStream),
}

impl RequestOutcome {
    /// The single result, for queries and mutations.
    pub fn into_single(self) -> Option<RequestResult> {
        match self {
            RequestOutcome::Single(result) => Some(result),
            RequestOutcome::Stream(_) => None,
        }
    }

    /// The message stream, for subscriptions.
    pub fn into_stream(self) -> Option<ResultStream> {
        match self {
            RequestOutcome::Stream(stream) => Some(stream),
            RequestOutcome::Single(_) => None,
        }
    }
}
