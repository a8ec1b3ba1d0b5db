// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! In-flight request coalescing: concurrent identical queries share one
//! fetch, and failures drain every waiter with the same rejection.

#[path = "testutils/mod.rs"]
mod testutils;

use std::time::Duration;

use cacheql::{ClientError, RequestOptions};
use serde_json::json;
use testutils::{client, payload, MockExecutor};

#[tokio::test]
async fn concurrent_identical_queries_share_one_fetch() {
    let executor = MockExecutor::with_delay(Duration::from_millis(50), |_| {
        Ok(payload(
            json!({"user": {"id": "1", "name": "Ada"}}),
            "max-age=60",
        ))
    });
    let client = client(executor.clone(), None);

    let query = "{ user(id: \"1\") { id name } }";
    let (a, b) = tokio::join!(
        client.request(query, RequestOptions::default()),
        client.request(query, RequestOptions::default()),
    );

    assert_eq!(executor.calls(), 1);
    let a = a.unwrap().into_single().unwrap();
    let b = b.unwrap().into_single().unwrap();
    assert_eq!(a.data, b.data);
    assert_eq!(a.cache_metadata, b.cache_metadata);
    assert_eq!(a.query_hash, b.query_hash);
}

#[tokio::test]
async fn three_waiters_one_fetch() {
    let executor = MockExecutor::with_delay(Duration::from_millis(50), |_| {
        Ok(payload(
            json!({"user": {"id": "1", "name": "Ada"}}),
            "max-age=60",
        ))
    });
    let client = client(executor.clone(), None);

    let query = "{ user(id: \"1\") { id name } }";
    let (a, b, c) = tokio::join!(
        client.request(query, RequestOptions::default()),
        client.request(query, RequestOptions::default()),
        client.request(query, RequestOptions::default()),
    );
    assert_eq!(executor.calls(), 1);
    for outcome in [a, b, c] {
        assert_eq!(
            outcome.unwrap().into_single().unwrap().data,
            json!({"user": {"id": "1", "name": "Ada"}})
        );
    }
}

#[tokio::test]
async fn distinct_queries_do_not_coalesce() {
    let executor = MockExecutor::with_delay(Duration::from_millis(20), |query| {
        let id = if query.contains("\"2\"") { "2" } else { "1" };
        Ok(payload(json!({"user": {"id": id, "name": "x"}}), "max-age=60"))
    });
    let client = client(executor.clone(), None);

    let (a, b) = tokio::join!(
        client.request("{ user(id: \"1\") { id name } }", RequestOptions::default()),
        client.request("{ user(id: \"2\") { id name } }", RequestOptions::default()),
    );
    a.unwrap();
    b.unwrap();
    assert_eq!(executor.calls(), 2);
}

#[tokio::test]
async fn executor_failure_drains_every_waiter() {
    let executor = MockExecutor::with_delay(Duration::from_millis(50), |_| {
        Err(ClientError::executor(
            "upstream unavailable",
            Some(json!([{"message": "upstream unavailable"}])),
        ))
    });
    let client = client(executor.clone(), None);

    let query = "{ user(id: \"1\") { id name } }";
    let (a, b, c) = tokio::join!(
        client.request(query, RequestOptions::default()),
        client.request(query, RequestOptions::default()),
        client.request(query, RequestOptions::default()),
    );

    assert_eq!(executor.calls(), 1);
    for outcome in [a, b, c] {
        match outcome {
            Err(ClientError::Executor { message, .. }) => {
                assert_eq!(message, "upstream unavailable")
            }
            other => panic!("expected executor error, got {:?}", other.is_ok()),
        }
    }

    // The active entry was cleared: a retry issues a fresh fetch rather
    // than waiting on a ghost.
    let retry = client.request(query, RequestOptions::default()).await;
    assert!(retry.is_err());
    assert_eq!(executor.calls(), 2);

    // And a failed fetch never mutates the tiers.
    assert_eq!(client.response_cache_size(), 0);
    assert_eq!(client.path_cache_size(), 0);
    assert_eq!(client.entity_cache_size(), 0);
}
