// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Error propagation: parse and validation failures mutate nothing,
//! executor errors surface once, partial data with errors is delivered.

#[path = "testutils/mod.rs"]
mod testutils;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use cacheql::{ClientError, EventKind, ExecutorPayload, RequestOptions};
use serde_json::json;
use testutils::{awaited, client, payload, MockExecutor};

#[tokio::test]
async fn syntax_errors_touch_nothing() {
    let executor = MockExecutor::new(|_| panic!("parse failures never fetch"));
    let client = client(executor.clone(), None);

    let outcome = client
        .request("{ user(id: \"1\" { id }", RequestOptions::default())
        .await;
    assert!(matches!(outcome, Err(ClientError::Request(_))));
    assert_eq!(executor.calls(), 0);
    assert_eq!(client.path_cache_size(), 0);
}

#[tokio::test]
async fn validation_errors_touch_nothing() {
    let executor = MockExecutor::new(|_| panic!("validation failures never fetch"));
    let client = client(executor.clone(), None);

    let outcome = client
        .request("{ user(id: \"1\") { shoeSize } }", RequestOptions::default())
        .await;
    assert!(matches!(outcome, Err(ClientError::Request(_))));
    assert_eq!(executor.calls(), 0);
}

#[tokio::test]
async fn multiple_operations_are_rejected() {
    let executor = MockExecutor::new(|_| panic!("rejected documents never fetch"));
    let client = client(executor.clone(), None);

    let outcome = client
        .request(
            "query A { user(id: \"1\") { id } } query B { user(id: \"2\") { id } }",
            RequestOptions::default(),
        )
        .await;
    assert!(matches!(
        outcome,
        Err(ClientError::Request(
            cacheql::request::RequestError::TooManyOperations(2)
        ))
    ));
}

#[tokio::test]
async fn partial_data_with_errors_is_delivered_not_rejected() {
    let executor = MockExecutor::new(|_| {
        Ok(ExecutorPayload {
            data: json!({"user": {"id": "1", "name": null}}),
            errors: Some(json!([{"message": "name unavailable"}])),
            ..payload(json!({}), "max-age=60")
        })
    });
    let client = client(executor.clone(), None);

    let result = client
        .request("{ user(id: \"1\") { id name } }", awaited())
        .await
        .unwrap()
        .into_single()
        .unwrap();
    assert_eq!(result.data["user"]["id"], json!("1"));
    assert_eq!(result.data["user"]["name"], json!(null));
}

#[tokio::test]
async fn errors_without_data_reject() {
    let executor = MockExecutor::new(|_| {
        Ok(ExecutorPayload {
            data: json!(null),
            errors: Some(json!([{"message": "boom"}])),
            ..Default::default()
        })
    });
    let client = client(executor.clone(), None);

    let outcome = client
        .request("{ user(id: \"1\") { id name } }", RequestOptions::default())
        .await;
    match outcome {
        Err(ClientError::Executor { errors, .. }) => {
            assert_eq!(errors.unwrap()[0]["message"], json!("boom"));
        }
        other => panic!("expected executor error, got ok={}", other.is_ok()),
    }
    assert_eq!(client.response_cache_size(), 0);
}

#[tokio::test]
async fn events_fire_at_pipeline_points() {
    let executor = MockExecutor::new(|_| {
        Ok(payload(
            json!({"user": {"id": "1", "name": "Ada"}}),
            "max-age=60",
        ))
    });
    let client = client(executor.clone(), None);

    let fetches = Arc::new(AtomicUsize::new(0));
    let hits = Arc::new(AtomicUsize::new(0));
    let misses = Arc::new(AtomicUsize::new(0));

    let fetch_counter = Arc::clone(&fetches);
    client.on(
        EventKind::Fetch,
        Arc::new(move |_| {
            fetch_counter.fetch_add(1, Ordering::SeqCst);
        }),
    );
    let hit_counter = Arc::clone(&hits);
    client.on(
        EventKind::CacheHit,
        Arc::new(move |_| {
            hit_counter.fetch_add(1, Ordering::SeqCst);
        }),
    );
    let miss_counter = Arc::clone(&misses);
    let miss_listener = client.on(
        EventKind::CacheMiss,
        Arc::new(move |_| {
            miss_counter.fetch_add(1, Ordering::SeqCst);
        }),
    );

    client
        .request("{ user(id: \"1\") { id name } }", awaited())
        .await
        .unwrap();
    client
        .request("{ user(id: \"1\") { id name } }", awaited())
        .await
        .unwrap();

    assert_eq!(fetches.load(Ordering::SeqCst), 1);
    assert_eq!(misses.load(Ordering::SeqCst), 1);
    assert_eq!(hits.load(Ordering::SeqCst), 1);

    // Unsubscribed listeners stop firing.
    assert!(client.off(miss_listener));
    client.clear_cache();
    client
        .request("{ user(id: \"1\") { id name } }", awaited())
        .await
        .unwrap();
    assert_eq!(misses.load(Ordering::SeqCst), 1);
}
