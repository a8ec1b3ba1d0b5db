// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Subscriptions: a lazy sequence of shaped results, each message applied
//! to the cache like a mutation.

#[path = "testutils/mod.rs"]
mod testutils;

use futures::StreamExt;
use serde_json::json;
use testutils::{client, payload, MockExecutor, MockSubscriber};

#[tokio::test]
async fn messages_yield_shaped_results() {
    let executor = MockExecutor::new(|_| panic!("subscriptions never hit the executor"));
    let subscriber = MockSubscriber::new(vec![
        payload(json!({"userUpdated": {"id": "1", "name": "Ada"}}), "max-age=60"),
        payload(json!({"userUpdated": {"id": "1", "name": "Grace"}}), "max-age=60"),
    ]);
    let client = client(executor, Some(subscriber));

    let mut stream = client
        .request(
            "subscription { userUpdated { id name } }",
            Default::default(),
        )
        .await
        .unwrap()
        .into_stream()
        .unwrap();

    let first = stream.next().await.unwrap().unwrap();
    assert_eq!(first.data["userUpdated"]["name"], json!("Ada"));
    assert!(first.query_hash.is_none());
    first.cache_promise.unwrap().await_written().await.unwrap();

    let second = stream.next().await.unwrap().unwrap();
    assert_eq!(second.data["userUpdated"]["name"], json!("Grace"));
    second.cache_promise.unwrap().await_written().await.unwrap();

    assert!(stream.next().await.is_none());

    // Message data normalised into the entity tier, mutation-style.
    let entity = client.entity_cache_entry("User:1").unwrap();
    assert_eq!(entity["fields"]["name"]["value"], json!("Grace"));
    assert_eq!(client.response_cache_size(), 0);
}

#[tokio::test]
async fn subscribing_without_a_subscriber_is_a_config_error() {
    let executor = MockExecutor::new(|_| {
        Ok(payload(json!({"user": {"id": "1"}}), "max-age=60"))
    });
    let client = client(executor, None);

    let outcome = client
        .request("subscription { userUpdated { id } }", Default::default())
        .await;
    assert!(matches!(outcome, Err(cacheql::ClientError::Config(_))));
}

#[tokio::test]
async fn abandoned_streams_leave_no_state_behind() {
    let executor = MockExecutor::new(|_| panic!("subscriptions never hit the executor"));
    let subscriber = MockSubscriber::new(vec![payload(
        json!({"userUpdated": {"id": "1", "name": "Ada"}}),
        "max-age=60",
    )]);
    let client = client(executor.clone(), Some(subscriber));

    let stream = client
        .request(
            "subscription { userUpdated { id name } }",
            Default::default(),
        )
        .await
        .unwrap()
        .into_stream()
        .unwrap();
    drop(stream);

    // Dropping the sequence before consuming it must not wedge later
    // queries or leave registry residue.
    assert_eq!(executor.calls(), 0);
}
