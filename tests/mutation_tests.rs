// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Mutation cache semantics: entity and path tiers update, the response
//! tier is never written and never invalidated.

#[path = "testutils/mod.rs"]
mod testutils;

use serde_json::json;
use testutils::{awaited, client, payload, MockExecutor};

fn routed_executor() -> std::sync::Arc<testutils::MockExecutor> {
    MockExecutor::new(|query| {
        if query.contains("updateUser") {
            Ok(payload(
                json!({"updateUser": {"id": "1", "name": "Grace"}}),
                "max-age=60",
            ))
        } else {
            Ok(payload(
                json!({"user": {"id": "1", "name": "Ada"}}),
                "max-age=60",
            ))
        }
    })
}

#[tokio::test]
async fn mutations_never_write_the_response_cache() {
    let executor = routed_executor();
    let client = client(executor.clone(), None);

    let result = client
        .request(
            "mutation { updateUser(id: \"1\", name: \"Grace\") { id name } }",
            awaited(),
        )
        .await
        .unwrap()
        .into_single()
        .unwrap();

    assert_eq!(result.data["updateUser"]["name"], json!("Grace"));
    assert!(result.query_hash.is_none());
    assert_eq!(client.response_cache_size(), 0);
    assert!(client.entity_cache_size() > 0);
}

#[tokio::test]
async fn mutation_updates_entities_but_not_cached_responses() {
    let executor = routed_executor();
    let client = client(executor.clone(), None);

    // Prime the response cache with Ada.
    client
        .request("{ user(id: \"1\") { id name } }", awaited())
        .await
        .unwrap();
    assert_eq!(executor.calls(), 1);

    // Mutate to Grace; the entity tier updates.
    client
        .request(
            "mutation { updateUser(id: \"1\", name: \"Grace\") { id name } }",
            awaited(),
        )
        .await
        .unwrap();
    assert_eq!(executor.calls(), 2);
    let entity = client.entity_cache_entry("User:1").unwrap();
    assert_eq!(entity["fields"]["name"]["value"], json!("Grace"));

    // The exact original query replays from the response tier and still
    // answers Ada: overlapping mutations do not invalidate response
    // records. Documented, deliberate.
    let replay = client
        .request("{ user(id: \"1\") { id name } }", awaited())
        .await
        .unwrap()
        .into_single()
        .unwrap();
    assert_eq!(executor.calls(), 2);
    assert_eq!(replay.data["user"]["name"], json!("Ada"));

    // A differently-shaped query misses the response tier, synthesises
    // from the entity, and sees the mutation without touching the
    // executor.
    let fresh_shape = client
        .request("{ user(id: \"1\") { name } }", awaited())
        .await
        .unwrap()
        .into_single()
        .unwrap();
    assert_eq!(executor.calls(), 2);
    assert_eq!(fresh_shape.data["user"]["name"], json!("Grace"));
}

#[tokio::test]
async fn no_store_mutation_leaves_no_valid_cache() {
    let executor = MockExecutor::new(|query| {
        if query.contains("updateUser") {
            // No cache-control header: mutations default to
            // max-age=0, no-cache, no-store.
            Ok(cacheql::ExecutorPayload {
                data: json!({"updateUser": {"id": "1", "name": "Grace"}}),
                ..Default::default()
            })
        } else {
            Ok(payload(
                json!({"user": {"id": "1", "name": "Ada"}}),
                "max-age=60",
            ))
        }
    });
    let client = client(executor.clone(), None);

    client
        .request("{ user(id: \"1\") { id name } }", awaited())
        .await
        .unwrap();
    client
        .request(
            "mutation { updateUser(id: \"1\", name: \"Grace\") { id name } }",
            awaited(),
        )
        .await
        .unwrap();

    // The mutation's writes carry the no-store default: analysis must not
    // serve them. The primed entity from the query is overwritten with an
    // invalid directive, so a fresh shape refetches.
    client
        .request("{ user(id: \"1\") { name } }", awaited())
        .await
        .unwrap();
    assert_eq!(executor.calls(), 3);
}
