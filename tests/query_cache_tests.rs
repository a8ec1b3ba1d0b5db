// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Query caching behaviour: cold fetch, hot replay, partial synthesis and
//! entity normalisation across query shapes.

#[path = "testutils/mod.rs"]
mod testutils;

use serde_json::json;
use testutils::{awaited, client, payload, MockExecutor};

fn ada_executor() -> std::sync::Arc<MockExecutor> {
    MockExecutor::new(|query| {
        if query.contains("email") {
            Ok(payload(
                json!({"user": {"id": "1", "email": "a@b"}}),
                "public, max-age=60",
            ))
        } else {
            Ok(payload(
                json!({"user": {"id": "1", "name": "Ada"}}),
                "public, max-age=60",
            ))
        }
    })
}

#[tokio::test]
async fn cold_query_then_hot_replay() {
    let executor = ada_executor();
    let client = client(executor.clone(), None);

    let first = client
        .request("{ user(id: \"1\") { id name } }", awaited())
        .await
        .unwrap()
        .into_single()
        .unwrap();
    assert_eq!(executor.calls(), 1);
    assert_eq!(first.data, json!({"user": {"id": "1", "name": "Ada"}}));
    let first_hash = first.query_hash.clone().unwrap();

    // Within TTL: zero executor hits, same result, same fingerprint.
    let second = client
        .request("{ user(id: \"1\") { id name } }", awaited())
        .await
        .unwrap()
        .into_single()
        .unwrap();
    assert_eq!(executor.calls(), 1);
    assert_eq!(second.data, first.data);
    assert_eq!(second.query_hash.unwrap(), first_hash);
}

#[tokio::test]
async fn whitespace_and_variable_variants_share_a_fingerprint() {
    let executor = ada_executor();
    let client = client(executor.clone(), None);

    client
        .request("{ user(id: \"1\") { id name } }", awaited())
        .await
        .unwrap();

    // An anonymous operation using a variable canonicalises to the same
    // document, so the fingerprint (and the response record) is shared.
    let mut options = awaited();
    options.variables = json!({"id": "1"}).as_object().cloned();
    let replay = client
        .request(
            "query ($id: ID!) {\n  user(id: $id) {\n    id\n    name\n  }\n}",
            options,
        )
        .await
        .unwrap()
        .into_single()
        .unwrap();

    assert_eq!(executor.calls(), 1);
    assert_eq!(replay.data, json!({"user": {"id": "1", "name": "Ada"}}));
}

#[tokio::test]
async fn partial_synthesis_fetches_only_missing_fields() {
    let executor = ada_executor();
    let client = client(executor.clone(), None);

    client
        .request("{ user(id: \"1\") { id name } }", awaited())
        .await
        .unwrap();

    let combined = client
        .request("{ user(id: \"1\") { id name email } }", awaited())
        .await
        .unwrap()
        .into_single()
        .unwrap();

    assert_eq!(executor.calls(), 2);
    assert_eq!(
        combined.data,
        json!({"user": {"id": "1", "name": "Ada", "email": "a@b"}})
    );
    // The rewritten query dropped the cached field and kept the key.
    let rewritten = executor.seen_queries()[1].clone();
    assert!(rewritten.contains("email"));
    assert!(!rewritten.contains("name"));
    assert!(rewritten.contains("id"));
}

#[tokio::test]
async fn satisfied_queries_never_refetch() {
    let executor = ada_executor();
    let client = client(executor.clone(), None);

    client
        .request("{ user(id: \"1\") { id name } }", awaited())
        .await
        .unwrap();
    client
        .request("{ user(id: \"1\") { id name email } }", awaited())
        .await
        .unwrap();
    assert_eq!(executor.calls(), 2);

    // Every shape over already-cached fields synthesises without fetching.
    for query in [
        "{ user(id: \"1\") { id name email } }",
        "{ user(id: \"1\") { name email } }",
        "{ user(id: \"1\") { email } }",
    ] {
        let result = client
            .request(query, awaited())
            .await
            .unwrap()
            .into_single()
            .unwrap();
        assert_eq!(result.data["user"]["email"], json!("a@b"));
    }
    assert_eq!(executor.calls(), 2);
}

#[tokio::test]
async fn entities_serve_aliased_shapes() {
    let executor = ada_executor();
    let client = client(executor.clone(), None);

    client
        .request("{ user(id: \"1\") { id name } }", awaited())
        .await
        .unwrap();

    // Same entity through a different response shape: no fetch, same
    // scalar values.
    let aliased = client
        .request("{ account: user(id: \"1\") { person: name } }", awaited())
        .await
        .unwrap()
        .into_single()
        .unwrap();
    assert_eq!(executor.calls(), 1);
    assert_eq!(aliased.data["account"]["person"], json!("Ada"));
}

#[tokio::test]
async fn different_arguments_are_distinct_requests() {
    let executor = MockExecutor::new(|query| {
        if query.contains("\"2\"") {
            Ok(payload(
                json!({"user": {"id": "2", "name": "Grace"}}),
                "max-age=60",
            ))
        } else {
            Ok(payload(
                json!({"user": {"id": "1", "name": "Ada"}}),
                "max-age=60",
            ))
        }
    });
    let client = client(executor.clone(), None);

    let one = client
        .request("{ user(id: \"1\") { id name } }", awaited())
        .await
        .unwrap()
        .into_single()
        .unwrap();
    let two = client
        .request("{ user(id: \"2\") { id name } }", awaited())
        .await
        .unwrap()
        .into_single()
        .unwrap();

    assert_eq!(executor.calls(), 2);
    assert_eq!(one.data["user"]["name"], json!("Ada"));
    assert_eq!(two.data["user"]["name"], json!("Grace"));
    assert_ne!(one.query_hash, two.query_hash);
}

#[tokio::test]
async fn response_metadata_carries_directives() {
    let executor = ada_executor();
    let client = client(executor.clone(), None);

    let result = client
        .request("{ user(id: \"1\") { id name } }", awaited())
        .await
        .unwrap()
        .into_single()
        .unwrap();

    let query_meta = result.cache_metadata.get("query").unwrap();
    assert!(query_meta.cache_control.contains("max-age=60"));
    assert!(result
        .cache_metadata
        .keys()
        .any(|path| path.starts_with("user(")));
}

#[tokio::test]
async fn expired_responses_refetch() {
    let executor = MockExecutor::new(|_| {
        Ok(payload(
            json!({"user": {"id": "1", "name": "Ada"}}),
            "max-age=0",
        ))
    });
    let client = client(executor.clone(), None);

    client
        .request("{ user(id: \"1\") { id name } }", awaited())
        .await
        .unwrap();
    // max-age=0 with sub-second clock: the entry ages out immediately on
    // the next second boundary; force staleness by sleeping past it.
    tokio::time::sleep(std::time::Duration::from_millis(1100)).await;
    client
        .request("{ user(id: \"1\") { id name } }", awaited())
        .await
        .unwrap();
    assert_eq!(executor.calls(), 2);
}
