// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Snapshot round-trips: export, clear, import restores every observable;
//! a fresh instance primed from a snapshot serves without fetching.

#[path = "testutils/mod.rs"]
mod testutils;

use serde_json::json;
use testutils::{awaited, client, payload, MockExecutor};

fn ada_executor() -> std::sync::Arc<MockExecutor> {
    MockExecutor::new(|query| {
        if query.contains("email") {
            Ok(payload(
                json!({"user": {"id": "1", "email": "a@b"}}),
                "max-age=600",
            ))
        } else {
            Ok(payload(
                json!({"user": {"id": "1", "name": "Ada"}}),
                "max-age=600",
            ))
        }
    })
}

#[tokio::test]
async fn export_clear_import_restores_observables() {
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

    let sizes = (
        client.response_cache_size(),
        client.path_cache_size(),
        client.entity_cache_size(),
    );
    let entity_before = client.entity_cache_entry("User:1").unwrap();
    let snapshot = client.export_caches(None).unwrap();

    client.clear_cache();
    assert_eq!(client.response_cache_size(), 0);
    assert_eq!(client.path_cache_size(), 0);
    assert_eq!(client.entity_cache_size(), 0);

    client.import_caches(snapshot).unwrap();
    assert_eq!(
        (
            client.response_cache_size(),
            client.path_cache_size(),
            client.entity_cache_size(),
        ),
        sizes
    );
    assert_eq!(client.entity_cache_entry("User:1").unwrap(), entity_before);
}

#[tokio::test]
async fn imported_snapshot_serves_a_fresh_instance() {
    let executor = ada_executor();
    let first = client(executor.clone(), None);

    first
        .request("{ user(id: \"1\") { id name } }", awaited())
        .await
        .unwrap();
    first
        .request("{ user(id: \"1\") { id name email } }", awaited())
        .await
        .unwrap();
    assert_eq!(executor.calls(), 2);
    let snapshot = first.export_caches(None).unwrap();

    // A fresh instance with its own executor; the snapshot is its only
    // knowledge.
    let cold_executor = MockExecutor::new(|_| panic!("must be served from the snapshot"));
    let second = client(cold_executor.clone(), None);
    second.import_caches(snapshot).unwrap();

    let replay = second
        .request("{ user(id: \"1\") { id name } }", awaited())
        .await
        .unwrap()
        .into_single()
        .unwrap();
    assert_eq!(cold_executor.calls(), 0);
    assert_eq!(replay.data, json!({"user": {"id": "1", "name": "Ada"}}));
}

#[tokio::test]
async fn tagged_export_filters_writes() {
    let executor = ada_executor();
    let client = client(executor.clone(), None);

    let mut tagged = awaited();
    tagged.tag = Some(json!("bootstrap"));
    client
        .request("{ user(id: \"1\") { id name } }", tagged)
        .await
        .unwrap();

    client
        .request("{ user(id: \"1\") { id name email } }", awaited())
        .await
        .unwrap();

    let everything = client.export_caches(None).unwrap();
    let bootstrap_only = client.export_caches(Some(&json!("bootstrap"))).unwrap();

    assert!(bootstrap_only.responses.len() < everything.responses.len()
        || bootstrap_only.query_paths.len() < everything.query_paths.len());
    assert!(!bootstrap_only.query_paths.is_empty());
    for entry in &bootstrap_only.query_paths {
        assert_eq!(entry.metadata.tag, Some(json!("bootstrap")));
    }
}

#[tokio::test]
async fn snapshots_serialize_to_stable_json() {
    let executor = ada_executor();
    let client = client(executor.clone(), None);
    client
        .request("{ user(id: \"1\") { id name } }", awaited())
        .await
        .unwrap();

    let snapshot = client.export_caches(None).unwrap();
    let encoded = serde_json::to_string(&snapshot).unwrap();
    let decoded: cacheql::CacheSnapshot = serde_json::from_str(&encoded).unwrap();
    assert_eq!(decoded, snapshot);
    // Dehydrated metadata: directive strings, not parsed structures.
    assert!(encoded.contains("cache_control"));
    assert!(encoded.contains("max-age=600"));
}
