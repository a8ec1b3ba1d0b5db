// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! In-flight request registries
//!
//! `active` maps a request fingerprint to its query string while a fetch is
//! in flight; `pending` holds the waiters that arrived meanwhile. Checking
//! and joining happen under one lock so a second caller can never slip
//! between the check and the mark. Completion drains both exactly once,
//! on success and on failure alike; waiters that gave up are skipped.

use std::collections::{BTreeMap, HashMap};

use log::debug;
use parking_lot::Mutex;
use serde_json::Value as JsonValue;
use tokio::sync::oneshot;

use crate::exec::ClientError;

use super::cacheability::CacheabilityMetadata;

/// The caller-visible outcome shared with coalesced waiters.
#[derive(Debug, Clone)]
pub struct SharedPayload {
    pub data: JsonValue,
    pub cache_metadata: BTreeMap<String, CacheabilityMetadata>,
    pub query_hash: String,
}

type Waiter = oneshot::Sender<Result<SharedPayload, ClientError>>;

/// What `begin` decided for this caller.
pub enum BeginOutcome {
    /// No fetch in flight: this caller owns the fetch.
    Active,
    /// A fetch is in flight: wait here for its outcome.
    Pending(oneshot::Receiver<Result<SharedPayload, ClientError>>),
}

#[derive(Default)]
struct Inner {
    active: HashMap<String, String>,
    pending: HashMap<String, Vec<Waiter>>,
}

/// Registry of in-flight requests, owned by the cache manager.
#[derive(Default)]
pub struct RequestRegistry {
    inner: Mutex<Inner>,
}

impl RequestRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Atomically either mark `hash` active or join its pending list.
    pub fn begin(&self, hash: &str, query: &str) -> BeginOutcome {
        let mut inner = self.inner.lock();
        if inner.active.contains_key(hash) {
            let (tx, rx) = oneshot::channel();
            inner.pending.entry(hash.to_string()).or_default().push(tx);
            debug!("joined pending list for '{}'", hash);
            BeginOutcome::Pending(rx)
        } else {
            inner.active.insert(hash.to_string(), query.to_string());
            BeginOutcome::Active
        }
    }

    /// Clear the active entry for `hash` and fan `outcome` out to every
    /// pending waiter. Returns how many waiters were notified.
    pub fn complete(&self, hash: &str, outcome: &Result<SharedPayload, ClientError>) -> usize {
        let waiters = {
            let mut inner = self.inner.lock();
            inner.active.remove(hash);
            inner.pending.remove(hash).unwrap_or_default()
        };
        let mut notified = 0;
        for waiter in waiters {
            // A closed receiver means the caller dropped its future; the
            // drain must not fail because of it.
            if waiter.send(outcome.clone()).is_ok() {
                notified += 1;
            }
        }
        if notified > 0 {
            debug!("drained {} pending waiters for '{}'", notified, hash);
        }
        notified
    }

    pub fn active_count(&self) -> usize {
        self.inner.lock().active.len()
    }

    pub fn pending_count(&self) -> usize {
        self.inner.lock().pending.values().map(Vec::len).sum()
    }
}
