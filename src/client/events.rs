// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Observer callbacks at the request pipeline's suspension points

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use serde_json::Value as JsonValue;
use uuid::Uuid;

use crate::ast::OperationKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Request,
    Fetch,
    Subscription,
    CacheHit,
    CacheMiss,
    Error,
}

#[derive(Debug, Clone)]
pub struct EventPayload {
    pub kind: EventKind,
    pub request_id: Uuid,
    pub operation: Option<OperationKind>,
    pub query_hash: Option<String>,
    pub detail: JsonValue,
}

pub type Listener = Arc<dyn Fn(&EventPayload) + Send + Sync>;

/// Handle returned by `on`, accepted by `off`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListenerId(u64);

/// Listener registry. Emission is synchronous and must stay cheap;
/// listeners that need to do work should hand off.
#[derive(Default)]
pub struct EventEmitter {
    listeners: RwLock<Vec<(ListenerId, EventKind, Listener)>>,
    next_id: AtomicU64,
}

impl EventEmitter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on(&self, kind: EventKind, listener: Listener) -> ListenerId {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.listeners.write().push((id, kind, listener));
        id
    }

    pub fn off(&self, id: ListenerId) -> bool {
        let mut listeners = self.listeners.write();
        let before = listeners.len();
        listeners.retain(|(listener_id, _, _)| *listener_id != id);
        listeners.len() != before
    }

    pub fn emit(&self, payload: EventPayload) {
        let listeners = self.listeners.read();
        for (_, kind, listener) in listeners.iter() {
            if *kind == payload.kind {
                listener(&payload);
            }
        }
    }
}
