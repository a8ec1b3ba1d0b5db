// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! The client orchestrator
//!
//! [`Client`] is the public entry point: it drives a request through
//! parse → analyse → fetch → resolve, coalesces duplicate in-flight
//! queries, and exposes the cache and observability surfaces.

pub mod client;
pub mod config;
pub mod events;

pub use client::Client;
pub use config::{ClientConfig, Mode, SubscriptionsConfig};
pub use events::{EventEmitter, EventKind, EventPayload, Listener, ListenerId};
