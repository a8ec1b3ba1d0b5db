// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Collaborator contracts and request-level result/error types
//!
//! Transport is not implemented here: the client consumes an [`Executor`]
//! for queries and mutations and a [`Subscriber`] for subscriptions, and
//! only their contracts matter to the core.

pub mod error;
pub mod executor;
pub mod result;

pub use error::ClientError;
pub use executor::{ExecuteOptions, Executor, ExecutorPayload, Subscriber};
pub use result::{CachePromise, RequestOutcome, RequestResult, ResultStream};
