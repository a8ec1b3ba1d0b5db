// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Client configuration

use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value as JsonValue;

use crate::cache::{CacheConfig, DefaultCacheControls};
use crate::exec::executor::FieldResolverFn;
use crate::exec::ClientError;
use crate::schema::{introspection, sdl, Schema};

/// Executor strategy selection at construction time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mode {
    /// Remote execution over the configured transport.
    Default,
    /// Local execution against a server-side schema (root value and field
    /// resolvers are handed to the executor).
    Server,
}

/// Subscription transport settings, passed through to the subscriber.
#[derive(Debug, Clone, PartialEq)]
pub struct SubscriptionsConfig {
    pub address: String,
    pub opts: Option<JsonValue>,
}

/// The recognised client options.
#[derive(Clone)]
pub struct ClientConfig {
    /// Schema as SDL text. Exactly one of `schema` / `introspection` is
    /// required.
    pub schema: Option<String>,
    /// Schema as an introspection JSON payload.
    pub introspection: Option<JsonValue>,
    /// Endpoint for the remote executor.
    pub url: Option<String>,
    pub subscriptions: Option<SubscriptionsConfig>,
    /// Per-tier store sizing and TTLs.
    pub cache_config: CacheConfig,
    pub default_cache_controls: DefaultCacheControls,
    /// Per-type directives, e.g. `User -> "public, max-age=60"`.
    pub type_cache_controls: HashMap<String, String>,
    /// The field identifying entities. Defaults to `id`.
    pub resource_key: String,
    pub batch: bool,
    pub fetch_timeout: Option<Duration>,
    pub headers: HashMap<String, String>,
    pub field_resolver: Option<FieldResolverFn>,
    pub root_value: Option<JsonValue>,
    pub subscribe_field_resolver: Option<FieldResolverFn>,
    pub mode: Mode,
    /// When false, construction reuses a process-wide instance with the
    /// same identity instead of building a fresh one.
    pub new_instance: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            schema: None,
            introspection: None,
            url: None,
            subscriptions: None,
            cache_config: CacheConfig::default(),
            default_cache_controls: DefaultCacheControls::default(),
            type_cache_controls: HashMap::new(),
            resource_key: "id".to_string(),
            batch: false,
            fetch_timeout: Some(Duration::from_secs(5)),
            headers: HashMap::new(),
            field_resolver: None,
            root_value: None,
            subscribe_field_resolver: None,
            mode: Mode::Default,
            new_instance: true,
        }
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("schema", &self.schema.as_ref().map(|s| s.len()))
            .field("introspection", &self.introspection.is_some())
            .field("url", &self.url)
            .field("subscriptions", &self.subscriptions)
            .field("resource_key", &self.resource_key)
            .field("batch", &self.batch)
            .field("fetch_timeout", &self.fetch_timeout)
            .field("mode", &self.mode)
            .field("new_instance", &self.new_instance)
            .finish()
    }
}

impl ClientConfig {
    /// SDL shorthand.
    pub fn with_schema(schema: impl Into<String>) -> Self {
        Self {
            schema: Some(schema.into()),
            ..Default::default()
        }
    }

    /// Introspection shorthand.
    pub fn with_introspection(payload: JsonValue) -> Self {
        Self {
            introspection: Some(payload),
            ..Default::default()
        }
    }

    pub fn validate(&self) -> Result<(), ClientError> {
        match (&self.schema, &self.introspection) {
            (None, None) => Err(ClientError::Config(
                "one of `schema` or `introspection` is required".to_string(),
            )),
            (Some(_), Some(_)) => Err(ClientError::Config(
                "`schema` and `introspection` are mutually exclusive".to_string(),
            )),
            _ => Ok(()),
        }
    }

    pub fn build_schema(&self) -> Result<Schema, ClientError> {
        match (&self.schema, &self.introspection) {
            (Some(text), None) => Ok(sdl::parse_sdl(text)?),
            (None, Some(payload)) => Ok(introspection::from_introspection(payload)?),
            _ => Err(ClientError::Config(
                "one of `schema` or `introspection` is required".to_string(),
            )),
        }
    }

    /// Identity for the process-wide instance registry.
    pub(crate) fn instance_key(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.url.hash(&mut hasher);
        self.mode.hash(&mut hasher);
        self.resource_key.hash(&mut hasher);
        self.schema.hash(&mut hasher);
        self.introspection
            .as_ref()
            .map(|v| v.to_string())
            .hash(&mut hasher);
        hasher.finish()
    }
}

// The resolver hooks are shared function pointers; cloning the config
// clones the Arc, not the closure.
pub(crate) fn clone_resolver(resolver: &Option<FieldResolverFn>) -> Option<FieldResolverFn> {
    resolver.as_ref().map(Arc::clone)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exactly_one_schema_source_is_required() {
        assert!(ClientConfig::default().validate().is_err());
        assert!(ClientConfig::with_schema("type Query { ping: String }")
            .validate()
            .is_ok());

        let mut both = ClientConfig::with_schema("type Query { ping: String }");
        both.introspection = Some(serde_json::json!({}));
        assert!(both.validate().is_err());
    }

    #[test]
    fn instance_keys_track_identity() {
        let a = ClientConfig::with_schema("type Query { ping: String }");
        let b = ClientConfig::with_schema("type Query { ping: String }");
        assert_eq!(a.instance_key(), b.instance_key());

        let mut c = ClientConfig::with_schema("type Query { ping: String }");
        c.url = Some("https://api.example.com/graphql".to_string());
        assert_ne!(a.instance_key(), c.instance_key());
    }
}
