// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Cache configuration and presets

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for one cache tier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TierConfig {
    /// Maximum number of entries before LRU eviction.
    pub max_entries: usize,
    /// Fallback TTL applied when a write carries no max-age of its own.
    pub default_ttl: Option<Duration>,
}

/// The directives applied when a response carries no `Cache-Control` of
/// its own, per operation kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DefaultCacheControls {
    pub query: String,
    pub mutation: String,
    pub subscription: String,
}

impl Default for DefaultCacheControls {
    fn default() -> Self {
        Self {
            query: "public, max-age=300".to_string(),
            mutation: "max-age=0, no-cache, no-store".to_string(),
            subscription: "max-age=0, no-cache, no-store".to_string(),
        }
    }
}

/// Configuration for the three tiers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Disabling caching turns every analysis into a full miss and skips
    /// all tier writes.
    pub enabled: bool,
    pub responses: TierConfig,
    pub query_paths: TierConfig,
    pub entities: TierConfig,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            responses: TierConfig {
                max_entries: 1000,
                default_ttl: Some(Duration::from_secs(300)),
            },
            // Path records are small and numerous: one per field position.
            query_paths: TierConfig {
                max_entries: 50_000,
                default_ttl: Some(Duration::from_secs(300)),
            },
            entities: TierConfig {
                max_entries: 10_000,
                default_ttl: Some(Duration::from_secs(300)),
            },
        }
    }
}

impl CacheConfig {
    /// Larger tiers and longer TTLs for read-heavy embedders.
    pub fn read_optimized() -> Self {
        Self {
            responses: TierConfig {
                max_entries: 5000,
                default_ttl: Some(Duration::from_secs(1800)),
            },
            query_paths: TierConfig {
                max_entries: 200_000,
                default_ttl: Some(Duration::from_secs(1800)),
            },
            entities: TierConfig {
                max_entries: 50_000,
                default_ttl: Some(Duration::from_secs(1800)),
            },
            ..Self::default()
        }
    }

    /// Small tiers for memory-constrained environments.
    pub fn memory_constrained() -> Self {
        Self {
            responses: TierConfig {
                max_entries: 100,
                default_ttl: Some(Duration::from_secs(120)),
            },
            query_paths: TierConfig {
                max_entries: 5000,
                default_ttl: Some(Duration::from_secs(120)),
            },
            entities: TierConfig {
                max_entries: 1000,
                default_ttl: Some(Duration::from_secs(120)),
            },
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if !self.enabled {
            return Ok(());
        }
        if self.responses.max_entries == 0
            || self.query_paths.max_entries == 0
            || self.entities.max_entries == 0
        {
            return Err("cache tiers must have max_entries > 0".to_string());
        }
        Ok(())
    }
}
