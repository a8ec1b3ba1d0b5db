// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Cache-Control directive parsing and validity
//!
//! A [`Cacheability`] is a parsed `Cache-Control` value plus the instant it
//! was stored. Parsing tolerates unknown directives and preserves them
//! through printing. `no-store` (and `no-cache`) force invalidity; a
//! directive without any `max-age` never expires; the
//! `stale-while-revalidate` window widens validity, and it is the
//! embedder's job to refresh within it.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// A parsed Cache-Control directive with validity predicate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cacheability {
    pub max_age: Option<u64>,
    pub s_max_age: Option<u64>,
    pub no_cache: bool,
    pub no_store: bool,
    pub public: bool,
    pub private: bool,
    pub stale_while_revalidate: Option<u64>,
    /// Unknown directives, preserved verbatim for printing.
    pub extensions: Vec<String>,
    pub etag: Option<String>,
    pub stored_at: DateTime<Utc>,
}

impl Cacheability {
    /// An empty directive stored now: no restrictions, no expiry.
    pub fn new() -> Self {
        Self {
            max_age: None,
            s_max_age: None,
            no_cache: false,
            no_store: false,
            public: false,
            private: false,
            stale_while_revalidate: None,
            extensions: Vec::new(),
            etag: None,
            stored_at: Utc::now(),
        }
    }

    /// Parse a Cache-Control header value, stamped with the current time.
    pub fn parse_cache_control(value: &str) -> Self {
        let mut parsed = Self::new();
        for raw in value.split(',') {
            let directive = raw.trim();
            if directive.is_empty() {
                continue;
            }
            let (name, argument) = match directive.split_once('=') {
                Some((name, argument)) => (name.trim(), Some(argument.trim())),
                None => (directive, None),
            };
            match (name.to_ascii_lowercase().as_str(), argument) {
                ("max-age", Some(seconds)) => parsed.max_age = seconds.parse().ok(),
                ("s-maxage", Some(seconds)) => parsed.s_max_age = seconds.parse().ok(),
                ("stale-while-revalidate", Some(seconds)) => {
                    parsed.stale_while_revalidate = seconds.parse().ok()
                }
                ("no-cache", None) => parsed.no_cache = true,
                ("no-store", None) => parsed.no_store = true,
                ("public", None) => parsed.public = true,
                ("private", None) => parsed.private = true,
                _ => parsed.extensions.push(directive.to_string()),
            }
        }
        parsed
    }

    /// Print the directive in canonical order, unknown directives last.
    pub fn print_cache_control(&self) -> String {
        let mut parts: Vec<String> = Vec::new();
        if self.public {
            parts.push("public".to_string());
        }
        if self.private {
            parts.push("private".to_string());
        }
        if self.no_cache {
            parts.push("no-cache".to_string());
        }
        if self.no_store {
            parts.push("no-store".to_string());
        }
        if let Some(seconds) = self.max_age {
            parts.push(format!("max-age={}", seconds));
        }
        if let Some(seconds) = self.s_max_age {
            parts.push(format!("s-maxage={}", seconds));
        }
        if let Some(seconds) = self.stale_while_revalidate {
            parts.push(format!("stale-while-revalidate={}", seconds));
        }
        parts.extend(self.extensions.iter().cloned());
        parts.join(", ")
    }

    /// Shared caches prefer `s-maxage` over `max-age`.
    pub fn effective_max_age(&self) -> Option<u64> {
        self.s_max_age.or(self.max_age)
    }

    /// Whether a value stored under this directive may still be served at
    /// `now`. The stale-while-revalidate window counts as valid.
    pub fn is_valid(&self, now: DateTime<Utc>) -> bool {
        if self.no_cache || self.no_store {
            return false;
        }
        match self.effective_max_age() {
            None => true,
            Some(max_age) => {
                let window = max_age + self.stale_while_revalidate.unwrap_or(0);
                self.stored_at + Duration::seconds(window as i64) >= now
            }
        }
    }

    /// Whether the value has outlived even the stale window and can be
    /// dropped by a store.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        match self.effective_max_age() {
            None => false,
            Some(max_age) => {
                let window = max_age + self.stale_while_revalidate.unwrap_or(0);
                self.stored_at + Duration::seconds(window as i64) < now
            }
        }
    }

    /// Combine two directives: minimum TTLs, union of the restrictive
    /// flags, the older storage instant.
    pub fn merge(&self, other: &Self) -> Self {
        let mut extensions = self.extensions.clone();
        for ext in &other.extensions {
            if !extensions.contains(ext) {
                extensions.push(ext.clone());
            }
        }
        Self {
            max_age: min_opt(self.max_age, other.max_age),
            s_max_age: min_opt(self.s_max_age, other.s_max_age),
            no_cache: self.no_cache || other.no_cache,
            no_store: self.no_store || other.no_store,
            public: self.public && other.public,
            private: self.private || other.private,
            stale_while_revalidate: min_opt(
                self.stale_while_revalidate,
                other.stale_while_revalidate,
            ),
            extensions,
            etag: None,
            stored_at: self.stored_at.min(other.stored_at),
        }
    }

    /// The metadata triple surfaced on results.
    pub fn metadata(&self) -> CacheabilityMetadata {
        CacheabilityMetadata {
            cache_control: self.print_cache_control(),
            etag: self.etag.clone(),
            ttl: self.effective_max_age(),
        }
    }

    /// Directive-string form for snapshots.
    pub fn dehydrate(&self) -> DehydratedCacheability {
        DehydratedCacheability {
            cache_control: self.print_cache_control(),
            etag: self.etag.clone(),
            stored_at: self.stored_at,
        }
    }

    pub fn rehydrate(dehydrated: &DehydratedCacheability) -> Self {
        let mut parsed = Self::parse_cache_control(&dehydrated.cache_control);
        parsed.etag = dehydrated.etag.clone();
        parsed.stored_at = dehydrated.stored_at;
        parsed
    }
}

impl Default for Cacheability {
    fn default() -> Self {
        Self::new()
    }
}

fn min_opt(a: Option<u64>, b: Option<u64>) -> Option<u64> {
    match (a, b) {
        (Some(a), Some(b)) => Some(a.min(b)),
        (value, None) | (None, value) => value,
    }
}

/// Cacheability as surfaced to callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheabilityMetadata {
    pub cache_control: String,
    pub etag: Option<String>,
    pub ttl: Option<u64>,
}

/// Cacheability as persisted in snapshots: the directive string, not the
/// parsed structure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DehydratedCacheability {
    pub cache_control: String,
    pub etag: Option<String>,
    pub stored_at: DateTime<Utc>,
}
