// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Per-path cacheability for a response
//!
//! Maps cache-path strings to [`Cacheability`]. The reserved path `query`
//! carries the whole-response directive. Paths absent from the map inherit
//! from their nearest present ancestor; the effective directive at a path
//! is the merge (minimum TTL, restrictive union) of every present ancestor
//! and the path's own entry.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::cacheability::{Cacheability, CacheabilityMetadata, DehydratedCacheability};

/// Reserved path carrying the whole-response directive.
pub const QUERY_PATH: &str = "query";

/// Mapping from cache path to cacheability.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CacheMetadata {
    entries: BTreeMap<String, Cacheability>,
}

/// Snapshot form: directive strings instead of parsed structures.
pub type DehydratedCacheMetadata = BTreeMap<String, DehydratedCacheability>;

impl CacheMetadata {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the directive observed at `path`. A repeated path merges with
    /// what is already recorded.
    pub fn set(&mut self, path: impl Into<String>, cacheability: Cacheability) {
        let path = path.into();
        match self.entries.get(&path) {
            Some(existing) => {
                let merged = existing.merge(&cacheability);
                self.entries.insert(path, merged);
            }
            None => {
                self.entries.insert(path, cacheability);
            }
        }
    }

    pub fn get(&self, path: &str) -> Option<&Cacheability> {
        self.entries.get(path)
    }

    /// The whole-response directive, when recorded.
    pub fn query(&self) -> Option<&Cacheability> {
        self.entries.get(QUERY_PATH)
    }

    /// Effective cacheability at `path`: the merge of the query-level
    /// directive, every recorded ancestor and the path itself. `None` when
    /// nothing on the ancestor chain is recorded.
    ///
    /// Ancestry is decided by prefix at a segment boundary (`.` or `[`), so
    /// dots inside serialised argument values cannot split a segment.
    pub fn effective(&self, path: &str) -> Option<Cacheability> {
        let mut combined: Option<Cacheability> = self.query().cloned();
        for (candidate, cacheability) in &self.entries {
            if candidate == QUERY_PATH {
                continue;
            }
            if is_ancestor_or_self(candidate, path) {
                combined = Some(match combined {
                    Some(current) => current.merge(cacheability),
                    None => cacheability.clone(),
                });
            }
        }
        combined
    }

    /// Merge another metadata map into this one, path by path.
    pub fn merge(&mut self, other: &CacheMetadata) {
        for (path, cacheability) in &other.entries {
            self.set(path.clone(), cacheability.clone());
        }
    }

    /// Fold every recorded directive into one: the weakest-TTL summary the
    /// response tier stores against the whole response.
    pub fn combined(&self) -> Option<Cacheability> {
        let mut iter = self.entries.values();
        let first = iter.next()?.clone();
        Some(iter.fold(first, |acc, c| acc.merge(c)))
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Cacheability)> {
        self.entries.iter()
    }

    pub fn dehydrate(&self) -> DehydratedCacheMetadata {
        self.entries
            .iter()
            .map(|(path, cacheability)| (path.clone(), cacheability.dehydrate()))
            .collect()
    }

    pub fn rehydrate(dehydrated: &DehydratedCacheMetadata) -> Self {
        Self {
            entries: dehydrated
                .iter()
                .map(|(path, d)| (path.clone(), Cacheability::rehydrate(d)))
                .collect(),
        }
    }

    /// The caller-facing form: directive string, etag and TTL per path.
    pub fn to_metadata_map(&self) -> BTreeMap<String, CacheabilityMetadata> {
        self.entries
            .iter()
            .map(|(path, cacheability)| (path.clone(), cacheability.metadata()))
            .collect()
    }
}

fn is_ancestor_or_self(candidate: &str, path: &str) -> bool {
    if candidate == path {
        return true;
    }
    match path.as_bytes().get(candidate.len()) {
        Some(b'.') | Some(b'[') => path.starts_with(candidate),
        _ => false,
    }
}
