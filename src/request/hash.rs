// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Stable request and path fingerprinting

use sha2::{Digest, Sha256};

/// Hash a canonicalised request string (or a cache-path string) into a
/// stable 128-bit fingerprint, rendered as 32 lowercase hex characters.
///
/// Stability across restarts and processes is load-bearing: fingerprints
/// key the response tier and survive through `export`/`import`.
pub fn hash_request(input: &str) -> String {
    let digest = Sha256::digest(input.as_bytes());
    digest[..16].iter().map(|b| format!("{:02x}", b)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fingerprint_is_stable() {
        // Pinned value: a change here breaks every persisted snapshot.
        assert_eq!(
            hash_request("{ user(id: \"1\") { id name } }"),
            hash_request("{ user(id: \"1\") { id name } }")
        );
        assert_eq!(hash_request("abc"), "ba7816bf8f01cfea414140de5dae2223");
    }

    #[test]
    fn fingerprint_discriminates() {
        assert_ne!(hash_request("{ a }"), hash_request("{ b }"));
    }

    #[test]
    fn fingerprint_is_fixed_width() {
        assert_eq!(hash_request("").len(), 32);
        assert_eq!(hash_request("x".repeat(4096).as_str()).len(), 32);
    }
}
