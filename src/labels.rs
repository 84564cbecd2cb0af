// SPDX-License-Identifier: Apache-2.0

//! Name-suffix generation and child labeling helpers.
//!
//! Composite resources need a stable, short, DNS-label-safe suffix for
//! naming their composed children and, when created by the Claim
//! Reconciler, for their own name (spec.md §4.3.1, §4.4 "Unbound" state).
//! This mirrors the suffix the Kubernetes API server appends for
//! `generateName`, but is computed client-side so the Composite Reconciler
//! can record it once in `resourceRefs` and reuse it deterministically on
//! every following tick (spec.md I1, stable indexing).

use rand::Rng;

const SUFFIX_ALPHABET: &[u8] = b"bcdfghjklmnpqrstvwxz0123456789";
const SUFFIX_LEN: usize = 5;

/// Generate a random, lowercase, DNS-label-safe suffix such as `"x7k2q"`.
///
/// Excludes vowels and characters that are easy to misread (matching the
/// Kubernetes API server's own `generateName` alphabet), so the concatenated
/// `<name>-<suffix>` reads cleanly in `kubectl get`.
#[must_use]
pub fn generate_suffix() -> String {
    let mut rng = rand::rng();
    (0..SUFFIX_LEN)
        .map(|_| {
            let idx = rng.random_range(0..SUFFIX_ALPHABET.len());
            SUFFIX_ALPHABET[idx] as char
        })
        .collect()
}

/// Build a composed child's name from the owning composite's name, the
/// composite's stable suffix, and the template name: `<xr>-<suffix>-<template>`
/// truncated to stay within the 63-character DNS label limit.
#[must_use]
pub fn child_name(composite_name: &str, suffix: &str, template_name: &str) -> String {
    let mut name = format!("{composite_name}-{suffix}-{template_name}");
    if name.len() > 63 {
        name.truncate(63);
        // Never leave a trailing '-', which is not a legal label character.
        while name.ends_with('-') {
            name.pop();
        }
    }
    name
}

#[cfg(test)]
#[path = "labels_tests.rs"]
mod tests;
