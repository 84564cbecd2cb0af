// SPDX-License-Identifier: Apache-2.0

//! Shared context for all three controllers, with reflector stores for the
//! engine's own CRDs (spec.md §5: "fully event-driven plus periodic drift
//! correction").
//!
//! Every controller receives an `Arc<Context>` carrying the Kubernetes
//! client, reflector stores for `Composition`/`CompositionRevision`/
//! `Function`, and the metrics registry. Stores give O(1) in-memory lookups
//! for composition selection without hitting the API server on every
//! reconcile.

use std::sync::Arc;

use kube::runtime::reflector::Store;
use kube::{Client, ResourceExt};

use crate::crd::{Composition, CompositionRevision, Function, LabelSelector};

/// Shared context passed to all three reconcilers.
#[derive(Clone)]
pub struct Context {
    /// Kubernetes client for API operations.
    pub client: Client,
    /// Reflector stores for the engine's own CRDs.
    pub stores: Stores,
    /// Metrics registry for observability.
    pub metrics: Metrics,
}

/// Reflector stores for `Composition`, `CompositionRevision`, and
/// `Function`, populated by dedicated reflector tasks started alongside
/// each controller (see `main.rs`).
#[derive(Clone)]
pub struct Stores {
    pub compositions: Store<Composition>,
    pub composition_revisions: Store<CompositionRevision>,
    pub functions: Store<Function>,
}

impl Stores {
    /// All `Composition`s whose `compositeTypeRef` matches `api_version`/`kind`.
    #[must_use]
    pub fn compositions_for_xr_kind(&self, api_version: &str, kind: &str) -> Vec<Arc<Composition>> {
        self.compositions
            .state()
            .into_iter()
            .filter(|composition| {
                composition.spec.0.composite_type_ref.api_version == api_version
                    && composition.spec.0.composite_type_ref.kind == kind
            })
            .collect()
    }

    /// All `Composition`s matching a label selector, further filtered by
    /// [`compositions_for_xr_kind`](Self::compositions_for_xr_kind).
    #[must_use]
    pub fn compositions_matching_selector(
        &self,
        selector: &LabelSelector,
        api_version: &str,
        kind: &str,
    ) -> Vec<Arc<Composition>> {
        self.compositions_for_xr_kind(api_version, kind)
            .into_iter()
            .filter(|composition| selector.matches(composition.labels()))
            .collect()
    }

    /// A `Composition` by name, read from the store rather than the API.
    #[must_use]
    pub fn get_composition(&self, name: &str) -> Option<Arc<Composition>> {
        self.compositions.state().into_iter().find(|c| c.name_any() == name)
    }

    /// All revisions of a named `Composition`, in no particular order — the
    /// caller sorts by `spec.revision` as needed (spec.md §4.2: highest
    /// `revision` wins when a composite has no explicit revision pin).
    #[must_use]
    pub fn revisions_of(&self, composition_name: &str) -> Vec<Arc<CompositionRevision>> {
        self.composition_revisions
            .state()
            .into_iter()
            .filter(|revision| revision.spec.composition_name == composition_name)
            .collect()
    }

    /// A `Function` by name, read from the store.
    #[must_use]
    pub fn get_function(&self, name: &str) -> Option<Arc<Function>> {
        self.functions.state().into_iter().find(|f| f.name_any() == name)
    }
}

/// Observability handle. Every recorded event is delegated to the global
/// registry in [`crate::metrics`]; this struct exists so reconcilers take
/// `ctx.metrics` rather than importing the metrics module's free functions
/// directly, mirroring the teacher's context-carried-metrics convention.
#[derive(Clone, Default)]
pub struct Metrics;

impl Metrics {
    pub fn record_success(&self, resource_type: &str, duration: std::time::Duration) {
        crate::metrics::record_reconciliation_success(resource_type, duration);
    }

    pub fn record_error(&self, resource_type: &str, duration: std::time::Duration) {
        crate::metrics::record_reconciliation_error(resource_type, duration);
    }

    pub fn record_requeue(&self, resource_type: &str, reason: &str) {
        crate::metrics::record_reconciliation_requeue(resource_type, reason);
    }
}

#[cfg(test)]
#[path = "context_tests.rs"]
mod context_tests;
