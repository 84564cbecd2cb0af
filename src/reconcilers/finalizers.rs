// SPDX-License-Identifier: Apache-2.0

//! Generic finalizer management for Kubernetes resources.
//!
//! Typed-CRD helpers (`ensure_finalizer`/`ensure_cluster_finalizer` and
//! friends) cover the engine's own fixed kinds (`Operation`,
//! `Composition`). XR and Claim kinds are user-defined and represented as
//! [`kube::api::DynamicObject`], so they get their own `*_dynamic` variants
//! below that take an [`ApiResource`] instead of relying on a static
//! `Resource` impl.

use anyhow::Result;
use kube::api::{ApiResource, DynamicObject, Patch, PatchParams};
use kube::core::{ClusterResourceScope, NamespaceResourceScope};
use kube::{Api, Client, Resource, ResourceExt};
use serde_json::json;
use tracing::info;

/// Trait for resources that require cleanup operations when being deleted.
#[async_trait::async_trait]
pub trait FinalizerCleanup: Resource + ResourceExt + Clone {
    /// Perform cleanup operations before the finalizer is removed.
    ///
    /// # Errors
    /// If this returns an error, the finalizer is left in place and
    /// deletion is blocked until cleanup succeeds on a later reconcile.
    async fn cleanup(&self, client: &Client) -> Result<()>;
}

/// Add a finalizer to a namespaced resource if not already present.
///
/// # Errors
/// Returns an error if the API patch operation fails.
pub async fn ensure_finalizer<T>(client: &Client, resource: &T, finalizer: &str) -> Result<()>
where
    T: Resource<DynamicType = (), Scope = NamespaceResourceScope>
        + ResourceExt
        + Clone
        + std::fmt::Debug
        + serde::Serialize
        + for<'de> serde::Deserialize<'de>,
{
    let namespace = resource.namespace().unwrap_or_default();
    let name = resource.name_any();

    if resource.meta().finalizers.as_ref().is_none_or(|f| !f.contains(&finalizer.to_string())) {
        info!("Adding finalizer {} to {}/{} {}", finalizer, namespace, name, T::kind(&()));

        let mut finalizers = resource.meta().finalizers.clone().unwrap_or_default();
        finalizers.push(finalizer.to_string());

        let api: Api<T> = Api::namespaced(client.clone(), &namespace);
        let patch = json!({ "metadata": { "finalizers": finalizers } });
        api.patch(&name, &PatchParams::default(), &Patch::Merge(&patch)).await?;
    }

    Ok(())
}

/// Remove a finalizer from a namespaced resource.
///
/// # Errors
/// Returns an error if the API patch operation fails.
pub async fn remove_finalizer<T>(client: &Client, resource: &T, finalizer: &str) -> Result<()>
where
    T: Resource<DynamicType = (), Scope = NamespaceResourceScope>
        + ResourceExt
        + Clone
        + std::fmt::Debug
        + serde::Serialize
        + for<'de> serde::Deserialize<'de>,
{
    let namespace = resource.namespace().unwrap_or_default();
    let name = resource.name_any();

    if resource.meta().finalizers.as_ref().is_some_and(|f| f.contains(&finalizer.to_string())) {
        info!("Removing finalizer {} from {}/{} {}", finalizer, namespace, name, T::kind(&()));

        let mut finalizers = resource.meta().finalizers.clone().unwrap_or_default();
        finalizers.retain(|f| f != finalizer);

        let api: Api<T> = Api::namespaced(client.clone(), &namespace);
        let patch = json!({ "metadata": { "finalizers": finalizers } });
        api.patch(&name, &PatchParams::default(), &Patch::Merge(&patch)).await?;
    }

    Ok(())
}

/// Run `resource.cleanup()` then remove `finalizer`, if present.
///
/// # Errors
/// Returns an error if cleanup or finalizer removal fails; the finalizer is
/// left in place in that case.
pub async fn handle_deletion<T>(client: &Client, resource: &T, finalizer: &str) -> Result<()>
where
    T: Resource<DynamicType = (), Scope = NamespaceResourceScope>
        + ResourceExt
        + FinalizerCleanup
        + Clone
        + std::fmt::Debug
        + serde::Serialize
        + for<'de> serde::Deserialize<'de>,
{
    let namespace = resource.namespace().unwrap_or_default();
    let name = resource.name_any();
    info!("{} {}/{} is being deleted", T::kind(&()), namespace, name);

    if resource.meta().finalizers.as_ref().is_some_and(|f| f.contains(&finalizer.to_string())) {
        resource.cleanup(client).await?;
        remove_finalizer(client, resource, finalizer).await?;
    }

    Ok(())
}

/// Add a finalizer to a cluster-scoped resource if not already present.
///
/// # Errors
/// Returns an error if the API patch operation fails.
pub async fn ensure_cluster_finalizer<T>(client: &Client, resource: &T, finalizer: &str) -> Result<()>
where
    T: Resource<DynamicType = (), Scope = ClusterResourceScope>
        + ResourceExt
        + Clone
        + std::fmt::Debug
        + serde::Serialize
        + for<'de> serde::Deserialize<'de>,
{
    let name = resource.name_any();

    if resource.meta().finalizers.as_ref().is_none_or(|f| !f.contains(&finalizer.to_string())) {
        info!("Adding finalizer {} to {} {}", finalizer, T::kind(&()), name);

        let mut finalizers = resource.meta().finalizers.clone().unwrap_or_default();
        finalizers.push(finalizer.to_string());

        let api: Api<T> = Api::all(client.clone());
        let patch = json!({ "metadata": { "finalizers": finalizers } });
        api.patch(&name, &PatchParams::default(), &Patch::Merge(&patch)).await?;
    }

    Ok(())
}

/// Remove a finalizer from a cluster-scoped resource.
///
/// # Errors
/// Returns an error if the API patch operation fails.
pub async fn remove_cluster_finalizer<T>(client: &Client, resource: &T, finalizer: &str) -> Result<()>
where
    T: Resource<DynamicType = (), Scope = ClusterResourceScope>
        + ResourceExt
        + Clone
        + std::fmt::Debug
        + serde::Serialize
        + for<'de> serde::Deserialize<'de>,
{
    let name = resource.name_any();

    if resource.meta().finalizers.as_ref().is_some_and(|f| f.contains(&finalizer.to_string())) {
        info!("Removing finalizer {} from {} {}", finalizer, T::kind(&()), name);

        let mut finalizers = resource.meta().finalizers.clone().unwrap_or_default();
        finalizers.retain(|f| f != finalizer);

        let api: Api<T> = Api::all(client.clone());
        let patch = json!({ "metadata": { "finalizers": finalizers } });
        api.patch(&name, &PatchParams::default(), &Patch::Merge(&patch)).await?;
    }

    Ok(())
}

/// Run `resource.cleanup()` then remove `finalizer` on a cluster-scoped
/// resource, if present.
///
/// # Errors
/// Returns an error if cleanup or finalizer removal fails.
pub async fn handle_cluster_deletion<T>(client: &Client, resource: &T, finalizer: &str) -> Result<()>
where
    T: Resource<DynamicType = (), Scope = ClusterResourceScope>
        + ResourceExt
        + FinalizerCleanup
        + Clone
        + std::fmt::Debug
        + serde::Serialize
        + for<'de> serde::Deserialize<'de>,
{
    let name = resource.name_any();
    info!("{} {} is being deleted", T::kind(&()), name);

    if resource.meta().finalizers.as_ref().is_some_and(|f| f.contains(&finalizer.to_string())) {
        resource.cleanup(client).await?;
        remove_cluster_finalizer(client, resource, finalizer).await?;
    }

    Ok(())
}

/// Same contract as [`ensure_finalizer`], for a [`DynamicObject`] whose kind
/// is only known at runtime (XR/Claim). `namespace` is `None` for a
/// cluster-scoped XR.
///
/// # Errors
/// Returns an error if the API patch operation fails.
pub async fn ensure_dynamic_finalizer(
    client: &Client,
    resource: &DynamicObject,
    api_resource: &ApiResource,
    namespace: Option<&str>,
    finalizer: &str,
) -> Result<()> {
    let name = resource.name_any();

    if resource.meta().finalizers.as_ref().is_none_or(|f| !f.contains(&finalizer.to_string())) {
        info!("Adding finalizer {} to {} {}", finalizer, api_resource.kind, name);

        let mut finalizers = resource.meta().finalizers.clone().unwrap_or_default();
        finalizers.push(finalizer.to_string());

        let api = dynamic_api(client, api_resource, namespace);
        let patch = json!({ "metadata": { "finalizers": finalizers } });
        api.patch(&name, &PatchParams::default(), &Patch::Merge(&patch)).await?;
    }

    Ok(())
}

/// Same contract as [`remove_finalizer`], for a [`DynamicObject`].
///
/// # Errors
/// Returns an error if the API patch operation fails.
pub async fn remove_dynamic_finalizer(
    client: &Client,
    resource: &DynamicObject,
    api_resource: &ApiResource,
    namespace: Option<&str>,
    finalizer: &str,
) -> Result<()> {
    let name = resource.name_any();

    if resource.meta().finalizers.as_ref().is_some_and(|f| f.contains(&finalizer.to_string())) {
        info!("Removing finalizer {} from {} {}", finalizer, api_resource.kind, name);

        let mut finalizers = resource.meta().finalizers.clone().unwrap_or_default();
        finalizers.retain(|f| f != finalizer);

        let api = dynamic_api(client, api_resource, namespace);
        let patch = json!({ "metadata": { "finalizers": finalizers } });
        api.patch(&name, &PatchParams::default(), &Patch::Merge(&patch)).await?;
    }

    Ok(())
}

fn dynamic_api(client: &Client, api_resource: &ApiResource, namespace: Option<&str>) -> Api<DynamicObject> {
    match namespace {
        Some(ns) => Api::namespaced_with(client.clone(), ns, api_resource),
        None => Api::all_with(client.clone(), api_resource),
    }
}

#[cfg(test)]
#[path = "finalizers_tests.rs"]
mod finalizers_tests;
