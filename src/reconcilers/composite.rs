// SPDX-License-Identifier: Apache-2.0

//! Composite Reconciler (spec.md §4.3, "core of the core"): converges an
//! XR's status so that either `Synced=True,Ready=True` with a published
//! connection secret, or a condition describes why not.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use kube::api::{Api, ApiResource, DynamicObject, ListParams, ObjectMeta, Patch as KubePatch, PatchParams, TypeMeta};
use kube::core::GroupVersionKind;
use kube::runtime::controller::Action;
use kube::{Resource, ResourceExt};
use serde_json::{json, Value};
use tracing::{info, warn};

use crate::associator;
use crate::connection;
use crate::constants::{
    ANNOTATION_COMPOSITION_RESOURCE_NAME, CONDITION_READY, CONDITION_SYNCED, FINALIZER_COMPOSITE,
    LABEL_COMPOSITE, REQUEUE_DRIFT_SECS, REQUEUE_TRANSIENT_SECS, STATUS_FALSE, STATUS_TRUE,
};
use crate::crd::{ComposedTemplate, Composition, CompositionRevision, CompositionSpec, Condition};
use crate::errors::EngineError;
use crate::manager::CompositeCtx;
use crate::owner;
use crate::patch;
use crate::readiness;
use crate::reconcilers::finalizers;
use crate::reconcilers::operation::run_pipeline;
use crate::reconcilers::status::{condition_changed, create_condition, find_condition};
use crate::render;
use crate::resolver::{self, ResolveError, Resolved};
use crate::secrets;
use crate::xr::{Composite, ResourceRef};

const REASON_CREATING: &str = "Creating";
const REASON_SUCCESS: &str = "Available";

/// Reconcile one XR (spec.md §4.3).
///
/// # Errors
/// Returns [`EngineError`] on any failure the caller's `error_policy` should
/// schedule a backoff for; per-template render failures are not returned
/// here, they are recorded as part of the status write (spec.md §4.3.3:
/// "never aborts the whole reconcile").
pub async fn reconcile_composite(
    xr: Arc<DynamicObject>,
    ctx: Arc<CompositeCtx>,
) -> Result<Action, EngineError> {
    if xr.meta().deletion_timestamp.is_some() {
        return delete_composite(xr, ctx).await;
    }

    let namespace = xr.namespace();
    finalizers::ensure_dynamic_finalizer(
        &ctx.engine.client,
        xr.as_ref(),
        &ctx.xr,
        namespace.as_deref(),
        FINALIZER_COMPOSITE,
    )
    .await
    .map_err(EngineError::Other)?;

    let mut composite = Composite::new(xr.as_ref().clone());

    // §4.2: select the composition this tick renders against.
    let compositions: Vec<Composition> =
        ctx.engine.stores.compositions.state().iter().map(|c| c.as_ref().clone()).collect();
    let revisions: Vec<CompositionRevision> =
        ctx.engine.stores.composition_revisions.state().iter().map(|r| r.as_ref().clone()).collect();

    let resolved = match resolver::resolve(&composite, &compositions, &revisions) {
        Ok(resolved) => resolved,
        Err(err) => return selection_failed(&ctx, &composite, namespace.as_deref(), err).await,
    };

    let (composition_name, composition_spec) = match &resolved {
        Resolved::Revision(revision) => (revision.spec.composition_name.clone(), revision.spec.spec.clone()),
        Resolved::Live(composition) => (composition.name_any(), composition.spec.0.clone()),
    };

    // §4.3.1: record the selection so later ticks are stable even if labels change.
    if composite.composition_ref().is_none() {
        composite.set_composition_ref(&composition_name);
        if let Resolved::Live(_) = &resolved {
            let mut revisions_of = ctx.engine.stores.revisions_of(&composition_name);
            revisions_of.sort_by_key(|r| r.spec.revision);
            if let Some(latest) = revisions_of.last() {
                composite.set_composition_revision_ref(&latest.name_any());
            }
        }
        persist_spec(&ctx, &composite, namespace.as_deref()).await?;
        return Ok(Action::requeue(Duration::ZERO));
    }

    configure_chain(&mut composite, &composition_spec);

    let result = if composition_spec.is_pipeline() {
        reconcile_pipeline_mode(&ctx, &mut composite, namespace.as_deref(), &composition_spec).await
    } else {
        reconcile_legacy_mode(&ctx, &mut composite, namespace.as_deref(), &composition_spec).await
    };

    match result {
        Ok(requeue) => Ok(Action::requeue(requeue)),
        Err(err) => Err(err),
    }
}

/// Configuration chain (spec.md §4.3.1): ensure a stable child-name suffix,
/// then propagate fields the composition's base object declares but the XR
/// leaves unset.
///
/// Open-question resolution (spec.md §9, "propagate fields declared by the
/// composition's base object"): for a legacy composition, each template's
/// `base.spec` is treated as a source of defaults — any top-level key absent
/// from the XR's own spec is copied in once. Pipeline-mode compositions have
/// no static base object to draw defaults from, so this is a no-op for them.
fn configure_chain(composite: &mut Composite, composition_spec: &CompositionSpec) {
    if composite.child_suffix().is_none() {
        composite.set_child_suffix(&associator::new_child_suffix());
    }

    let Some(templates) = &composition_spec.resources else { return };
    let current_spec = composite.inner().data.get("spec").cloned().unwrap_or_else(|| json!({}));
    let Some(current_spec) = current_spec.as_object() else { return };

    for template in templates {
        let Some(base_spec) = template.base.get("spec").and_then(Value::as_object) else { continue };
        for (key, value) in base_spec {
            if !current_spec.contains_key(key) {
                composite.set_spec_field_pub(key, value.clone());
            }
        }
    }
}

async fn selection_failed(
    ctx: &CompositeCtx,
    composite: &Composite,
    namespace: Option<&str>,
    err: ResolveError,
) -> Result<Action, EngineError> {
    let engine_err = match &err {
        ResolveError::NotFound { .. } => EngineError::NotFoundRelated(err.to_string()),
        ResolveError::Invalid { reason } => EngineError::Validation(reason.clone()),
        ResolveError::MultipleMatch { .. } | ResolveError::NoMatch => {
            EngineError::SelectionFailed(err.to_string())
        }
    };
    let condition = create_condition(CONDITION_SYNCED, STATUS_FALSE, engine_err.condition_reason(), &engine_err.to_string());
    write_condition_if_changed(ctx, composite, namespace, condition).await?;
    match engine_err.requeue_after() {
        Some(duration) => Ok(Action::requeue(duration)),
        None => Err(engine_err),
    }
}

/// Legacy (template-list) composition flow: §4.3.2 through §4.3.5.
async fn reconcile_legacy_mode(
    ctx: &CompositeCtx,
    composite: &mut Composite,
    namespace: Option<&str>,
    composition_spec: &CompositionSpec,
) -> Result<Duration, EngineError> {
    let templates = composition_spec.resources.clone().unwrap_or_default();
    let inlined = inline_all(&templates, composition_spec)?;

    let observed_children = fetch_observed_children(ctx, composite, namespace).await?;
    let (associations, orphans) = associator::associate(
        &composite.name(),
        &composite.child_suffix().unwrap_or_default(),
        &inlined,
        &composite.resource_refs(),
        &observed_children,
    );

    // §4.3.4: persist refs before any apply, so partial failure never leaks
    // un-referenced children.
    let mut refs = Vec::with_capacity(associations.len());
    let mut render_failures = Vec::new();
    let mut rendered = Vec::with_capacity(associations.len());

    let xr_uid = composite.uid().unwrap_or_default();
    let xr_api_version = composite.inner().types.as_ref().map(|t| t.api_version.clone()).unwrap_or_default();
    let xr_kind = composite.inner().types.as_ref().map(|t| t.kind.clone()).unwrap_or_default();
    let block_owner_deletion =
        matches!(composite.composite_delete_policy(), crate::claim::CompositeDeletePolicy::Foreground);
    let composite_spec_value = composite.inner().data.get("spec").cloned().unwrap_or_else(|| json!({}));

    for association in &associations {
        let child_name = association.child_name().to_string();
        match render::render(
            &association.template,
            &child_name,
            &composite_spec_value,
            &composite.name(),
            &xr_api_version,
            &xr_kind,
            &xr_uid,
            block_owner_deletion,
        ) {
            Ok(desired) => {
                let api_version =
                    desired.types.as_ref().map(|t| t.api_version.clone()).unwrap_or_default();
                let kind = desired.types.as_ref().map(|t| t.kind.clone()).unwrap_or_default();
                refs.push(ResourceRef { api_version, kind, name: child_name });
                rendered.push((association.template.clone(), desired));
            }
            Err(err) => {
                warn!(template = %association.template.name, %err, "composite template failed to render");
                let api_version =
                    association.template.base.get("apiVersion").and_then(Value::as_str).unwrap_or_default();
                let kind = association.template.base.get("kind").and_then(Value::as_str).unwrap_or_default();
                refs.push(ResourceRef {
                    api_version: api_version.to_string(),
                    kind: kind.to_string(),
                    name: child_name,
                });
                render_failures.push(err);
            }
        }
    }

    composite.set_resource_refs(&refs);
    persist_spec(ctx, composite, namespace).await?;

    // Garbage-collect children whose template disappeared (§4.3.2).
    for orphan in &orphans {
        delete_child(ctx, orphan, namespace).await?;
    }

    let field_manager = format!("xrm-engine-composite-{xr_uid}");
    let mut connection_details = BTreeMap::new();
    let mut all_ready = !rendered.is_empty();

    for (template, desired) in &rendered {
        let name = desired.name_any();
        let child_api = dynamic_api_for(ctx, desired, namespace);

        if let Some(existing) = child_api.get_opt(&name).await.map_err(|e| EngineError::Apply(e.to_string()))? {
            if !owner::is_controlled_by(&existing, &xr_uid) {
                warn!(child = %name, "refusing to take over a child not controlled by this XR");
                all_ready = false;
                continue;
            }
        }

        let applied = child_api
            .patch(&name, &PatchParams::apply(&field_manager).force(), &KubePatch::Apply(desired))
            .await
            .map_err(|e| EngineError::Apply(e.to_string()))?;
        let observed_value = json!({ "spec": applied.data.get("spec"), "status": applied.data.get("status") });

        patch::apply_to_composite(&template.patches, &observed_value, composite.data_mut());
        let details = connection::extract(&observed_value, &template.connection_details);
        connection_details.extend(details);

        if !readiness::is_ready(&observed_value, &template.readiness_checks) {
            all_ready = false;
        }
    }

    // §4.3.5: the observe-direction patches above may have written into
    // either `spec.*` or `status.*` of the in-memory composite; persist the
    // spec half again now, since the only earlier write (above, for
    // `resourceRefs`) predates this loop and would otherwise discard it.
    persist_spec(ctx, composite, namespace).await?;

    if let Some(secret_name) = composite.write_connection_secret_name() {
        if !connection_details.is_empty() {
            let owner_ref = owner::controller_owner_reference(&xr_api_version, &xr_kind, &composite.name(), &xr_uid, false);
            let secret_namespace = namespace.unwrap_or(crate::constants::DEFAULT_SYSTEM_NAMESPACE);
            secrets::publish_additive(&ctx.engine.client, secret_namespace, &secret_name, owner_ref, &connection_details)
                .await?;
        }
    }

    let synced = render_failures.is_empty();
    let ready = synced && all_ready;
    let conditions = compute_conditions(&composite.conditions(), synced, ready, &render_failures);
    composite.set_conditions(&conditions);
    persist_status(ctx, composite, namespace).await?;

    info!(
        xr = %composite.name(),
        synced,
        ready,
        failures = render_failures.len(),
        "composite reconcile complete"
    );

    Ok(if synced { Duration::from_secs(REQUEUE_DRIFT_SECS) } else { Duration::from_secs(REQUEUE_TRANSIENT_SECS) })
}

/// Pipeline-mode composition flow: delegate to the shared function-pipeline
/// runner (spec.md §4.5 step 4, reused per §3's "a pipeline of function
/// steps" composition shape), then apply the returned desired resources the
/// same way §4.3.4 applies rendered templates.
async fn reconcile_pipeline_mode(
    ctx: &CompositeCtx,
    composite: &mut Composite,
    namespace: Option<&str>,
    composition_spec: &CompositionSpec,
) -> Result<Duration, EngineError> {
    let steps = composition_spec.pipeline.clone().unwrap_or_default();
    let composite_bytes = serde_json::to_vec(composite.inner().data.get("spec").unwrap_or(&json!({})))
        .unwrap_or_default();
    let observed = crate::functions::State { composite: composite_bytes, resources: std::collections::HashMap::new() };

    let outcome = match run_pipeline(ctx.engine.as_ref(), &steps, observed).await {
        Ok(outcome) => outcome,
        Err(err) => {
            let engine_err: EngineError = err.into();
            let condition =
                create_condition(CONDITION_SYNCED, STATUS_FALSE, engine_err.condition_reason(), &engine_err.to_string());
            write_condition_if_changed(ctx, composite, namespace, condition).await?;
            return match engine_err.requeue_after() {
                Some(duration) => Ok(duration),
                None => Err(engine_err),
            };
        }
    };

    let xr_uid = composite.uid().unwrap_or_default();
    let xr_api_version = composite.inner().types.as_ref().map(|t| t.api_version.clone()).unwrap_or_default();
    let xr_kind = composite.inner().types.as_ref().map(|t| t.kind.clone()).unwrap_or_default();
    let owner_ref = owner::controller_owner_reference(&xr_api_version, &xr_kind, &composite.name(), &xr_uid, false);
    let field_manager = format!("xrm-engine-composite-{xr_uid}");

    let mut refs = Vec::with_capacity(outcome.desired.resources.len());
    let mut all_ready = !outcome.desired.resources.is_empty();

    for (resource_name, payload) in &outcome.desired.resources {
        let mut value: Value = match serde_json::from_slice(payload) {
            Ok(value) => value,
            Err(err) => {
                warn!(resource = %resource_name, %err, "pipeline produced a non-JSON desired resource");
                all_ready = false;
                continue;
            }
        };

        let api_version = value.get("apiVersion").and_then(Value::as_str).unwrap_or_default().to_string();
        let kind = value.get("kind").and_then(Value::as_str).unwrap_or_default().to_string();
        let object_name = value
            .get("metadata")
            .and_then(|m| m.get("name"))
            .and_then(Value::as_str)
            .map_or_else(|| resource_name.clone(), str::to_string);

        if let Some(object) = value.as_object_mut() {
            object.remove("apiVersion");
            object.remove("kind");
            object.remove("metadata");
        }

        refs.push(ResourceRef { api_version: api_version.clone(), kind: kind.clone(), name: object_name.clone() });

        let Ok(gvk) = GroupVersionKind::try_from(TypeMeta { api_version: api_version.clone(), kind: kind.clone() })
        else {
            all_ready = false;
            continue;
        };
        let api_resource = ApiResource::from_gvk(&gvk);
        let metadata = ObjectMeta {
            name: Some(object_name.clone()),
            namespace: namespace.map(String::from),
            owner_references: Some(vec![owner_ref.clone()]),
            labels: Some(BTreeMap::from([(LABEL_COMPOSITE.to_string(), composite.name())])),
            annotations: Some(BTreeMap::from([(
                ANNOTATION_COMPOSITION_RESOURCE_NAME.to_string(),
                resource_name.clone(),
            )])),
            ..Default::default()
        };
        let desired = DynamicObject { types: Some(TypeMeta { api_version, kind }), metadata, data: value };

        let api: Api<DynamicObject> = match &namespace {
            Some(ns) => Api::namespaced_with(ctx.engine.client.clone(), ns, &api_resource),
            None => Api::all_with(ctx.engine.client.clone(), &api_resource),
        };

        match api.patch(&object_name, &PatchParams::apply(&field_manager).force(), &KubePatch::Apply(&desired)).await {
            Ok(applied) => {
                let observed_value = json!({ "spec": applied.data.get("spec"), "status": applied.data.get("status") });
                if !readiness::is_ready(&observed_value, &[]) {
                    all_ready = false;
                }
            }
            Err(err) => {
                warn!(resource = %resource_name, %err, "failed to apply pipeline-produced resource");
                all_ready = false;
            }
        }
    }

    composite.set_resource_refs(&refs);
    let conditions = compute_conditions(&composite.conditions(), true, all_ready, &[]);
    composite.set_conditions(&conditions);
    persist_spec(ctx, composite, namespace).await?;
    persist_status(ctx, composite, namespace).await?;

    Ok(if all_ready { Duration::from_secs(REQUEUE_DRIFT_SECS) } else { Duration::from_secs(REQUEUE_TRANSIENT_SECS) })
}

/// Delete flow (spec.md §4.3.6): walk children in `resourceRefs` order.
/// `Foreground` waits for every child to disappear before the finalizer is
/// removed; `Background` requests delete on each and removes the finalizer
/// immediately.
async fn delete_composite(xr: Arc<DynamicObject>, ctx: Arc<CompositeCtx>) -> Result<Action, EngineError> {
    let composite = Composite::new(xr.as_ref().clone());
    let namespace = xr.namespace();
    let refs = composite.resource_refs();

    for child_ref in &refs {
        delete_child(&ctx, child_ref, namespace.as_deref()).await?;
    }

    if composite.composite_delete_policy() == crate::claim::CompositeDeletePolicy::Foreground {
        let mut any_remaining = false;
        for child_ref in &refs {
            if child_exists(&ctx, child_ref, namespace.as_deref()).await? {
                any_remaining = true;
            }
        }
        if any_remaining {
            return Ok(Action::requeue(Duration::from_secs(REQUEUE_TRANSIENT_SECS)));
        }
    }

    finalizers::remove_dynamic_finalizer(
        &ctx.engine.client,
        xr.as_ref(),
        &ctx.xr,
        namespace.as_deref(),
        FINALIZER_COMPOSITE,
    )
    .await
    .map_err(EngineError::Other)?;

    Ok(Action::await_change())
}

fn inline_all(
    templates: &[ComposedTemplate],
    composition_spec: &CompositionSpec,
) -> Result<Vec<ComposedTemplate>, EngineError> {
    templates
        .iter()
        .map(|template| {
            let patches = patch::inline_patch_sets(&template.patches, &composition_spec.patch_sets)
                .map_err(|e| EngineError::Validation(e.to_string()))?;
            Ok(ComposedTemplate { patches, ..template.clone() })
        })
        .collect()
}

/// Fetch the XR's existing composed children, grouped by the distinct
/// `(apiVersion, kind)` pairs already recorded in `resourceRefs` (spec.md
/// §4.3.2: children are matched by the stable annotation, so only the kinds
/// already referenced need to be listed).
async fn fetch_observed_children(
    ctx: &CompositeCtx,
    composite: &Composite,
    namespace: Option<&str>,
) -> Result<Vec<DynamicObject>, EngineError> {
    let mut seen_kinds = std::collections::HashSet::new();
    let mut children = Vec::new();

    for child_ref in composite.resource_refs() {
        if child_ref.api_version.is_empty() || child_ref.kind.is_empty() {
            continue;
        }
        if !seen_kinds.insert((child_ref.api_version.clone(), child_ref.kind.clone())) {
            continue;
        }
        let Ok(gvk) = GroupVersionKind::try_from(TypeMeta {
            api_version: child_ref.api_version.clone(),
            kind: child_ref.kind.clone(),
        }) else {
            continue;
        };
        let api_resource = ApiResource::from_gvk(&gvk);
        let api: Api<DynamicObject> = match namespace {
            Some(ns) => Api::namespaced_with(ctx.engine.client.clone(), ns, &api_resource),
            None => Api::all_with(ctx.engine.client.clone(), &api_resource),
        };
        let selector = format!("{LABEL_COMPOSITE}={}", composite.name());
        let list = api
            .list(&ListParams::default().labels(&selector))
            .await
            .map_err(|e| EngineError::Other(e.into()))?;
        children.extend(list.items);
    }

    Ok(children)
}

fn dynamic_api_for(ctx: &CompositeCtx, desired: &DynamicObject, namespace: Option<&str>) -> Api<DynamicObject> {
    let gvk = desired
        .types
        .as_ref()
        .map(|t| GroupVersionKind::try_from(t.clone()).unwrap_or_else(|_| GroupVersionKind::gvk("", "v1", &t.kind)))
        .unwrap_or_else(|| GroupVersionKind::gvk("", "v1", ""));
    let api_resource = ApiResource::from_gvk(&gvk);
    match namespace {
        Some(ns) => Api::namespaced_with(ctx.engine.client.clone(), ns, &api_resource),
        None => Api::all_with(ctx.engine.client.clone(), &api_resource),
    }
}

async fn delete_child(ctx: &CompositeCtx, child_ref: &ResourceRef, namespace: Option<&str>) -> Result<(), EngineError> {
    let Ok(gvk) =
        GroupVersionKind::try_from(TypeMeta { api_version: child_ref.api_version.clone(), kind: child_ref.kind.clone() })
    else {
        return Ok(());
    };
    let api_resource = ApiResource::from_gvk(&gvk);
    let api: Api<DynamicObject> = match namespace {
        Some(ns) => Api::namespaced_with(ctx.engine.client.clone(), ns, &api_resource),
        None => Api::all_with(ctx.engine.client.clone(), &api_resource),
    };
    match api.delete(&child_ref.name, &Default::default()).await {
        Ok(_) => Ok(()),
        Err(kube::Error::Api(e)) if e.code == 404 => Ok(()),
        Err(e) => Err(EngineError::Other(e.into())),
    }
}

async fn child_exists(ctx: &CompositeCtx, child_ref: &ResourceRef, namespace: Option<&str>) -> Result<bool, EngineError> {
    let Ok(gvk) =
        GroupVersionKind::try_from(TypeMeta { api_version: child_ref.api_version.clone(), kind: child_ref.kind.clone() })
    else {
        return Ok(false);
    };
    let api_resource = ApiResource::from_gvk(&gvk);
    let api: Api<DynamicObject> = match namespace {
        Some(ns) => Api::namespaced_with(ctx.engine.client.clone(), ns, &api_resource),
        None => Api::all_with(ctx.engine.client.clone(), &api_resource),
    };
    let exists = api.get_opt(&child_ref.name).await.map_err(|e| EngineError::Other(e.into()))?.is_some();
    Ok(exists)
}

async fn persist_spec(ctx: &CompositeCtx, composite: &Composite, namespace: Option<&str>) -> Result<(), EngineError> {
    let api = xr_api(ctx, namespace);
    let patch = json!({ "spec": composite.inner().data.get("spec") });
    api.patch(&composite.name(), &PatchParams::default(), &KubePatch::Merge(&patch))
        .await
        .map_err(patch_conflict_aware_error)?;
    Ok(())
}

async fn persist_status(ctx: &CompositeCtx, composite: &Composite, namespace: Option<&str>) -> Result<(), EngineError> {
    let api = xr_api(ctx, namespace);
    let patch = json!({ "status": composite.inner().data.get("status") });
    api.patch_status(&composite.name(), &PatchParams::default(), &KubePatch::Merge(&patch))
        .await
        .map_err(patch_conflict_aware_error)?;
    Ok(())
}

async fn write_condition_if_changed(
    ctx: &CompositeCtx,
    composite: &Composite,
    namespace: Option<&str>,
    condition: Condition,
) -> Result<(), EngineError> {
    let existing = find_condition(&composite.conditions(), &condition.r#type).cloned();
    if !condition_changed(&existing, &condition) {
        return Ok(());
    }
    let mut conditions = composite.conditions();
    if let Some(slot) = conditions.iter_mut().find(|c| c.r#type == condition.r#type) {
        *slot = condition;
    } else {
        conditions.push(condition);
    }
    let api = xr_api(ctx, namespace);
    let patch = json!({ "status": { "conditions": conditions } });
    api.patch_status(&composite.name(), &PatchParams::default(), &KubePatch::Merge(&patch))
        .await
        .map_err(patch_conflict_aware_error)?;
    Ok(())
}

fn xr_api(ctx: &CompositeCtx, namespace: Option<&str>) -> Api<DynamicObject> {
    match namespace {
        Some(ns) => Api::namespaced_with(ctx.engine.client.clone(), ns, &ctx.xr),
        None => Api::all_with(ctx.engine.client.clone(), &ctx.xr),
    }
}

/// A resource-version conflict (§5: "not retried in place... the ensuing
/// watch event re-triggers it") maps to [`EngineError::Conflict`] rather
/// than the generic transient bucket, so `error_policy` does not schedule a
/// pointless backoff for it.
fn patch_conflict_aware_error(err: kube::Error) -> EngineError {
    match &err {
        kube::Error::Api(api_err) if api_err.code == 409 => EngineError::Conflict,
        _ => EngineError::Apply(err.to_string()),
    }
}

/// Compute the `Synced`/`Ready` condition pair for a legacy-mode tick
/// (spec.md §4.3.5).
fn compute_conditions(
    existing: &[Condition],
    synced: bool,
    ready: bool,
    render_failures: &[render::RenderError],
) -> Vec<Condition> {
    let synced_condition = if synced {
        create_condition(CONDITION_SYNCED, STATUS_TRUE, REASON_SUCCESS, "all templates rendered and applied")
    } else {
        let message = render_failures.iter().map(std::string::ToString::to_string).collect::<Vec<_>>().join("; ");
        create_condition(CONDITION_SYNCED, STATUS_FALSE, "RenderFailed", &message)
    };
    let ready_condition = if ready {
        create_condition(CONDITION_READY, STATUS_TRUE, REASON_SUCCESS, "all composed resources are ready")
    } else {
        create_condition(CONDITION_READY, STATUS_FALSE, REASON_CREATING, "waiting for composed resources to become ready")
    };

    let mut conditions = existing.to_vec();
    for condition in [synced_condition, ready_condition] {
        if let Some(slot) = conditions.iter_mut().find(|c| c.r#type == condition.r#type) {
            *slot = condition;
        } else {
            conditions.push(condition);
        }
    }
    conditions
}

#[cfg(test)]
#[path = "composite_tests.rs"]
mod tests;
