// SPDX-License-Identifier: Apache-2.0

//! Claim Reconciler (spec.md §4.4): binds a namespaced claim to exactly one
//! cluster-scoped composite, propagating spec, finalizers, and connection
//! secrets. The four-state machine (Unbound/Pending/Bound/Deleting) is
//! driven entirely by `spec.resourceRef` and the bound XR's `Ready`
//! condition — there is no separate state field stored anywhere.

use std::sync::Arc;
use std::time::Duration;

use kube::api::{Api, DynamicObject, Patch as KubePatch, PatchParams};
use kube::runtime::controller::Action;
use kube::{Resource, ResourceExt};
use serde_json::json;
use tracing::{info, warn};

use crate::claim::{Claim, CompositeDeletePolicy};
use crate::constants::{
    CONDITION_READY, CONDITION_SYNCED, DEFAULT_SYSTEM_NAMESPACE, FINALIZER_CLAIM, REQUEUE_DRIFT_SECS,
    REQUEUE_TRANSIENT_SECS, STATUS_FALSE, STATUS_TRUE,
};
use crate::crd::Condition;
use crate::errors::EngineError;
use crate::labels;
use crate::manager::ClaimCtx;
use crate::owner;
use crate::reconcilers::finalizers;
use crate::reconcilers::status::{condition_changed, create_condition, find_condition};
use crate::secrets;
use crate::xr::Composite;

/// Reconcile one claim (spec.md §4.4).
///
/// # Errors
/// Returns [`EngineError`] on any failure the caller's `error_policy` should
/// schedule a backoff for.
pub async fn reconcile_claim(claim: Arc<DynamicObject>, ctx: Arc<ClaimCtx>) -> Result<Action, EngineError> {
    if claim.meta().deletion_timestamp.is_some() {
        return delete_claim(claim, ctx).await;
    }

    let namespace = claim.namespace().unwrap_or_default();
    finalizers::ensure_dynamic_finalizer(&ctx.engine.client, claim.as_ref(), &ctx.claim, Some(&namespace), FINALIZER_CLAIM)
        .await
        .map_err(EngineError::Other)?;

    let mut claim_obj = Claim::new(claim.as_ref().clone());

    match claim_obj.resource_ref() {
        // *Unbound*: no composite yet, create one and record the binding.
        None => bind_new_composite(&ctx, &mut claim_obj, &namespace).await,
        Some(xr_name) => {
            let api = composite_api(&ctx);
            match api.get_opt(&xr_name).await.map_err(|e| EngineError::Other(e.into()))? {
                // Dangling `resourceRef`: the bound XR has disappeared out of
                // band. Not a recovery path (that only applies under
                // deletion, spec.md §4.4 invariants) — surface it as a
                // transient failure so the operator notices.
                None => {
                    warn!(claim = %claim_obj.name(), xr = %xr_name, "claim's bound composite is missing");
                    let condition = create_condition(
                        CONDITION_SYNCED,
                        STATUS_FALSE,
                        "CompositeMissing",
                        &format!("bound composite {xr_name} not found"),
                    );
                    write_condition_if_changed(&ctx, &claim_obj, &namespace, condition).await?;
                    Ok(Action::requeue(Duration::from_secs(REQUEUE_TRANSIENT_SECS)))
                }
                Some(xr) => {
                    let composite = Composite::new(xr);
                    if is_ready(&composite) {
                        // *Bound*
                        bound(&ctx, &mut claim_obj, &namespace, &composite).await
                    } else {
                        // *Pending*
                        let condition =
                            create_condition(CONDITION_READY, STATUS_FALSE, "Waiting", "waiting for composite to become ready");
                        write_condition_if_changed(&ctx, &claim_obj, &namespace, condition).await?;
                        Ok(Action::requeue(Duration::from_secs(REQUEUE_TRANSIENT_SECS)))
                    }
                }
            }
        }
    }
}

fn is_ready(composite: &Composite) -> bool {
    find_condition(&composite.conditions(), CONDITION_READY).is_some_and(|c| c.status == STATUS_TRUE)
}

/// *Unbound* → create a cluster-scoped composite mirroring the claim's spec,
/// record `claimRef` on it, and record `resourceRef` on the claim (spec.md
/// §4.4: "Configure a fresh XR... write `resourceRef` on claim").
async fn bind_new_composite(ctx: &ClaimCtx, claim: &mut Claim, namespace: &str) -> Result<Action, EngineError> {
    let xr_name = format!("{}-{}", claim.name(), labels::generate_suffix());
    let uid = claim.metadata().uid.clone().unwrap_or_default();

    let mut spec = claim.inner().data.get("spec").cloned().unwrap_or_else(|| json!({}));
    if let Some(spec_obj) = spec.as_object_mut() {
        // These are claim-only fields; the XR gets its own generated values.
        spec_obj.remove("resourceRef");
        spec_obj.remove("writeConnectionSecretToRef");
        spec_obj.remove("compositeDeletePolicy");
    }

    let mut composite = Composite::new(DynamicObject::new(&xr_name, &ctx.composite).data(json!({ "spec": spec })));
    composite.set_claim_ref(namespace, &claim.name(), &uid);
    composite.set_composite_delete_policy(claim.composite_delete_policy());

    if let Some(secret_name) = claim.write_connection_secret_name() {
        composite.set_write_connection_secret_name(&secret_name);
    }
    if let Some(composition_name) = claim.composition_ref_name() {
        composite.set_composition_ref(&composition_name);
    }
    if let Some(selector_labels) = claim.composition_selector_labels() {
        composite.set_composition_selector_labels(&selector_labels);
    }

    let field_manager = format!("xrm-engine-claim-{uid}");
    composite_api(ctx)
        .patch(&xr_name, &PatchParams::apply(&field_manager).force(), &KubePatch::Apply(composite.inner()))
        .await
        .map_err(|e| EngineError::Apply(e.to_string()))?;

    claim.set_resource_ref(&xr_name);
    persist_claim_spec(ctx, claim, namespace).await?;

    info!(claim = %claim.name(), xr = %xr_name, "claim bound to a newly created composite");

    Ok(Action::requeue(Duration::ZERO))
}

/// *Bound*: propagate the XR's aggregated connection secret into the
/// claim's namespace additively (spec.md §4.4: "a key absent in this tick
/// is not removed from the claim secret"), then mark the claim ready.
async fn bound(ctx: &ClaimCtx, claim: &mut Claim, namespace: &str, composite: &Composite) -> Result<Action, EngineError> {
    if let (Some(owner_secret_name), Some(claim_secret_name)) =
        (composite.write_connection_secret_name(), claim.write_connection_secret_name())
    {
        // XR kinds are cluster-scoped in this engine (spec.md §3; mirrored by
        // `manager::run_composite_controller`'s `Api::all_with` watch), so
        // the owner secret the Composite Reconciler publishes lives in the
        // shared system namespace rather than alongside the XR itself.
        match secrets::read_secret_data(&ctx.engine.client, DEFAULT_SYSTEM_NAMESPACE, &owner_secret_name).await {
            Ok(details) if !details.is_empty() => {
                let uid = claim.metadata().uid.clone().unwrap_or_default();
                let owner_ref =
                    owner::controller_owner_reference(&ctx.claim.api_version, &ctx.claim.kind, &claim.name(), &uid, false);
                secrets::publish_additive(&ctx.engine.client, namespace, &claim_secret_name, owner_ref, &details).await?;
            }
            Ok(_) => {}
            Err(EngineError::NotFoundRelated(_)) => {
                // Owner secret not published yet this tick; nothing to copy.
            }
            Err(err) => return Err(err),
        }
    }

    let synced = create_condition(CONDITION_SYNCED, STATUS_TRUE, "Bound", "bound to composite");
    let ready = create_condition(CONDITION_READY, STATUS_TRUE, "Available", "composite is ready");
    write_conditions_if_changed(ctx, claim, namespace, [synced, ready]).await?;

    Ok(Action::requeue(Duration::from_secs(REQUEUE_DRIFT_SECS)))
}

/// *Deleting*: delete the bound composite per the claim's composite-delete
/// policy, then release the claim finalizer (spec.md §4.3.6 analogue, §4.4
/// recovery path for a dangling `resourceRef`).
pub async fn delete_claim(claim: Arc<DynamicObject>, ctx: Arc<ClaimCtx>) -> Result<Action, EngineError> {
    let claim_obj = Claim::new(claim.as_ref().clone());
    let namespace = claim.namespace().unwrap_or_default();

    if let Some(xr_name) = claim_obj.resource_ref() {
        let api = composite_api(&ctx);
        let exists = match api.get_opt(&xr_name).await.map_err(|e| EngineError::Other(e.into()))? {
            Some(_) => {
                match api.delete(&xr_name, &Default::default()).await {
                    Ok(_) => true,
                    Err(kube::Error::Api(e)) if e.code == 404 => false,
                    Err(e) => return Err(EngineError::Other(e.into())),
                }
            }
            None => false,
        };

        if exists && claim_obj.composite_delete_policy() == CompositeDeletePolicy::Foreground {
            return Ok(Action::requeue(Duration::from_secs(REQUEUE_TRANSIENT_SECS)));
        }
    }

    finalizers::remove_dynamic_finalizer(&ctx.engine.client, claim.as_ref(), &ctx.claim, Some(&namespace), FINALIZER_CLAIM)
        .await
        .map_err(EngineError::Other)?;

    Ok(Action::await_change())
}

fn composite_api(ctx: &ClaimCtx) -> Api<DynamicObject> {
    Api::all_with(ctx.engine.client.clone(), &ctx.composite)
}

fn claim_api(ctx: &ClaimCtx, namespace: &str) -> Api<DynamicObject> {
    Api::namespaced_with(ctx.engine.client.clone(), namespace, &ctx.claim)
}

async fn persist_claim_spec(ctx: &ClaimCtx, claim: &Claim, namespace: &str) -> Result<(), EngineError> {
    let api = claim_api(ctx, namespace);
    let patch = json!({ "spec": claim.inner().data.get("spec") });
    api.patch(&claim.name(), &PatchParams::default(), &KubePatch::Merge(&patch))
        .await
        .map_err(patch_conflict_aware_error)?;
    Ok(())
}

async fn write_condition_if_changed(
    ctx: &ClaimCtx,
    claim: &Claim,
    namespace: &str,
    condition: Condition,
) -> Result<(), EngineError> {
    write_conditions_if_changed(ctx, claim, namespace, [condition]).await
}

async fn write_conditions_if_changed<const N: usize>(
    ctx: &ClaimCtx,
    claim: &Claim,
    namespace: &str,
    new_conditions: [Condition; N],
) -> Result<(), EngineError> {
    let mut conditions = claim.conditions();
    let mut changed = false;

    for new_condition in new_conditions {
        let existing = find_condition(&conditions, &new_condition.r#type).cloned();
        if condition_changed(&existing, &new_condition) {
            changed = true;
        }
        if let Some(slot) = conditions.iter_mut().find(|c| c.r#type == new_condition.r#type) {
            *slot = new_condition;
        } else {
            conditions.push(new_condition);
        }
    }

    if !changed {
        return Ok(());
    }

    let api = claim_api(ctx, namespace);
    let patch = json!({ "status": { "conditions": conditions } });
    api.patch_status(&claim.name(), &PatchParams::default(), &KubePatch::Merge(&patch))
        .await
        .map_err(patch_conflict_aware_error)?;
    Ok(())
}

/// A resource-version conflict maps to [`EngineError::Conflict`], matching
/// the Composite Reconciler's handling of the same optimistic-concurrency
/// invariant (spec.md §5).
fn patch_conflict_aware_error(err: kube::Error) -> EngineError {
    match &err {
        kube::Error::Api(api_err) if api_err.code == 409 => EngineError::Conflict,
        _ => EngineError::Apply(err.to_string()),
    }
}

#[cfg(test)]
#[path = "claim_tests.rs"]
mod tests;
