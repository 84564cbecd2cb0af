// SPDX-License-Identifier: Apache-2.0

//! Operation Reconciler (spec.md §4.5): runs a one-shot function pipeline and
//! applies the resulting desired resources.
//!
//! Unlike the Composite and Claim reconcilers, an `Operation` never re-runs
//! its pipeline once it reaches a terminal state (`Complete=True`, or
//! `Complete=False` after exhausting `retryLimit`), so this module exports a
//! single `reconcile_operation` rather than a `reconcile_*`/`delete_*` pair —
//! deletion only ever removes the finalizer, never re-enters the pipeline.

use std::collections::HashMap;
use std::sync::Arc;

use kube::api::{Api, DynamicObject, ObjectMeta, Patch, PatchParams, TypeMeta};
use kube::core::GroupVersionKind;
use kube::runtime::controller::Action;
use kube::{Resource, ResourceExt};
use secrecy::ExposeSecret;
use serde_json::json;
use tracing::{info, warn};
use zeroize::Zeroize;

use crate::constants::{CONDITION_COMPLETE, FINALIZER_OPERATION, STATUS_FALSE, STATUS_TRUE, STATUS_UNKNOWN};
use crate::context::Context;
use crate::crd::{Condition, FunctionCredential, Operation, PipelineStep};
use crate::errors::EngineError;
use crate::functions::{self, generated, FunctionRunnerClient, FunctionRunnerError, RunFunctionRequest, State};
use crate::owner::controller_owner_reference;
use crate::reconcilers::finalizers;
use crate::reconcilers::retry;
use crate::reconcilers::status::{condition_changed, create_condition, find_condition};

const FIELD_MANAGER_PREFIX: &str = "xrm-engine-operation";
const REASON_RETRY_LIMIT_REACHED: &str = "RetryLimitReached";
const REASON_RUNNING: &str = "Running";
const REASON_PIPELINE_SUCCEEDED: &str = "PipelineSucceeded";

/// Outcome of a successful pipeline run: the accumulated desired state and
/// carried-forward opaque context.
pub(crate) struct PipelineOutcome {
    pub desired: State,
    #[allow(dead_code)]
    pub context: Vec<u8>,
}

/// Why a pipeline run failed, distinguishing what the Operation Reconciler's
/// retry-limit bookkeeping cares about (a function returning `Fatal`, or a
/// credential it couldn't resolve) from plain infrastructure trouble (spec.md
/// §4.5 step 4).
pub(crate) enum PipelineError {
    Credential { step: String, reason: String },
    Transport { step: String, reason: String },
    Fatal { function: String, message: String },
}

impl PipelineError {
    /// True for failures spec.md §4.5 counts against `status.failures` — a
    /// function ran and told us to stop, or a credential it needed was
    /// missing. Dial/transport trouble is not counted: it says nothing about
    /// whether the pipeline itself would succeed.
    fn counts_as_failure(&self) -> bool {
        !matches!(self, PipelineError::Transport { .. })
    }
}

impl From<PipelineError> for EngineError {
    fn from(err: PipelineError) -> Self {
        match err {
            PipelineError::Credential { step, reason } => EngineError::CredentialResolution { step, reason },
            PipelineError::Transport { step, reason } => {
                EngineError::Other(anyhow::anyhow!("step {step}: {reason}"))
            }
            PipelineError::Fatal { function, message } => EngineError::FunctionFatal { function, message },
        }
    }
}

/// Run an ordered function pipeline against `observed`, threading the
/// returned `desired` state and opaque `context` from one step into the
/// next (spec.md §4.5 step 4). Shared by the Operation Reconciler and the
/// Composite Reconciler's pipeline-mode composition path.
///
/// # Errors
/// Returns the first [`PipelineError`] encountered; the pipeline is aborted
/// at that step, nothing after it runs.
pub(crate) async fn run_pipeline(
    ctx: &Context,
    steps: &[PipelineStep],
    observed: State,
) -> Result<PipelineOutcome, PipelineError> {
    let mut desired = State { composite: observed.composite.clone(), resources: HashMap::new() };
    let mut context = Vec::new();

    for step in steps {
        let function = ctx.stores.get_function(&step.function_ref.name).ok_or_else(|| PipelineError::Credential {
            step: step.step.clone(),
            reason: format!("function {:?} is not registered", step.function_ref.name),
        })?;

        let mut credentials = Vec::with_capacity(step.credentials.len());
        for credential in &step.credentials {
            let FunctionCredential::Secret { name, namespace } = credential;
            let secret_data = crate::secrets::fetch_credential(&ctx.client, &step.step, namespace, name)
                .await
                .map_err(|e| PipelineError::Credential { step: step.step.clone(), reason: e.to_string() })?;
            // Exposed only long enough to clone into the wire message below;
            // each `SecretBox` entry still zeroizes its own copy on drop.
            let data: HashMap<String, Vec<u8>> =
                secret_data.iter().map(|(k, v)| (k.clone(), v.expose_secret().clone())).collect();
            credentials.push(functions::Credential {
                name: name.clone(),
                source: Some(generated::credential::Source::Secret(generated::SecretCredential {
                    namespace: namespace.clone(),
                    name: name.clone(),
                    data,
                })),
            });
        }

        let input =
            step.input.as_ref().map(|v| serde_json::to_vec(v).unwrap_or_default()).unwrap_or_default();

        let request = RunFunctionRequest {
            observed: Some(observed.clone()),
            desired: Some(desired.clone()),
            context: context.clone(),
            input,
            credentials,
        };

        let mut client = FunctionRunnerClient::connect(&function.spec.target, function.spec.tls)
            .await
            .map_err(|e| PipelineError::Transport { step: step.step.clone(), reason: e.to_string() })?;

        let response = call_with_retry(&mut client, request, &step.step)
            .await
            .map_err(|e| PipelineError::Transport { step: step.step.clone(), reason: e.to_string() })?;

        if functions::has_fatal_result(&response.results) {
            let message = response
                .results
                .iter()
                .find(|r| r.severity == functions::Severity::Fatal as i32)
                .map(|r| r.message.clone())
                .unwrap_or_default();
            return Err(PipelineError::Fatal { function: step.function_ref.name.clone(), message });
        }

        if let Some(step_desired) = response.desired {
            desired.composite = step_desired.composite;
            desired.resources.extend(step_desired.resources);
        }
        context = response.context;
    }

    Ok(PipelineOutcome { desired, context })
}

/// Call `RunFunction`, retrying transient transport/status failures with the
/// shared gRPC backoff schedule (spec.md §4.6: the client itself never
/// retries; this is the caller doing it).
async fn call_with_retry(
    client: &mut FunctionRunnerClient,
    mut request: RunFunctionRequest,
    step_name: &str,
) -> Result<crate::functions::RunFunctionResponse, FunctionRunnerError> {
    let mut backoff = retry::grpc_backoff();
    let mut attempt = 0;
    let result = loop {
        attempt += 1;
        match client.run(request.clone()).await {
            Ok(response) => break Ok(response),
            Err(FunctionRunnerError::Call(status)) if retry::is_retryable_grpc_status(&status) => {
                match backoff.next_backoff() {
                    Some(duration) => {
                        warn!(step = step_name, attempt, retry_after = ?duration, %status, "retryable function-runner error, will retry");
                        tokio::time::sleep(duration).await;
                    }
                    None => break Err(FunctionRunnerError::Call(status)),
                }
            }
            Err(err) => break Err(err),
        }
    };
    scrub_credentials(&mut request);
    result
}

/// Zero the plaintext credential bytes once `request` has made its last trip
/// over the wire; nothing past this point still needs them.
fn scrub_credentials(request: &mut RunFunctionRequest) {
    for credential in &mut request.credentials {
        if let Some(generated::credential::Source::Secret(secret)) = credential.source.as_mut() {
            for bytes in secret.data.values_mut() {
                bytes.zeroize();
            }
        }
    }
}

/// Reconcile one `Operation` (spec.md §4.5's six steps).
///
/// # Errors
/// Returns [`EngineError`] on any failure that should surface a condition or
/// drive a requeue; see each variant's documented policy.
pub async fn reconcile_operation(operation: Arc<Operation>, ctx: Arc<Context>) -> Result<Action, EngineError> {
    let start = std::time::Instant::now();
    let name = operation.name_any();

    if operation.meta().deletion_timestamp.is_some() {
        finalizers::remove_finalizer(&ctx.client, operation.as_ref(), FINALIZER_OPERATION).await?;
        return Ok(Action::await_change());
    }

    finalizers::ensure_finalizer(&ctx.client, operation.as_ref(), FINALIZER_OPERATION).await?;

    let api: Api<Operation> = Api::all(ctx.client.clone());

    if find_condition(&operation.status_conditions(), CONDITION_COMPLETE).is_some_and(|c| c.status == STATUS_TRUE)
    {
        return Ok(Action::await_change());
    }

    let failures = operation.status.as_ref().map(|s| s.failures).unwrap_or_default();
    if failures >= operation.spec.0.retry_limit {
        let condition = create_condition(
            CONDITION_COMPLETE,
            STATUS_FALSE,
            REASON_RETRY_LIMIT_REACHED,
            &format!("exhausted retryLimit ({}) without a successful pipeline run", operation.spec.0.retry_limit),
        );
        if condition_changed(&find_condition(&operation.status_conditions(), CONDITION_COMPLETE).cloned(), &condition)
        {
            patch_condition(&api, &name, &operation, condition, None).await?;
        }
        return Ok(Action::await_change());
    }

    patch_condition(
        &api,
        &name,
        &operation,
        create_condition(CONDITION_COMPLETE, STATUS_UNKNOWN, REASON_RUNNING, "running the function pipeline"),
        None,
    )
    .await?;

    let observed = State { composite: Vec::new(), resources: HashMap::new() };
    let outcome = match run_pipeline(&ctx, &operation.spec.0.pipeline, observed).await {
        Ok(outcome) => outcome,
        Err(err) => {
            let counts_as_failure = err.counts_as_failure();
            let next_failures = if counts_as_failure { failures + 1 } else { failures };
            let engine_err: EngineError = err.into();

            // Transient infrastructure trouble (a dial failure, say) doesn't
            // burn retry budget or move Complete away from Running/Unknown —
            // only a function that actually ran and said "stop" does.
            if counts_as_failure {
                let reason = if next_failures >= operation.spec.0.retry_limit {
                    REASON_RETRY_LIMIT_REACHED
                } else {
                    engine_err.condition_reason()
                };
                let condition = create_condition(CONDITION_COMPLETE, STATUS_FALSE, reason, &engine_err.to_string());
                patch_condition(&api, &name, &operation, condition, Some(next_failures)).await?;
            }

            ctx.metrics.record_error("Operation", start.elapsed());
            return match engine_err.requeue_after() {
                Some(duration) => Ok(Action::requeue(duration)),
                None => Err(engine_err),
            };
        }
    };

    if let Err(apply_err) = apply_desired_resources(&ctx, &operation, &outcome.desired.resources).await {
        ctx.metrics.record_error("Operation", start.elapsed());
        return Err(apply_err);
    }

    patch_condition(
        &api,
        &name,
        &operation,
        create_condition(CONDITION_COMPLETE, STATUS_TRUE, REASON_PIPELINE_SUCCEEDED, "pipeline completed successfully"),
        None,
    )
    .await?;

    info!(operation = %name, "operation pipeline completed");
    ctx.metrics.record_success("Operation", start.elapsed());
    Ok(Action::await_change())
}

trait OperationStatusExt {
    fn status_conditions(&self) -> Vec<Condition>;
}

impl OperationStatusExt for Operation {
    fn status_conditions(&self) -> Vec<Condition> {
        self.status.as_ref().map(|s| s.conditions.clone()).unwrap_or_default()
    }
}

async fn patch_condition(
    api: &Api<Operation>,
    name: &str,
    operation: &Operation,
    condition: Condition,
    failures: Option<i32>,
) -> Result<(), EngineError> {
    let mut conditions = operation.status_conditions();
    if let Some(existing) = conditions.iter_mut().find(|c| c.r#type == condition.r#type) {
        *existing = condition;
    } else {
        conditions.push(condition);
    }

    let mut status = json!({ "conditions": conditions });
    if let Some(failures) = failures {
        status["failures"] = json!(failures);
    }

    api.patch_status(name, &PatchParams::default(), &Patch::Merge(json!({ "status": status })))
        .await
        .map_err(|e| EngineError::Apply(e.to_string()))?;
    Ok(())
}

/// Apply every resource the pipeline produced, server-side, owned by this
/// Operation (spec.md §4.5 step 5). Any single patch failure aborts the
/// whole batch for this tick — the function pipeline is not re-run, only
/// the apply step retries on the next reconcile.
async fn apply_desired_resources(
    ctx: &Context,
    operation: &Operation,
    resources: &HashMap<String, Vec<u8>>,
) -> Result<(), EngineError> {
    let operation_uid = operation.uid().unwrap_or_default();
    let field_manager = format!("{FIELD_MANAGER_PREFIX}-{operation_uid}");
    let owner = controller_owner_reference(
        crate::constants::API_GROUP_VERSION,
        crate::constants::KIND_OPERATION,
        &operation.name_any(),
        &operation_uid,
        false,
    );

    for (resource_name, payload) in resources {
        let mut value: serde_json::Value = serde_json::from_slice(payload).map_err(|e| {
            EngineError::Apply(format!("resource {resource_name:?} is not valid JSON: {e}"))
        })?;

        let api_version = value.get("apiVersion").and_then(serde_json::Value::as_str).unwrap_or_default().to_string();
        let kind = value.get("kind").and_then(serde_json::Value::as_str).unwrap_or_default().to_string();
        if api_version.is_empty() || kind.is_empty() {
            return Err(EngineError::Apply(format!(
                "resource {resource_name:?} is missing apiVersion/kind"
            )));
        }

        let namespace = value
            .get("metadata")
            .and_then(|m| m.get("namespace"))
            .and_then(serde_json::Value::as_str)
            .map(str::to_string);
        let object_name = value
            .get("metadata")
            .and_then(|m| m.get("name"))
            .and_then(serde_json::Value::as_str)
            .map_or_else(|| resource_name.clone(), str::to_string);

        if let Some(object) = value.as_object_mut() {
            object.remove("apiVersion");
            object.remove("kind");
            object.remove("metadata");
        }

        let gvk = GroupVersionKind::try_from(TypeMeta { api_version: api_version.clone(), kind: kind.clone() })
            .map_err(|e| EngineError::Apply(format!("resource {resource_name:?}: {e}")))?;
        let api_resource = kube::api::ApiResource::from_gvk(&gvk);

        let metadata = ObjectMeta {
            name: Some(object_name.clone()),
            namespace: namespace.clone(),
            owner_references: Some(vec![owner.clone()]),
            ..Default::default()
        };
        let desired = DynamicObject { types: Some(TypeMeta { api_version, kind }), metadata, data: value };

        let api: Api<DynamicObject> = match namespace {
            Some(ns) => Api::namespaced_with(ctx.client.clone(), &ns, &api_resource),
            None => Api::all_with(ctx.client.clone(), &api_resource),
        };

        api.patch(&object_name, &PatchParams::apply(&field_manager).force(), &Patch::Apply(&desired))
            .await
            .map_err(|e| EngineError::Apply(format!("applying {resource_name:?}: {e}")))?;
    }

    Ok(())
}

#[cfg(test)]
#[path = "operation_tests.rs"]
mod tests;
