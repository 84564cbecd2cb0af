// SPDX-License-Identifier: Apache-2.0

//! Custom Resource Definitions owned by the reconciliation engine itself.
//!
//! XR and Claim kinds are *not* defined here: they are user-defined (an XRD
//! declares an arbitrary group/version/kind), so the engine operates on them
//! generically through [`crate::xr::Composite`] and [`crate::claim::Claim`],
//! thin wrappers around [`kube::core::DynamicObject`]. The four kinds below
//! are the engine's own fixed types (spec.md §3):
//!
//! - [`Composition`] — a template set an XR is bound to.
//! - [`CompositionRevision`] — an immutable snapshot of a `Composition`.
//! - [`Operation`] — a one-shot function-pipeline job.
//! - [`Function`] — a reference to an external gRPC function endpoint.

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// An observation of an object's state, following the standard Kubernetes
/// condition shape (`type`, `status`, `reason`, `message`,
/// `lastTransitionTime`). Every object managed by this engine carries at
/// least `Synced` and `Ready` (or `Complete` for Operations) — spec.md §7.
#[derive(Clone, Debug, Serialize, Deserialize, Default, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    pub r#type: String,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_transition_time: Option<String>,
}

/// A label selector, reused verbatim by `compositionSelector` and by
/// function-adjacent matching helpers.
#[derive(Clone, Debug, Serialize, Deserialize, Default, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct LabelSelector {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub match_labels: Option<BTreeMap<String, String>>,
}

impl LabelSelector {
    /// True if every key/value pair in `match_labels` is present in `labels`.
    /// An empty or absent `match_labels` matches everything, mirroring the
    /// Kubernetes `LabelSelector` zero-value semantics.
    #[must_use]
    pub fn matches(&self, labels: &BTreeMap<String, String>) -> bool {
        self.match_labels
            .as_ref()
            .is_none_or(|want| want.iter().all(|(k, v)| labels.get(k) == Some(v)))
    }
}

// ============================================================================
// Composition
// ============================================================================

/// A named, inlineable set of patches a template can reference instead of
/// repeating patches across templates (spec.md §3, "Named patch-sets may be
/// inlined").
#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PatchSet {
    pub name: String,
    pub patches: Vec<Patch>,
}

/// One field-path transfer between a composite and a composed resource.
/// `from_composite_field_path` and `to_composite_field_path` are the two
/// directions the Composite Reconciler runs in §4.3.3 (render) and §4.3.5
/// (observe).
#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase", tag = "type")]
pub enum Patch {
    FromCompositeFieldPath {
        from_field_path: String,
        to_field_path: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        policy: Option<PatchPolicy>,
    },
    ToCompositeFieldPath {
        from_field_path: String,
        to_field_path: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        policy: Option<PatchPolicy>,
    },
    PatchSet {
        patch_set_name: String,
    },
}

/// Controls how a missing source field is handled (`Required` fails render
/// for this template, `Optional` silently skips the patch).
#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct PatchPolicy {
    #[serde(default)]
    pub from_field_path_is_required: bool,
}

/// A single connection-detail extraction rule: copy (optionally renaming) a
/// field from a composed resource into the aggregated connection secret
/// (spec.md §4.3.5).
#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionDetail {
    pub name: String,
    pub from_field_path: String,
}

/// A readiness check attached to a template (spec.md §4.3.5). The default,
/// absent any explicit checks, is "the child's own `Ready` condition is
/// true".
#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase", tag = "type")]
pub enum ReadinessCheck {
    FieldExists { field_path: String },
    FieldEquals { field_path: String, match_value: String },
    FieldMatchesRegex { field_path: String, match_regex: String },
}

/// One entry of a legacy (pre-pipeline) composition's template list.
#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ComposedTemplate {
    pub name: String,
    pub base: serde_json::Value,
    #[serde(default)]
    pub patches: Vec<Patch>,
    #[serde(default)]
    pub connection_details: Vec<ConnectionDetail>,
    #[serde(default)]
    pub readiness_checks: Vec<ReadinessCheck>,
}

/// One step of a pipeline-mode composition (spec.md §3, §4.5).
#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PipelineStep {
    pub step: String,
    pub function_ref: FunctionReference,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input: Option<serde_json::Value>,
    #[serde(default)]
    pub credentials: Vec<FunctionCredential>,
}

/// Reference to a [`Function`] by name.
#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct FunctionReference {
    pub name: String,
}

/// A credential a pipeline step declares it needs. Only `secret` is
/// implemented (spec.md §6: "Credentials are `oneof {secret{namespace,
/// name}}`").
#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase", tag = "source")]
pub enum FunctionCredential {
    Secret { name: String, namespace: String },
}

impl FunctionCredential {
    #[must_use]
    pub fn step_local_name(&self) -> &str {
        match self {
            FunctionCredential::Secret { name, .. } => name,
        }
    }
}

/// Either a legacy template list or a pipeline, never both (spec.md §4.2:
/// "mixed legacy+pipeline mode... refuse to use").
#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CompositionSpec {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resources: Option<Vec<ComposedTemplate>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pipeline: Option<Vec<PipelineStep>>,
    #[serde(default)]
    pub patch_sets: Vec<PatchSet>,
    /// The XR kind this composition is eligible to compose for (e.g.
    /// `"XPostgreSQLInstance"`).
    pub composite_type_ref: CompositeTypeRef,
}

#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CompositeTypeRef {
    pub api_version: String,
    pub kind: String,
}

impl CompositionSpec {
    /// True for a legacy (template-list) composition.
    #[must_use]
    pub fn is_legacy(&self) -> bool {
        self.resources.is_some()
    }

    /// True for a pipeline-mode composition.
    #[must_use]
    pub fn is_pipeline(&self) -> bool {
        self.pipeline.is_some()
    }

    /// Validate the "mixed mode" and "duplicate template name" invariants
    /// from spec.md §4.2.
    ///
    /// # Errors
    /// Returns a description of the violation if the composition mixes
    /// modes, declares neither mode, or has duplicate template/step names.
    pub fn validate(&self) -> Result<(), String> {
        match (&self.resources, &self.pipeline) {
            (Some(_), Some(_)) => {
                return Err("composition mixes legacy resources and a pipeline".into())
            }
            (None, None) => return Err("composition declares neither resources nor a pipeline".into()),
            _ => {}
        }
        if let Some(templates) = &self.resources {
            let mut seen = std::collections::HashSet::new();
            for template in templates {
                if !seen.insert(&template.name) {
                    return Err(format!("duplicate template name {:?}", template.name));
                }
            }
        }
        if let Some(steps) = &self.pipeline {
            let mut seen = std::collections::HashSet::new();
            for step in steps {
                if !seen.insert(&step.step) {
                    return Err(format!("duplicate pipeline step name {:?}", step.step));
                }
            }
        }
        Ok(())
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, Default, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CompositionStatus {
    #[serde(default)]
    pub conditions: Vec<Condition>,
}

/// A `Composition` binds an XR kind to either a legacy template list or a
/// pipeline of function steps (spec.md §3).
#[derive(CustomResource, Clone, Debug, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "apiextensions.xrm.io",
    version = "v1",
    kind = "Composition",
    plural = "compositions",
    shortname = "comp",
    doc = "Composition binds a composite resource kind to the templates or function pipeline used to render its composed children.",
    printcolumn = r#"{"name":"XR-Kind","type":"string","jsonPath":".spec.compositeTypeRef.kind"}"#
)]
#[kube(status = "CompositionStatus")]
#[serde(rename_all = "camelCase")]
pub struct CompositionSpecRoot(#[serde(flatten)] pub CompositionSpec);

// ============================================================================
// CompositionRevision
// ============================================================================

/// An immutable snapshot of a [`Composition`] at a given generation
/// (spec.md §3). Created by the engine, never edited by users.
#[derive(CustomResource, Clone, Debug, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "apiextensions.xrm.io",
    version = "v1",
    kind = "CompositionRevision",
    plural = "compositionrevisions",
    shortname = "comprev",
    doc = "CompositionRevision is an immutable snapshot of a Composition at a specific generation, used to pin an XR to a known-good composition version."
)]
#[serde(rename_all = "camelCase")]
pub struct CompositionRevisionSpec {
    /// Name of the `Composition` this revision was snapshotted from.
    pub composition_name: String,
    /// Monotonically increasing revision number, scoped to the composition.
    pub revision: i64,
    /// The composition body at the time of the snapshot.
    #[serde(flatten)]
    pub spec: CompositionSpec,
}

// ============================================================================
// Function
// ============================================================================

/// A reference to an external composition-function process reachable over
/// gRPC (spec.md §4.6). Not created per-reconcile; operators register
/// functions once.
#[derive(CustomResource, Clone, Debug, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "apiextensions.xrm.io",
    version = "v1",
    kind = "Function",
    plural = "functions",
    shortname = "fn",
    doc = "Function is a reference to an external composition function process, reachable over gRPC, used by Composition pipelines and Operations."
)]
#[serde(rename_all = "camelCase")]
pub struct FunctionSpec {
    /// `host:port` (or DNS name) the gRPC channel should dial.
    pub target: String,
    #[serde(default)]
    pub tls: bool,
}

// ============================================================================
// Operation
// ============================================================================

#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OperationSpec {
    pub pipeline: Vec<PipelineStep>,
    /// Maximum number of pipeline attempts before the operation is left
    /// terminally failed (spec.md §4.5, I5).
    #[serde(default = "default_retry_limit")]
    pub retry_limit: i32,
}

fn default_retry_limit() -> i32 {
    5
}

#[derive(Clone, Debug, Serialize, Deserialize, Default, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct OperationStatus {
    #[serde(default)]
    pub conditions: Vec<Condition>,
    /// Number of pipeline attempts that have failed so far.
    #[serde(default)]
    pub failures: i32,
    /// Opaque context carried forward between pipeline steps and persisted
    /// so a resumed reconcile can continue from the last completed step's
    /// output rather than losing accumulated context.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pipeline_context: Option<serde_json::Value>,
}

/// A one-shot job that runs an ordered function pipeline and applies the
/// resulting desired resources (spec.md §3, §4.5).
#[derive(CustomResource, Clone, Debug, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "apiextensions.xrm.io",
    version = "v1",
    kind = "Operation",
    plural = "operations",
    shortname = "op",
    doc = "Operation runs an ordered composition-function pipeline exactly once (or up to retryLimit attempts on Fatal results) and applies the resulting desired resources.",
    printcolumn = r#"{"name":"Complete","type":"string","jsonPath":".status.conditions[?(@.type=='Complete')].status"}"#,
    printcolumn = r#"{"name":"Failures","type":"integer","jsonPath":".status.failures"}"#
)]
#[kube(status = "OperationStatus")]
#[serde(rename_all = "camelCase")]
pub struct OperationSpecRoot(#[serde(flatten)] pub OperationSpec);

#[cfg(test)]
#[path = "crd_tests.rs"]
mod tests;
