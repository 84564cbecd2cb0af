// SPDX-License-Identifier: Apache-2.0

//! Global constants for the composition reconciliation engine.
//!
//! Constants are organized by category for easy maintenance, following the
//! same grouping the teacher crate uses for its operator-wide constants.

// ============================================================================
// API constants — the engine's own fixed CRDs
// ============================================================================

/// API group for the engine's own CRDs (Composition, CompositionRevision,
/// Operation, Function). XR and Claim kinds are user-defined and carry
/// whatever group their XRD declares.
pub const API_GROUP: &str = "apiextensions.xrm.io";

/// API version for the engine's own CRDs.
pub const API_VERSION: &str = "v1";

/// Fully qualified API version (group/version).
pub const API_GROUP_VERSION: &str = "apiextensions.xrm.io/v1";

/// Kind name for the `Composition` resource.
pub const KIND_COMPOSITION: &str = "Composition";

/// Kind name for the `CompositionRevision` resource.
pub const KIND_COMPOSITION_REVISION: &str = "CompositionRevision";

/// Kind name for the `Operation` resource.
pub const KIND_OPERATION: &str = "Operation";

/// Kind name for the `Function` resource.
pub const KIND_FUNCTION: &str = "Function";

/// Generic label used for metrics/log tagging of a reconciled composite.
pub const KIND_COMPOSITE: &str = "Composite";

/// Generic label used for metrics/log tagging of a reconciled claim.
pub const KIND_CLAIM: &str = "Claim";

/// Namespace a cluster-scoped XR's connection secret is published into when
/// the XR itself carries no namespace (spec.md §3: "cluster- or
/// namespace-scoped"). Mirrors the default lease namespace so a single
/// system namespace convention covers both leader election and
/// cluster-scoped XR secrets.
pub const DEFAULT_SYSTEM_NAMESPACE: &str = "crossplane-system";

// ============================================================================
// Annotations & labels (spec.md §4.3.2, §4.3.3)
// ============================================================================

/// Annotation stamped on every composed child, recording which composition
/// template produced it. The Template Associator uses this to re-match
/// children to templates across reconciles without relying on ordering.
pub const ANNOTATION_COMPOSITION_RESOURCE_NAME: &str = "xrm.io/composition-resource-name";

/// Label stamped on every composed child pointing back at the owning
/// composite's name.
pub const LABEL_COMPOSITE: &str = "xrm.io/composite";

/// Annotation recording the composition's `metadata.generation` that was
/// used to render a composite, so drift in the composition itself can be
/// detected without re-fetching it on every tick.
pub const ANNOTATION_COMPOSITION_GENERATION: &str = "xrm.io/composition-generation";

// ============================================================================
// Finalizers
// ============================================================================

/// Finalizer held by the Composite Reconciler on every XR it manages.
pub const FINALIZER_COMPOSITE: &str = "composite.xrm.io/finalizer";

/// Finalizer held by the Claim Reconciler on every claim it manages.
pub const FINALIZER_CLAIM: &str = "claim.xrm.io/finalizer";

/// Finalizer held by the Operation Reconciler on resources it owns via
/// patches, mirroring the composite finalizer's purpose.
pub const FINALIZER_OPERATION: &str = "operation.xrm.io/finalizer";

// ============================================================================
// Conditions (spec.md §7)
// ============================================================================

/// The `Synced` condition type: true once the desired state (composition,
/// resourceRefs, applied children) has been computed and written.
pub const CONDITION_SYNCED: &str = "Synced";

/// The `Ready` condition type: true once every rendered child reports ready.
pub const CONDITION_READY: &str = "Ready";

/// The `Complete` condition type used by Operations.
pub const CONDITION_COMPLETE: &str = "Complete";

pub const STATUS_TRUE: &str = "True";
pub const STATUS_FALSE: &str = "False";
pub const STATUS_UNKNOWN: &str = "Unknown";

// ============================================================================
// Requeue intervals (spec.md §4.3.5, §5)
// ============================================================================

/// Requeue interval after a transient error, across all three reconcilers.
pub const REQUEUE_TRANSIENT_SECS: u64 = 30;

/// Requeue interval for drift correction after a fully successful composite
/// reconcile.
pub const REQUEUE_DRIFT_SECS: u64 = 60;

/// Per-reconcile deadline for the Composite and Claim reconcilers.
pub const RECONCILE_DEADLINE_SECS: u64 = 90;

/// Per-reconcile deadline for the Operation reconciler (function pipelines
/// can be slower than a single apply).
pub const OPERATION_RECONCILE_DEADLINE_SECS: u64 = 120;

// ============================================================================
// Leader election defaults (mirrors the teacher's lease configuration)
// ============================================================================

pub const DEFAULT_LEASE_DURATION_SECS: u64 = 15;
pub const DEFAULT_LEASE_RENEW_DEADLINE_SECS: u64 = 10;
pub const DEFAULT_LEASE_RETRY_PERIOD_SECS: u64 = 2;

// ============================================================================
// Kubernetes client tuning
// ============================================================================

pub const KUBE_CLIENT_QPS: f32 = 50.0;
pub const KUBE_CLIENT_BURST: u32 = 100;
pub const TOKIO_WORKER_THREADS: usize = 4;

// ============================================================================
// Metrics server
// ============================================================================

pub const METRICS_SERVER_BIND_ADDRESS: &str = "0.0.0.0";
pub const METRICS_SERVER_PORT: u16 = 8080;
pub const METRICS_SERVER_PATH: &str = "/metrics";

// ============================================================================
// Function Runner Client (spec.md §4.6, §6)
// ============================================================================

/// Default dial timeout for the function-runner gRPC channel.
pub const FUNCTION_RUNNER_DIAL_TIMEOUT_SECS: u64 = 5;

/// Default per-call timeout for `RunFunction`.
pub const FUNCTION_RUNNER_CALL_TIMEOUT_SECS: u64 = 30;
