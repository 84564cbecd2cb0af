// SPDX-License-Identifier: Apache-2.0

//! Error taxonomy for the reconciliation engine.
//!
//! Every reconciler entry point returns [`EngineError`] rather than a bare
//! `anyhow::Error` so that `error_policy` can branch on the error *kind*
//! instead of inspecting message strings. Internal helpers still use
//! `anyhow::Result` for ergonomic `?`-propagation, and are converted into
//! the appropriate [`EngineError`] variant at the reconciler boundary.

use std::time::Duration;

/// Classifies a failure the way spec.md §7 does, so the manager can decide
/// whether to retry, how fast, and whether to surface a condition.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// The primary object (the one the reconciler was invoked for) is gone.
    /// Policy: drop the key, no retry.
    #[error("primary object not found")]
    NotFoundPrimary,

    /// A related object (composition, revision, secret, function) could not
    /// be found. Policy: transient, surface a condition, short retry.
    #[error("related object not found: {0}")]
    NotFoundRelated(String),

    /// A write lost the optimistic-concurrency race. Policy: return with no
    /// error and no explicit requeue; the watch event for the new version
    /// will re-trigger the reconcile.
    #[error("resource version conflict")]
    Conflict,

    /// A composition, template, or XRD schema failed validation. Policy:
    /// fatal for this tick, surface `Synced=False`, no automatic retry.
    #[error("validation failed: {0}")]
    Validation(String),

    /// Rendering a single template failed. Policy: per-template failure,
    /// other templates still proceed; never aborts the whole reconcile.
    #[error("render failed for template {template}: {reason}")]
    RenderFailed { template: String, reason: String },

    /// A composition function returned a `Fatal` result. Policy: increments
    /// the operation's failure counter and checks the retry limit.
    #[error("function {function} returned a fatal result: {message}")]
    FunctionFatal { function: String, message: String },

    /// A credential referenced by a pipeline step could not be resolved.
    /// Policy: counts as a step failure.
    #[error("credential resolution failed for step {step}: {reason}")]
    CredentialResolution { step: String, reason: String },

    /// A server-side apply or patch call failed. Policy: transient, short
    /// retry.
    #[error("apply failed: {0}")]
    Apply(String),

    /// No composition matched a label selector, or more than one matched
    /// with no tie-breaker. Policy: `MultipleMatch` with no tie-breaker is
    /// fatal-for-tick; zero matches is also fatal-for-tick.
    #[error("composition selection failed: {0}")]
    SelectionFailed(String),

    /// The reconcile's cancellation token fired. Policy: propagate, no
    /// status write.
    #[error("reconcile canceled")]
    Canceled,

    /// Catch-all for unexpected failures from the Kubernetes API or other
    /// infrastructure. Policy: transient, short retry.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl EngineError {
    /// True if the watch/re-enqueue machinery should not schedule any retry
    /// at all (the object is gone, or the failure requires user
    /// intervention).
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            EngineError::NotFoundPrimary | EngineError::Conflict | EngineError::Canceled
        )
    }

    /// Backoff duration to use for a transient failure of this kind. Fatal
    /// and terminal kinds return `None`, signaling "do not requeue from
    /// `error_policy`" (terminal) or "validation already surfaced a
    /// condition, requeue on the longer drift interval instead" (fatal).
    #[must_use]
    pub fn requeue_after(&self) -> Option<Duration> {
        match self {
            EngineError::NotFoundPrimary | EngineError::Conflict | EngineError::Canceled => None,
            EngineError::NotFoundRelated(_) | EngineError::Apply(_) | EngineError::Other(_) => {
                Some(Duration::from_secs(30))
            }
            EngineError::Validation(_)
            | EngineError::SelectionFailed(_)
            | EngineError::RenderFailed { .. } => Some(Duration::from_secs(60)),
            EngineError::FunctionFatal { .. } | EngineError::CredentialResolution { .. } => {
                Some(Duration::from_secs(15))
            }
        }
    }

    /// A short machine-readable reason string suitable for a condition's
    /// `reason` field.
    #[must_use]
    pub fn condition_reason(&self) -> &'static str {
        match self {
            EngineError::NotFoundPrimary => "NotFound",
            EngineError::NotFoundRelated(_) => "GetComposition",
            EngineError::Conflict => "Conflict",
            EngineError::Validation(_) => "CompositionInvalid",
            EngineError::RenderFailed { .. } => "RenderFailed",
            EngineError::FunctionFatal { .. } => "FunctionFatal",
            EngineError::CredentialResolution { .. } => "CredentialResolutionFailed",
            EngineError::Apply(_) => "ApplyFailed",
            EngineError::SelectionFailed(_) => "CompositionSelectionFailed",
            EngineError::Canceled => "Canceled",
            EngineError::Other(_) => "InternalError",
        }
    }
}

#[cfg(test)]
#[path = "errors_tests.rs"]
mod tests;
