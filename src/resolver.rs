// SPDX-License-Identifier: Apache-2.0

//! Composition Resolver: turns an XR's spec into a concrete composition to
//! render against this reconcile tick (spec.md §4.2).

use kube::ResourceExt;

use crate::crd::{Composition, CompositionRevision};
use crate::xr::{Composite, CompositionUpdatePolicy};

/// The outcome of a successful selection: either a composition pinned by a
/// revision, or a live composition (optionally pinned going forward).
#[derive(Clone, Debug)]
pub enum Resolved {
    /// `compositionRevisionRef` was set under `Manual` policy: use the
    /// revision's frozen spec (spec.md §4.2 rule 1).
    Revision(CompositionRevision),
    /// `compositionRef` or `compositionSelector` resolved to a live
    /// composition (spec.md §4.2 rules 2-3).
    Live(Composition),
}

/// Why resolution failed, mirroring spec.md §4.2's failure table.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ResolveError {
    /// The referenced composition or revision does not exist. Transient:
    /// callers should surface `Synced=False` and retry shortly.
    NotFound { name: String },
    /// A label selector matched more than one composition with no
    /// tie-breaker able to resolve it (never actually returned today, since
    /// lexicographic name always breaks ties — kept for forwards
    /// compatibility with spec.md §9's open question on tie-break policy).
    MultipleMatch { names: Vec<String> },
    /// The selector matched zero compositions.
    NoMatch,
    /// The resolved composition fails its own shape validation (mixed
    /// legacy+pipeline, duplicate names).
    Invalid { reason: String },
}

impl std::fmt::Display for ResolveError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResolveError::NotFound { name } => write!(f, "composition {name:?} not found"),
            ResolveError::MultipleMatch { names } => {
                write!(f, "selector matched multiple compositions with no tie-break: {names:?}")
            }
            ResolveError::NoMatch => write!(f, "selector matched no compositions"),
            ResolveError::Invalid { reason } => write!(f, "composition is invalid: {reason}"),
        }
    }
}

impl std::error::Error for ResolveError {}

/// Resolve a composition for `xr` against the candidate compositions and
/// revisions visible in the reflector stores.
///
/// Selection order (spec.md §4.2, first match wins):
/// 1. `compositionRevisionRef` set under `Manual` policy → that revision.
/// 2. `compositionRef` set → fetch by name.
/// 3. `compositionSelector` set → enumerate label matches, tie-break
///    lexicographically by name.
///
/// # Errors
/// Returns [`ResolveError`] per spec.md §4.2's failure table. Callers are
/// responsible for surfacing the returned `Synced=False` condition; this
/// function only selects, it does not write status.
pub fn resolve(
    xr: &Composite,
    compositions: &[Composition],
    revisions: &[CompositionRevision],
) -> Result<Resolved, ResolveError> {
    if xr.composition_update_policy() == CompositionUpdatePolicy::Manual {
        if let Some(revision_ref) = xr.composition_revision_ref() {
            let revision = revisions
                .iter()
                .find(|r| r.name_any() == revision_ref.name)
                .ok_or_else(|| ResolveError::NotFound { name: revision_ref.name.clone() })?;
            validate(&revision.spec.spec)?;
            return Ok(Resolved::Revision(revision.clone()));
        }
    }

    if let Some(composition_ref) = xr.composition_ref() {
        let composition = compositions
            .iter()
            .find(|c| c.name_any() == composition_ref.name)
            .ok_or_else(|| ResolveError::NotFound { name: composition_ref.name.clone() })?;
        validate(&composition.spec.0)?;
        return Ok(Resolved::Live(composition.clone()));
    }

    if let Some(want_labels) = xr.composition_selector_labels() {
        let mut matches: Vec<&Composition> =
            compositions.iter().filter(|c| label_selector_matches(&want_labels, &c.labels())).collect();
        if matches.is_empty() {
            return Err(ResolveError::NoMatch);
        }
        matches.sort_by(|a, b| a.name_any().cmp(&b.name_any()));
        let chosen = matches[0];
        validate(&chosen.spec.0)?;
        return Ok(Resolved::Live(chosen.clone()));
    }

    Err(ResolveError::NoMatch)
}

fn label_selector_matches(
    want: &std::collections::BTreeMap<String, String>,
    have: &std::collections::BTreeMap<String, String>,
) -> bool {
    want.iter().all(|(k, v)| have.get(k) == Some(v))
}

fn validate(spec: &crate::crd::CompositionSpec) -> Result<(), ResolveError> {
    spec.validate().map_err(|reason| ResolveError::Invalid { reason })
}

#[cfg(test)]
#[path = "resolver_tests.rs"]
mod tests;
