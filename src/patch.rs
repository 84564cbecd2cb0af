// SPDX-License-Identifier: Apache-2.0

//! Patch application: copying fields between a composite and a composed
//! child along a [`crate::fieldpath`] (spec.md §4.3.3, §4.3.5).
//!
//! Named patch-sets are inlined into their referring templates before any
//! patch runs (spec.md §4.3.2: "pure function; idempotent"). [`Patch`]
//! itself is defined in [`crate::crd`]; this module only applies it.

use serde_json::Value;

use crate::crd::{Patch, PatchPolicy, PatchSet};
use crate::fieldpath;

/// Why a patch failed to apply.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PatchError {
    /// A `Required` source field path was absent (spec.md §4.3.3: a
    /// template that fails to render is marked failed-this-tick).
    MissingRequiredField { field_path: String },
    /// A patch-set reference named a set that does not exist on the
    /// composition.
    UnknownPatchSet { name: String },
}

impl std::fmt::Display for PatchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PatchError::MissingRequiredField { field_path } => {
                write!(f, "required field path {field_path:?} was not present in the source")
            }
            PatchError::UnknownPatchSet { name } => write!(f, "no patch-set named {name:?}"),
        }
    }
}

impl std::error::Error for PatchError {}

/// Replace every [`Patch::PatchSet`] reference in `patches` with the
/// referenced set's own patches, in place. Idempotent: running it twice on
/// already-inlined patches is a no-op since no `PatchSet` variants remain.
///
/// # Errors
/// Returns [`PatchError::UnknownPatchSet`] if a reference names a set the
/// composition does not define.
pub fn inline_patch_sets(patches: &[Patch], sets: &[PatchSet]) -> Result<Vec<Patch>, PatchError> {
    let mut inlined = Vec::with_capacity(patches.len());
    for patch in patches {
        match patch {
            Patch::PatchSet { patch_set_name } => {
                let set = sets
                    .iter()
                    .find(|s| &s.name == patch_set_name)
                    .ok_or_else(|| PatchError::UnknownPatchSet { name: patch_set_name.clone() })?;
                inlined.extend(set.patches.iter().cloned());
            }
            other => inlined.push(other.clone()),
        }
    }
    Ok(inlined)
}

fn is_required(policy: &Option<PatchPolicy>) -> bool {
    policy.as_ref().is_some_and(|p| p.from_field_path_is_required)
}

/// Apply every `FromCompositeFieldPath` patch in `patches`, copying from
/// `composite_spec` into `child` (spec.md §4.3.3 step 2, render direction).
///
/// # Errors
/// Returns the first [`PatchError::MissingRequiredField`] encountered for a
/// patch whose policy marks the source required.
pub fn apply_from_composite(
    patches: &[Patch],
    composite_spec: &Value,
    child: &mut Value,
) -> Result<(), PatchError> {
    for patch in patches {
        if let Patch::FromCompositeFieldPath { from_field_path, to_field_path, policy } = patch {
            match fieldpath::get(composite_spec, from_field_path) {
                Some(value) => fieldpath::set(child, to_field_path, value.clone()),
                None if is_required(policy) => {
                    return Err(PatchError::MissingRequiredField { field_path: from_field_path.clone() })
                }
                None => {}
            }
        }
    }
    Ok(())
}

/// Apply every `ToCompositeFieldPath` patch in `patches`, copying observed
/// child fields back into the composite (spec.md §4.3.5, observe
/// direction). Unlike render, a missing source here is never fatal: an
/// observed child may simply not have populated the field yet. `composite`
/// is the whole composite document (`spec` and `status` both), since
/// `to_field_path` may target either half, mirroring how `from_field_path`
/// is resolved against the whole observed child above.
pub fn apply_to_composite(patches: &[Patch], child: &Value, composite: &mut Value) {
    for patch in patches {
        if let Patch::ToCompositeFieldPath { from_field_path, to_field_path, .. } = patch {
            if let Some(value) = fieldpath::get(child, from_field_path) {
                fieldpath::set(composite, to_field_path, value.clone());
            }
        }
    }
}

#[cfg(test)]
#[path = "patch_tests.rs"]
mod tests;
