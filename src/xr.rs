// SPDX-License-Identifier: Apache-2.0

//! Composite resource (XR) access.
//!
//! XR kinds are user-defined: an XRD can declare any group, version, and
//! kind, so the engine cannot derive a static `CustomResource` type for
//! them the way it does for [`crate::crd::Composition`]. Instead `Composite`
//! wraps a [`DynamicObject`] and exposes the handful of well-known spec and
//! status fields every XR carries (spec.md §3, §4.3).

use kube::api::{DynamicObject, ObjectMeta};
use kube::ResourceExt;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::claim::CompositeDeletePolicy;
use crate::crd::Condition;
use crate::fieldpath;

/// A reference to a `Composition`, either a legacy name or a pinned
/// `CompositionRevision`.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct CompositionRef {
    pub name: String,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct CompositionRevisionRef {
    pub name: String,
}

/// `spec.compositionUpdatePolicy`: whether the engine may move the XR to a
/// newer composition revision automatically (spec.md §4.2).
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "PascalCase")]
pub enum CompositionUpdatePolicy {
    #[default]
    Automatic,
    Manual,
}

/// One entry of `spec.resourceRefs`, a stable pointer to a composed child by
/// API version/kind/name (spec.md I1: indices never change after first
/// assignment).
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ResourceRef {
    pub api_version: String,
    pub kind: String,
    pub name: String,
}

/// A wrapper over a [`DynamicObject`] presenting the fixed subset of an XR's
/// shape the engine depends on. Fields beyond this subset are left
/// untouched in `data` when the object is re-serialized.
#[derive(Clone, Debug)]
pub struct Composite {
    inner: DynamicObject,
}

impl Composite {
    #[must_use]
    pub fn new(inner: DynamicObject) -> Self {
        Self { inner }
    }

    #[must_use]
    pub fn into_inner(self) -> DynamicObject {
        self.inner
    }

    #[must_use]
    pub fn inner(&self) -> &DynamicObject {
        &self.inner
    }

    #[must_use]
    pub fn metadata(&self) -> &ObjectMeta {
        &self.inner.metadata
    }

    #[must_use]
    pub fn name(&self) -> String {
        self.inner.name_any()
    }

    #[must_use]
    pub fn uid(&self) -> Option<String> {
        self.inner.uid()
    }

    #[must_use]
    pub fn generation(&self) -> Option<i64> {
        self.inner.meta().generation
    }

    /// `spec.compositionRef.name`, if set.
    #[must_use]
    pub fn composition_ref(&self) -> Option<CompositionRef> {
        let name = fieldpath::get(self.spec()?, "compositionRef.name")?.as_str()?.to_string();
        Some(CompositionRef { name })
    }

    /// Record the selected composition's name (spec.md §4.2: "the selection
    /// is recorded back into the XR"), so a later tick's selector-based
    /// resolution is stable even if matching labels change.
    pub fn set_composition_ref(&mut self, name: &str) {
        let value = serde_json::json!({ "name": name });
        self.set_spec_field("compositionRef", value);
    }

    /// `spec.compositionRevisionRef.name`, if the XR is pinned to an
    /// immutable revision.
    #[must_use]
    pub fn composition_revision_ref(&self) -> Option<CompositionRevisionRef> {
        let name = fieldpath::get(self.spec()?, "compositionRevisionRef.name")?
            .as_str()?
            .to_string();
        Some(CompositionRevisionRef { name })
    }

    /// Record the revision observed for an `Automatic`-policy live
    /// resolution (spec.md §4.2 rule 2: "also pin to its current
    /// revision"). Informational only — `Automatic` policy still re-resolves
    /// the live composition every tick; this does not gate selection.
    pub fn set_composition_revision_ref(&mut self, name: &str) {
        let value = serde_json::json!({ "name": name });
        self.set_spec_field("compositionRevisionRef", value);
    }

    /// `spec.compositionSelector.matchLabels`, if set.
    #[must_use]
    pub fn composition_selector_labels(&self) -> Option<std::collections::BTreeMap<String, String>> {
        let value = fieldpath::get(self.spec()?, "compositionSelector.matchLabels")?;
        serde_json::from_value(value.clone()).ok()
    }

    /// Mirror a claim's `compositionSelector` onto the XR it creates (spec.md
    /// §4.4 Unbound: "propagate spec").
    pub fn set_composition_selector_labels(&mut self, labels: &std::collections::BTreeMap<String, String>) {
        let value = serde_json::json!({ "matchLabels": labels });
        self.set_spec_field("compositionSelector", value);
    }

    #[must_use]
    pub fn composition_update_policy(&self) -> CompositionUpdatePolicy {
        self.spec()
            .and_then(|s| fieldpath::get(s, "compositionUpdatePolicy"))
            .and_then(|v| serde_json::from_value(v.clone()).ok())
            .unwrap_or_default()
    }

    /// `spec.claimRef`, present once a claim has bound to this XR
    /// (spec.md I3, bind-once).
    #[must_use]
    pub fn claim_ref(&self) -> Option<(String, String)> {
        let claim_ref = fieldpath::get(self.spec()?, "claimRef")?;
        let namespace = claim_ref.get("namespace")?.as_str()?.to_string();
        let name = claim_ref.get("name")?.as_str()?.to_string();
        Some((namespace, name))
    }

    /// Record the claim that created this XR, including its UID (spec.md
    /// §4.4 invariant: "the XR created by the reconciler has the claim's
    /// UID in `claimRef`"). Written once, at XR creation; bind-once (I3)
    /// means it is never rewritten after.
    pub fn set_claim_ref(&mut self, namespace: &str, name: &str, uid: &str) {
        let value = serde_json::json!({ "namespace": namespace, "name": name, "uid": uid });
        self.set_spec_field("claimRef", value);
    }

    #[must_use]
    pub fn resource_refs(&self) -> Vec<ResourceRef> {
        self.spec()
            .and_then(|s| fieldpath::get(s, "resourceRefs"))
            .and_then(|v| serde_json::from_value(v.clone()).ok())
            .unwrap_or_default()
    }

    pub fn set_resource_refs(&mut self, refs: &[ResourceRef]) {
        let value = serde_json::to_value(refs).expect("ResourceRef always serializes");
        self.set_spec_field("resourceRefs", value);
    }

    #[must_use]
    pub fn write_connection_secret_name(&self) -> Option<String> {
        fieldpath::get(self.spec()?, "writeConnectionSecretToRef.name")?
            .as_str()
            .map(String::from)
    }

    pub fn set_write_connection_secret_name(&mut self, name: &str) {
        let value = serde_json::json!({ "name": name });
        self.set_spec_field("writeConnectionSecretToRef", value);
    }

    /// `spec.compositeDeletePolicy`, mirrored down from the bound claim at
    /// creation time (spec.md §3: "governed by the claim's composite-delete
    /// policy"). Defaults to `Background` for a claimless XR.
    #[must_use]
    pub fn composite_delete_policy(&self) -> CompositeDeletePolicy {
        self.spec()
            .and_then(|s| fieldpath::get(s, "compositeDeletePolicy"))
            .and_then(|v| serde_json::from_value(v.clone()).ok())
            .unwrap_or_default()
    }

    pub fn set_composite_delete_policy(&mut self, policy: CompositeDeletePolicy) {
        let value = serde_json::to_value(policy).expect("CompositeDeletePolicy always serializes");
        self.set_spec_field("compositeDeletePolicy", value);
    }

    /// A stable, DNS-label-safe suffix for naming this composite's children
    /// (spec.md §4.3.1: "ensure the XR has a generated name suffix for its
    /// children if not already recorded").
    #[must_use]
    pub fn child_suffix(&self) -> Option<String> {
        fieldpath::get(self.spec()?, "resourceNameSuffix")?.as_str().map(String::from)
    }

    pub fn set_child_suffix(&mut self, suffix: &str) {
        self.set_spec_field("resourceNameSuffix", serde_json::Value::String(suffix.to_string()));
    }

    /// Write an arbitrary top-level `spec` field by key. Used by the
    /// Composite Reconciler's configuration chain to propagate a
    /// composition base object's declared defaults (spec.md §4.3.1b).
    pub fn set_spec_field_pub(&mut self, key: &str, value: Value) {
        self.set_spec_field(key, value);
    }

    #[must_use]
    pub fn conditions(&self) -> Vec<Condition> {
        self.status()
            .and_then(|s| s.get("conditions"))
            .and_then(|v| serde_json::from_value(v.clone()).ok())
            .unwrap_or_default()
    }

    pub fn set_conditions(&mut self, conditions: &[Condition]) {
        let value = serde_json::to_value(conditions).expect("Condition always serializes");
        self.set_status_field("conditions", value);
    }

    fn spec(&self) -> Option<&Value> {
        self.inner.data.get("spec")
    }

    fn status(&self) -> Option<&Value> {
        self.inner.data.get("status")
    }

    /// A mutable handle to `spec`, creating an empty object if absent. Used
    /// by the Composite Reconciler's configuration chain, which writes
    /// composition-declared fields that are always spec-relative.
    pub fn spec_mut(&mut self) -> &mut Value {
        self.inner
            .data
            .as_object_mut()
            .expect("DynamicObject.data is always a JSON object")
            .entry("spec")
            .or_insert_with(|| Value::Object(Default::default()))
    }

    /// A mutable handle to the whole document (`spec` and `status` both),
    /// for the reverse-patch step: a `toFieldPath` is resolved against the
    /// full composite the same way a `fromFieldPath` is resolved against
    /// the full composed child, so it may target either `spec.*` or
    /// `status.*` (spec.md §4.3.5).
    pub fn data_mut(&mut self) -> &mut Value {
        &mut self.inner.data
    }

    fn set_spec_field(&mut self, path: &str, value: Value) {
        let spec = self
            .inner
            .data
            .as_object_mut()
            .expect("DynamicObject.data is always a JSON object")
            .entry("spec")
            .or_insert_with(|| Value::Object(Default::default()));
        fieldpath::set(spec, path, value);
    }

    fn set_status_field(&mut self, path: &str, value: Value) {
        let status = self
            .inner
            .data
            .as_object_mut()
            .expect("DynamicObject.data is always a JSON object")
            .entry("status")
            .or_insert_with(|| Value::Object(Default::default()));
        fieldpath::set(status, path, value);
    }
}

#[cfg(test)]
#[path = "xr_tests.rs"]
mod tests;
