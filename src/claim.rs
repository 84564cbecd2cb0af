// SPDX-License-Identifier: Apache-2.0

//! Claim access.
//!
//! Like XRs, claim kinds are user-defined (an XRD's `claimNames`), so
//! `Claim` wraps a [`DynamicObject`] the same way [`crate::xr::Composite`]
//! does (spec.md §3, §4.4).

use kube::api::{DynamicObject, ObjectMeta};
use kube::ResourceExt;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::crd::Condition;
use crate::fieldpath;

/// `spec.compositeDeletePolicy`: whether deleting the claim deletes its
/// bound composite, or only removes the claim (spec.md §4.4).
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "PascalCase")]
pub enum CompositeDeletePolicy {
    #[default]
    Background,
    Foreground,
}

#[derive(Clone, Debug)]
pub struct Claim {
    inner: DynamicObject,
}

impl Claim {
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
    pub fn namespace(&self) -> Option<String> {
        self.inner.namespace()
    }

    /// `spec.resourceRef`, the bound composite, present once the claim has
    /// reached `Bound` (spec.md §4.4 state machine).
    #[must_use]
    pub fn resource_ref(&self) -> Option<String> {
        fieldpath::get(self.spec()?, "resourceRef.name")?.as_str().map(String::from)
    }

    pub fn set_resource_ref(&mut self, composite_name: &str) {
        let value = serde_json::json!({ "name": composite_name });
        self.set_spec_field("resourceRef", value);
    }

    #[must_use]
    pub fn composition_ref_name(&self) -> Option<String> {
        fieldpath::get(self.spec()?, "compositionRef.name")?.as_str().map(String::from)
    }

    #[must_use]
    pub fn composition_selector_labels(&self) -> Option<std::collections::BTreeMap<String, String>> {
        let value = fieldpath::get(self.spec()?, "compositionSelector.matchLabels")?;
        serde_json::from_value(value.clone()).ok()
    }

    #[must_use]
    pub fn composite_delete_policy(&self) -> CompositeDeletePolicy {
        self.spec()
            .and_then(|s| fieldpath::get(s, "compositeDeletePolicy"))
            .and_then(|v| serde_json::from_value(v.clone()).ok())
            .unwrap_or_default()
    }

    #[must_use]
    pub fn write_connection_secret_name(&self) -> Option<String> {
        fieldpath::get(self.spec()?, "writeConnectionSecretToRef.name")?
            .as_str()
            .map(String::from)
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
#[path = "claim_tests.rs"]
mod tests;
