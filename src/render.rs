// SPDX-License-Identifier: Apache-2.0

//! Render pipeline: turns one composition template plus an XR snapshot into
//! a desired composed-child object (spec.md §4.3.3).
//!
//! Rendering is optimistic (§4.3.3: "a template that fails to render is
//! marked failed-this-tick... other templates proceed") and pure: given the
//! same `(XR snapshot, template, previously observed children)` it always
//! produces the same desired object (spec.md §8, round-trip properties).

use kube::api::{DynamicObject, ObjectMeta, TypeMeta};
use serde_json::Value;

use crate::constants::{ANNOTATION_COMPOSITION_RESOURCE_NAME, LABEL_COMPOSITE};
use crate::crd::ComposedTemplate;
use crate::owner::controller_owner_reference;
use crate::patch::{self, PatchError};

/// Why rendering a single template failed this tick. Never aborts the
/// whole composite reconcile; the caller records this as a per-template
/// condition and moves on (spec.md §4.3.3, §7 "Render failure").
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RenderError {
    pub template: String,
    pub reason: String,
}

impl std::fmt::Display for RenderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "template {:?} failed to render: {}", self.template, self.reason)
    }
}

impl std::error::Error for RenderError {}

impl From<(&str, PatchError)> for RenderError {
    fn from((template, err): (&str, PatchError)) -> Self {
        RenderError { template: template.to_string(), reason: err.to_string() }
    }
}

/// Render one template against `composite_spec`, stamping owner reference,
/// labels, and the `composition-resource-name` annotation onto the result
/// (spec.md §4.3.3 steps 1-3).
///
/// # Errors
/// Returns [`RenderError`] if a required `fromCompositeFieldPath` patch's
/// source field is absent.
pub fn render(
    template: &ComposedTemplate,
    child_name: &str,
    composite_spec: &Value,
    composite_name: &str,
    composite_api_version: &str,
    composite_kind: &str,
    composite_uid: &str,
    block_owner_deletion: bool,
) -> Result<DynamicObject, RenderError> {
    let mut data = template.base.clone();
    patch::apply_from_composite(&template.patches, composite_spec, &mut data)
        .map_err(|e| (template.name.as_str(), e))?;

    let api_version =
        data.get("apiVersion").and_then(Value::as_str).unwrap_or_default().to_string();
    let kind = data.get("kind").and_then(Value::as_str).unwrap_or_default().to_string();

    let mut labels = std::collections::BTreeMap::new();
    labels.insert(LABEL_COMPOSITE.to_string(), composite_name.to_string());
    let mut annotations = std::collections::BTreeMap::new();
    annotations.insert(ANNOTATION_COMPOSITION_RESOURCE_NAME.to_string(), template.name.clone());

    let owner = controller_owner_reference(
        composite_api_version,
        composite_kind,
        composite_name,
        composite_uid,
        block_owner_deletion,
    );

    let metadata = ObjectMeta {
        name: Some(child_name.to_string()),
        labels: Some(labels),
        annotations: Some(annotations),
        owner_references: Some(vec![owner]),
        ..Default::default()
    };

    // `apiVersion`/`kind`/`metadata` belong on the envelope (`types`,
    // `metadata`), not duplicated into the flattened `data`.
    if let Some(object) = data.as_object_mut() {
        object.remove("apiVersion");
        object.remove("kind");
        object.remove("metadata");
    }

    Ok(DynamicObject {
        types: Some(TypeMeta { api_version, kind }),
        metadata,
        data,
    })
}

#[cfg(test)]
#[path = "render_tests.rs"]
mod tests;
