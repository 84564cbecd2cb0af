// SPDX-License-Identifier: Apache-2.0

//! Template Associator: matches existing composed children to composition
//! templates by the stable `composition-resource-name` annotation, and
//! garbage-collects children whose template has disappeared (spec.md
//! §4.3.2).

use kube::api::DynamicObject;
use kube::ResourceExt;

use crate::constants::ANNOTATION_COMPOSITION_RESOURCE_NAME;
use crate::crd::ComposedTemplate;
use crate::labels::{child_name, generate_suffix};
use crate::xr::ResourceRef;

/// One template paired with either its existing child reference or a
/// freshly generated name for a child that does not exist yet.
#[derive(Clone, Debug)]
pub struct Association {
    pub template: ComposedTemplate,
    pub existing_ref: Option<ResourceRef>,
    pub generated_name: Option<String>,
}

impl Association {
    /// The name this template's child has (or will have) this tick.
    #[must_use]
    pub fn child_name(&self) -> &str {
        match (&self.existing_ref, &self.generated_name) {
            (Some(existing), _) => &existing.name,
            (None, Some(generated)) => generated,
            (None, None) => unreachable!("an Association always carries one of the two"),
        }
    }
}

/// Associate `templates` against the XR's recorded `resource_refs` and its
/// observed children (fetched from the store/API by the caller, passed here
/// as `observed_children` so this function stays pure). Returns the
/// per-template associations in template order, plus the refs of children
/// that no longer match any template and should be scheduled for deletion
/// (spec.md §4.3.2: "children with no matching template are scheduled for
/// deletion").
///
/// Invariant upheld: a template's name is stable, and once a child is
/// associated to a template by annotation, subsequent calls with the same
/// inputs return the same association (spec.md §4.3.2 invariant).
pub fn associate(
    composite_name: &str,
    composite_suffix: &str,
    templates: &[ComposedTemplate],
    resource_refs: &[ResourceRef],
    observed_children: &[DynamicObject],
) -> (Vec<Association>, Vec<ResourceRef>) {
    let mut associations = Vec::with_capacity(templates.len());
    let mut matched_ref_names = std::collections::HashSet::new();

    for template in templates {
        let existing_ref = find_child_for_template(&template.name, resource_refs, observed_children);
        let generated_name = if existing_ref.is_none() {
            Some(child_name(composite_name, composite_suffix, &template.name))
        } else {
            None
        };
        if let Some(existing) = &existing_ref {
            matched_ref_names.insert(existing.name.clone());
        }
        associations.push(Association { template: template.clone(), existing_ref, generated_name });
    }

    let orphans = resource_refs
        .iter()
        .filter(|r| !matched_ref_names.contains(&r.name))
        .cloned()
        .collect();

    (associations, orphans)
}

fn find_child_for_template(
    template_name: &str,
    resource_refs: &[ResourceRef],
    observed_children: &[DynamicObject],
) -> Option<ResourceRef> {
    let matching_child = observed_children.iter().find(|child| {
        child.annotations().get(ANNOTATION_COMPOSITION_RESOURCE_NAME).map(String::as_str)
            == Some(template_name)
    })?;
    let name = matching_child.name_any();
    resource_refs.iter().find(|r| r.name == name).cloned()
}

/// A fresh DNS-label-safe suffix for a composite's children, generated once
/// and recorded in the XR spec (spec.md §4.3.1: "ensure the XR has a
/// generated name suffix for its children if not already recorded").
#[must_use]
pub fn new_child_suffix() -> String {
    generate_suffix()
}

#[cfg(test)]
#[path = "associator_tests.rs"]
mod tests;
