// SPDX-License-Identifier: Apache-2.0

//! CRD Markdown documentation generator.
//!
//! Generates markdown API reference documentation from the Rust CRD types in
//! `src/crd.rs`. This ensures the reference docs stay in sync with the code.
//!
//! Usage:
//!   cargo run --bin crddoc > docs/reference/api.md

use k8s_openapi::apiextensions_apiserver::pkg::apis::apiextensions::v1::JSONSchemaProps;
use kube::{CustomResourceExt, Resource};
use xrm_engine::crd::{Composition, CompositionRevision, Function, Operation};

fn main() {
    println!("# API Reference");
    println!();
    println!("This document describes the Custom Resource Definitions (CRDs) owned by the composition reconciliation engine.");
    println!();
    println!("> **Note**: This file is AUTO-GENERATED from `src/crd.rs`");
    println!("> DO NOT EDIT MANUALLY - Run `cargo run --bin crddoc` to regenerate");
    println!();

    println!("## Table of Contents");
    println!();
    println!("- [Composition](#composition)");
    println!("- [CompositionRevision](#compositionrevision)");
    println!("- [Operation](#operation)");
    println!("- [Function](#function)");
    println!();

    generate_crd_doc::<Composition>();
    generate_crd_doc::<CompositionRevision>();
    generate_crd_doc::<Operation>();
    generate_crd_doc::<Function>();
}

fn generate_crd_doc<T>()
where
    T: CustomResourceExt + Resource<DynamicType = ()>,
{
    let crd = T::crd();
    let kind = T::kind(&());
    let group = T::group(&());
    let version = T::version(&());

    let default_desc = format!("{kind} Custom Resource");
    let description = crd
        .spec
        .versions
        .first()
        .and_then(|v| v.schema.as_ref())
        .and_then(|s| s.open_api_v3_schema.as_ref())
        .and_then(|schema| schema.description.as_deref())
        .unwrap_or(&default_desc);

    println!("### {kind}");
    println!();
    println!("**API Version**: `{group}/{version}`");
    println!();
    println!("{description}");
    println!();

    if let Some(version_info) = crd.spec.versions.first() {
        if let Some(schema) = &version_info.schema {
            if let Some(open_api_schema) = &schema.open_api_v3_schema {
                if let Some(properties) = &open_api_schema.properties {
                    if let Some(spec_schema) = properties.get("spec") {
                        println!("#### Spec Fields");
                        println!();
                        print_schema_table(spec_schema);
                        println!();
                    }

                    if let Some(status_schema) = properties.get("status") {
                        println!("#### Status Fields");
                        println!();
                        print_schema_table(status_schema);
                        println!();
                    }
                }
            }
        }
    }

    println!("---");
    println!();
}

fn print_schema_table(schema: &JSONSchemaProps) {
    if let Some(props) = &schema.properties {
        println!("| Field | Type | Required | Description |");
        println!("| ----- | ---- | -------- | ----------- |");

        let required_fields = schema.required.clone().unwrap_or_default();

        let mut sorted_props: Vec<_> = props.iter().collect();
        sorted_props.sort_by_key(|(name, _)| *name);

        for (name, prop_schema) in sorted_props {
            let is_required = required_fields.contains(name);
            let type_str = get_type_string(prop_schema);
            let description = get_description(prop_schema);
            let required_str = if is_required { "Yes" } else { "No" };

            println!("| `{name}` | {type_str} | {required_str} | {description} |");
        }
    }
}

fn get_type_string(schema: &JSONSchemaProps) -> String {
    if let Some(reference) = &schema.ref_path {
        return reference.split('/').next_back().unwrap_or("object").to_string();
    }

    if let Some(type_str) = &schema.type_ {
        return type_str.clone();
    }

    if schema.properties.is_some() {
        return "object".to_string();
    }

    "any".to_string()
}

fn get_description(schema: &JSONSchemaProps) -> String {
    if let Some(desc) = &schema.description {
        return desc.replace('|', "\\|").replace('\n', " ");
    }
    String::new()
}
