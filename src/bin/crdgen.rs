// SPDX-License-Identifier: Apache-2.0

//! CRD YAML generator.
//!
//! Emits the CRD manifests for the engine's own fixed kinds (`Composition`,
//! `CompositionRevision`, `Operation`, `Function`) from the Rust types in
//! `src/crd.rs`. XR and Claim kinds are user-defined via an XRD and are not
//! generated here.
//!
//! Usage:
//!   cargo run --bin crdgen

use std::fs;
use std::path::Path;

use kube::CustomResourceExt;

const COPYRIGHT_HEADER: &str = "# SPDX-License-Identifier: Apache-2.0
#
# This file is AUTO-GENERATED from src/crd.rs
# DO NOT EDIT MANUALLY - Run `cargo run --bin crdgen` to regenerate
#
";

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let output_dir = Path::new("deploy/crds");
    fs::create_dir_all(output_dir)?;

    println!("Generating CRD YAML files from src/crd.rs...");

    generate_crd::<xrm_engine::crd::Composition>("compositions.crd.yaml", output_dir)?;
    generate_crd::<xrm_engine::crd::CompositionRevision>("compositionrevisions.crd.yaml", output_dir)?;
    generate_crd::<xrm_engine::crd::Operation>("operations.crd.yaml", output_dir)?;
    generate_crd::<xrm_engine::crd::Function>("functions.crd.yaml", output_dir)?;

    println!("✓ Successfully generated CRD YAML files in deploy/crds/");
    println!("\nNext steps:");
    println!("  1. Review the generated files");
    println!("  2. Deploy with: kubectl apply -f deploy/crds/");

    Ok(())
}

fn generate_crd<T>(filename: &str, output_dir: &Path) -> Result<(), Box<dyn std::error::Error>>
where
    T: CustomResourceExt,
{
    let crd = T::crd();
    let yaml = serde_yaml::to_string(&crd)?;
    let content = format!("{COPYRIGHT_HEADER}{yaml}");

    let output_path = output_dir.join(filename);
    fs::write(&output_path, content)?;

    println!("  ✓ Generated {filename}");

    Ok(())
}
