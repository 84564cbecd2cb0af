// SPDX-License-Identifier: Apache-2.0

//! Connection-secret publication and credential-secret resolution.
//!
//! Two distinct uses of [`Secret`] meet here (spec.md §3, §4.4, §4.5, §6):
//! the **owner secret** an XR publishes its aggregated connection details
//! to additively (I4), and the **credential secrets** an Operation's
//! pipeline steps declare they need, fetched read-only and handed to the
//! Function Runner Client.

use std::collections::BTreeMap;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use k8s_openapi::api::core::v1::Secret;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::OwnerReference;
use k8s_openapi::ByteString;
use kube::api::{Api, ObjectMeta, Patch, PatchParams};
use kube::Client;
use secrecy::SecretBox;

use crate::errors::EngineError;

/// Field-manager name stamped on every secret this engine writes via
/// server-side apply, matching the per-reconciler field-owner convention
/// used for composed-child apply (spec.md §4.3.4, §6).
const SECRET_FIELD_MANAGER: &str = "xrm-engine";

/// Read a secret's `data`, base64-decoded into UTF-8 strings. Binary values
/// that are not valid UTF-8 are rendered as their base64 form instead of
/// failing the read — connection-detail values are overwhelmingly text
/// (`endpoint`, `username`, …) but the type itself does not guarantee it.
///
/// # Errors
/// Returns [`EngineError::NotFoundRelated`] if the secret does not exist,
/// or [`EngineError::Other`] on any other API failure.
pub async fn read_secret_data(
    client: &Client,
    namespace: &str,
    name: &str,
) -> Result<BTreeMap<String, String>, EngineError> {
    let api: Api<Secret> = Api::namespaced(client.clone(), namespace);
    let secret = api.get(name).await.map_err(|e| match e {
        kube::Error::Api(ref api_err) if api_err.code == 404 => {
            EngineError::NotFoundRelated(format!("secret {namespace}/{name}"))
        }
        other => EngineError::Other(other.into()),
    })?;
    Ok(decode(&secret))
}

/// Fetch a pipeline step's declared `secret` credential, for handing to the
/// Function Runner Client (spec.md §4.5 step 4: "Resolve function
/// credentials... on NotFound or read error, fail the step").
///
/// Each value is wrapped in a [`SecretBox`] rather than handed back as a bare
/// `Vec<u8>`: the bytes sit in locked-down, zero-on-drop memory for as long
/// as they're only ours, and the caller has to call `expose_secret()`
/// explicitly at the one point it actually needs the plaintext — the gRPC
/// request it's about to send.
///
/// # Errors
/// Returns [`EngineError::CredentialResolution`] if the secret cannot be
/// read.
pub async fn fetch_credential(
    client: &Client,
    step: &str,
    namespace: &str,
    name: &str,
) -> Result<BTreeMap<String, SecretBox<Vec<u8>>>, EngineError> {
    let api: Api<Secret> = Api::namespaced(client.clone(), namespace);
    let secret = api.get(name).await.map_err(|e| EngineError::CredentialResolution {
        step: step.to_string(),
        reason: format!("secret {namespace}/{name}: {e}"),
    })?;
    Ok(secret
        .data
        .unwrap_or_default()
        .into_iter()
        .map(|(k, v)| (k, SecretBox::new(Box::new(v.0))))
        .collect())
}

/// Publish `details` to the owner secret additively (spec.md §4.3.5, I4):
/// existing keys absent from `details` are retained, keys present are
/// overwritten. Created lazily on first call (spec.md §3: "Ownership...
/// created lazily when first details become available").
///
/// # Errors
/// Returns [`EngineError::Apply`] if the read-merge-apply cycle fails.
pub async fn publish_additive(
    client: &Client,
    namespace: &str,
    name: &str,
    owner: OwnerReference,
    details: &BTreeMap<String, String>,
) -> Result<(), EngineError> {
    let api: Api<Secret> = Api::namespaced(client.clone(), namespace);

    let mut merged = match api.get_opt(name).await.map_err(|e| EngineError::Apply(e.to_string()))? {
        Some(existing) => decode(&existing),
        None => BTreeMap::new(),
    };
    crate::connection::merge_additive(&mut merged, details);

    let data: BTreeMap<String, ByteString> =
        merged.iter().map(|(k, v)| (k.clone(), ByteString(v.as_bytes().to_vec()))).collect();

    let secret = Secret {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some(namespace.to_string()),
            owner_references: Some(vec![owner]),
            ..Default::default()
        },
        data: Some(data),
        type_: Some("connection.xrm.io/v1".to_string()),
        ..Default::default()
    };

    let params = PatchParams::apply(SECRET_FIELD_MANAGER).force();
    api.patch(name, &params, &Patch::Apply(&secret))
        .await
        .map_err(|e| EngineError::Apply(e.to_string()))?;
    Ok(())
}

fn decode(secret: &Secret) -> BTreeMap<String, String> {
    secret
        .data
        .as_ref()
        .map(|data| {
            data.iter()
                .map(|(k, v)| {
                    let decoded = String::from_utf8(v.0.clone()).unwrap_or_else(|_| BASE64.encode(&v.0));
                    (k.clone(), decoded)
                })
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
#[path = "secrets_tests.rs"]
mod tests;
