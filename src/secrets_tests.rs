// SPDX-License-Identifier: Apache-2.0

use std::collections::BTreeMap;

use k8s_openapi::api::core::v1::Secret;
use k8s_openapi::ByteString;

use super::decode;

fn secret_with(data: &[(&str, &[u8])]) -> Secret {
    let mut map = BTreeMap::new();
    for (k, v) in data {
        map.insert((*k).to_string(), ByteString(v.to_vec()));
    }
    Secret {
        data: Some(map),
        ..Default::default()
    }
}

#[test]
fn decode_renders_utf8_values_as_strings() {
    let secret = secret_with(&[("username", b"admin"), ("endpoint", b"db.svc.local:5432")]);
    let decoded = decode(&secret);
    assert_eq!(decoded.get("username").unwrap(), "admin");
    assert_eq!(decoded.get("endpoint").unwrap(), "db.svc.local:5432");
}

#[test]
fn decode_falls_back_to_base64_for_non_utf8() {
    let binary = [0xff, 0xfe, 0x00, 0x01];
    let secret = secret_with(&[("blob", &binary)]);
    let decoded = decode(&secret);
    assert_eq!(decoded.get("blob").unwrap(), "//4AAQ==");
}

#[test]
fn decode_empty_secret_is_empty_map() {
    let secret = Secret::default();
    assert!(decode(&secret).is_empty());
}
