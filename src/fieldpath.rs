// SPDX-License-Identifier: Apache-2.0

//! Crossplane-style field paths over [`serde_json::Value`].
//!
//! A field path is a dot-separated sequence of object keys, with an
//! optional `[N]` array index suffix per segment, e.g.
//! `"spec.forProvider.tags[0].value"`. This is deliberately narrower than
//! JSONPath: no wildcards, no filter expressions, no slicing — spec.md §3
//! scopes patches to "a small, Crossplane-compatible field-path DSL", not a
//! general query language.

use serde_json::Value;

/// One path segment: an object key, optionally followed by an array index.
#[derive(Clone, Debug, PartialEq, Eq)]
struct Segment {
    key: String,
    index: Option<usize>,
}

fn parse(path: &str) -> Vec<Segment> {
    path.split('.')
        .map(|raw| {
            if let Some(bracket) = raw.find('[') {
                let key = raw[..bracket].to_string();
                let index_str = raw[bracket + 1..].trim_end_matches(']');
                let index = index_str.parse::<usize>().ok();
                Segment { key, index }
            } else {
                Segment { key: raw.to_string(), index: None }
            }
        })
        .collect()
}

/// Read the value at `path`, or `None` if any segment is missing or the
/// wrong shape (object expected where an array was found, index out of
/// bounds, etc).
#[must_use]
pub fn get<'a>(root: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = root;
    for segment in parse(path) {
        current = current.get(&segment.key)?;
        if let Some(index) = segment.index {
            current = current.get(index)?;
        }
    }
    Some(current)
}

/// Write `value` at `path`, creating intermediate objects and extending
/// arrays (padding with `null`) as needed. Array-index segments require the
/// parent key to already be an array or absent.
pub fn set(root: &mut Value, path: &str, value: Value) {
    let segments = parse(path);
    set_recursive(root, &segments, value);
}

fn set_recursive(current: &mut Value, segments: &[Segment], value: Value) {
    let Some((segment, rest)) = segments.split_first() else {
        *current = value;
        return;
    };

    if !current.is_object() {
        *current = Value::Object(Default::default());
    }
    let object = current.as_object_mut().expect("just ensured object");

    match segment.index {
        None => {
            let slot = object.entry(segment.key.clone()).or_insert(Value::Null);
            if rest.is_empty() {
                *slot = value;
            } else {
                set_recursive(slot, rest, value);
            }
        }
        Some(index) => {
            let slot = object.entry(segment.key.clone()).or_insert_with(|| Value::Array(vec![]));
            if !slot.is_array() {
                *slot = Value::Array(vec![]);
            }
            let array = slot.as_array_mut().expect("just ensured array");
            while array.len() <= index {
                array.push(Value::Null);
            }
            if rest.is_empty() {
                array[index] = value;
            } else {
                set_recursive(&mut array[index], rest, value);
            }
        }
    }
}

/// True if every segment of `path` resolves to a present (non-null) value.
#[must_use]
pub fn exists(root: &Value, path: &str) -> bool {
    get(root, path).is_some_and(|v| !v.is_null())
}

#[cfg(test)]
#[path = "fieldpath_tests.rs"]
mod tests;
