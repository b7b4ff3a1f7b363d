//! JSON patch objects.
//!
//! A patch maps JSON pointers (without the leading `/`) to replacement
//! values; `null` removes the addressed member. Recurrence overrides are
//! stored as patches against the master event.

use serde_json::{Map, Value};
use thiserror::Error;

use crate::context::{decode_pointer, encode_pointer};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PatchError {
    #[error("Patch path does not resolve: {0}")]
    UnresolvedPath(String),

    #[error("Empty patch path")]
    EmptyPath,
}

/// ## Summary
/// Computes the patch that turns `base` into `target`.
///
/// Members missing from `target` become `null`, nested objects present on
/// both sides are diffed member by member, and everything else that differs
/// is replaced wholesale.
#[must_use]
pub fn diff(base: &Map<String, Value>, target: &Map<String, Value>) -> Map<String, Value> {
    let mut patch = Map::new();
    diff_into(&mut patch, "", base, target);
    patch
}

fn diff_into(
    patch: &mut Map<String, Value>,
    prefix: &str,
    base: &Map<String, Value>,
    target: &Map<String, Value>,
) {
    for key in base.keys() {
        if !target.contains_key(key) {
            patch.insert(format!("{prefix}{}", encode_pointer(key)), Value::Null);
        }
    }
    for (key, new) in target {
        let path = format!("{prefix}{}", encode_pointer(key));
        match (base.get(key), new) {
            (Some(Value::Object(old_obj)), Value::Object(new_obj)) => {
                diff_into(patch, &format!("{path}/"), old_obj, new_obj);
            }
            (Some(old), _) if old == new => {}
            _ => {
                patch.insert(path, new.clone());
            }
        }
    }
}

/// ## Summary
/// Applies `patch` to a copy of `base`.
///
/// ## Errors
/// Returns `PatchError::UnresolvedPath` if a path walks through a member
/// that does not exist or is not an object.
pub fn apply(
    base: &Map<String, Value>,
    patch: &Map<String, Value>,
) -> Result<Map<String, Value>, PatchError> {
    let mut result = base.clone();
    for (path, value) in patch {
        let segments: Vec<String> = path.split('/').map(decode_pointer).collect();
        let Some((leaf, parents)) = segments.split_last() else {
            return Err(PatchError::EmptyPath);
        };
        if leaf.is_empty() && parents.is_empty() {
            return Err(PatchError::EmptyPath);
        }

        let mut target = &mut result;
        for segment in parents {
            target = match target.get_mut(segment) {
                Some(Value::Object(inner)) => inner,
                _ => return Err(PatchError::UnresolvedPath(path.clone())),
            };
        }

        if value.is_null() {
            target.remove(leaf);
        } else {
            target.insert(leaf.clone(), value.clone());
        }
    }
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn obj(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("fixture must be an object"),
        }
    }

    #[test_log::test]
    fn diff_descends_into_objects() {
        let base = obj(json!({
            "title": "Standup",
            "locations": {"a": {"name": "Room 1", "rel": "unknown"}},
            "color": "red"
        }));
        let target = obj(json!({
            "title": "Special",
            "locations": {"a": {"name": "Room 2", "rel": "unknown"}},
            "keywords": ["x"]
        }));

        let patch = diff(&base, &target);
        assert_eq!(
            Value::Object(patch.clone()),
            json!({
                "title": "Special",
                "locations/a/name": "Room 2",
                "color": null,
                "keywords": ["x"]
            })
        );
        assert_eq!(apply(&base, &patch), Ok(target));
    }

    #[test_log::test]
    fn identical_objects_have_empty_diff() {
        let base = obj(json!({"title": "Same", "alerts": {"x": {"offset": "PT5M"}}}));
        assert!(diff(&base, &base).is_empty());
    }

    #[test_log::test]
    fn apply_rejects_missing_parents() {
        let base = obj(json!({"title": "x"}));
        let patch = obj(json!({"locations/a/name": "Room"}));
        assert_eq!(
            apply(&base, &patch),
            Err(PatchError::UnresolvedPath("locations/a/name".to_string()))
        );
    }

    #[test_log::test]
    fn escaped_keys_round_trip() {
        let base = obj(json!({"links": {"a/b": {"href": "x"}}}));
        let target = obj(json!({"links": {"a/b": {"href": "y"}}}));
        let patch = diff(&base, &target);
        assert!(patch.contains_key("links/a~1b/href"));
        assert_eq!(apply(&base, &patch), Ok(target));
    }
}
