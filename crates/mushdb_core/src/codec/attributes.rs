//! Attribute document codec and merge-patch.
//!
//! Merge-patch follows RFC 7396: a `null` in the patch deletes the key, an
//! object merges recursively, anything else replaces. Keys absent from the
//! patch are kept.

use super::{CodecError, CodecResult};
use crate::model::thing::Attributes;
use serde_json::Value;

/// Encodes an attribute document for storage.
pub fn encode(document: &Attributes) -> CodecResult<String> {
    serde_json::to_string(document).map_err(CodecError::Encode)
}

/// Decodes a stored attribute document.
pub fn decode(encoded: &str) -> CodecResult<Attributes> {
    match serde_json::from_str::<Value>(encoded).map_err(CodecError::Decode)? {
        Value::Object(document) => Ok(document),
        _ => Err(CodecError::NotAnObject),
    }
}

/// Applies `patch` to the stored document and returns the new encoding.
pub fn merge_patch(encoded: &str, patch: &Attributes) -> CodecResult<String> {
    let mut target = Value::Object(decode(encoded)?);
    apply_merge_patch(&mut target, &Value::Object(patch.clone()));
    serde_json::to_string(&target).map_err(CodecError::Encode)
}

/// Same as [`merge_patch`] for an encoded patch document.
pub fn merge_patch_encoded(encoded: &str, encoded_patch: &str) -> CodecResult<String> {
    let patch = serde_json::from_str::<Value>(encoded_patch).map_err(CodecError::Decode)?;
    let mut target = Value::Object(decode(encoded)?);
    apply_merge_patch(&mut target, &patch);
    serde_json::to_string(&target).map_err(CodecError::Encode)
}

/// RFC 7396 merge of `patch` into `target`, in place.
pub fn apply_merge_patch(target: &mut Value, patch: &Value) {
    let Value::Object(patch_fields) = patch else {
        *target = patch.clone();
        return;
    };

    if !target.is_object() {
        *target = Value::Object(Attributes::new());
    }
    let Value::Object(target_fields) = target else {
        return;
    };

    for (key, value) in patch_fields {
        if value.is_null() {
            target_fields.remove(key);
        } else {
            apply_merge_patch(
                target_fields.entry(key.clone()).or_insert(Value::Null),
                value,
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{apply_merge_patch, decode, encode, merge_patch, merge_patch_encoded};
    use crate::codec::CodecError;
    use crate::model::thing::Attributes;
    use serde_json::{json, Value};

    fn attrs(value: Value) -> Attributes {
        match value {
            Value::Object(map) => map,
            other => panic!("expected object, got {other}"),
        }
    }

    #[test]
    fn null_deletes_and_new_keys_are_added() {
        let stored = encode(&attrs(json!({ "a": 1, "b": 2 }))).unwrap();

        let removed = merge_patch(&stored, &attrs(json!({ "b": null }))).unwrap();
        assert_eq!(decode(&removed).unwrap(), attrs(json!({ "a": 1 })));

        let added = merge_patch(&stored, &attrs(json!({ "c": 3 }))).unwrap();
        assert_eq!(
            decode(&added).unwrap(),
            attrs(json!({ "a": 1, "b": 2, "c": 3 }))
        );
    }

    #[test]
    fn nested_objects_merge_and_scalars_replace() {
        let mut target = json!({
            "stats": { "hp": 10, "mp": 4 },
            "tags": ["old"],
            "title": "Sword"
        });
        apply_merge_patch(
            &mut target,
            &json!({
                "stats": { "mp": null, "str": 7 },
                "tags": ["new"],
                "title": { "short": "Sw" }
            }),
        );
        assert_eq!(
            target,
            json!({
                "stats": { "hp": 10, "str": 7 },
                "tags": ["new"],
                "title": { "short": "Sw" }
            })
        );
    }

    #[test]
    fn nulls_inside_new_objects_are_dropped() {
        let mut target = json!({});
        apply_merge_patch(&mut target, &json!({ "inner": { "keep": 1, "drop": null } }));
        assert_eq!(target, json!({ "inner": { "keep": 1 } }));
    }

    #[test]
    fn decode_rejects_corrupt_and_non_object_values() {
        assert!(matches!(decode("{not json"), Err(CodecError::Decode(_))));
        assert!(matches!(decode("[1,2]"), Err(CodecError::NotAnObject)));
    }

    #[test]
    fn encoded_patch_matches_document_patch() {
        let stored = r#"{"name":"Sword","damage":1}"#;
        let patched = merge_patch_encoded(stored, r#"{"damage":5}"#).unwrap();
        assert_eq!(
            decode(&patched).unwrap(),
            attrs(json!({ "name": "Sword", "damage": 5 }))
        );
    }
}
