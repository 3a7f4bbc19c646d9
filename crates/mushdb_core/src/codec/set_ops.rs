//! Idempotent membership operations over JSON-array encoded sets.
//!
//! Sets are small (group rosters, permission lists), so a linear scan over a
//! `Vec` is used rather than a hashed collection.

use super::{CodecError, CodecResult};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

/// Decodes an encoded set.
pub fn decode_set<T: DeserializeOwned>(encoded: &str) -> CodecResult<Vec<T>> {
    let value: Value = serde_json::from_str(encoded).map_err(CodecError::Decode)?;
    if !value.is_array() {
        return Err(CodecError::NotAnArray);
    }
    serde_json::from_value(value).map_err(CodecError::Decode)
}

/// Encodes a set for storage.
pub fn encode_set<T: Serialize>(items: &[T]) -> CodecResult<String> {
    serde_json::to_string(items).map_err(CodecError::Encode)
}

/// Returns whether `value` is a member of the encoded set.
pub fn contains<T>(encoded: &str, value: &T) -> CodecResult<bool>
where
    T: DeserializeOwned + PartialEq,
{
    Ok(decode_set::<T>(encoded)?.contains(value))
}

/// Returns the encoded union of the set and `{value}`, deduplicated.
pub fn add<T>(encoded: &str, value: T) -> CodecResult<String>
where
    T: Serialize + DeserializeOwned + PartialEq,
{
    let mut items = dedup(decode_set::<T>(encoded)?);
    if !items.contains(&value) {
        items.push(value);
    }
    encode_set(&items)
}

/// Returns the encoded set without `value`. Absent values are a no-op.
pub fn remove<T>(encoded: &str, value: &T) -> CodecResult<String>
where
    T: Serialize + DeserializeOwned + PartialEq,
{
    let mut items = decode_set::<T>(encoded)?;
    if let Some(index) = items.iter().position(|item| item == value) {
        items.remove(index);
    }
    encode_set(&items)
}

fn dedup<T: PartialEq>(items: Vec<T>) -> Vec<T> {
    let mut unique = Vec::with_capacity(items.len());
    for item in items {
        if !unique.contains(&item) {
            unique.push(item);
        }
    }
    unique
}
