//! Thing and group records.
//!
//! # Invariants
//! - `ThingRef` values are assigned by the store, strictly increasing and
//!   never reused after a thing is destroyed.
//! - A group ref and a user ref are the refs of their backing things.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Store-assigned identifier of a thing.
pub type ThingRef = i64;

/// Identifier of a group: the ref of the group's backing thing.
pub type GroupRef = ThingRef;

/// Identifier of a user: the ref of the user's backing thing.
pub type UserRef = ThingRef;

/// Arbitrary attribute document stored on a thing.
///
/// Opaque to the store; only merge-patch semantics apply to it.
pub type Attributes = Map<String, Value>;

/// `type` attribute written on the backing thing of a user.
pub const THING_TYPE_USER: &str = "user";
/// `type` attribute written on the backing thing of a group.
pub const THING_TYPE_GROUP: &str = "group";

/// A thing as seen by a reader.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Thing {
    #[serde(rename = "ref")]
    pub thing_ref: ThingRef,
    pub attributes: Attributes,
}

/// A named set of member users.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    pub group_ref: GroupRef,
    pub name: String,
    /// Deduplicated member user refs. Order carries no meaning.
    pub users: Vec<UserRef>,
}

/// Builds the initial attributes of a user or group backing thing.
pub fn named_thing_attributes(name: &str, kind: &str) -> Attributes {
    let mut attributes = Attributes::new();
    attributes.insert("name".to_string(), Value::from(name));
    attributes.insert("type".to_string(), Value::from(kind));
    attributes
}
