//! Acting identities and permission-set members.
//!
//! # Responsibility
//! - Model who is acting (`Actor`) and who may appear in a permission set
//!   (`Principal`).
//! - Own the wire encoding of the guest sentinel.
//!
//! # Invariants
//! - A group principal encodes as a JSON integer, the guest sentinel as the
//!   JSON string `"guest"`. No other encoding is accepted.
//! - An `Actor` is resolved to exactly one `Principal` before evaluation.

use crate::model::thing::{GroupRef, UserRef};
use rusqlite::types::{ToSql, ToSqlOutput};
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt::{Display, Formatter};

/// Reserved readers-set entry meaning "readable without authentication".
pub const GUEST_SENTINEL: &str = "guest";

/// Member of an owners/readers/writers set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Principal {
    Group(GroupRef),
    Guest,
}

impl Display for Principal {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Group(group_ref) => write!(f, "group:{group_ref}"),
            Self::Guest => f.write_str(GUEST_SENTINEL),
        }
    }
}

impl Serialize for Principal {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Group(group_ref) => serializer.serialize_i64(*group_ref),
            Self::Guest => serializer.serialize_str(GUEST_SENTINEL),
        }
    }
}

impl<'de> Deserialize<'de> for Principal {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(PrincipalVisitor)
    }
}

struct PrincipalVisitor;

impl Visitor<'_> for PrincipalVisitor {
    type Value = Principal;

    fn expecting(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "a group ref integer or the string `{GUEST_SENTINEL}`")
    }

    fn visit_i64<E: de::Error>(self, value: i64) -> Result<Principal, E> {
        Ok(Principal::Group(value))
    }

    fn visit_u64<E: de::Error>(self, value: u64) -> Result<Principal, E> {
        i64::try_from(value)
            .map(Principal::Group)
            .map_err(|_| E::invalid_value(de::Unexpected::Unsigned(value), &self))
    }

    fn visit_str<E: de::Error>(self, value: &str) -> Result<Principal, E> {
        if value == GUEST_SENTINEL {
            Ok(Principal::Guest)
        } else {
            Err(E::invalid_value(de::Unexpected::Str(value), &self))
        }
    }
}

impl ToSql for Principal {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            Self::Group(group_ref) => ToSqlOutput::from(*group_ref),
            Self::Guest => ToSqlOutput::from(GUEST_SENTINEL),
        })
    }
}

/// The caller of a store operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Actor {
    /// Signed-in caller acting through its group.
    Authenticated(GroupRef),
    /// Unauthenticated caller.
    Guest,
}

impl Actor {
    /// Resolves the actor to the principal checked against permission sets.
    pub fn principal(&self) -> Principal {
        match self {
            Self::Authenticated(group_ref) => Principal::Group(*group_ref),
            Self::Guest => Principal::Guest,
        }
    }
}

/// Result of a successful sign-in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    /// Ref of the user's backing thing.
    pub user_ref: UserRef,
    /// Proxy group used for every permission check made by this user.
    pub group_ref: GroupRef,
    pub name: String,
}

impl Identity {
    /// Actor value for calls made on behalf of this identity.
    pub fn actor(&self) -> Actor {
        Actor::Authenticated(self.group_ref)
    }
}
