//! Pure encoders for attribute documents and small sets.
//!
//! # Responsibility
//! - Serialize/deserialize stored attribute documents and apply merge-patch.
//! - Provide idempotent membership operations over encoded sets.
//!
//! # Invariants
//! - Functions in this module hold no state and touch no storage, so they
//!   can run inside SQL statements as registered scalar functions.
//! - A decode failure means the stored value is corrupt, never that the
//!   caller made a mistake.

use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod attributes;
pub mod set_ops;

pub type CodecResult<T> = Result<T, CodecError>;

#[derive(Debug)]
pub enum CodecError {
    Encode(serde_json::Error),
    Decode(serde_json::Error),
    /// Stored attributes decoded to valid JSON that is not an object.
    NotAnObject,
    /// A stored set decoded to valid JSON that is not an array.
    NotAnArray,
    /// Decode failure raised inside a registered SQL function. SQLite only
    /// carries the message back, so the original error is not available.
    InFunction(String),
}

impl Display for CodecError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Encode(err) => write!(f, "failed to encode value: {err}"),
            Self::Decode(err) => write!(f, "stored value is corrupt: {err}"),
            Self::NotAnObject => write!(f, "stored attributes are not a JSON object"),
            Self::NotAnArray => write!(f, "stored set is not a JSON array"),
            Self::InFunction(message) => write!(f, "{message}"),
        }
    }
}

impl Error for CodecError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Encode(err) | Self::Decode(err) => Some(err),
            Self::NotAnObject | Self::NotAnArray | Self::InFunction(_) => None,
        }
    }
}
