//! Repository layer: SQL access to the four entity tables.
//!
//! # Responsibility
//! - Keep SQL text and row decoding inside the persistence boundary.
//! - Report storage faults as `RepoError`, distinct from authorization.
//!
//! # Invariants
//! - Repositories never evaluate permissions; services do that first.
//! - Repositories never open transactions; callers pass a connection or
//!   transaction and own commit/rollback.
//! - Read paths reject corrupt persisted values instead of masking them.

use crate::codec::CodecError;
use crate::db::migrations::{current_user_version, latest_version, REQUIRED_TABLES};
use crate::db::functions::codec_failure;
use crate::db::DbError;
use rusqlite::{Connection, ErrorCode};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod group_repo;
pub mod permission_repo;
pub mod thing_repo;
pub mod user_repo;

pub type RepoResult<T> = Result<T, RepoError>;

/// Entity kind carrying a unique name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NamedKind {
    User,
    Group,
}

impl Display for NamedKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::User => f.write_str("user"),
            Self::Group => f.write_str("group"),
        }
    }
}

/// Storage-level failure. Authorization denial is never reported here.
#[derive(Debug)]
pub enum RepoError {
    Db(DbError),
    /// Persisted attributes or sets failed to decode.
    Codec(CodecError),
    /// A user or group with this name already exists.
    DuplicateName {
        kind: NamedKind,
        name: String,
    },
    /// Credential primitive failed (bad cost parameters, corrupt digest).
    Credential(String),
    /// Connection schema is not at the expected migrated version.
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    /// Required table is missing.
    MissingRequiredTable(&'static str),
    /// Persisted row violates an entity invariant.
    InvalidData(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::Codec(err) => write!(f, "{err}"),
            Self::DuplicateName { kind, name } => write!(f, "{kind} name already taken: {name}"),
            Self::Credential(message) => write!(f, "credential error: {message}"),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "connection schema version {actual_version} does not match expected {expected_version}"
            ),
            Self::MissingRequiredTable(table) => write!(f, "required table missing: {table}"),
            Self::InvalidData(message) => write!(f, "invalid persisted data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::Codec(err) => Some(err),
            Self::DuplicateName { .. }
            | Self::Credential(_)
            | Self::UninitializedConnection { .. }
            | Self::MissingRequiredTable(_)
            | Self::InvalidData(_) => None,
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

/// Codec failures raised inside registered SQL functions map back to
/// `Codec`; everything else is a store fault.
impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        match codec_failure(&value) {
            Some(err) => Self::Codec(err),
            None => Self::Db(DbError::Sqlite(value)),
        }
    }
}

impl From<CodecError> for RepoError {
    fn from(value: CodecError) -> Self {
        Self::Codec(value)
    }
}

/// Verifies that `conn` is migrated and carries every entity table.
pub fn ensure_connection_ready(conn: &Connection) -> RepoResult<()> {
    let actual_version = current_user_version(conn)?;
    let expected_version = latest_version();
    if actual_version != expected_version {
        return Err(RepoError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }

    for &table in REQUIRED_TABLES {
        if !table_exists(conn, table)? {
            return Err(RepoError::MissingRequiredTable(table));
        }
    }

    Ok(())
}

/// Rewrites a UNIQUE violation into `DuplicateName`; other errors pass through.
pub(crate) fn map_unique_violation(
    err: rusqlite::Error,
    kind: NamedKind,
    name: &str,
) -> RepoError {
    if let rusqlite::Error::SqliteFailure(failure, _) = &err {
        if failure.code == ErrorCode::ConstraintViolation
            && failure.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
        {
            return RepoError::DuplicateName {
                kind,
                name: name.to_string(),
            };
        }
    }
    err.into()
}

fn table_exists(conn: &Connection, table: &str) -> RepoResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = ?1
        );",
        [table],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}
