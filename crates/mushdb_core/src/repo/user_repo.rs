//! User credential storage.
//!
//! # Invariants
//! - `thingref` is both the user ref and the backing thing ref.
//! - Only the salt and the digest are stored, never the password.
//! - `groupref` is null only inside the transaction creating the user.

use super::{map_unique_violation, NamedKind, RepoError, RepoResult};
use crate::model::thing::{GroupRef, UserRef};
use rusqlite::{params, Connection, OptionalExtension};

/// Stored credential row used by sign-in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredCredentials {
    pub user_ref: UserRef,
    pub group_ref: GroupRef,
    pub name: String,
    pub salt: String,
    pub digest: String,
}

/// SQLite-backed user repository.
pub struct UserRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> UserRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    /// Inserts the user row for an existing backing thing, without a group.
    ///
    /// A taken name is reported as `RepoError::DuplicateName`.
    pub fn insert(&self, user_ref: UserRef, name: &str, digest: &str, salt: &str) -> RepoResult<()> {
        self.conn
            .execute(
                "INSERT INTO users (thingref, name, password, salt) VALUES (?1, ?2, ?3, ?4);",
                params![user_ref, name, digest, salt],
            )
            .map_err(|err| map_unique_violation(err, NamedKind::User, name))?;
        Ok(())
    }

    /// Links the user to its proxy group.
    pub fn set_group(&self, user_ref: UserRef, group_ref: GroupRef) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE users SET groupref = ?2 WHERE thingref = ?1;",
            params![user_ref, group_ref],
        )?;
        if changed == 0 {
            return Err(RepoError::InvalidData(format!(
                "user {user_ref} vanished before its group was linked"
            )));
        }
        Ok(())
    }

    /// Loads credentials by name.
    pub fn find_by_name(&self, name: &str) -> RepoResult<Option<StoredCredentials>> {
        let row = self
            .conn
            .query_row(
                "SELECT thingref, groupref, name, salt, password FROM users WHERE name = ?1;",
                [name],
                |row| {
                    Ok((
                        row.get::<_, UserRef>(0)?,
                        row.get::<_, Option<GroupRef>>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                        row.get::<_, String>(4)?,
                    ))
                },
            )
            .optional()?;

        let Some((user_ref, group_ref, name, salt, digest)) = row else {
            return Ok(None);
        };
        let group_ref = group_ref.ok_or_else(|| {
            RepoError::InvalidData(format!("user {user_ref} has no group in users.groupref"))
        })?;
        Ok(Some(StoredCredentials {
            user_ref,
            group_ref,
            name,
            salt,
            digest,
        }))
    }
}
