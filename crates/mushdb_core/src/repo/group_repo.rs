//! Group storage.
//!
//! # Invariants
//! - `thingref` is both the group ref and the backing thing ref.
//! - `users` is a deduplicated JSON array of user refs.

use super::{map_unique_violation, NamedKind, RepoResult};
use crate::codec::set_ops;
use crate::db::functions::{FN_ADD_TO_ARRAY, FN_REMOVE_FROM_ARRAY};
use crate::model::thing::{Group, GroupRef, UserRef};
use rusqlite::{params, Connection, OptionalExtension};

/// SQLite-backed group repository.
pub struct GroupRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> GroupRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    /// Inserts the group row for an existing backing thing.
    ///
    /// A taken name is reported as `RepoError::DuplicateName`.
    pub fn insert(&self, group_ref: GroupRef, name: &str, users: &[UserRef]) -> RepoResult<()> {
        let encoded_users = set_ops::encode_set(users)?;
        self.conn
            .execute(
                "INSERT INTO groups (thingref, name, users) VALUES (?1, ?2, ?3);",
                params![group_ref, name, encoded_users],
            )
            .map_err(|err| map_unique_violation(err, NamedKind::Group, name))?;
        Ok(())
    }

    pub fn get(&self, group_ref: GroupRef) -> RepoResult<Option<Group>> {
        let row = self
            .conn
            .query_row(
                "SELECT name, users FROM groups WHERE thingref = ?1;",
                [group_ref],
                |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)),
            )
            .optional()?;

        let Some((name, users)) = row else {
            return Ok(None);
        };
        Ok(Some(Group {
            group_ref,
            name,
            users: set_ops::decode_set(&users)?,
        }))
    }

    /// Adds a member. Returns `false` when no group has this ref.
    pub fn add_member(&self, group_ref: GroupRef, user_ref: UserRef) -> RepoResult<bool> {
        let changed = self.conn.execute(
            &format!(
                "UPDATE groups SET users = {FN_ADD_TO_ARRAY}(users, ?2) WHERE thingref = ?1;"
            ),
            params![group_ref, user_ref],
        )?;
        Ok(changed == 1)
    }

    /// Removes a member. Returns `false` when no group has this ref.
    pub fn remove_member(&self, group_ref: GroupRef, user_ref: UserRef) -> RepoResult<bool> {
        let changed = self.conn.execute(
            &format!(
                "UPDATE groups SET users = {FN_REMOVE_FROM_ARRAY}(users, ?2) WHERE thingref = ?1;"
            ),
            params![group_ref, user_ref],
        )?;
        Ok(changed == 1)
    }
}
