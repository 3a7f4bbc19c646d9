//! Permission record storage.
//!
//! # Invariants
//! - `thingref` is the primary key: one record per thing.
//! - Set columns hold JSON arrays of principals (group refs and `"guest"`).
//! - Set mutations run as single `UPDATE` statements through the registered
//!   `add_to_array` / `remove_from_array` functions.

use super::RepoResult;
use crate::codec::set_ops;
use crate::db::functions::{FN_ADD_TO_ARRAY, FN_IN_ARRAY, FN_REMOVE_FROM_ARRAY};
use crate::model::permission::{PermissionRecord, PermissionSet};
use crate::model::principal::{Principal, GUEST_SENTINEL};
use crate::model::thing::ThingRef;
use rusqlite::{params, Connection, OptionalExtension};

/// Raw set membership of one principal, before owner escalation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Membership {
    pub in_owners: bool,
    /// True when the principal or the guest sentinel is a reader.
    pub in_readers: bool,
    pub in_writers: bool,
}

/// SQLite-backed permission repository.
pub struct PermissionRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> PermissionRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    pub fn insert(&self, record: &PermissionRecord) -> RepoResult<()> {
        self.conn.execute(
            "INSERT INTO permissions (thingref, owners, readers, writers)
             VALUES (?1, ?2, ?3, ?4);",
            params![
                record.thing_ref,
                set_ops::encode_set(&record.owners)?,
                set_ops::encode_set(&record.readers)?,
                set_ops::encode_set(&record.writers)?,
            ],
        )?;
        Ok(())
    }

    /// Looks up set membership of `principal`; `None` when no record exists.
    pub fn membership(
        &self,
        thing_ref: ThingRef,
        principal: Principal,
    ) -> RepoResult<Option<Membership>> {
        let membership = self
            .conn
            .query_row(
                &format!(
                    "SELECT
                        {FN_IN_ARRAY}(owners, ?2),
                        {FN_IN_ARRAY}(readers, ?2) OR {FN_IN_ARRAY}(readers, ?3),
                        {FN_IN_ARRAY}(writers, ?2)
                     FROM permissions
                     WHERE thingref = ?1;"
                ),
                params![thing_ref, principal, GUEST_SENTINEL],
                |row| {
                    Ok(Membership {
                        in_owners: row.get(0)?,
                        in_readers: row.get(1)?,
                        in_writers: row.get(2)?,
                    })
                },
            )
            .optional()?;
        Ok(membership)
    }

    pub fn get(&self, thing_ref: ThingRef) -> RepoResult<Option<PermissionRecord>> {
        let row = self
            .conn
            .query_row(
                "SELECT owners, readers, writers FROM permissions WHERE thingref = ?1;",
                [thing_ref],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                    ))
                },
            )
            .optional()?;

        let Some((owners, readers, writers)) = row else {
            return Ok(None);
        };
        Ok(Some(PermissionRecord {
            thing_ref,
            owners: set_ops::decode_set(&owners)?,
            readers: set_ops::decode_set(&readers)?,
            writers: set_ops::decode_set(&writers)?,
        }))
    }

    /// Adds `principal` to one set. Returns `false` when no record exists.
    pub fn add_to_set(
        &self,
        thing_ref: ThingRef,
        which: PermissionSet,
        principal: Principal,
    ) -> RepoResult<bool> {
        let column = which.column();
        let changed = self.conn.execute(
            &format!(
                "UPDATE permissions SET {column} = {FN_ADD_TO_ARRAY}({column}, ?2) WHERE thingref = ?1;"
            ),
            params![thing_ref, principal],
        )?;
        Ok(changed == 1)
    }

    /// Removes `principal` from one set. Returns `false` when no record exists.
    pub fn remove_from_set(
        &self,
        thing_ref: ThingRef,
        which: PermissionSet,
        principal: Principal,
    ) -> RepoResult<bool> {
        let column = which.column();
        let changed = self.conn.execute(
            &format!(
                "UPDATE permissions SET {column} = {FN_REMOVE_FROM_ARRAY}({column}, ?2) WHERE thingref = ?1;"
            ),
            params![thing_ref, principal],
        )?;
        Ok(changed == 1)
    }
}
