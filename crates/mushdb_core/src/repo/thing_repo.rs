//! Thing storage.
//!
//! # Invariants
//! - Refs come from `AUTOINCREMENT` and are never reused.
//! - Deleting a row cascades to the thing's permission, user, and group rows.

use super::RepoResult;
use crate::codec::attributes;
use crate::db::functions::FN_MERGE_PATCH;
use crate::model::thing::{Attributes, Thing, ThingRef};
use rusqlite::{params, Connection, OptionalExtension};

/// SQLite-backed thing repository.
pub struct ThingRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> ThingRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    /// Inserts a thing and returns its freshly assigned ref.
    pub fn insert(&self, attributes: &Attributes) -> RepoResult<ThingRef> {
        let encoded = attributes::encode(attributes)?;
        self.conn.execute(
            "INSERT INTO things (attributes) VALUES (?1);",
            [encoded.as_str()],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn get(&self, thing_ref: ThingRef) -> RepoResult<Option<Thing>> {
        let encoded: Option<String> = self
            .conn
            .query_row(
                "SELECT attributes FROM things WHERE ref = ?1;",
                [thing_ref],
                |row| row.get(0),
            )
            .optional()?;

        match encoded {
            Some(encoded) => Ok(Some(Thing {
                thing_ref,
                attributes: attributes::decode(&encoded)?,
            })),
            None => Ok(None),
        }
    }

    /// Merge-patches stored attributes in one statement.
    ///
    /// Returns `false` when no thing has this ref.
    pub fn patch(&self, thing_ref: ThingRef, patch: &Attributes) -> RepoResult<bool> {
        let encoded_patch = attributes::encode(patch)?;
        let changed = self.conn.execute(
            &format!(
                "UPDATE things SET attributes = {FN_MERGE_PATCH}(attributes, ?2) WHERE ref = ?1;"
            ),
            params![thing_ref, encoded_patch],
        )?;
        Ok(changed == 1)
    }

    /// Deletes a thing and, by cascade, every row backed by it.
    pub fn delete(&self, thing_ref: ThingRef) -> RepoResult<bool> {
        let changed = self
            .conn
            .execute("DELETE FROM things WHERE ref = ?1;", [thing_ref])?;
        Ok(changed == 1)
    }
}
