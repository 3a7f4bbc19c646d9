//! Explicitly owned database handle.
//!
//! # Responsibility
//! - Own the single SQLite connection and the credential hasher.
//! - Hand out short-lived service views borrowing that connection.
//!
//! # Invariants
//! - A `MushDb` is only constructed from a bootstrapped, migrated connection.
//! - Services borrow the connection mutably, so at most one operation runs on
//!   a handle at a time.

use crate::db::{open_db_in_memory_with, open_db_with, DbOptions};
use crate::repo::RepoResult;
use crate::service::credentials::{Argon2Hasher, CredentialCost};
use crate::service::entity_store::EntityStore;
use crate::service::identity_service::IdentityService;
use log::info;
use rusqlite::Connection;
use std::path::Path;

/// Settings for opening a store.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoreOptions {
    pub db: DbOptions,
    pub credential_cost: CredentialCost,
}

/// Handle to one open object store.
pub struct MushDb {
    conn: Connection,
    hasher: Argon2Hasher,
}

impl MushDb {
    /// Opens (creating if needed) a file store with default options.
    pub fn open(path: impl AsRef<Path>) -> RepoResult<Self> {
        Self::open_with(path, &StoreOptions::default())
    }

    pub fn open_with(path: impl AsRef<Path>, options: &StoreOptions) -> RepoResult<Self> {
        let conn = open_db_with(path, &options.db)?;
        Ok(Self::from_connection(conn, options))
    }

    /// Opens a throwaway in-memory store with default options.
    pub fn open_in_memory() -> RepoResult<Self> {
        Self::open_in_memory_with(&StoreOptions::default())
    }

    pub fn open_in_memory_with(options: &StoreOptions) -> RepoResult<Self> {
        let conn = open_db_in_memory_with(&options.db)?;
        Ok(Self::from_connection(conn, options))
    }

    fn from_connection(conn: Connection, options: &StoreOptions) -> Self {
        Self {
            conn,
            hasher: Argon2Hasher::new(options.credential_cost),
        }
    }

    /// Thing, permission, and group operations.
    pub fn entities(&mut self) -> EntityStore<'_> {
        EntityStore::from_ready(&mut self.conn)
    }

    /// User creation, sign-in, and destruction.
    pub fn identity(&mut self) -> IdentityService<'_, Argon2Hasher> {
        IdentityService::from_ready(&mut self.conn, self.hasher)
    }

    /// Raw connection, for inspection and maintenance queries.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Closes the connection, surfacing any error SQLite reports on close.
    pub fn close(self) -> RepoResult<()> {
        self.conn.close().map_err(|(_, err)| err)?;
        info!("event=db_close module=db status=ok");
        Ok(())
    }
}
