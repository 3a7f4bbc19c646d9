//! User creation, sign-in, and destruction.
//!
//! # Responsibility
//! - Create a user together with its backing thing and proxy group.
//! - Verify credentials and hand out the identity used for later checks.
//!
//! # Invariants
//! - A committed user always has a backing thing, a proxy group of the same
//!   name whose roster is `{user}`, and a permission record owned by that
//!   group.
//! - Sign-in failure never reveals whether the name exists.

use crate::model::permission::PermissionRecord;
use crate::model::principal::{Identity, Principal};
use crate::model::thing::{named_thing_attributes, THING_TYPE_USER};
use crate::repo::permission_repo::PermissionRepository;
use crate::repo::thing_repo::ThingRepository;
use crate::repo::user_repo::UserRepository;
use crate::repo::{ensure_connection_ready, RepoError, RepoResult};
use crate::service::credentials::CredentialHasher;
use crate::service::entity_store::{destroy_thing, insert_group};
use log::{debug, info};
use rusqlite::{Connection, TransactionBehavior};

/// Fixed salt hashed against when the name is unknown, so a miss costs as
/// much as a wrong password.
const UNKNOWN_USER_SALT: &str = "dW5rbm93bi11c2VyLXNhbHQ";

/// Identity and credential use-cases.
pub struct IdentityService<'conn, H: CredentialHasher> {
    conn: &'conn mut Connection,
    hasher: H,
}

impl<'conn, H: CredentialHasher> IdentityService<'conn, H> {
    /// Constructs a service from a migrated/ready connection.
    pub fn try_new(conn: &'conn mut Connection, hasher: H) -> RepoResult<Self> {
        ensure_connection_ready(conn)?;
        Ok(Self { conn, hasher })
    }

    pub(crate) fn from_ready(conn: &'conn mut Connection, hasher: H) -> Self {
        Self { conn, hasher }
    }

    /// Creates a user and signs it in.
    ///
    /// # Contract
    /// - User thing, user row, proxy group, and both permission records are
    ///   committed together or not at all.
    /// - The user thing is public and owned by the proxy group.
    /// - A name taken by any user or group fails with
    ///   `RepoError::DuplicateName`.
    pub fn create_user(&mut self, name: &str, password: &str) -> RepoResult<Identity> {
        let salt = self.hasher.generate_salt();
        let digest = self.hasher.digest(password, &salt)?;

        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        let user_ref =
            ThingRepository::new(&tx).insert(&named_thing_attributes(name, THING_TYPE_USER))?;
        let users = UserRepository::new(&tx);
        users.insert(user_ref, name, &digest, &salt)?;
        let group_ref = insert_group(&tx, name, &[user_ref], None)?;
        users.set_group(user_ref, group_ref)?;
        PermissionRepository::new(&tx).insert(&PermissionRecord::for_new_thing(
            user_ref,
            Principal::Group(group_ref),
            false,
        ))?;
        tx.commit()?;

        info!(
            "event=user_create module=identity status=ok user_ref={} group_ref={}",
            user_ref, group_ref
        );

        self.sign_in(name, password)?.ok_or_else(|| {
            RepoError::InvalidData(format!(
                "user {user_ref} cannot sign in right after creation"
            ))
        })
    }

    /// Verifies credentials.
    ///
    /// Unknown names and wrong passwords both return `None`.
    pub fn sign_in(&self, name: &str, password: &str) -> RepoResult<Option<Identity>> {
        let Some(stored) = UserRepository::new(self.conn).find_by_name(name)? else {
            let _ = self.hasher.digest(password, UNKNOWN_USER_SALT);
            debug!("event=sign_in module=identity status=denied");
            return Ok(None);
        };

        if !self
            .hasher
            .verify(password, &stored.salt, &stored.digest)?
        {
            debug!("event=sign_in module=identity status=denied");
            return Ok(None);
        }

        debug!(
            "event=sign_in module=identity status=ok user_ref={}",
            stored.user_ref
        );
        Ok(Some(Identity {
            user_ref: stored.user_ref,
            group_ref: stored.group_ref,
            name: stored.name,
        }))
    }

    /// Destroys the user's thing and proxy group together.
    ///
    /// Requires ownership of both, which a user holds over itself. If either
    /// check fails nothing is deleted and `None` is returned.
    pub fn destroy_user(&mut self, identity: &Identity) -> RepoResult<Option<()>> {
        let actor = identity.actor();
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        // The user row references the proxy group, so it has to go first.
        if destroy_thing(&tx, identity.user_ref, &actor)?.is_none() {
            return Ok(None);
        }
        if destroy_thing(&tx, identity.group_ref, &actor)?.is_none() {
            return Ok(None);
        }
        tx.commit()?;

        info!(
            "event=user_destroy module=identity status=ok user_ref={} group_ref={}",
            identity.user_ref, identity.group_ref
        );
        Ok(Some(()))
    }
}
