//! Entity lifecycle operations over things, permissions, and groups.
//!
//! # Responsibility
//! - Create, read, patch, and destroy things behind the permission gate.
//! - Maintain owner/reader/writer sets and group rosters.
//!
//! # Invariants
//! - A thing and its permission record become visible in the same commit.
//! - Every mutation evaluates permissions inside its own write transaction,
//!   so the check and the write see the same state.
//! - Read paths run the check and the fetch in one deferred transaction, so
//!   both see the same snapshot.
//! - Denied operations return `Ok(None)` and leave storage untouched.

use crate::model::permission::{Access, AccessLevel, PermissionRecord, PermissionSet};
use crate::model::principal::{Actor, Identity, Principal};
use crate::model::thing::{
    named_thing_attributes, Attributes, Group, GroupRef, Thing, ThingRef, UserRef,
    THING_TYPE_GROUP,
};
use crate::repo::group_repo::GroupRepository;
use crate::repo::permission_repo::PermissionRepository;
use crate::repo::thing_repo::ThingRepository;
use crate::repo::{ensure_connection_ready, RepoResult};
use crate::service::permission_evaluator::{authorize, evaluate};
use log::{debug, info};
use rusqlite::{Connection, Transaction, TransactionBehavior};

/// Permission-checked access to things and groups.
pub struct EntityStore<'conn> {
    conn: &'conn mut Connection,
}

impl<'conn> EntityStore<'conn> {
    /// Constructs a store from a migrated/ready connection.
    pub fn try_new(conn: &'conn mut Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn)?;
        Ok(Self { conn })
    }

    /// Wraps a connection the caller already bootstrapped.
    pub(crate) fn from_ready(conn: &'conn mut Connection) -> Self {
        Self { conn }
    }

    /// Effective access of `actor` on `thing_ref`.
    pub fn evaluate(&self, thing_ref: ThingRef, actor: &Actor) -> RepoResult<Access> {
        evaluate(self.conn, thing_ref, actor)
    }

    /// Creates a thing owned by the actor's group.
    ///
    /// # Contract
    /// - The actor's group is owner, writer, and reader.
    /// - Public things also list the guest sentinel as reader.
    /// - Guests cannot create things: returns `None`.
    pub fn create_thing(
        &mut self,
        actor: &Actor,
        attributes: &Attributes,
        is_private: bool,
    ) -> RepoResult<Option<ThingRef>> {
        let Actor::Authenticated(group_ref) = *actor else {
            debug!("event=thing_create module=entities status=denied actor=guest");
            return Ok(None);
        };

        let tx = self.write_transaction()?;
        let thing_ref = insert_thing(&tx, attributes, Principal::Group(group_ref), is_private)?;
        tx.commit()?;

        info!(
            "event=thing_create module=entities status=ok thing_ref={} owner={} private={}",
            thing_ref, group_ref, is_private
        );
        Ok(Some(thing_ref))
    }

    /// Returns the thing when the actor may read it.
    pub fn get_thing(&self, thing_ref: ThingRef, actor: &Actor) -> RepoResult<Option<Thing>> {
        let tx = self.read_transaction()?;
        if !authorize(&tx, thing_ref, actor, AccessLevel::Read, "thing_get")? {
            return Ok(None);
        }
        let thing = ThingRepository::new(&tx).get(thing_ref)?;
        Ok(thing)
    }

    /// Merge-patches the thing's attributes when the actor may write it.
    pub fn patch_thing(
        &mut self,
        thing_ref: ThingRef,
        actor: &Actor,
        patch: &Attributes,
    ) -> RepoResult<Option<()>> {
        let tx = self.write_transaction()?;
        if !authorize(&tx, thing_ref, actor, AccessLevel::Write, "thing_patch")? {
            return Ok(None);
        }
        if !ThingRepository::new(&tx).patch(thing_ref, patch)? {
            return Ok(None);
        }
        tx.commit()?;

        debug!(
            "event=thing_patch module=entities status=ok thing_ref={} keys={}",
            thing_ref,
            patch.len()
        );
        Ok(Some(()))
    }

    /// Destroys the thing and everything backed by it when the actor owns it.
    pub fn destroy_thing(&mut self, thing_ref: ThingRef, actor: &Actor) -> RepoResult<Option<()>> {
        let tx = self.write_transaction()?;
        if destroy_thing(&tx, thing_ref, actor)?.is_none() {
            return Ok(None);
        }
        tx.commit()?;
        Ok(Some(()))
    }

    /// Returns the full permission record when the actor owns the thing.
    pub fn get_permissions(
        &self,
        thing_ref: ThingRef,
        actor: &Actor,
    ) -> RepoResult<Option<PermissionRecord>> {
        let tx = self.read_transaction()?;
        if !authorize(&tx, thing_ref, actor, AccessLevel::Own, "permission_get")? {
            return Ok(None);
        }
        let record = PermissionRepository::new(&tx).get(thing_ref)?;
        Ok(record)
    }

    /// Adds `target` to one permission set. Requires ownership.
    ///
    /// Adding `Principal::Guest` to readers makes the thing public. The guest
    /// sentinel is refused in owners and writers: returns `None`.
    pub fn add_permission(
        &mut self,
        thing_ref: ThingRef,
        actor: &Actor,
        target: Principal,
        which: PermissionSet,
    ) -> RepoResult<Option<()>> {
        if !which.admits(target) {
            debug!(
                "event=permission_add module=entities status=rejected thing_ref={} set={} target={}",
                thing_ref,
                which.column(),
                target
            );
            return Ok(None);
        }

        let tx = self.write_transaction()?;
        if !authorize(&tx, thing_ref, actor, AccessLevel::Own, "permission_add")? {
            return Ok(None);
        }
        PermissionRepository::new(&tx).add_to_set(thing_ref, which, target)?;
        tx.commit()?;

        info!(
            "event=permission_add module=entities status=ok thing_ref={} set={} target={}",
            thing_ref,
            which.column(),
            target
        );
        Ok(Some(()))
    }

    /// Removes `target` from one permission set. Requires ownership.
    ///
    /// Removing an owner never revokes access held through another owner
    /// entry; removing the last owner makes the thing unmanageable.
    pub fn remove_permission(
        &mut self,
        thing_ref: ThingRef,
        actor: &Actor,
        target: Principal,
        which: PermissionSet,
    ) -> RepoResult<Option<()>> {
        let tx = self.write_transaction()?;
        if !authorize(&tx, thing_ref, actor, AccessLevel::Own, "permission_remove")? {
            return Ok(None);
        }
        PermissionRepository::new(&tx).remove_from_set(thing_ref, which, target)?;
        tx.commit()?;

        info!(
            "event=permission_remove module=entities status=ok thing_ref={} set={} target={}",
            thing_ref,
            which.column(),
            target
        );
        Ok(Some(()))
    }

    /// Creates a standalone group with `creator` as its first member.
    ///
    /// # Contract
    /// - The group owns its own thing.
    /// - Extension beyond self-ownership: the creator's group is also
    ///   co-owner, and so reader and writer. The creator acts through their
    ///   own group, so without this entry nobody could manage the new group.
    /// - The group thing is private (no guest reader).
    /// - A taken name fails with `RepoError::DuplicateName`.
    pub fn create_group(&mut self, creator: &Identity, name: &str) -> RepoResult<GroupRef> {
        let tx = self.write_transaction()?;
        let group_ref = insert_group(&tx, name, &[creator.user_ref], Some(creator.group_ref))?;
        tx.commit()?;

        info!(
            "event=group_create module=entities status=ok group_ref={} creator={}",
            group_ref, creator.group_ref
        );
        Ok(group_ref)
    }

    /// Returns the group when the actor may read its thing.
    pub fn get_group(&self, group_ref: GroupRef, actor: &Actor) -> RepoResult<Option<Group>> {
        let tx = self.read_transaction()?;
        if !authorize(&tx, group_ref, actor, AccessLevel::Read, "group_get")? {
            return Ok(None);
        }
        let group = GroupRepository::new(&tx).get(group_ref)?;
        Ok(group)
    }

    /// Adds `user_ref` to the group roster. Requires ownership of the group.
    pub fn add_user_to_group(
        &mut self,
        group_ref: GroupRef,
        actor: &Actor,
        user_ref: UserRef,
    ) -> RepoResult<Option<()>> {
        let tx = self.write_transaction()?;
        if !authorize(&tx, group_ref, actor, AccessLevel::Own, "group_add_user")? {
            return Ok(None);
        }
        if !GroupRepository::new(&tx).add_member(group_ref, user_ref)? {
            return Ok(None);
        }
        tx.commit()?;

        info!(
            "event=group_add_user module=entities status=ok group_ref={} user_ref={}",
            group_ref, user_ref
        );
        Ok(Some(()))
    }

    /// Removes `user_ref` from the group roster. Requires ownership of the group.
    pub fn remove_user_from_group(
        &mut self,
        group_ref: GroupRef,
        actor: &Actor,
        user_ref: UserRef,
    ) -> RepoResult<Option<()>> {
        let tx = self.write_transaction()?;
        if !authorize(&tx, group_ref, actor, AccessLevel::Own, "group_remove_user")? {
            return Ok(None);
        }
        if !GroupRepository::new(&tx).remove_member(group_ref, user_ref)? {
            return Ok(None);
        }
        tx.commit()?;

        info!(
            "event=group_remove_user module=entities status=ok group_ref={} user_ref={}",
            group_ref, user_ref
        );
        Ok(Some(()))
    }

    /// Destroys a group through its backing thing.
    pub fn destroy_group(&mut self, group_ref: GroupRef, actor: &Actor) -> RepoResult<Option<()>> {
        self.destroy_thing(group_ref, actor)
    }

    fn read_transaction(&self) -> RepoResult<Transaction<'_>> {
        Ok(self.conn.unchecked_transaction()?)
    }

    fn write_transaction(&mut self) -> RepoResult<Transaction<'_>> {
        Ok(self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?)
    }
}

/// Inserts a thing and its permission record on `conn`.
pub(crate) fn insert_thing(
    conn: &Connection,
    attributes: &Attributes,
    owner: Principal,
    is_private: bool,
) -> RepoResult<ThingRef> {
    let thing_ref = ThingRepository::new(conn).insert(attributes)?;
    PermissionRepository::new(conn).insert(&PermissionRecord::for_new_thing(
        thing_ref, owner, is_private,
    ))?;
    Ok(thing_ref)
}

/// Inserts a group, its backing thing, and its private permission record.
///
/// The group always owns itself; `co_owner` is added when distinct.
pub(crate) fn insert_group(
    conn: &Connection,
    name: &str,
    users: &[UserRef],
    co_owner: Option<GroupRef>,
) -> RepoResult<GroupRef> {
    let group_ref =
        ThingRepository::new(conn).insert(&named_thing_attributes(name, THING_TYPE_GROUP))?;
    GroupRepository::new(conn).insert(group_ref, name, users)?;

    let mut owners = vec![Principal::Group(group_ref)];
    if let Some(co_owner) = co_owner.filter(|co_owner| *co_owner != group_ref) {
        owners.push(Principal::Group(co_owner));
    }
    PermissionRepository::new(conn).insert(&PermissionRecord::with_owners(group_ref, owners, true))?;
    Ok(group_ref)
}

/// Owner-checked delete on `conn`; the caller owns the transaction.
pub(crate) fn destroy_thing(
    conn: &Connection,
    thing_ref: ThingRef,
    actor: &Actor,
) -> RepoResult<Option<()>> {
    if !authorize(conn, thing_ref, actor, AccessLevel::Own, "thing_destroy")? {
        return Ok(None);
    }
    if !ThingRepository::new(conn).delete(thing_ref)? {
        return Ok(None);
    }

    info!(
        "event=thing_destroy module=entities status=ok thing_ref={}",
        thing_ref
    );
    Ok(Some(()))
}
