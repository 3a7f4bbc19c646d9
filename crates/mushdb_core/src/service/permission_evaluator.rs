//! The single authorization gate.
//!
//! # Invariants
//! - A thing without a permission record is inaccessible (fail-closed).
//! - Owners always get full access, whatever the reader/writer sets say.
//! - The guest sentinel in `readers` grants read access to every actor.
//! - A guest actor never evaluates above read access, even if a stored
//!   owner or writer set lists the sentinel.

use crate::model::permission::{Access, AccessLevel};
use crate::model::principal::Actor;
use crate::model::thing::ThingRef;
use crate::repo::permission_repo::PermissionRepository;
use crate::repo::RepoResult;
use log::debug;
use rusqlite::Connection;

/// Computes the effective access of `actor` on `thing_ref`.
pub fn evaluate(conn: &Connection, thing_ref: ThingRef, actor: &Actor) -> RepoResult<Access> {
    let membership = PermissionRepository::new(conn).membership(thing_ref, actor.principal())?;
    let access = match membership {
        Some(membership) => Access::from_membership(
            membership.in_owners,
            membership.in_readers,
            membership.in_writers,
        ),
        None => Access::NONE,
    };
    Ok(match actor {
        Actor::Guest => access.read_only(),
        Actor::Authenticated(_) => access,
    })
}

/// Evaluates and checks one required level, logging denials.
pub(crate) fn authorize(
    conn: &Connection,
    thing_ref: ThingRef,
    actor: &Actor,
    level: AccessLevel,
    operation: &str,
) -> RepoResult<bool> {
    let allowed = evaluate(conn, thing_ref, actor)?.permits(level);
    if !allowed {
        debug!(
            "event={} module=permissions status=denied thing_ref={} actor={} required={}",
            operation,
            thing_ref,
            actor.principal(),
            level.as_str()
        );
    }
    Ok(allowed)
}
