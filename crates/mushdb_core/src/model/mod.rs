//! Domain model for the object store.
//!
//! # Responsibility
//! - Define the four entity kinds (thing, user, group, permission) and the
//!   identity types used by authorization.
//!
//! # Invariants
//! - Every entity is identified by the ref of its backing thing.
//! - Every thing has exactly one permission record.
//! - A signed-in user acts through its proxy group, never through its own ref.

pub mod permission;
pub mod principal;
pub mod thing;
