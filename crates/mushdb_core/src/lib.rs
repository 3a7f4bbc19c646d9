//! Persistence and access-control core of a multi-user object store.
//!
//! Things carry arbitrary attribute documents; users act through proxy
//! groups; every read, write, and membership change passes a per-thing
//! owner/reader/writer check first.

pub mod codec;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;
pub mod store;

pub use codec::CodecError;
pub use db::{DbError, DbOptions};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::permission::{Access, AccessLevel, PermissionRecord, PermissionSet};
pub use model::principal::{Actor, Identity, Principal, GUEST_SENTINEL};
pub use model::thing::{Attributes, Group, GroupRef, Thing, ThingRef, UserRef};
pub use repo::{NamedKind, RepoError, RepoResult};
pub use service::credentials::{Argon2Hasher, CredentialCost, CredentialHasher};
pub use service::entity_store::EntityStore;
pub use service::identity_service::IdentityService;
pub use store::{MushDb, StoreOptions};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
