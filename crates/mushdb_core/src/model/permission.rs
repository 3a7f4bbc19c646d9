//! Permission record and evaluated access flags.
//!
//! # Invariants
//! - Exactly one record exists per thing; it is created in the same
//!   transaction as the thing and deleted by cascade with it.
//! - Ownership implies read and write access regardless of set contents.

use crate::model::principal::Principal;
use crate::model::thing::ThingRef;
use serde::{Deserialize, Serialize};

/// One of the three principal sets held by a permission record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PermissionSet {
    Owners,
    Readers,
    Writers,
}

impl PermissionSet {
    /// Column holding this set in the `permissions` table.
    pub fn column(self) -> &'static str {
        match self {
            Self::Owners => "owners",
            Self::Readers => "readers",
            Self::Writers => "writers",
        }
    }

    /// Returns whether `principal` may be stored in this set.
    ///
    /// The guest sentinel is only valid as a reader: every unauthenticated
    /// actor resolves to it, so it must never carry write or owner rights.
    pub fn admits(self, principal: Principal) -> bool {
        self == Self::Readers || principal != Principal::Guest
    }
}

/// Stored owners/readers/writers sets of one thing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionRecord {
    pub thing_ref: ThingRef,
    pub owners: Vec<Principal>,
    pub readers: Vec<Principal>,
    pub writers: Vec<Principal>,
}

impl PermissionRecord {
    /// Builds the record for a freshly created thing.
    ///
    /// `owner` is placed in all three sets; a public thing additionally lists
    /// the guest sentinel as reader.
    pub fn for_new_thing(thing_ref: ThingRef, owner: Principal, is_private: bool) -> Self {
        Self::with_owners(thing_ref, vec![owner], is_private)
    }

    /// Same as [`PermissionRecord::for_new_thing`] with several owners.
    pub fn with_owners(thing_ref: ThingRef, owners: Vec<Principal>, is_private: bool) -> Self {
        let mut readers = owners.clone();
        if !is_private {
            readers.insert(0, Principal::Guest);
        }
        Self {
            thing_ref,
            writers: owners.clone(),
            owners,
            readers,
        }
    }

    /// Returns the named set.
    pub fn set(&self, which: PermissionSet) -> &[Principal] {
        match which {
            PermissionSet::Owners => &self.owners,
            PermissionSet::Readers => &self.readers,
            PermissionSet::Writers => &self.writers,
        }
    }
}

/// Access an operation requires on its target thing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessLevel {
    Read,
    Write,
    Own,
}

impl AccessLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Read => "read",
            Self::Write => "write",
            Self::Own => "own",
        }
    }
}

/// Effective access of one actor on one thing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Access {
    pub is_owner: bool,
    pub is_reader: bool,
    pub is_writer: bool,
}

impl Access {
    /// No access at all.
    pub const NONE: Self = Self {
        is_owner: false,
        is_reader: false,
        is_writer: false,
    };

    /// Owner access.
    pub const FULL: Self = Self {
        is_owner: true,
        is_reader: true,
        is_writer: true,
    };

    /// Combines raw set-membership flags, escalating owners to full access.
    pub fn from_membership(is_owner: bool, is_reader: bool, is_writer: bool) -> Self {
        if is_owner {
            return Self::FULL;
        }
        Self {
            is_owner: false,
            is_reader,
            is_writer,
        }
    }

    /// Keeps only the read flag.
    pub fn read_only(self) -> Self {
        Self {
            is_reader: self.is_reader,
            ..Self::NONE
        }
    }

    /// Returns whether this access satisfies `level`.
    pub fn permits(self, level: AccessLevel) -> bool {
        match level {
            AccessLevel::Read => self.is_reader,
            AccessLevel::Write => self.is_writer,
            AccessLevel::Own => self.is_owner,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Access, AccessLevel, PermissionRecord, PermissionSet};
    use crate::model::principal::Principal;

    #[test]
    fn public_record_lists_guest_reader() {
        let record = PermissionRecord::for_new_thing(5, Principal::Group(2), false);
        assert_eq!(record.owners, vec![Principal::Group(2)]);
        assert_eq!(record.writers, vec![Principal::Group(2)]);
        assert_eq!(record.readers, vec![Principal::Guest, Principal::Group(2)]);
    }

    #[test]
    fn private_record_omits_guest() {
        let record = PermissionRecord::for_new_thing(5, Principal::Group(2), true);
        assert_eq!(record.set(PermissionSet::Readers), &[Principal::Group(2)]);
    }

    #[test]
    fn ownership_escalates_to_full_access() {
        assert_eq!(Access::from_membership(true, false, false), Access::FULL);
        assert_eq!(
            Access::from_membership(false, true, false),
            Access {
                is_owner: false,
                is_reader: true,
                is_writer: false,
            }
        );
    }

    #[test]
    fn guest_sentinel_is_admitted_only_as_reader() {
        assert!(PermissionSet::Readers.admits(Principal::Guest));
        assert!(!PermissionSet::Writers.admits(Principal::Guest));
        assert!(!PermissionSet::Owners.admits(Principal::Guest));
        assert!(PermissionSet::Owners.admits(Principal::Group(9)));
    }

    #[test]
    fn read_only_drops_owner_escalation() {
        let narrowed = Access::FULL.read_only();
        assert!(narrowed.permits(AccessLevel::Read));
        assert!(!narrowed.permits(AccessLevel::Write));
        assert!(!narrowed.permits(AccessLevel::Own));
    }

    #[test]
    fn no_access_permits_nothing() {
        for level in [AccessLevel::Read, AccessLevel::Write, AccessLevel::Own] {
            assert!(!Access::NONE.permits(level));
            assert!(Access::FULL.permits(level));
        }
    }
}
