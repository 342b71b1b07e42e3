//! Role registry and decryption-grant log.
//!
//! Two deliberately disjoint mechanisms live here. The manager role is a
//! mutable flag checked live at every gated call. Decryption grants are
//! append-only records of capability already handed out through the provider;
//! removing a role never touches them, because the provider-side grant is
//! irrevocable anyway.

use crate::survey::Category;
use fhe_provider::types::Address;
use serde::Serialize;
use std::collections::{HashMap, HashSet};

/// A decryptable aggregate field, the unit the grant log is keyed by.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Resource {
    GlobalSum,
    GlobalCount,
    DepartmentSum(Category),
    DepartmentCount(Category),
}

#[derive(Default)]
pub struct AccessControl {
    managers: HashSet<Address>,
    grants: HashMap<Resource, HashSet<Address>>,
}

impl AccessControl {
    /// The deploying principal starts out as the sole manager.
    pub fn new(owner: Address) -> Self {
        let mut managers = HashSet::new();
        managers.insert(owner);
        Self {
            managers,
            grants: HashMap::new(),
        }
    }

    pub fn is_manager(&self, identity: &Address) -> bool {
        self.managers.contains(identity)
    }

    /// Toggle the role flag. Returns true when the flag actually changed.
    pub fn set_manager(&mut self, identity: Address, flag: bool) -> bool {
        if flag {
            self.managers.insert(identity)
        } else {
            self.managers.remove(&identity)
        }
    }

    pub fn managers(&self) -> impl Iterator<Item = &Address> {
        self.managers.iter()
    }

    /// Record an issued grant. Append-only: there is no removal counterpart.
    pub fn record_grant(&mut self, resource: Resource, identity: Address) -> bool {
        self.grants.entry(resource).or_default().insert(identity)
    }

    pub fn is_granted(&self, resource: Resource, identity: &Address) -> bool {
        self.grants
            .get(&resource)
            .is_some_and(|set| set.contains(identity))
    }

    pub fn grantees(&self, resource: Resource) -> impl Iterator<Item = &Address> {
        self.grants.get(&resource).into_iter().flatten()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_flag_toggles_both_ways() {
        let owner = Address::from_byte(1);
        let bob = Address::from_byte(2);
        let mut acl = AccessControl::new(owner);

        assert!(acl.is_manager(&owner));
        assert!(!acl.is_manager(&bob));

        assert!(acl.set_manager(bob, true));
        assert!(acl.is_manager(&bob));
        // Re-adding is a no-op.
        assert!(!acl.set_manager(bob, true));

        assert!(acl.set_manager(bob, false));
        assert!(!acl.is_manager(&bob));
        assert!(acl.set_manager(bob, true));
        assert!(acl.is_manager(&bob));
    }

    #[test]
    fn grants_survive_role_removal() {
        let owner = Address::from_byte(1);
        let bob = Address::from_byte(2);
        let mut acl = AccessControl::new(owner);

        acl.set_manager(bob, true);
        acl.record_grant(Resource::GlobalSum, bob);
        acl.set_manager(bob, false);

        assert!(!acl.is_manager(&bob));
        assert!(acl.is_granted(Resource::GlobalSum, &bob));
    }

    #[test]
    fn grant_recording_is_idempotent_and_per_resource() {
        let owner = Address::from_byte(1);
        let mut acl = AccessControl::new(owner);

        assert!(acl.record_grant(Resource::DepartmentSum(3), owner));
        assert!(!acl.record_grant(Resource::DepartmentSum(3), owner));
        assert!(!acl.is_granted(Resource::DepartmentCount(3), &owner));
        assert!(!acl.is_granted(Resource::DepartmentSum(4), &owner));

        let grantees: Vec<_> = acl.grantees(Resource::DepartmentSum(3)).collect();
        assert_eq!(grantees, vec![&owner]);
        assert_eq!(acl.grantees(Resource::GlobalCount).count(), 0);
    }
}
