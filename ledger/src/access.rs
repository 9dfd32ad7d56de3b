//! Access control: one administrator plus a set of election creators.
//!
//! Every gated operation in the ledger goes through [`AccessControl::require_administrator`]
//! or [`AccessControl::require_creator`]; no call site compares identities itself.

use crate::error::LedgerError;
use ballot_types::Identity;
use std::collections::HashSet;

pub struct AccessControl {
    /// Fixed at construction. There is no transfer operation.
    administrator: Identity,
    /// Identities allowed to create elections, besides the administrator.
    authorized_creators: HashSet<Identity>,
}

impl AccessControl {
    pub fn new(administrator: Identity) -> Self {
        Self {
            administrator,
            authorized_creators: HashSet::new(),
        }
    }

    pub(crate) fn from_parts(
        administrator: Identity,
        authorized_creators: impl IntoIterator<Item = Identity>,
    ) -> Self {
        Self {
            administrator,
            authorized_creators: authorized_creators.into_iter().collect(),
        }
    }

    pub fn administrator(&self) -> &Identity {
        &self.administrator
    }

    pub fn is_administrator(&self, identity: &Identity) -> bool {
        &self.administrator == identity
    }

    /// Whether `identity` may create elections.
    pub fn is_authorized(&self, identity: &Identity) -> bool {
        self.is_administrator(identity) || self.authorized_creators.contains(identity)
    }

    pub fn require_administrator(
        &self,
        caller: &Identity,
        action: &'static str,
    ) -> Result<(), LedgerError> {
        if self.is_administrator(caller) {
            Ok(())
        } else {
            Err(LedgerError::Unauthorized {
                caller: caller.clone(),
                action,
            })
        }
    }

    pub fn require_creator(
        &self,
        caller: &Identity,
        action: &'static str,
    ) -> Result<(), LedgerError> {
        if self.is_authorized(caller) {
            Ok(())
        } else {
            Err(LedgerError::Unauthorized {
                caller: caller.clone(),
                action,
            })
        }
    }

    /// Grant creation rights to `target`. Returns whether the set changed.
    pub fn authorize(&mut self, caller: &Identity, target: &Identity) -> Result<bool, LedgerError> {
        self.require_administrator(caller, "authorize election creators")?;
        if !target.is_valid() {
            return Err(LedgerError::EmptyField("target identity"));
        }
        if self.is_administrator(target) {
            return Ok(false);
        }
        Ok(self.authorized_creators.insert(target.clone()))
    }

    /// Withdraw creation rights from `target`. Returns whether the set changed.
    ///
    /// The administrator's own rights are implicit and survive this call.
    pub fn revoke(&mut self, caller: &Identity, target: &Identity) -> Result<bool, LedgerError> {
        self.require_administrator(caller, "revoke election creators")?;
        Ok(self.authorized_creators.remove(target))
    }

    /// Explicitly authorized creators, sorted.
    pub fn creators(&self) -> Vec<Identity> {
        let mut creators: Vec<Identity> = self.authorized_creators.iter().cloned().collect();
        creators.sort();
        creators
    }
}
