//! Organisation lifecycle
//!
//! Organisations are created by any user, controlled by their owner and
//! destroyed only through [`LedgerEngine::delete_organisation`], which first
//! moves the remaining balance to the owner's personal account.

use crate::core::engine::{LedgerEngine, TransferReceipt};
use crate::types::{AccountRef, LedgerError};
use tracing::info;

impl LedgerEngine {
    /// Resolve `org_id` to an organisation owned by `user_id`
    pub fn owned_organisation(&self, user_id: &str, org_id: &str) -> Result<AccountRef, LedgerError> {
        let org = self.ledger().resolve_organisation(org_id)?;
        if !self.ledger().user_or_err(user_id)?.owns(org_id) {
            return Err(LedgerError::not_authorized(format!(
                "manage {}",
                self.ledger().display_name(&org)
            )));
        }
        Ok(org)
    }

    /// Create an empty organisation owned by `owner`
    pub fn create_organisation(&mut self, owner: &str, name: &str) -> Result<AccountRef, LedgerError> {
        let org = self.ledger_mut().insert_organisation(owner, name)?;
        info!(owner, org = %org, name, "Organisation created");
        Ok(org)
    }

    /// Rename an organisation, returning its previous name
    pub fn rename_organisation(
        &mut self,
        user_id: &str,
        org_id: &str,
        name: &str,
    ) -> Result<String, LedgerError> {
        let org = self.owned_organisation(user_id, org_id)?;
        let account = self.ledger_mut().account_mut(&org)?;
        let previous = std::mem::replace(&mut account.name, name.to_string());
        info!(org = %org, from = %previous, to = name, "Organisation renamed");
        Ok(previous)
    }

    /// Hand an organisation over to another user
    ///
    /// The caller gives up control; the organisation keeps a single owner.
    pub fn transfer_organisation(
        &mut self,
        user_id: &str,
        org_id: &str,
        new_owner: &str,
    ) -> Result<(), LedgerError> {
        let org = self.owned_organisation(user_id, org_id)?;
        self.ledger().user_or_err(new_owner)?;

        self.ledger_mut().user_mut(user_id)?.remove_organisation(org.id());
        self.ledger_mut().user_mut(new_owner)?.add_organisation(org.id());

        info!(org = %org, from = user_id, to = new_owner, "Organisation transferred");
        Ok(())
    }

    /// Delete an organisation, sweeping its balance to the caller
    ///
    /// The sweep is an ordinary taxed transfer. Returns the receipt of that
    /// transfer.
    ///
    /// # Errors
    ///
    /// - `NotAuthorized` if the caller does not own the organisation
    /// - `ProtectedResource` for the treasury, bank and casino
    /// - `OutstandingLoans` while the organisation owes the bank
    pub fn delete_organisation(
        &mut self,
        user_id: &str,
        org_id: &str,
    ) -> Result<TransferReceipt, LedgerError> {
        let org = self.owned_organisation(user_id, org_id)?;
        if let Some(name) = org.reserved_name() {
            return Err(LedgerError::protected_resource(name));
        }

        let account = self.ledger().account_or_err(&org)?;
        let outstanding = account.outstanding_debt();
        if outstanding > 0 {
            return Err(LedgerError::OutstandingLoans {
                account: account.name.clone(),
                outstanding,
            });
        }

        let balance = account.balance;
        let personal = self.ledger().personal_account_of(user_id)?;
        let receipt = self.transfer(balance, &org, &personal, "destroyed organisation", false)?;
        self.ledger_mut().remove_organisation(org.id());

        info!(org = %org, owner = user_id, swept = balance, "Organisation deleted");
        Ok(receipt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::test_support::{alice, now, sample_engine};
    use crate::types::{Loan, BANK_ID, CASINO_ID, TREASURY_ID};
    use rstest::rstest;

    #[test]
    fn test_create_and_rename() {
        let mut engine = sample_engine();
        let org = engine.create_organisation("alice", "Acme").unwrap();

        assert!(engine.ledger().user("alice").unwrap().owns(org.id()));
        assert_eq!(engine.ledger().balance(&org), Some(0));

        let previous = engine.rename_organisation("alice", org.id(), "Acme Ltd").unwrap();
        assert_eq!(previous, "Acme");
        assert_eq!(engine.ledger().display_name(&org), "Acme Ltd");
    }

    #[test]
    fn test_rename_requires_ownership() {
        let mut engine = sample_engine();
        let org = engine.create_organisation("alice", "Acme").unwrap();

        let result = engine.rename_organisation("bob", org.id(), "Mine now");

        assert_eq!(result, Err(LedgerError::not_authorized("manage Acme")));
        assert_eq!(engine.ledger().display_name(&org), "Acme");
    }

    #[test]
    fn test_transfer_moves_sole_ownership() {
        let mut engine = sample_engine();
        let org = engine.create_organisation("alice", "Acme").unwrap();

        engine.transfer_organisation("alice", org.id(), "bob").unwrap();

        assert!(!engine.ledger().user("alice").unwrap().owns(org.id()));
        assert!(engine.ledger().user("bob").unwrap().owns(org.id()));
        assert_eq!(engine.ledger().owner_of(&org), Some(&"bob".to_string()));
    }

    #[test]
    fn test_transfer_to_unknown_user_changes_nothing() {
        let mut engine = sample_engine();
        let org = engine.create_organisation("alice", "Acme").unwrap();

        let result = engine.transfer_organisation("alice", org.id(), "ghost");

        assert_eq!(result, Err(LedgerError::user_not_found("ghost")));
        assert!(engine.ledger().user("alice").unwrap().owns(org.id()));
    }

    #[test]
    fn test_delete_sweeps_balance_with_tax() {
        let mut engine = sample_engine();
        let org = engine.create_organisation("alice", "Acme").unwrap();
        engine.ledger_mut().set_balance(&alice(), 0);
        engine.ledger_mut().set_balance(&org, 1000);
        let total_before = engine.ledger().total_currency();

        let receipt = engine.delete_organisation("alice", org.id()).unwrap();

        assert_eq!(receipt.tax, 20);
        assert_eq!(engine.ledger().balance(&alice()), Some(980));
        assert!(engine.ledger().account(&org).is_none());
        assert!(!engine.ledger().user("alice").unwrap().owns(org.id()));
        assert_eq!(engine.ledger().total_currency(), total_before);
        assert!(engine.drain_notifications().is_empty());
    }

    #[rstest]
    #[case::treasury(TREASURY_ID, "treasury")]
    #[case::bank(BANK_ID, "bank")]
    #[case::casino(CASINO_ID, "casino")]
    fn test_reserved_organisations_cannot_be_deleted(#[case] id: &str, #[case] name: &str) {
        let mut engine = sample_engine();
        let before = engine.ledger().clone();

        let result = engine.delete_organisation("owner", id);

        assert_eq!(result, Err(LedgerError::protected_resource(name)));
        assert_eq!(engine.ledger(), &before);
    }

    #[test]
    fn test_delete_with_outstanding_loan_rejected() {
        let mut engine = sample_engine();
        let org = engine.create_organisation("alice", "Acme").unwrap();
        engine
            .ledger_mut()
            .account_mut(&org)
            .unwrap()
            .loans
            .push(Loan::new(1, now(), 1000, 1100));

        let result = engine.delete_organisation("alice", org.id());

        assert_eq!(
            result,
            Err(LedgerError::OutstandingLoans {
                account: "Acme".to_string(),
                outstanding: 1100
            })
        );
        assert!(engine.ledger().account(&org).is_some());
    }

    #[test]
    fn test_delete_by_non_owner_rejected() {
        let mut engine = sample_engine();
        let org = engine.create_organisation("alice", "Acme").unwrap();

        assert!(matches!(
            engine.delete_organisation("bob", org.id()),
            Err(LedgerError::NotAuthorized { .. })
        ));
    }
}
