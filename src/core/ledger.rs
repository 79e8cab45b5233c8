//! Ledger store
//!
//! This module provides the [`Ledger`], the whole persisted state of the
//! economy: users, personal and organisation accounts, id counters, economic
//! parameters and the bank-holiday calendar.
//!
//! The ledger is storage and lookup only. It hands out shared references to
//! accounts; mutable access is crate-private so that every balance change goes
//! through the engine, which is where conservation of currency is enforced.

use crate::core::calendar::BankHoliday;
use crate::types::{
    null_as_default, Account, AccountId, AccountRef, Amount, LedgerError, LoanId, Privilege,
    User, UserId, BANK_ID, CASINO_ID, TREASURY_ID,
};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::warn;

/// First organisation id handed out by [`Ledger::bootstrap`] after the
/// reserved organisations
const FIRST_FREE_ORG: u64 = 1024;

/// Whole-state ledger
///
/// Field names follow the snapshot file format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Ledger {
    #[serde(default, deserialize_with = "null_as_default")]
    users: BTreeMap<UserId, User>,

    #[serde(default, deserialize_with = "null_as_default")]
    personal_accounts: BTreeMap<AccountId, Account>,

    #[serde(default, deserialize_with = "null_as_default")]
    organisation_accounts: BTreeMap<AccountId, Account>,

    #[serde(default)]
    next_personal: u64,

    #[serde(default)]
    next_org: u64,

    #[serde(default)]
    next_loan: LoanId,

    /// Percentage withheld from every transfer
    #[serde(default, with = "rust_decimal::serde::arbitrary_precision")]
    transaction_tax: Decimal,

    /// Percentage levied on standing balances by the daily sweep
    #[serde(default, with = "rust_decimal::serde::arbitrary_precision")]
    wealth_tax: Decimal,

    /// Daily allowance paid to members of parliament
    #[serde(default)]
    mp_pay: Amount,

    #[serde(default)]
    last_wealth_tax: DateTime<Utc>,

    #[serde(default, deserialize_with = "null_as_default")]
    bank_holidays: BTreeSet<BankHoliday>,

    /// Percentage added to a loan's principal at issuance
    #[serde(default, with = "rust_decimal::serde::arbitrary_precision")]
    loan_interest: Decimal,

    /// Payout multiplier for a winning gamble
    #[serde(default, with = "rust_decimal::serde::arbitrary_precision")]
    casino_returns: Decimal,
}

impl Ledger {
    /// Create a fresh economy
    ///
    /// Creates the treasury, bank and casino at their reserved ids and an
    /// owner who holds every privilege and controls all three. The
    /// `initial_supply` is credited to the treasury; this is the only place
    /// currency is created.
    pub fn bootstrap(
        owner_id: &str,
        owner_name: &str,
        initial_supply: Amount,
        now: DateTime<Utc>,
    ) -> Self {
        let mut ledger = Ledger {
            users: BTreeMap::new(),
            personal_accounts: BTreeMap::new(),
            organisation_accounts: BTreeMap::new(),
            next_personal: 0,
            next_org: FIRST_FREE_ORG,
            next_loan: 1,
            transaction_tax: Decimal::new(2, 0),
            wealth_tax: Decimal::new(1, 0),
            mp_pay: 200,
            last_wealth_tax: now,
            bank_holidays: BTreeSet::new(),
            loan_interest: Decimal::new(10, 0),
            casino_returns: Decimal::new(5, 0),
        };

        let mut treasury = Account::new("Treasury");
        treasury.balance = initial_supply.max(0);
        ledger
            .organisation_accounts
            .insert(TREASURY_ID.to_string(), treasury);
        ledger
            .organisation_accounts
            .insert(BANK_ID.to_string(), Account::new("Bank"));
        ledger
            .organisation_accounts
            .insert(CASINO_ID.to_string(), Account::new("Casino"));

        ledger.ensure_user(owner_id, owner_name);
        if let Some(owner) = ledger.users.get_mut(owner_id) {
            owner.set(Privilege::SuperUser, true);
            owner.set(Privilege::BankHolidaySetter, true);
            for id in [TREASURY_ID, BANK_ID, CASINO_ID] {
                owner.add_organisation(id);
            }
        }

        ledger
    }

    /// Repair state read from an older snapshot
    ///
    /// Recreates any missing reserved organisation with an empty balance,
    /// assigns ids to loans that have none and moves the loan counter past
    /// every id in use.
    pub fn normalise(&mut self) {
        for (id, name) in [(TREASURY_ID, "Treasury"), (BANK_ID, "Bank"), (CASINO_ID, "Casino")] {
            if !self.organisation_accounts.contains_key(id) {
                warn!(id, name, "Snapshot is missing a reserved organisation, recreating it");
                self.organisation_accounts
                    .insert(id.to_string(), Account::new(name));
            }
        }

        let highest = self
            .personal_accounts
            .values()
            .chain(self.organisation_accounts.values())
            .flat_map(|account| account.loans.iter())
            .map(|loan| loan.id)
            .max()
            .unwrap_or(0);
        self.next_loan = self.next_loan.max(highest + 1);

        let mut next = self.next_loan;
        for account in self
            .personal_accounts
            .values_mut()
            .chain(self.organisation_accounts.values_mut())
        {
            for loan in account.loans.iter_mut().filter(|loan| loan.id == 0) {
                loan.id = next;
                next += 1;
            }
        }
        self.next_loan = next;
    }

    // Users

    pub fn user(&self, id: &str) -> Option<&User> {
        self.users.get(id)
    }

    pub fn user_or_err(&self, id: &str) -> Result<&User, LedgerError> {
        self.user(id).ok_or_else(|| LedgerError::user_not_found(id))
    }

    pub fn users(&self) -> impl Iterator<Item = (&UserId, &User)> {
        self.users.iter()
    }

    pub(crate) fn user_mut(&mut self, id: &str) -> Result<&mut User, LedgerError> {
        self.users
            .get_mut(id)
            .ok_or_else(|| LedgerError::user_not_found(id))
    }

    /// Register a user seen for the first time
    ///
    /// Creates the user and a personal account named after them. Returns
    /// `true` if the user was new.
    pub fn ensure_user(&mut self, id: &str, name: &str) -> bool {
        if self.users.contains_key(id) {
            return false;
        }
        let account_id = next_free_id(
            &mut self.next_personal,
            &self.personal_accounts,
            &self.organisation_accounts,
        );
        self.personal_accounts
            .insert(account_id.clone(), Account::new(name));
        self.users.insert(id.to_string(), User::new(account_id));
        true
    }

    /// Grant or revoke a privilege
    pub fn grant(
        &mut self,
        user_id: &str,
        privilege: Privilege,
        enabled: bool,
    ) -> Result<(), LedgerError> {
        self.user_mut(user_id)?.set(privilege, enabled);
        Ok(())
    }

    // Accounts

    /// Resolve an id to an account reference
    ///
    /// Personal accounts are checked before organisations.
    pub fn resolve(&self, id: &str) -> Result<AccountRef, LedgerError> {
        if self.personal_accounts.contains_key(id) {
            Ok(AccountRef::Personal(id.to_string()))
        } else if self.organisation_accounts.contains_key(id) {
            Ok(AccountRef::Organisation(id.to_string()))
        } else {
            Err(LedgerError::account_not_found(id))
        }
    }

    pub fn resolve_organisation(&self, id: &str) -> Result<AccountRef, LedgerError> {
        if self.organisation_accounts.contains_key(id) {
            Ok(AccountRef::Organisation(id.to_string()))
        } else {
            Err(LedgerError::organisation_not_found(id))
        }
    }

    /// The personal account of a user
    pub fn personal_account_of(&self, user_id: &str) -> Result<AccountRef, LedgerError> {
        let user = self.user_or_err(user_id)?;
        Ok(AccountRef::Personal(user.personal_account.clone()))
    }

    pub fn account(&self, account: &AccountRef) -> Option<&Account> {
        match account {
            AccountRef::Personal(id) => self.personal_accounts.get(id),
            AccountRef::Organisation(id) => self.organisation_accounts.get(id),
        }
    }

    pub fn account_or_err(&self, account: &AccountRef) -> Result<&Account, LedgerError> {
        self.account(account)
            .ok_or_else(|| LedgerError::account_not_found(account.id()))
    }

    pub(crate) fn account_mut(&mut self, account: &AccountRef) -> Result<&mut Account, LedgerError> {
        match account {
            AccountRef::Personal(id) => self.personal_accounts.get_mut(id),
            AccountRef::Organisation(id) => self.organisation_accounts.get_mut(id),
        }
        .ok_or_else(|| LedgerError::account_not_found(account.id()))
    }

    pub fn balance(&self, account: &AccountRef) -> Option<Amount> {
        self.account(account).map(|account| account.balance)
    }

    /// Every account, personal accounts first
    pub fn accounts(&self) -> impl Iterator<Item = (AccountRef, &Account)> {
        let personal = self
            .personal_accounts
            .iter()
            .map(|(id, account)| (AccountRef::Personal(id.clone()), account));
        let organisations = self
            .organisation_accounts
            .iter()
            .map(|(id, account)| (AccountRef::Organisation(id.clone()), account));
        personal.chain(organisations)
    }

    /// Name shown to users; personal accounts carry a `(Personal)` suffix
    pub fn display_name(&self, account: &AccountRef) -> String {
        match (account, self.account(account)) {
            (AccountRef::Personal(_), Some(found)) => format!("{} (Personal)", found.name),
            (AccountRef::Organisation(_), Some(found)) => found.name.clone(),
            (_, None) => account.id().to_string(),
        }
    }

    /// The user who controls an account
    pub fn owner_of(&self, account: &AccountRef) -> Option<&UserId> {
        self.users
            .iter()
            .find(|(_, user)| match account {
                AccountRef::Personal(id) => &user.personal_account == id,
                AccountRef::Organisation(id) => user.owns(id),
            })
            .map(|(id, _)| id)
    }

    /// A user's personal account followed by the organisations they own
    pub fn accounts_of(&self, user_id: &str) -> Result<Vec<AccountRef>, LedgerError> {
        let user = self.user_or_err(user_id)?;
        let mut accounts = vec![AccountRef::Personal(user.personal_account.clone())];
        accounts.extend(
            user.organisations
                .iter()
                .filter(|id| self.organisation_accounts.contains_key(*id))
                .map(|id| AccountRef::Organisation(id.clone())),
        );
        Ok(accounts)
    }

    pub(crate) fn insert_organisation(&mut self, owner: &str, name: &str) -> Result<AccountRef, LedgerError> {
        if !self.users.contains_key(owner) {
            return Err(LedgerError::user_not_found(owner));
        }
        let id = next_free_id(
            &mut self.next_org,
            &self.organisation_accounts,
            &self.personal_accounts,
        );
        self.organisation_accounts
            .insert(id.clone(), Account::new(name));
        self.user_mut(owner)?.add_organisation(&id);
        Ok(AccountRef::Organisation(id))
    }

    /// Remove an organisation account and every user's claim to it
    pub(crate) fn remove_organisation(&mut self, id: &str) -> Option<Account> {
        for user in self.users.values_mut() {
            user.remove_organisation(id);
        }
        self.organisation_accounts.remove(id)
    }

    pub(crate) fn allocate_loan_id(&mut self) -> LoanId {
        let id = self.next_loan.max(1);
        self.next_loan = id + 1;
        id
    }

    /// Sum of every account balance
    pub fn total_currency(&self) -> Amount {
        self.accounts().map(|(_, account)| account.balance).sum()
    }

    // Economic parameters

    pub fn transaction_tax(&self) -> Decimal {
        self.transaction_tax
    }

    pub fn wealth_tax(&self) -> Decimal {
        self.wealth_tax
    }

    pub fn loan_interest(&self) -> Decimal {
        self.loan_interest
    }

    pub fn casino_returns(&self) -> Decimal {
        self.casino_returns
    }

    pub fn daily_allowance(&self) -> Amount {
        self.mp_pay
    }

    pub fn last_wealth_tax(&self) -> DateTime<Utc> {
        self.last_wealth_tax
    }

    pub(crate) fn set_transaction_tax(&mut self, rate: Decimal) {
        self.transaction_tax = rate;
    }

    pub(crate) fn set_wealth_tax(&mut self, rate: Decimal) {
        self.wealth_tax = rate;
    }

    pub(crate) fn set_loan_interest(&mut self, rate: Decimal) {
        self.loan_interest = rate;
    }

    pub(crate) fn set_casino_returns(&mut self, returns: Decimal) {
        self.casino_returns = returns;
    }

    pub(crate) fn set_last_wealth_tax(&mut self, at: DateTime<Utc>) {
        self.last_wealth_tax = at;
    }

    // Calendar

    pub fn is_holiday(&self, date: NaiveDate) -> bool {
        self.bank_holidays.iter().any(|holiday| holiday.falls_on(date))
    }

    pub fn bank_holidays(&self) -> impl Iterator<Item = &BankHoliday> {
        self.bank_holidays.iter()
    }

    /// Holidays with their next date, soonest first
    pub fn upcoming_holidays(&self, today: NaiveDate) -> Vec<(BankHoliday, NaiveDate)> {
        let mut upcoming: Vec<(BankHoliday, NaiveDate)> = self
            .bank_holidays
            .iter()
            .filter_map(|holiday| Some((*holiday, holiday.next_occurrence(today)?)))
            .collect();
        upcoming.sort_by_key(|(_, date)| *date);
        upcoming
    }

    pub(crate) fn holidays_mut(&mut self) -> &mut BTreeSet<BankHoliday> {
        &mut self.bank_holidays
    }

    #[cfg(test)]
    pub(crate) fn set_balance(&mut self, account: &AccountRef, balance: Amount) {
        if let Ok(found) = self.account_mut(account) {
            found.balance = balance;
        }
    }

    #[cfg(test)]
    pub(crate) fn set_daily_allowance(&mut self, amount: Amount) {
        self.mp_pay = amount;
    }
}

/// Take the next counter value not already used as a key in either map
fn next_free_id(
    counter: &mut u64,
    own: &BTreeMap<AccountId, Account>,
    other: &BTreeMap<AccountId, Account>,
) -> AccountId {
    loop {
        let id = counter.to_string();
        *counter += 1;
        if !own.contains_key(&id) && !other.contains_key(&id) {
            return id;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Loan;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 9, 0, 0).unwrap()
    }

    #[test]
    fn test_bootstrap_creates_reserved_organisations() {
        let ledger = Ledger::bootstrap("owner", "Olive", 10_000, now());

        assert_eq!(ledger.balance(&AccountRef::treasury()), Some(10_000));
        assert_eq!(ledger.balance(&AccountRef::bank()), Some(0));
        assert_eq!(ledger.balance(&AccountRef::casino()), Some(0));
        assert_eq!(ledger.total_currency(), 10_000);

        let owner = ledger.user("owner").unwrap();
        assert!(owner.super_user);
        assert!(owner.bank_holiday_setter);
        assert!(owner.owns(TREASURY_ID) && owner.owns(BANK_ID) && owner.owns(CASINO_ID));
        assert_eq!(ledger.owner_of(&AccountRef::bank()), Some(&"owner".to_string()));
        assert_eq!(ledger.last_wealth_tax(), now());
    }

    #[test]
    fn test_ensure_user_creates_personal_account_once() {
        let mut ledger = Ledger::bootstrap("owner", "Olive", 0, now());

        assert!(ledger.ensure_user("alice", "Alice"));
        assert!(!ledger.ensure_user("alice", "Someone Else"));

        let account = ledger.personal_account_of("alice").unwrap();
        assert_eq!(ledger.account(&account).unwrap().name, "Alice");
        assert_eq!(ledger.display_name(&account), "Alice (Personal)");
        assert_eq!(ledger.owner_of(&account), Some(&"alice".to_string()));
    }

    #[test]
    fn test_id_spaces_never_collide() {
        let mut ledger = Ledger::bootstrap("owner", "Olive", 0, now());
        ledger.next_personal = 1000;

        ledger.ensure_user("alice", "Alice");
        let account = ledger.personal_account_of("alice").unwrap();
        assert_eq!(account.id(), "1001");
        assert_eq!(ledger.resolve(TREASURY_ID).unwrap(), AccountRef::treasury());
    }

    #[test]
    fn test_resolve_unknown_account() {
        let ledger = Ledger::bootstrap("owner", "Olive", 0, now());
        assert_eq!(
            ledger.resolve("nope"),
            Err(LedgerError::account_not_found("nope"))
        );
        assert!(ledger.resolve_organisation("0").is_err());
    }

    #[test]
    fn test_remove_organisation_clears_every_owner() {
        let mut ledger = Ledger::bootstrap("owner", "Olive", 0, now());
        ledger.ensure_user("alice", "Alice");
        let org = ledger.insert_organisation("alice", "Acme").unwrap();
        ledger.user_mut("owner").unwrap().add_organisation(org.id());

        assert!(ledger.remove_organisation(org.id()).is_some());
        assert!(!ledger.user("alice").unwrap().owns(org.id()));
        assert!(!ledger.user("owner").unwrap().owns(org.id()));
        assert!(ledger.resolve(org.id()).is_err());
    }

    #[test]
    fn test_normalise_assigns_missing_loan_ids() {
        let mut ledger = Ledger::bootstrap("owner", "Olive", 0, now());
        ledger.ensure_user("alice", "Alice");
        let alice = ledger.personal_account_of("alice").unwrap();
        let account = ledger.account_mut(&alice).unwrap();
        account.loans.push(Loan::new(0, now(), 100, 110));
        account.loans.push(Loan::new(7, now(), 100, 110));
        account.loans.push(Loan::new(0, now(), 100, 110));

        ledger.normalise();

        let ids: Vec<LoanId> = ledger
            .account(&alice)
            .unwrap()
            .loans
            .iter()
            .map(|loan| loan.id)
            .collect();
        assert_eq!(ids, vec![8, 7, 9]);
        assert_eq!(ledger.allocate_loan_id(), 10);
    }

    #[test]
    fn test_normalise_recreates_missing_reserved_organisations() {
        let mut ledger = Ledger::bootstrap("owner", "Olive", 0, now());
        ledger.ensure_user("alice", "Alice");
        ledger.set_balance(&AccountRef::Personal("1".to_string()), 1_000);
        ledger.remove_organisation(TREASURY_ID);
        ledger.remove_organisation(CASINO_ID);
        let total_before = ledger.total_currency();

        ledger.normalise();

        assert_eq!(ledger.balance(&AccountRef::treasury()), Some(0));
        assert_eq!(ledger.balance(&AccountRef::casino()), Some(0));
        assert_eq!(ledger.account(&AccountRef::treasury()).unwrap().name, "Treasury");
        assert_eq!(ledger.total_currency(), total_before);
    }

    #[test]
    fn test_rates_survive_round_trip_exactly() {
        let mut ledger = Ledger::bootstrap("owner", "Olive", 0, now());
        let rate: Decimal = "2.123456789012345678".parse().unwrap();
        ledger.set_transaction_tax(rate);
        ledger.set_casino_returns(Decimal::new(15, 1));

        let json = serde_json::to_string(&ledger).unwrap();
        assert!(json.contains("\"TransactionTax\":2.123456789012345678"));
        let restored: Ledger = serde_json::from_str(&json).unwrap();

        assert_eq!(restored.transaction_tax(), rate);
        assert_eq!(restored.casino_returns(), Decimal::new(15, 1));
        assert_eq!(restored, ledger);
    }

    #[test]
    fn test_snapshot_round_trip() {
        let mut ledger = Ledger::bootstrap("owner", "Olive", 5_000, now());
        ledger.ensure_user("alice", "Alice");
        ledger
            .holidays_mut()
            .insert(BankHoliday::new(25, 12).unwrap());

        let json = serde_json::to_string(&ledger).unwrap();
        let restored: Ledger = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, ledger);
    }
}
