//! Chat platform users and their privileges

use super::account::AccountId;
use super::null_as_default;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// External platform user id
pub type UserId = String;

/// Privilege flags a user may hold
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Privilege {
    /// May set tax rates
    SuperUser,
    /// May add and remove bank holidays
    BankHolidaySetter,
    /// May claim the daily allowance
    MemberOfParliament,
}

/// A user of the bot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct User {
    /// Id of the user's personal account
    pub personal_account: AccountId,

    #[serde(default)]
    pub super_user: bool,

    #[serde(default)]
    pub bank_holiday_setter: bool,

    #[serde(default)]
    pub mp: bool,

    /// Last time the daily allowance was claimed
    #[serde(default)]
    pub last_pay: DateTime<Utc>,

    /// Organisation accounts this user controls
    #[serde(default, deserialize_with = "null_as_default")]
    pub organisations: Vec<AccountId>,
}

impl User {
    pub fn new(personal_account: impl Into<AccountId>) -> Self {
        User {
            personal_account: personal_account.into(),
            super_user: false,
            bank_holiday_setter: false,
            mp: false,
            last_pay: DateTime::<Utc>::default(),
            organisations: Vec::new(),
        }
    }

    pub fn has(&self, privilege: Privilege) -> bool {
        match privilege {
            Privilege::SuperUser => self.super_user,
            Privilege::BankHolidaySetter => self.bank_holiday_setter,
            Privilege::MemberOfParliament => self.mp,
        }
    }

    pub fn set(&mut self, privilege: Privilege, enabled: bool) {
        match privilege {
            Privilege::SuperUser => self.super_user = enabled,
            Privilege::BankHolidaySetter => self.bank_holiday_setter = enabled,
            Privilege::MemberOfParliament => self.mp = enabled,
        }
    }

    pub fn owns(&self, organisation: &str) -> bool {
        self.organisations.iter().any(|org| org == organisation)
    }

    /// Add an organisation, ignoring duplicates
    pub(crate) fn add_organisation(&mut self, organisation: &str) {
        if !self.owns(organisation) {
            self.organisations.push(organisation.to_string());
        }
    }

    /// Remove an organisation, returning whether it was present
    pub(crate) fn remove_organisation(&mut self, organisation: &str) -> bool {
        let before = self.organisations.len();
        self.organisations.retain(|org| org != organisation);
        self.organisations.len() != before
    }
}
