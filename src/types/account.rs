//! Account-related types
//!
//! Accounts live in two id spaces, personal and organisation. An
//! [`AccountRef`] records which space an id was resolved in so the engine
//! never has to guess again.

use super::loan::Loan;
use super::money::Amount;
use super::null_as_default;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque account identifier
pub type AccountId = String;

/// Organisation id of the treasury, the sink for all taxes
pub const TREASURY_ID: &str = "1000";

/// Organisation id of the bank, which issues loans and collects repayments
pub const BANK_ID: &str = "1003";

/// Organisation id of the casino, the counterparty of every gamble
pub const CASINO_ID: &str = "1023";

/// Account state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Account {
    /// Display name
    pub name: String,

    /// Balance in minor units, never negative
    pub balance: Amount,

    /// Outstanding loans, oldest first
    ///
    /// Repayments are applied to the front of this list.
    #[serde(default, deserialize_with = "null_as_default")]
    pub loans: Vec<Loan>,
}

impl Account {
    /// Create an empty account with no loans
    pub fn new(name: impl Into<String>) -> Self {
        Account {
            name: name.into(),
            balance: 0,
            loans: Vec::new(),
        }
    }

    /// Sum of `amount_due` over every outstanding loan
    pub fn outstanding_debt(&self) -> Amount {
        self.loans.iter().map(|loan| loan.amount_due).sum()
    }
}

/// A resolved reference to an account
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AccountRef {
    Personal(AccountId),
    Organisation(AccountId),
}

impl AccountRef {
    pub fn treasury() -> Self {
        AccountRef::Organisation(TREASURY_ID.to_string())
    }

    pub fn bank() -> Self {
        AccountRef::Organisation(BANK_ID.to_string())
    }

    pub fn casino() -> Self {
        AccountRef::Organisation(CASINO_ID.to_string())
    }

    pub fn id(&self) -> &str {
        match self {
            AccountRef::Personal(id) | AccountRef::Organisation(id) => id,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            AccountRef::Personal(_) => "personal",
            AccountRef::Organisation(_) => "organisation",
        }
    }

    /// Name of the reserved organisation this refers to, if any
    pub fn reserved_name(&self) -> Option<&'static str> {
        match self {
            AccountRef::Organisation(id) => match id.as_str() {
                TREASURY_ID => Some("treasury"),
                BANK_ID => Some("bank"),
                CASINO_ID => Some("casino"),
                _ => None,
            },
            AccountRef::Personal(_) => None,
        }
    }
}

impl fmt::Display for AccountRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} account {}", self.kind(), self.id())
    }
}
