//! Types module
//!
//! Contains core data structures used throughout the application.
//! This module organizes types into logical submodules:
//! - `account`: accounts and resolved account references
//! - `loan`: loans held against an account
//! - `user`: chat platform users and privileges
//! - `money`: minor-unit amounts and rate arithmetic
//! - `notification`: outbound direct messages
//! - `error`: error types for the ledger

pub mod account;
pub mod error;
pub mod loan;
pub mod money;
pub mod notification;
pub mod user;

pub use account::{Account, AccountId, AccountRef, BANK_ID, CASINO_ID, TREASURY_ID};
pub use error::LedgerError;
pub use loan::{Loan, LoanId};
pub use money::{cheesecoins_from_float, format_cheesecoins, Amount};
pub use notification::Notification;
pub use user::{Privilege, User, UserId};

use serde::{Deserialize, Deserializer};

/// Read a JSON `null` as the type's default
///
/// Older snapshots write empty lists as `null`.
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
