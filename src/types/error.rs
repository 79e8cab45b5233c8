//! Error types for the cheesecoin ledger
//!
//! Every validation failure is reported as a [`LedgerError`] before any
//! balance is touched, so a failed operation leaves the ledger unchanged.
//! The `Display` text is written to be shown to the user as-is.
//!
//! # Error Categories
//!
//! - **Validation**: invalid amounts, rates, dates and dice predictions
//! - **Funds**: insufficient funds, outstanding loans
//! - **Access**: missing privilege or ownership, protected organisations
//! - **Lookup**: unknown users and accounts
//! - **Calendar**: bank holidays and the daily allowance cooldown
//! - **Persistence**: file I/O and JSON (de)serialization

use super::money::{format_cheesecoins, Amount};
use rust_decimal::Decimal;
use thiserror::Error;

/// Main error type for the ledger
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LedgerError {
    /// Negative (or otherwise unusable) amount
    #[error("Invalid amount {}", format_cheesecoins(*amount))]
    InvalidAmount { amount: Amount },

    /// Payer balance is lower than the requested amount
    #[error("{account} has only {}", format_cheesecoins(*balance))]
    InsufficientFunds {
        /// Display name of the payer
        account: String,
        /// Payer balance at the time of the request
        balance: Amount,
        requested: Amount,
    },

    /// Caller lacks the privilege or ownership the operation needs
    #[error("You are not authorised to {action}")]
    NotAuthorized { action: String },

    /// Unknown user, account or organisation
    #[error("No {kind} with id '{id}'")]
    NotFound { kind: String, id: String },

    /// Attempt to delete the treasury, bank or casino
    #[error("You cannot delete the {name}")]
    ProtectedResource { name: String },

    /// Ledger-mutating command on a bank holiday
    #[error("Today is a bank holiday so no banking must be done.")]
    BankHoliday,

    #[error("{day}/{month} is not a valid day of the year")]
    InvalidDate { day: i64, month: i64 },

    #[error("Invalid rate {rate}: {reason}")]
    InvalidRate { rate: Decimal, reason: String },

    #[error("{prediction} is not a face of a six-sided die")]
    InvalidPrediction { prediction: i64 },

    /// Daily allowance claimed again too soon
    #[error("You can claim this benefit only once per day. You last claimed it {elapsed} ago")]
    AllowanceAlreadyClaimed { elapsed: String },

    /// Organisation cannot be deleted while it owes the bank
    #[error("{account} still owes {} to the bank", format_cheesecoins(*outstanding))]
    OutstandingLoans { account: String, outstanding: Amount },

    /// Snapshot file does not exist
    #[error("File not found: {path}")]
    FileNotFound { path: String },

    #[error("I/O error: {message}")]
    Io { message: String },

    #[error("Serialization error: {message}")]
    Serialization { message: String },
}

impl From<std::io::Error> for LedgerError {
    fn from(error: std::io::Error) -> Self {
        LedgerError::Io {
            message: error.to_string(),
        }
    }
}

impl From<serde_json::Error> for LedgerError {
    fn from(error: serde_json::Error) -> Self {
        LedgerError::Serialization {
            message: error.to_string(),
        }
    }
}

impl From<csv::Error> for LedgerError {
    fn from(error: csv::Error) -> Self {
        LedgerError::Serialization {
            message: error.to_string(),
        }
    }
}

// Helper functions for creating common errors

impl LedgerError {
    pub fn invalid_amount(amount: Amount) -> Self {
        LedgerError::InvalidAmount { amount }
    }

    pub fn insufficient_funds(account: &str, balance: Amount, requested: Amount) -> Self {
        LedgerError::InsufficientFunds {
            account: account.to_string(),
            balance,
            requested,
        }
    }

    pub fn not_authorized(action: impl Into<String>) -> Self {
        LedgerError::NotAuthorized {
            action: action.into(),
        }
    }

    pub fn user_not_found(id: &str) -> Self {
        LedgerError::NotFound {
            kind: "user".to_string(),
            id: id.to_string(),
        }
    }

    pub fn account_not_found(id: &str) -> Self {
        LedgerError::NotFound {
            kind: "account".to_string(),
            id: id.to_string(),
        }
    }

    pub fn organisation_not_found(id: &str) -> Self {
        LedgerError::NotFound {
            kind: "organisation".to_string(),
            id: id.to_string(),
        }
    }

    pub fn protected_resource(name: &str) -> Self {
        LedgerError::ProtectedResource {
            name: name.to_string(),
        }
    }

    pub fn invalid_rate(rate: Decimal, reason: &str) -> Self {
        LedgerError::InvalidRate {
            rate,
            reason: reason.to_string(),
        }
    }

    /// Whether this error is a validation outcome rather than an I/O failure
    pub fn is_recoverable(&self) -> bool {
        !matches!(
            self,
            LedgerError::FileNotFound { .. } | LedgerError::Io { .. } | LedgerError::Serialization { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::invalid_amount(
        LedgerError::InvalidAmount { amount: -500 },
        "Invalid amount -5.00cc"
    )]
    #[case::insufficient_funds(
        LedgerError::InsufficientFunds { account: "Alice (Personal)".to_string(), balance: 1050, requested: 5000 },
        "Alice (Personal) has only 10.50cc"
    )]
    #[case::not_authorized(
        LedgerError::NotAuthorized { action: "set the wealth tax".to_string() },
        "You are not authorised to set the wealth tax"
    )]
    #[case::not_found(
        LedgerError::NotFound { kind: "account".to_string(), id: "42".to_string() },
        "No account with id '42'"
    )]
    #[case::protected(
        LedgerError::ProtectedResource { name: "treasury".to_string() },
        "You cannot delete the treasury"
    )]
    #[case::bank_holiday(
        LedgerError::BankHoliday,
        "Today is a bank holiday so no banking must be done."
    )]
    #[case::invalid_date(
        LedgerError::InvalidDate { day: 31, month: 2 },
        "31/2 is not a valid day of the year"
    )]
    #[case::invalid_prediction(
        LedgerError::InvalidPrediction { prediction: 7 },
        "7 is not a face of a six-sided die"
    )]
    #[case::outstanding_loans(
        LedgerError::OutstandingLoans { account: "Acme".to_string(), outstanding: 1100 },
        "Acme still owes 11.00cc to the bank"
    )]
    #[case::file_not_found(
        LedgerError::FileNotFound { path: "data.json".to_string() },
        "File not found: data.json"
    )]
    fn test_error_display(#[case] error: LedgerError, #[case] expected: &str) {
        assert_eq!(error.to_string(), expected);
    }

    #[rstest]
    #[case::insufficient_funds(
        LedgerError::insufficient_funds("Alice", 100, 200),
        LedgerError::InsufficientFunds { account: "Alice".to_string(), balance: 100, requested: 200 }
    )]
    #[case::user_not_found(
        LedgerError::user_not_found("99"),
        LedgerError::NotFound { kind: "user".to_string(), id: "99".to_string() }
    )]
    #[case::organisation_not_found(
        LedgerError::organisation_not_found("2000"),
        LedgerError::NotFound { kind: "organisation".to_string(), id: "2000".to_string() }
    )]
    #[case::protected(
        LedgerError::protected_resource("bank"),
        LedgerError::ProtectedResource { name: "bank".to_string() }
    )]
    fn test_helper_functions(#[case] result: LedgerError, #[case] expected: LedgerError) {
        assert_eq!(result, expected);
    }

    #[test]
    fn test_io_error_conversion() {
        let io_error =
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "Permission denied");
        let error: LedgerError = io_error.into();
        assert!(matches!(error, LedgerError::Io { .. }));
        assert_eq!(error.to_string(), "I/O error: Permission denied");
        assert!(!error.is_recoverable());
    }

    #[test]
    fn test_validation_errors_are_recoverable() {
        assert!(LedgerError::BankHoliday.is_recoverable());
        assert!(LedgerError::invalid_amount(-1).is_recoverable());
    }
}
