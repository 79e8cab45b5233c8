//! Core business logic module
//!
//! This module contains the ledger and everything that changes it:
//! - `ledger` - Persisted state and lookups
//! - `engine` - Transfers, the only path that moves coins between accounts
//! - `loans` - Loan issuance, FIFO repayment and the loan book
//! - `scheduler` - Loan warning and overdue deadlines
//! - `wealth_tax` - Daily levy on standing balances
//! - `calendar` - Recurring bank holidays
//! - `organisations` - Organisation lifecycle
//! - `commands` - Typed command surface and dispatch

pub mod calendar;
pub mod commands;
pub mod engine;
pub mod ledger;
pub mod loans;
pub mod organisations;
pub mod scheduler;
pub mod wealth_tax;

#[cfg(test)]
pub(crate) mod test_support;

pub use calendar::{BankHoliday, HolidayChange};
pub use commands::{BalanceSheet, Caller, Command, GambleResult, Outcome, RateKind};
pub use engine::{LedgerEngine, TransferReceipt};
pub use ledger::Ledger;
pub use loans::{IssuedLoan, LoanBook, LoanContribution, LoanEntry};
pub use scheduler::{DeadlineKind, LoanDeadline, LoanScheduler};
pub use wealth_tax::{WealthTaxLevy, WealthTaxReport};
