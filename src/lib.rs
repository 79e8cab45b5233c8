//! Cheesebank Library
//! # Overview
//!
//! This library provides the ledger behind a chat-bot economy: cheesecoin
//! balances for users and organisations, transfers with tax, bank loans with
//! FIFO repayment, a daily wealth tax and a bank-holiday calendar.
//!
//! # Architecture
//!
//! The system is organized into several key components:
//!
//! - [`types`] - Core data types (Account, Loan, User, LedgerError, etc.)
//! - [`cli`] - CLI arguments parsing
//! - [`core`] - Business logic components:
//!   - [`core::ledger`] - Persisted state and lookups
//!   - [`core::engine`] - Transfers with tax and loan amortization
//!   - [`core::scheduler`] - Loan warning and overdue deadlines
//!   - [`core::wealth_tax`] - Daily levy on standing balances
//!   - [`core::commands`] - Typed command surface
//! - [`io`] - JSON snapshot and CSV report
//! - [`service`] - Single-writer runtime with maintenance and snapshot loops
//!
//! # Money
//!
//! Amounts are whole minor units (hundredths of a cheesecoin) held in an
//! `i64`; rates are `Decimal` percentages. A transfer of `amount` at a
//! transaction tax of `rate` moves:
//!
//! - `amount` out of the payer
//! - `amount - ceil(amount * rate / 100)` into the recipient
//! - the rest into the treasury
//!
//! Currency is only created when a ledger is bootstrapped, so the sum of all
//! balances never changes afterwards.

// Module declarations
pub mod cli;
pub mod core;
pub mod io;
pub mod service;
pub mod types;

pub use crate::core::{Caller, Command, Ledger, LedgerEngine, Outcome, TransferReceipt};
pub use io::{load_ledger, save_ledger, write_accounts_csv};
pub use service::{LedgerService, Notifier, ServiceConfig};
pub use types::{
    format_cheesecoins, Account, AccountRef, Amount, LedgerError, Loan, Notification, User,
};
