//! I/O module
//!
//! Handles the JSON snapshot and CSV reporting.
//!
//! # Components
//!
//! - `json_store` - Load and save of the whole-ledger snapshot
//! - `csv_report` - Account balances as CSV

pub mod csv_report;
pub mod json_store;

pub use csv_report::write_accounts_csv;
pub use json_store::{load_ledger, save_ledger};
