//! CSV report of account balances
//!
//! One row per account with columns: id, kind, name, balance, loans.
//! Personal accounts come first, each group ordered by id. Balances are
//! written in cheesecoins with two decimal places, `loans` is the total still
//! owed to the bank.

use crate::core::Ledger;
use crate::types::LedgerError;
use rust_decimal::Decimal;
use std::io::Write;

/// Write every account of `ledger` to `output`
///
/// # Arguments
///
/// * `ledger` - Ledger to report on
/// * `output` - Mutable reference to a writer for outputting CSV
///
/// # Returns
///
/// * `Ok(())` if writing succeeded
/// * `Err(LedgerError::Serialization)` if a write error occurred
pub fn write_accounts_csv(ledger: &Ledger, output: &mut dyn Write) -> Result<(), LedgerError> {
    use csv::Writer;

    let mut writer = Writer::from_writer(output);
    writer.write_record(["id", "kind", "name", "balance", "loans"])?;

    for (account, found) in ledger.accounts() {
        writer.write_record(&[
            account.id().to_string(),
            account.kind().to_string(),
            found.name.clone(),
            format!("{:.2}", Decimal::new(found.balance, 2)),
            format!("{:.2}", Decimal::new(found.outstanding_debt(), 2)),
        ])?;
    }

    writer.flush()?;
    Ok(())
}
