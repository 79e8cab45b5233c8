//! Loan records held against an account

use super::money::Amount;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Loan identifier
///
/// `0` marks a loan read from a snapshot that predates loan ids; the ledger
/// assigns a real id to such loans when it is loaded.
pub type LoanId = u64;

/// Days after origination at which the borrower is warned
pub const WARNING_AFTER_DAYS: i64 = 5;

/// Days after origination at which the loan is due
pub const DUE_AFTER_DAYS: i64 = 7;

/// A loan issued by the bank
///
/// `warning` and `overdue` only ever go from `false` to `true`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Loan {
    #[serde(default)]
    pub id: LoanId,

    /// Origination time
    pub start: DateTime<Utc>,

    /// Amount still to be repaid, principal plus interest less repayments
    pub amount_due: Amount,

    /// Principal
    pub loan_value: Amount,

    #[serde(default)]
    pub warning: bool,

    #[serde(default)]
    pub overdue: bool,
}

impl Loan {
    pub fn new(id: LoanId, start: DateTime<Utc>, loan_value: Amount, amount_due: Amount) -> Self {
        Loan {
            id,
            start,
            amount_due,
            loan_value,
            warning: false,
            overdue: false,
        }
    }

    /// When the borrower should be warned about the upcoming due date
    pub fn warning_at(&self) -> DateTime<Utc> {
        self.start + Duration::days(WARNING_AFTER_DAYS)
    }

    /// When the loan falls due
    pub fn due_at(&self) -> DateTime<Utc> {
        self.start + Duration::days(DUE_AFTER_DAYS)
    }

    pub fn is_settled(&self) -> bool {
        self.amount_due <= 0
    }
}
