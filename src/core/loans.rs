//! Loan issuance and repayment
//!
//! Loans are repaid strictly oldest first. A payment to the bank is applied
//! to the first loan until its amount due is covered, at which point the loan
//! is retired and the rest carries on to the next one.

use crate::core::engine::{LedgerEngine, TransferReceipt};
use crate::types::{
    format_cheesecoins, money::ceil_percent, AccountRef, Amount, LedgerError, Loan, LoanId,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::fmt;
use tracing::info;

/// Part of a payment applied to one loan
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoanContribution {
    pub loan_id: LoanId,
    pub loan_value: Amount,
    pub start: DateTime<Utc>,
    pub applied: Amount,
    /// Amount due after this payment; `0` means the loan was retired
    pub remaining_due: Amount,
}

impl LoanContribution {
    pub fn retired(&self) -> bool {
        self.remaining_due <= 0
    }
}

impl fmt::Display for LoanContribution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.retired() {
            write!(
                f,
                "{} paid off a loan of {} from <t:{}:f>",
                format_cheesecoins(self.applied),
                format_cheesecoins(self.loan_value),
                self.start.timestamp()
            )
        } else {
            write!(
                f,
                "{} towards a loan of {} from <t:{}:f>. {} is remaining from this loan.",
                format_cheesecoins(self.applied),
                format_cheesecoins(self.loan_value),
                self.start.timestamp(),
                format_cheesecoins(self.remaining_due)
            )
        }
    }
}

/// Apply `payment` to `loans` in FIFO order
///
/// Retired loans are removed from the front of the list. Any part of the
/// payment left once every loan is retired is not recorded anywhere; it is
/// simply kept by the bank.
pub fn apply_repayment(loans: &mut Vec<Loan>, payment: Amount) -> Vec<LoanContribution> {
    let mut contributions = Vec::new();
    let mut left = payment;
    let mut retired = 0;

    for loan in loans.iter_mut() {
        if left <= 0 {
            break;
        }
        let applied = left.min(loan.amount_due.max(0));
        loan.amount_due -= applied;
        left -= applied;

        contributions.push(LoanContribution {
            loan_id: loan.id,
            loan_value: loan.loan_value,
            start: loan.start,
            applied,
            remaining_due: loan.amount_due,
        });

        if loan.is_settled() {
            retired += 1;
        } else {
            break;
        }
    }

    loans.drain(..retired);
    contributions
}

/// Result of issuing a loan
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedLoan {
    pub loan_id: LoanId,
    pub borrower: String,
    pub principal: Amount,
    pub amount_due: Amount,
    pub due_at: DateTime<Utc>,
    pub transfer: TransferReceipt,
}

impl fmt::Display for IssuedLoan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Issued a loan of {} to {}. {} is due <t:{}:R>.\n{}",
            format_cheesecoins(self.principal),
            self.borrower,
            format_cheesecoins(self.amount_due),
            self.due_at.timestamp(),
            self.transfer.breakdown()
        )
    }
}

/// One line of the loan book
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoanEntry {
    pub account_name: String,
    pub loan: Loan,
}

impl fmt::Display for LoanEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "**{}** has a loan of **{}** due on <t:{}:f>. **{}** is yet to be paid",
            self.account_name,
            format_cheesecoins(self.loan.loan_value),
            self.loan.due_at().timestamp(),
            format_cheesecoins(self.loan.amount_due)
        )
    }
}

/// Loans visible to a user
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LoanBook {
    /// Loans held by the user's own accounts
    pub own: Vec<LoanEntry>,
    /// Every loan on file, only present for the bank's owner
    pub all: Option<Vec<LoanEntry>>,
}

impl fmt::Display for LoanBook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "**Your loans:**")?;
        write_entries(f, &self.own)?;
        if let Some(all) = &self.all {
            write!(f, "\n\n**All loans:**")?;
            write_entries(f, all)?;
        }
        Ok(())
    }
}

fn write_entries(f: &mut fmt::Formatter<'_>, entries: &[LoanEntry]) -> fmt::Result {
    if entries.is_empty() {
        return write!(f, "\nNo loans.");
    }
    for entry in entries {
        write!(f, "\n{}", entry)?;
    }
    Ok(())
}

impl LedgerEngine {
    /// Lend `amount` from the bank to `recipient`
    ///
    /// The borrower receives `amount` less transaction tax and owes
    /// `ceil(amount * (100 + interest) / 100)`. Warning and overdue deadlines
    /// are scheduled immediately.
    ///
    /// # Errors
    ///
    /// - `InvalidAmount` if `amount` is not positive
    /// - `InsufficientFunds` if the bank cannot cover the loan
    /// - `NotFound` if the recipient does not exist
    pub fn issue_loan(
        &mut self,
        recipient: &AccountRef,
        amount: Amount,
        now: DateTime<Utc>,
    ) -> Result<IssuedLoan, LedgerError> {
        if amount <= 0 {
            return Err(LedgerError::invalid_amount(amount));
        }
        let multiplier = self.ledger().loan_interest() + Decimal::ONE_HUNDRED;
        let amount_due = ceil_percent(amount, multiplier)
            .ok_or_else(|| LedgerError::invalid_amount(amount))?;

        let transfer = self.transfer(amount, &AccountRef::bank(), recipient, "The Bank", true)?;

        let loan_id = self.ledger_mut().allocate_loan_id();
        let loan = Loan::new(loan_id, now, amount, amount_due);
        let due_at = loan.due_at();
        self.scheduler_mut().schedule_loan(recipient, &loan, now);
        self.ledger_mut().account_mut(recipient)?.loans.push(loan);

        info!(
            loan_id,
            recipient = %recipient,
            principal = amount,
            amount_due,
            "Loan issued"
        );

        Ok(IssuedLoan {
            loan_id,
            borrower: self.ledger().display_name(recipient),
            principal: amount,
            amount_due,
            due_at,
            transfer,
        })
    }

    /// Loans visible to `user_id`
    ///
    /// The bank's owner also sees every loan on file.
    pub fn loan_book(&self, user_id: &str) -> Result<LoanBook, LedgerError> {
        let ledger = self.ledger();
        let entries_for = |account: &AccountRef| -> Vec<LoanEntry> {
            ledger
                .account(account)
                .map(|found| {
                    found
                        .loans
                        .iter()
                        .map(|loan| LoanEntry {
                            account_name: found.name.clone(),
                            loan: loan.clone(),
                        })
                        .collect()
                })
                .unwrap_or_default()
        };

        let own = ledger
            .accounts_of(user_id)?
            .iter()
            .flat_map(|account| entries_for(account))
            .collect();

        let all = ledger
            .user_or_err(user_id)?
            .owns(crate::types::BANK_ID)
            .then(|| {
                ledger
                    .accounts()
                    .flat_map(|(account, _)| entries_for(&account))
                    .collect()
            });

        Ok(LoanBook { own, all })
    }
}
