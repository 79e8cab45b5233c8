//! Transaction engine
//!
//! This module provides the [`LedgerEngine`], the single owner of the
//! [`Ledger`] and the only code that moves cheesecoins between accounts.
//!
//! The engine enforces:
//! - validation before mutation (a failed call changes nothing)
//! - conservation of currency: payer loses `amount`, recipient gains
//!   `amount - tax`, treasury gains `tax`
//! - FIFO loan amortization when the bank is paid
//!
//! Side effects meant for users are queued as [`Notification`]s and taken out
//! with [`LedgerEngine::drain_notifications`] once the caller is done with the
//! ledger.

use crate::core::ledger::Ledger;
use crate::core::loans::{apply_repayment, LoanContribution};
use crate::core::scheduler::LoanScheduler;
use crate::types::{
    format_cheesecoins, money::ceil_percent, AccountRef, Amount, LedgerError, Notification,
};
use chrono::{DateTime, Utc};
use std::fmt;
use tracing::{debug, info};

/// Result of a successful transfer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferReceipt {
    pub payer: String,
    pub recipient: String,
    pub amount: Amount,
    pub tax: Amount,
    /// Amount credited to the recipient, `amount - tax`
    pub received: Amount,
    /// Loans touched when the payment went to the bank, in payoff order
    pub loan_contributions: Vec<LoanContribution>,
}

impl TransferReceipt {
    /// Part of the payment that went to loans
    pub fn applied_to_loans(&self) -> Amount {
        self.loan_contributions.iter().map(|c| c.applied).sum()
    }

    /// Tax breakdown block shared by the payer reply and recipient message
    pub fn breakdown(&self) -> String {
        format!(
            "```\nAmount Paid     {}\nTax           - {}\nReceived      = {}\n```",
            format_cheesecoins(self.amount),
            format_cheesecoins(self.tax),
            format_cheesecoins(self.received)
        )
    }
}

impl fmt::Display for TransferReceipt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Successfully transferred {} from {} to {}.\n{}",
            format_cheesecoins(self.amount),
            self.payer,
            self.recipient,
            self.breakdown()
        )?;
        if !self.loan_contributions.is_empty() {
            write!(f, "\n\n**Loan contributions**:")?;
            for contribution in &self.loan_contributions {
                write!(f, "\n{}", contribution)?;
            }
        }
        Ok(())
    }
}

/// Owner of the ledger and its pending side effects
#[derive(Debug)]
pub struct LedgerEngine {
    ledger: Ledger,
    scheduler: LoanScheduler,
    outbox: Vec<Notification>,
}

impl LedgerEngine {
    /// Take ownership of a ledger
    ///
    /// Rebuilds the loan deadline schedule from the loans on file.
    pub fn new(ledger: Ledger, now: DateTime<Utc>) -> Self {
        let scheduler = LoanScheduler::rebuild(&ledger, now);
        info!(
            pending_deadlines = scheduler.len(),
            total_currency = %format_cheesecoins(ledger.total_currency()),
            "Ledger engine ready"
        );
        LedgerEngine {
            ledger,
            scheduler,
            outbox: Vec::new(),
        }
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    pub fn into_ledger(self) -> Ledger {
        self.ledger
    }

    pub(crate) fn ledger_mut(&mut self) -> &mut Ledger {
        &mut self.ledger
    }

    pub fn scheduler(&self) -> &LoanScheduler {
        &self.scheduler
    }

    pub(crate) fn scheduler_mut(&mut self) -> &mut LoanScheduler {
        &mut self.scheduler
    }

    /// Take every notification queued since the last call
    pub fn drain_notifications(&mut self) -> Vec<Notification> {
        std::mem::take(&mut self.outbox)
    }

    /// Queue a message for a user
    pub(crate) fn notify(&mut self, user_id: &str, title: impl Into<String>, body: impl Into<String>) {
        self.outbox.push(Notification::new(user_id, title, body));
    }

    /// Move `amount` from `payer` to `recipient`, withholding transaction tax
    ///
    /// # Arguments
    ///
    /// * `amount` - Amount in minor units
    /// * `payer` - Account debited with the full amount
    /// * `recipient` - Account credited with `amount - tax`
    /// * `payer_name` - How the payer is named in messages
    /// * `notify_recipient` - Queue a payment message for the recipient's
    ///   owner; pass `false` when the recipient is the caller being answered
    ///   directly
    ///
    /// # Errors
    ///
    /// Returns an error, leaving every balance unchanged, if:
    /// - `amount` is negative
    /// - either account or the treasury does not exist
    /// - the payer's balance is below `amount`
    pub fn transfer(
        &mut self,
        amount: Amount,
        payer: &AccountRef,
        recipient: &AccountRef,
        payer_name: &str,
        notify_recipient: bool,
    ) -> Result<TransferReceipt, LedgerError> {
        if amount < 0 {
            return Err(LedgerError::invalid_amount(amount));
        }

        let balance = self.ledger.account_or_err(payer)?.balance;
        self.ledger.account_or_err(recipient)?;
        self.ledger.account_or_err(&AccountRef::treasury())?;
        if balance < amount {
            return Err(LedgerError::insufficient_funds(payer_name, balance, amount));
        }

        // Rates above 100% in an old snapshot must not push the recipient negative
        let tax = ceil_percent(amount, self.ledger.transaction_tax())
            .unwrap_or(amount)
            .clamp(0, amount);
        let received = amount - tax;

        let mut loan_contributions = Vec::new();
        if *recipient == AccountRef::bank() {
            let payer_account = self.ledger.account_mut(payer)?;
            if !payer_account.loans.is_empty() {
                debug!(payer = %payer, received, "Applying payment to loans");
                loan_contributions = apply_repayment(&mut payer_account.loans, received);
            }
        }

        self.ledger.account_mut(payer)?.balance -= amount;
        self.ledger.account_mut(recipient)?.balance += received;
        self.ledger.account_mut(&AccountRef::treasury())?.balance += tax;

        let receipt = TransferReceipt {
            payer: payer_name.to_string(),
            recipient: self.ledger.display_name(recipient),
            amount,
            tax,
            received,
            loan_contributions,
        };

        info!(
            payer = %payer,
            recipient = %recipient,
            amount,
            tax,
            loans_paid = receipt.applied_to_loans(),
            "Transfer completed"
        );

        if notify_recipient {
            match self.ledger.owner_of(recipient).cloned() {
                Some(owner) => {
                    let body = format!(
                        "You've received {} from {} to {}.\n{}",
                        format_cheesecoins(amount),
                        receipt.payer,
                        receipt.recipient,
                        receipt.breakdown()
                    );
                    self.notify(&owner, "Payment", body);
                }
                None => debug!(recipient = %recipient, "Recipient has no owner to notify"),
            }
        }

        Ok(receipt)
    }
}
