//! Loan deadline scheduler
//!
//! Every outstanding loan has two deadlines: a warning five days after it was
//! issued and an overdue notice after seven. Deadlines are kept in a min-heap
//! ordered by fire time and fired by [`LedgerEngine::fire_due_loan_deadlines`],
//! which the service calls from its maintenance loop.
//!
//! The heap is never persisted. It is rebuilt from the loans on file when the
//! engine is created, so a deadline that passed while the service was down
//! fires on the first tick.

use crate::core::engine::LedgerEngine;
use crate::core::ledger::Ledger;
use crate::types::{format_cheesecoins, AccountRef, Loan, LoanId};
use chrono::{DateTime, Utc};
use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::fmt;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DeadlineKind {
    Warning,
    Overdue,
}

impl fmt::Display for DeadlineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeadlineKind::Warning => f.write_str("warning"),
            DeadlineKind::Overdue => f.write_str("overdue"),
        }
    }
}

/// A pending deadline for one loan
///
/// Ordered by `fire_at` first; the other fields only break ties.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct LoanDeadline {
    pub fire_at: DateTime<Utc>,
    pub kind: DeadlineKind,
    pub account: AccountRef,
    pub loan_id: LoanId,
}

/// Min-heap of loan deadlines
#[derive(Debug, Clone, Default)]
pub struct LoanScheduler {
    queue: BinaryHeap<Reverse<LoanDeadline>>,
}

impl LoanScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule every unfired deadline of every loan in `ledger`
    pub fn rebuild(ledger: &Ledger, now: DateTime<Utc>) -> Self {
        let mut scheduler = LoanScheduler::new();
        for (account, found) in ledger.accounts() {
            for loan in &found.loans {
                scheduler.schedule_loan(&account, loan, now);
            }
        }
        debug!(deadlines = scheduler.len(), "Loan schedule rebuilt");
        scheduler
    }

    /// Schedule the deadlines of `loan` whose flag is still unset
    ///
    /// A warning is left out if the loan is already past due; the overdue
    /// notice supersedes it.
    pub fn schedule_loan(&mut self, account: &AccountRef, loan: &Loan, now: DateTime<Utc>) {
        if !loan.warning && loan.due_at() > now {
            self.push(LoanDeadline {
                fire_at: loan.warning_at(),
                kind: DeadlineKind::Warning,
                account: account.clone(),
                loan_id: loan.id,
            });
        }
        if !loan.overdue {
            self.push(LoanDeadline {
                fire_at: loan.due_at(),
                kind: DeadlineKind::Overdue,
                account: account.clone(),
                loan_id: loan.id,
            });
        }
    }

    pub fn push(&mut self, deadline: LoanDeadline) {
        self.queue.push(Reverse(deadline));
    }

    /// Pop the earliest deadline if it is due at `now`
    pub fn pop_due(&mut self, now: DateTime<Utc>) -> Option<LoanDeadline> {
        if self.queue.peek()?.0.fire_at > now {
            return None;
        }
        self.queue.pop().map(|Reverse(deadline)| deadline)
    }

    /// Fire time of the earliest pending deadline
    pub fn next_fire_at(&self) -> Option<DateTime<Utc>> {
        self.queue.peek().map(|Reverse(deadline)| deadline.fire_at)
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}

impl LedgerEngine {
    /// Fire every deadline due at `now`
    ///
    /// Sets the loan's flag and notifies the borrower's owner and the bank's
    /// owner. Deadlines for loans that have since been repaid, or whose flag is
    /// already set, are dropped without a notification. Returns the deadlines
    /// that actually fired.
    pub fn fire_due_loan_deadlines(&mut self, now: DateTime<Utc>) -> Vec<LoanDeadline> {
        let mut fired = Vec::new();
        while let Some(deadline) = self.scheduler_mut().pop_due(now) {
            if self.fire_deadline(&deadline, now) {
                fired.push(deadline);
            }
        }
        if !fired.is_empty() {
            info!(fired = fired.len(), "Loan deadlines fired");
        }
        fired
    }

    fn fire_deadline(&mut self, deadline: &LoanDeadline, now: DateTime<Utc>) -> bool {
        let Ok(account) = self.ledger_mut().account_mut(&deadline.account) else {
            debug!(account = %deadline.account, "Dropping deadline for removed account");
            return false;
        };
        let borrower_name = account.name.clone();
        let Some(loan) = account
            .loans
            .iter_mut()
            .find(|loan| loan.id == deadline.loan_id)
        else {
            debug!(loan_id = deadline.loan_id, "Dropping deadline for repaid loan");
            return false;
        };
        if loan.is_settled() {
            return false;
        }

        match deadline.kind {
            DeadlineKind::Warning => {
                if loan.warning || now >= loan.due_at() {
                    return false;
                }
                loan.warning = true;
            }
            DeadlineKind::Overdue => {
                if loan.overdue {
                    return false;
                }
                loan.overdue = true;
                loan.warning = true;
            }
        }
        let loan = loan.clone();

        info!(
            loan_id = loan.id,
            account = %deadline.account,
            kind = %deadline.kind,
            amount_due = loan.amount_due,
            "Loan deadline reached"
        );

        let value = format_cheesecoins(loan.loan_value);
        let due = format_cheesecoins(loan.amount_due);
        let end = loan.due_at().timestamp();
        let (title, body, banker_title, banker_body) = match deadline.kind {
            DeadlineKind::Warning => (
                "Loan Due",
                format!("Your loan of {value} is due <t:{end}:R>. {due} is yet to be paid."),
                format!("{borrower_name} has a loan due"),
                format!(
                    "{borrower_name} has a loan of {value} which is due <t:{end}:R>. {due} is yet to be paid."
                ),
            ),
            DeadlineKind::Overdue => (
                "Loan Overdue",
                format!(
                    "Your loan of {value} should have been paid <t:{end}:R> but {due} is yet to be paid. The bank has been notified and may take legal action."
                ),
                format!("{borrower_name} has an overdue loan"),
                format!(
                    "{borrower_name} has a loan of {value} due <t:{end}:R> but {due} is yet to be paid. Take any legal action you consider necessary."
                ),
            ),
        };

        if let Some(borrower) = self.ledger().owner_of(&deadline.account).cloned() {
            self.notify(&borrower, title, body);
        }
        if let Some(banker) = self.ledger().owner_of(&AccountRef::bank()).cloned() {
            self.notify(&banker, banker_title, banker_body);
        }
        true
    }
}
