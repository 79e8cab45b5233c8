//! Daily wealth tax
//!
//! Once a day every personal and organisation balance is levied at the
//! wealth-tax rate and the proceeds go to the treasury. The sweep runs when
//! more than 20 hours have passed since the last one and then moves the
//! recorded time forward by exactly a day, so a missed day is caught up one
//! sweep per poll rather than all at once.

use crate::core::engine::LedgerEngine;
use crate::types::{format_cheesecoins, money::ceil_percent, AccountRef, Amount, UserId};
use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use std::collections::HashSet;
use tracing::{debug, info};

/// Minimum time between two sweeps
pub const SWEEP_THRESHOLD_HOURS: i64 = 20;

/// Amount the recorded sweep time advances per sweep
pub const SWEEP_PERIOD_HOURS: i64 = 24;

/// Tax taken from one account
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WealthTaxLevy {
    pub account: AccountRef,
    /// `Personal` for personal accounts, the organisation name otherwise
    pub label: String,
    pub tax: Amount,
}

/// Outcome of one sweep
#[derive(Debug, Clone, PartialEq)]
pub struct WealthTaxReport {
    pub rate: Decimal,
    pub levies: Vec<(UserId, Vec<WealthTaxLevy>)>,
}

impl WealthTaxReport {
    pub fn total(&self) -> Amount {
        self.levies
            .iter()
            .flat_map(|(_, levies)| levies.iter())
            .map(|levy| levy.tax)
            .sum()
    }
}

impl LedgerEngine {
    /// Whether a sweep is due at `now`
    pub fn wealth_tax_due(&self, now: DateTime<Utc>) -> bool {
        now - self.ledger().last_wealth_tax() > Duration::hours(SWEEP_THRESHOLD_HOURS)
    }

    /// Run the sweep if one is due
    pub fn apply_wealth_tax_if_due(&mut self, now: DateTime<Utc>) -> Option<WealthTaxReport> {
        if !self.wealth_tax_due(now) {
            return None;
        }
        let next = self.ledger().last_wealth_tax() + Duration::hours(SWEEP_PERIOD_HOURS);
        self.ledger_mut().set_last_wealth_tax(next);
        Some(self.apply_wealth_tax())
    }

    /// Levy the wealth tax on every user's accounts now
    ///
    /// Users are visited in id order. The treasury is never taxed, and an
    /// account listed under several owners is taxed once, for the first of
    /// them. Every user gets a single notification with their breakdown.
    pub fn apply_wealth_tax(&mut self) -> WealthTaxReport {
        let rate = self.ledger().wealth_tax();
        let treasury = AccountRef::treasury();

        let owners: Vec<(UserId, Vec<AccountRef>)> = self
            .ledger()
            .users()
            .filter_map(|(id, _)| Some((id.clone(), self.ledger().accounts_of(id).ok()?)))
            .collect();

        let mut taxed: HashSet<AccountRef> = HashSet::new();
        let mut levies = Vec::with_capacity(owners.len());

        for (user_id, accounts) in owners {
            let mut user_levies = Vec::new();
            for account in accounts {
                if account == treasury || !taxed.insert(account.clone()) {
                    continue;
                }
                if let Some(levy) = self.levy(&account, rate) {
                    user_levies.push(levy);
                }
            }

            let lines: String = user_levies
                .iter()
                .map(|levy| {
                    format!(
                        "\n{:<20} {}",
                        format!("{}:", levy.label),
                        format_cheesecoins(levy.tax)
                    )
                })
                .collect();
            self.notify(
                &user_id,
                "Wealth Tax",
                format!(
                    "Wealth tax has been applied at `{:.2}%`.\n\n**Payments**\n```{}\n```",
                    rate, lines
                ),
            );
            levies.push((user_id, user_levies));
        }

        let report = WealthTaxReport { rate, levies };
        info!(rate = %rate, total = report.total(), "Wealth tax applied");
        report
    }

    fn levy(&mut self, account: &AccountRef, rate: Decimal) -> Option<WealthTaxLevy> {
        let ledger = self.ledger_mut();
        ledger.account_or_err(&AccountRef::treasury()).ok()?;
        let found = ledger.account_mut(account).ok()?;
        let label = match account {
            AccountRef::Personal(_) => "Personal".to_string(),
            AccountRef::Organisation(_) => found.name.clone(),
        };
        let tax = ceil_percent(found.balance, rate)?.clamp(0, found.balance.max(0));
        found.balance -= tax;
        ledger.account_mut(&AccountRef::treasury()).ok()?.balance += tax;

        debug!(account = %account, tax, "Wealth tax levied");
        Some(WealthTaxLevy {
            account: account.clone(),
            label,
            tax,
        })
    }
}
