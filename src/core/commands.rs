//! Command surface
//!
//! Every bot command arrives as a typed [`Command`] issued by a [`Caller`].
//! [`LedgerEngine::execute`] registers the caller, applies the bank-holiday
//! gate and privilege checks, then routes to the operation and returns an
//! [`Outcome`] for the chat adapter to render.

use crate::core::calendar::{BankHoliday, HolidayChange};
use crate::core::engine::{LedgerEngine, TransferReceipt};
use crate::core::loans::{IssuedLoan, LoanBook};
use crate::types::{
    format_cheesecoins, money::trunc_multiple, AccountId, AccountRef, Amount, LedgerError,
    Privilege, UserId, BANK_ID, CASINO_ID,
};
use chrono::{DateTime, Duration, NaiveDate, Utc};
use rand::Rng;
use rust_decimal::Decimal;
use std::fmt;
use tracing::{debug, info};

/// Minimum time between two daily allowance claims
pub const ALLOWANCE_COOLDOWN_HOURS: i64 = 15;

/// The user issuing a command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller {
    pub id: UserId,
    /// Display name, used for the personal account of a new user
    pub name: String,
}

impl Caller {
    pub fn new(id: impl Into<UserId>, name: impl Into<String>) -> Self {
        Caller {
            id: id.into(),
            name: name.into(),
        }
    }
}

/// A bot command with its typed arguments
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Balances,
    Pay {
        recipient: AccountId,
        amount: Amount,
        /// Organisation to pay from; the caller's personal account if `None`
        from: Option<AccountId>,
    },
    CreateOrg {
        name: String,
    },
    RenameOrg {
        org: AccountId,
        name: String,
    },
    TransferOrg {
        org: AccountId,
        new_owner: UserId,
    },
    DeleteOrg {
        org: AccountId,
    },
    ClaimDailyAllowance,
    SetWealthTax {
        rate: Decimal,
    },
    SetTransactionTax {
        rate: Decimal,
    },
    SetBankHoliday {
        day: i64,
        month: i64,
        enabled: bool,
    },
    ListBankHolidays,
    IssueLoan {
        recipient: AccountId,
        amount: Amount,
    },
    SetInterestRate {
        rate: Decimal,
    },
    ViewLoans,
    Gamble {
        amount: Amount,
        prediction: i64,
    },
    SetCasinoReturns {
        returns: Decimal,
    },
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Command::Balances => "balances",
            Command::Pay { .. } => "pay",
            Command::CreateOrg { .. } => "create_org",
            Command::RenameOrg { .. } => "rename_org",
            Command::TransferOrg { .. } => "transfer_org",
            Command::DeleteOrg { .. } => "delete_org",
            Command::ClaimDailyAllowance => "claim_daily_allowance",
            Command::SetWealthTax { .. } => "set_wealth_tax",
            Command::SetTransactionTax { .. } => "set_transaction_tax",
            Command::SetBankHoliday { .. } => "set_bank_holiday",
            Command::ListBankHolidays => "bank_holidays",
            Command::IssueLoan { .. } => "issue_loan",
            Command::SetInterestRate { .. } => "set_interest_rate",
            Command::ViewLoans => "view_loans",
            Command::Gamble { .. } => "gamble",
            Command::SetCasinoReturns { .. } => "set_casino_returns",
        }
    }

    /// Whether the command is refused on a bank holiday
    ///
    /// Read-only commands and holiday management stay available.
    pub fn mutates_ledger(&self) -> bool {
        !matches!(
            self,
            Command::Balances
                | Command::ViewLoans
                | Command::SetBankHoliday { .. }
                | Command::ListBankHolidays
        )
    }
}

/// Adjustable economic parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateKind {
    WealthTax,
    TransactionTax,
    LoanInterest,
    CasinoReturns,
}

impl RateKind {
    fn validate(&self, value: Decimal) -> Result<(), LedgerError> {
        match self {
            RateKind::WealthTax | RateKind::TransactionTax
                if value < Decimal::ZERO || value > Decimal::ONE_HUNDRED =>
            {
                Err(LedgerError::invalid_rate(value, "must be between 0 and 100"))
            }
            RateKind::LoanInterest if value < Decimal::ZERO => {
                Err(LedgerError::invalid_rate(value, "must not be negative"))
            }
            RateKind::CasinoReturns if value < Decimal::ONE => {
                Err(LedgerError::invalid_rate(value, "must be at least 1"))
            }
            _ => Ok(()),
        }
    }
}

impl fmt::Display for RateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            RateKind::WealthTax => "wealth tax",
            RateKind::TransactionTax => "transaction tax",
            RateKind::LoanInterest => "interest rate",
            RateKind::CasinoReturns => "gambling returns",
        };
        f.write_str(label)
    }
}

/// Rates, total currency and the caller's balances
#[derive(Debug, Clone, PartialEq)]
pub struct BalanceSheet {
    pub wealth_tax: Decimal,
    pub transaction_tax: Decimal,
    pub total_currency: Amount,
    /// Account name and balance, personal account first
    pub accounts: Vec<(String, Amount)>,
}

impl fmt::Display for BalanceSheet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "**Currency information**\n```")?;
        writeln!(f, "{:<20} {:.2}%", "Wealth Tax:", self.wealth_tax)?;
        writeln!(f, "{:<20} {:.2}%", "Transaction Tax:", self.transaction_tax)?;
        writeln!(
            f,
            "{:<20} {}",
            "Total Currency:",
            format_cheesecoins(self.total_currency)
        )?;
        writeln!(f, "```\n**Your accounts**\n```")?;
        for (name, balance) in &self.accounts {
            writeln!(f, "{:<20} {}", format!("{}:", name), format_cheesecoins(*balance))?;
        }
        write!(f, "```")
    }
}

/// Result of a dice game
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GambleResult {
    pub prediction: i64,
    pub roll: i64,
    pub stake: Amount,
    /// Amount paid out by the casino on a win, `0` on a loss
    pub winnings: Amount,
    pub receipt: TransferReceipt,
}

impl GambleResult {
    pub fn won(&self) -> bool {
        self.prediction == self.roll
    }
}

impl fmt::Display for GambleResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "You predicted a 🎲{} and the computer rolled a 🎲{}. ",
            self.prediction, self.roll
        )?;
        if self.won() {
            write!(
                f,
                "You have won {} which has been transferred to your account.",
                format_cheesecoins(self.winnings)
            )
        } else {
            write!(f, "You have lost {}.", format_cheesecoins(self.stake))
        }
    }
}

/// Successful result of a command
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Balances(BalanceSheet),
    Payment(TransferReceipt),
    OrganisationCreated {
        org: AccountRef,
        name: String,
        owner_name: String,
    },
    OrganisationRenamed {
        from: String,
        to: String,
    },
    OrganisationTransferred {
        name: String,
        new_owner_name: String,
    },
    OrganisationDeleted {
        name: String,
        receipt: TransferReceipt,
    },
    AllowanceClaimed(TransferReceipt),
    RateUpdated {
        kind: RateKind,
        value: Decimal,
    },
    Holiday {
        holiday: BankHoliday,
        change: HolidayChange,
    },
    Holidays(Vec<(BankHoliday, NaiveDate)>),
    LoanIssued(IssuedLoan),
    Loans(LoanBook),
    Gamble(GambleResult),
}

impl Outcome {
    /// Heading for the reply
    pub fn title(&self) -> &'static str {
        match self {
            Outcome::Balances(_) => "Balances",
            Outcome::Payment(_) => "Payment",
            Outcome::OrganisationCreated { .. } => "Create organisation",
            Outcome::OrganisationRenamed { .. } => "Rename organisation",
            Outcome::OrganisationTransferred { .. } => "Transfer organisation",
            Outcome::OrganisationDeleted { .. } => "Delete organisation",
            Outcome::AllowanceClaimed(_) => "Rollcall",
            Outcome::RateUpdated { .. } => "Set Rate",
            Outcome::Holiday { .. } => "Set Bank Holiday",
            Outcome::Holidays(_) => "Bank Holidays",
            Outcome::LoanIssued(_) => "Loan",
            Outcome::Loans(_) => "View Loans",
            Outcome::Gamble(result) if result.won() => "Gambling Victory",
            Outcome::Gamble(_) => "Gambling Loss",
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Balances(sheet) => write!(f, "{}", sheet),
            Outcome::Payment(receipt) | Outcome::AllowanceClaimed(receipt) => {
                write!(f, "{}", receipt)
            }
            Outcome::OrganisationCreated {
                name, owner_name, ..
            } => write!(f, "Successfully created {} which is owned by {}", name, owner_name),
            Outcome::OrganisationRenamed { from, to } => {
                write!(f, "Successfully renamed {} to {}", from, to)
            }
            Outcome::OrganisationTransferred {
                name,
                new_owner_name,
            } => write!(f, "Successfully transferred {} to {}", name, new_owner_name),
            Outcome::OrganisationDeleted { name, receipt } => write!(
                f,
                "Successfully deleted {}. All funds have been transferred to your personal account (with {} in tax)",
                name,
                format_cheesecoins(receipt.tax)
            ),
            Outcome::RateUpdated { kind, value } => match kind {
                RateKind::CasinoReturns => write!(f, "Successfully set {} to {}.", kind, value),
                _ => write!(f, "Successfully set {} to {}%.", kind, value),
            },
            Outcome::Holiday { holiday, change } => write!(f, "{} {}.", holiday, change),
            Outcome::Holidays(upcoming) if upcoming.is_empty() => f.write_str("No bank holidays."),
            Outcome::Holidays(upcoming) => {
                for (i, (_, date)) in upcoming.iter().enumerate() {
                    if i > 0 {
                        writeln!(f)?;
                    }
                    write!(f, "Bank holiday on {}", date.format("%-d/%-m/%Y"))?;
                }
                Ok(())
            }
            Outcome::LoanIssued(issued) => write!(f, "{}", issued),
            Outcome::Loans(book) => write!(f, "{}", book),
            Outcome::Gamble(result) => write!(f, "{}", result),
        }
    }
}

impl LedgerEngine {
    /// Run `command` on behalf of `caller`
    ///
    /// The caller is registered on first contact even if the command itself
    /// is then rejected. The bank-holiday gate compares the UTC calendar date
    /// of `now`.
    pub fn execute(
        &mut self,
        caller: &Caller,
        command: Command,
        now: DateTime<Utc>,
    ) -> Result<Outcome, LedgerError> {
        if self.ledger_mut().ensure_user(&caller.id, &caller.name) {
            info!(user = %caller.id, name = %caller.name, "Registered new user");
        }
        debug!(user = %caller.id, command = command.name(), "Executing command");

        if command.mutates_ledger() && self.ledger().is_holiday(now.date_naive()) {
            return Err(LedgerError::BankHoliday);
        }

        let user = caller.id.as_str();
        match command {
            Command::Balances => self.balance_sheet(user).map(Outcome::Balances),
            Command::Pay {
                recipient,
                amount,
                from,
            } => self.pay(user, &recipient, amount, from.as_deref()).map(Outcome::Payment),
            Command::CreateOrg { name } => {
                let org = self.create_organisation(user, &name)?;
                let personal = self.ledger().personal_account_of(user)?;
                Ok(Outcome::OrganisationCreated {
                    org,
                    name,
                    owner_name: self.account_name(&personal),
                })
            }
            Command::RenameOrg { org, name } => {
                let from = self.rename_organisation(user, &org, &name)?;
                Ok(Outcome::OrganisationRenamed { from, to: name })
            }
            Command::TransferOrg { org, new_owner } => {
                self.transfer_organisation(user, &org, &new_owner)?;
                let org_ref = self.ledger().resolve_organisation(&org)?;
                let personal = self.ledger().personal_account_of(&new_owner)?;
                Ok(Outcome::OrganisationTransferred {
                    name: self.account_name(&org_ref),
                    new_owner_name: self.account_name(&personal),
                })
            }
            Command::DeleteOrg { org } => {
                let name = self
                    .ledger()
                    .resolve_organisation(&org)
                    .map(|found| self.account_name(&found))?;
                let receipt = self.delete_organisation(user, &org)?;
                Ok(Outcome::OrganisationDeleted { name, receipt })
            }
            Command::ClaimDailyAllowance => self
                .claim_daily_allowance(user, now)
                .map(Outcome::AllowanceClaimed),
            Command::SetWealthTax { rate } => {
                self.require(user, Privilege::SuperUser, "set the wealth tax")?;
                self.set_rate(RateKind::WealthTax, rate)
            }
            Command::SetTransactionTax { rate } => {
                self.require(user, Privilege::SuperUser, "set the transaction tax")?;
                self.set_rate(RateKind::TransactionTax, rate)
            }
            Command::SetBankHoliday { day, month, enabled } => {
                self.require(user, Privilege::BankHolidaySetter, "set bank holidays")?;
                let (holiday, change) = self.set_holiday(day, month, enabled)?;
                Ok(Outcome::Holiday { holiday, change })
            }
            Command::ListBankHolidays => Ok(Outcome::Holidays(
                self.ledger().upcoming_holidays(now.date_naive()),
            )),
            Command::IssueLoan { recipient, amount } => {
                self.owned_organisation(user, BANK_ID)
                    .map_err(|_| LedgerError::not_authorized("issue loans"))?;
                let recipient = self.ledger().resolve(&recipient)?;
                self.issue_loan(&recipient, amount, now).map(Outcome::LoanIssued)
            }
            Command::SetInterestRate { rate } => {
                self.owned_organisation(user, BANK_ID)
                    .map_err(|_| LedgerError::not_authorized("set the interest rate"))?;
                self.set_rate(RateKind::LoanInterest, rate)
            }
            Command::ViewLoans => self.loan_book(user).map(Outcome::Loans),
            Command::Gamble { amount, prediction } => {
                let roll = rand::thread_rng().gen_range(1..=6);
                self.gamble(user, amount, prediction, roll).map(Outcome::Gamble)
            }
            Command::SetCasinoReturns { returns } => {
                self.owned_organisation(user, CASINO_ID)
                    .map_err(|_| LedgerError::not_authorized("set the casino returns"))?;
                self.set_rate(RateKind::CasinoReturns, returns)
            }
        }
    }

    fn require(&self, user_id: &str, privilege: Privilege, action: &str) -> Result<(), LedgerError> {
        if self.ledger().user_or_err(user_id)?.has(privilege) {
            Ok(())
        } else {
            Err(LedgerError::not_authorized(action))
        }
    }

    fn account_name(&self, account: &AccountRef) -> String {
        self.ledger()
            .account(account)
            .map(|found| found.name.clone())
            .unwrap_or_default()
    }

    /// Rates, total currency and every account of `user_id`
    pub fn balance_sheet(&self, user_id: &str) -> Result<BalanceSheet, LedgerError> {
        let ledger = self.ledger();
        let accounts = ledger
            .accounts_of(user_id)?
            .iter()
            .filter_map(|account| ledger.account(account))
            .map(|found| (found.name.clone(), found.balance))
            .collect();
        Ok(BalanceSheet {
            wealth_tax: ledger.wealth_tax(),
            transaction_tax: ledger.transaction_tax(),
            total_currency: ledger.total_currency(),
            accounts,
        })
    }

    /// Pay `recipient` from the caller's personal account or an organisation
    /// they own
    pub fn pay(
        &mut self,
        user_id: &str,
        recipient: &str,
        amount: Amount,
        from: Option<&str>,
    ) -> Result<TransferReceipt, LedgerError> {
        let recipient = self.ledger().resolve(recipient)?;
        let payer = match from {
            Some(org) => self.owned_organisation(user_id, org)?,
            None => self.ledger().personal_account_of(user_id)?,
        };
        let payer_name = self.ledger().display_name(&payer);
        self.transfer(amount, &payer, &recipient, &payer_name, true)
    }

    /// Pay the daily allowance from the treasury to a member of parliament
    ///
    /// # Errors
    ///
    /// - `NotAuthorized` unless the user is a member of parliament
    /// - `AllowanceAlreadyClaimed` within 15 hours of the last claim
    /// - `InsufficientFunds` if the treasury cannot pay
    pub fn claim_daily_allowance(
        &mut self,
        user_id: &str,
        now: DateTime<Utc>,
    ) -> Result<TransferReceipt, LedgerError> {
        let user = self.ledger().user_or_err(user_id)?;
        if !user.has(Privilege::MemberOfParliament) {
            return Err(LedgerError::not_authorized(
                "claim the daily allowance. Only MPs can claim this benefit",
            ));
        }
        let elapsed = now - user.last_pay;
        if elapsed < Duration::hours(ALLOWANCE_COOLDOWN_HOURS) {
            return Err(LedgerError::AllowanceAlreadyClaimed {
                elapsed: format_elapsed(elapsed),
            });
        }

        let personal = self.ledger().personal_account_of(user_id)?;
        let allowance = self.ledger().daily_allowance();
        let receipt = self.transfer(allowance, &AccountRef::treasury(), &personal, "Treasury", false)?;
        self.ledger_mut().user_mut(user_id)?.last_pay = now;

        info!(user = user_id, allowance, "Daily allowance claimed");
        Ok(receipt)
    }

    /// Validate and store a rate
    pub fn set_rate(&mut self, kind: RateKind, value: Decimal) -> Result<Outcome, LedgerError> {
        kind.validate(value)?;
        let ledger = self.ledger_mut();
        match kind {
            RateKind::WealthTax => ledger.set_wealth_tax(value),
            RateKind::TransactionTax => ledger.set_transaction_tax(value),
            RateKind::LoanInterest => ledger.set_loan_interest(value),
            RateKind::CasinoReturns => ledger.set_casino_returns(value),
        }
        info!(rate = %kind, value = %value, "Rate updated");
        Ok(Outcome::RateUpdated { kind, value })
    }

    /// Play the dice game with a known `roll`
    ///
    /// The stake and the casino's ability to pay out are checked before the
    /// roll is looked at. A win pays `stake * (returns - 1)` from the casino;
    /// a loss pays the stake to the casino.
    pub fn gamble(
        &mut self,
        user_id: &str,
        amount: Amount,
        prediction: i64,
        roll: i64,
    ) -> Result<GambleResult, LedgerError> {
        if !(1..=6).contains(&prediction) {
            return Err(LedgerError::InvalidPrediction { prediction });
        }
        if amount < 0 {
            return Err(LedgerError::invalid_amount(amount));
        }

        let personal = self.ledger().personal_account_of(user_id)?;
        let player_name = self.ledger().display_name(&personal);
        let balance = self.ledger().account_or_err(&personal)?.balance;
        if amount > balance {
            return Err(LedgerError::insufficient_funds(&player_name, balance, amount));
        }

        let casino = AccountRef::casino();
        let multiplier = self.ledger().casino_returns() - Decimal::ONE;
        let winnings =
            trunc_multiple(amount, multiplier).ok_or_else(|| LedgerError::invalid_amount(amount))?;
        let casino_balance = self.ledger().account_or_err(&casino)?.balance;
        if winnings > casino_balance {
            return Err(LedgerError::insufficient_funds("The casino", casino_balance, winnings));
        }

        let won = prediction == roll;
        let receipt = if won {
            self.transfer(winnings, &casino, &personal, "Casino", false)?
        } else {
            self.transfer(amount, &personal, &casino, &player_name, true)?
        };

        info!(user = user_id, stake = amount, prediction, roll, won, "Gamble settled");
        Ok(GambleResult {
            prediction,
            roll,
            stake: amount,
            winnings: if won { winnings } else { 0 },
            receipt,
        })
    }
}

/// `3h 2m 1s`
fn format_elapsed(elapsed: Duration) -> String {
    let seconds = elapsed.num_seconds().max(0);
    format!(
        "{}h {}m {}s",
        seconds / 3600,
        (seconds % 3600) / 60,
        seconds % 60
    )
}
