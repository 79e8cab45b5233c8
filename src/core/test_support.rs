//! Fixtures shared by the unit tests

use crate::core::engine::LedgerEngine;
use crate::core::ledger::Ledger;
use crate::types::AccountRef;
use chrono::{DateTime, TimeZone, Utc};

/// Fixed clock used throughout the tests, 2024-06-01 09:00 UTC
pub fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 9, 0, 0).unwrap()
}

/// Alice's personal account
pub fn alice() -> AccountRef {
    AccountRef::Personal("1".to_string())
}

/// Bob's personal account
pub fn bob() -> AccountRef {
    AccountRef::Personal("2".to_string())
}

/// Economy owned by `owner` (Olive) with two ordinary users
///
/// Alice holds 10.00cc, Bob nothing, the bank 1000.00cc and the casino
/// 500.00cc. Rates are the bootstrap defaults.
pub fn sample_engine() -> LedgerEngine {
    let mut ledger = Ledger::bootstrap("owner", "Olive", 1_000_000, now());
    ledger.ensure_user("alice", "Alice");
    ledger.ensure_user("bob", "Bob");
    ledger.set_balance(&alice(), 1_000);
    ledger.set_balance(&AccountRef::bank(), 100_000);
    ledger.set_balance(&AccountRef::casino(), 50_000);
    LedgerEngine::new(ledger, now())
}
