//! End-to-end integration tests
//!
//! Two kinds of scenario run here.
//!
//! Snapshot fixtures in tests/fixtures/ pair a `snapshot.json` with the
//! `expected.csv` report it should produce. Each fixture test:
//! 1. Copies snapshot.json into a temporary directory
//! 2. Loads it through the JSON store
//! 3. Writes the accounts report
//! 4. Compares the report with expected.csv
//!
//! The fixtures cover snapshots written by older versions (null lists, loans
//! without ids, unknown keys), organisation loans and names that need CSV
//! quoting.
//!
//! Service scenarios drive a [`LedgerService`] over a snapshot on disk the way
//! the bot does: commands, maintenance passes and saves.

#[cfg(test)]
mod tests {
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use cheesebank::core::{Caller, Command, Ledger, Outcome};
    use cheesebank::io::{load_ledger, save_ledger, write_accounts_csv};
    use cheesebank::service::{ChannelNotifier, LedgerService, ServiceConfig};
    use cheesebank::types::{AccountRef, LedgerError, Notification, Privilege};
    use rstest::rstest;
    use std::fs;
    use std::path::{Path, PathBuf};
    use std::sync::Arc;
    use tempfile::TempDir;
    use tokio::sync::mpsc::UnboundedReceiver;

    const SUPPLY: i64 = 1_000_000;

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 3, 10, 0, 0).unwrap()
    }

    /// Copy a fixture snapshot into `dir` and return its new path
    fn stage_fixture(fixture_name: &str, dir: &TempDir) -> PathBuf {
        let source = format!("tests/fixtures/{}/snapshot.json", fixture_name);
        assert!(
            Path::new(&source).exists(),
            "Snapshot file not found: {}",
            source
        );
        let target = dir.path().join("data.json");
        fs::copy(&source, &target).expect("Failed to copy snapshot");
        target
    }

    /// Load a fixture snapshot and compare its report with expected.csv
    ///
    /// # Panics
    ///
    /// Panics if either fixture file is missing, the snapshot does not load or
    /// the report differs from expected.csv.
    fn run_report_fixture(fixture_name: &str) {
        let expected_path = format!("tests/fixtures/{}/expected.csv", fixture_name);
        assert!(
            Path::new(&expected_path).exists(),
            "Expected file not found: {}",
            expected_path
        );

        let dir = TempDir::new().expect("Failed to create temp dir");
        let snapshot = stage_fixture(fixture_name, &dir);
        let ledger = load_ledger(&snapshot)
            .unwrap_or_else(|e| panic!("Failed to load snapshot {}: {}", fixture_name, e));

        let mut output = Vec::new();
        write_accounts_csv(&ledger, &mut output)
            .unwrap_or_else(|e| panic!("Failed to write report: {}", e));
        let actual = String::from_utf8(output).expect("Report is not UTF-8");
        let expected = fs::read_to_string(&expected_path).expect("Failed to read expected file");

        let actual_lines: Vec<&str> = actual.lines().collect();
        let expected_lines: Vec<&str> = expected.lines().collect();
        assert_eq!(
            actual_lines, expected_lines,
            "\n\nReport mismatch for fixture '{}'\n\nExpected:\n{}\n\nActual:\n{}\n",
            fixture_name, expected, actual
        );
    }

    #[rstest]
    #[case("legacy_snapshot")]
    #[case("minimal_snapshot")]
    #[case("organisation_loans")]
    fn test_report_fixture(#[case] fixture_name: &str) {
        run_report_fixture(fixture_name);
    }

    #[test]
    fn test_legacy_loans_get_ids_that_survive_a_save() {
        let dir = TempDir::new().unwrap();
        let snapshot = stage_fixture("legacy_snapshot", &dir);

        let ledger = load_ledger(&snapshot).unwrap();
        let alice = ledger.resolve("1").unwrap();
        let loan_id = ledger.account(&alice).unwrap().loans[0].id;
        assert_ne!(loan_id, 0);

        save_ledger(&snapshot, &ledger).unwrap();
        let reloaded = load_ledger(&snapshot).unwrap();
        assert_eq!(reloaded, ledger);
        assert_eq!(reloaded.account(&alice).unwrap().loans[0].id, loan_id);
    }

    #[test]
    fn test_missing_snapshot_is_reported() {
        let dir = TempDir::new().unwrap();
        let result = load_ledger(&dir.path().join("absent.json"));
        assert!(matches!(result, Err(LedgerError::FileNotFound { .. })));
    }

    fn drain(receiver: &mut UnboundedReceiver<Notification>) -> Vec<Notification> {
        std::iter::from_fn(|| receiver.try_recv().ok()).collect()
    }

    async fn open_fresh_economy(
        dir: &TempDir,
    ) -> (LedgerService, UnboundedReceiver<Notification>) {
        let path = dir.path().join("data.json");
        let mut ledger = Ledger::bootstrap("owner", "Olive", SUPPLY, start());
        ledger.ensure_user("alice", "Alice");
        ledger.grant("alice", Privilege::MemberOfParliament, true).unwrap();
        save_ledger(&path, &ledger).unwrap();

        let (notifier, receiver) = ChannelNotifier::channel();
        let service = LedgerService::open(ServiceConfig::new(path, 60, 60), Arc::new(notifier))
            .await
            .unwrap();
        (service, receiver)
    }

    #[tokio::test]
    async fn test_week_of_trading_conserves_currency() {
        let dir = TempDir::new().unwrap();
        let (service, mut receiver) = open_fresh_economy(&dir).await;
        let owner = Caller::new("owner", "Olive");
        let alice = Caller::new("alice", "Alice");
        let alice_account = AccountRef::Personal("1".to_string());

        // Fund the bank from the treasury
        service
            .execute_at(
                &owner,
                Command::Pay {
                    recipient: "1003".to_string(),
                    amount: 500_000,
                    from: Some("1000".to_string()),
                },
                start(),
            )
            .await
            .unwrap();

        let allowance = service
            .execute_at(&alice, Command::ClaimDailyAllowance, start())
            .await
            .unwrap();
        assert!(matches!(allowance, Outcome::AllowanceClaimed(_)));

        let issued = service
            .execute_at(
                &owner,
                Command::IssueLoan {
                    recipient: "1".to_string(),
                    amount: 10_000,
                },
                start(),
            )
            .await
            .unwrap();
        let Outcome::LoanIssued(issued) = issued else {
            panic!("Expected a loan, got {:?}", issued);
        };
        assert_eq!(issued.amount_due, 11_000);

        service
            .execute_at(
                &alice,
                Command::Pay {
                    recipient: "1003".to_string(),
                    amount: 5_000,
                    from: None,
                },
                start() + Duration::hours(1),
            )
            .await
            .unwrap();

        let report = service
            .run_maintenance(start() + Duration::days(7) + Duration::hours(1))
            .await;
        assert!(report.wealth_tax.is_some());
        assert_eq!(report.deadlines_fired, 1);

        let titles: Vec<String> = drain(&mut receiver).into_iter().map(|n| n.title).collect();
        assert!(titles.iter().any(|t| t == "Payment"));
        assert!(titles.iter().any(|t| t == "Loan Overdue"));
        assert!(titles.iter().any(|t| t == "Wealth Tax"));

        let (total, debt, overdue) = service
            .with_ledger(|ledger| {
                let account = ledger.account(&alice_account).unwrap();
                (
                    ledger.total_currency(),
                    account.outstanding_debt(),
                    account.loans.iter().all(|loan| loan.overdue),
                )
            })
            .await;
        assert_eq!(total, SUPPLY);
        assert!(debt > 0 && debt < 11_000);
        assert!(overdue);

        service.snapshot().await.unwrap();
        let saved = load_ledger(&service.config().data_path).unwrap();
        let live = service.with_ledger(Ledger::clone).await;
        assert_eq!(saved, live);
    }

    #[tokio::test]
    async fn test_bank_holiday_blocks_trading_but_not_reads() {
        let dir = TempDir::new().unwrap();
        let (service, _receiver) = open_fresh_economy(&dir).await;
        let owner = Caller::new("owner", "Olive");
        let alice = Caller::new("alice", "Alice");

        service
            .execute_at(
                &owner,
                Command::SetBankHoliday {
                    day: 3,
                    month: 6,
                    enabled: true,
                },
                start(),
            )
            .await
            .unwrap();

        let pay = service
            .execute_at(
                &alice,
                Command::Pay {
                    recipient: "0".to_string(),
                    amount: 1,
                    from: None,
                },
                start(),
            )
            .await;
        assert!(matches!(pay, Err(LedgerError::BankHoliday)));

        let balances = service.execute_at(&alice, Command::Balances, start()).await;
        assert!(matches!(balances, Ok(Outcome::Balances(_))));

        let next_day = service
            .execute_at(&alice, Command::ClaimDailyAllowance, start() + Duration::days(1))
            .await;
        assert!(next_day.is_ok());
    }

    #[tokio::test]
    async fn test_reopened_snapshot_fires_pending_deadlines() {
        let dir = TempDir::new().unwrap();
        let snapshot = stage_fixture("organisation_loans", &dir);
        let (notifier, mut receiver) = ChannelNotifier::channel();
        let service = LedgerService::open(ServiceConfig::new(snapshot, 60, 60), Arc::new(notifier))
            .await
            .unwrap();

        let report = service.run_maintenance(Utc::now() + Duration::seconds(1)).await;

        // Loan 3 was already overdue when saved; only loan 4 fires
        assert_eq!(report.deadlines_fired, 1);
        let overdue: Vec<String> = drain(&mut receiver)
            .into_iter()
            .filter(|n| n.title == "Loan Overdue" || n.title.ends_with("has an overdue loan"))
            .map(|n| n.user_id)
            .collect();
        assert_eq!(overdue, vec!["100".to_string(), "100".to_string()]);

        let all_overdue = service
            .with_ledger(|ledger| {
                let shop = ledger.resolve_organisation("1024").unwrap();
                ledger.account(&shop).unwrap().loans.iter().all(|loan| loan.overdue)
            })
            .await;
        assert!(all_overdue);
    }

    #[tokio::test]
    async fn test_deleting_indebted_organisation_is_refused() {
        let dir = TempDir::new().unwrap();
        let snapshot = stage_fixture("organisation_loans", &dir);
        let (notifier, _receiver) = ChannelNotifier::channel();
        let service = LedgerService::open(ServiceConfig::new(snapshot, 60, 60), Arc::new(notifier))
            .await
            .unwrap();

        let result = service
            .execute_at(
                &Caller::new("100", "Olive"),
                Command::DeleteOrg {
                    org: "1024".to_string(),
                },
                start(),
            )
            .await;

        assert!(matches!(result, Err(LedgerError::OutstandingLoans { .. })));
        let still_there = service
            .with_ledger(|ledger| ledger.resolve_organisation("1024").is_ok())
            .await;
        assert!(still_there);
    }
}
