//! Cheesebank CLI
//!
//! Runs and administers the cheesecoin ledger.
//!
//! # Usage
//!
//! ```bash
//! cargo run -- init --data data.json --owner 42 --owner-name Olive --supply 100000
//! cargo run -- run --data data.json
//! cargo run -- run --data data.json --save-interval 30 --poll-interval 10
//! cargo run -- report --data data.json > accounts.csv
//! ```
//!
//! Logs go to stderr; set `RUST_LOG` to change the level (default `info`).
//!
//! # Exit Codes
//!
//! - 0: Success
//! - 1: Error (snapshot missing or unreadable, snapshot already exists, etc.)

use cheesebank::cli::{self, CliCommand, InitArgs, ReportArgs, RunArgs};
use cheesebank::core::Ledger;
use cheesebank::io::{load_ledger, save_ledger, write_accounts_csv};
use cheesebank::service::{LedgerService, LogNotifier};
use cheesebank::types::{cheesecoins_from_float, LedgerError};
use chrono::Utc;
use std::process::ExitCode;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = cli::parse_args();
    let result = match args.command {
        CliCommand::Run(run_args) => run(run_args).await,
        CliCommand::Init(init_args) => init(init_args),
        CliCommand::Report(report_args) => report(report_args),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "Fatal error");
            ExitCode::FAILURE
        }
    }
}

async fn run(args: RunArgs) -> Result<(), LedgerError> {
    let service = LedgerService::open(args.to_service_config(), Arc::new(LogNotifier)).await?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("Received Ctrl+C, initiating graceful shutdown"),
            Err(e) => warn!(error = %e, "Failed to listen for Ctrl+C, shutting down"),
        }
        let _ = shutdown_tx.send(true);
    });

    service.run(shutdown_rx).await
}

fn init(args: InitArgs) -> Result<(), LedgerError> {
    if args.data.exists() && !args.force {
        return Err(LedgerError::Io {
            message: format!(
                "{} already exists; pass --force to overwrite it",
                args.data.display()
            ),
        });
    }
    let supply = cheesecoins_from_float(args.supply).ok_or_else(|| LedgerError::Serialization {
        message: format!("supply {} is not a representable amount", args.supply),
    })?;
    if supply < 0 {
        return Err(LedgerError::invalid_amount(supply));
    }

    let ledger = Ledger::bootstrap(&args.owner, &args.owner_name, supply, Utc::now());
    save_ledger(&args.data, &ledger)?;
    info!(path = %args.data.display(), owner = %args.owner, supply, "Economy created");
    Ok(())
}

fn report(args: ReportArgs) -> Result<(), LedgerError> {
    let ledger = load_ledger(&args.data)?;
    let mut output = std::io::stdout();
    write_accounts_csv(&ledger, &mut output)
}
