use crate::service::ServiceConfig;
use crate::service::config::DEFAULT_INTERVAL_SECS;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Cheesecoin ledger for a chat-bot economy
#[derive(Parser, Debug)]
#[command(name = "cheesebank")]
#[command(about = "Cheesecoin ledger for a chat-bot economy", long_about = None)]
pub struct CliArgs {
    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Subcommand, Debug)]
pub enum CliCommand {
    /// Run the ledger service until interrupted
    Run(RunArgs),
    /// Create a new economy
    Init(InitArgs),
    /// Print every account balance as CSV
    Report(ReportArgs),
}

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Snapshot file
    #[arg(long = "data", value_name = "PATH", default_value = "data.json")]
    pub data: PathBuf,

    /// Seconds between snapshots
    #[arg(
        long = "save-interval",
        value_name = "SECS",
        default_value_t = DEFAULT_INTERVAL_SECS,
        help = "Seconds between periodic snapshots (default: 60)"
    )]
    pub save_interval: u64,

    /// Seconds between wealth-tax and loan-deadline checks
    #[arg(
        long = "poll-interval",
        value_name = "SECS",
        default_value_t = DEFAULT_INTERVAL_SECS,
        help = "Seconds between wealth-tax and loan-deadline checks (default: 60)"
    )]
    pub poll_interval: u64,
}

#[derive(Args, Debug)]
pub struct InitArgs {
    /// Snapshot file to create
    #[arg(long = "data", value_name = "PATH", default_value = "data.json")]
    pub data: PathBuf,

    /// Platform id of the user who controls the treasury, bank and casino
    #[arg(long = "owner", value_name = "USER_ID")]
    pub owner: String,

    /// Display name of the owner
    #[arg(long = "owner-name", value_name = "NAME")]
    pub owner_name: String,

    /// Cheesecoins minted into the treasury
    #[arg(long = "supply", value_name = "CHEESECOINS", default_value_t = 0.0)]
    pub supply: f64,

    /// Overwrite an existing snapshot
    #[arg(long = "force")]
    pub force: bool,
}

#[derive(Args, Debug)]
pub struct ReportArgs {
    /// Snapshot file
    #[arg(long = "data", value_name = "PATH", default_value = "data.json")]
    pub data: PathBuf,
}

impl RunArgs {
    /// Create a ServiceConfig from CLI arguments
    ///
    /// Zero intervals fall back to the default with a warning.
    pub fn to_service_config(&self) -> ServiceConfig {
        ServiceConfig::new(self.data.clone(), self.save_interval, self.poll_interval)
    }
}
