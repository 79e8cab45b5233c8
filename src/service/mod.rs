//! Service runtime
//!
//! [`LedgerService`] hosts the engine for a running bot. It is the single
//! writer: commands, the maintenance loop and the snapshot loop all take the
//! same lock, so no two changes to the ledger interleave.
//!
//! # Architecture
//!
//! ```text
//! chat adapter ──execute──┐
//! maintenance tick ───────┼──> Mutex<LedgerEngine> ──outbox──> Notifier
//! snapshot tick ──────────┘            │
//!                                      └──encode──> json_store
//! ```
//!
//! Notifications are delivered and snapshots written after the lock is
//! released.

pub mod config;
pub mod notifier;

pub use config::ServiceConfig;
pub use notifier::{ChannelNotifier, LogNotifier, Notifier, NotifyError};

use crate::core::{Caller, Command, Ledger, LedgerEngine, Outcome, WealthTaxReport};
use crate::io::json_store::{encode_ledger, load_ledger_async, save_encoded_async};
use crate::types::{LedgerError, Notification};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::{watch, Mutex};
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, error, info, warn};

/// What one maintenance pass did
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MaintenanceReport {
    pub wealth_tax: Option<WealthTaxReport>,
    pub deadlines_fired: usize,
    /// When the next pending loan deadline falls due
    pub next_deadline: Option<DateTime<Utc>>,
}

/// Single-writer host for the ledger engine
pub struct LedgerService {
    engine: Arc<Mutex<LedgerEngine>>,
    notifier: Arc<dyn Notifier>,
    config: ServiceConfig,
}

impl LedgerService {
    /// Load the snapshot at `config.data_path` and start an engine on it
    pub async fn open(config: ServiceConfig, notifier: Arc<dyn Notifier>) -> Result<Self, LedgerError> {
        let ledger = load_ledger_async(&config.data_path).await?;
        info!(path = %config.data_path.display(), "Ledger loaded");
        Ok(Self::new(LedgerEngine::new(ledger, Utc::now()), config, notifier))
    }

    pub fn new(engine: LedgerEngine, config: ServiceConfig, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            engine: Arc::new(Mutex::new(engine)),
            notifier,
            config,
        }
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    /// Run a command now
    pub async fn execute(&self, caller: &Caller, command: Command) -> Result<Outcome, LedgerError> {
        self.execute_at(caller, command, Utc::now()).await
    }

    /// Run a command as if issued at `now`
    pub async fn execute_at(
        &self,
        caller: &Caller,
        command: Command,
        now: DateTime<Utc>,
    ) -> Result<Outcome, LedgerError> {
        let (result, outbox) = {
            let mut engine = self.engine.lock().await;
            let result = engine.execute(caller, command, now);
            (result, engine.drain_notifications())
        };
        match &result {
            Err(e) if e.is_recoverable() => debug!(user = %caller.id, error = %e, "Command rejected"),
            Err(e) => error!(user = %caller.id, error = %e, "Command failed"),
            Ok(_) => {}
        }
        self.deliver(outbox);
        result
    }

    /// Apply the wealth tax if due and fire due loan deadlines
    pub async fn run_maintenance(&self, now: DateTime<Utc>) -> MaintenanceReport {
        let (report, outbox) = {
            let mut engine = self.engine.lock().await;
            let report = MaintenanceReport {
                wealth_tax: engine.apply_wealth_tax_if_due(now),
                deadlines_fired: engine.fire_due_loan_deadlines(now).len(),
                next_deadline: engine.scheduler().next_fire_at(),
            };
            (report, engine.drain_notifications())
        };
        self.deliver(outbox);
        report
    }

    /// Write the ledger to the snapshot file
    pub async fn snapshot(&self) -> Result<(), LedgerError> {
        let bytes = {
            let engine = self.engine.lock().await;
            encode_ledger(engine.ledger())?
        };
        save_encoded_async(&self.config.data_path, &bytes).await
    }

    /// Read-only access to the ledger
    pub async fn with_ledger<R>(&self, f: impl FnOnce(&Ledger) -> R) -> R {
        let engine = self.engine.lock().await;
        f(engine.ledger())
    }

    /// Run the maintenance and snapshot loops until `shutdown` fires
    ///
    /// Writes a final snapshot before returning. A failed periodic snapshot is
    /// logged and retried on the next tick; a failed final snapshot is
    /// returned.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) -> Result<(), LedgerError> {
        let mut save_tick = interval(self.config.save_interval);
        let mut poll_tick = interval(self.config.poll_interval);
        save_tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
        poll_tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(
            save_interval = ?self.config.save_interval,
            poll_interval = ?self.config.poll_interval,
            "Ledger service started"
        );

        loop {
            tokio::select! {
                biased;

                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
                _ = poll_tick.tick() => {
                    let report = self.run_maintenance(Utc::now()).await;
                    if report.wealth_tax.is_some() || report.deadlines_fired > 0 {
                        debug!(
                            wealth_tax = report.wealth_tax.is_some(),
                            deadlines_fired = report.deadlines_fired,
                            next_deadline = ?report.next_deadline,
                            "Maintenance pass"
                        );
                    }
                }
                _ = save_tick.tick() => {
                    if let Err(e) = self.snapshot().await {
                        error!(error = %e, "Periodic snapshot failed");
                    }
                }
            }
        }

        info!("Ledger service stopping, writing final snapshot");
        self.snapshot().await
    }

    fn deliver(&self, outbox: Vec<Notification>) {
        for notification in outbox {
            if let Err(e) = self.notifier.notify(&notification) {
                warn!(
                    user = %notification.user_id,
                    title = %notification.title,
                    error = %e,
                    "Notification delivery failed"
                );
            }
        }
    }
}
