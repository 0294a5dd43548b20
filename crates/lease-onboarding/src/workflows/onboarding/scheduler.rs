use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use super::domain::{generate_one_time_credential, hash_credential, Account};
use super::repository::{AccountRepository, NotificationPort, RepositoryError};

/// Cadence and bounds for the welcome-notification background job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerSettings {
    /// Delay between two runs.
    pub interval: Duration,
    /// Wall-clock budget for aggregating one run's results.
    pub run_timeout: Duration,
    /// Delivery attempts allowed per account before forced deactivation.
    pub max_attempts: u8,
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(60),
            run_timeout: Duration::from_secs(30),
            max_attempts: 3,
        }
    }
}

/// Aggregated outcome of one scheduler run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct RunReport {
    pub scanned: usize,
    pub delivered: usize,
    pub retried: usize,
    pub deactivated: usize,
    pub failed: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AccountOutcome {
    Delivered,
    Retried,
    Deactivated,
    Failed,
}

/// Recurring task delivering the one-time welcome credential to every account
/// still flagged pending, with bounded per-account retries.
///
/// Accounts are processed as independent concurrent units of work; one
/// account's failure never blocks the others, and coordination with the
/// request path happens exclusively through the account store.
pub struct NotificationRetryScheduler<R, N> {
    accounts: Arc<R>,
    notifications: Arc<N>,
    settings: SchedulerSettings,
}

impl<R, N> NotificationRetryScheduler<R, N>
where
    R: AccountRepository + 'static,
    N: NotificationPort + 'static,
{
    pub fn new(accounts: Arc<R>, notifications: Arc<N>, settings: SchedulerSettings) -> Self {
        Self {
            accounts,
            notifications,
            settings,
        }
    }

    /// Run forever on the configured cadence. Intended to be `tokio::spawn`ed
    /// by the application root next to the request handlers.
    pub async fn run(self) {
        let mut ticker = time::interval(self.settings.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            match self.run_once().await {
                Ok(report) if report.scanned == 0 => {
                    debug!("welcome notification run found no pending accounts");
                }
                Ok(report) => {
                    info!(
                        scanned = report.scanned,
                        delivered = report.delivered,
                        retried = report.retried,
                        deactivated = report.deactivated,
                        failed = report.failed,
                        "welcome notification run complete"
                    );
                }
                Err(err) => {
                    error!(%err, "welcome notification run abandoned");
                }
            }
        }
    }

    /// Execute a single run: fan out one task per pending account, fan the
    /// outcomes back in under the run timeout.
    ///
    /// All units are submitted before the deadline starts counting; if the
    /// deadline elapses the run is abandoned as failed, but in-flight tasks
    /// keep running to completion and their per-account store updates stand.
    pub async fn run_once(&self) -> Result<RunReport, SchedulerError> {
        let pending = self.accounts.pending_welcome()?;
        if pending.is_empty() {
            return Ok(RunReport::default());
        }

        let scanned = pending.len();
        let handles: Vec<JoinHandle<AccountOutcome>> = pending
            .into_iter()
            .map(|account| {
                let accounts = Arc::clone(&self.accounts);
                let notifications = Arc::clone(&self.notifications);
                let max_attempts = self.settings.max_attempts;
                tokio::spawn(process_account(accounts, notifications, account, max_attempts))
            })
            .collect();

        let collect = async {
            let mut report = RunReport {
                scanned,
                ..RunReport::default()
            };
            for handle in handles {
                match handle.await {
                    Ok(AccountOutcome::Delivered) => report.delivered += 1,
                    Ok(AccountOutcome::Retried) => report.retried += 1,
                    Ok(AccountOutcome::Deactivated) => report.deactivated += 1,
                    Ok(AccountOutcome::Failed) => report.failed += 1,
                    Err(join_err) => {
                        error!(%join_err, "welcome notification task panicked");
                        report.failed += 1;
                    }
                }
            }
            report
        };

        match time::timeout(self.settings.run_timeout, collect).await {
            Ok(report) => Ok(report),
            // Dropping the remaining handles detaches the tasks instead of
            // cancelling them; partial progress is expected.
            Err(_) => Err(SchedulerError::RunTimedOut {
                budget: self.settings.run_timeout,
            }),
        }
    }
}

/// Handle one pending account. Every terminal path commits its own store
/// update, so overlapping runs re-observing the result stay idempotent.
async fn process_account<R, N>(
    accounts: Arc<R>,
    notifications: Arc<N>,
    mut account: Account,
    max_attempts: u8,
) -> AccountOutcome
where
    R: AccountRepository,
    N: NotificationPort,
{
    if account.notification_retry_count >= max_attempts {
        account.active = false;
        account.pending_welcome_notification = false;
        let subscriber_id = account.subscriber_id;
        return match accounts.update(account) {
            Ok(()) => {
                warn!(
                    subscriber_id = %subscriber_id,
                    max_attempts,
                    "welcome delivery retries exhausted, account deactivated"
                );
                AccountOutcome::Deactivated
            }
            Err(err) => {
                error!(subscriber_id = %subscriber_id, %err, "failed to persist forced deactivation");
                AccountOutcome::Failed
            }
        };
    }

    let credential = generate_one_time_credential();
    let message = welcome_message(&account.username, &credential);

    let delivered = match notifications.send(&account.username, &message).await {
        Ok(receipt) if receipt.success => true,
        Ok(receipt) => {
            warn!(
                subscriber_id = %account.subscriber_id,
                status_code = receipt.status_code,
                "welcome delivery rejected by provider"
            );
            false
        }
        Err(err) => {
            warn!(subscriber_id = %account.subscriber_id, %err, "welcome delivery failed");
            false
        }
    };

    let subscriber_id = account.subscriber_id;
    if delivered {
        account.pending_welcome_notification = false;
        account.notification_retry_count = 0;
        account.password_hash = hash_credential(&credential);
        match accounts.update(account) {
            Ok(()) => {
                info!(subscriber_id = %subscriber_id, "welcome credential delivered");
                AccountOutcome::Delivered
            }
            Err(err) => {
                error!(subscriber_id = %subscriber_id, %err, "failed to persist welcome delivery");
                AccountOutcome::Failed
            }
        }
    } else {
        account.notification_retry_count += 1;
        let attempt = account.notification_retry_count;
        match accounts.update(account) {
            Ok(()) => {
                debug!(subscriber_id = %subscriber_id, attempt, "welcome delivery will be retried");
                AccountOutcome::Retried
            }
            Err(err) => {
                error!(subscriber_id = %subscriber_id, %err, "failed to persist retry counter");
                AccountOutcome::Failed
            }
        }
    }
}

fn welcome_message(username: &str, credential: &str) -> String {
    format!(
        "Welcome aboard! Sign in with username {username} and one-time password {credential}. \
         You will be asked to choose a new password on first login."
    )
}

/// Run-level failure of the scheduler; per-account failures are folded into
/// the report instead.
#[derive(Debug, thiserror::Error)]
pub enum SchedulerError {
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error("welcome notification run exceeded its {budget:?} budget")]
    RunTimedOut { budget: Duration },
}
