//! Periodic cleanup of aged audit, execution, outbox and alert rows.
//!
//! Runs once at startup and then on a fixed interval. Each table is purged
//! independently; a failure on one is logged and the others still run.

use std::sync::Arc;
use std::time::Duration;

use sqlx::PgPool;
use tokio_util::sync::CancellationToken;
use vigia_core::clock::Clock;
use vigia_core::types::Timestamp;
use vigia_db::repositories::{ActionExecutionRepo, AlertRepo, AuditRepo, NotificationOutboxRepo};

use crate::config::RetentionConfig;

/// Rows removed by one purge, per table. `None` means that table failed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PurgeReport {
    pub audit_logs: Option<u64>,
    pub action_executions: Option<u64>,
    pub notification_outbox: Option<u64>,
    pub closed_alerts: Option<u64>,
}

/// Run the retention loop until `cancel` is triggered.
pub async fn run(
    pool: PgPool,
    clock: Arc<dyn Clock>,
    config: RetentionConfig,
    every: Duration,
    cancel: CancellationToken,
) {
    tracing::info!(
        audit_days = config.audit_days,
        execution_days = config.execution_days,
        outbox_days = config.outbox_days,
        closed_alert_days = config.closed_alert_days,
        interval_secs = every.as_secs(),
        "Retention job started"
    );

    // The first tick completes immediately, so a purge runs at startup.
    let mut interval = tokio::time::interval(every);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Retention job stopping");
                break;
            }
            _ = interval.tick() => {
                purge(&pool, &config, clock.now()).await;
            }
        }
    }
}

/// Delete every row older than its table's retention, relative to `now`.
pub async fn purge(pool: &PgPool, config: &RetentionConfig, now: Timestamp) -> PurgeReport {
    let cutoff = |days: i64| now - chrono::Duration::days(days);

    PurgeReport {
        audit_logs: logged(
            "audit_logs",
            AuditRepo::delete_older_than(pool, cutoff(config.audit_days)).await,
        ),
        action_executions: logged(
            "action_executions",
            ActionExecutionRepo::delete_older_than(pool, cutoff(config.execution_days)).await,
        ),
        notification_outbox: logged(
            "notification_outbox",
            NotificationOutboxRepo::delete_older_than(pool, cutoff(config.outbox_days)).await,
        ),
        closed_alerts: logged(
            "alerts",
            AlertRepo::delete_closed_older_than(pool, cutoff(config.closed_alert_days)).await,
        ),
    }
}

fn logged(table: &str, result: Result<u64, sqlx::Error>) -> Option<u64> {
    match result {
        Ok(0) => {
            tracing::debug!(table, "Retention: no rows to purge");
            Some(0)
        }
        Ok(deleted) => {
            tracing::info!(table, deleted, "Retention: purged old rows");
            Some(deleted)
        }
        Err(e) => {
            tracing::error!(table, error = %e, "Retention: cleanup failed");
            None
        }
    }
}
