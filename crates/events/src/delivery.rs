//! Notification outbox delivery loop.
//!
//! [`OutboxDelivery`] runs as a background task. Every poll interval it
//! claims a batch of due `pending` rows, delivers each one on its channel,
//! and records the outcome. In-app notifications are delivered by marking
//! them sent and broadcasting `notificacion_enviada`; channels without a
//! transport fail and are retried with a fixed backoff until
//! `max_attempts`, after which the row moves to `error`.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use vigia_core::action::CHANNEL_IN_APP;
use vigia_core::audit::{tables, AuditAction};
use vigia_core::clock::Clock;
use vigia_core::messages;
use vigia_db::models::audit::NewAuditLog;
use vigia_db::models::notification::OutboxNotification;
use vigia_db::repositories::{AuditRepo, NotificationOutboxRepo};
use vigia_db::DbPool;

use crate::bus::{BroadcastMessage, EventBus};

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct DeliveryConfig {
    pub poll_interval: Duration,
    pub batch_size: i64,
    pub max_attempts: i32,
    pub retry_backoff: Duration,
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(5),
            batch_size: 50,
            max_attempts: 5,
            retry_backoff: Duration::from_secs(60),
        }
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum DeliveryError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Why a single notification could not be delivered.
#[derive(Debug, thiserror::Error)]
enum ChannelError {
    #[error("No transport configured for channel {0:?}")]
    Unsupported(String),
}

/// Outcome counts for one processed batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeliveryReport {
    pub sent: usize,
    pub failed: usize,
}

// ---------------------------------------------------------------------------
// OutboxDelivery
// ---------------------------------------------------------------------------

/// Background service that drains the notification outbox.
pub struct OutboxDelivery {
    pool: DbPool,
    bus: Arc<EventBus>,
    clock: Arc<dyn Clock>,
    config: DeliveryConfig,
}

impl OutboxDelivery {
    pub fn new(
        pool: DbPool,
        bus: Arc<EventBus>,
        clock: Arc<dyn Clock>,
        config: DeliveryConfig,
    ) -> Self {
        Self {
            pool,
            bus,
            clock,
            config,
        }
    }

    /// Run the delivery loop until `cancel` fires.
    pub async fn run(&self, cancel: CancellationToken) {
        let mut interval = tokio::time::interval(self.config.poll_interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!("Outbox delivery cancelled");
                    break;
                }
                _ = interval.tick() => {
                    match self.process_batch().await {
                        Ok(report) if report.sent + report.failed > 0 => {
                            tracing::info!(
                                sent = report.sent,
                                failed = report.failed,
                                "Processed outbox batch"
                            );
                        }
                        Ok(_) => {}
                        Err(e) => {
                            tracing::error!(error = %e, "Failed to process outbox batch");
                        }
                    }
                }
            }
        }
    }

    /// Claim and deliver one batch of due notifications.
    ///
    /// The batch runs in a single transaction; broadcasts go out only
    /// after it commits.
    pub async fn process_batch(&self) -> Result<DeliveryReport, DeliveryError> {
        let now = self.clock.now();
        let mut tx = self.pool.begin().await?;
        let due = NotificationOutboxRepo::claim_due(&mut *tx, now, self.config.batch_size).await?;

        let mut report = DeliveryReport::default();
        let mut sent_messages = Vec::new();

        for row in &due {
            match deliver(row) {
                Ok(()) => {
                    let updated = NotificationOutboxRepo::mark_sent(&mut *tx, row.id, now).await?;
                    AuditRepo::insert(
                        &mut *tx,
                        &NewAuditLog {
                            table_name: tables::NOTIFICATION_OUTBOX,
                            record_id: row.id,
                            action: AuditAction::Update,
                            before_json: Some(serde_json::to_value(row)?),
                            after_json: Some(serde_json::to_value(&updated)?),
                            user_id: None,
                        },
                    )
                    .await?;
                    sent_messages.push(BroadcastMessage::new(
                        messages::NOTIFICATION_SENT,
                        now,
                        serde_json::to_value(&updated)?,
                    ));
                    report.sent += 1;
                }
                Err(e) => {
                    let retry_at = now + retry_delay(self.config.retry_backoff);
                    let updated = NotificationOutboxRepo::mark_failed(
                        &mut *tx,
                        row.id,
                        &e.to_string(),
                        retry_at,
                        self.config.max_attempts,
                    )
                    .await?;
                    tracing::warn!(
                        notification_id = row.id,
                        attempts = updated.attempts,
                        status = %updated.status,
                        error = %e,
                        "Notification delivery failed"
                    );
                    report.failed += 1;
                }
            }
        }

        tx.commit().await?;

        for message in sent_messages {
            self.bus.publish(message);
        }

        Ok(report)
    }
}

fn deliver(row: &OutboxNotification) -> Result<(), ChannelError> {
    match row.channel.as_str() {
        // In-app delivery is the `notificacion_enviada` broadcast itself.
        CHANNEL_IN_APP => Ok(()),
        other => Err(ChannelError::Unsupported(other.to_string())),
    }
}

fn retry_delay(backoff: Duration) -> chrono::Duration {
    chrono::Duration::from_std(backoff).unwrap_or_else(|_| chrono::Duration::seconds(60))
}
