use std::time::Duration;

use vigia_events::DeliveryConfig;

/// Background worker configuration loaded from environment variables.
///
/// | Env Var                     | Default |
/// |-----------------------------|---------|
/// | `DB_MAX_CONNECTIONS`        | `20`    |
/// | `BROADCAST_CAPACITY`        | `1024`  |
/// | `OUTBOX_POLL_INTERVAL_SECS` | `5`     |
/// | `OUTBOX_BATCH_SIZE`         | `50`    |
/// | `OUTBOX_MAX_ATTEMPTS`       | `5`     |
/// | `OUTBOX_RETRY_BACKOFF_SECS` | `60`    |
/// | `RETENTION_INTERVAL_SECS`   | `21600` |
///
/// Non-numeric or non-positive values fall back to the default.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub db_max_connections: u32,
    pub broadcast_capacity: usize,
    pub delivery: DeliveryConfig,
    pub retention_interval: Duration,
    pub retention: RetentionConfig,
}

/// How long each kind of row is kept before the retention job removes it.
///
/// | Env Var                 | Default |
/// |-------------------------|---------|
/// | `AUDIT_RETENTION_DAYS`  | `30`    |
/// | `EXEC_RETENTION_DAYS`   | `30`    |
/// | `OUTBOX_RETENTION_DAYS` | `30`    |
/// | `ALERT_RETENTION_DAYS`  | `90`    |
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetentionConfig {
    pub audit_days: i64,
    pub execution_days: i64,
    pub outbox_days: i64,
    pub closed_alert_days: i64,
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            audit_days: 30,
            execution_days: 30,
            outbox_days: 30,
            closed_alert_days: 90,
        }
    }
}

impl RetentionConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            audit_days: positive(&lookup, "AUDIT_RETENTION_DAYS", defaults.audit_days),
            execution_days: positive(&lookup, "EXEC_RETENTION_DAYS", defaults.execution_days),
            outbox_days: positive(&lookup, "OUTBOX_RETENTION_DAYS", defaults.outbox_days),
            closed_alert_days: positive(&lookup, "ALERT_RETENTION_DAYS", defaults.closed_alert_days),
        }
    }
}

impl WorkerConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let delivery_defaults = DeliveryConfig::default();

        let delivery = DeliveryConfig {
            poll_interval: Duration::from_secs(positive(
                &lookup,
                "OUTBOX_POLL_INTERVAL_SECS",
                delivery_defaults.poll_interval.as_secs(),
            )),
            batch_size: positive(&lookup, "OUTBOX_BATCH_SIZE", delivery_defaults.batch_size),
            max_attempts: positive(&lookup, "OUTBOX_MAX_ATTEMPTS", delivery_defaults.max_attempts),
            retry_backoff: Duration::from_secs(positive(
                &lookup,
                "OUTBOX_RETRY_BACKOFF_SECS",
                delivery_defaults.retry_backoff.as_secs(),
            )),
        };

        Self {
            db_max_connections: positive(
                &lookup,
                "DB_MAX_CONNECTIONS",
                vigia_db::DEFAULT_MAX_CONNECTIONS,
            ),
            broadcast_capacity: positive(
                &lookup,
                "BROADCAST_CAPACITY",
                vigia_events::bus::DEFAULT_CAPACITY,
            ),
            delivery,
            retention_interval: Duration::from_secs(positive(
                &lookup,
                "RETENTION_INTERVAL_SECS",
                21_600,
            )),
            retention: RetentionConfig::from_lookup(&lookup),
        }
    }
}

/// Parse `name` as a strictly positive number, or return `default`.
fn positive<T>(lookup: &impl Fn(&str) -> Option<String>, name: &str, default: T) -> T
where
    T: std::str::FromStr + PartialOrd + Default,
{
    match lookup(name).map(|raw| raw.trim().parse::<T>()) {
        Some(Ok(value)) if value > T::default() => value,
        Some(_) => {
            tracing::warn!(var = name, "Ignoring invalid value, using default");
            default
        }
        None => default,
    }
}
