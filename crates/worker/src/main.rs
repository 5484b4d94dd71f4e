use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use vigia_core::clock::{Clock, SystemClock};
use vigia_events::{EventBus, OutboxDelivery};

mod config;
mod retention;

use config::WorkerConfig;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    let json_logs = std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "vigia_worker=debug,vigia_engine=debug,vigia_events=info".into()
            }),
        )
        .with(json_logs.then(|| tracing_subscriber::fmt::layer().json()))
        .with((!json_logs).then(tracing_subscriber::fmt::layer))
        .init();

    // --- Configuration ---
    let config = WorkerConfig::from_env();
    tracing::info!(
        poll_interval_secs = config.delivery.poll_interval.as_secs(),
        batch_size = config.delivery.batch_size,
        retention_interval_secs = config.retention_interval.as_secs(),
        "Loaded worker configuration"
    );

    // --- Database ---
    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");

    let pool = vigia_db::create_pool(&database_url, config.db_max_connections)
        .await
        .expect("Failed to connect to database");
    tracing::info!("Database connection pool created");

    vigia_db::health_check(&pool)
        .await
        .expect("Database health check failed");

    vigia_db::run_migrations(&pool)
        .await
        .expect("Failed to run database migrations");
    tracing::info!("Database migrations applied");

    // --- Event bus ---
    // Messages reach only subscribers in this process. A host serving
    // real-time listeners runs `OutboxDelivery` on its own bus instead.
    let event_bus = Arc::new(EventBus::new(config.broadcast_capacity));
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    let cancel = CancellationToken::new();

    // Spawn outbox delivery.
    let delivery = OutboxDelivery::new(
        pool.clone(),
        Arc::clone(&event_bus),
        Arc::clone(&clock),
        config.delivery.clone(),
    );
    let delivery_cancel = cancel.clone();
    let delivery_handle = tokio::spawn(async move {
        delivery.run(delivery_cancel).await;
    });

    // Spawn retention cleanup.
    let retention_handle = tokio::spawn(retention::run(
        pool.clone(),
        Arc::clone(&clock),
        config.retention,
        config.retention_interval,
        cancel.clone(),
    ));

    tracing::info!(
        subscribers = event_bus.subscriber_count(),
        "Background services started (outbox delivery, retention)"
    );

    shutdown_signal().await;

    // --- Shutdown ---
    cancel.cancel();
    let _ = tokio::time::timeout(Duration::from_secs(5), delivery_handle).await;
    let _ = tokio::time::timeout(Duration::from_secs(5), retention_handle).await;
    tracing::info!("Background services stopped");

    pool.close().await;
    tracing::info!("Graceful shutdown complete");
}

/// Wait for SIGINT or, on Unix, SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
