//! Paygate server.
//!
//! Loads configuration, connects to PostgreSQL, wires the adapters into the
//! HTTP state and serves until Ctrl+C. The reconciliation sweep and the
//! document job consumer run as background tasks.

use std::sync::Arc;

use sqlx::postgres::PgPoolOptions;
use thiserror::Error;
use tokio::time::MissedTickBehavior;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use paygate::adapters::auth::JwtSessionValidator;
use paygate::adapters::cinetpay::reconciler_from_config;
use paygate::adapters::email::mailer_from_config;
use paygate::adapters::http::{app_router, AppState, HttpSettings};
use paygate::adapters::jobs::ChannelJobQueue;
use paygate::adapters::postgres::{
    PostgresDownloadTokenRepository, PostgresEntitlementRepository, PostgresOrderRepository,
    PostgresWebhookLedger,
};
use paygate::application::ReconcileStaleCommand;
use paygate::config::{AppConfig, ConfigError, ServerConfig, SweepConfig, ValidationError};
use paygate::domain::entitlement::{Catalog, CatalogError};

/// Pending document jobs before `enqueue` starts failing.
const DOCUMENT_QUEUE_CAPACITY: usize = 1024;

#[derive(Debug, Error)]
enum StartupError {
    #[error("configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("configuration invalid: {0}")]
    Validation(#[from] ValidationError),

    #[error("catalog: {0}")]
    Catalog(#[from] CatalogError),

    #[error("database: {0}")]
    Database(#[from] sqlx::Error),

    #[error("migrations: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),

    #[error("mailer: {0}")]
    Mailer(#[from] reqwest::Error),

    #[error("listen address: {0}")]
    Address(#[from] std::net::AddrParseError),

    #[error("server: {0}")]
    Io(#[from] std::io::Error),
}

#[tokio::main]
async fn main() {
    let config = match AppConfig::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    init_tracing(&config.server);

    if let Err(e) = run(config).await {
        tracing::error!(error = %e, "Paygate stopped");
        std::process::exit(1);
    }
}

/// JSON logs in production, human-readable elsewhere. `RUST_LOG` overrides
/// the configured filter.
fn init_tracing(server: &ServerConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&server.log_level));
    let registry = tracing_subscriber::registry().with(filter);
    if server.is_production() {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

async fn run(config: AppConfig) -> Result<(), StartupError> {
    config.validate()?;

    let catalog = match &config.delivery.catalog_path {
        Some(path) => Catalog::from_path(path)?,
        None => Catalog::builtin()?,
    };
    tracing::info!(products = catalog.categories().len(), "Catalog loaded");

    let database = &config.database;
    let pool = PgPoolOptions::new()
        .min_connections(database.min_connections)
        .max_connections(database.max_connections)
        .acquire_timeout(database.acquire_timeout())
        .idle_timeout(Some(database.idle_timeout()))
        .connect(&database.url)
        .await?;
    if database.run_migrations {
        sqlx::migrate!("./migrations").run(&pool).await?;
        tracing::info!("Migrations applied");
    }

    let reconciler = reconciler_from_config(&config.payment, config.server.environment)?;
    tracing::info!(reconciler = reconciler.name(), "Provider reconciler selected");

    let (jobs, job_receiver) = ChannelJobQueue::new(DOCUMENT_QUEUE_CAPACITY);
    tokio::spawn(job_receiver.run(|job| {
        tracing::info!(
            order_id = %job.order_id,
            sku = %job.product_sku,
            key = %job.idempotency_key,
            "Document job handed off"
        );
    }));

    let state = AppState {
        orders: Arc::new(PostgresOrderRepository::new(pool.clone(), database.lock_timeout_ms)),
        ledger: Arc::new(PostgresWebhookLedger::new(pool.clone())),
        tokens: Arc::new(PostgresDownloadTokenRepository::new(pool.clone())),
        entitlements: Arc::new(PostgresEntitlementRepository::new(pool.clone())),
        reconciler,
        mailer: mailer_from_config(&config.email)?,
        jobs: Arc::new(jobs),
        session_validator: Arc::new(JwtSessionValidator::new(
            &config.auth.jwt_secret,
            config.auth.issuer.clone(),
            config.auth.audience.clone(),
        )),
        catalog: Arc::new(catalog),
        settings: HttpSettings::from_config(&config),
    };

    if config.sweep.enabled {
        spawn_sweep_task(state.clone(), config.sweep.clone());
    }

    let app = app_router(state, &config.server);
    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, environment = ?config.server.environment, "Paygate listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

/// Re-checks stale PENDING orders on a fixed interval.
fn spawn_sweep_task(state: AppState, config: SweepConfig) {
    let interval = config.interval();
    tokio::spawn(async move {
        let handler = state.reconcile_stale_handler(config.concurrency);
        let command = ReconcileStaleCommand::from_config(&config);
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // first tick fires immediately; skip it so start-up stays quiet
        ticker.tick().await;

        loop {
            ticker.tick().await;
            if let Err(e) = handler.handle(command).await {
                tracing::warn!(error = %e, "Reconciliation sweep failed");
            }
        }
    });

    tracing::info!(interval_secs = interval.as_secs(), "Reconciliation sweep started");
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to install Ctrl+C handler");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received, stopping server...");
}
