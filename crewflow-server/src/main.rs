//! CrewFlow webhook service.
//!
//! Receives, verifies, records, and routes e-commerce webhook events,
//! triggering business workflows and notifications with retry,
//! circuit-breaker, and cache-fallback protection on every outbound
//! collaborator call.

mod api;
mod config;
mod server;
mod shutdown;
mod state;

use clap::Parser;
use config::{ConfigLoader, get_database_url};
use server::{build_router, run_server};
use shutdown::spawn_config_reload_handler;
use state::AppState;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use crewflow_core::collaborators::{HttpMonitoringService, HttpNotifier, HttpWorkflowEngine};
use crewflow_core::events::monitoring_sweep_channel;
use crewflow_core::framework::connect_pool;
use crewflow_core::health::HealthChecker;
use crewflow_core::pipeline::WebhookProcessor;
use crewflow_core::processors::{JobRunner, MonitoringRunner};
use crewflow_core::reporter::ErrorReporter;
use crewflow_core::resilience::breaker::BreakerRegistry;
use crewflow_core::stores::PgStore;

/// Poll cadence for the durable scheduled-job queue.
const JOB_POLL_INTERVAL: Duration = Duration::from_secs(10);

/// CrewFlow - webhook ingestion and event routing service
#[derive(Parser, Debug)]
#[command(name = "crewflow-server")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to the configuration file
    #[arg(short, long, default_value = "./crewflow-config.toml")]
    config: PathBuf,

    /// Override the listen address (e.g., 0.0.0.0:3000)
    #[arg(short, long)]
    listen: Option<SocketAddr>,

    /// Run database migrations on startup
    #[arg(long, default_value = "false")]
    migrate: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let args = Args::parse();

    tracing::info!("Starting crewflow-server v{}", env!("CARGO_PKG_VERSION"));

    let config_loader = Arc::new(ConfigLoader::new(&args.config, args.listen));
    let loaded_config = config_loader.load().map_err(|e| {
        tracing::error!("Failed to load configuration: {}", e);
        e
    })?;

    let listen_addr = loaded_config.server.listen;
    let collaborators = loaded_config.collaborators.clone();
    let retry_policy = loaded_config.resilience.retry.clone();
    let breaker_settings = loaded_config.resilience.breaker.clone();
    tracing::info!("Configuration loaded from {:?}", args.config);

    let shared_config = loaded_config.into_shared();

    let database_url = get_database_url().map_err(|e| {
        tracing::error!("DATABASE_URL environment variable not set");
        e
    })?;

    tracing::info!("Connecting to database...");
    let db_pool = connect_pool(&database_url, 10).await.map_err(|e| {
        tracing::error!("Failed to connect to database: {}", e);
        e
    })?;
    tracing::info!("Database connection established");

    if args.migrate {
        tracing::info!("Running database migrations...");
        sqlx::migrate!("../migrations")
            .run(&db_pool)
            .await
            .map_err(|e| {
                tracing::error!("Failed to run migrations: {}", e);
                e
            })?;
        tracing::info!("Migrations completed successfully");
    }

    // Stores and collaborator clients.
    let breakers = Arc::new(BreakerRegistry::new(breaker_settings));
    let store = Arc::new(PgStore::new(db_pool.clone()));
    let workflows = Arc::new(HttpWorkflowEngine::new(
        &collaborators.workflow_engine_url,
        retry_policy.clone(),
        &breakers,
    ));
    let notifier = Arc::new(HttpNotifier::new(
        &collaborators.notification_url,
        retry_policy.clone(),
    ));
    let monitoring = Arc::new(HttpMonitoringService::new(
        &collaborators.monitoring_url,
        retry_policy,
        &breakers,
    ));
    let reporter = ErrorReporter::new(store.clone(), notifier.clone());

    // Background processors with a shared shutdown signal.
    let (sweep_tx, sweep_rx) = monitoring_sweep_channel();
    let (processor_shutdown_tx, processor_shutdown_rx) = watch::channel(false);

    let monitoring_runner = MonitoringRunner::new(
        monitoring,
        sweep_rx,
        processor_shutdown_rx.clone(),
        reporter.clone(),
    );
    let monitoring_handle = tokio::spawn(monitoring_runner.run());

    let job_runner = JobRunner::new(
        store.clone(),
        workflows.clone(),
        reporter.clone(),
        processor_shutdown_rx,
        JOB_POLL_INTERVAL,
    );
    let job_handle = tokio::spawn(job_runner.run());

    // The pipeline and health checker.
    let processor = Arc::new(WebhookProcessor::new(
        store.clone(),
        store.clone(),
        store.clone(),
        workflows,
        notifier,
        sweep_tx,
        reporter,
        shared_config.clone(),
    ));
    let health = Arc::new(HealthChecker::new(store.clone(), store, breakers));

    let app_state = AppState {
        db: db_pool.clone(),
        config: shared_config,
        processor,
        health,
    };

    // Spawn config reload handler (listens for SIGHUP).
    let reload_shutdown = spawn_config_reload_handler(app_state.clone(), config_loader);

    let router = build_router(app_state);

    tracing::info!("Starting HTTP server on {}", listen_addr);
    let result = run_server(router, listen_addr).await;

    // Stop the reload handler and the background processors.
    reload_shutdown.notify_one();
    let _ = processor_shutdown_tx.send(true);
    let _ = monitoring_handle.await;
    let _ = job_handle.await;

    tracing::info!("Closing database connections...");
    db_pool.close().await;
    tracing::info!("Server shutdown complete");

    result.map_err(Into::into)
}

/// Initialize the tracing subscriber with environment-based filtering.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,sqlx=warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}
