use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use domain::services::SimulatedTargetHandler;
use persistence::repositories::{
    BulkOperationRepository, InMemoryBulkOperationRepository, PgBulkOperationRepository,
};
use tracing::info;

use focusprint_api::config::{Config, StorageBackend};
use focusprint_api::jobs::{JobScheduler, OperationMetricsJob, PoolMetricsJob};
use focusprint_api::services::BulkOperationService;
use focusprint_api::{app, middleware};

const JOB_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let config = Config::load()?;

    middleware::logging::init_logging(&config.logging);
    middleware::init_metrics()?;

    info!("Starting FocuSprint bulk operations service v{}", env!("CARGO_PKG_VERSION"));

    let mut scheduler = JobScheduler::new();

    let repository: Arc<dyn BulkOperationRepository> = match config.storage.backend {
        StorageBackend::Memory => {
            info!(capacity = config.storage.capacity, "Using in-memory operation store");
            Arc::new(InMemoryBulkOperationRepository::new(config.storage.capacity))
        }
        StorageBackend::Postgres => {
            let pool = persistence::db::create_pool(&config.database.pool_config()).await?;

            info!("Running database migrations...");
            persistence::db::run_migrations(&pool).await?;
            info!("Migrations completed");

            scheduler.register(PoolMetricsJob::new(pool.clone()));
            Arc::new(PgBulkOperationRepository::new(pool, config.storage.capacity))
        }
    };

    let service = Arc::new(BulkOperationService::new(
        Arc::clone(&repository),
        Arc::new(SimulatedTargetHandler::new()),
        config.bulk_operations.clone(),
    ));
    service.recover_interrupted().await?;

    scheduler.register(OperationMetricsJob::new(repository));
    scheduler.start();

    let app = app::create_app(config.clone(), Arc::clone(&service));

    let addr = config.socket_addr();
    info!("Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("HTTP server stopped, draining bulk operations");
    scheduler.shutdown();
    let drained = service.shutdown().await;
    scheduler.wait_for_shutdown(JOB_SHUTDOWN_TIMEOUT).await;
    info!(drained = drained, "Shutdown complete");

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
