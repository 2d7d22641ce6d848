use jobboard_backend::config::{self, LoggingConfig};
use jobboard_backend::{middleware, server};
use sqlx::postgres::PgPoolOptions;
use std::path::Path;
use std::time::Duration;
use tracing::{error, info};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// How often idle rate limit records are swept in the background
const RATE_LIMIT_CLEANUP_INTERVAL: Duration = Duration::from_secs(60);

/// Install the global subscriber. The returned guard flushes the log file on drop.
fn init_tracing(logging: &LoggingConfig) -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "jobboard_backend={},tower_http=info",
            logging.level
        ))
    });

    let (file_layer, guard) = match &logging.file {
        Some(file) => {
            let path = Path::new(file);
            let directory = path
                .parent()
                .filter(|dir| !dir.as_os_str().is_empty())
                .unwrap_or_else(|| Path::new("."));
            let prefix = path
                .file_name()
                .map(|name| name.to_os_string())
                .unwrap_or_else(|| "jobboard.log".into());

            let appender = tracing_appender::rolling::daily(directory, prefix);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer().json().with_ansi(false).with_writer(writer);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    let json = logging.format == "json";
    tracing_subscriber::registry()
        .with(filter)
        .with(json.then(|| fmt::layer().json()))
        .with((!json).then(|| fmt::layer().compact()))
        .with(file_layer)
        .init();

    guard
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
    }
    info!("Shutdown signal received");
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = config::Config::load()?;
    let _log_guard = init_tracing(&config.logging);

    info!(version = jobboard_backend::VERSION, "Starting job board backend...");

    // Initialize database connection pool
    let db_pool = PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .min_connections(config.database.min_connections)
        .acquire_timeout(Duration::from_secs(config.database.acquire_timeout))
        .idle_timeout(Duration::from_secs(config.database.idle_timeout))
        .connect(&config.database.url)
        .await
        .map_err(|e| {
            error!("Failed to connect to database: {}", e);
            e
        })?;

    info!("Database connection established");

    // Run database migrations
    sqlx::migrate!("./migrations")
        .run(&db_pool)
        .await
        .map_err(|e| {
            error!("Failed to run database migrations: {}", e);
            e
        })?;

    info!("Database migrations completed");

    let bind_address = config.server.bind_address();
    let app_state = server::AppState::new(config, db_pool)?;

    let cleanup = tokio::spawn(middleware::cleanup_task(
        app_state.rate_limiters.all(),
        RATE_LIMIT_CLEANUP_INTERVAL,
    ));

    let app = server::create_router(app_state);

    let listener = tokio::net::TcpListener::bind(&bind_address)
        .await
        .map_err(|e| {
            error!("Failed to bind to {}: {}", bind_address, e);
            e
        })?;

    info!("Server listening on {}", listener.local_addr()?);

    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        error!("Server error: {}", e);
    }

    cleanup.abort();

    info!("Server shutdown complete");
    Ok(())
}
