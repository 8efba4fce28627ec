//! API server entry point.

use api::Backend;
use api::config::{Config, LogFormat};
use event_store::PostgresEventStore;
use sqlx::postgres::PgPoolOptions;
use tokio::signal;
use tokio::sync::watch;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Waits for a shutdown signal (SIGINT or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install SIGINT handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("received SIGINT, starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("received SIGTERM, starting graceful shutdown");
        }
    }
}

fn init_tracing(config: &Config) {
    let filter = EnvFilter::try_new(&config.log_level).unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);

    match config.log_format {
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json())
            .init(),
        LogFormat::Text => registry.with(tracing_subscriber::fmt::layer()).init(),
    }
}

async fn connect_backend(config: &Config) -> Backend {
    let Some(url) = config.database_url.as_deref() else {
        tracing::info!("DATABASE_URL not set, using in-memory stores");
        return Backend::in_memory();
    };

    let pool = PgPoolOptions::new()
        .max_connections(config.database_max_connections)
        .connect(url)
        .await
        .expect("failed to connect to PostgreSQL");

    PostgresEventStore::new(pool.clone())
        .run_migrations()
        .await
        .expect("failed to run migrations");

    tracing::info!(
        max_connections = config.database_max_connections,
        "connected to PostgreSQL"
    );
    Backend::postgres(pool)
}

#[tokio::main]
async fn main() {
    let config = Config::from_env();

    // 1. Initialize tracing
    init_tracing(&config);

    // 2. Install Prometheus metrics recorder
    let metrics_handle = metrics_exporter_prometheus::PrometheusBuilder::new()
        .install_recorder()
        .expect("failed to install Prometheus recorder");

    // 3. Connect stores and build application state
    let backend = connect_backend(&config).await;
    let state = api::create_default_state(&backend);

    // 4. Start the projection worker
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let worker = api::spawn_projection_worker(&backend, config.retry_policy(), shutdown_rx);

    // 5. Build the application and start the server
    let app = api::create_app(state, metrics_handle);
    let addr = config.addr();
    tracing::info!(%addr, "starting API server");

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("failed to bind address");

    // 6. Serve until a signal arrives or the projection worker gives up
    match api::serve(listener, app, worker, shutdown_tx, shutdown_signal()).await {
        Ok(()) => tracing::info!("server shut down gracefully"),
        Err(e) => {
            tracing::error!(error = %e, "server stopped");
            std::process::exit(1);
        }
    }
}
