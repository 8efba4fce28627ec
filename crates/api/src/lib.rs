//! HTTP API server with observability for the basket service.
//!
//! Provides REST endpoints for basket commands and totals, with structured
//! logging (tracing) and Prometheus metrics. The projection worker runs as a
//! background task next to the server; if it gives up, the server goes down
//! with it.

pub mod config;
pub mod error;
pub mod routes;

use std::future::{Future, IntoFuture};
use std::sync::Arc;

use axum::Router;
use axum::routing::{get, patch, post, put};
use domain::BasketService;
use event_store::{
    ChangeSource, EventStore, InMemoryEventStore, PostgresChangeSource, PostgresEventStore,
};
use metrics_exporter_prometheus::PrometheusHandle;
use projections::{
    ChangeNotifier, InMemoryReadModelStore, NotifierError, PostgresReadModelStore,
    ProjectionWorker, ReadModelStore, RetryPolicy,
};
use sqlx::PgPool;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::task::{JoinError, JoinHandle};
use totals::{
    DiscountService, InMemoryDiscountService, InMemoryPriceService, PriceService, TotalsService,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use routes::baskets::AppState;

/// The storage adapters the service runs on.
#[derive(Clone)]
pub struct Backend {
    pub events: Arc<dyn EventStore>,
    pub read_models: Arc<dyn ReadModelStore>,
    pub changes: Arc<dyn ChangeSource>,
}

impl Backend {
    /// Process-local stores; state is lost on restart.
    pub fn in_memory() -> Self {
        let store = InMemoryEventStore::new();
        Self {
            events: Arc::new(store.clone()),
            read_models: Arc::new(InMemoryReadModelStore::new()),
            changes: Arc::new(store),
        }
    }

    /// PostgreSQL stores sharing one pool, with `LISTEN/NOTIFY` change
    /// notifications.
    pub fn postgres(pool: PgPool) -> Self {
        Self {
            events: Arc::new(PostgresEventStore::new(pool.clone())),
            read_models: Arc::new(PostgresReadModelStore::new(pool.clone())),
            changes: Arc::new(PostgresChangeSource::new(pool)),
        }
    }
}

/// Creates the Axum application router with all routes and shared state.
pub fn create_app(state: Arc<AppState>, metrics_handle: PrometheusHandle) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check))
        .route("/basket/items", post(routes::baskets::add_items))
        .route(
            "/basket/items/{product_id}",
            patch(routes::baskets::adjust_item_quantity),
        )
        .route(
            "/basket/discount-code",
            put(routes::baskets::set_discount_code),
        )
        .route(
            "/basket/shipping/{country_code}",
            put(routes::baskets::set_shipping_cost),
        )
        .route("/basket/totals", get(routes::baskets::totals))
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

/// Creates the application state with the sample price and discount
/// catalogues.
pub fn create_default_state(backend: &Backend) -> Arc<AppState> {
    let prices: Arc<dyn PriceService> = Arc::new(InMemoryPriceService::sample());
    let discounts: Arc<dyn DiscountService> = Arc::new(InMemoryDiscountService::sample());
    create_state(backend, prices, discounts)
}

/// Creates the application state with explicit pricing collaborators.
pub fn create_state(
    backend: &Backend,
    prices: Arc<dyn PriceService>,
    discounts: Arc<dyn DiscountService>,
) -> Arc<AppState> {
    Arc::new(AppState {
        baskets: BasketService::new(Arc::clone(&backend.events)),
        totals: TotalsService::new(Arc::clone(&backend.read_models), prices, discounts),
    })
}

/// Spawns the projection worker on the backend's change source.
///
/// The task ends when `shutdown` flips to true, or with
/// `NotifierError::Unavailable` if the change source never comes up.
pub fn spawn_projection_worker(
    backend: &Backend,
    policy: RetryPolicy,
    shutdown: watch::Receiver<bool>,
) -> JoinHandle<Result<(), NotifierError>> {
    let notifier = ChangeNotifier::new(Arc::clone(&backend.changes), policy);
    let worker = ProjectionWorker::new(
        Arc::clone(&backend.events),
        Arc::clone(&backend.read_models),
    );

    tokio::spawn(async move {
        let result = worker.run(&notifier, shutdown).await;
        if let Err(ref e) = result {
            tracing::error!(error = %e, "projection worker stopped");
        }
        result
    })
}

/// Why [`serve`] stopped other than by a shutdown signal.
#[derive(Debug, Error)]
pub enum ServeError {
    #[error("server error: {0}")]
    Io(#[from] std::io::Error),

    /// Read models can no longer be kept current.
    #[error("projection worker failed: {0}")]
    Worker(#[from] NotifierError),

    #[error("projection worker panicked: {0}")]
    WorkerPanicked(#[from] JoinError),
}

/// Serves `app` until `signal` resolves or the projection worker stops.
///
/// `shutdown` is the sender paired with the worker's receiver. A signal stops
/// the server and then the worker. A worker that fails first stops the
/// server, and its error is returned.
pub async fn serve<F>(
    listener: TcpListener,
    app: Router,
    mut worker: JoinHandle<Result<(), NotifierError>>,
    shutdown: watch::Sender<bool>,
    signal: F,
) -> Result<(), ServeError>
where
    F: Future<Output = ()> + Send + 'static,
{
    let mut stopping = shutdown.subscribe();
    let server = axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            tokio::select! {
                () = signal => {}
                _ = stopping.wait_for(|stop| *stop) => {}
            }
        })
        .into_future();
    tokio::pin!(server);

    tokio::select! {
        served = &mut server => {
            shutdown.send_replace(true);
            let worker_result = worker.await;
            served?;
            worker_result??;
            Ok(())
        }
        joined = &mut worker => {
            tracing::warn!("projection worker ended, stopping server");
            shutdown.send_replace(true);
            server.await?;
            joined??;
            Ok(())
        }
    }
}
