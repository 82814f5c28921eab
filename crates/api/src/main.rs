//! API server entry point.

use std::sync::Arc;

use api::{CollaboratorSet, Config, Stores};
use collaborators::{
    InMemoryAuditSink, InMemoryCatalog, InMemoryCustomerDirectory, InMemoryNotificationGateway,
};
use common::{CustomerId, Money, ProductId, ThreadRandom};
use store::{PgOrderStore, PgPaymentStore, PgTokenStore};
use tokio::signal;
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

#[tokio::main]
async fn main() {
    let config = Config::from_env();

    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config.log_level.clone())),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let prometheus_builder = metrics_exporter_prometheus::PrometheusBuilder::new();
    let metrics_handle = prometheus_builder
        .install_recorder()
        .expect("failed to install Prometheus recorder");

    // Collaborators are remote services in production; the in-memory
    // implementations ship as default wiring with a small demo seed.
    let customers = InMemoryCustomerDirectory::new();
    let catalog = InMemoryCatalog::new();
    for id in 1..=3 {
        customers.register(CustomerId::new(id));
        catalog.stock(ProductId::new(id), Money::from_minor(15_900 * id), 100);
    }
    let collaborators = CollaboratorSet {
        customers: Arc::new(customers),
        catalog: Arc::new(catalog),
        audit: Arc::new(InMemoryAuditSink::new()),
        notifications: Arc::new(InMemoryNotificationGateway::new()),
    };

    let stores = match &config.database_url {
        Some(url) => {
            let pool = sqlx::postgres::PgPoolOptions::new()
                .max_connections(10)
                .connect(url)
                .await
                .expect("failed to connect to database");
            store::run_migrations(&pool)
                .await
                .expect("failed to run migrations");
            tracing::info!("using PostgreSQL stores");
            Stores {
                orders: Arc::new(PgOrderStore::new(pool.clone())),
                payments: Arc::new(PgPaymentStore::new(pool.clone())),
                tokens: Arc::new(PgTokenStore::new(pool)),
            }
        }
        None => {
            tracing::info!("DATABASE_URL not set, using in-memory stores");
            Stores {
                orders: Arc::new(store::InMemoryOrderStore::new()),
                payments: Arc::new(store::InMemoryPaymentStore::new()),
                tokens: Arc::new(store::InMemoryTokenStore::new()),
            }
        }
    };

    let (state, worker) =
        api::create_state(&config, stores, collaborators, Arc::new(ThreadRandom))
            .expect("failed to wire application state");

    let app = api::create_app(state.clone(), metrics_handle);

    let addr = config.addr();
    tracing::info!(%addr, "starting API server");
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("failed to bind address");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server error");

    // Drain queued side effects before exiting.
    state.side_effects.flush().await;
    worker.shutdown();
    tracing::info!("server shut down gracefully");
}
