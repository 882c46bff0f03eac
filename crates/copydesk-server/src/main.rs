//! Article lifecycle server for the copydesk editorial backend.
//!
//! Articles move absent → draft → immutable version → published under
//! concurrent multi-user access. This binary wires the lifecycle engine to
//! a document store backend, wraps it in audit logging and exposes the
//! seven operations over HTTP.

mod audit;
mod config;
mod engine;
mod error;
mod handlers;
mod lock;
mod store;

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use clap::Parser;
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::cors::{Any, CorsLayer};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::EnvFilter;

use copydesk_core::DocumentStore;
use copydesk_store_elastic::ElasticStore;
use copydesk_store_memory::MemoryStore;

use audit::{Audited, TracingAuditSink};
use config::{Config, StoreBackend};
use engine::LifecycleEngine;
use handlers::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::parse();

    info!("Starting copydesk-server v{}", env!("CARGO_PKG_VERSION"));
    info!("  Listen: {}:{}", config.host, config.port);
    info!("  Store: {}", config.store);

    let store: Arc<dyn DocumentStore> = match config.store {
        StoreBackend::Memory => Arc::new(MemoryStore::new()),
        StoreBackend::Elastic => {
            info!(
                "  Elasticsearch: {} (indices {}-*)",
                config.elastic_url, config.elastic_index_prefix
            );
            Arc::new(ElasticStore::new(
                &config.elastic_url,
                &config.elastic_index_prefix,
            ))
        }
    };

    let engine = LifecycleEngine::new(store);
    let state = AppState {
        lifecycle: Arc::new(Audited::new(engine, Arc::new(TracingAuditSink))),
    };

    let app = Router::new()
        .route("/article/create", get(handlers::create_article))
        .route("/article/edit", get(handlers::edit_article))
        .route("/article/save", post(handlers::save_article))
        .route("/article/submit", post(handlers::submit_article))
        .route("/article/discard", get(handlers::discard_article))
        .route("/article/publish", get(handlers::publish_article))
        .route("/article/unpublish", get(handlers::unpublish_article))
        .route("/health", get(handlers::health))
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = TcpListener::bind(&addr).await?;
    info!("Listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
        info!("Received Ctrl+C, initiating shutdown");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
        info!("Received SIGTERM, initiating shutdown");
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
