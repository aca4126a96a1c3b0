//! Threadline server - streaming conversations over HTTP.
//!
//! This crate provides:
//! - `POST /conversation`, which runs one turn and streams it as
//!   server-sent events (or returns it as one JSON document)
//! - REST endpoints for the session lifecycle and history display
//! - The [`StreamingCoordinator`], which multiplexes generated fragments with
//!   idle keepalives and cancels work when the client goes away
//!
//! Sessions and thread messages live in `threadline-storage`; responses are
//! produced by a `threadline-engine` generator.

#![deny(clippy::print_stdout, clippy::print_stderr)]

pub mod api;
pub mod binding;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod history;
pub mod state;
pub mod streaming;
#[cfg(test)]
mod testing;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::http::HeaderValue;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

pub use binding::SessionBinding;
pub use config::ServerConfig;
pub use coordinator::{CoordinatorConfig, StreamingCoordinator};
pub use error::{AppError, AppResult};
pub use history::HistoryProjection;
pub use state::AppState;

/// Run the server with the given configuration.
pub async fn run(config: ServerConfig) -> anyhow::Result<()> {
    run_with_shutdown(config, std::future::pending()).await
}

/// Run the server with graceful shutdown support.
///
/// Once `shutdown` resolves, in-flight requests get `shutdown_timeout`
/// seconds to finish. The storage pool is closed after the listener stops.
pub async fn run_with_shutdown<F>(config: ServerConfig, shutdown: F) -> anyhow::Result<()>
where
    F: std::future::Future<Output = ()> + Send + 'static,
{
    let grace = config.shutdown_timeout_duration();
    let state = Arc::new(AppState::new(config.clone()).await?);
    let pool = state.pool.clone();
    let app = create_router(state);

    let addr: SocketAddr = config.listen_addr.parse()?;
    let listener = TcpListener::bind(addr).await?;
    info!("Starting threadline server on {}", addr);

    let stop = CancellationToken::new();
    let trigger = stop.clone();
    tokio::spawn(async move {
        shutdown.await;
        trigger.cancel();
    });

    let server = {
        let stop = stop.clone();
        async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(stop.cancelled_owned())
                .await
        }
    };

    tokio::select! {
        served = server => served?,
        _ = async {
            stop.cancelled().await;
            tokio::time::sleep(grace).await;
        } => {
            warn!("Graceful shutdown timed out after {}s, dropping open connections", grace.as_secs());
        }
    }

    pool.close();
    Ok(())
}

/// Create the application router.
pub fn create_router(state: Arc<AppState>) -> Router {
    let cors = cors_layer(&state.config.cors_origins);
    let body_limit = state.config.max_body_size;

    api::routes()
        .merge(streaming::routes())
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.is_empty() {
        return CorsLayer::permissive();
    }

    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(allowed)
        .allow_methods(Any)
        .allow_headers(Any)
}
