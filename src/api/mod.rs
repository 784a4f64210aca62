// Thin HTTP + WebSocket surface over the distribution state.

use std::future::Future;
use std::sync::Arc;

use axum::routing::get;
use axum::Router;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::config::Settings;
use crate::distribution::DistributionState;

pub mod routes;
pub mod ws;

pub use routes::ExchangeInfo;

#[derive(Clone)]
pub struct AppState {
    pub state: Arc<DistributionState>,
    pub exchanges: Arc<Vec<ExchangeInfo>>,
}

impl AppState {
    pub fn new(state: Arc<DistributionState>, settings: &Settings) -> Self {
        let exchanges = settings.exchanges.iter().map(ExchangeInfo::from).collect();
        Self { state, exchanges: Arc::new(exchanges) }
    }
}

pub fn router(app: AppState) -> Router {
    Router::new()
        .route("/health", get(routes::health))
        .route("/api/prices", get(routes::prices))
        .route("/api/arbitrage", get(routes::arbitrage))
        .route("/api/exchanges", get(routes::exchanges))
        .route("/api/status", get(routes::status))
        .route("/ws", get(ws::websocket_handler))
        .with_state(app)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

/// Serve until `shutdown` resolves, then drain in-flight requests.
pub async fn serve(
    listener: TcpListener,
    app: AppState,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> std::io::Result<()> {
    axum::serve(listener, router(app)).with_graceful_shutdown(shutdown).await
}
