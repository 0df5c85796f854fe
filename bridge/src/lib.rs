use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use duet_core::{DuetConfig, Orchestrator};

pub mod env_file;
pub mod handlers;

pub use env_file::{load_env_file, load_env_file_from, EnvFile};
pub use handlers::ApiError;

#[derive(thiserror::Error, Debug)]
pub enum BridgeError {
    #[error("bind failed on {addr}: {source}")]
    Bind {
        addr: std::net::SocketAddr,
        source: std::io::Error,
    },
    #[error("startup failed: {0}")]
    Startup(#[from] duet_core::DuetError),
    #[error("internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, BridgeError>;

/// Shared state handed to every route
#[derive(Clone)]
pub struct BridgeState {
    pub orchestrator: Arc<Orchestrator>,
}

impl BridgeState {
    pub fn new(orchestrator: Arc<Orchestrator>) -> Self {
        Self { orchestrator }
    }

    pub fn from_config(config: Arc<DuetConfig>) -> Result<Self> {
        Ok(Self::new(Arc::new(Orchestrator::new(config)?)))
    }
}

/// Build the HTTP surface: `/ask`, `/ide` and `/health`
pub fn router(state: BridgeState) -> Router {
    Router::new()
        .route("/ask", post(handlers::ask))
        .route("/ide", post(handlers::ide))
        .route("/health", get(handlers::health))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

/// Serve on an already bound listener until ctrl-c
pub async fn serve(listener: TcpListener, state: BridgeState) -> Result<()> {
    let app = router(state);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| BridgeError::Internal(e.to_string()))
}

pub async fn start_server(addr: std::net::SocketAddr, state: BridgeState) -> Result<()> {
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|source| BridgeError::Bind { addr, source })?;
    info!(target: "bridge", %addr, "Starting Duet Bridge HTTP server");
    serve(listener, state).await
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!(target: "bridge", "Shutdown signal received");
    }
}
