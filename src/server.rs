use axum::{Router, http::Method, routing::get};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::config::Config;
use crate::routes::{create_api_routes, health};
use crate::services::{MemoService, SummaryService};

/// アプリケーション全体で共有される状態
#[derive(Clone)]
pub struct AppState {
    /// サービス層
    pub memo_service: Arc<MemoService>,
    pub summary_service: Arc<SummaryService>,
    /// Server start time (for health checks)
    pub start_time: Instant,
}

impl AppState {
    pub fn new(memo_service: Arc<MemoService>, summary_service: Arc<SummaryService>) -> Self {
        Self {
            memo_service,
            summary_service,
            start_time: Instant::now(),
        }
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}

pub fn create_router(state: AppState, cors: CorsLayer) -> Router {
    Router::new()
        .route("/health", get(health))
        .nest("/api", create_api_routes())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

pub async fn start_server(
    addr: SocketAddr,
    state: AppState,
    config: &Config,
) -> anyhow::Result<()> {
    info!("Configuring CORS...");
    let allowed_origins = config.server.get_allowed_origins(&addr)?;
    let cors = CorsLayer::new()
        .allow_origin(allowed_origins)
        .allow_methods(vec![
            Method::GET,
            Method::POST,
            Method::PATCH,
            Method::DELETE,
        ])
        .allow_headers([axum::http::header::CONTENT_TYPE]);

    let app = create_router(state, cors);

    let listener = TcpListener::bind(addr).await?;
    info!(%addr, "Server is running");
    axum::serve(listener, app).await?;

    Ok(())
}
