//! HTTP application wiring.
//!
//! Builds the Axum router and defines the shared state injected into
//! handlers. The registrant cache lives in [`Lookups`] and is shared by every
//! request.

pub mod error;
pub mod handlers;

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use axum::routing::get;

use crate::error::Result;
use crate::models::RankingStrategy;
use crate::services::Lookups;

#[derive(Clone)]
pub struct AppState {
    pub lookups: Arc<Lookups>,
    pub strategy: RankingStrategy,
}

impl AppState {
    pub fn new(lookups: Arc<Lookups>) -> Self {
        let strategy = lookups.config().ranking.strategy;
        Self { lookups, strategy }
    }
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::dashboard))
        .route("/api/cadisdik", get(handlers::regions))
        .route("/api/schools", get(handlers::schools))
        .route("/api/school-details", get(handlers::school_details))
        .route("/api/data", get(handlers::data))
        .with_state(state)
}

/// Serve `state` on `addr` until `shutdown` resolves.
pub async fn serve<F>(addr: SocketAddr, state: AppState, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let listener = tokio::net::TcpListener::bind(addr).await?;
    log::info!("Server is running on http://{}", listener.local_addr()?);
    log::info!("Ranking strategy: {:?}", state.strategy);

    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(shutdown)
        .await?;

    log::info!("Server stopped");
    Ok(())
}
