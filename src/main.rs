// main.rs
// Axum server wiring: initializes tracing and the MongoDB state, then serves
// the dashboard router.
//
// Endpoints (all read-only, principal supplied by upstream auth headers):
// - GET /dashboard/admin           -> platform-wide counts, revenue, rankings
// - GET /dashboard/dealer-manager  -> managed-dealer funnel and commissions
// - GET /dashboard/dealer          -> a dealer's own funnel and commissions
// - GET /dashboard/delivery        -> delivery work queue and efficiency
// - GET /dashboard/installer       -> installation work queue
// - GET /dashboard/inventory       -> stock valuation and allocation
// - GET /reports/activity          -> per-user activity counters

use std::{env, net::SocketAddr, sync::Arc};

use dotenvy::dotenv;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

use solarops::{app, state};

#[tokio::main]
async fn main() {
    dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let state = Arc::new(
        state::init_state()
            .await
            .expect("failed to initialize MongoDB state"),
    );

    let addr: SocketAddr = env::var("BIND_ADDR")
        .unwrap_or_else(|_| "0.0.0.0:8080".to_string())
        .parse()
        .expect("BIND_ADDR must be host:port");

    tracing::info!(%addr, "listening");
    let listener = TcpListener::bind(addr).await.unwrap();
    axum::serve(listener, app(state)).await.unwrap();
}
