pub mod routes;
pub mod state;

use std::net::SocketAddr;

use anyhow::{Context, Result};
use tokio::net::TcpListener;
use tracing::info;

use self::state::AppState;

pub async fn serve(bind: SocketAddr, state: AppState) -> Result<()> {
    let listener = TcpListener::bind(bind)
        .await
        .with_context(|| format!("failed to bind {bind}"))?;
    info!(%bind, "serving institutions dashboard");
    axum::serve(listener, routes::router(state))
        .await
        .context("server stopped unexpectedly")
}
