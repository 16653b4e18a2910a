//! Dashboard Server Module
//! Serves the pre-rendered page; no computation happens per request.

use std::net::Ipv4Addr;
use std::sync::Arc;

use anyhow::Result;
use axum::extract::State;
use axum::response::Html;
use axum::routing::get;
use axum::Router;
use tokio::net::TcpListener;
use tracing::info;

async fn root(State(page): State<Arc<String>>) -> Html<String> {
    Html(page.as_ref().clone())
}

/// Serve the assembled dashboard on 0.0.0.0 at the given port.
pub async fn serve(page: String, port: u16) -> Result<()> {
    let router = Router::new()
        .route("/", get(root))
        .with_state(Arc::new(page));

    let listener = TcpListener::bind((Ipv4Addr::UNSPECIFIED, port)).await?;
    info!("dashboard listening on {}", listener.local_addr()?);
    axum::serve(listener, router.into_make_service()).await?;

    Ok(())
}
