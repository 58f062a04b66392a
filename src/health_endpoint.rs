// src/health_endpoint.rs
//
// The HTTP check target a registered instance exposes for the registry to poll.

use axum::{routing::get, Json, Router};
use serde_json::{json, Value};
use std::{io, net::SocketAddr};
use tokio::net::TcpListener;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// Router answering `GET {path}` with 200 `{"status":"ok"}`, traced.
pub fn health_router(path: &str) -> Router {
    let trace = TraceLayer::new_for_http()
        .make_span_with(DefaultMakeSpan::new())
        .on_response(DefaultOnResponse::new());

    Router::new().route(path, get(health)).layer(trace)
}

/// Bind the health listener. Done up front so a taken port fails before
/// the instance is registered.
pub async fn bind_health(listen_addr: SocketAddr) -> io::Result<TcpListener> {
    TcpListener::bind(listen_addr).await
}

/// Serve the health router on an already bound listener until `shutdown` resolves.
pub async fn serve_health<F>(listener: TcpListener, path: &str, shutdown: F) -> io::Result<()>
where
    F: std::future::Future<Output = ()> + Send + 'static,
{
    log::info!("health endpoint on http://{}{}", listener.local_addr()?, path);
    axum::serve(listener, health_router(path))
        .with_graceful_shutdown(shutdown)
        .await
}
