pub mod error;
pub mod routes;
pub mod state;

use axum::routing::get;
use axum::Router;
use std::path::PathBuf;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Build the axum Router with all API routes and middleware.
/// Used by `serve()` and available for integration testing.
pub fn build_router(app_state: state::AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/health", get(routes::health::health))
        .route("/api/config", get(routes::config::get_config))
        // Cycles
        .route(
            "/api/cycles",
            get(routes::cycles::list_cycles).post(routes::cycles::start_cycle),
        )
        .route("/api/cycles/{id}", get(routes::cycles::get_cycle))
        // Credentials
        .route(
            "/api/credentials",
            get(routes::credentials::list_credentials).post(routes::credentials::add_credential),
        )
        // Campaigns
        .route(
            "/api/campaigns",
            get(routes::campaigns::list_campaigns).post(routes::campaigns::add_campaign),
        )
        .route("/api/campaigns/{id}", get(routes::campaigns::get_campaign))
        // Work items
        .route("/api/items/next", get(routes::items::next_item))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(app_state)
}

/// Start the control surface for the project at `root`.
pub async fn serve(root: PathBuf, port: u16) -> anyhow::Result<()> {
    let addr = format!("0.0.0.0:{port}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    serve_on(root, listener).await
}

/// Start the control surface on a pre-bound listener.
///
/// Unlike `serve`, this accepts a `TcpListener` that was already bound so the
/// caller can read the actual port before starting (useful when `port = 0` and
/// the OS picks a free port).
pub async fn serve_on(root: PathBuf, listener: tokio::net::TcpListener) -> anyhow::Result<()> {
    let actual_port = listener.local_addr()?.port();
    let app_state = tokio::task::spawn_blocking(move || state::AppState::open(root)).await??;
    let app = build_router(app_state);

    tracing::info!("provision control surface listening on http://localhost:{actual_port}");

    axum::serve(listener, app).await?;
    Ok(())
}
