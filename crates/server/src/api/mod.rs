//! HTTP surface.
//!
//! - `auth` - login, registration and federated login (/auth/*)
//! - `admin` - admin-only lookups (/admin/*)
//! - `health` - health check endpoint (/healthz)
//! - `openapi` - OpenAPI/Utoipa configuration

pub mod admin;
pub mod auth;
pub mod health;
pub mod openapi;

pub use admin::ADMIN_TAG;
pub use auth::AUTH_TAG;
pub use health::MISC_TAG;

use crate::AppState;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use utoipa::OpenApi;
use utoipa_axum::{router::OpenApiRouter, routes};
use utoipa_redoc::{Redoc, Servable};

/// Build the full application router, including the Redoc UI at `/api-docs`.
pub fn router(state: AppState) -> axum::Router {
    let header = state.guard.header().as_str().to_string();
    let (router, mut api) = OpenApiRouter::with_openapi(openapi::ApiDoc::openapi())
        .nest("/auth", auth::router(state.clone()))
        .nest("/admin", admin::router(state))
        .routes(routes!(health::health))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .split_for_parts();

    openapi::add_session_scheme(&mut api, &header);
    router.merge(Redoc::with_url("/api-docs", api))
}

/// Starts the web server on `listen_addr`.
#[tracing::instrument(skip(state))]
pub async fn start_webserver(state: AppState, listen_addr: &str) -> color_eyre::Result<()> {
    let router = router(state);

    let listener = tokio::net::TcpListener::bind(listen_addr).await?;
    tracing::info!(addr = %listen_addr, "Server running");
    axum::serve(
        listener,
        router.into_make_service_with_connect_info::<std::net::SocketAddr>(),
    )
    .await
    .map_err(|e| color_eyre::Report::msg(format!("Failed to start server: {e}")))?;

    Ok(())
}
