//! HTTP routes

mod api;

use axum::Router;

use crate::state::AppState;

/// Full application router with middleware
pub fn app(state: AppState) -> Router {
    Router::new()
        .nest("/api", api_routes(state))
        .layer(
            tower::ServiceBuilder::new()
                .layer(
                    tower_http::trace::TraceLayer::new_for_http().make_span_with(
                        |request: &axum::http::Request<_>| {
                            tracing::info_span!(
                                "http_request",
                                method = %request.method(),
                                uri = %request.uri(),
                            )
                        },
                    ),
                )
                .layer(tower_http::compression::CompressionLayer::new())
                .layer(tower_http::cors::CorsLayer::permissive()),
        )
}

/// Create main router with all routes
pub fn api_routes(state: AppState) -> Router {
    Router::new().nest("/v1", api::routes()).with_state(state)
}
