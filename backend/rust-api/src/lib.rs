use axum::{
    extract::Request,
    http::{header, Method},
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

pub mod config;
pub mod errors;
pub mod extractors;
pub mod handlers;
pub mod metrics;
pub mod middlewares;
pub mod models;
pub mod services;
pub mod utils;

pub use config::Config;
pub use services::AppState;

pub fn create_router(app_state: Arc<services::AppState>) -> Router {
    // The game page is served from a different origin than the API
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE])
        .allow_origin(tower_http::cors::Any);

    let trace = TraceLayer::new_for_http().make_span_with(|request: &Request| {
        let trace_id = request
            .headers()
            .get(middlewares::trace::TRACE_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default();
        tracing::info_span!(
            "request",
            method = %request.method(),
            path = %request.uri().path(),
            trace_id = %trace_id,
        )
    });

    Router::new()
        .route("/health", get(handlers::health_check))
        // Metrics endpoint with Basic Auth protection
        .route(
            "/metrics",
            get(handlers::metrics_handler).layer(middleware::from_fn_with_state(
                app_state.clone(),
                handlers::metrics_auth_middleware,
            )),
        )
        .nest("/api/v1", api_routes().layer(cors))
        .with_state(app_state)
        .layer(middleware::from_fn(
            middlewares::metrics::metrics_middleware,
        ))
        .layer(trace)
        .layer(middleware::from_fn(
            middlewares::trace::trace_context_middleware,
        ))
}

fn api_routes() -> Router<Arc<services::AppState>> {
    Router::new()
        .route("/categories", get(handlers::games::list_categories))
        .route("/games", post(handlers::games::create_game))
        .route(
            "/games/{id}",
            get(handlers::games::get_game).delete(handlers::games::delete_game),
        )
        .route("/games/{id}/input", post(handlers::games::submit_input))
        .route("/games/{id}/nickname", post(handlers::games::submit_nickname))
        .route("/games/{id}/category", post(handlers::games::select_category))
        .route("/games/{id}/answers", post(handlers::games::submit_answer))
        .route("/games/{id}/stream", get(handlers::sse::game_stream))
}
