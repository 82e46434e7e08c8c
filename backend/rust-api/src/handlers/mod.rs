use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use base64::{engine::general_purpose, Engine as _};
use serde_json::json;
use std::sync::Arc;

use crate::metrics;
use crate::services::AppState;

pub mod games;
pub mod sse;

/// Liveness plus what the process is currently holding
pub async fn health_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let active_games = state.games.len().await;

    Json(json!({
        "status": "healthy",
        "service": "legendary-lines-api",
        "version": env!("CARGO_PKG_VERSION"),
        "active_games": active_games,
    }))
}

pub async fn metrics_handler() -> impl IntoResponse {
    metrics::render_metrics().map_err(|e| {
        tracing::error!("Failed to render metrics: {}", e);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Failed to render metrics: {}", e),
        )
    })
}

/// Guards /metrics with HTTP Basic credentials from `metrics.auth` (`user:password`)
pub async fn metrics_auth_middleware(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    match basic_credentials(&headers) {
        Some(credentials) if credentials == state.config.metrics_auth => {
            Ok(next.run(request).await)
        }
        _ => Err(StatusCode::UNAUTHORIZED),
    }
}

fn basic_credentials(headers: &HeaderMap) -> Option<String> {
    let encoded = headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Basic ")?;
    let decoded = general_purpose::STANDARD.decode(encoded.trim()).ok()?;
    String::from_utf8(decoded).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn with_authorization(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn basic_credentials_are_decoded() {
        let encoded = general_purpose::STANDARD.encode("metrics:secret");
        let headers = with_authorization(&format!("Basic {}", encoded));
        assert_eq!(basic_credentials(&headers).as_deref(), Some("metrics:secret"));
    }

    #[test]
    fn other_schemes_and_garbage_are_rejected() {
        assert_eq!(basic_credentials(&HeaderMap::new()), None);
        assert_eq!(basic_credentials(&with_authorization("Bearer abc")), None);
        assert_eq!(basic_credentials(&with_authorization("Basic !!!")), None);
    }
}
