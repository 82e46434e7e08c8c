use axum::{
    extract::Request,
    http::{header::HeaderName, HeaderMap, HeaderValue},
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

pub const TRACE_ID_HEADER: &str = "x-trace-id";

const TRACE_ID: HeaderName = HeaderName::from_static(TRACE_ID_HEADER);
const MAX_TRACE_ID_LEN: usize = 128;

/// Correlation id of one request, available to handlers as an extension
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TraceId(HeaderValue);

impl TraceId {
    /// Keeps a sane client-supplied id, otherwise mints a fresh one
    fn for_request(headers: &HeaderMap) -> Self {
        headers
            .get(&TRACE_ID)
            .filter(|value| is_acceptable(value))
            .cloned()
            .map(TraceId)
            .unwrap_or_else(Self::generate)
    }

    fn generate() -> Self {
        let value = HeaderValue::try_from(Uuid::new_v4().to_string())
            .unwrap_or_else(|_| HeaderValue::from_static("untraced"));
        TraceId(value)
    }

    pub fn as_str(&self) -> &str {
        self.0.to_str().unwrap_or_default()
    }
}

fn is_acceptable(value: &HeaderValue) -> bool {
    let bytes = value.as_bytes();
    !bytes.is_empty()
        && bytes.len() <= MAX_TRACE_ID_LEN
        && bytes
            .iter()
            .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b'.'))
}

/// Tags the request and its response with `x-trace-id`
pub async fn trace_context_middleware(mut request: Request, next: Next) -> Response {
    let trace_id = TraceId::for_request(request.headers());
    request.headers_mut().insert(TRACE_ID, trace_id.0.clone());
    request.extensions_mut().insert(trace_id.clone());

    let mut response = next.run(request).await;
    response
        .headers_mut()
        .entry(TRACE_ID)
        .or_insert(trace_id.0);
    response
}
