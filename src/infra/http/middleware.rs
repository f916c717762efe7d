use std::time::Instant;

use axum::{
    body::Body,
    extract::State,
    http::{HeaderName, HeaderValue, Request},
    middleware::Next,
    response::{IntoResponse, Response},
};
use subtle::ConstantTimeEq;
use tracing::{debug, error, warn};
use uuid::Uuid;

use crate::application::error::ErrorReport;

use super::error::ApiError;
use super::state::ApiKeyState;

pub const API_KEY_HEADER: &str = "x-api-key";
pub const REQUEST_ID_HEADER: HeaderName = HeaderName::from_static("x-request-id");

const MAX_REQUEST_ID_LEN: usize = 128;

/// Per-request correlation data, available to handlers as an extension.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub request_id: String,
}

/// Reuse a caller-supplied `X-Request-Id` when it is a sane header token,
/// otherwise mint one; either way it is echoed on the response.
pub async fn set_request_context(mut request: Request<Body>, next: Next) -> Response {
    let request_id = request
        .headers()
        .get(&REQUEST_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|id| !id.is_empty() && id.len() <= MAX_REQUEST_ID_LEN)
        .map(str::to_owned)
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    request.extensions_mut().insert(RequestContext {
        request_id: request_id.clone(),
    });

    let mut response = next.run(request).await;
    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    response
}

/// Reject requests whose `X-API-KEY` header does not match the configured key.
pub async fn require_api_key(
    State(gate): State<ApiKeyState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let provided = request
        .headers()
        .get(API_KEY_HEADER)
        .map(HeaderValue::as_bytes)
        .unwrap_or_default();

    if !bool::from(provided.ct_eq(gate.key.as_bytes())) {
        return ApiError::unauthorized(gate.view).into_response();
    }

    next.run(request).await
}

/// Log every response; failures carry the [`ErrorReport`] left by the handler.
pub async fn log_responses(request: Request<Body>, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_owned();
    let request_id = request
        .extensions()
        .get::<RequestContext>()
        .map(|ctx| ctx.request_id.clone())
        .unwrap_or_default();
    let started = Instant::now();

    let mut response = next.run(request).await;
    let status = response.status().as_u16();
    let latency_ms = started.elapsed().as_millis() as u64;

    let Some(report) = response.extensions_mut().remove::<ErrorReport>() else {
        if response.status().is_server_error() {
            error!(
                target = "skue::http::response",
                %method,
                %path,
                status,
                latency_ms,
                %request_id,
                "unreported server error"
            );
        } else {
            debug!(
                target = "skue::http::response",
                %method,
                %path,
                status,
                latency_ms,
                %request_id,
                "served"
            );
        }
        return response;
    };

    if response.status().is_server_error() {
        error!(
            target = "skue::http::response",
            %method,
            %path,
            status,
            latency_ms,
            %request_id,
            source = report.source,
            chain = ?report.chain,
            "{}",
            report.summary()
        );
    } else {
        warn!(
            target = "skue::http::response",
            %method,
            %path,
            status,
            latency_ms,
            %request_id,
            source = report.source,
            "{}",
            report.summary()
        );
    }

    response
}
