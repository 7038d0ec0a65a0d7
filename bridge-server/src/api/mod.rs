//! API routes
//!
//! - [`health`] - liveness, readiness and metrics
//! - [`notifications`] - broker notification and ERP webhook intake
//! - [`admin`] - recompute, inventory sync and ledger management
//! - [`stock`] - direct stock adjustments

use axum::Router;
use http::{HeaderName, HeaderValue};
use tower_http::cors::CorsLayer;
use tower_http::request_id::{
    MakeRequestId, PropagateRequestIdLayer, RequestId, SetRequestIdLayer,
};
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use crate::core::ServerState;

pub mod admin;
pub mod health;
pub mod notifications;
pub mod stock;

const CORRELATION_ID_HEADER: &str = "x-correlation-id";

#[derive(Clone)]
struct XCorrelationId;

impl MakeRequestId for XCorrelationId {
    fn make_request_id<B>(&mut self, _request: &http::Request<B>) -> Option<RequestId> {
        let id = Uuid::new_v4().to_string();
        HeaderValue::from_str(&id).ok().map(RequestId::new)
    }
}

/// All routes, no middleware, no state
pub fn build_router() -> Router<ServerState> {
    Router::new()
        .merge(health::router())
        .merge(notifications::router())
        .merge(admin::router())
        .merge(stock::router())
}

/// Fully configured application with middleware and state
pub fn build_app(state: ServerState) -> Router {
    build_router()
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http().make_span_with(
            |request: &http::Request<axum::body::Body>| {
                let correlation_id = request
                    .headers()
                    .get(CORRELATION_ID_HEADER)
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or("-");
                tracing::info_span!(
                    "request",
                    method = %request.method(),
                    uri = %request.uri(),
                    correlation_id,
                )
            },
        ))
        .layer(SetRequestIdLayer::new(
            HeaderName::from_static(CORRELATION_ID_HEADER),
            XCorrelationId,
        ))
        .layer(PropagateRequestIdLayer::new(HeaderName::from_static(
            CORRELATION_ID_HEADER,
        )))
        .with_state(state)
}
