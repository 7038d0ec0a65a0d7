//! Liveness, readiness and metrics routes — public, no auth

use axum::{Json, Router, extract::State, routing::get};
use serde::Serialize;

use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/metrics", get(metrics))
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

/// Process is up; says nothing about upstreams
async fn healthz() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

#[derive(Serialize)]
struct ReadyResponse {
    status: &'static str,
    checks: ReadyChecks,
}

#[derive(Serialize)]
struct ReadyChecks {
    erp: CheckResult,
    broker: CheckResult,
}

#[derive(Serialize)]
struct CheckResult {
    status: &'static str,
    breaker: &'static str,
}

/// Readiness: probes both upstreams
///
/// Degraded upstreams are reported in the body but the route still
/// answers 200; orchestration decides what to do with the detail.
async fn readyz(State(state): State<ServerState>) -> Json<ReadyResponse> {
    let (erp_ok, broker_ok) = tokio::join!(state.erp.health_check(), state.broker.health_check());
    let ready = erp_ok && broker_ok;

    Json(ReadyResponse {
        status: if ready { "ready" } else { "degraded" },
        checks: ReadyChecks {
            erp: CheckResult {
                status: if erp_ok { "ok" } else { "error" },
                breaker: state.erp.breaker_state().as_str(),
            },
            broker: CheckResult {
                status: if broker_ok { "ok" } else { "error" },
                breaker: state.broker.breaker_state().as_str(),
            },
        },
    })
}

/// Prometheus exposition text
async fn metrics(State(state): State<ServerState>) -> String {
    state
        .metrics
        .as_ref()
        .map(|handle| handle.render())
        .unwrap_or_default()
}
