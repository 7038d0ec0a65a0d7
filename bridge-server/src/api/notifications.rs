//! Notification and webhook intake
//!
//! Both routes acknowledge immediately and process in the background:
//! the broker treats slow notification endpoints as failed and retries,
//! which would double work that is already in flight.

use axum::{Json, Router, extract::State, http::StatusCode, response::IntoResponse, routing::post};
use serde::Serialize;
use serde_json::Value;
use shared::Notification;

use crate::core::ServerState;
use crate::utils::metrics;

pub fn router() -> Router<ServerState> {
    Router::new()
        .route("/orion/notifications", post(orion_notifications))
        .route("/odoo/webhook", post(odoo_webhook))
}

#[derive(Serialize)]
struct Accepted {
    accepted: usize,
}

/// Broker change notification: one resolution task per entity
async fn orion_notifications(
    State(state): State<ServerState>,
    Json(notification): Json<Notification>,
) -> Json<Accepted> {
    metrics::counter(metrics::NOTIFICATIONS_RECEIVED);
    let accepted = notification.data.len();
    tracing::info!(
        subscription = %notification.subscription_id,
        entities = accepted,
        "notification received"
    );

    for entity in notification.data {
        let resolver = state.resolver.clone();
        tokio::spawn(async move {
            let id = entity.id.clone();
            match resolver.handle_project_notification(&entity).await {
                Ok(outcome) => tracing::debug!(id = %id, ?outcome, "resolution finished"),
                Err(e) => tracing::error!(id = %id, error = %e, "resolution aborted"),
            }
        });
    }

    Json(Accepted { accepted })
}

/// ERP stock-change webhook, refreshes the affected SKU
async fn odoo_webhook(
    State(state): State<ServerState>,
    Json(payload): Json<Value>,
) -> impl IntoResponse {
    if !state.config.webhook_enabled {
        return StatusCode::FORBIDDEN.into_response();
    }
    if payload.get("type").and_then(Value::as_str) != Some("stock_change") {
        tracing::debug!("webhook payload without stock_change type ignored");
        return Json(Accepted { accepted: 0 }).into_response();
    }

    let worker = state.inventory.clone();
    tokio::spawn(async move {
        worker.handle_stock_change(payload).await;
    });
    Json(Accepted { accepted: 1 }).into_response()
}
