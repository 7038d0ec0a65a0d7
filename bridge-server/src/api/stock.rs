//! Direct stock adjustments against the ERP

use axum::{Json, Router, extract::State, routing::post};
use serde::Deserialize;
use validator::Validate;

use crate::core::ServerState;
use crate::erp::StockMove;
use crate::utils::{AppError, AppResult};

pub fn router() -> Router<ServerState> {
    Router::new()
        .route("/stock/consume", post(consume))
        .route("/stock/produce", post(produce))
}

#[derive(Debug, Deserialize, Validate)]
struct StockAdjustment {
    #[validate(length(min = 1))]
    sku: String,
    #[validate(range(min = 1.0))]
    quantity: f64,
    #[serde(default)]
    location_id: Option<i64>,
    /// Traceability only, passed through to the logs
    #[serde(default, rename = "projectId")]
    project_id: Option<String>,
}

impl StockAdjustment {
    fn location(&self, state: &ServerState) -> i64 {
        self.location_id.unwrap_or(state.config.stock_location_id)
    }
}

/// Remove stock, floors at zero
async fn consume(
    State(state): State<ServerState>,
    Json(body): Json<StockAdjustment>,
) -> AppResult<Json<StockMove>> {
    body.validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;
    let location = body.location(&state);
    tracing::info!(
        sku = %body.sku,
        quantity = body.quantity,
        project_id = body.project_id.as_deref().unwrap_or("-"),
        "stock consume requested"
    );
    let result = state.erp.consume_stock(&body.sku, body.quantity, location).await?;

    // mirror the change into the broker right away
    refresh_inventory(&state, &body.sku).await;
    Ok(Json(result))
}

/// Add stock, creating the quant when the location has none
async fn produce(
    State(state): State<ServerState>,
    Json(body): Json<StockAdjustment>,
) -> AppResult<Json<StockMove>> {
    body.validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;
    let location = body.location(&state);
    tracing::info!(
        sku = %body.sku,
        quantity = body.quantity,
        project_id = body.project_id.as_deref().unwrap_or("-"),
        "stock produce requested"
    );
    let result = state.erp.produce_stock(&body.sku, body.quantity, location).await?;

    refresh_inventory(&state, &body.sku).await;
    Ok(Json(result))
}

async fn refresh_inventory(state: &ServerState, sku: &str) {
    if let Err(e) = state.inventory.sync_product_inventory(sku).await {
        tracing::warn!(sku, error = %e, "post-adjustment inventory refresh failed");
    }
}
