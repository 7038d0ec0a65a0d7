//! Admin routes: forced recompute, inventory sync control and the
//! idempotency ledger.

use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{delete, get, post},
};
use serde::{Deserialize, Serialize};
use shared::ngsi::{self, Project, Property};
use validator::Validate;

use crate::core::ServerState;
use crate::inventory::{SyncReport, SyncStatus};
use crate::pipeline::Outcome;
use crate::utils::{AppError, AppResult};

pub fn router() -> Router<ServerState> {
    Router::new()
        .route("/admin/recompute/{project_id}", post(recompute))
        .route("/admin/inventory/sync", post(inventory_sync))
        .route("/admin/inventory/sync/{sku}", post(inventory_sync_sku))
        .route("/admin/inventory/status", get(inventory_status))
        .route("/admin/idempotency/{project_id}", delete(clear_idempotency))
        .route("/admin/idempotency", delete(clear_all_idempotency))
}

#[derive(Debug, Deserialize, Validate)]
struct RecomputeBody {
    code: String,
    #[serde(default)]
    station: Option<String>,
    #[validate(range(min = 0.0))]
    #[serde(default)]
    quantity: Option<f64>,
}

/// Force a resolution for one project
///
/// With a body the project is synthesized from it; without one the
/// current entity is fetched from the broker. Either way the ledger
/// entry is dropped first so the pipeline cannot skip the run.
async fn recompute(
    State(state): State<ServerState>,
    Path(project_id): Path<String>,
    body: Option<Json<RecomputeBody>>,
) -> AppResult<Json<Outcome>> {
    let entity = match body {
        Some(Json(body)) => {
            body.validate()
                .map_err(|e| AppError::Validation(e.to_string()))?;
            Project::entity(
                &project_id,
                &body.code,
                "requested",
                body.station.as_deref(),
                body.quantity,
            )
        }
        None => {
            let urn = ngsi::project_urn(&project_id);
            let mut entity = state
                .broker
                .get_entity(&urn)
                .await
                .map_err(AppError::from)?
                .ok_or_else(|| AppError::NotFound(format!("project {project_id}")))?;
            // force the pipeline to treat it as actionable
            entity.set_property("status", Property::new("requested"));
            entity
        }
    };

    state.ledger.clear(&format!("project:{project_id}"));
    let outcome = state
        .resolver
        .handle_project_notification(&entity)
        .await
        .map_err(AppError::from)?;
    Ok(Json(outcome))
}

/// Run a full inventory sync pass now
async fn inventory_sync(State(state): State<ServerState>) -> AppResult<Json<SyncReport>> {
    let report = state.inventory.sync_inventory().await?;
    Ok(Json(report))
}

/// Refresh one SKU
async fn inventory_sync_sku(
    State(state): State<ServerState>,
    Path(sku): Path<String>,
) -> AppResult<Json<SyncReport>> {
    let report = state
        .inventory
        .sync_product_inventory(&sku)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("SKU {sku}")))?;
    Ok(Json(report))
}

async fn inventory_status(State(state): State<ServerState>) -> Json<SyncStatus> {
    Json(state.inventory.status())
}

#[derive(Serialize)]
struct ClearedResponse {
    cleared: usize,
}

async fn clear_idempotency(
    State(state): State<ServerState>,
    Path(project_id): Path<String>,
) -> AppResult<Json<ClearedResponse>> {
    if state.ledger.clear(&format!("project:{project_id}")) {
        Ok(Json(ClearedResponse { cleared: 1 }))
    } else {
        Err(AppError::NotFound(format!(
            "no ledger entry for project {project_id}"
        )))
    }
}

async fn clear_all_idempotency(State(state): State<ServerState>) -> Json<ClearedResponse> {
    Json(ClearedResponse {
        cleared: state.ledger.clear_all(),
    })
}
