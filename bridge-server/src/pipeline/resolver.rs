use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use serde_json::json;
use shared::ngsi::{
    self, Entity, InventoryItem, ProjectStatus, Property, Reservation, ReservationLine, Shortage,
    ShortageLine,
};
use thiserror::Error;

use crate::broker::{BrokerClient, BrokerError, SubscriptionSpec};
use crate::erp::{ErpClient, ErpError, ProductRecord};
use crate::utils::metrics;

use super::IdempotencyLedger;

/// Failures that abort a resolution before an outcome is reached
///
/// Upstream transport errors land here so the broker redelivers the
/// notification later. Data problems (missing product, empty BOM) are
/// terminal and become `Outcome::Error` instead.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Erp(#[from] ErpError),
    #[error(transparent)]
    Broker(#[from] BrokerError),
}

/// Why a notification was dropped without resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    NotProject,
    StatusIgnored,
    Unchanged,
}

/// Terminal outcome of one resolution
#[derive(Debug, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Outcome {
    Reservation { lines: Vec<ReservationLine> },
    Shortage { lines: Vec<ShortageLine> },
    Error { message: String },
    Skipped { reason: SkipReason },
}

#[derive(Debug, Clone)]
pub struct ResolverConfig {
    /// Subtract the ERP's reserved quantity when computing availability
    pub include_reserved_stock: bool,
    /// Optional JSON file mapping project codes to SKUs
    pub project_mapping_file: Option<String>,
}

/// Resolves a Project notification into a Reservation or a Shortage
pub struct ProjectResolver {
    erp: Arc<ErpClient>,
    broker: Arc<BrokerClient>,
    ledger: Arc<IdempotencyLedger>,
    config: ResolverConfig,
}

impl ProjectResolver {
    pub fn new(
        erp: Arc<ErpClient>,
        broker: Arc<BrokerClient>,
        ledger: Arc<IdempotencyLedger>,
        config: ResolverConfig,
    ) -> Self {
        Self {
            erp,
            broker,
            ledger,
            config,
        }
    }

    /// Run one Project notification through the pipeline
    pub async fn handle_project_notification(
        &self,
        entity: &Entity,
    ) -> Result<Outcome, PipelineError> {
        if !entity.is_type("Project") {
            return Ok(Outcome::Skipped {
                reason: SkipReason::NotProject,
            });
        }

        let project_id = entity.local_id().to_string();
        let status = entity
            .property_str("status")
            .map(ProjectStatus::parse)
            .unwrap_or(ProjectStatus::Other(String::new()));
        if status != ProjectStatus::Requested {
            tracing::debug!(%project_id, status = %status, "status not actionable, skipping");
            return Ok(Outcome::Skipped {
                reason: SkipReason::StatusIgnored,
            });
        }

        let ledger_key = format!("project:{project_id}");
        let payload = serde_json::to_value(entity).unwrap_or_default();
        if !self.ledger.should_process(&ledger_key, &payload) {
            tracing::info!(%project_id, "payload unchanged, skipping");
            metrics::counter(metrics::NOTIFICATIONS_DEDUPED);
            return Ok(Outcome::Skipped {
                reason: SkipReason::Unchanged,
            });
        }

        let outcome = self.resolve(entity, &project_id).await?;
        self.ledger.mark_processed(
            &ledger_key,
            &payload,
            serde_json::to_value(&outcome).unwrap_or_default(),
        );
        Ok(outcome)
    }

    async fn resolve(&self, entity: &Entity, project_id: &str) -> Result<Outcome, PipelineError> {
        let Some(code) = entity.property_str("code") else {
            return Ok(self.fail(project_id, "project has no code attribute"));
        };

        let Some(product) = self.resolve_product(code).await? else {
            return Ok(self.fail(project_id, &format!("no product for code: {code}")));
        };

        let Some(bom) = self.erp.bom_for_product(product.id).await? else {
            return Ok(self.fail(project_id, &format!("no BOM for product: {}", product.name)));
        };

        if bom.bom_line_ids.is_empty() {
            return Ok(self.fail(project_id, &format!("BOM {} has no lines", bom.id)));
        }

        let lines = self.erp.bom_lines(&bom.bom_line_ids).await?;
        let lines: Vec<_> = lines
            .into_iter()
            .filter(|line| line.product_qty > 0.0)
            .collect();
        if lines.is_empty() {
            return Ok(self.fail(project_id, &format!("BOM {} has no valid lines", bom.id)));
        }

        let quantity = entity.property_f64("quantity").unwrap_or(1.0);
        let component_ids: Vec<i64> = lines.iter().map(|l| l.product_id.id()).collect();
        let stock = self.erp.stock_for_products(&component_ids).await?;
        let products = self.erp.products_by_ids(&component_ids).await?;

        let mut reservation_lines = Vec::new();
        let mut shortage_lines = Vec::new();
        for line in &lines {
            let component_id = line.product_id.id();
            let sku = component_sku(&products, component_id);
            let required = line.product_qty * quantity;
            let component_stock = stock.get(&component_id).copied().unwrap_or_default();
            let available = component_stock.available(self.config.include_reserved_stock);

            if available >= required {
                reservation_lines.push(ReservationLine::new(&sku, required));
                // post-allocation projection, reconciled by the sync worker
                let item = InventoryItem::entity(
                    &sku,
                    available - required,
                    component_stock.reserved + required,
                    None,
                );
                if let Err(e) = self.broker.upsert_entity(&item).await {
                    tracing::warn!(sku = %sku, error = %e, "inventory projection failed");
                }
            } else {
                shortage_lines.push(ShortageLine::new(
                    &sku,
                    required - available,
                    required,
                    available,
                ));
            }
        }

        if shortage_lines.is_empty() {
            self.broker
                .upsert_entity(&Reservation::entity(project_id, &reservation_lines))
                .await?;
            self.set_project_status(project_id, ProjectStatus::Processing).await;
            metrics::counter(metrics::RESERVATIONS_CREATED);
            tracing::info!(
                project_id,
                lines = reservation_lines.len(),
                "reservation created"
            );
            Ok(Outcome::Reservation {
                lines: reservation_lines,
            })
        } else {
            self.broker
                .upsert_entity(&Shortage::entity(project_id, &shortage_lines))
                .await?;
            self.set_project_status(project_id, ProjectStatus::Shortage).await;
            metrics::counter(metrics::SHORTAGES_CREATED);
            tracing::info!(project_id, lines = shortage_lines.len(), "shortage created");
            Ok(Outcome::Shortage {
                lines: shortage_lines,
            })
        }
    }

    /// Register the Project change subscription with the broker
    ///
    /// Idempotent: an existing subscription under the same URN is
    /// left in place. Returns whether a new one was created.
    pub async fn setup_subscription(&self, public_url: &str) -> Result<bool, PipelineError> {
        let spec = SubscriptionSpec {
            id: ngsi::subscription_urn("bridge-project"),
            description: "Project changes for the ERP bridge".into(),
            entity_type: "Project".into(),
            watched_attributes: vec!["status".into(), "code".into(), "quantity".into()],
            endpoint: format!("{}/orion/notifications", public_url.trim_end_matches('/')),
        };
        Ok(self.broker.ensure_subscription(&spec).await?)
    }

    /// SKU lookup, falling back to the project mapping file
    async fn resolve_product(&self, code: &str) -> Result<Option<ProductRecord>, PipelineError> {
        if let Some(product) = self.erp.product_by_sku(code).await? {
            return Ok(Some(product));
        }
        let Some(sku) = self.mapped_sku(code).await else {
            return Ok(None);
        };
        tracing::debug!(code, sku = %sku, "project code mapped to SKU");
        Ok(self.erp.product_by_sku(&sku).await?)
    }

    /// Look up a code in the mapping file, if one is configured
    async fn mapped_sku(&self, code: &str) -> Option<String> {
        let path = self.config.project_mapping_file.as_ref()?;
        let raw = match tokio::fs::read_to_string(path).await {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!(path = %path, error = %e, "project mapping file unreadable");
                return None;
            }
        };
        let mapping: HashMap<String, String> = match serde_json::from_str(&raw) {
            Ok(mapping) => mapping,
            Err(e) => {
                tracing::warn!(path = %path, error = %e, "project mapping file is not a JSON object");
                return None;
            }
        };
        mapping.get(code).cloned()
    }

    fn fail(&self, project_id: &str, message: &str) -> Outcome {
        tracing::error!(project_id, message, "resolution failed");
        metrics::counter(metrics::RESOLUTIONS_FAILED);
        Outcome::Error {
            message: message.to_string(),
        }
    }

    /// Best-effort status advance on the Project entity
    async fn set_project_status(&self, project_id: &str, status: ProjectStatus) {
        let attrs = json!({
            "status": Property::new(status.as_str()),
            "@context": ngsi::default_context(),
        });
        let urn = ngsi::project_urn(project_id);
        if let Err(e) = self.broker.update_entity(&urn, attrs).await {
            tracing::warn!(project_id, status = %status, error = %e, "project status update failed");
        }
    }
}

fn component_sku(products: &HashMap<i64, ProductRecord>, component_id: i64) -> String {
    products
        .get(&component_id)
        .and_then(|p| p.sku.clone())
        .unwrap_or_else(|| format!("PRODUCT_{component_id}"))
}
