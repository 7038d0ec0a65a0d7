//! Inventory sync worker
//!
//! Periodically mirrors ERP stock into broker InventoryItem entities.
//! The full sync is authoritative: it overwrites whatever opportunistic
//! projections the resolution pipeline wrote since the last pass,
//! including products whose stock dropped to zero.

use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use shared::ngsi::InventoryItem;

use crate::broker::{BrokerClient, BrokerError};
use crate::erp::{ErpClient, ErpError};
use crate::utils::metrics;

/// Pause between batches, keeps bulk syncs from saturating the broker
const BATCH_PAUSE: Duration = Duration::from_millis(100);

/// Backoff after a failed sync pass before rescheduling
const ERROR_BACKOFF: Duration = Duration::from_secs(60);

#[derive(Debug, Error)]
pub enum SyncError {
    #[error(transparent)]
    Erp(#[from] ErpError),
    #[error(transparent)]
    Broker(#[from] BrokerError),
}

#[derive(Debug, Clone)]
pub struct SyncConfig {
    pub interval: Duration,
    pub batch_size: usize,
    /// Restrict the full sync to these SKUs when set
    pub allowed_skus: Option<Vec<String>>,
}

/// Outcome of one full sync pass
#[derive(Debug, Clone, Default, Serialize)]
pub struct SyncReport {
    pub processed: usize,
    pub updated: usize,
    pub errors: usize,
    pub duration_ms: u64,
}

/// Worker status as reported by the admin API
#[derive(Debug, Clone, Serialize)]
pub struct SyncStatus {
    pub running: bool,
    #[serde(rename = "lastSyncTime")]
    pub last_sync_time: Option<String>,
    #[serde(rename = "nextSyncDue")]
    pub next_sync_due: Option<String>,
    #[serde(rename = "intervalSeconds")]
    pub interval_seconds: u64,
    #[serde(rename = "batchSize")]
    pub batch_size: usize,
    #[serde(rename = "lastReport")]
    pub last_report: Option<SyncReport>,
}

/// ERP webhook payload for a single stock movement
///
/// `product_id` and `sku` are both required; payloads missing either
/// are dropped.
#[derive(Debug, Deserialize)]
pub struct StockChange {
    pub product_id: i64,
    pub sku: String,
    #[serde(default)]
    pub quantity: Option<f64>,
}

#[derive(Default)]
struct WorkerState {
    running: bool,
    last_sync_at: Option<chrono::DateTime<chrono::Utc>>,
    last_report: Option<SyncReport>,
}

pub struct InventorySyncWorker {
    erp: Arc<ErpClient>,
    broker: Arc<BrokerClient>,
    config: SyncConfig,
    state: Mutex<WorkerState>,
}

impl InventorySyncWorker {
    pub fn new(erp: Arc<ErpClient>, broker: Arc<BrokerClient>, config: SyncConfig) -> Self {
        Self {
            erp,
            broker,
            config,
            state: Mutex::new(WorkerState::default()),
        }
    }

    /// Periodic sync loop, runs until the token is cancelled
    pub async fn run(self: Arc<Self>, shutdown: CancellationToken) {
        tracing::info!(
            interval_secs = self.config.interval.as_secs(),
            batch_size = self.config.batch_size,
            "inventory sync worker started"
        );
        self.state.lock().running = true;

        loop {
            let pause = tokio::select! {
                _ = shutdown.cancelled() => break,
                result = self.sync_inventory() => match result {
                    Ok(report) => {
                        tracing::info!(
                            processed = report.processed,
                            updated = report.updated,
                            errors = report.errors,
                            duration_ms = report.duration_ms,
                            "inventory sync pass complete"
                        );
                        self.config.interval
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "inventory sync pass failed");
                        ERROR_BACKOFF
                    }
                },
            };

            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = tokio::time::sleep(pause) => {}
            }
        }

        self.state.lock().running = false;
        tracing::info!("inventory sync worker stopped");
    }

    /// Full sync: every eligible product, batched, zero stock included
    pub async fn sync_inventory(&self) -> Result<SyncReport, SyncError> {
        let started = Instant::now();
        let products = self
            .erp
            .eligible_products(self.config.allowed_skus.as_deref())
            .await?;

        let mut report = SyncReport::default();
        let mut batches = products.chunks(self.config.batch_size.max(1)).peekable();
        while let Some(batch) = batches.next() {
            let ids: Vec<i64> = batch.iter().map(|p| p.id).collect();
            let stock = self.erp.stock_for_products(&ids).await?;

            for product in batch {
                let Some(sku) = product.sku.as_deref() else {
                    continue;
                };
                report.processed += 1;
                // absent from the quant map means zero on hand
                let product_stock = stock.get(&product.id).copied().unwrap_or_default();
                let item = InventoryItem::entity(
                    sku,
                    (product_stock.quantity - product_stock.reserved).max(0.0),
                    product_stock.reserved,
                    None,
                );
                match self.broker.upsert_entity(&item).await {
                    Ok(_) => report.updated += 1,
                    Err(e) => {
                        report.errors += 1;
                        tracing::warn!(sku, error = %e, "inventory item update failed");
                    }
                }
            }
            // pause between batches only, not after the last one
            if batches.peek().is_some() {
                tokio::time::sleep(BATCH_PAUSE).await;
            }
        }

        report.duration_ms = started.elapsed().as_millis() as u64;
        metrics::counter(metrics::INVENTORY_SYNC_RUNS);

        let mut state = self.state.lock();
        state.last_sync_at = Some(chrono::Utc::now());
        state.last_report = Some(report.clone());
        Ok(report)
    }

    /// Targeted refresh of one SKU; `None` when the ERP does not know it
    pub async fn sync_product_inventory(&self, sku: &str) -> Result<Option<SyncReport>, SyncError> {
        let started = Instant::now();
        let Some(product) = self.erp.product_by_sku(sku).await? else {
            return Ok(None);
        };

        let stock = self.erp.stock_for_products(&[product.id]).await?;
        let product_stock = stock.get(&product.id).copied().unwrap_or_default();
        let item = InventoryItem::entity(
            sku,
            (product_stock.quantity - product_stock.reserved).max(0.0),
            product_stock.reserved,
            None,
        );
        self.broker.upsert_entity(&item).await?;

        tracing::info!(sku, quantity = product_stock.quantity, "inventory item refreshed");
        Ok(Some(SyncReport {
            processed: 1,
            updated: 1,
            errors: 0,
            duration_ms: started.elapsed().as_millis() as u64,
        }))
    }

    /// ERP stock-change webhook: refresh the affected product
    ///
    /// Keyed by the supplied product id + SKU pair; payloads missing
    /// either are dropped with a warning and left for the periodic
    /// sync to repair.
    pub async fn handle_stock_change(&self, payload: serde_json::Value) {
        let change: StockChange = match serde_json::from_value(payload) {
            Ok(change) => change,
            Err(e) => {
                tracing::warn!(error = %e, "malformed stock change payload dropped");
                return;
            }
        };
        if change.sku.is_empty() {
            tracing::warn!(product_id = change.product_id, "stock change without SKU dropped");
            return;
        }

        let stock = match self.erp.stock_for_products(&[change.product_id]).await {
            Ok(stock) => stock,
            Err(e) => {
                tracing::error!(sku = %change.sku, error = %e, "stock change sync failed");
                return;
            }
        };
        let product_stock = stock.get(&change.product_id).copied().unwrap_or_default();
        let item = InventoryItem::entity(
            &change.sku,
            (product_stock.quantity - product_stock.reserved).max(0.0),
            product_stock.reserved,
            None,
        );
        if let Err(e) = self.broker.upsert_entity(&item).await {
            tracing::error!(sku = %change.sku, error = %e, "stock change sync failed");
        }
    }

    pub fn status(&self) -> SyncStatus {
        let state = self.state.lock();
        let iso = |t: &chrono::DateTime<chrono::Utc>| {
            t.to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
        };
        SyncStatus {
            running: state.running,
            last_sync_time: state.last_sync_at.as_ref().map(iso),
            next_sync_due: state.last_sync_at.as_ref().map(|t| {
                iso(&(*t + chrono::Duration::from_std(self.config.interval)
                    .unwrap_or_else(|_| chrono::Duration::seconds(300))))
            }),
            interval_seconds: self.config.interval.as_secs(),
            batch_size: self.config.batch_size,
            last_report: state.last_report.clone(),
        }
    }
}
