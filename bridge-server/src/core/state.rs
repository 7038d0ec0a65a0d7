use std::sync::Arc;

use metrics_exporter_prometheus::PrometheusHandle;
use tokio_util::sync::CancellationToken;

use crate::broker::BrokerClient;
use crate::core::Config;
use crate::erp::ErpClient;
use crate::inventory::InventorySyncWorker;
use crate::pipeline::{IdempotencyLedger, ProjectResolver};
use crate::utils::metrics;

/// Shared handles behind every request handler
///
/// Cloning is shallow: every service sits behind an `Arc`.
#[derive(Clone)]
pub struct ServerState {
    pub config: Arc<Config>,
    pub erp: Arc<ErpClient>,
    pub broker: Arc<BrokerClient>,
    pub ledger: Arc<IdempotencyLedger>,
    pub resolver: Arc<ProjectResolver>,
    pub inventory: Arc<InventorySyncWorker>,
    pub metrics: Option<PrometheusHandle>,
    pub shutdown: CancellationToken,
}

impl ServerState {
    /// Build every service from configuration
    pub fn initialize(config: Config) -> Self {
        let erp = Arc::new(config.erp_client());
        let broker = Arc::new(config.broker_client());
        let ledger = Arc::new(IdempotencyLedger::default());
        let resolver = Arc::new(ProjectResolver::new(
            erp.clone(),
            broker.clone(),
            ledger.clone(),
            config.resolver_config(),
        ));
        let inventory = Arc::new(InventorySyncWorker::new(
            erp.clone(),
            broker.clone(),
            config.sync_config(),
        ));

        Self {
            config: Arc::new(config),
            erp,
            broker,
            ledger,
            resolver,
            inventory,
            metrics: metrics::install(),
            shutdown: CancellationToken::new(),
        }
    }
}
