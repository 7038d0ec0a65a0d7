use std::time::Duration;

use crate::broker::BrokerClient;
use crate::erp::ErpClient;
use crate::inventory::SyncConfig;
use crate::pipeline::ResolverConfig;
use crate::resilience::{CircuitBreakerConfig, RetryPolicy};

/// Bridge configuration, loaded from the environment
///
/// | Environment variable | Default | Meaning |
/// |----------------------|---------|---------|
/// | HTTP_PORT | 8080 | HTTP API port |
/// | ERP_URL | http://localhost:8069 | ERP JSON-RPC base URL |
/// | ERP_DB | odoo | ERP database name |
/// | ERP_USER | admin | ERP login |
/// | ERP_PASSWORD | admin | ERP password |
/// | SKU_FIELD | default_code | Product field carrying the SKU |
/// | BROKER_URL | http://localhost:1026 | Context broker base URL |
/// | BROKER_TENANT | (unset) | Fiware-Service header |
/// | BROKER_SERVICE_PATH | (unset) | Fiware-ServicePath header |
/// | PUBLIC_URL | http://localhost:8080 | Externally reachable base URL for notifications |
/// | PROJECT_MAPPING_FILE | (unset) | JSON file mapping project codes to SKUs |
/// | INCLUDE_RESERVED_STOCK | true | Subtract reserved quantity from availability |
/// | STOCK_LOCATION_ID | 8 | Default location for direct stock adjustments |
/// | INVENTORY_SYNC_ENABLED | true | Run the periodic inventory sync |
/// | INVENTORY_SYNC_INTERVAL_SECONDS | 300 | Pause between sync passes |
/// | INVENTORY_SYNC_BATCH_SIZE | 50 | Products per sync batch |
/// | INVENTORY_ALLOWED_SKUS | (unset) | Comma separated SKU allowlist for the full sync |
/// | MAX_RETRIES | 3 | Retry attempts per upstream call |
/// | RETRY_BASE_DELAY_MS | 1000 | First retry backoff |
/// | CIRCUIT_BREAKER_THRESHOLD | 5 | Consecutive failures before the breaker opens |
/// | CIRCUIT_BREAKER_TIMEOUT_SECONDS | 60 | Open duration before a half-open probe |
/// | REQUEST_TIMEOUT_SECONDS | 30 | Per-request HTTP timeout |
/// | WEBHOOK_ENABLED | true | Accept ERP stock webhooks |
/// | LOG_LEVEL | info | Default tracing filter |
#[derive(Debug, Clone)]
pub struct Config {
    pub http_port: u16,

    pub erp_url: String,
    pub erp_db: String,
    pub erp_user: String,
    pub erp_password: String,
    pub sku_field: String,

    pub broker_url: String,
    pub broker_tenant: Option<String>,
    pub broker_service_path: Option<String>,
    pub public_url: String,

    pub project_mapping_file: Option<String>,
    pub include_reserved_stock: bool,
    pub stock_location_id: i64,

    pub inventory_sync_enabled: bool,
    pub inventory_sync_interval_seconds: u64,
    pub inventory_sync_batch_size: usize,
    pub inventory_allowed_skus: Option<Vec<String>>,

    pub max_retries: u32,
    pub retry_base_delay_ms: u64,
    pub circuit_breaker_threshold: u32,
    pub circuit_breaker_timeout_seconds: u64,
    pub request_timeout_seconds: u64,

    pub webhook_enabled: bool,
    pub log_level: String,
}

fn env_or<T: std::str::FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_opt(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

impl Config {
    /// Load from environment variables, falling back to defaults
    pub fn from_env() -> Self {
        Self {
            http_port: env_or("HTTP_PORT", 8080),

            erp_url: std::env::var("ERP_URL").unwrap_or_else(|_| "http://localhost:8069".into()),
            erp_db: std::env::var("ERP_DB").unwrap_or_else(|_| "odoo".into()),
            erp_user: std::env::var("ERP_USER").unwrap_or_else(|_| "admin".into()),
            erp_password: std::env::var("ERP_PASSWORD").unwrap_or_else(|_| "admin".into()),
            sku_field: std::env::var("SKU_FIELD").unwrap_or_else(|_| "default_code".into()),

            broker_url: std::env::var("BROKER_URL")
                .unwrap_or_else(|_| "http://localhost:1026".into()),
            broker_tenant: env_opt("BROKER_TENANT"),
            broker_service_path: env_opt("BROKER_SERVICE_PATH"),
            public_url: std::env::var("PUBLIC_URL")
                .unwrap_or_else(|_| "http://localhost:8080".into()),

            project_mapping_file: env_opt("PROJECT_MAPPING_FILE"),
            include_reserved_stock: env_or("INCLUDE_RESERVED_STOCK", true),
            stock_location_id: env_or("STOCK_LOCATION_ID", 8),

            inventory_sync_enabled: env_or("INVENTORY_SYNC_ENABLED", true),
            inventory_sync_interval_seconds: env_or("INVENTORY_SYNC_INTERVAL_SECONDS", 300),
            inventory_sync_batch_size: env_or("INVENTORY_SYNC_BATCH_SIZE", 50),
            inventory_allowed_skus: env_opt("INVENTORY_ALLOWED_SKUS").map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect()
            }),

            max_retries: env_or("MAX_RETRIES", 3),
            retry_base_delay_ms: env_or("RETRY_BASE_DELAY_MS", 1000),
            circuit_breaker_threshold: env_or("CIRCUIT_BREAKER_THRESHOLD", 5),
            circuit_breaker_timeout_seconds: env_or("CIRCUIT_BREAKER_TIMEOUT_SECONDS", 60),
            request_timeout_seconds: env_or("REQUEST_TIMEOUT_SECONDS", 30),

            webhook_enabled: env_or("WEBHOOK_ENABLED", true),
            log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".into()),
        }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_retries,
            base_delay: Duration::from_millis(self.retry_base_delay_ms),
            ..RetryPolicy::default()
        }
    }

    pub fn breaker_config(&self) -> CircuitBreakerConfig {
        CircuitBreakerConfig {
            failure_threshold: self.circuit_breaker_threshold,
            timeout: Duration::from_secs(self.circuit_breaker_timeout_seconds),
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }

    pub fn resolver_config(&self) -> ResolverConfig {
        ResolverConfig {
            include_reserved_stock: self.include_reserved_stock,
            project_mapping_file: self.project_mapping_file.clone(),
        }
    }

    pub fn sync_config(&self) -> SyncConfig {
        SyncConfig {
            interval: Duration::from_secs(self.inventory_sync_interval_seconds),
            batch_size: self.inventory_sync_batch_size,
            allowed_skus: self.inventory_allowed_skus.clone(),
        }
    }

    pub fn erp_client(&self) -> ErpClient {
        ErpClient::new(
            &self.erp_url,
            &self.erp_db,
            &self.erp_user,
            &self.erp_password,
            &self.sku_field,
            self.request_timeout(),
            self.breaker_config(),
            self.retry_policy(),
        )
    }

    pub fn broker_client(&self) -> BrokerClient {
        BrokerClient::new(
            &self.broker_url,
            self.broker_tenant.clone(),
            self.broker_service_path.clone(),
            self.request_timeout(),
            self.breaker_config(),
            self.retry_policy(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allowed_skus_parsing() {
        let raw = "LED-STRIP-24V, BRACKET-STEEL-001,,PSU-150W ";
        let skus: Vec<String> = raw
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();
        assert_eq!(skus, vec!["LED-STRIP-24V", "BRACKET-STEEL-001", "PSU-150W"]);
    }
}
