//! Prometheus metrics
//!
//! Counter names are centralized here so handler code and the pipeline
//! increment the same series. `install` is a no-op failure at worst:
//! a second recorder in the process just means metrics stay with the
//! first one.

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

pub const NOTIFICATIONS_RECEIVED: &str = "bridge_notifications_received_total";
pub const NOTIFICATIONS_DEDUPED: &str = "bridge_notifications_deduped_total";
pub const RESERVATIONS_CREATED: &str = "bridge_reservations_created_total";
pub const SHORTAGES_CREATED: &str = "bridge_shortages_created_total";
pub const RESOLUTIONS_FAILED: &str = "bridge_resolutions_failed_total";
pub const INVENTORY_SYNC_RUNS: &str = "bridge_inventory_sync_runs_total";

/// Install the Prometheus recorder, returning the render handle
pub fn install() -> Option<PrometheusHandle> {
    match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => {
            describe();
            Some(handle)
        }
        Err(e) => {
            tracing::warn!(error = %e, "prometheus recorder not installed");
            None
        }
    }
}

fn describe() {
    metrics::describe_counter!(NOTIFICATIONS_RECEIVED, "Broker notifications received");
    metrics::describe_counter!(NOTIFICATIONS_DEDUPED, "Notifications dropped as unchanged");
    metrics::describe_counter!(RESERVATIONS_CREATED, "Reservation entities written");
    metrics::describe_counter!(SHORTAGES_CREATED, "Shortage entities written");
    metrics::describe_counter!(RESOLUTIONS_FAILED, "Resolutions ending in a data error");
    metrics::describe_counter!(INVENTORY_SYNC_RUNS, "Full inventory sync passes completed");
}

/// Increment a counter by one
pub fn counter(name: &'static str) {
    metrics::counter!(name).increment(1);
}
