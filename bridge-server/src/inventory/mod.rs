//! Periodic inventory reconciliation between the ERP and the broker.

mod worker;

pub use worker::{InventorySyncWorker, StockChange, SyncConfig, SyncError, SyncReport, SyncStatus};
