//! ERP / context-broker bridge server
//!
//! Reacts to Project change notifications from an NGSI-LD context
//! broker, resolves the project's bill of materials and stock in the
//! ERP, and publishes a Reservation or Shortage entity back to the
//! broker. A background worker reconciles inventory levels on a timer.
//!
//! # Module structure
//!
//! ```text
//! bridge-server/src/
//! ├── core/          # config, shared state, HTTP server
//! ├── resilience/    # circuit breaker, retry policy
//! ├── erp/           # ERP JSON-RPC gateway
//! ├── broker/        # NGSI-LD REST gateway
//! ├── pipeline/      # idempotency ledger + resolution pipeline
//! ├── inventory/     # inventory reconciliation worker
//! ├── api/           # HTTP routes and handlers
//! └── utils/         # errors, logging, metrics
//! ```

pub mod api;
pub mod broker;
pub mod core;
pub mod erp;
pub mod inventory;
pub mod pipeline;
pub mod resilience;
pub mod utils;

// Re-export public types
pub use broker::BrokerClient;
pub use crate::core::{Config, Server, ServerState};
pub use erp::ErpClient;
pub use inventory::InventorySyncWorker;
pub use pipeline::{IdempotencyLedger, Outcome, ProjectResolver};
pub use resilience::{CircuitBreaker, RetryPolicy};
pub use utils::{AppError, AppResult};
