//! Project resolution pipeline: idempotency gate, BOM traversal and
//! the all-or-nothing reservation-or-shortage decision.

mod ledger;
mod resolver;

pub use ledger::IdempotencyLedger;
pub use resolver::{Outcome, PipelineError, ProjectResolver, ResolverConfig, SkipReason};
