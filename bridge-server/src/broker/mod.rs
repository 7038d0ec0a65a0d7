//! Context broker gateway — NGSI-LD REST client
//!
//! Status handling is uniform across calls: 2xx with a body parses,
//! 204 is success without content, 404 means the entity is absent
//! (not an error) and 409 is a soft create conflict.

mod client;
mod subscriptions;

pub use client::{BrokerClient, EntityQuery};
pub use subscriptions::SubscriptionSpec;

use thiserror::Error;

/// Context broker error type
#[derive(Debug, Error)]
pub enum BrokerError {
    /// Transport failure — retryable
    #[error("broker connection error: {0}")]
    Connection(String),

    /// The broker rejected the call
    #[error("broker API error ({status}): {body}")]
    Api { status: u16, body: String },

    /// Circuit breaker is open, call rejected without a network attempt
    #[error("broker circuit breaker is open")]
    CircuitOpen,

    /// Response body did not match the expected shape
    #[error("broker response decode error: {0}")]
    Decode(String),
}

impl BrokerError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, BrokerError::Connection(_))
    }
}

pub type BrokerResult<T> = Result<T, BrokerError>;

/// Decoded broker response, wire status already interpreted
#[derive(Debug)]
pub(crate) enum BrokerResponse {
    Body(serde_json::Value),
    NoContent,
    NotFound,
    Conflict,
}

/// How a create attempt landed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreateOutcome {
    Created,
    /// The entity already existed; not an error
    Conflict,
}

/// How an upsert landed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Created,
    Updated,
}
