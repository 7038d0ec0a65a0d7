//! ERP gateway — JSON-RPC client for the manufacturing system of record
//!
//! One authenticated channel for products, bills of materials and
//! stock. Every call goes through the circuit breaker and the retry
//! policy; the error taxonomy separates transport failures (retryable)
//! from rejected credentials and application-level faults (not).

mod client;
mod domain;
mod ops;
mod records;

pub use client::ErpClient;
pub use domain::{Condition, Domain, eq, is_in, ne, not_in};
pub use ops::{ProductStock, StockMove};
pub use records::{BomLineRecord, BomRecord, ManyToOne, ProductRecord, StockQuant};

use thiserror::Error;

/// ERP gateway error type
#[derive(Debug, Error)]
pub enum ErpError {
    /// Credentials rejected — re-authentication with the same
    /// credentials will not help
    #[error("ERP authentication failed: {0}")]
    Authentication(String),

    /// Transport failure (connect, timeout, non-2xx) — retryable
    #[error("ERP connection error: {0}")]
    Connection(String),

    /// The ERP rejected the call at the application level
    #[error("ERP API error: {message}")]
    Api {
        message: String,
        fault_code: Option<i64>,
        fault_string: Option<String>,
    },

    /// Cached session was rejected (401); the client re-authenticates
    /// and replays the call once before surfacing this
    #[error("ERP session rejected")]
    SessionExpired,

    /// Circuit breaker is open, call rejected without a network attempt
    #[error("ERP circuit breaker is open")]
    CircuitOpen,

    /// Response did not match the expected shape
    #[error("ERP response decode error: {0}")]
    Decode(String),
}

impl ErpError {
    /// Only transport-class failures are worth retrying
    pub fn is_retryable(&self) -> bool {
        matches!(self, ErpError::Connection(_))
    }
}

pub type ErpResult<T> = Result<T, ErpError>;
