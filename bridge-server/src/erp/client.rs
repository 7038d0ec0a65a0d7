use std::time::Duration;

use parking_lot::RwLock;
use serde_json::{Value, json};

use crate::resilience::{CircuitBreaker, CircuitBreakerConfig, RetryPolicy};
use futures::FutureExt;

use super::{ErpError, ErpResult};

/// JSON-RPC client for the ERP
///
/// Authentication is lazy: the first `execute` obtains a uid and caches
/// it. A rejected session (401) clears the cache, re-authenticates and
/// replays the call once.
pub struct ErpClient {
    http: reqwest::Client,
    url: String,
    database: String,
    username: String,
    password: String,
    sku_field: String,
    uid: RwLock<Option<i64>>,
    breaker: CircuitBreaker,
    retry: RetryPolicy,
}

impl ErpClient {
    pub fn new(
        url: impl Into<String>,
        database: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
        sku_field: impl Into<String>,
        timeout: Duration,
        breaker_config: CircuitBreakerConfig,
        retry: RetryPolicy,
    ) -> Self {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_default();
        Self {
            http,
            url: url.into().trim_end_matches('/').to_string(),
            database: database.into(),
            username: username.into(),
            password: password.into(),
            sku_field: sku_field.into(),
            uid: RwLock::new(None),
            breaker: CircuitBreaker::new(breaker_config),
            retry,
        }
    }

    /// Field on `product.product` that carries the SKU
    pub fn sku_field(&self) -> &str {
        &self.sku_field
    }

    pub fn breaker_state(&self) -> crate::resilience::BreakerState {
        self.breaker.state()
    }

    /// One JSON-RPC round trip, gated by the circuit breaker
    async fn rpc_once(&self, service: &str, method: &str, args: Value) -> ErpResult<Value> {
        if !self.breaker.can_execute() {
            return Err(ErpError::CircuitOpen);
        }

        let envelope = json!({
            "jsonrpc": "2.0",
            "method": "call",
            "params": {
                "service": service,
                "method": method,
                "args": args,
            },
            "id": 1,
        });

        let response = self
            .http
            .post(format!("{}/jsonrpc", self.url))
            .json(&envelope)
            .send()
            .await
            .map_err(|e| {
                self.breaker.record_failure();
                ErpError::Connection(e.to_string())
            })?;

        let status = response.status();
        if status.as_u16() == 401 {
            return Err(ErpError::SessionExpired);
        }
        if !status.is_success() {
            self.breaker.record_failure();
            return Err(ErpError::Connection(format!("HTTP {status}")));
        }

        let body: Value = response.json().await.map_err(|e| {
            self.breaker.record_failure();
            ErpError::Connection(e.to_string())
        })?;

        self.breaker.record_success();
        decode_envelope(body)
    }

    /// JSON-RPC with the retry policy applied to transport failures
    async fn rpc(&self, service: &str, method: &str, args: Value) -> ErpResult<Value> {
        self.retry
            .run(
                &format!("erp {service}.{method}"),
                ErpError::is_retryable,
                || {
                    let args = args.clone();
                    async move { self.rpc_once(service, method, args).await }.boxed()
                },
            )
            .await
    }

    /// Authenticate and cache the uid
    pub async fn authenticate(&self) -> ErpResult<i64> {
        let result = self
            .rpc(
                "common",
                "authenticate",
                json!([self.database, self.username, self.password, {}]),
            )
            .await?;

        let uid = result
            .as_i64()
            .filter(|uid| *uid > 0)
            .ok_or_else(|| {
                ErpError::Authentication(format!("rejected credentials for {}", self.username))
            })?;

        tracing::info!(uid, database = %self.database, "authenticated against ERP");
        *self.uid.write() = Some(uid);
        Ok(uid)
    }

    async fn ensure_uid(&self) -> ErpResult<i64> {
        if let Some(uid) = *self.uid.read() {
            return Ok(uid);
        }
        self.authenticate().await
    }

    async fn execute_with_uid(
        &self,
        uid: i64,
        model: &str,
        method: &str,
        args: Value,
        kwargs: Value,
    ) -> ErpResult<Value> {
        self.rpc(
            "object",
            "execute_kw",
            json!([self.database, uid, self.password, model, method, args, kwargs]),
        )
        .await
    }

    /// Model method call; a rejected session is replayed once after
    /// re-authentication
    pub async fn execute(
        &self,
        model: &str,
        method: &str,
        args: Value,
        kwargs: Value,
    ) -> ErpResult<Value> {
        let uid = self.ensure_uid().await?;
        match self
            .execute_with_uid(uid, model, method, args.clone(), kwargs.clone())
            .await
        {
            Err(ErpError::SessionExpired) => {
                tracing::warn!(model, method, "ERP session rejected, re-authenticating");
                *self.uid.write() = None;
                let uid = self.authenticate().await?;
                self.execute_with_uid(uid, model, method, args, kwargs).await
            }
            other => other,
        }
    }

    pub async fn search_read(
        &self,
        model: &str,
        domain: &super::Domain,
        fields: &[&str],
        limit: Option<u32>,
    ) -> ErpResult<Vec<Value>> {
        let mut kwargs = json!({ "fields": fields });
        if let Some(limit) = limit {
            kwargs["limit"] = json!(limit);
        }
        let result = self
            .execute(model, "search_read", json!([domain]), kwargs)
            .await?;
        serde_json::from_value(result).map_err(|e| ErpError::Decode(e.to_string()))
    }

    pub async fn read(&self, model: &str, ids: &[i64], fields: &[&str]) -> ErpResult<Vec<Value>> {
        let result = self
            .execute(model, "read", json!([ids]), json!({ "fields": fields }))
            .await?;
        serde_json::from_value(result).map_err(|e| ErpError::Decode(e.to_string()))
    }

    pub async fn create(&self, model: &str, values: Value) -> ErpResult<i64> {
        let result = self.execute(model, "create", json!([values]), json!({})).await?;
        result
            .as_i64()
            .ok_or_else(|| ErpError::Decode(format!("create returned non-id: {result}")))
    }

    pub async fn write(&self, model: &str, ids: &[i64], values: Value) -> ErpResult<bool> {
        let result = self
            .execute(model, "write", json!([ids, values]), json!({}))
            .await?;
        Ok(result.as_bool().unwrap_or(false))
    }

    pub async fn unlink(&self, model: &str, ids: &[i64]) -> ErpResult<bool> {
        let result = self.execute(model, "unlink", json!([ids]), json!({})).await?;
        Ok(result.as_bool().unwrap_or(false))
    }

    /// Reachability probe — never errors, used by the readiness route
    pub async fn health_check(&self) -> bool {
        match self.rpc_once("common", "version", json!([])).await {
            Ok(_) => true,
            Err(e) => {
                tracing::debug!(error = %e, "ERP health check failed");
                false
            }
        }
    }
}

/// Unwrap a JSON-RPC envelope into its result, or an API fault
fn decode_envelope(body: Value) -> ErpResult<Value> {
    if let Some(error) = body.get("error") {
        let message = error
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or("unknown ERP fault")
            .to_string();
        let fault_code = error.get("code").and_then(Value::as_i64);
        let fault_string = error
            .get("data")
            .and_then(|d| d.get("fault_string").or_else(|| d.get("message")))
            .and_then(Value::as_str)
            .map(str::to_string);
        return Err(ErpError::Api {
            message,
            fault_code,
            fault_string,
        });
    }
    body.get("result")
        .cloned()
        .ok_or_else(|| ErpError::Decode("envelope without result or error".into()))
}
