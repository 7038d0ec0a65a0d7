use std::time::Duration;

use futures::FutureExt;
use reqwest::Method;
use serde_json::Value;
use shared::ngsi::Entity;

use crate::resilience::{CircuitBreaker, CircuitBreakerConfig, RetryPolicy};

use super::{BrokerError, BrokerResponse, BrokerResult, CreateOutcome, UpsertOutcome};

const LD_JSON: &str = "application/ld+json";

/// NGSI-LD entity query parameters
#[derive(Debug, Default, Clone)]
pub struct EntityQuery {
    pub entity_type: Option<String>,
    pub id_pattern: Option<String>,
    pub q: Option<String>,
    pub attrs: Option<String>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

impl EntityQuery {
    pub fn of_type(entity_type: impl Into<String>) -> Self {
        Self {
            entity_type: Some(entity_type.into()),
            ..Self::default()
        }
    }

    fn to_params(&self) -> Vec<(&'static str, String)> {
        let mut params = Vec::new();
        if let Some(t) = &self.entity_type {
            params.push(("type", t.clone()));
        }
        if let Some(p) = &self.id_pattern {
            params.push(("idPattern", p.clone()));
        }
        if let Some(q) = &self.q {
            params.push(("q", q.clone()));
        }
        if let Some(a) = &self.attrs {
            params.push(("attrs", a.clone()));
        }
        if let Some(l) = self.limit {
            params.push(("limit", l.to_string()));
        }
        if let Some(o) = self.offset {
            params.push(("offset", o.to_string()));
        }
        params
    }
}

/// REST client for the context broker
pub struct BrokerClient {
    http: reqwest::Client,
    base_url: String,
    tenant: Option<String>,
    service_path: Option<String>,
    breaker: CircuitBreaker,
    retry: RetryPolicy,
}

impl BrokerClient {
    pub fn new(
        base_url: impl Into<String>,
        tenant: Option<String>,
        service_path: Option<String>,
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
            base_url: base_url.into().trim_end_matches('/').to_string(),
            tenant,
            service_path,
            breaker: CircuitBreaker::new(breaker_config),
            retry,
        }
    }

    pub fn breaker_state(&self) -> crate::resilience::BreakerState {
        self.breaker.state()
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// One HTTP round trip, gated by the circuit breaker
    async fn request_once(
        &self,
        method: Method,
        path: &str,
        params: &[(&str, String)],
        body: Option<&Value>,
    ) -> BrokerResult<BrokerResponse> {
        if !self.breaker.can_execute() {
            return Err(BrokerError::CircuitOpen);
        }

        let mut request = self
            .http
            .request(method, self.url(path))
            .header("Accept", LD_JSON);
        if !params.is_empty() {
            request = request.query(params);
        }
        if let Some(tenant) = &self.tenant {
            request = request.header("Fiware-Service", tenant);
        }
        if let Some(service_path) = &self.service_path {
            request = request.header("Fiware-ServicePath", service_path);
        }
        if let Some(body) = body {
            request = request.header("Content-Type", LD_JSON).json(body);
        }

        let response = request.send().await.map_err(|e| {
            self.breaker.record_failure();
            BrokerError::Connection(e.to_string())
        })?;

        let status = response.status();
        match status.as_u16() {
            204 => {
                self.breaker.record_success();
                Ok(BrokerResponse::NoContent)
            }
            404 => {
                self.breaker.record_success();
                Ok(BrokerResponse::NotFound)
            }
            409 => {
                self.breaker.record_success();
                Ok(BrokerResponse::Conflict)
            }
            code if status.is_success() => {
                self.breaker.record_success();
                if code == 201 {
                    return Ok(BrokerResponse::NoContent);
                }
                let body: Value = response.json().await.map_err(|e| {
                    BrokerError::Decode(e.to_string())
                })?;
                Ok(BrokerResponse::Body(body))
            }
            code if status.is_server_error() => {
                self.breaker.record_failure();
                let body = response.text().await.unwrap_or_default();
                Err(BrokerError::Api { status: code, body })
            }
            code => {
                let body = response.text().await.unwrap_or_default();
                Err(BrokerError::Api { status: code, body })
            }
        }
    }

    pub(super) async fn request(
        &self,
        method: Method,
        path: &str,
        params: Vec<(&str, String)>,
        body: Option<Value>,
    ) -> BrokerResult<BrokerResponse> {
        self.retry
            .run(
                &format!("broker {method} {path}"),
                BrokerError::is_retryable,
                || {
                    let method = method.clone();
                    let params = &params;
                    let body = body.as_ref();
                    async move { self.request_once(method, path, params, body).await }.boxed()
                },
            )
            .await
    }

    /// Create an entity; an existing entity is a soft conflict
    pub async fn create_entity(&self, entity: &Entity) -> BrokerResult<CreateOutcome> {
        let body = serde_json::to_value(entity).map_err(|e| BrokerError::Decode(e.to_string()))?;
        match self
            .request(Method::POST, "ngsi-ld/v1/entities", Vec::new(), Some(body))
            .await?
        {
            BrokerResponse::Conflict => {
                tracing::debug!(id = %entity.id, "entity already exists");
                Ok(CreateOutcome::Conflict)
            }
            _ => Ok(CreateOutcome::Created),
        }
    }

    /// Fetch one entity; absence is `None`, not an error
    pub async fn get_entity(&self, id: &str) -> BrokerResult<Option<Entity>> {
        let path = format!("ngsi-ld/v1/entities/{id}");
        match self.request(Method::GET, &path, Vec::new(), None).await? {
            BrokerResponse::Body(body) => serde_json::from_value(body)
                .map(Some)
                .map_err(|e| BrokerError::Decode(e.to_string())),
            BrokerResponse::NotFound => Ok(None),
            other => Err(BrokerError::Decode(format!(
                "unexpected response to entity read: {other:?}"
            ))),
        }
    }

    /// Partial update of an entity's attributes
    pub async fn update_entity(&self, id: &str, attrs: Value) -> BrokerResult<bool> {
        let path = format!("ngsi-ld/v1/entities/{id}/attrs");
        match self.request(Method::PATCH, &path, Vec::new(), Some(attrs)).await? {
            BrokerResponse::NotFound => Ok(false),
            _ => Ok(true),
        }
    }

    /// Delete an entity; returns whether it existed
    pub async fn delete_entity(&self, id: &str) -> BrokerResult<bool> {
        let path = format!("ngsi-ld/v1/entities/{id}");
        match self.request(Method::DELETE, &path, Vec::new(), None).await? {
            BrokerResponse::NotFound => Ok(false),
            _ => Ok(true),
        }
    }

    pub async fn query_entities(&self, query: &EntityQuery) -> BrokerResult<Vec<Entity>> {
        match self
            .request(Method::GET, "ngsi-ld/v1/entities", query.to_params(), None)
            .await?
        {
            BrokerResponse::Body(body) => serde_json::from_value(body)
                .map_err(|e| BrokerError::Decode(e.to_string())),
            BrokerResponse::NotFound => Ok(Vec::new()),
            _ => Ok(Vec::new()),
        }
    }

    /// Create-or-patch: read first, then branch
    ///
    /// Identity fields are stripped from the patch body; the broker
    /// rejects attribute updates that carry `id` or `type`.
    pub async fn upsert_entity(&self, entity: &Entity) -> BrokerResult<UpsertOutcome> {
        if self.get_entity(&entity.id).await?.is_some() {
            self.update_entity(&entity.id, entity.attrs_for_update()).await?;
            Ok(UpsertOutcome::Updated)
        } else {
            match self.create_entity(entity).await? {
                // lost a create race, patch instead
                CreateOutcome::Conflict => {
                    self.update_entity(&entity.id, entity.attrs_for_update()).await?;
                    Ok(UpsertOutcome::Updated)
                }
                CreateOutcome::Created => Ok(UpsertOutcome::Created),
            }
        }
    }

    /// Reachability probe — never errors, used by the readiness route
    pub async fn health_check(&self) -> bool {
        match self.request_once(Method::GET, "version", &[], None).await {
            Ok(_) => true,
            Err(e) => {
                tracing::debug!(error = %e, "broker health check failed");
                false
            }
        }
    }
}
