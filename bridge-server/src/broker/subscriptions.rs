//! NGSI-LD subscription management
//!
//! The bridge registers one subscription so the broker pushes Project
//! changes to `/orion/notifications`. Registration is idempotent: an
//! existing subscription with the same id is left alone.

use reqwest::Method;
use serde_json::{Value, json};
use shared::ngsi;

use super::client::BrokerClient;
use super::{BrokerResponse, BrokerResult};

/// What a subscription should watch and where to deliver it
#[derive(Debug, Clone)]
pub struct SubscriptionSpec {
    pub id: String,
    pub description: String,
    pub entity_type: String,
    pub watched_attributes: Vec<String>,
    pub endpoint: String,
}

impl SubscriptionSpec {
    fn to_body(&self) -> Value {
        json!({
            "id": self.id,
            "type": "Subscription",
            "description": self.description,
            "entities": [{ "type": self.entity_type }],
            "watchedAttributes": self.watched_attributes,
            "notification": {
                "endpoint": {
                    "uri": self.endpoint,
                    "accept": "application/json",
                },
            },
            "expiresAt": "2030-01-01T00:00:00Z",
            "@context": ngsi::default_context(),
        })
    }
}

impl BrokerClient {
    pub async fn get_subscription(&self, id: &str) -> BrokerResult<Option<Value>> {
        let path = format!("ngsi-ld/v1/subscriptions/{id}");
        match self.request(Method::GET, &path, Vec::new(), None).await? {
            BrokerResponse::Body(body) => Ok(Some(body)),
            _ => Ok(None),
        }
    }

    pub async fn list_subscriptions(&self) -> BrokerResult<Vec<Value>> {
        match self
            .request(Method::GET, "ngsi-ld/v1/subscriptions", Vec::new(), None)
            .await?
        {
            BrokerResponse::Body(Value::Array(items)) => Ok(items),
            _ => Ok(Vec::new()),
        }
    }

    pub async fn delete_subscription(&self, id: &str) -> BrokerResult<bool> {
        let path = format!("ngsi-ld/v1/subscriptions/{id}");
        match self.request(Method::DELETE, &path, Vec::new(), None).await? {
            BrokerResponse::NotFound => Ok(false),
            _ => Ok(true),
        }
    }

    /// Register the subscription if it is not already present
    ///
    /// Returns whether a new subscription was created.
    pub async fn ensure_subscription(&self, spec: &SubscriptionSpec) -> BrokerResult<bool> {
        if self.get_subscription(&spec.id).await?.is_some() {
            tracing::debug!(id = %spec.id, "subscription already registered");
            return Ok(false);
        }
        match self
            .request(
                Method::POST,
                "ngsi-ld/v1/subscriptions",
                Vec::new(),
                Some(spec.to_body()),
            )
            .await?
        {
            BrokerResponse::Conflict => Ok(false),
            _ => {
                tracing::info!(id = %spec.id, endpoint = %spec.endpoint, "subscription registered");
                Ok(true)
            }
        }
    }
}
