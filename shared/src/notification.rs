//! Subscription notification envelope delivered by the context broker

use serde::{Deserialize, Serialize};

use crate::ngsi::Entity;

/// `POST /orion/notifications` request body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    #[serde(rename = "subscriptionId")]
    pub subscription_id: String,
    pub data: Vec<Entity>,
}
