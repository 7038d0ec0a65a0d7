//! Typed builders for the entities this system writes to the broker.
//!
//! Identifiers are derived from the project id / SKU, so reprocessing
//! a notification overwrites the previous Reservation or Shortage
//! instead of creating a second one.

use serde::{Deserialize, Serialize};
use serde_json::json;

use super::entity::{Entity, Property, Relationship};
use super::{
    default_context, inventory_item_urn, project_urn, reservation_urn, shortage_urn,
};
use crate::util::now_iso;

/// One reserved component
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReservationLine {
    pub sku: String,
    pub qty: f64,
    pub unit: String,
}

impl ReservationLine {
    pub fn new(sku: impl Into<String>, qty: f64) -> Self {
        Self {
            sku: sku.into(),
            qty,
            unit: "Unit".to_string(),
        }
    }
}

/// One insufficient component
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShortageLine {
    pub sku: String,
    #[serde(rename = "missingQty")]
    pub missing_qty: f64,
    #[serde(rename = "requiredQty")]
    pub required_qty: f64,
    #[serde(rename = "availableQty")]
    pub available_qty: f64,
    pub unit: String,
}

impl ShortageLine {
    pub fn new(sku: impl Into<String>, missing_qty: f64, required_qty: f64, available_qty: f64) -> Self {
        Self {
            sku: sku.into(),
            missing_qty,
            required_qty,
            available_qty,
            unit: "Unit".to_string(),
        }
    }
}

/// Project entity factory (used by the admin recompute endpoint to
/// synthesize a `requested` notification)
pub struct Project;

impl Project {
    pub fn entity(
        project_id: &str,
        code: &str,
        status: &str,
        station: Option<&str>,
        quantity: Option<f64>,
    ) -> Entity {
        let mut entity =
            Entity::new(project_urn(project_id), "Project").with_context(default_context());
        entity.set_property("code", Property::new(code));
        entity.set_property("status", Property::new(status));
        if let Some(station) = station {
            entity.set_property("station", Property::new(station));
        }
        if let Some(quantity) = quantity {
            entity.set_property("quantity", Property::new(quantity));
        }
        entity
    }
}

/// Reservation entity factory
pub struct Reservation;

impl Reservation {
    pub fn entity(project_id: &str, lines: &[ReservationLine]) -> Entity {
        let project_uri = project_urn(project_id);
        let mut entity =
            Entity::new(reservation_urn(project_id), "Reservation").with_context(default_context());
        entity.set_relationship("projectRef", Relationship::new(project_uri));
        entity.set_property("lines", Property::new(json!(lines)));
        entity.set_property("status", Property::new("pending"));
        entity.set_property("source", Property::new("odoo"));
        entity.set_property("createdAt", Property::new(now_iso()));
        entity
    }
}

/// Shortage entity factory
pub struct Shortage;

impl Shortage {
    pub fn entity(project_id: &str, lines: &[ShortageLine]) -> Entity {
        let project_uri = project_urn(project_id);
        let mut entity =
            Entity::new(shortage_urn(project_id), "Shortage").with_context(default_context());
        entity.set_relationship("projectRef", Relationship::new(project_uri));
        entity.set_property("lines", Property::new(json!(lines)));
        entity.set_property("status", Property::new("open"));
        entity.set_property("createdAt", Property::new(now_iso()));
        entity
    }
}

/// InventoryItem entity factory
pub struct InventoryItem;

impl InventoryItem {
    pub fn entity(sku: &str, available: f64, reserved: f64, location: Option<&str>) -> Entity {
        let mut entity =
            Entity::new(inventory_item_urn(sku), "InventoryItem").with_context(default_context());
        entity.set_property("sku", Property::new(sku));
        entity.set_property("available", Property::new(available).with_unit("Unit"));
        entity.set_property("reserved", Property::new(reserved).with_unit("Unit"));
        entity.set_property("total", Property::new(available + reserved).with_unit("Unit"));
        entity.set_property("updatedAt", Property::new(now_iso()));
        if let Some(location) = location {
            entity.set_property("location", Property::new(location));
        }
        entity
    }
}
