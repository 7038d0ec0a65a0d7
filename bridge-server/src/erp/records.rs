//! Typed views over ERP records
//!
//! The wire format has two quirks handled here: many2one references
//! arrive as `[id, "display name"]` pairs, and *any* unset field
//! arrives as boolean `false` instead of null.

use serde::{Deserialize, Deserializer, de};
use serde_json::Value;

/// A `[id, name]` reference pair
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ManyToOne(pub i64, pub String);

impl ManyToOne {
    pub fn id(&self) -> i64 {
        self.0
    }

    pub fn name(&self) -> &str {
        &self.1
    }
}

/// Deserialize an optional many2one, mapping `false`/null to `None`
pub fn falsy_many2one<'de, D>(deserializer: D) -> Result<Option<ManyToOne>, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Bool(false) | Value::Null => Ok(None),
        other => serde_json::from_value(other).map(Some).map_err(de::Error::custom),
    }
}

/// `product.product` row (SKU extracted separately because the SKU
/// field name is configuration)
#[derive(Debug, Clone)]
pub struct ProductRecord {
    pub id: i64,
    pub name: String,
    pub sku: Option<String>,
}

impl ProductRecord {
    /// Build from a raw row, pulling the SKU out of `sku_field`
    pub fn from_row(row: &Value, sku_field: &str) -> Option<Self> {
        let id = row.get("id")?.as_i64()?;
        let name = row.get("name").and_then(Value::as_str).unwrap_or_default().to_string();
        let sku = row
            .get(sku_field)
            .and_then(Value::as_str)
            .map(str::to_string);
        Some(Self { id, name, sku })
    }
}

/// `mrp.bom` row
#[derive(Debug, Clone, Deserialize)]
pub struct BomRecord {
    pub id: i64,
    #[serde(default, deserialize_with = "falsy_many2one")]
    pub product_id: Option<ManyToOne>,
    #[serde(default)]
    pub product_qty: f64,
    #[serde(default)]
    pub bom_line_ids: Vec<i64>,
}

/// `mrp.bom.line` row
#[derive(Debug, Clone, Deserialize)]
pub struct BomLineRecord {
    pub id: i64,
    pub product_id: ManyToOne,
    pub product_qty: f64,
    #[serde(default, deserialize_with = "falsy_many2one")]
    pub product_uom_id: Option<ManyToOne>,
}

/// `stock.quant` row — one per (product, location); a product held in
/// several locations has several rows that the caller must aggregate
#[derive(Debug, Clone, Deserialize)]
pub struct StockQuant {
    pub id: i64,
    pub product_id: ManyToOne,
    #[serde(default, deserialize_with = "falsy_many2one")]
    pub location_id: Option<ManyToOne>,
    #[serde(default)]
    pub quantity: f64,
    #[serde(default)]
    pub reserved_quantity: f64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_many2one_pair() {
        let quant: StockQuant = serde_json::from_value(json!({
            "id": 10,
            "product_id": [42, "LED Strip 24V"],
            "location_id": [8, "WH/Stock"],
            "quantity": 25.0,
            "reserved_quantity": 5.0
        }))
        .unwrap();
        assert_eq!(quant.product_id.id(), 42);
        assert_eq!(quant.product_id.name(), "LED Strip 24V");
        assert_eq!(quant.location_id.as_ref().unwrap().id(), 8);
    }

    #[test]
    fn test_falsy_fields_become_none() {
        let bom: BomRecord = serde_json::from_value(json!({
            "id": 3,
            "product_id": false,
            "product_qty": 1.0,
            "bom_line_ids": [7, 8]
        }))
        .unwrap();
        assert!(bom.product_id.is_none());
        assert_eq!(bom.bom_line_ids, vec![7, 8]);
    }

    #[test]
    fn test_product_record_uses_configured_sku_field() {
        let row = json!({"id": 5, "name": "Bracket", "default_code": "BRACKET-STEEL-001"});
        let product = ProductRecord::from_row(&row, "default_code").unwrap();
        assert_eq!(product.sku.as_deref(), Some("BRACKET-STEEL-001"));

        let row = json!({"id": 5, "name": "Bracket", "default_code": false});
        let product = ProductRecord::from_row(&row, "default_code").unwrap();
        assert!(product.sku.is_none());
    }
}
