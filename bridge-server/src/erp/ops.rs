//! Domain operations built on the raw client: product lookup, BOM
//! traversal, stock aggregation and direct stock adjustments.

use std::collections::HashMap;

use serde::Serialize;
use serde_json::json;

use super::domain::{Domain, eq, is_in};
use super::records::{BomLineRecord, BomRecord, ProductRecord, StockQuant};
use super::{ErpClient, ErpError, ErpResult};

/// Stock for one product aggregated across internal locations
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct ProductStock {
    pub quantity: f64,
    pub reserved: f64,
}

impl ProductStock {
    /// Quantity free for new reservations
    ///
    /// With `include_reserved` the ERP's reserved quantity is counted
    /// against availability; without it only the raw on-hand total
    /// matters.
    pub fn available(&self, include_reserved: bool) -> f64 {
        if include_reserved {
            self.quantity - self.reserved
        } else {
            self.quantity
        }
    }
}

/// Result of a direct stock adjustment
#[derive(Debug, Clone, Serialize)]
pub struct StockMove {
    pub quant_id: i64,
    pub product_id: i64,
    pub sku: String,
    pub old_qty: f64,
    pub new_qty: f64,
}

impl ErpClient {
    const PRODUCT_MODEL: &'static str = "product.product";
    const BOM_MODEL: &'static str = "mrp.bom";
    const BOM_LINE_MODEL: &'static str = "mrp.bom.line";
    const QUANT_MODEL: &'static str = "stock.quant";

    /// Look up one product by SKU
    pub async fn product_by_sku(&self, sku: &str) -> ErpResult<Option<ProductRecord>> {
        let domain: Domain = vec![eq(self.sku_field(), json!(sku))];
        let fields = ["id", "name", self.sku_field()];
        let rows = self
            .search_read(Self::PRODUCT_MODEL, &domain, &fields, Some(1))
            .await?;
        Ok(rows
            .first()
            .and_then(|row| ProductRecord::from_row(row, self.sku_field())))
    }

    /// Batched product lookup, keyed by id
    pub async fn products_by_ids(&self, ids: &[i64]) -> ErpResult<HashMap<i64, ProductRecord>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        let domain: Domain = vec![is_in("id", ids.iter().copied())];
        let fields = ["id", "name", self.sku_field()];
        let rows = self
            .search_read(Self::PRODUCT_MODEL, &domain, &fields, None)
            .await?;
        Ok(rows
            .iter()
            .filter_map(|row| ProductRecord::from_row(row, self.sku_field()))
            .map(|p| (p.id, p))
            .collect())
    }

    /// Manufacturing BOM for a product variant, if one exists
    pub async fn bom_for_product(&self, product_id: i64) -> ErpResult<Option<BomRecord>> {
        let domain: Domain = vec![eq("product_id", json!(product_id))];
        let fields = ["id", "product_id", "product_qty", "bom_line_ids"];
        let rows = self
            .search_read(Self::BOM_MODEL, &domain, &fields, Some(1))
            .await?;
        rows.into_iter()
            .next()
            .map(|row| serde_json::from_value(row).map_err(|e| ErpError::Decode(e.to_string())))
            .transpose()
    }

    pub async fn bom_lines(&self, line_ids: &[i64]) -> ErpResult<Vec<BomLineRecord>> {
        if line_ids.is_empty() {
            return Ok(Vec::new());
        }
        let fields = ["id", "product_id", "product_qty", "product_uom_id"];
        let rows = self.read(Self::BOM_LINE_MODEL, line_ids, &fields).await?;
        rows.into_iter()
            .map(|row| serde_json::from_value(row).map_err(|e| ErpError::Decode(e.to_string())))
            .collect()
    }

    /// Aggregate internal-location stock for a set of products
    ///
    /// Products without any quant rows are absent from the map; the
    /// caller treats absence as zero stock.
    pub async fn stock_for_products(
        &self,
        product_ids: &[i64],
    ) -> ErpResult<HashMap<i64, ProductStock>> {
        if product_ids.is_empty() {
            return Ok(HashMap::new());
        }
        let domain: Domain = vec![
            is_in("product_id", product_ids.iter().copied()),
            eq("location_id.usage", json!("internal")),
        ];
        let fields = ["id", "product_id", "location_id", "quantity", "reserved_quantity"];
        let rows = self
            .search_read(Self::QUANT_MODEL, &domain, &fields, None)
            .await?;

        let mut stock: HashMap<i64, ProductStock> = HashMap::new();
        for row in rows {
            let quant: StockQuant =
                serde_json::from_value(row).map_err(|e| ErpError::Decode(e.to_string()))?;
            let entry = stock.entry(quant.product_id.id()).or_default();
            entry.quantity += quant.quantity;
            entry.reserved += quant.reserved_quantity;
        }
        Ok(stock)
    }

    /// Products eligible for the inventory sync: active, stockable and
    /// carrying a SKU, optionally narrowed to an allowlist
    pub async fn eligible_products(
        &self,
        allowed_skus: Option<&[String]>,
    ) -> ErpResult<Vec<ProductRecord>> {
        let mut domain: Domain = vec![
            eq("active", json!(true)),
            eq("type", json!("product")),
            super::domain::ne(self.sku_field(), json!(false)),
        ];
        if let Some(skus) = allowed_skus {
            domain.push(is_in(self.sku_field(), skus.iter().cloned()));
        }
        let fields = ["id", "name", self.sku_field()];
        let rows = self
            .search_read(Self::PRODUCT_MODEL, &domain, &fields, None)
            .await?;
        Ok(rows
            .iter()
            .filter_map(|row| ProductRecord::from_row(row, self.sku_field()))
            .collect())
    }

    /// Remove stock at a location, flooring at zero
    pub async fn consume_stock(
        &self,
        sku: &str,
        quantity: f64,
        location_id: i64,
    ) -> ErpResult<StockMove> {
        self.adjust_stock(sku, -quantity, location_id).await
    }

    /// Add stock at a location, creating the quant if absent
    pub async fn produce_stock(
        &self,
        sku: &str,
        quantity: f64,
        location_id: i64,
    ) -> ErpResult<StockMove> {
        self.adjust_stock(sku, quantity, location_id).await
    }

    async fn adjust_stock(&self, sku: &str, delta: f64, location_id: i64) -> ErpResult<StockMove> {
        let product = self.product_by_sku(sku).await?.ok_or_else(|| ErpError::Api {
            message: format!("no product for SKU: {sku}"),
            fault_code: None,
            fault_string: None,
        })?;

        let domain: Domain = vec![
            eq("product_id", json!(product.id)),
            eq("location_id", json!(location_id)),
        ];
        let fields = ["id", "product_id", "location_id", "quantity", "reserved_quantity"];
        let rows = self
            .search_read(Self::QUANT_MODEL, &domain, &fields, Some(1))
            .await?;

        let (quant_id, old_qty) = match rows.into_iter().next() {
            Some(row) => {
                let quant: StockQuant =
                    serde_json::from_value(row).map_err(|e| ErpError::Decode(e.to_string()))?;
                (quant.id, quant.quantity)
            }
            None => {
                let id = self
                    .create(
                        Self::QUANT_MODEL,
                        json!({
                            "product_id": product.id,
                            "location_id": location_id,
                            "quantity": 0.0,
                        }),
                    )
                    .await?;
                (id, 0.0)
            }
        };

        let new_qty = (old_qty + delta).max(0.0);
        self.write(Self::QUANT_MODEL, &[quant_id], json!({ "quantity": new_qty }))
            .await?;

        tracing::info!(sku, quant_id, old_qty, new_qty, "adjusted stock");
        Ok(StockMove {
            quant_id,
            product_id: product.id,
            sku: sku.to_string(),
            old_qty,
            new_qty,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_available_respects_reserved_mode() {
        let stock = ProductStock {
            quantity: 25.0,
            reserved: 5.0,
        };
        assert_eq!(stock.available(true), 20.0);
        assert_eq!(stock.available(false), 25.0);
    }
}
