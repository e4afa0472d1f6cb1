//! Stock levels per warehouse and per item.

use super::{CsvSink, ExportSummary, Exporter};
use crate::error::Result;
use crate::query::CollectionQuery;
use crate::record::{Record, f64_field, object_list, str_field};
use crate::stream::stream_collection;
use futures::TryStreamExt;
use std::collections::BTreeMap;
use std::path::Path;

const STOCK_FILTER: &str = "InventoryItem eq 'tYES' and QuantityOnStock gt 0";

/// Both files written by [`Exporter::export_stock`]
#[derive(Clone, Debug, PartialEq)]
pub struct StockSummary {
    /// `ItemCode,Warehouse,InStock`
    pub per_warehouse: ExportSummary,
    /// `ItemCode,InStockTotal`
    pub totals: ExportSummary,
    /// Inventory items that carried warehouse rows
    pub items: u64,
}

/// Positive stock entries of one item, optionally restricted to one warehouse
fn warehouse_stock<'a>(item: &'a Record, warehouse: Option<&str>) -> Vec<(&'a str, f64)> {
    object_list(item, "ItemWarehouseInfoCollection")
        .into_iter()
        .map(|row| (str_field(row, "WarehouseCode"), f64_field(row, "InStock", 0.0)))
        .filter(|(code, _)| warehouse.is_none_or(|w| w == *code))
        .filter(|(_, in_stock)| *in_stock > 0.0)
        .collect()
}

impl Exporter {
    /// Export stock per warehouse and the per-item totals
    ///
    /// Only inventory items with positive on-hand quantity are requested.
    /// With `warehouse` set, other warehouses are left out of both files.
    pub async fn export_stock(
        &self,
        per_warehouse_path: &Path,
        totals_path: &Path,
        warehouse: Option<&str>,
    ) -> Result<StockSummary> {
        let mut rows = CsvSink::create(
            per_warehouse_path,
            "STOCK",
            &["ItemCode", "Warehouse", "InStock"],
            self.config.progress_every,
        )?;

        let query = CollectionQuery::new("Items")
            .select("ItemCode,ItemName,InventoryItem,QuantityOnStock,ItemWarehouseInfoCollection")
            .filter(Some(STOCK_FILTER));
        let mut items = stream_collection(&self.executor, query);

        let mut totals: BTreeMap<String, f64> = BTreeMap::new();
        let mut inspected = 0u64;

        while let Some(item) = items.try_next().await? {
            if object_list(&item, "ItemWarehouseInfoCollection").is_empty() {
                continue;
            }
            inspected += 1;
            let code = str_field(&item, "ItemCode");

            let mut item_total = 0.0;
            for (warehouse_code, in_stock) in warehouse_stock(&item, warehouse) {
                rows.write([code, warehouse_code, format!("{in_stock:.4}").as_str()])?;
                item_total += in_stock;
            }
            if item_total > 0.0 {
                *totals.entry(code.to_string()).or_default() += item_total;
            }
        }
        let per_warehouse = rows.finish()?;

        let mut sink = CsvSink::create(
            totals_path,
            "STOCK_TOTALS",
            &["ItemCode", "InStockTotal"],
            0,
        )?;
        for (code, total) in &totals {
            sink.write([code.as_str(), format!("{total:.4}").as_str()])?;
        }
        let totals = sink.finish()?;

        if let Some(warehouse) = warehouse {
            tracing::info!(warehouse, "stock restricted to one warehouse");
        }
        Ok(StockSummary {
            per_warehouse,
            totals,
            items: inspected,
        })
    }
}
