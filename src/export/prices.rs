//! Price list export.
//!
//! Prices are not exposed as a flat collection, so every distinct item code is
//! looked up individually and the lookups are fanned out over a bounded worker
//! pool.

use super::{CsvSink, ExportSummary, Exporter};
use crate::error::Result;
use crate::executor::RequestExecutor;
use crate::fan_out::fan_out;
use crate::query::{CollectionQuery, escape_literal};
use crate::record::{Record, i64_value, object_list, str_field, value_to_cell};
use crate::stream::stream_collection;
use futures::TryStreamExt;
use serde_json::Value;
use std::collections::HashSet;
use std::path::Path;

/// Price of one item in one price list
#[derive(Clone, Debug, PartialEq)]
pub struct ItemPrice {
    /// Item code
    pub item_code: String,
    /// Price in the requested list, `None` if the item has no entry there
    pub price: Option<Value>,
    /// Currency of that price
    pub currency: Option<String>,
}

/// Entry for `price_list` in a record's `ItemPrices`, if present
fn price_in_list(item_code: &str, record: &Record, price_list: i64) -> Option<ItemPrice> {
    object_list(record, "ItemPrices")
        .into_iter()
        .find(|entry| entry.get("PriceList").and_then(i64_value) == Some(price_list))
        .map(|entry| ItemPrice {
            item_code: item_code.to_string(),
            price: entry.get("Price").filter(|p| !p.is_null()).cloned(),
            currency: entry
                .get("Currency")
                .and_then(Value::as_str)
                .filter(|c| !c.is_empty())
                .map(str::to_string),
        })
}

/// Look up the price of `item_code` in `price_list`
///
/// Tries the entity key `Items('<code>')` first. Codes with characters the
/// key syntax cannot carry fall back to `Items?$filter=ItemCode eq '<code>'`.
/// An item without an entry in the list yields a price of `None`. It is an
/// error only when neither request could read the item.
pub async fn fetch_item_price(
    executor: &RequestExecutor,
    item_code: &str,
    price_list: i64,
) -> Result<ItemPrice> {
    let key = urlencoding::encode(&escape_literal(item_code)).into_owned();
    let item_found = match executor
        .execute_get_record(&format!("Items('{key}')"), &[])
        .await
    {
        Ok(item) => {
            if let Some(price) = price_in_list(item_code, &item, price_list) {
                return Ok(price);
            }
            true
        }
        Err(e) => {
            tracing::debug!(item_code, error = %e, "key lookup failed, trying filter");
            false
        }
    };

    let query = vec![
        ("$select".to_string(), "ItemCode,ItemPrices".to_string()),
        (
            "$filter".to_string(),
            format!("ItemCode eq '{}'", escape_literal(item_code)),
        ),
    ];
    let found = match executor.execute_get("Items", &query).await {
        Ok(page) => page
            .records
            .first()
            .and_then(|item| price_in_list(item_code, item, price_list)),
        // The item exists, it just has no entry in this list
        Err(e) if item_found => {
            tracing::debug!(item_code, error = %e, "filter lookup failed after key lookup");
            None
        }
        Err(e) => return Err(e),
    };

    Ok(found.unwrap_or_else(|| ItemPrice {
        item_code: item_code.to_string(),
        price: None,
        currency: None,
    }))
}

impl Exporter {
    /// Every distinct, non-empty item code, in server order
    pub async fn distinct_item_codes(&self) -> Result<Vec<String>> {
        let query = CollectionQuery::new("Items")
            .select("ItemCode")
            .order_by("ItemCode");
        let mut items = stream_collection(&self.executor, query);

        let mut seen = HashSet::new();
        let mut codes = Vec::new();
        while let Some(item) = items.try_next().await? {
            let code = str_field(&item, "ItemCode");
            if !code.is_empty() && seen.insert(code.to_string()) {
                codes.push(code.to_string());
            }
        }
        Ok(codes)
    }

    /// Export `ItemCode,PriceList,Price,Currency` for every item in `price_list`
    ///
    /// Rows are written in completion order. Items whose lookup fails are left
    /// out of the file.
    pub async fn export_prices(&self, price_list: i64, out_path: &Path) -> Result<ExportSummary> {
        let codes = self.distinct_item_codes().await?;
        tracing::info!(items = codes.len(), price_list, "looking up prices");

        let mut sink = CsvSink::create(
            out_path,
            "PRICES",
            &["ItemCode", "PriceList", "Price", "Currency"],
            self.config.progress_every,
        )?;
        let list = price_list.to_string();
        let executor = &self.executor;

        let summary = fan_out(
            codes,
            self.config.price_workers,
            |code| async move { fetch_item_price(executor, &code, price_list).await },
            |price| {
                sink.write([
                    price.item_code,
                    list.clone(),
                    price.price.as_ref().map(value_to_cell).unwrap_or_default(),
                    price.currency.unwrap_or_default(),
                ])
            },
        )
        .await?;

        tracing::info!(
            priced = summary.succeeded,
            skipped = summary.failed,
            price_list,
            "price lookups finished"
        );
        sink.finish()
    }
}
