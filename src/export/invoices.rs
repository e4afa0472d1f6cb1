//! Invoice headers (OINV) and invoice lines (INV1).
//!
//! Lines are fetched per invoice. Service Layer versions differ in whether
//! `DocumentLines` can be addressed directly and whether it accepts `$select`,
//! so each invoice walks three request shapes before giving up. A failing
//! invoice is logged and skipped; the rest of the export continues.

use super::master_data::Table;
use super::{CsvSink, ExportSummary, Exporter};
use crate::error::Result;
use crate::executor::RequestExecutor;
use crate::record::{Record, cell, cell_any, i64_value, object_list};
use serde_json::Value;
use std::path::Path;
use std::time::Instant;

const LINE_FIELDS: &str = "LineNum,ItemCode,ItemDescription,Quantity,UnitPrice,LineTotal";

pub(crate) const INVOICES: Table = Table {
    label: "OINV",
    collection: "Invoices",
    select: "DocEntry,DocNum,CardCode,SalesPersonCode,DocDate,DocTotal,VatSum",
    order_by: "DocEntry",
    header: &[
        "DocEntry", "DocNum", "CardCode", "SlpCode", "DocDate", "DocTotal", "VatSum",
    ],
    row: invoice_row,
};

const LINE_HEADER: &[&str] = &[
    "DocEntry",
    "LineNum",
    "ItemCode",
    "Dscription",
    "Quantity",
    "Price",
    "LineTotal",
];

fn invoice_row(r: &Record) -> Vec<String> {
    vec![
        cell(r, "DocEntry"),
        cell(r, "DocNum"),
        cell(r, "CardCode"),
        cell(r, "SalesPersonCode"),
        cell(r, "DocDate"),
        cell(r, "DocTotal"),
        cell(r, "VatSum"),
    ]
}

fn line_row(doc_entry: i64, line: &Record) -> Vec<String> {
    vec![
        doc_entry.to_string(),
        cell(line, "LineNum"),
        cell(line, "ItemCode"),
        cell_any(line, &["ItemDescription", "Dscription"]),
        cell(line, "Quantity"),
        cell_any(line, &["UnitPrice", "Price"]),
        cell(line, "LineTotal"),
    ]
}

/// The `value` array of a collection body, if the body has one
fn value_list(body: &str) -> Option<Vec<Record>> {
    let json: Value = serde_json::from_str(body).ok()?;
    let Value::Array(items) = json.get("value")? else {
        return None;
    };
    Some(
        items
            .iter()
            .filter_map(Value::as_object)
            .cloned()
            .collect(),
    )
}

/// Fetch the document lines of one invoice
///
/// Tries `Invoices(n)/DocumentLines?$select=...`, then the same without
/// `$select`, then the whole invoice and its embedded `DocumentLines`. Only
/// the last attempt's error is returned.
pub async fn fetch_invoice_lines(executor: &RequestExecutor, doc_entry: i64) -> Result<Vec<Record>> {
    let lines_path = format!("Invoices({doc_entry})/DocumentLines");

    let select = vec![("$select".to_string(), LINE_FIELDS.to_string())];
    for query in [select, Vec::new()] {
        match executor.execute_get_text(&lines_path, &query).await {
            Ok(body) => {
                if let Some(lines) = value_list(&body) {
                    return Ok(lines);
                }
                tracing::debug!(doc_entry, "DocumentLines body without value list");
            }
            Err(e) => {
                tracing::debug!(doc_entry, error = %e, selected = !query.is_empty(), "DocumentLines request failed");
            }
        }
    }

    let invoice = executor
        .execute_get_record(&format!("Invoices({doc_entry})"), &[])
        .await?;
    Ok(object_list(&invoice, "DocumentLines")
        .into_iter()
        .cloned()
        .collect())
}

impl Exporter {
    /// Export invoice headers as OINV and return their `DocEntry` keys
    ///
    /// `filter` is passed through as `$filter` (e.g. `DocDate ge '2025-01-01'`).
    pub async fn export_invoices(
        &self,
        out_path: &Path,
        filter: Option<&str>,
    ) -> Result<(ExportSummary, Vec<i64>)> {
        let mut doc_entries = Vec::new();
        let summary = self
            .export_table(&INVOICES, out_path, filter, |invoice| {
                match invoice.get("DocEntry").and_then(i64_value) {
                    Some(doc_entry) => doc_entries.push(doc_entry),
                    None => tracing::warn!(
                        doc_num = %cell(invoice, "DocNum"),
                        "invoice without DocEntry, lines will not be exported"
                    ),
                }
            })
            .await?;
        Ok((summary, doc_entries))
    }

    /// Export the lines of the given invoices as INV1
    pub async fn export_invoice_lines(
        &self,
        doc_entries: &[i64],
        out_path: &Path,
    ) -> Result<ExportSummary> {
        // Row-based progress would be noisy here; progress is per invoice
        let mut sink = CsvSink::create(out_path, "INV1", LINE_HEADER, 0)?;
        let started = Instant::now();
        let every = self.config.invoice_progress_every;
        let mut skipped = 0usize;

        for (done, &doc_entry) in doc_entries.iter().enumerate() {
            match fetch_invoice_lines(&self.executor, doc_entry).await {
                Ok(lines) => {
                    for line in &lines {
                        sink.write(line_row(doc_entry, line))?;
                    }
                }
                Err(e) => {
                    skipped += 1;
                    tracing::warn!(doc_entry, error = %e, "invoice lines unavailable, skipping");
                }
            }

            let done = done as u64 + 1;
            if every > 0 && done % every == 0 {
                tracing::info!(
                    invoices = done,
                    total = doc_entries.len(),
                    lines = sink.rows(),
                    elapsed_s = format!("{:.1}", started.elapsed().as_secs_f64()),
                    "invoice lines progress"
                );
            }
        }

        if skipped > 0 {
            tracing::warn!(skipped, "invoices exported without lines");
        }
        sink.finish()
    }

    /// Export invoice headers and then their lines
    pub async fn export_invoices_with_lines(
        &self,
        headers_path: &Path,
        lines_path: &Path,
        filter: Option<&str>,
    ) -> Result<(ExportSummary, ExportSummary)> {
        let (headers, doc_entries) = self.export_invoices(headers_path, filter).await?;
        let lines = self.export_invoice_lines(&doc_entries, lines_path).await?;
        Ok((headers, lines))
    }
}
