//! CSV export routines
//!
//! Each routine streams one Service Layer collection, projects the fields of
//! interest into a fixed column layout and writes a CSV file, overwriting any
//! previous run. The layouts follow the SAP Business One table names
//! (OITB, OITM, OSLP, OCRD, OINV, INV1).
//!
//! [`Exporter`] ties an executor to the output settings; the individual
//! exports live in focused submodules that extend it.

use crate::config::ExportConfig;
use crate::count::count;
use crate::error::Result;
use crate::executor::RequestExecutor;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

mod invoices;
mod master_data;
mod prices;
mod stock;

pub use invoices::fetch_invoice_lines;
pub use prices::{ItemPrice, fetch_item_price};
pub use stock::StockSummary;

/// File names used by [`Exporter::export_all`]
pub mod files {
    /// Item groups
    pub const ITEM_GROUPS: &str = "OITB.csv";
    /// Items
    pub const ITEMS: &str = "OITM.csv";
    /// Sales persons
    pub const SALES_PERSONS: &str = "OSLP.csv";
    /// Business partners
    pub const BUSINESS_PARTNERS: &str = "OCRD.csv";
    /// Invoice headers
    pub const INVOICES: &str = "OINV.csv";
    /// Invoice lines
    pub const INVOICE_LINES: &str = "INV1.csv";
    /// Stock per warehouse
    pub const STOCK_PER_WAREHOUSE: &str = "stock_per_warehouse.csv";
    /// Stock totals per item
    pub const STOCK_TOTALS: &str = "stock_totals.csv";

    /// Prices of one price list
    pub fn price_list(number: i64) -> String {
        format!("price_list_{number}.csv")
    }
}

/// Result of writing one CSV file
#[derive(Clone, Debug, PartialEq)]
pub struct ExportSummary {
    /// Short table label (e.g. "OITM")
    pub label: &'static str,
    /// File that was written
    pub path: PathBuf,
    /// Data rows written, excluding the header
    pub rows: u64,
    /// Wall-clock time spent
    pub elapsed: Duration,
}

/// Runs exports against one Service Layer session
#[derive(Clone, Debug)]
pub struct Exporter {
    executor: RequestExecutor,
    config: ExportConfig,
}

impl Exporter {
    /// Create an exporter writing under `config.output_dir`
    pub fn new(executor: RequestExecutor, config: ExportConfig) -> Self {
        Self { executor, config }
    }

    /// The executor used for every request
    pub fn executor(&self) -> &RequestExecutor {
        &self.executor
    }

    /// Output settings
    pub fn config(&self) -> &ExportConfig {
        &self.config
    }

    /// Path of `file_name` inside the output directory
    pub fn output_path(&self, file_name: &str) -> PathBuf {
        self.config.output_dir.join(file_name)
    }

    /// Log the advisory count for `collection`, if the server reports one
    pub(crate) async fn log_reported_count(&self, label: &str, collection: &str) {
        if let Some(total) = count(&self.executor, collection).await {
            tracing::info!(table = label, collection, total, "records reported by server");
        }
    }

    /// Export the master data and invoice tables into the output directory
    ///
    /// Runs item groups, items, sales persons, business partners, invoice
    /// headers and invoice lines in that order. The first failing table stops
    /// the run.
    pub async fn export_all(&self, invoice_filter: Option<&str>) -> Result<Vec<ExportSummary>> {
        let mut summaries = Vec::with_capacity(6);

        summaries.push(
            self.export_item_groups(&self.output_path(files::ITEM_GROUPS))
                .await?,
        );
        summaries.push(self.export_items(&self.output_path(files::ITEMS)).await?);
        summaries.push(
            self.export_sales_persons(&self.output_path(files::SALES_PERSONS))
                .await?,
        );
        summaries.push(
            self.export_business_partners(&self.output_path(files::BUSINESS_PARTNERS))
                .await?,
        );

        let (headers, doc_entries) = self
            .export_invoices(&self.output_path(files::INVOICES), invoice_filter)
            .await?;
        summaries.push(headers);
        summaries.push(
            self.export_invoice_lines(&doc_entries, &self.output_path(files::INVOICE_LINES))
                .await?,
        );

        Ok(summaries)
    }
}

/// A CSV file being written, with row counting and progress logging
pub(crate) struct CsvSink {
    writer: csv::Writer<File>,
    path: PathBuf,
    label: &'static str,
    rows: u64,
    progress_every: u64,
    started: Instant,
}

impl CsvSink {
    /// Create (or truncate) `path`, creating its parent directory, and write the header
    pub(crate) fn create(
        path: &Path,
        label: &'static str,
        header: &[&str],
        progress_every: u64,
    ) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let mut writer = csv::Writer::from_path(path)?;
        writer.write_record(header)?;

        Ok(Self {
            writer,
            path: path.to_path_buf(),
            label,
            rows: 0,
            progress_every,
            started: Instant::now(),
        })
    }

    /// Write one data row
    pub(crate) fn write<I, T>(&mut self, row: I) -> Result<()>
    where
        I: IntoIterator<Item = T>,
        T: AsRef<[u8]>,
    {
        self.writer.write_record(row)?;
        self.rows += 1;

        if self.progress_every > 0 && self.rows % self.progress_every == 0 {
            tracing::info!(
                table = self.label,
                rows = self.rows,
                elapsed_s = format!("{:.1}", self.started.elapsed().as_secs_f64()),
                "progress"
            );
        }
        Ok(())
    }

    /// Rows written so far
    pub(crate) fn rows(&self) -> u64 {
        self.rows
    }

    /// Flush and report
    pub(crate) fn finish(mut self) -> Result<ExportSummary> {
        self.writer.flush()?;
        let summary = ExportSummary {
            label: self.label,
            path: self.path,
            rows: self.rows,
            elapsed: self.started.elapsed(),
        };

        tracing::info!(
            table = summary.label,
            rows = summary.rows,
            path = %summary.path.display(),
            elapsed_s = format!("{:.1}", summary.elapsed.as_secs_f64()),
            "export finished"
        );
        Ok(summary)
    }
}
