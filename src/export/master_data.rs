//! Master data tables: item groups, items, sales persons, business partners.

use super::{CsvSink, ExportSummary, Exporter};
use crate::error::Result;
use crate::query::CollectionQuery;
use crate::record::{Record, cell};
use crate::stream::stream_collection;
use futures::TryStreamExt;
use std::path::Path;

/// Column layout and projection for one exported collection
pub(crate) struct Table {
    pub(crate) label: &'static str,
    pub(crate) collection: &'static str,
    pub(crate) select: &'static str,
    pub(crate) order_by: &'static str,
    pub(crate) header: &'static [&'static str],
    pub(crate) row: fn(&Record) -> Vec<String>,
}

pub(crate) const ITEM_GROUPS: Table = Table {
    label: "OITB",
    collection: "ItemGroups",
    select: "Number,GroupName",
    order_by: "Number",
    header: &["ItmsGrpCod", "ItmsGrpNam"],
    row: item_group_row,
};

pub(crate) const ITEMS: Table = Table {
    label: "OITM",
    collection: "Items",
    select: "ItemCode,ItemName,ItemsGroupCode,UpdateDate,CreateDate",
    order_by: "ItemCode",
    header: &["ItemCode", "ItemName", "ItmsGrpCod", "UpdateDate", "CreateDate"],
    row: item_row,
};

pub(crate) const SALES_PERSONS: Table = Table {
    label: "OSLP",
    collection: "SalesPersons",
    select: "SalesEmployeeCode,SalesEmployeeName",
    order_by: "SalesEmployeeCode",
    header: &["SlpCode", "SlpName"],
    row: sales_person_row,
};

pub(crate) const BUSINESS_PARTNERS: Table = Table {
    label: "OCRD",
    collection: "BusinessPartners",
    select: "CardCode,CardName,FederalTaxID,EmailAddress,Phone1,Cellular,UpdateDate,CreateDate",
    order_by: "CardCode",
    header: &[
        "CardCode",
        "CardName",
        "LicTradNum",
        "E_Mail",
        "Phone1",
        "Cellular",
        "Address",
        "U_BirthDate",
        "UpdateDate",
        "CreateDate",
    ],
    row: business_partner_row,
};

fn item_group_row(r: &Record) -> Vec<String> {
    vec![cell(r, "Number"), cell(r, "GroupName")]
}

fn item_row(r: &Record) -> Vec<String> {
    vec![
        cell(r, "ItemCode"),
        cell(r, "ItemName"),
        group_code(r),
        cell(r, "UpdateDate"),
        cell(r, "CreateDate"),
    ]
}

fn sales_person_row(r: &Record) -> Vec<String> {
    vec![cell(r, "SalesEmployeeCode"), cell(r, "SalesEmployeeName")]
}

fn business_partner_row(r: &Record) -> Vec<String> {
    // Address and U_BirthDate are not part of the BusinessPartners projection
    vec![
        cell(r, "CardCode"),
        cell(r, "CardName"),
        cell(r, "FederalTaxID"),
        cell(r, "EmailAddress"),
        cell(r, "Phone1"),
        cell(r, "Cellular"),
        String::new(),
        String::new(),
        cell(r, "UpdateDate"),
        cell(r, "CreateDate"),
    ]
}

/// Item group code, `0` when missing, null or empty
fn group_code(record: &Record) -> String {
    let code = cell(record, "ItemsGroupCode");
    if code.is_empty() { "0".to_string() } else { code }
}

impl Exporter {
    /// Stream `table` into `out_path`, calling `inspect` on every record written
    pub(crate) async fn export_table<F>(
        &self,
        table: &Table,
        out_path: &Path,
        filter: Option<&str>,
        mut inspect: F,
    ) -> Result<ExportSummary>
    where
        F: FnMut(&Record),
    {
        self.log_reported_count(table.label, table.collection).await;

        let mut sink = CsvSink::create(
            out_path,
            table.label,
            table.header,
            self.config.progress_every,
        )?;

        let query = CollectionQuery::new(table.collection)
            .select(table.select)
            .filter(filter)
            .order_by(table.order_by);
        let mut records = stream_collection(&self.executor, query);

        while let Some(record) = records.try_next().await? {
            sink.write((table.row)(&record))?;
            inspect(&record);
        }

        sink.finish()
    }

    /// Export `ItemGroups` as OITB (`ItmsGrpCod,ItmsGrpNam`)
    pub async fn export_item_groups(&self, out_path: &Path) -> Result<ExportSummary> {
        self.export_table(&ITEM_GROUPS, out_path, None, |_| {}).await
    }

    /// Export `Items` as OITM (`ItemCode,ItemName,ItmsGrpCod,UpdateDate,CreateDate`)
    pub async fn export_items(&self, out_path: &Path) -> Result<ExportSummary> {
        self.export_table(&ITEMS, out_path, None, |_| {}).await
    }

    /// Export `SalesPersons` as OSLP (`SlpCode,SlpName`)
    pub async fn export_sales_persons(&self, out_path: &Path) -> Result<ExportSummary> {
        self.export_table(&SALES_PERSONS, out_path, None, |_| {})
            .await
    }

    /// Export `BusinessPartners` as OCRD
    pub async fn export_business_partners(&self, out_path: &Path) -> Result<ExportSummary> {
        self.export_table(&BUSINESS_PARTNERS, out_path, None, |_| {})
            .await
    }
}
