//! CSV export routines against a mock Service Layer

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use common::{connect, page, sl_path, start_service_layer, test_config};
use serde_json::{Value, json};
use sl_export::export::files;
use sl_export::{ExportConfig, Exporter};
use std::path::Path;
use tempfile::TempDir;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Serve `records` on the first page of `collection` and nothing after it
async fn mount_collection(server: &MockServer, collection: &str, records: Value) {
    Mock::given(method("GET"))
        .and(path(sl_path(collection)))
        .and(query_param("$skip", "0"))
        .respond_with(page(records, None))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path(sl_path(collection)))
        .respond_with(page(json!([]), None))
        .mount(server)
        .await;
}

async fn exporter_for(server: &MockServer, dir: &TempDir) -> Exporter {
    let mut config = test_config(server, 50);
    config.export = ExportConfig {
        output_dir: dir.path().join("out"),
        price_workers: 4,
        ..ExportConfig::default()
    };
    let executor = connect(&config).await;
    Exporter::new(executor, config.export.clone())
}

fn read(path: &Path) -> String {
    std::fs::read_to_string(path).unwrap()
}

#[tokio::test]
async fn export_all_writes_every_table() {
    let server = start_service_layer().await;

    Mock::given(method("GET"))
        .and(path(sl_path("Items/$count")))
        .respond_with(ResponseTemplate::new(200).set_body_string("2"))
        .mount(&server)
        .await;

    mount_collection(
        &server,
        "ItemGroups",
        json!([{"Number": 100, "GroupName": "Items, general"}]),
    )
    .await;
    mount_collection(
        &server,
        "Items",
        json!([
            {"ItemCode": "A1", "ItemName": "Widget", "ItemsGroupCode": 100,
             "UpdateDate": "2025-01-02", "CreateDate": "2024-12-01"},
            {"ItemCode": "A2", "ItemName": "Gadget", "ItemsGroupCode": null}
        ]),
    )
    .await;
    mount_collection(
        &server,
        "SalesPersons",
        json!([{"SalesEmployeeCode": -1, "SalesEmployeeName": "-No Sales Employee-"}]),
    )
    .await;
    mount_collection(
        &server,
        "BusinessPartners",
        json!([{"CardCode": "C001", "CardName": "ACME", "FederalTaxID": "0991",
                "EmailAddress": "ap@acme.test", "Phone1": "555", "Cellular": null,
                "UpdateDate": "2025-02-01", "CreateDate": "2020-01-01"}]),
    )
    .await;

    Mock::given(method("GET"))
        .and(path(sl_path("Invoices")))
        .and(query_param("$filter", "DocDate ge '2025-01-01'"))
        .and(query_param("$skip", "0"))
        .respond_with(page(
            json!([
                {"DocEntry": 1, "DocNum": 1001, "CardCode": "C001", "SalesPersonCode": -1,
                 "DocDate": "2025-01-15", "DocTotal": 119.5, "VatSum": 12.5},
                {"DocEntry": 2, "DocNum": 1002, "CardCode": "C001", "SalesPersonCode": -1,
                 "DocDate": "2025-01-16", "DocTotal": 10.0, "VatSum": 0.0},
                {"DocNum": 1003}
            ]),
            None,
        ))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(sl_path("Invoices")))
        .respond_with(page(json!([]), None))
        .mount(&server)
        .await;

    // Invoice 1 has addressable lines; invoice 2 is unreachable in every shape
    Mock::given(method("GET"))
        .and(path(sl_path("Invoices(1)/DocumentLines")))
        .respond_with(page(
            json!([{"LineNum": 0, "ItemCode": "A1", "ItemDescription": "Widget",
                    "Quantity": 2.0, "UnitPrice": 9.5, "LineTotal": 19.0}]),
            None,
        ))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let exporter = exporter_for(&server, &dir).await;

    let summaries = exporter
        .export_all(Some("DocDate ge '2025-01-01'"))
        .await
        .unwrap();

    let labels: Vec<_> = summaries.iter().map(|s| s.label).collect();
    assert_eq!(labels, vec!["OITB", "OITM", "OSLP", "OCRD", "OINV", "INV1"]);
    let rows: Vec<_> = summaries.iter().map(|s| s.rows).collect();
    assert_eq!(rows, vec![1, 2, 1, 1, 3, 1]);

    assert_eq!(
        read(&exporter.output_path(files::ITEM_GROUPS)),
        "ItmsGrpCod,ItmsGrpNam\n100,\"Items, general\"\n"
    );
    assert_eq!(
        read(&exporter.output_path(files::ITEMS)),
        "ItemCode,ItemName,ItmsGrpCod,UpdateDate,CreateDate\n\
         A1,Widget,100,2025-01-02,2024-12-01\n\
         A2,Gadget,0,,\n"
    );
    assert_eq!(
        read(&exporter.output_path(files::SALES_PERSONS)),
        "SlpCode,SlpName\n-1,-No Sales Employee-\n"
    );
    assert_eq!(
        read(&exporter.output_path(files::BUSINESS_PARTNERS)),
        "CardCode,CardName,LicTradNum,E_Mail,Phone1,Cellular,Address,U_BirthDate,UpdateDate,CreateDate\n\
         C001,ACME,0991,ap@acme.test,555,,,,2025-02-01,2020-01-01\n"
    );
    assert_eq!(
        read(&exporter.output_path(files::INVOICES)),
        "DocEntry,DocNum,CardCode,SlpCode,DocDate,DocTotal,VatSum\n\
         1,1001,C001,-1,2025-01-15,119.5,12.5\n\
         2,1002,C001,-1,2025-01-16,10.0,0.0\n\
         ,1003,,,,,\n"
    );
    assert_eq!(
        read(&exporter.output_path(files::INVOICE_LINES)),
        "DocEntry,LineNum,ItemCode,Dscription,Quantity,Price,LineTotal\n\
         1,0,A1,Widget,2.0,9.5,19.0\n"
    );
}

#[tokio::test]
async fn price_export_skips_failed_lookups() {
    let server = start_service_layer().await;

    Mock::given(method("GET"))
        .and(path(sl_path("Items")))
        .and(query_param("$select", "ItemCode"))
        .and(query_param("$skip", "0"))
        .respond_with(page(
            json!([{"ItemCode": "A1"}, {"ItemCode": "A2"}, {"ItemCode": "A1"},
                   {"ItemCode": "A3"}, {"ItemCode": ""}]),
            None,
        ))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(sl_path("Items")))
        .and(query_param("$select", "ItemCode"))
        .respond_with(page(json!([]), None))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path(sl_path("Items('A1')")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "ItemCode": "A1",
            "ItemPrices": [
                {"PriceList": 1, "Price": 8.0, "Currency": "USD"},
                {"PriceList": 2, "Price": 9.5, "Currency": "USD"}
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    // A2: key lookup and filter fallback both fail
    Mock::given(method("GET"))
        .and(path(sl_path("Items('A2')")))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(sl_path("Items")))
        .and(query_param("$filter", "ItemCode eq 'A2'"))
        .respond_with(ResponseTemplate::new(400).set_body_string("bad filter"))
        .expect(1)
        .mount(&server)
        .await;

    // A3: exists but has no entry in list 2
    Mock::given(method("GET"))
        .and(path(sl_path("Items('A3')")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "ItemCode": "A3",
            "ItemPrices": {"PriceList": 1, "Price": 1.0, "Currency": "USD"}
        })))
        .mount(&server)
        .await;
    // and the filter form is rejected; the key lookup already found it
    Mock::given(method("GET"))
        .and(path(sl_path("Items")))
        .and(query_param("$filter", "ItemCode eq 'A3'"))
        .respond_with(ResponseTemplate::new(400).set_body_string("bad filter"))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let exporter = exporter_for(&server, &dir).await;
    let out = exporter.output_path(&files::price_list(2));

    let summary = exporter.export_prices(2, &out).await.unwrap();

    assert_eq!(summary.rows, 2);
    let written = read(&out);
    let mut lines: Vec<_> = written.lines().collect();
    assert_eq!(lines.remove(0), "ItemCode,PriceList,Price,Currency");
    lines.sort_unstable();
    assert_eq!(lines, vec!["A1,2,9.5,USD", "A3,2,,"]);
}

#[tokio::test]
async fn stock_export_honors_warehouse_filter() {
    let server = start_service_layer().await;

    Mock::given(method("GET"))
        .and(path(sl_path("Items")))
        .and(query_param(
            "$filter",
            "InventoryItem eq 'tYES' and QuantityOnStock gt 0",
        ))
        .and(query_param("$skip", "0"))
        .respond_with(page(
            json!([
                {"ItemCode": "Z9", "ItemWarehouseInfoCollection": [
                    {"WarehouseCode": "01", "InStock": "5"},
                    {"WarehouseCode": "02", "InStock": 7.25}
                ]},
                {"ItemCode": "B1", "ItemWarehouseInfoCollection": [
                    {"WarehouseCode": "02", "InStock": 1}
                ]},
                {"ItemCode": "C1", "ItemWarehouseInfoCollection": []}
            ]),
            None,
        ))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(sl_path("Items")))
        .respond_with(page(json!([]), None))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let exporter = exporter_for(&server, &dir).await;

    let summary = exporter
        .export_stock(
            &exporter.output_path(files::STOCK_PER_WAREHOUSE),
            &exporter.output_path(files::STOCK_TOTALS),
            Some("02"),
        )
        .await
        .unwrap();

    // C1 has no warehouse rows and is not counted
    assert_eq!(summary.items, 2);
    assert_eq!(
        read(&exporter.output_path(files::STOCK_PER_WAREHOUSE)),
        "ItemCode,Warehouse,InStock\nZ9,02,7.2500\nB1,02,1.0000\n"
    );
    assert_eq!(
        read(&exporter.output_path(files::STOCK_TOTALS)),
        "ItemCode,InStockTotal\nB1,1.0000\nZ9,7.2500\n"
    );
}
