//! Report export: load a stored report and flatten it to CSV.

use anyhow::{Context, Result};
use orderhist_core::storage::{report_key, ObjectStore};
use orderhist_core::{AggregateReport, OrderRecord};
use serde_json::Value;
use std::path::Path;

/// Order fields exported after `symbol`, in column order.
pub const CSV_FIELDS: [&str; 12] = [
    "orderId",
    "clientOid",
    "cTime",
    "side",
    "tradeSide",
    "orderType",
    "size",
    "price",
    "priceAvg",
    "baseVolume",
    "fee",
    "status",
];

/// Read the report for `product_type` from `bucket`.
pub fn load_report(store: &dyn ObjectStore, bucket: &str, product_type: &str) -> Result<AggregateReport> {
    let key = report_key(product_type);
    let body = store
        .get(bucket, &key)
        .with_context(|| format!("failed to read report {bucket}/{key}"))?;
    serde_json::from_slice(&body).with_context(|| format!("failed to parse report {bucket}/{key}"))
}

fn cell(order: &OrderRecord, field: &str) -> String {
    match order.field(field) {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

/// One row per order, grouped by symbol in report order.
pub fn export_report_csv(report: &AggregateReport) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);

    let mut header = vec!["symbol"];
    header.extend(CSV_FIELDS);
    wtr.write_record(&header)?;

    for (symbol, artifact) in report.symbols() {
        for order in artifact.orders() {
            let mut row = Vec::with_capacity(CSV_FIELDS.len() + 1);
            row.push(symbol.clone());
            row.extend(CSV_FIELDS.iter().map(|f| cell(order, f)));
            wtr.write_record(&row)?;
        }
    }

    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

/// Write `csv` to `path`, creating parent directories.
pub fn write_csv(path: &Path, csv: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    std::fs::write(path, csv).with_context(|| format!("failed to write {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use orderhist_core::storage::{put_json, MemoryStore};

    fn sample_report() -> AggregateReport {
        let mut report = AggregateReport::new();
        report.push(
            OrderRecord::new("ETHUSDT", 20)
                .with_field("orderId", "e1")
                .with_field("size", "1.5")
                .with_field("fee", -0.01),
        );
        report.push(OrderRecord::new("BTCUSDT", 10).with_field("orderId", "b1"));
        report
    }

    #[test]
    fn csv_has_header_and_one_row_per_order() {
        let csv = export_report_csv(&sample_report()).unwrap();
        let lines: Vec<&str> = csv.lines().collect();

        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("symbol,orderId,clientOid,cTime"));
        // Symbols come out in sorted order.
        assert!(lines[1].starts_with("BTCUSDT,b1,,10,"));
        assert!(lines[2].starts_with("ETHUSDT,e1,,20,"));
        assert!(lines[2].contains(",1.5,"));
        assert!(lines[2].contains(",-0.01,"));
    }

    #[test]
    fn empty_report_exports_header_only() {
        let csv = export_report_csv(&AggregateReport::new()).unwrap();
        assert_eq!(csv.lines().count(), 1);
    }

    #[test]
    fn load_report_reads_product_key() {
        let store = MemoryStore::new();
        let report = sample_report();
        put_json(&store, "bucket", &report_key("usdt-futures"), &report).unwrap();

        let loaded = load_report(&store, "bucket", "usdt-futures").unwrap();
        assert_eq!(loaded, report);
        assert!(load_report(&store, "bucket", "coin-futures").is_err());
    }

    #[test]
    fn write_csv_creates_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out").join("orders.csv");
        write_csv(&path, "symbol\n").unwrap();
        assert_eq!(std::fs::read_to_string(path).unwrap(), "symbol\n");
    }
}
